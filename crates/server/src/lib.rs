pub mod dispatch;
pub mod errors;
pub mod responder;
pub mod routes;
pub mod startup;
pub mod vo;

pub use startup::run;
