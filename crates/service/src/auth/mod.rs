//! Auth module: domain, gateway boundary, repository and the bundled service.
//!
//! The HTTP layer only depends on [`AuthGateway`]; [`AuthService`] is one
//! implementation of it.

pub mod domain;
pub mod errors;
pub mod gateway;
pub mod repository;
pub mod service;

pub use domain::{ActionKind, AuthDto, AuthRequest, UserDto};
pub use errors::AuthError;
pub use gateway::{AuthGateway, CallMeta};
pub use service::{AuthConfig, AuthService};
