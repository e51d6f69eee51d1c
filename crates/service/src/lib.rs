//! Service layer for identity lifecycle actions.
//! - Defines the auth domain shared with the HTTP layer.
//! - Declares the `AuthGateway` boundary the dispatcher calls into.
//! - Ships an in-memory `AuthService` implementing that boundary.

pub mod auth;
