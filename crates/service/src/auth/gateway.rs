use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{ActionKind, AuthDto, AuthRequest};
use super::errors::AuthError;

/// Ambient context for one inbound call.
#[derive(Debug, Clone)]
pub struct CallMeta {
    pub request_id: Uuid,
    pub route: &'static str,
    pub action: ActionKind,
}

impl CallMeta {
    pub fn new(route: &'static str, action: ActionKind) -> Self {
        Self { request_id: Uuid::new_v4(), route, action }
    }
}

/// Boundary to the backing authentication service.
///
/// `Ok(Some(dto))` is echoed to the caller, `Ok(None)` leaves the response
/// empty, and any `Err` is reported as-is. Implementations are shared across
/// concurrent calls and must not keep per-caller state between them.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn handle(&self, ctx: &CallMeta, req: AuthRequest) -> Result<Option<AuthDto>, AuthError>;
}
