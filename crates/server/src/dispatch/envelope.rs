use axum::body::Bytes;
use axum::response::Response;
use service::auth::{ActionKind, AuthDto, AuthRequest, CallMeta};
use tracing::debug;

use crate::errors::{BindingError, DispatchError};
use crate::responder::{Outgoing, Responder};
use crate::vo::AuthVo;

/// Where a call is in its lifecycle. Sending consumes the envelope, so there
/// is no variant for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Opened,
    Executed,
}

/// Per-call container: the raw body, the bound request and the response
/// being assembled. Lives for one call only.
#[derive(Debug)]
pub struct RequestEnvelope {
    meta: CallMeta,
    raw: Bytes,
    want_request_body: bool,
    request: AuthVo,
    response: AuthVo,
    phase: Phase,
}

impl RequestEnvelope {
    pub fn new(meta: CallMeta, raw: Bytes) -> Self {
        Self {
            meta,
            raw,
            want_request_body: true,
            request: AuthVo::default(),
            response: AuthVo::default(),
            phase: Phase::Created,
        }
    }

    /// Envelope for an endpoint that takes no body; `open` always succeeds.
    pub fn without_body(meta: CallMeta) -> Self {
        Self { want_request_body: false, ..Self::new(meta, Bytes::new()) }
    }

    pub fn meta(&self) -> &CallMeta {
        &self.meta
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn request(&self) -> &AuthVo {
        &self.request
    }

    pub fn response(&self) -> &AuthVo {
        &self.response
    }

    /// Bind the raw body. On error nothing else may run except `send`.
    pub fn open(&mut self) -> Result<(), BindingError> {
        debug_assert_eq!(self.phase, Phase::Created);
        if self.want_request_body {
            self.request = serde_json::from_slice(&self.raw)?;
        }
        self.phase = Phase::Opened;
        debug!(request_id = %self.meta.request_id, "envelope opened");
        Ok(())
    }

    /// Tag the bound request with `action` and build what the gateway receives.
    pub fn stamp(&mut self, action: ActionKind) -> AuthRequest {
        self.request.auth.action = Some(action);
        AuthRequest {
            action,
            auth: self.request.auth.clone(),
            user: self.request.user.clone(),
            new_password: self.request.new_password.clone(),
        }
    }

    /// Record the gateway's result. Only a present result touches the response.
    pub fn apply(&mut self, result: Option<AuthDto>) {
        if let Some(auth) = result {
            self.response.success = auth.success;
            self.response.auth = auth;
        }
        self.phase = Phase::Executed;
    }

    /// Emit the single response for this call.
    pub fn send(self, error: Option<DispatchError>, responder: &dyn Responder) -> Response {
        debug!(request_id = %self.meta.request_id, phase = ?self.phase, failed = error.is_some(), "envelope sent");
        responder.send(Outgoing {
            status: self.response.base.status,
            meta: self.meta,
            data: self.response,
            error,
        })
    }
}
