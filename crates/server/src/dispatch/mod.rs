//! Action dispatch: open the envelope, call the auth gateway once, send once.
//!
//! Every `/auth` entry point goes through [`ActionDispatcher::execute`]; the
//! only thing that differs between them is the [`ActionKind`] in the call's
//! [`CallMeta`].

mod envelope;

use std::sync::Arc;

use axum::body::Bytes;
use axum::response::Response;
use service::auth::{ActionKind, AuthGateway, CallMeta};
use tracing::{debug, instrument};

use crate::errors::DispatchError;
use crate::responder::Responder;

pub use envelope::{Phase, RequestEnvelope};

#[derive(Clone)]
pub struct ActionDispatcher {
    gateway: Arc<dyn AuthGateway>,
    responder: Arc<dyn Responder>,
}

impl ActionDispatcher {
    pub fn new(gateway: Arc<dyn AuthGateway>, responder: Arc<dyn Responder>) -> Self {
        Self { gateway, responder }
    }

    /// Handle one inbound body for `route`, tagged as `action`.
    pub async fn dispatch(&self, route: &'static str, action: ActionKind, body: Bytes) -> Response {
        self.execute(RequestEnvelope::new(CallMeta::new(route, action), body)).await
    }

    /// Open, then run the action if binding succeeded; the envelope is sent on every path.
    #[instrument(skip_all, fields(request_id = %env.meta().request_id, action = %env.meta().action))]
    pub async fn execute(&self, mut env: RequestEnvelope) -> Response {
        let outcome = match env.open() {
            Ok(()) => self.perform(&mut env).await,
            Err(e) => Err(e.into()),
        };
        env.send(outcome.err(), self.responder.as_ref())
    }

    async fn perform(&self, env: &mut RequestEnvelope) -> Result<(), DispatchError> {
        let action = env.meta().action;
        let req = env.stamp(action);
        let result = self.gateway.handle(env.meta(), req).await?;
        debug!(echoed = result.is_some(), "gateway returned");
        env.apply(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use service::auth::{AuthDto, AuthError, AuthRequest};

    use crate::responder::{JsonResponder, Outgoing};
    use crate::vo::AuthVo;

    /// Gateway double: records every request and replays a canned result.
    struct StubGateway {
        calls: Mutex<Vec<AuthRequest>>,
        reply: fn() -> Result<Option<AuthDto>, AuthError>,
    }

    impl StubGateway {
        fn new(reply: fn() -> Result<Option<AuthDto>, AuthError>) -> Arc<Self> {
            Arc::new(Self { calls: Mutex::new(Vec::new()), reply })
        }

        fn calls(&self) -> Vec<AuthRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthGateway for StubGateway {
        async fn handle(&self, _ctx: &CallMeta, req: AuthRequest) -> Result<Option<AuthDto>, AuthError> {
            self.calls.lock().unwrap().push(req);
            (self.reply)()
        }
    }

    /// Keeps every outgoing envelope, then writes it with the JSON responder.
    #[derive(Default)]
    struct RecordingResponder {
        sent: Mutex<Vec<(AuthVo, Option<String>, bool)>>,
    }

    impl Responder for RecordingResponder {
        fn send(&self, out: Outgoing) -> Response {
            let is_binding = matches!(out.error, Some(DispatchError::Binding(_)));
            self.sent.lock().unwrap().push((out.data.clone(), out.error.as_ref().map(|e| e.to_string()), is_binding));
            JsonResponder.send(out)
        }
    }

    fn dispatcher(gateway: Arc<StubGateway>) -> (ActionDispatcher, Arc<RecordingResponder>) {
        let responder = Arc::new(RecordingResponder::default());
        (ActionDispatcher::new(gateway, responder.clone()), responder)
    }

    fn echo_success() -> Result<Option<AuthDto>, AuthError> {
        Ok(Some(AuthDto { account: "bob".into(), token: Some("t0k".into()), success: true, ..Default::default() }))
    }

    const VALID: &[u8] = br#"{"auth":{"username":"bob","password":"x"}}"#;

    #[tokio::test]
    async fn sign_in_echoes_gateway_result() {
        let gw = StubGateway::new(echo_success);
        let (d, rec) = dispatcher(gw.clone());
        let resp = d.dispatch("/auth/sign-in", ActionKind::Login, Bytes::from_static(VALID)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let calls = gw.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].action, ActionKind::Login);
        assert_eq!(calls[0].auth.action, Some(ActionKind::Login));
        assert_eq!(calls[0].auth.password.as_deref(), Some("x"));

        let sent = rec.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (data, err, _) = &sent[0];
        assert!(err.is_none());
        assert!(data.success);
        let expected = echo_success().unwrap().unwrap();
        assert_eq!(data.auth, expected);
    }

    #[tokio::test]
    async fn malformed_body_skips_gateway() {
        let bodies: [&[u8]; 4] = [b"{", b"", b"[1,2]", br#"{"auth": 7}"#];
        for body in bodies {
            let gw = StubGateway::new(echo_success);
            let (d, rec) = dispatcher(gw.clone());
            let resp = d.dispatch("/auth/sign-up", ActionKind::SignUp, Bytes::copy_from_slice(body)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert!(gw.calls().is_empty());

            let sent = rec.sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert!(sent[0].2, "expected a binding error");
            assert_eq!(sent[0].0, AuthVo::default());
        }
    }

    #[tokio::test]
    async fn gateway_error_passes_through_unchanged() {
        let gw = StubGateway::new(|| Err(AuthError::InvalidCode));
        let (d, rec) = dispatcher(gw.clone());
        let resp = d.dispatch("/auth/reset-password", ActionKind::ResetPassword, Bytes::from_static(VALID)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(gw.calls().len(), 1);

        let sent = rec.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (data, err, is_binding) = &sent[0];
        assert!(!is_binding);
        assert_eq!(err.as_deref(), Some(AuthError::InvalidCode.to_string().as_str()));
        assert_eq!(data.auth, AuthDto::default());
        assert!(!data.success);
    }

    #[tokio::test]
    async fn empty_result_leaves_response_default() {
        let gw = StubGateway::new(|| Ok(None));
        let (d, rec) = dispatcher(gw.clone());
        let resp = d.dispatch("/auth/send-code", ActionKind::SendCode, Bytes::from_static(VALID)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let sent = rec.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.is_none());
        assert_eq!(sent[0].0, AuthVo::default());
    }

    #[tokio::test]
    async fn every_action_reaches_gateway_once_with_its_tag() {
        for action in ActionKind::ALL {
            let gw = StubGateway::new(echo_success);
            let (d, rec) = dispatcher(gw.clone());
            d.dispatch("/auth/any", action, Bytes::from_static(VALID)).await;
            let calls = gw.calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].action, action);
            assert_eq!(rec.sent.lock().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn bodiless_envelope_still_dispatches() {
        let gw = StubGateway::new(|| Ok(None));
        let (d, rec) = dispatcher(gw.clone());
        let env = RequestEnvelope::without_body(CallMeta::new("/auth/send-code", ActionKind::SendCode));
        d.execute(env).await;
        assert_eq!(gw.calls().len(), 1);
        assert_eq!(rec.sent.lock().unwrap().len(), 1);
    }
}
