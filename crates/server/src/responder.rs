//! Response writing for dispatched calls.
//!
//! The dispatcher hands exactly one [`Outgoing`] to a [`Responder`] per call;
//! turning it into an HTTP response (status mapping included) is the
//! responder's business.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use service::auth::{AuthError, CallMeta};
use tracing::{error, warn};

use crate::errors::DispatchError;
use crate::vo::AuthVo;

/// One finished call, ready to be written.
#[derive(Debug)]
pub struct Outgoing {
    pub meta: CallMeta,
    pub data: AuthVo,
    /// Status the response payload asked for; 0 when it did not set one.
    /// Nothing sets it today (gateway results carry no status), so it is always 0.
    pub status: u16,
    pub error: Option<DispatchError>,
}

pub trait Responder: Send + Sync {
    fn send(&self, out: Outgoing) -> Response;
}

/// Writes the payload as JSON and maps errors onto HTTP status codes.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonResponder;

impl Responder for JsonResponder {
    fn send(&self, out: Outgoing) -> Response {
        let Outgoing { meta, mut data, status, error } = out;

        let code = match &error {
            Some(e) => {
                let code = status_for(e);
                if code.is_server_error() {
                    error!(request_id = %meta.request_id, action = %meta.action, route = meta.route, code = e.code(), error = %e, "auth request failed");
                } else {
                    warn!(request_id = %meta.request_id, action = %meta.action, route = meta.route, code = e.code(), error = %e, "auth request rejected");
                }
                code
            }
            None => StatusCode::from_u16(status).unwrap_or(StatusCode::OK),
        };

        data.base.status = code.as_u16();
        data.base.timestamp = Utc::now().timestamp_millis();
        if let Some(e) = &error {
            data.base.error = Some(e.to_string());
            data.base.message = code.canonical_reason().map(str::to_string);
            data.success = false;
        }

        let mut resp = (code, Json(data)).into_response();
        if let Some(DispatchError::Gateway(AuthError::TooManyRequests { retry_after_secs })) = &error {
            if let Ok(v) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                resp.headers_mut().insert(header::RETRY_AFTER, v);
            }
        }
        resp
    }
}

/// HTTP status for a failed call.
pub fn status_for(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::Binding(_) => StatusCode::BAD_REQUEST,
        DispatchError::Gateway(e) => match e {
            AuthError::Validation(_) | AuthError::InvalidCode => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::HashError(_) | AuthError::TokenError(_) | AuthError::Repository(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
    }
}
