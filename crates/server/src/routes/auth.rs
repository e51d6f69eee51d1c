use axum::{body::Bytes, extract::State, routing::post, Router};
use service::auth::ActionKind;

use crate::dispatch::ActionDispatcher;

/// Every `/auth` entry point and the action it stands for.
pub const AUTH_ROUTES: &[(&str, ActionKind)] = &[
    ("/auth", ActionKind::Login), // 'sign-in' 的简要别名
    ("/auth/sign-in", ActionKind::Login),
    ("/auth/sign-up", ActionKind::SignUp),
    ("/auth/set-password", ActionKind::ChangePassword),
    ("/auth/reset-password", ActionKind::ResetPassword),
    ("/auth/send-code", ActionKind::SendCode),
];

#[derive(Clone)]
pub struct AuthState {
    pub dispatcher: ActionDispatcher,
}

/// One POST route per table entry, all sharing the same dispatch path.
pub fn auth_routes() -> Router<AuthState> {
    AUTH_ROUTES.iter().fold(Router::new(), |router, &(path, action)| {
        router.route(
            path,
            post(move |State(state): State<AuthState>, body: Bytes| async move {
                state.dispatcher.dispatch(path, action, body).await
            }),
        )
    })
}
