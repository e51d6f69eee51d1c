use std::net::SocketAddr;

use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use reqwest::StatusCode as HttpStatusCode;

use server::routes;
use server::startup::build_state;

struct TestApp {
    base_url: String,
}

async fn start_server() -> anyhow::Result<TestApp> {
    let settings = configs::AuthSettings { jwt_secret: Some("test-secret".into()), ..Default::default() };
    let app: Router = routes::build_router(build_state(&settings), tower_http::cors::CorsLayer::very_permissive());
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url })
}

#[tokio::test]
async fn e2e_sign_up_and_sign_in_over_http() -> anyhow::Result<()> {
    let app = start_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    let res = client
        .post(format!("{}/auth/sign-up", app.base_url))
        .json(&json!({"auth": {"account": "dave", "password": "Passw0rd!"}}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    let res = client
        .post(format!("{}/auth/sign-in", app.base_url))
        .json(&json!({"auth": {"username": "dave", "password": "Passw0rd!"}}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], 200);
    assert!(body["auth"]["token"].is_string());

    let res = client
        .post(format!("{}/auth/sign-in", app.base_url))
        .header("content-type", "application/json")
        .body("{\"auth\":")
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    Ok(())
}
