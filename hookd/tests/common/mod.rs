//! Shared test fixtures

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use secrecy::SecretString;
use tempfile::TempDir;

use hookd::authn::signature::{compute_signature, SIGNATURE_HEADER};
use hookd::deploy::coordinator::Coordinator;
use hookd::deploy::lock::DeployLock;
use hookd::deploy::supervisor::{DeployOptions, Supervisor};
use hookd::filesys::dir::Dir;
use hookd::registry::Registry;
use hookd::server::serve::router;
use hookd::server::state::ServerState;

pub const SECRET: &str = "test-secret";

pub struct TestServer {
    pub router: Router,
    pub lock: Arc<DeployLock>,
    pub registry: Arc<Registry>,
    pub dir: TempDir,
}

impl TestServer {
    pub fn config_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("projects")
    }

    pub fn lock_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("deploy.lock")
    }
}

/// Build a router over temp dirs: `configs` are (file name, YAML text)
/// pairs and `script` is the deploy script body run via /bin/bash.
pub async fn test_server(configs: &[(&str, &str)], script: &str) -> TestServer {
    let dir = TempDir::new().unwrap();

    let config_dir = dir.path().join("projects");
    std::fs::create_dir_all(&config_dir).unwrap();
    for (name, contents) in configs {
        std::fs::write(config_dir.join(name), contents).unwrap();
    }

    let script_path = dir.path().join("deploy.sh");
    std::fs::write(&script_path, script).unwrap();

    let hosting_dir = dir.path().join("hosting");
    std::fs::create_dir_all(&hosting_dir).unwrap();

    let lock_dir = dir.path().join("deploy.lock");

    let registry = Arc::new(Registry::load(Dir::new(&config_dir)).await.unwrap());
    let lock = Arc::new(DeployLock::new(&lock_dir));
    let supervisor = Supervisor::new(
        DeployOptions {
            hosting_dir,
            deploy_script: script_path,
            timeout: Duration::from_secs(10),
        },
        lock.clone(),
    );
    let coordinator = Coordinator::new(registry.clone(), lock.clone(), supervisor);
    let state = Arc::new(ServerState::new(
        registry.clone(),
        lock.clone(),
        coordinator,
        SecretString::from(SECRET.to_string()),
    ));

    TestServer {
        router: router(state),
        lock,
        registry,
        dir,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn signed_get(uri: &str, secret: &str) -> Request<Body> {
    let signature = compute_signature(secret, b"").unwrap();
    Request::builder()
        .uri(uri)
        .header(SIGNATURE_HEADER, signature)
        .body(Body::empty())
        .unwrap()
}

pub fn signed_post(uri: &str, secret: &str, body: &[u8]) -> Request<Body> {
    let signature = compute_signature(secret, body).unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(SIGNATURE_HEADER, signature)
        .header("content-type", "application/json")
        .body(Body::from(Bytes::copy_from_slice(body)))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn expect_json(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

/// Wait for the lock to return to idle; panics if it never does
pub async fn await_idle(lock: &DeployLock, deadline: Duration) {
    let start = std::time::Instant::now();
    loop {
        if matches!(lock.status().await, hookd::deploy::lock::LockStatus::Idle) {
            return;
        }
        if start.elapsed() > deadline {
            panic!("lock did not return to idle within {:?}", deadline);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
