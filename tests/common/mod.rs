#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use muniscope::config::Config;
use muniscope::db::Stores;
use muniscope::middleware::Claims;
use muniscope::router::{AtlasState, atlas_router};
use serde_json::Value;
use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";

/// Router over fresh SQLite files; both are removed on drop.
pub struct TestApp {
    pub app: Router,
    pub stores: Stores,
    paths: Vec<PathBuf>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for path in &self.paths {
            let _ = fs::remove_file(path);
        }
    }
}

fn temp_db(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "muniscope-{tag}-{}-{nanos}.sqlite",
        std::process::id()
    ));
    path
}

pub async fn spawn_app() -> TestApp {
    let finance_path = temp_db("finance");
    let gis_path = temp_db("gis");
    let stores = Stores::open(
        &format!("sqlite:{}", finance_path.display()),
        &format!("sqlite:{}", gis_path.display()),
    )
    .await
    .expect("failed to open stores");

    let cfg = Config {
        jwt_secret: SECRET.to_string(),
        history_years: 3,
        ..Config::default()
    };
    let state = AtlasState::new(stores.clone(), &cfg).expect("failed to build state");
    TestApp {
        app: atlas_router(state),
        stores,
        paths: vec![finance_path, gis_path],
    }
}

pub fn token(user_id: i64) -> String {
    let claims = Claims {
        user_id,
        exp: chrono::Utc::now().timestamp() + 3600,
        iat: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to sign token")
}

impl TestApp {
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(Some(1), method, uri, body).await
    }

    pub async fn send_as(
        &self,
        user_id: Option<i64>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header("authorization", format!("Bearer {}", token(user_id)));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = self
            .app
            .clone()
            .oneshot(builder.body(body).expect("failed to build request"))
            .await
            .expect("request failed");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }
}
