//! Integration tests for auth: register, login, me, password change, and the user store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use trade_journal::api::auth::{self, AuthUserCredential};
use trade_journal::api::routes::{AppState, UserStore, app_router};
use trade_journal::journal::Journal;
use uuid::Uuid;

fn test_app_state(user_store: UserStore) -> AppState {
    AppState {
        journal: Journal::new().shared(),
        jwt_secret: b"test-jwt-secret".to_vec(),
        user_store,
        db: None,
    }
}

/// Spawn app on a random port and return (base_url, guard that keeps server running).
async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

#[tokio::test]
async fn register_returns_201_with_user_id_and_username() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "alice", "password": "secret123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 201);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("user_id").and_then(|v| v.as_str()).is_some());
    assert_eq!(json.get("username").and_then(|v| v.as_str()), Some("alice"));
}

#[tokio::test]
async fn register_empty_username_returns_400() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "", "password": "secret123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("error").unwrap().as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn register_empty_password_returns_400() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "alice", "password": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json.get("error").unwrap().as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn register_duplicate_username_returns_400() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let r1 = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "bob", "password": "pass1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(r1.status().as_u16(), 201);

    let r2 = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "bob", "password": "pass2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(r2.status().as_u16(), 400);
    let json: serde_json::Value = r2.json().await.unwrap();
    assert!(json.get("error").unwrap().as_str().unwrap().contains("already taken"));
}

#[tokio::test]
async fn register_then_login_returns_token() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let reg = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "carol", "password": "mypass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(reg.status().as_u16(), 201);

    let login = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({ "username": "carol", "password": "mypass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200);
    let json: serde_json::Value = login.json().await.unwrap();
    assert!(json.get("token").and_then(|v| v.as_str()).is_some());
    assert!(json.get("user_id").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn login_case_insensitive_username() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let _ = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "Alice", "password": "secret" }))
        .send()
        .await
        .unwrap();

    let login = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({ "username": "alice", "password": "secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200);
    let json: serde_json::Value = login.json().await.unwrap();
    assert!(json.get("user_id").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn login_wrong_password_returns_401() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let _ = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "dave", "password": "right" }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({ "username": "dave", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn login_unknown_user_returns_401() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({ "username": "nobody", "password": "any" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn login_with_env_seeded_user() {
    let user_id = Uuid::new_v4();
    let password_hash = auth::hash_password("envpass").unwrap();
    let cred = AuthUserCredential {
        user_id,
        username: "seeded".to_string(),
        password_hash,
    };
    let mut map = HashMap::new();
    map.insert("seeded".to_string(), cred);
    let user_store: UserStore = Arc::new(RwLock::new(map));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({ "username": "seeded", "password": "envpass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    let uid_str = json.get("user_id").and_then(|v| v.as_str()).unwrap();
    assert_eq!(uid_str, user_id.to_string());
}

#[tokio::test]
async fn me_returns_current_user_for_valid_token() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let _ = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "Erin", "password": "pw" }))
        .send()
        .await
        .unwrap();
    let login: serde_json::Value = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({ "username": "erin", "password": "pw" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login.get("token").and_then(|v| v.as_str()).unwrap();

    let res = client
        .get(format!("{}/auth/me", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json.get("username").and_then(|v| v.as_str()), Some("erin"));
    assert_eq!(json.get("user_id"), login.get("user_id"));
}

#[tokio::test]
async fn change_password_requires_current_password_and_replaces_it() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store.clone());
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();
    let login = |password: &'static str| {
        let client = client.clone();
        let url = format!("{}/auth/login", base_url);
        async move {
            client
                .post(url)
                .json(&serde_json::json!({ "username": "frank", "password": password }))
                .send()
                .await
                .unwrap()
        }
    };

    let _ = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": "frank", "password": "old-pw" }))
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = login("old-pw").await.json().await.unwrap();
    let token = json["token"].as_str().unwrap().to_string();
    let change = |body: serde_json::Value| {
        client
            .post(format!("{}/auth/change-password", base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
    };

    let missing = change(serde_json::json!({ "current_password": "old-pw" })).await.unwrap();
    assert_eq!(missing.status().as_u16(), 400);

    let wrong = change(serde_json::json!({ "current_password": "nope", "new_password": "new-pw" }))
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);
    let json: serde_json::Value = wrong.json().await.unwrap();
    assert_eq!(json["error"], "Current password is incorrect");

    let ok = change(serde_json::json!({ "current_password": "old-pw", "new_password": "new-pw" }))
        .await
        .unwrap();
    assert_eq!(ok.status().as_u16(), 200);
    let json: serde_json::Value = ok.json().await.unwrap();
    assert_eq!(json["message"], "Password changed successfully");

    assert_eq!(login("old-pw").await.status().as_u16(), 401);
    assert_eq!(login("new-pw").await.status().as_u16(), 200);
    let stored = user_store.read().await.get("frank").cloned().unwrap();
    assert!(auth::verify_password("new-pw", &stored.password_hash));
}

#[tokio::test]
async fn change_password_without_token_returns_401() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let (base_url, _handle) = spawn_app(test_app_state(user_store)).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/change-password", base_url))
        .json(&serde_json::json!({ "current_password": "a", "new_password": "b" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn me_without_token_returns_401() {
    let user_store: UserStore = Arc::new(RwLock::new(HashMap::new()));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/auth/me", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn token_signed_with_other_secret_returns_401() {
    let user_id = Uuid::new_v4();
    let mut map = HashMap::new();
    map.insert(
        "frank".to_string(),
        AuthUserCredential {
            user_id,
            username: "frank".to_string(),
            password_hash: auth::hash_password("pw").unwrap(),
        },
    );
    let user_store: UserStore = Arc::new(RwLock::new(map));
    let state = test_app_state(user_store);
    let (base_url, _handle) = spawn_app(state).await;
    let client = reqwest::Client::new();

    let forged = auth::create_token(b"some-other-secret", user_id).unwrap();
    let res = client
        .get(format!("{}/auth/me", base_url))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[test]
fn password_hash_verifies_only_the_hashed_password() {
    let hash = auth::hash_password("hunter2").unwrap();
    assert!(auth::verify_password("hunter2", &hash));
    assert!(!auth::verify_password("hunter3", &hash));
    assert!(!auth::verify_password("hunter2", "not-a-phc-string"));
}

#[test]
fn token_roundtrip_carries_user_id() {
    let user_id = Uuid::new_v4();
    let token = auth::create_token(b"secret", user_id).unwrap();
    let claims = auth::decode_token(b"secret", &token).unwrap();
    assert_eq!(claims.sub, user_id.to_string());
    assert!(claims.exp > claims.iat);
}
