use super::*;

// =============================================================
// normalize_base_url / endpoint
// =============================================================

#[test]
fn base_url_trailing_slash_is_trimmed() {
    assert_eq!(normalize_base_url("http://127.0.0.1:8080/").unwrap(), "http://127.0.0.1:8080");
    assert_eq!(normalize_base_url("  https://portal.example  ").unwrap(), "https://portal.example");
}

#[test]
fn base_url_rejects_non_http_schemes() {
    for raw in ["ftp://portal.example", "not a url", "", "file:///tmp/x"] {
        assert!(matches!(normalize_base_url(raw), Err(ApiError::InvalidBaseUrl(_))), "raw {raw:?}");
    }
}

#[test]
fn endpoint_joins_base_and_path() {
    assert_eq!(endpoint("http://h:1", "/auth/login"), "http://h:1/auth/login");
}

#[test]
fn client_keeps_normalized_base_url() {
    let client = ApiClient::new("http://127.0.0.1:8080/", DEFAULT_TIMEOUT).unwrap();
    assert_eq!(client.base_url(), "http://127.0.0.1:8080");
}

// =============================================================
// error_message
// =============================================================

#[test]
fn error_message_prefers_json_error_field() {
    assert_eq!(error_message(401, r#"{"error":"invalid email or password"}"#), "invalid email or password");
}

#[test]
fn error_message_falls_back_to_plain_body() {
    assert_eq!(error_message(400, "invalid request body\n"), "invalid request body");
}

#[test]
fn error_message_formats_status_when_body_empty() {
    assert_eq!(error_message(503, ""), "request failed: 503");
}

// =============================================================
// ApiError / Credential
// =============================================================

#[test]
fn only_401_is_unauthorized() {
    assert!(ApiError::Status { status: 401, message: String::new() }.is_unauthorized());
    assert!(!ApiError::Status { status: 403, message: String::new() }.is_unauthorized());
    assert!(!ApiError::InvalidBaseUrl("x".into()).is_unauthorized());
}

#[test]
fn status_error_display_includes_code_and_message() {
    let err = ApiError::Status { status: 409, message: "email already registered".into() };
    assert_eq!(err.to_string(), "server returned 409: email already registered");
}

#[test]
fn credential_debug_is_redacted() {
    let credential = Credential::bearer("super-secret-token");
    assert_eq!(credential.token(), "super-secret-token");
    assert!(!format!("{credential:?}").contains("super-secret-token"));
}

// =============================================================
// HTTP round trips against a stub server
// =============================================================

mod stub {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::{IntoResponse, Json, Response};
    use axum::routing::{get, post};
    use serde_json::{Value, json};

    pub const GOOD_TOKEN: &str = "good-token";
    pub const USER_ID: &str = "00000000-0000-0000-0000-000000000001";

    /// `Authorization` header values seen by the stub, in arrival order.
    pub type Seen = Arc<Mutex<Vec<Option<String>>>>;

    fn user() -> Value {
        json!({ "id": USER_ID, "email": "a@b.com", "role": "user" })
    }

    fn session(message: &str) -> Value {
        json!({ "message": message, "token": "next-token", "expires_at": 1_700_003_600, "user": user() })
    }

    fn unauthorized(message: &str) -> Response {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
    }

    fn bearer_ok(seen: &Seen, headers: &HeaderMap) -> bool {
        let value = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned);
        let ok = value.as_deref() == Some(&*format!("Bearer {GOOD_TOKEN}"));
        seen.lock().unwrap().push(value);
        ok
    }

    async fn refresh(State(seen): State<Seen>, headers: HeaderMap) -> Response {
        if bearer_ok(&seen, &headers) {
            Json(session("token refreshed")).into_response()
        } else {
            unauthorized("missing or invalid session token")
        }
    }

    async fn me(State(seen): State<Seen>, headers: HeaderMap) -> Response {
        if bearer_ok(&seen, &headers) {
            Json(user()).into_response()
        } else {
            unauthorized("missing or invalid session token")
        }
    }

    async fn login(Json(body): Json<Value>) -> Response {
        if body["password"] == "secret" {
            Json(session("login successful")).into_response()
        } else {
            unauthorized("invalid email or password")
        }
    }

    async fn register(Json(body): Json<Value>) -> Response {
        if body["email"] == "taken@b.com" {
            return (StatusCode::CONFLICT, Json(json!({ "error": "email already registered" }))).into_response();
        }
        (StatusCode::CREATED, Json(json!({ "message": "user registered successfully" }))).into_response()
    }

    /// Serve the stub on an ephemeral port and return its base URL.
    pub async fn spawn() -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/auth/ping", get(|| async { "auth service alive" }))
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/auth/me", get(me))
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }
}

async fn stub_client() -> (ApiClient, stub::Seen) {
    let (base_url, seen) = stub::spawn().await;
    (ApiClient::new(&base_url, DEFAULT_TIMEOUT).unwrap(), seen)
}

#[tokio::test]
async fn ping_returns_body() {
    let (client, _) = stub_client().await;
    assert_eq!(client.ping().await.unwrap(), "auth service alive");
}

#[tokio::test]
async fn refresh_sends_credential_as_bearer_header() {
    let (client, seen) = stub_client().await;
    let session = client.refresh_token(&Credential::bearer(stub::GOOD_TOKEN)).await.unwrap();
    assert_eq!(session.token, "next-token");
    assert_eq!(session.user.id.to_string(), stub::USER_ID);
    assert_eq!(seen.lock().unwrap().as_slice(), [Some(format!("Bearer {}", stub::GOOD_TOKEN))]);
}

#[tokio::test]
async fn me_sends_credential_as_bearer_header() {
    let (client, seen) = stub_client().await;
    let user = client.me(&Credential::bearer(stub::GOOD_TOKEN)).await.unwrap();
    assert_eq!(user.email, "a@b.com");
    assert_eq!(seen.lock().unwrap().as_slice(), [Some(format!("Bearer {}", stub::GOOD_TOKEN))]);
}

#[tokio::test]
async fn each_call_uses_its_own_credential() {
    let (client, seen) = stub_client().await;
    client.me(&Credential::bearer(stub::GOOD_TOKEN)).await.unwrap();
    let err = client.me(&Credential::bearer("other-token")).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        [Some(format!("Bearer {}", stub::GOOD_TOKEN)), Some("Bearer other-token".to_owned())]
    );
}

#[tokio::test]
async fn rejected_refresh_maps_to_401_status_with_server_message() {
    let (client, _) = stub_client().await;
    let err = client.refresh_token(&Credential::bearer("expired")).await.unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "missing or invalid session token");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn session_api_refresh_delegates_to_http_call() {
    let (client, seen) = stub_client().await;
    let api: &dyn SessionApi = &client;
    let session = api.refresh(&Credential::bearer(stub::GOOD_TOKEN)).await.unwrap();
    assert_eq!(session.message, "token refreshed");
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn login_success_and_bad_password() {
    let (client, seen) = stub_client().await;
    let session = client.login("a@b.com", "secret").await.unwrap();
    assert_eq!(session.message, "login successful");
    assert_eq!(session.expires_at, 1_700_003_600);

    let err = client.login("a@b.com", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 401, ref message } if message == "invalid email or password"));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn register_returns_message_and_maps_conflict() {
    let (client, _) = stub_client().await;
    assert_eq!(client.register("a@b.com", "secret").await.unwrap(), "user registered successfully");

    let err = client.register("taken@b.com", "secret").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 409, ref message } if message == "email already registered"));
}
