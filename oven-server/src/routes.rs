//! Router assembly

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware;
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    let protected = Router::new()
        .route("/start", post(handlers::start_handler))
        .route("/quick-start", post(handlers::quick_start_handler))
        .route("/pause", post(handlers::pause_handler))
        .route("/resume", post(handlers::resume_handler))
        .route("/cancel", post(handlers::cancel_handler))
        .route("/status", get(handlers::status_handler))
        .route("/programs", get(handlers::list_programs_handler))
        .route("/programs/add", post(handlers::add_program_handler))
        .route("/programs/{id}", delete(handlers::remove_program_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/login", post(handlers::login_handler))
        .route("/logout", post(handlers::logout_handler))
        .merge(protected)
        .layer(axum_middleware::from_fn(middleware::session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use oven_core::{AuthService, MemoryStateStore, ProgramCatalog, auth::stock_users};

    use super::*;
    use crate::state::AppState;

    const T0: i64 = 1_700_000_000;

    struct Harness {
        app: Router,
        clock: Arc<AtomicI64>,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let catalog = ProgramCatalog::new(dir.path().join("programs.json"));
            catalog.seed_defaults().unwrap();

            let auth = AuthService::new(&stock_users().unwrap(), b"test secret of at least 32 bytes", 3600);
            let clock = Arc::new(AtomicI64::new(T0));
            let ticks = Arc::clone(&clock);

            let state = Arc::new(AppState::with_clock(
                auth,
                catalog,
                Arc::new(MemoryStateStore::new(3600)),
                Arc::new(move || ticks.load(Ordering::SeqCst)),
            ));

            Self {
                app: router(state),
                clock,
                dir,
            }
        }

        fn advance(&self, secs: i64) {
            self.clock.fetch_add(secs, Ordering::SeqCst);
        }

        async fn send(&self, req: Request<Body>) -> Response {
            self.app.clone().oneshot(req).await.unwrap()
        }

        async fn token(&self) -> String {
            let resp = self
                .send(json_request(
                    "POST",
                    "/login",
                    None,
                    json!({"username": "admin", "password": "senha123"}),
                ))
                .await;
            assert_eq!(resp.status(), StatusCode::OK);
            body_json(resp).await["token"].as_str().unwrap().to_string()
        }

        async fn call(&self, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
            let req = match body {
                Some(body) => json_request(method, uri, Some(token), body),
                None => Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .header(header::COOKIE, "oven_session=test-session")
                    .body(Body::empty())
                    .unwrap(),
            };
            let resp = self.send(req).await;
            let status = resp.status();
            (status, body_json(resp).await)
        }
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, "oven_session=test-session");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn raw_request(method: &str, uri: &str, token: Option<&str>, content_type: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, "oven_session=test-session");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let h = Harness::new();
        let resp = h
            .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_login_failures() {
        let h = Harness::new();

        let resp = h
            .send(json_request(
                "POST",
                "/login",
                None,
                json!({"username": "admin", "password": "wrong"}),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid credentials");
        assert!(body.get("token").is_none());

        let resp = h
            .send(json_request("POST", "/login", None, json!({"username": "admin"})))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_is_public() {
        let h = Harness::new();
        let resp = h
            .send(Request::builder().method("POST").uri("/logout").body(Body::empty()).unwrap())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "success");
    }

    #[tokio::test]
    async fn test_protected_routes_need_token() {
        let h = Harness::new();

        let resp = h
            .send(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "error");

        let (status, body) = h.call("GET", "/status", "a.b.c", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");

        let resp = h
            .send(
                Request::builder()
                    .uri("/programs")
                    .header(header::AUTHORIZATION, "Token abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_heating_cycle() {
        let h = Harness::new();
        let token = h.token().await;

        let (status, body) = h.call("GET", "/status", &token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "inactive");

        let (status, body) = h
            .call("POST", "/start", &token, Some(json!({"time": 60, "power": 8})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["time"], 60);
        assert_eq!(body["power"], 8);
        assert_eq!(body["isPaused"], false);

        h.advance(10);
        let (_, body) = h.call("GET", "/status", &token, None).await;
        assert_eq!(body, json!({"status": "active", "time": 50, "power": 8, "isPaused": false}));

        let (_, body) = h.call("POST", "/pause", &token, None).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["time"], 50);
        assert_eq!(body["isPaused"], true);

        h.advance(100);
        let (_, body) = h.call("GET", "/status", &token, None).await;
        assert_eq!(body["time"], 50);
        assert_eq!(body["isPaused"], true);

        let (_, body) = h.call("POST", "/resume", &token, None).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["time"], 50);
        assert_eq!(body["isPaused"], false);

        h.advance(50);
        let (_, body) = h.call("GET", "/status", &token, None).await;
        assert_eq!(body["status"], "completed");

        let (_, body) = h.call("GET", "/status", &token, None).await;
        assert_eq!(body["status"], "inactive");
    }

    #[tokio::test]
    async fn test_state_errors_are_in_band() {
        let h = Harness::new();
        let token = h.token().await;

        let (status, body) = h.call("POST", "/pause", &token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");

        h.call("POST", "/start", &token, Some(json!({"time": 30, "power": 5})))
            .await;
        let (status, body) = h.call("POST", "/resume", &token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "heating is not paused");
    }

    #[tokio::test]
    async fn test_start_validation_is_400() {
        let h = Harness::new();
        let token = h.token().await;

        for body in [
            json!({"time": 0, "power": 5}),
            json!({"time": 121, "power": 5}),
            json!({"time": 30, "power": 0}),
            json!({"time": 30, "power": 11}),
            json!({}),
        ] {
            let (status, resp) = h.call("POST", "/start", &token, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(resp["status"], "error");
        }
    }

    #[tokio::test]
    async fn test_start_program_bypasses_ceiling() {
        let h = Harness::new();
        let token = h.token().await;

        // Stock program 1 runs for 180 s
        let (status, body) = h
            .call("POST", "/start", &token, Some(json!({"programId": 1})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["time"], 180);
        assert_eq!(body["power"], 7);

        let (status, _) = h
            .call("POST", "/start", &token, Some(json!({"programId": 77})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_quick_start_and_cancel() {
        let h = Harness::new();
        let token = h.token().await;

        let (_, body) = h.call("POST", "/quick-start", &token, None).await;
        assert_eq!(body["time"], 30);
        assert_eq!(body["power"], 10);

        let (_, body) = h.call("POST", "/quick-start", &token, None).await;
        assert_eq!(body["time"], 60);

        let (_, body) = h.call("POST", "/cancel", &token, None).await;
        assert_eq!(body["status"], "success");

        let (_, body) = h.call("GET", "/status", &token, None).await;
        assert_eq!(body["status"], "inactive");
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_ovens() {
        let h = Harness::new();
        let token = h.token().await;

        h.call("POST", "/start", &token, Some(json!({"time": 30, "power": 5})))
            .await;

        let resp = h
            .send(
                Request::builder()
                    .uri("/status")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .header(header::COOKIE, "oven_session=someone-else")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(body_json(resp).await["status"], "inactive");
    }

    #[tokio::test]
    async fn test_new_client_gets_session_cookie() {
        let h = Harness::new();
        let resp = h
            .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await;
        let cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("oven_session="));

        let resp = h
            .send(
                Request::builder()
                    .uri("/health")
                    .header(header::COOKIE, "oven_session=known")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_program_catalog_routes() {
        let h = Harness::new();
        let token = h.token().await;

        let (status, body) = h.call("GET", "/programs", &token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["programs"].as_array().unwrap().len(), 5);
        assert_eq!(body["programs"][0]["isDefault"], true);

        let (status, body) = h
            .call(
                "POST",
                "/programs/add",
                &token,
                Some(json!({
                    "name": "Lasanha",
                    "food": "Lasanha congelada",
                    "time": 600,
                    "power": 6,
                    "instructions": "Retire o filme plástico"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["program"]["id"], 6);

        let (_, body) = h.call("GET", "/programs", &token, None).await;
        let programs = body["programs"].as_array().unwrap();
        assert_eq!(programs.len(), 6);
        assert_eq!(programs[5]["isDefault"], false);

        let (status, _) = h.call("DELETE", "/programs/1", &token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h.call("DELETE", "/programs/6", &token, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = h.call("DELETE", "/programs/6", &token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = h
            .call(
                "POST",
                "/programs/add",
                &token,
                Some(json!({"name": "Bad", "food": "X", "time": 60, "power": 12})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_catalog_is_500() {
        let h = Harness::new();
        let token = h.token().await;
        std::fs::remove_file(h.dir.path().join("programs.json")).unwrap();

        let (status, body) = h.call("GET", "/programs", &token, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_start_accepts_loose_numbers() {
        let h = Harness::new();
        let token = h.token().await;

        let (status, body) = h
            .call("POST", "/start", &token, Some(json!({"time": "30", "power": 5})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["time"], 30);
        assert_eq!(body["power"], 5);

        h.call("POST", "/cancel", &token, None).await;
        let (status, body) = h
            .call("POST", "/start", &token, Some(json!({"time": 30.5, "power": "8"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["time"], 30);
        assert_eq!(body["power"], 8);
    }

    #[tokio::test]
    async fn test_unreadable_bodies_are_400_envelopes() {
        let h = Harness::new();
        let token = h.token().await;

        for req in [
            raw_request("POST", "/start", Some(&token), Some("application/json"), r#"{"time": "#),
            raw_request("POST", "/start", Some(&token), None, r#"{"time": 30, "power": 5}"#),
            raw_request("POST", "/start", Some(&token), Some("application/json"), "42"),
            raw_request("POST", "/programs/add", Some(&token), Some("text/plain"), "Pipoca"),
        ] {
            let resp = h.send(req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body = body_json(resp).await;
            assert_eq!(body["status"], "error");
            assert!(body["message"].is_string());
        }

        let (_, body) = h.call("GET", "/status", &token, None).await;
        assert_eq!(body["status"], "inactive");
    }

    #[tokio::test]
    async fn test_add_program_field_errors_are_400() {
        let h = Harness::new();
        let token = h.token().await;

        let (status, body) = h
            .call(
                "POST",
                "/programs/add",
                &token,
                Some(json!({"name": "Sopa", "food": "Sopa", "time": -5, "power": 5})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "time must be greater than zero");

        let (status, body) = h
            .call(
                "POST",
                "/programs/add",
                &token,
                Some(json!({"name": "Sopa", "food": "Sopa", "time": 300})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "power must be between 1 and 10");

        let (status, body) = h
            .call("POST", "/programs/add", &token, Some(json!({"time": 300, "power": 5})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (_, body) = h.call("GET", "/programs", &token, None).await;
        assert_eq!(body["programs"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_login_without_body_is_400() {
        let h = Harness::new();

        for req in [
            raw_request("POST", "/login", None, None, ""),
            raw_request("POST", "/login", None, Some("application/json"), "not json"),
        ] {
            let resp = h.send(req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(resp).await["error"], "Username and password are required");
        }
    }

    #[tokio::test]
    async fn test_bad_program_id_in_path_is_400() {
        let h = Harness::new();
        let token = h.token().await;

        let (status, body) = h.call("DELETE", "/programs/abc", &token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (_, body) = h.call("GET", "/programs", &token, None).await;
        assert_eq!(body["programs"].as_array().unwrap().len(), 5);
    }
}
