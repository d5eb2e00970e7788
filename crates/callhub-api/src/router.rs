//! Route definitions for the CallHub HTTP API.
//!
//! REST routes are mounted under `/api`; the signaling WebSocket lives at
//! `/ws`.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(presence_routes())
        .merge(call_routes())
        .merge(admin_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    let cors = build_cors_layer(&state.config.server);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Presence queries and engine stats
fn presence_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/presence/me/friends",
            get(handlers::presence::online_friends),
        )
        .route("/presence/{user_id}", get(handlers::presence::get_presence))
        .route("/realtime/stats", get(handlers::presence::realtime_stats))
}

/// Call lookups for the bearer
fn call_routes() -> Router<AppState> {
    Router::new()
        .route("/calls/active", get(handlers::calls::active_call))
        .route("/calls/history", get(handlers::calls::call_history))
        .route("/calls/{call_id}", get(handlers::calls::get_call))
}

/// Administrative actions
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/connections", get(handlers::admin::list_connections))
        .route(
            "/admin/presence/{user_id}/offline",
            post(handlers::admin::force_offline),
        )
}

/// Liveness
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use callhub_core::config::AppConfig;
    use callhub_core::error::AppError;
    use callhub_core::result::AppResult;
    use callhub_core::traits::CredentialService;
    use callhub_core::types::{AuthenticatedUser, UserId, UserRole};
    use callhub_database::{MemoryCallStore, MemoryUserDirectory};
    use callhub_realtime::server::RealtimeEngine;

    use super::*;

    #[derive(Debug, Default)]
    struct StaticCredentials {
        tokens: HashMap<String, AuthenticatedUser>,
    }

    #[async_trait]
    impl CredentialService for StaticCredentials {
        async fn verify(&self, token: &str) -> AppResult<AuthenticatedUser> {
            self.tokens
                .get(token)
                .cloned()
                .ok_or_else(|| AppError::authentication("Invalid token"))
        }
    }

    struct Fixture {
        router: Router,
        engine: Arc<RealtimeEngine>,
        bob: UserId,
    }

    async fn fixture() -> Fixture {
        let directory = MemoryUserDirectory::new();
        let alice = directory.add_user("alice").await;
        let bob = directory.add_user("bob").await;
        directory.add_friendship(alice, bob).await;

        let config = AppConfig::default();
        let engine = Arc::new(RealtimeEngine::new(
            &config,
            Arc::new(directory),
            Arc::new(MemoryCallStore::new()),
        ));

        let mut tokens = HashMap::new();
        tokens.insert(
            "alice-token".to_string(),
            AuthenticatedUser {
                user_id: alice,
                username: "alice".to_string(),
                role: UserRole::User,
            },
        );
        tokens.insert(
            "admin-token".to_string(),
            AuthenticatedUser {
                user_id: UserId::new(),
                username: "root".to_string(),
                role: UserRole::Admin,
            },
        );

        let state = AppState::new(
            Arc::new(config),
            engine.clone(),
            Arc::new(StaticCredentials { tokens }),
        );

        Fixture {
            router: build_router(state),
            engine,
            bob,
        }
    }

    async fn send(router: &Router, method: &str, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        let response = router
            .clone()
            .oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let f = fixture().await;
        let (status, body) = send(&f.router, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_presence_requires_bearer() {
        let f = fixture().await;
        let uri = format!("/api/presence/{}", f.bob);
        let (status, body) = send(&f.router, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "AUTHENTICATION");

        let (status, _) = send(&f.router, "GET", &uri, Some("bogus")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_presence_and_online_friends() {
        let f = fixture().await;
        f.engine
            .presence
            .set_online(f.bob, callhub_core::types::ConnectionId::new())
            .await;

        let uri = format!("/api/presence/{}", f.bob);
        let (status, body) = send(&f.router, "GET", &uri, Some("alice-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["online"], true);

        let (status, body) =
            send(&f.router, "GET", "/api/presence/me/friends", Some("alice-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["online_friends"][0], f.bob.to_string());
    }

    #[tokio::test]
    async fn test_unknown_call_is_not_found() {
        let f = fixture().await;
        let uri = format!("/api/calls/{}", callhub_core::types::CallId::new());
        let (status, body) = send(&f.router, "GET", &uri, Some("alice-token")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");

        let (status, body) = send(&f.router, "GET", "/api/calls/active", Some("alice-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_force_offline_requires_admin() {
        let f = fixture().await;
        f.engine
            .presence
            .set_online(f.bob, callhub_core::types::ConnectionId::new())
            .await;
        let uri = format!("/api/admin/presence/{}/offline", f.bob);

        let (status, _) = send(&f.router, "POST", &uri, Some("alice-token")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(f.engine.presence.is_online(f.bob));

        let (status, body) = send(&f.router, "POST", &uri, Some("admin-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["was_online"], true);
        assert!(!f.engine.presence.is_online(f.bob));
    }

    #[tokio::test]
    async fn test_admin_lists_live_connections() {
        let f = fixture().await;
        let (handle, _outbound) = f.engine.registry.register(&AuthenticatedUser {
            user_id: f.bob,
            username: "bob".to_string(),
            role: UserRole::User,
        });

        let (status, _) = send(&f.router, "GET", "/api/admin/connections", Some("alice-token")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&f.router, "GET", "/api/admin/connections", Some("admin-token")).await;
        assert_eq!(status, StatusCode::OK);
        let connections = body["data"].as_array().expect("list");
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0]["id"], handle.id.to_string());
        assert_eq!(connections[0]["username"], "bob");
        assert_eq!(connections[0]["alive"], true);
    }

    #[tokio::test]
    async fn test_stats_reports_counts() {
        let f = fixture().await;
        let (status, body) = send(&f.router, "GET", "/api/realtime/stats", Some("alice-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_connections"], 0);
        assert_eq!(body["data"]["active_rooms"], 0);
    }
}
