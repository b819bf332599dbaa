//! Dashboard — Axum web server for the admin back office.
//!
//! Serves a REST API and a self-contained HTML overview page.
//! CORS enabled for local development.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

/// The embedded overview page (compiled into the binary).
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Start the dashboard web server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_dashboard(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "Dashboard server starting on http://localhost:{port}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind dashboard port");

        axum::serve(listener, app)
            .await
            .expect("Dashboard server error");
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // API routes
        .route("/api/overview", get(routes::get_overview))
        .route(
            "/api/users/:user_id/transactions",
            get(routes::get_user_transactions),
        )
        .route(
            "/api/transactions/:tx_id/status",
            post(routes::post_transaction_status),
        )
        .route("/api/users/:user_id/tier", get(routes::get_user_tier))
        .route(
            "/api/users/:user_id/investments",
            get(routes::get_user_investments),
        )
        .route("/api/users/:user_id/shares", get(routes::get_user_shares))
        .route("/health", get(routes::health))
        // Overview HTML
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

/// Serve the embedded HTML page.
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ledger::new_transaction, Ledger, MemoryStore};
    use crate::types::{Profile, TxStatus, TxType};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use routes::DashboardState;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> (AppState, Ledger) {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        (
            Arc::new(DashboardState::new("MERIDIAN-TEST", ledger.clone())),
            ledger,
        )
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _) = test_state();
        let app = build_router(state);
        let resp = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_overview_endpoint() {
        let (state, ledger) = test_state();
        ledger
            .create_profile(&Profile::sample("u1", dec!(100), dec!(100)))
            .await
            .unwrap();

        let app = build_router(state);
        let resp = app.oneshot(get_request("/api/overview")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["total_users"], 1);
    }

    #[tokio::test]
    async fn test_transactions_endpoint() {
        let (state, ledger) = test_state();
        let tx = new_transaction("u1", TxType::Deposit, dec!(500), "BTC", TxStatus::Pending, None);
        ledger.create_transaction(&tx).await.unwrap();

        let app = build_router(state);
        let resp = app
            .oneshot(get_request("/api/users/u1/transactions"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let json: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.len(), 1);
        assert_eq!(json[0]["status"], "pending");
    }

    #[tokio::test]
    async fn test_status_transition_endpoint() {
        let (state, ledger) = test_state();
        ledger
            .create_profile(&Profile::sample("u1", dec!(100), dec!(100)))
            .await
            .unwrap();
        let mut tx =
            new_transaction("u1", TxType::Deposit, dec!(500), "BTC", TxStatus::Pending, None);
        tx.id = "t1".into();
        ledger.create_transaction(&tx).await.unwrap();

        let app = build_router(state);
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/transactions/t1/status")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"status":"approved"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["old_status"], "pending");
        assert_eq!(json["new_status"], "approved");

        let profile = ledger.profile_by_user("u1").await.unwrap();
        assert_eq!(profile.balance, dec!(600));
        assert_eq!(profile.total_deposit, dec!(600));
    }

    #[tokio::test]
    async fn test_status_transition_unknown_tx_is_404() {
        let (state, _) = test_state();
        let app = build_router(state);
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/transactions/ghost/status")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"status":"approved"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tier_endpoint() {
        let (state, ledger) = test_state();
        ledger
            .create_profile(&Profile::sample("u1", dec!(1200), dec!(1200)))
            .await
            .unwrap();

        let app = build_router(state);
        let resp = app.oneshot(get_request("/api/users/u1/tier")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        // No approved deposits and no referrals: base of the ladder.
        assert_eq!(json["active"]["name"], "Bronze");
    }

    #[tokio::test]
    async fn test_investments_endpoint() {
        let (state, _) = test_state();
        let app = build_router(state);
        let resp = app
            .oneshot(get_request("/api/users/u1/investments"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_shares_endpoint_requires_price() {
        let (state, _) = test_state();
        let app = build_router(state.clone());
        let resp = app
            .oneshot(get_request("/api/users/u1/shares"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let app = build_router(state);
        let resp = app
            .oneshot(get_request("/api/users/u1/shares?price=250"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dashboard_html() {
        let (state, _) = test_state();
        let app = build_router(state);
        let resp = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("MERIDIAN"));
    }
}
