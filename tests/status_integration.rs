//! Integration tests for the status server.
//!
//! Each test spins up the Axum server on a random port over an in-memory
//! store and exercises the real HTTP contract with reqwest.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;

use kpd_bot::controller::{Action, Controller};
use kpd_bot::session::SessionStore;
use kpd_bot::store::{DayStore, LibSqlBackend};
use kpd_bot::web::{self, StatusState};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start the status server on a random port, return (base url, store).
async fn start_server() -> (String, Arc<LibSqlBackend>) {
    let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let state = StatusState::new(store.clone(), "KpdTestBot");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        web::serve(listener, state).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), store)
}

/// Finalize one day for `user_id` through the controller.
async fn finish_day(store: Arc<LibSqlBackend>, user_id: i64, day: u32, codes: &[&str]) {
    let controller = Controller::new(Arc::new(SessionStore::new()), store)
        .with_today(move || NaiveDate::from_ymd_opt(2024, 1, day).unwrap());
    for code in codes {
        controller
            .handle(Action::SelectCategory {
                user_id,
                option_code: code.to_string(),
            })
            .await;
    }
    controller.handle(Action::Finalize { user_id }).await;
}

async fn get_json(url: &str) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_healthy() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let (status, json) = get_json(&format!("{base}/health")).await;
        assert_eq!(status, 200);
        assert_eq!(json, serde_json::json!({"status": "healthy"}));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn global_stats_on_empty_store() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let (status, json) = get_json(&format!("{base}/api/stats")).await;
        assert_eq!(status, 200);
        assert_eq!(json["status"], "running");
        assert_eq!(json["service"], "productivity-bot");
        assert_eq!(json["database"], "libsql");
        assert_eq!(json["users_count"], 0);
        assert_eq!(json["days_count"], 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn global_stats_reflect_finalized_days() {
    timeout(TEST_TIMEOUT, async {
        let (base, store) = start_server().await;
        let perfect = ["sleep_7plus", "workout_full", "wakeup_early", "python_1h"];
        finish_day(store.clone(), 1, 1, &perfect).await;
        finish_day(store.clone(), 1, 2, &["sleep_6_7", "workout_full"]).await;
        finish_day(store.clone(), 2, 1, &["sleep_7plus"]).await;

        let (_, json) = get_json(&format!("{base}/api/stats")).await;
        assert_eq!(json["users_count"], 2);
        assert_eq!(json["days_count"], 3);
        assert_eq!(json["perfect_days"], 1);
        // (100 + 40 + 30) / 3
        assert_eq!(json["avg_score"], 56.7);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn user_stats_and_missing_user() {
    timeout(TEST_TIMEOUT, async {
        let (base, store) = start_server().await;
        let perfect = ["sleep_7plus", "workout_full", "wakeup_early", "python_1h"];
        finish_day(store.clone(), 9, 1, &perfect).await;
        finish_day(store.clone(), 9, 2, &["sleep_6_7", "workout_full"]).await;

        let (status, json) = get_json(&format!("{base}/api/stats/9")).await;
        assert_eq!(status, 200);
        assert_eq!(json["days_count"], 2);
        assert_eq!(json["avg_score"], 70.0);
        assert_eq!(json["perfect_days"], 1);
        assert_eq!(json["good_days"], 1);

        let (status, _) = get_json(&format!("{base}/api/stats/10")).await;
        assert_eq!(status, 404);

        assert!(store.query_aggregate(10).await.unwrap().is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn dashboard_renders_html() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let resp = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/html"));
        let body = resp.text().await.unwrap();
        assert!(body.contains("@KpdTestBot"));
        assert!(body.contains("Days tracked"));
    })
    .await
    .expect("test timed out");
}
