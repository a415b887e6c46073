//! Integration tests for the gate API endpoints
//!
//! These tests exercise the full HTTP surface against in-memory storage and
//! a programmable payment verifier.

use axum::http::{header::AUTHORIZATION, HeaderValue};
use axum_test::TestServer;
use serde_json::json;
use std::sync::Arc;
use wellgate_api::{create_router, AppState};
use wellgate_core::storage::MemoryStorage;
use wellgate_core::types::{week_start, Timestamp, VerifiedTransfer, XpActivity};
use wellgate_core::{AppConfig, FakeVerifier};

const PAY_TO: &str = "0x00000000000000000000000000000000000000a1";

/// Create test app state with in-memory storage
fn create_test_state(operator_token: Option<&str>) -> (AppState, FakeVerifier) {
    let storage = Arc::new(MemoryStorage::new());
    let verifier = FakeVerifier::new();
    let config = AppConfig::development();
    let state = AppState::new(
        &config,
        storage,
        Arc::new(verifier.clone()),
        operator_token.map(str::to_string),
    )
    .unwrap();
    (state, verifier)
}

/// Create test server
fn create_test_server() -> (TestServer, AppState, FakeVerifier) {
    let (state, verifier) = create_test_state(None);
    let router = create_router(state.clone());
    (TestServer::new(router).unwrap(), state, verifier)
}

fn transfer(tx_hash: &str, amount: u128) -> VerifiedTransfer {
    VerifiedTransfer {
        tx_hash: tx_hash.to_string(),
        from: format!("0x{}", "11".repeat(20)),
        to: PAY_TO.to_string(),
        amount,
        asset: None,
        block_number: 42,
        block_timestamp: Timestamp::now(),
    }
}

/// Burn through the free tier and return the challenge body from the 402
async fn exhaust_free_tier(server: &TestServer, user: &str) -> serde_json::Value {
    for _ in 0..3 {
        let response = server.post("/access").json(&json!({ "user_id": user })).await;
        response.assert_status_ok();
    }
    let response = server.post("/access").json(&json!({ "user_id": user })).await;
    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    response.json()
}

// ============ Health Endpoint Tests ============

#[tokio::test]
async fn test_health_check() {
    let (server, _state, _verifier) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"]["total_accounts"], 0);
}

#[tokio::test]
async fn test_metrics_export() {
    let (server, _state, _verifier) = create_test_server();

    server
        .post("/access")
        .json(&json!({ "user_id": "metrics-user" }))
        .await
        .assert_status_ok();

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("wellgate_access_free_total 1"));
}

// ============ Access & Settlement Tests ============

#[tokio::test]
async fn test_free_tier_then_challenge() {
    let (server, _state, _verifier) = create_test_server();

    for remaining in [2, 1, 0] {
        let response = server
            .post("/access")
            .json(&json!({ "user_id": "user-1" }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["decision"], "free");
        assert_eq!(body["remaining"], remaining);
    }

    let response = server
        .post("/access")
        .json(&json!({ "user_id": "user-1" }))
        .await;
    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "PAYMENT_REQUIRED");
    assert_eq!(body["challenge"]["amount"], "1000");
    assert_eq!(body["challenge"]["pay_to"], PAY_TO);

    // A second request reuses the open challenge
    let again = server
        .post("/access")
        .json(&json!({ "user_id": "user-1" }))
        .await;
    let again: serde_json::Value = again.json();
    assert_eq!(
        again["challenge"]["request_id"],
        body["challenge"]["request_id"]
    );
}

#[tokio::test]
async fn test_settle_grants_credits_then_covers_access() {
    let (server, _state, verifier) = create_test_server();

    let challenge = exhaust_free_tier(&server, "user-1").await;
    let request_id = challenge["challenge"]["request_id"].as_str().unwrap();

    let tx = format!("0x{}", "ab".repeat(32));
    verifier.add_transfer(transfer(&tx, 1_000)).await;

    let response = server
        .post("/payments/settle")
        .json(&json!({
            "request_id": request_id,
            "tx_hash": tx,
            "chain_id": challenge["challenge"]["chain_id"],
            "signed_at": Timestamp::now().as_millis(),
        }))
        .await;
    response.assert_status_ok();
    let account: serde_json::Value = response.json();
    assert_eq!(account["prepaid_credits"], 10);

    let response = server
        .post("/access")
        .json(&json!({ "user_id": "user-1" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["decision"], "covered");
    assert_eq!(body["credits_remaining"], 9);

    // Request status is now settled
    let response = server.get(&format!("/payments/{}", request_id)).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "settled");
}

#[tokio::test]
async fn test_settle_underpayment_rejected() {
    let (server, _state, verifier) = create_test_server();

    let challenge = exhaust_free_tier(&server, "user-1").await;
    let request_id = challenge["challenge"]["request_id"].as_str().unwrap();

    let tx = format!("0x{}", "ab".repeat(32));
    verifier.add_transfer(transfer(&tx, 999)).await;

    let response = server
        .post("/payments/settle")
        .json(&json!({
            "request_id": request_id,
            "tx_hash": tx,
            "chain_id": challenge["challenge"]["chain_id"],
            "signed_at": Timestamp::now().as_millis(),
        }))
        .await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AMOUNT_BELOW_MINIMUM");
}

#[tokio::test]
async fn test_replayed_tx_hash_rejected_across_users() {
    let (server, _state, verifier) = create_test_server();

    let first = exhaust_free_tier(&server, "user-1").await;
    let second = exhaust_free_tier(&server, "user-2").await;

    let tx = format!("0x{}", "ab".repeat(32));
    verifier.add_transfer(transfer(&tx, 1_000)).await;

    server
        .post("/payments/settle")
        .json(&json!({
            "request_id": first["challenge"]["request_id"],
            "tx_hash": tx,
            "chain_id": first["challenge"]["chain_id"],
            "signed_at": Timestamp::now().as_millis(),
        }))
        .await
        .assert_status_ok();

    let response = server
        .post("/payments/settle")
        .json(&json!({
            "request_id": second["challenge"]["request_id"],
            "tx_hash": tx,
            "chain_id": second["challenge"]["chain_id"],
            "signed_at": Timestamp::now().as_millis(),
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "ALREADY_CONSUMED");
}

#[tokio::test]
async fn test_settle_rejects_stale_or_crosschain_proof() {
    let (server, _state, verifier) = create_test_server();

    let challenge = exhaust_free_tier(&server, "user-1").await;
    let request_id = challenge["challenge"]["request_id"].as_str().unwrap();

    let tx = format!("0x{}", "ab".repeat(32));
    verifier.add_transfer(transfer(&tx, 1_000)).await;

    // Proof signed ten minutes ago: outside the 5 minute window
    let response = server
        .post("/payments/settle")
        .json(&json!({
            "request_id": request_id,
            "tx_hash": tx,
            "chain_id": challenge["challenge"]["chain_id"],
            "signed_at": Timestamp::now().as_millis() - 600_000,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "PROOF_OUT_OF_WINDOW");

    // Proof for a chain other than the one in the challenge
    let response = server
        .post("/payments/settle")
        .json(&json!({
            "request_id": request_id,
            "tx_hash": tx,
            "chain_id": 1,
            "signed_at": Timestamp::now().as_millis(),
        }))
        .await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "WRONG_CHAIN");
}

#[tokio::test]
async fn test_settle_invalid_request_id() {
    let (server, _state, _verifier) = create_test_server();

    let response = server
        .post("/payments/settle")
        .json(&json!({
            "request_id": "zz",
            "tx_hash": format!("0x{}", "ab".repeat(32)),
            "chain_id": 31337,
            "signed_at": Timestamp::now().as_millis(),
        }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_get_request_not_found() {
    let (server, _state, _verifier) = create_test_server();

    let response = server.get(&format!("/payments/{}", "00".repeat(32))).await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_resources_have_isolated_quotas() {
    let (server, _state, _verifier) = create_test_server();

    // Exhaust the daily allotment on one resource
    for _ in 0..3 {
        server
            .post("/access")
            .json(&json!({ "user_id": "user-1", "resource": "agent_message" }))
            .await
            .assert_status_ok();
    }
    let response = server
        .post("/access")
        .json(&json!({ "user_id": "user-1", "resource": "agent_message" }))
        .await;
    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["challenge"]["resource"], "agent_message");
    assert_eq!(body["challenge"]["description"], "10 uses of agent_message");

    // A different resource still has its full allotment
    let response = server
        .post("/access")
        .json(&json!({ "user_id": "user-1", "resource": "deep_report" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["decision"], "free");
    assert_eq!(body["remaining"], 2);

    // Per-resource account state
    let response = server
        .get("/accounts/user-1")
        .add_query_param("resource", "agent_message")
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["resource"], "agent_message");
    assert_eq!(body["free_uses_used_today"], 3);
    assert_eq!(body["free_daily_limit"], 3);
}

#[tokio::test]
async fn test_statically_free_resource_bypasses_quota() {
    let storage = Arc::new(MemoryStorage::new());
    let verifier = FakeVerifier::new();
    let mut config = AppConfig::development();
    config.gate.resource_prices.insert("lobby".to_string(), 0);
    let state = AppState::new(&config, storage, Arc::new(verifier), None).unwrap();
    let server = TestServer::new(create_router(state)).unwrap();

    // Zero-priced resources never run out
    for _ in 0..5 {
        let response = server
            .post("/access")
            .json(&json!({ "user_id": "user-1", "resource": "lobby" }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["decision"], "free");
        assert_eq!(body["remaining"], 3);
    }

    // And never dent the paid resources' allotment
    let response = server
        .post("/access")
        .json(&json!({ "user_id": "user-1", "resource": "agent_message" }))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["remaining"], 2);
}

// ============ XP Endpoint Tests ============

#[tokio::test]
async fn test_award_and_level_thresholds() {
    let (server, _state, _verifier) = create_test_server();

    // First badge crosses the 100 XP threshold to level 1
    let response = server
        .post("/xp/awards")
        .json(&json!({
            "user_id": "user-1",
            "activity": "badge_earned",
            "metadata": { "badge": "first-week" }
        }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["xp_awarded"], 100);
    assert_eq!(body["leveled_up"], true);

    // Second badge stays within level 1
    let response = server
        .post("/xp/awards")
        .json(&json!({ "user_id": "user-1", "activity": "badge_earned" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["leveled_up"], false);

    let response = server.get("/xp/user-1").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_xp"], 200);
    assert_eq!(body["level"], 1);
    assert_eq!(body["xp_to_next_level"], 200);
    // Both awards landed today: a 1-day streak, a third into level 1
    assert_eq!(body["streak_days"], 1);
    assert_eq!(body["progress_pct"], 33);

    // 2 more badges crosses the 400 XP threshold to level 2
    for _ in 0..2 {
        server
            .post("/xp/awards")
            .json(&json!({ "user_id": "user-1", "activity": "badge_earned" }))
            .await
            .assert_status_ok();
    }

    let response = server.get("/xp/user-1").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_xp"], 400);
    assert_eq!(body["level"], 2);

    let response = server.get("/xp/user-1/history").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["awards"].as_array().unwrap().len(), 4);
    assert_eq!(body["awards"][0]["activity"], "badge_earned");
    assert_eq!(body["awards"][0]["xp"], 100);
    assert_eq!(body["awards"][0]["metadata"]["badge"], "first-week");
    assert!(body["awards"][1].get("metadata").is_none());
}

#[tokio::test]
async fn test_xp_summary_unknown_user() {
    let (server, _state, _verifier) = create_test_server();

    let response = server.get("/xp/nobody").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_xp"], 0);
    assert_eq!(body["level"], 0);
    assert_eq!(body["streak_days"], 0);
}

// ============ Redemption Endpoint Tests ============

#[tokio::test]
async fn test_redeem_xp_for_tokens() {
    let (server, _state, _verifier) = create_test_server();

    // 10 badges = 1000 XP, level 3, no bonus tier
    for _ in 0..10 {
        server
            .post("/xp/awards")
            .json(&json!({ "user_id": "user-1", "activity": "badge_earned" }))
            .await
            .assert_status_ok();
    }

    let response = server
        .post("/redemptions")
        .json(&json!({ "user_id": "user-1", "xp": 1000 }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["tokens"], 100);
    assert_eq!(body["level_bonus_bps"], 0);
    // All awards landed today, a 1-day streak earns no bonus
    assert_eq!(body["streak_bonus_bps"], 0);
    assert_eq!(body["spendable_xp_remaining"], 0);

    // Lifetime XP and level survive the debit
    let response = server.get("/xp/user-1").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_xp"], 1000);
    assert_eq!(body["spendable_xp"], 0);
    assert_eq!(body["level"], 3);

    let response = server.get("/redemptions/user-1").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["redemptions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_redeem_below_minimum() {
    let (server, _state, _verifier) = create_test_server();

    server
        .post("/xp/awards")
        .json(&json!({ "user_id": "user-1", "activity": "badge_earned" }))
        .await
        .assert_status_ok();

    let response = server
        .post("/redemptions")
        .json(&json!({ "user_id": "user-1", "xp": 50 }))
        .await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "BELOW_MINIMUM_REDEEM");
}

#[tokio::test]
async fn test_redeem_daily_cap_rejected_in_full() {
    let (server, _state, _verifier) = create_test_server();

    // 30 badges = 3000 XP, level 5 (+10% bonus)
    for _ in 0..30 {
        server
            .post("/xp/awards")
            .json(&json!({ "user_id": "user-1", "activity": "badge_earned" }))
            .await
            .assert_status_ok();
    }

    // 2000 XP at +10% = 220 tokens; 30 remain under the 250 daily cap
    let response = server
        .post("/redemptions")
        .json(&json!({ "user_id": "user-1", "xp": 2000 }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["tokens"], 220);

    // 500 XP would mint 55 tokens; rejected in full, nothing partial
    let response = server
        .post("/redemptions")
        .json(&json!({ "user_id": "user-1", "xp": 500 }))
        .await;
    response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DAILY_CAP_EXCEEDED");

    let response = server.get("/xp/user-1").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["spendable_xp"], 1000);

    // Cap headroom is visible through the status endpoint
    let response = server.get("/redemptions/user-1/status").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["daily_cap_tokens"], 250);
    assert_eq!(body["tokens_redeemed_24h"], 220);
    assert_eq!(body["tokens_remaining_24h"], 30);
    assert_eq!(body["level_bonus_bps"], 1000);
    assert_eq!(body["spendable_xp"], 1000);
}

// ============ Weekly Pool Endpoint Tests ============

#[tokio::test]
async fn test_pool_distribution_splits_proportionally() {
    let (server, state, _verifier) = create_test_server();

    let week = Timestamp::now().week_index() - 1;
    let at = Timestamp::from_millis(week_start(week).as_millis() + 1_000);

    // 100 / 200 / 700 XP inside the elapsed week
    for (user, badges) in [("user-a", 1), ("user-b", 2), ("user-c", 7)] {
        for _ in 0..badges {
            state
                .xp
                .award_at(&user.to_string(), XpActivity::BadgeEarned, None, at)
                .await
                .unwrap();
        }
    }

    let response = server
        .post("/pool/distribute")
        .json(&json!({ "week_index": week }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["week_index"], week);
    assert_eq!(body["total_distributed"], 50_000);

    let payouts = body["payouts"].as_array().unwrap();
    assert_eq!(payouts.len(), 3);
    assert_eq!(payouts[0]["user_id"], "user-a");
    assert_eq!(payouts[0]["amount"], 5_000);
    assert_eq!(payouts[1]["amount"], 10_000);
    assert_eq!(payouts[2]["amount"], 35_000);

    // Second distribution attempt conflicts
    let response = server
        .post("/pool/distribute")
        .json(&json!({ "week_index": week }))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "ALREADY_DISTRIBUTED");

    // Payouts remain queryable
    let response = server.get(&format!("/pool/{}", week)).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_distributed"], 50_000);
    assert_eq!(body["payouts"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_pool_current_week_not_elapsed() {
    let (server, _state, _verifier) = create_test_server();

    let week = Timestamp::now().week_index();
    let response = server
        .post("/pool/distribute")
        .json(&json!({ "week_index": week }))
        .await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "WINDOW_NOT_ELAPSED");
}

#[tokio::test]
async fn test_pool_status_estimates_current_week() {
    let (server, _state, _verifier) = create_test_server();

    // 100 / 300 XP in the current week
    for (user, badges) in [("user-a", 1), ("user-b", 3)] {
        for _ in 0..badges {
            server
                .post("/xp/awards")
                .json(&json!({ "user_id": user, "activity": "badge_earned" }))
                .await
                .assert_status_ok();
        }
    }

    let response = server
        .get("/pool/status")
        .add_query_param("user_id", "user-a")
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["week_index"], Timestamp::now().week_index());
    assert_eq!(body["pool_amount"], 50_000);
    assert_eq!(body["total_xp"], 400);
    assert_eq!(body["participants"], 2);
    assert_eq!(body["distributed"], false);
    assert_eq!(body["user_xp"], 100);
    assert_eq!(body["user_estimated_share"], 12_500);

    let leaderboard = body["leaderboard"].as_array().unwrap();
    assert_eq!(leaderboard[0]["user_id"], "user-b");
    assert_eq!(leaderboard[0]["estimated_share"], 37_500);
    assert_eq!(leaderboard[1]["user_id"], "user-a");
}

#[tokio::test]
async fn test_pool_not_distributed_not_found() {
    let (server, _state, _verifier) = create_test_server();

    let response = server.get("/pool/12").await;
    response.assert_status_not_found();
}

// ============ Operator Auth Tests ============

#[tokio::test]
async fn test_operator_endpoints_require_token() {
    let (state, _verifier) = create_test_state(Some("operator-secret"));
    let server = TestServer::new(create_router(state)).unwrap();

    // Missing token
    let response = server
        .post("/xp/awards")
        .json(&json!({ "user_id": "user-1", "activity": "check_in" }))
        .await;
    response.assert_status_unauthorized();

    // Wrong token
    let response = server
        .post("/xp/awards")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer nope"))
        .json(&json!({ "user_id": "user-1", "activity": "check_in" }))
        .await;
    response.assert_status_unauthorized();

    // Correct token
    let response = server
        .post("/xp/awards")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer operator-secret"),
        )
        .json(&json!({ "user_id": "user-1", "activity": "check_in" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_xp"], 10);

    // Redemption mutates balances, so it is operator-gated too
    let response = server
        .post("/redemptions")
        .json(&json!({ "user_id": "user-1", "xp": 100 }))
        .await;
    response.assert_status_unauthorized();

    server
        .post("/xp/awards")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer operator-secret"),
        )
        .json(&json!({ "user_id": "user-1", "activity": "badge_earned" }))
        .await
        .assert_status_ok();
    let response = server
        .post("/redemptions")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer operator-secret"),
        )
        .json(&json!({ "user_id": "user-1", "xp": 100 }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["tokens"], 10);

    // Non-operator endpoints stay open, status reads included
    server
        .post("/access")
        .json(&json!({ "user_id": "user-1" }))
        .await
        .assert_status_ok();
    server
        .get("/redemptions/user-1/status")
        .await
        .assert_status_ok();
}
