mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{create_user, record_standard_history, test_service};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use walletbook::api;
use walletbook::domain::User;

async fn test_app() -> Result<(Router, Arc<walletbook::LedgerService>, TempDir)> {
    let (service, temp) = test_service().await?;
    let service = Arc::new(service);
    Ok((api::router(Arc::clone(&service)), service, temp))
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn signed_up(app: &Router) -> Result<String> {
    let (status, body) = send(
        app,
        post_json(
            "/api/wallet/user/create",
            json!({
                "firstname": "Ada",
                "lastname": "Lovelace",
                "username": "ada",
                "email": "ada@example.com"
            }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(body["userDetails"]["uuid"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn test_user_lifecycle_over_http() -> Result<()> {
    let (app, _service, _temp) = test_app().await?;
    let uuid = signed_up(&app).await?;

    let (status, body) = send(&app, get(&format!("/api/wallet/user/{}", uuid))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["returnStatus"], "S");
    assert_eq!(body["userDetails"]["username"], "ada");
    assert_eq!(body["userDetails"]["status"], "active");
    assert!(body["userDetails"]["created"].as_str().unwrap().ends_with('Z'));

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/wallet/user/{}/status", uuid),
            json!({ "status": "suspended" }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["status"], "suspended");

    Ok(())
}

#[tokio::test]
async fn test_create_user_missing_field() -> Result<()> {
    let (app, _service, _temp) = test_app().await?;

    let (status, body) = send(
        &app,
        post_json("/api/wallet/user/create", json!({ "firstname": "Ada" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["returnStatus"], "E");
    assert_eq!(body["error"], "missing_field");

    Ok(())
}

#[tokio::test]
async fn test_record_and_read_balance() -> Result<()> {
    let (app, _service, _temp) = test_app().await?;
    let uuid = signed_up(&app).await?;

    for (kind, amount) in [("deposit", json!(100)), ("withdrawal", json!(-30)), ("deposit", json!("50.00"))] {
        let (status, body) = send(
            &app,
            post_json(
                "/api/wallet/transaction",
                json!({ "user_uuid": uuid, "type": kind, "amount": amount }),
            ),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["returnStatus"], "S");
        assert_eq!(body["transaction"]["type"], kind);
    }

    let (status, body) = send(&app, get(&format!("/api/wallet/user/{}/balance", uuid))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"]["amount"], "120.00");

    let (status, body) = send(
        &app,
        get(&format!("/api/wallet/user/{}/transactions", uuid)),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let rows = body["transactions"].as_array().unwrap();
    let balances: Vec<&str> = rows
        .iter()
        .map(|t| t["transaction_balance"].as_str().unwrap())
        .collect();
    assert_eq!(balances, vec!["100.00", "70.00", "120.00"]);

    let first = &rows[0];
    assert_eq!(first["order_uid"], uuid.as_str());
    assert_eq!(first["type"], "deposit");
    assert_eq!(first["value"], "100.00");
    assert!(first["uuid"].as_str().unwrap().parse::<i64>().is_ok());
    assert!(first["created"].as_str().unwrap().ends_with('Z'));
    assert!(first["modified"].as_str().unwrap().ends_with('Z'));

    let (status, body) = send(
        &app,
        get(&format!("/api/wallet/user/{}/transactions?type=deposit", uuid)),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);
    assert_eq!(body["transactions"][1]["transaction_balance"], "150.00");

    Ok(())
}

#[tokio::test]
async fn test_record_rejections() -> Result<()> {
    let (app, service, _temp) = test_app().await?;
    let uuid = signed_up(&app).await?;

    let (status, body) = send(
        &app,
        post_json(
            "/api/wallet/transaction",
            json!({ "user_uuid": uuid, "type": "deposit" }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_field");

    let (status, body) = send(
        &app,
        post_json(
            "/api/wallet/transaction",
            json!({ "user_uuid": uuid, "type": "deposit", "amount": "lots" }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_amount");

    let (status, body) = send(
        &app,
        post_json(
            "/api/wallet/transaction",
            json!({
                "user_uuid": "00000000-0000-4000-8000-000000000000",
                "type": "deposit",
                "amount": 10
            }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "user_not_found");

    let request = Request::builder()
        .method("POST")
        .uri("/api/wallet/transaction")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["returnStatus"], "E");

    assert_eq!(service.transaction_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_listing_without_transactions_is_not_found() -> Result<()> {
    let (app, _service, _temp) = test_app().await?;
    let uuid = signed_up(&app).await?;

    let (status, body) = send(
        &app,
        get(&format!("/api/wallet/user/{}/transactions", uuid)),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no_transactions");

    Ok(())
}

#[tokio::test]
async fn test_reverse_over_http() -> Result<()> {
    let (app, service, _temp) = test_app().await?;
    let user: User = create_user(&service, "grace").await?;
    record_standard_history(&service, &user).await?;
    let entries = service.list_transactions(&user.id.to_string(), None).await?;
    let withdrawal_id = entries[1].transaction.id;

    let (status, body) = send(
        &app,
        post_json(
            "/api/wallet/transaction/reverse",
            json!({ "transaction_uuid": withdrawal_id }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transaction"]["status"], "reversed");
    assert_eq!(body["transaction"]["reversal"]["amount"], "30.00");
    assert_eq!(body["transaction"]["reversal"]["reverses"], withdrawal_id);
    assert_eq!(body["transaction"]["balance"], "150.00");

    let (status, body) = send(
        &app,
        post_json(
            "/api/wallet/transaction/reverse",
            json!({ "transaction_uuid": withdrawal_id.to_string() }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_reversed");

    let (status, body) = send(
        &app,
        post_json("/api/wallet/transaction/reverse", json!({})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_identifier");

    Ok(())
}

#[tokio::test]
async fn test_status_update_for_unknown_user() -> Result<()> {
    let (app, _service, _temp) = test_app().await?;

    for id in ["00000000-0000-4000-8000-000000000000", "not-a-uuid"] {
        let (status, body) = send(
            &app,
            post_json(
                &format!("/api/wallet/user/{}/status", id),
                json!({ "status": "suspended" }),
            ),
        )
        .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["returnStatus"], "E");
        assert_eq!(body["error"], "user_not_found");
    }

    Ok(())
}

#[tokio::test]
async fn test_bad_query_string_uses_error_envelope() -> Result<()> {
    let (app, _service, _temp) = test_app().await?;
    let uuid = signed_up(&app).await?;

    let (status, body) = send(
        &app,
        get(&format!(
            "/api/wallet/user/{}/transactions?type=deposit&type=withdrawal",
            uuid
        )),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["returnStatus"], "E");
    assert_eq!(body["error"], "invalid_request");

    Ok(())
}
