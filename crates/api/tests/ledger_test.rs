//! Category, transaction and summary tests over the in-memory store.

mod common;

use axum::http::StatusCode;
use common::{app, get, json_request, post, send, token_for};
use serde_json::{Value, json};

async fn add(app: &axum::Router, token: &str, body: Value) -> (StatusCode, Value) {
    post(app, "/api/budget/transaction", Some(token), body).await
}

#[tokio::test]
async fn test_summary_scenario() {
    let app = app();
    let token = token_for(&app, "alice@example.com", "Smiths").await;

    for body in [
        json!({ "type": "income", "amount": 1000.00, "categoryId": "Salary" }),
        json!({ "type": "expense", "amount": "50.00", "categoryId": "Food", "description": "groceries" }),
        json!({ "type": "bill", "amount": 100, "categoryName": "Utilities" }),
    ] {
        let (status, created) = add(&app, &token, body).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
    }

    let (status, summary) = get(&app, "/api/budget/summary", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["balance"], 850.0);
    assert_eq!(summary["income"], 1000.0);
    assert_eq!(summary["expenses"], 50.0);
    assert_eq!(summary["bills"], 100.0);
    assert_eq!(
        summary["categories"],
        json!([
            { "name": "Salary", "amount": 1000.0 },
            { "name": "Utilities", "amount": 100.0 },
            { "name": "Food", "amount": 50.0 },
        ])
    );
}

#[tokio::test]
async fn test_empty_summary_is_zero() {
    let app = app();
    let token = token_for(&app, "alice@example.com", "Smiths").await;

    let (_, summary) = get(&app, "/api/budget/summary", &token).await;
    assert_eq!(summary["balance"], 0.0);
    assert_eq!(summary["categories"], json!([]));
}

#[tokio::test]
async fn test_add_transaction_response_shape() {
    let app = app();
    let token = token_for(&app, "alice@example.com", "Smiths").await;

    let (status, body) = add(
        &app,
        &token,
        json!({
            "type": "Expense",
            "amount": "12.345",
            "description": "  lunch  ",
            "date": "2024-03-05",
            "categoryId": "Eating Out",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "expense");
    assert_eq!(body["amount"], 12.35);
    assert_eq!(body["description"], "lunch");
    assert!(body["date"].as_str().unwrap().starts_with("2024-03-05T00:00:00"));
    assert_eq!(body["category"]["name"], "Eating Out");
    assert!(body["category"]["id"].is_i64());
}

#[tokio::test]
async fn test_free_text_category_resolves_once() {
    let app = app();
    let token = token_for(&app, "alice@example.com", "Smiths").await;

    let (_, first) = add(&app, &token, json!({ "type": "expense", "amount": 5, "categoryId": "Coffee" })).await;
    let (_, second) = add(&app, &token, json!({ "type": "expense", "amount": 5, "categoryId": " coffee " })).await;
    assert_eq!(first["category"]["id"], second["category"]["id"]);

    let (_, categories) = get(&app, "/api/categories", &token).await;
    assert_eq!(categories.as_array().unwrap().len(), 1);
    assert_eq!(categories[0]["monthly_budget"], 0.0);
}

#[rstest::rstest]
#[case(json!({ "amount": 5, "categoryId": "Food" }), "Type, amount, and category are required")]
#[case(json!({ "type": "expense", "categoryId": "Food" }), "Type, amount, and category are required")]
#[case(json!({ "type": "expense", "amount": 5 }), "Type, amount, and category are required")]
#[case(json!({ "type": "expense", "amount": 5, "categoryId": "Food", "date": "05/03/2024" }), "Invalid date format. Use YYYY-MM-DD")]
#[case(json!({ "type": "expense", "amount": -5, "categoryId": "Food" }), "Amount must be a positive number")]
#[case(json!({ "type": "transfer", "amount": 5, "categoryId": "Food" }), "Invalid transaction type: transfer. Use income, expense or bill")]
#[tokio::test]
async fn test_add_transaction_validation(#[case] body: Value, #[case] message: &str) {
    let app = app();
    let token = token_for(&app, "alice@example.com", "Smiths").await;

    let (status, error) = add(&app, &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "validation_error");
    assert_eq!(error["error"], message);
}

#[tokio::test]
async fn test_explicit_category_id_is_family_scoped() {
    let app = app();
    let ours = token_for(&app, "alice@example.com", "Smiths").await;
    let theirs = token_for(&app, "bob@example.com", "Joneses").await;

    let (status, category) = post(
        &app,
        "/api/categories",
        Some(&theirs),
        json!({ "name": "Private", "monthly_budget": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = add(
        &app,
        &ours,
        json!({ "type": "expense", "amount": 5, "categoryId": category["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_create_category_rules() {
    let app = app();
    let token = token_for(&app, "alice@example.com", "Smiths").await;

    let (status, created) = post(
        &app,
        "/api/categories",
        Some(&token),
        json!({ "name": " Groceries ", "monthly_budget": "400.005" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Groceries");
    assert_eq!(created["monthly_budget"], 400.01);

    let (status, body) = post(&app, "/api/categories", Some(&token), json!({ "name": "groceries" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let (status, _) = post(&app, "/api/categories", Some(&token), json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/api/categories",
        Some(&token),
        json!({ "name": "Rent", "monthly_budget": -1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_listing_is_newest_first_with_placeholder() {
    let app = app();
    let token = token_for(&app, "alice@example.com", "Smiths").await;

    add(&app, &token, json!({ "type": "expense", "amount": 1, "categoryId": "A", "date": "2024-01-01" })).await;
    add(&app, &token, json!({ "type": "income", "amount": 2, "categoryId": "B", "date": "2024-02-01", "description": "pay" })).await;

    let (status, list) = get(&app, "/api/budget/transactions", &token).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["description"], "pay");
    assert_eq!(list[0]["category"], "B");
    assert_eq!(list[0]["type"], "income");
    assert_eq!(list[1]["description"], "No description");
    assert_eq!(list[1]["amount"], 1.0);
}

#[tokio::test]
async fn test_delete_is_scoped_to_family() {
    let app = app();
    let ours = token_for(&app, "alice@example.com", "Smiths").await;
    let theirs = token_for(&app, "bob@example.com", "Joneses").await;

    let (_, created) = add(&app, &theirs, json!({ "type": "expense", "amount": 5, "categoryId": "Food" })).await;
    let uri = format!("/api/budget/transaction/{}", created["id"]);

    for target in [uri.as_str(), "/api/budget/transaction/999999", "/api/budget/transaction/abc"] {
        let (status, body) = send(&app, json_request("DELETE", target, Some(&ours), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Transaction not found or access denied");
    }

    let (_, list) = get(&app, "/api/budget/transactions", &theirs).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, json_request("DELETE", &uri, Some(&theirs), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Transaction deleted successfully");

    let (_, list) = get(&app, "/api/budget/transactions", &theirs).await;
    assert!(list.as_array().unwrap().is_empty());
}
