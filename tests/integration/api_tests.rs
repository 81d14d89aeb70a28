//! API integration tests
//!
//! These run against a live server started with an administrator account,
//! e.g. `LIBRARY_AUTH__ADMIN_PASSWORD=administrator`.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn admin_password() -> String {
    std::env::var("LIBRARY_AUTH__ADMIN_PASSWORD").unwrap_or_else(|_| "administrator".to_string())
}

/// Suffix that keeps usernames and copy numbers unique across runs
fn unique() -> i64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Clock before epoch")
        .subsec_nanos();
    (nanos % 1_000_000_000) as i64 + 1
}

/// Helper to get an administrator token
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": admin_password()
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn post_json(client: &Client, token: &str, path: &str, body: Value) -> Value {
    let response = client
        .post(format!("{}{}", BASE_URL, path))
        .header("Authorization", format!("Bearer {}", token))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201, "POST {} failed", path);
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": admin_password()
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["user"]["password"].is_null());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "nobody-here",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_get_current_user() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["username"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/books?per_page=5", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
    assert_eq!(body["per_page"], 5);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_flow() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let suffix = unique();

    let author = post_json(&client, &token, "/authors", json!({ "lastname": "Tolkien" })).await;
    let book = post_json(
        &client,
        &token,
        "/books",
        json!({ "title": "The Hobbit", "author_id": author["id"] }),
    )
    .await;
    let copy = post_json(
        &client,
        &token,
        "/copies",
        json!({
            "copy_number": suffix,
            "purchase_date": "2020-01-15",
            "book_id": book["id"]
        }),
    )
    .await;
    let reader = post_json(
        &client,
        &token,
        "/users",
        json!({ "username": format!("reader{}", suffix), "password": "reader-password" }),
    )
    .await;

    let copy_id = copy["id"].as_i64().expect("No copy ID");
    let user_id = reader["id"].as_i64().expect("No user ID");
    let auth = format!("Bearer {}", token);

    let availability: Value = client
        .get(format!("{}/copies/{}/availability", BASE_URL, copy_id))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(availability["available"], true);

    let response = client
        .post(format!("{}/borrow/{}/{}", BASE_URL, copy_id, user_id))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    // Second borrow of the same copy is refused
    let response = client
        .post(format!("{}/borrow/{}/{}", BASE_URL, copy_id, user_id))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "CopyNotAvailable");
    assert_eq!(body["code"], 5);

    let response = client
        .post(format!("{}/return/{}/{}", BASE_URL, copy_id, user_id))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let activity: Value = client
        .get(format!("{}/users/{}/activity", BASE_URL, user_id))
        .header("Authorization", &auth)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let actions: Vec<&str> = activity
        .as_array()
        .expect("Activity is not an array")
        .iter()
        .filter_map(|entry| entry["action_type"].as_str())
        .collect();
    assert_eq!(actions, vec!["return", "borrow"]);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_of_one_copy() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let suffix = unique();

    let copy = post_json(
        &client,
        &token,
        "/copies",
        json!({ "copy_number": suffix, "purchase_date": "2021-06-01" }),
    )
    .await;
    let first = post_json(
        &client,
        &token,
        "/users",
        json!({ "username": format!("racer{}a", suffix), "password": "reader-password" }),
    )
    .await;
    let second = post_json(
        &client,
        &token,
        "/users",
        json!({ "username": format!("racer{}b", suffix), "password": "reader-password" }),
    )
    .await;

    let copy_id = copy["id"].as_i64().expect("No copy ID");
    let borrow = |user: &Value| {
        client
            .post(format!(
                "{}/borrow/{}/{}",
                BASE_URL,
                copy_id,
                user["id"].as_i64().expect("No user ID")
            ))
            .header("Authorization", format!("Bearer {}", token))
            .send()
    };

    let (a, b) = tokio::join!(borrow(&first), borrow(&second));
    let mut statuses = vec![
        a.expect("Failed to send request").status().as_u16(),
        b.expect("Failed to send request").status().as_u16(),
    ];
    statuses.sort();

    assert_eq!(statuses, vec![204, 409]);
}

#[tokio::test]
#[ignore]
async fn test_borrow_unknown_copy() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/borrow/{}/{}", BASE_URL, i64::MAX, 1))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_check_username() {
    let client = Client::new();

    let response = client
        .get(format!("{}/users/check-username?username=admin", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!("{}/users/check-username?username=free{}", BASE_URL, unique()))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .post(format!("{}/borrow/1/1", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}
