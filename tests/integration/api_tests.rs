//! API integration tests
//!
//! Need a running server and database. Run with: cargo test -- --ignored

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::task::JoinSet;

const BASE_URL: &str = "http://localhost:8080/api";

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

/// A freshly registered library with its owner token
struct Library {
    id: i64,
    owner_token: String,
    owner_email: String,
}

async fn login(client: &Client, email: &str) -> Value {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "secret123" }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.expect("Failed to parse login response")
}

async fn setup_library(client: &Client) -> Library {
    let owner_email = format!("{}@example.com", unique("owner"));
    let response = client
        .post(format!("{}/owner/registration", BASE_URL))
        .json(&json!({
            "name": "Owner",
            "email": owner_email,
            "password": "secret123",
            "contact_number": "555-0100",
            "library_name": unique("library")
        }))
        .send()
        .await
        .expect("Failed to register owner");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let id = body["library"]["id"].as_i64().expect("No library id");

    let login = login(client, &owner_email).await;
    Library {
        id,
        owner_token: login["token"].as_str().unwrap().to_string(),
        owner_email,
    }
}

/// Registers a reader and returns (reader id, email)
async fn register_reader(client: &Client, library: &Library) -> (i64, String) {
    let email = format!("{}@example.com", unique("reader"));
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Reader",
            "email": email,
            "password": "secret123",
            "contact_number": "555-0101",
            "library_id": library.id
        }))
        .send()
        .await
        .expect("Failed to register reader");
    assert_eq!(response.status(), StatusCode::CREATED);
    let user: Value = response.json().await.unwrap();
    (user["id"].as_i64().unwrap(), email)
}

/// Registers a reader and returns (reader id, token)
async fn add_reader(client: &Client, library: &Library) -> (i64, String) {
    let (id, email) = register_reader(client, library).await;
    let login = login(client, &email).await;
    (id, login["token"].as_str().unwrap().to_string())
}

/// Registers a reader, promotes them and returns (admin id, email, admin token)
async fn add_admin(client: &Client, library: &Library) -> (i64, String, String) {
    let (id, email) = register_reader(client, library).await;
    let response = client
        .post(format!("{}/owner/assign-admin", BASE_URL))
        .bearer_auth(&library.owner_token)
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login = login(client, &email).await;
    (id, email, login["token"].as_str().unwrap().to_string())
}

async fn add_book(client: &Client, library: &Library, copies: i32) -> String {
    let isbn = unique("isbn");
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&library.owner_token)
        .json(&json!({
            "isbn": isbn,
            "title": "The Rust Programming Language",
            "author": "Klabnik",
            "language": "en",
            "copies": copies
        }))
        .send()
        .await
        .expect("Failed to add book");
    assert_eq!(response.status(), StatusCode::CREATED);
    isbn
}

async fn find_book(client: &Client, library: &Library, isbn: &str) -> Option<Value> {
    let books: Value = client
        .get(format!("{}/books", BASE_URL))
        .bearer_auth(&library.owner_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    books
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["isbn"] == isbn)
        .cloned()
}

async fn available(client: &Client, library: &Library, isbn: &str) -> i64 {
    find_book(client, library, isbn).await.expect("Book missing")["available_copies"]
        .as_i64()
        .unwrap()
}

async fn raise(client: &Client, token: &str, isbn: &str) -> reqwest::Response {
    client
        .post(format!("{}/requestEvents", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "bookID": isbn }))
        .send()
        .await
        .expect("Failed to raise request")
}

async fn issue_directly(
    client: &Client,
    token: &str,
    reader_id: i64,
    isbn: &str,
    approver_id: Option<i64>,
) -> reqwest::Response {
    client
        .post(format!("{}/issueRegistry", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "isbn": isbn,
            "reader_id": reader_id,
            "issue_approver_id": approver_id,
            "expected_return_date": Utc::now() + Duration::days(7)
        }))
        .send()
        .await
        .expect("Failed to issue book")
}

async fn resolve(client: &Client, library: &Library, request_id: i64, decision: &str) -> reqwest::Response {
    client
        .put(format!("{}/issueRequests/{}", BASE_URL, request_id))
        .bearer_auth(&library.owner_token)
        .json(&json!({ "request_type": decision }))
        .send()
        .await
        .expect("Failed to resolve request")
}

#[tokio::test]
#[ignore]
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
async fn test_login_returns_role_and_library() {
    let client = Client::new();
    let library = setup_library(&client).await;

    let body = login(&client, &library.owner_email).await;
    assert!(body["token"].is_string());
    assert_eq!(body["role"], "Owner");
    assert_eq!(body["library_id"], library.id);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();
    let library = setup_library(&client).await;

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": library.owner_email, "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_quota_stops_fifth_request() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let (_, reader) = add_reader(&client, &library).await;
    let isbn = add_book(&client, &library, 5).await;

    for _ in 0..4 {
        assert_eq!(raise(&client, &reader, &isbn).await.status(), StatusCode::CREATED);
    }

    let response = raise(&client, &reader, &isbn).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Maximum of 4 active requests reached");

    assert_eq!(available(&client, &library, &isbn).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_raise_without_copy_is_unavailable() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let (_, first) = add_reader(&client, &library).await;
    let (_, second) = add_reader(&client, &library).await;
    let isbn = add_book(&client, &library, 1).await;

    assert_eq!(raise(&client, &first, &isbn).await.status(), StatusCode::CREATED);

    let response = raise(&client, &second, &isbn).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "BookNotAvailable");
}

#[tokio::test]
#[ignore]
async fn test_reject_restores_copy() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let (_, reader) = add_reader(&client, &library).await;
    let isbn = add_book(&client, &library, 1).await;

    let request: Value = raise(&client, &reader, &isbn).await.json().await.unwrap();
    assert_eq!(available(&client, &library, &isbn).await, 0);

    let response = resolve(&client, &library, request["id"].as_i64().unwrap(), "Reject").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["request"]["request_type"], "Reject");
    assert!(body["issue"].is_null());

    assert_eq!(available(&client, &library, &isbn).await, 1);

    // Already resolved
    let again = resolve(&client, &library, request["id"].as_i64().unwrap(), "Approve").await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_approve_issue_and_return() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let (reader_id, reader) = add_reader(&client, &library).await;
    let isbn = add_book(&client, &library, 1).await;

    let request: Value = raise(&client, &reader, &isbn).await.json().await.unwrap();
    assert_eq!(available(&client, &library, &isbn).await, 0);

    // Approval does not take a second copy, even with none left
    let response = resolve(&client, &library, request["id"].as_i64().unwrap(), "Approve").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["issue"]["reader_id"], reader_id);
    assert_eq!(body["issue"]["issue_status"], "Issued");
    assert_eq!(available(&client, &library, &isbn).await, 0);

    let listing: Value = client
        .get(format!("{}/issueRequests", BASE_URL))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = listing.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "Approved");
    assert_eq!(rows[0]["return_status"], "Not Returned");

    let issue_id = body["issue"]["id"].as_i64().unwrap();
    let returned = client
        .post(format!("{}/issueRegistry/{}/return", BASE_URL, issue_id))
        .bearer_auth(&library.owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(returned.status(), StatusCode::OK);
    assert_eq!(available(&client, &library, &isbn).await, 1);

    let twice = client
        .post(format!("{}/issueRegistry/{}/return", BASE_URL, issue_id))
        .bearer_auth(&library.owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(twice.status(), StatusCode::BAD_REQUEST);
    assert_eq!(available(&client, &library, &isbn).await, 1);

    let history: Value = client
        .get(format!("{}/auth/userIssueInfo", BASE_URL))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history[0]["issue_status"], "Returned");
    assert_eq!(history[0]["is_overdue"], false);
}

#[tokio::test]
#[ignore]
async fn test_direct_issue_reserves_copy() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let (reader_id, _) = add_reader(&client, &library).await;
    let isbn = add_book(&client, &library, 2).await;

    let response = client
        .post(format!("{}/issueRegistry", BASE_URL))
        .bearer_auth(&library.owner_token)
        .json(&json!({
            "isbn": isbn,
            "reader_id": reader_id,
            "expected_return_date": Utc::now() + Duration::days(7)
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(available(&client, &library, &isbn).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_remove_all_copies_deletes_book() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let isbn = add_book(&client, &library, 3).await;

    let response = client
        .post(format!("{}/books/remove", BASE_URL))
        .bearer_auth(&library.owner_token)
        .json(&json!({ "isbn": isbn, "copies": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(find_book(&client, &library, &isbn).await.is_none());
}

#[tokio::test]
#[ignore]
async fn test_cannot_remove_issued_copies() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let (_, reader) = add_reader(&client, &library).await;
    let isbn = add_book(&client, &library, 2).await;
    assert_eq!(raise(&client, &reader, &isbn).await.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/books/remove", BASE_URL))
        .bearer_auth(&library.owner_token)
        .json(&json!({ "isbn": isbn, "copies": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let book = find_book(&client, &library, &isbn).await.unwrap();
    assert_eq!(book["total_copies"], 2);
    assert_eq!(book["available_copies"], 1);
}

#[tokio::test]
#[ignore]
async fn test_adding_existing_isbn_increments() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let isbn = add_book(&client, &library, 2).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&library.owner_token)
        .json(&json!({ "isbn": isbn, "copies": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let book = find_book(&client, &library, &isbn).await.unwrap();
    assert_eq!(book["total_copies"], 5);
    assert_eq!(book["available_copies"], 5);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_requests_take_exactly_available_copies() {
    const COPIES: usize = 3;
    const READERS: usize = 8;

    let client = Client::new();
    let library = setup_library(&client).await;
    let isbn = add_book(&client, &library, COPIES as i32).await;

    let mut tokens = Vec::new();
    for _ in 0..READERS {
        tokens.push(add_reader(&client, &library).await.1);
    }

    let mut set = JoinSet::new();
    for token in tokens {
        let client = client.clone();
        let isbn = isbn.clone();
        set.spawn(async move { raise(&client, &token, &isbn).await.status() });
    }

    let mut successes = 0;
    let mut unavailable = 0;
    while let Some(status) = set.join_next().await {
        match status.unwrap() {
            StatusCode::CREATED => successes += 1,
            StatusCode::BAD_REQUEST => unavailable += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(successes, COPIES);
    assert_eq!(unavailable, READERS - COPIES);
    assert_eq!(available(&client, &library, &isbn).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_owner_promotes_and_demotes_reader() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let email = format!("{}@example.com", unique("staff"));
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Staff",
            "email": email,
            "password": "secret123",
            "contact_number": "555-0102",
            "library_id": library.id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let promoted: Value = client
        .post(format!("{}/owner/assign-admin", BASE_URL))
        .bearer_auth(&library.owner_token)
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(promoted["role"], "LibraryAdmin");

    let demoted: Value = client
        .post(format!("{}/owner/revoke-admin", BASE_URL))
        .bearer_auth(&library.owner_token)
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(demoted["role"], "Reader");

    let own = client
        .post(format!("{}/owner/revoke-admin", BASE_URL))
        .bearer_auth(&library.owner_token)
        .json(&json!({ "email": library.owner_email }))
        .send()
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_self_registration_cannot_claim_owner() {
    let client = Client::new();
    let library = setup_library(&client).await;

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Mallory",
            "email": format!("{}@example.com", unique("mallory")),
            "password": "secret123",
            "contact_number": "555-0103",
            "role": "Owner",
            "library_id": library.id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_raise_and_direct_issue_for_same_reader() {
    const ROUNDS: usize = 5;

    let client = Client::new();
    let library = setup_library(&client).await;

    for _ in 0..ROUNDS {
        let (reader_id, reader) = add_reader(&client, &library).await;
        let isbn = add_book(&client, &library, 2).await;

        let (raised, issued) = tokio::join!(
            raise(&client, &reader, &isbn),
            issue_directly(&client, &library.owner_token, reader_id, &isbn, None),
        );

        assert_eq!(raised.status(), StatusCode::CREATED);
        assert_eq!(issued.status(), StatusCode::OK);
        assert_eq!(available(&client, &library, &isbn).await, 0);
    }
}

#[tokio::test]
#[ignore]
async fn test_reader_only_sees_own_requests() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let (_, alice) = add_reader(&client, &library).await;
    let (bob_id, bob) = add_reader(&client, &library).await;
    let isbn = add_book(&client, &library, 2).await;

    let alice_request: Value = raise(&client, &alice, &isbn).await.json().await.unwrap();
    let bob_request: Value = raise(&client, &bob, &isbn).await.json().await.unwrap();

    let listing: Value = client
        .get(format!("{}/issueRequests", BASE_URL))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = listing.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], alice_request["id"]);
    assert_ne!(rows[0]["reader_id"], bob_id);

    let own = client
        .get(format!("{}/issueRequests/{}", BASE_URL, alice_request["id"]))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::OK);

    let other = client
        .get(format!("{}/issueRequests/{}", BASE_URL, bob_request["id"]))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::NOT_FOUND);

    // Staff see the whole library
    let all: Value = client
        .get(format!("{}/issueRequests", BASE_URL))
        .bearer_auth(&library.owner_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
#[ignore]
async fn test_staff_cannot_reach_another_library() {
    let client = Client::new();
    let home = setup_library(&client).await;
    let other = setup_library(&client).await;
    let (reader_id, reader) = add_reader(&client, &other).await;
    let isbn = add_book(&client, &other, 3).await;

    let request: Value = raise(&client, &reader, &isbn).await.json().await.unwrap();
    let request_id = request["id"].as_i64().unwrap();
    let issue: Value = issue_directly(&client, &other.owner_token, reader_id, &isbn, None)
        .await
        .json()
        .await
        .unwrap();
    let issue_id = issue["id"].as_i64().unwrap();

    let resolved = client
        .put(format!("{}/issueRequests/{}", BASE_URL, request_id))
        .bearer_auth(&home.owner_token)
        .json(&json!({ "request_type": "Approve" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resolved.status(), StatusCode::NOT_FOUND);

    let removed = client
        .post(format!("{}/books/remove", BASE_URL))
        .bearer_auth(&home.owner_token)
        .json(&json!({ "isbn": isbn, "copies": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), StatusCode::NOT_FOUND);

    let returned = client
        .post(format!("{}/issueRegistry/{}/return", BASE_URL, issue_id))
        .bearer_auth(&home.owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(returned.status(), StatusCode::NOT_FOUND);

    // Nothing moved in the other library
    let book = find_book(&client, &other, &isbn).await.unwrap();
    assert_eq!(book["total_copies"], 3);
    assert_eq!(book["available_copies"], 1);
}

#[tokio::test]
#[ignore]
async fn test_return_frees_a_quota_slot() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let (_, reader) = add_reader(&client, &library).await;
    let isbn = add_book(&client, &library, 5).await;

    let mut request_ids = Vec::new();
    for _ in 0..4 {
        let request: Value = raise(&client, &reader, &isbn).await.json().await.unwrap();
        request_ids.push(request["id"].as_i64().unwrap());
    }

    // An approved loan still counts until it comes back
    let approved: Value = resolve(&client, &library, request_ids[0], "Approve")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(raise(&client, &reader, &isbn).await.status(), StatusCode::FORBIDDEN);

    let issue_id = approved["issue"]["id"].as_i64().unwrap();
    let returned = client
        .post(format!("{}/issueRegistry/{}/return", BASE_URL, issue_id))
        .bearer_auth(&library.owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(returned.status(), StatusCode::OK);

    assert_eq!(raise(&client, &reader, &isbn).await.status(), StatusCode::CREATED);
}

#[tokio::test]
#[ignore]
async fn test_direct_issue_checks_named_approver() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let other = setup_library(&client).await;
    let (reader_id, _) = add_reader(&client, &library).await;
    let (admin_id, _, _) = add_admin(&client, &library).await;
    let (foreign_admin_id, _, _) = add_admin(&client, &other).await;
    let isbn = add_book(&client, &library, 3).await;

    for approver in [reader_id, foreign_admin_id, i32::MAX as i64] {
        let response = issue_directly(&client, &library.owner_token, reader_id, &isbn, Some(approver)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(available(&client, &library, &isbn).await, 3);

    let response = issue_directly(&client, &library.owner_token, reader_id, &isbn, Some(admin_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let issue: Value = response.json().await.unwrap();
    assert_eq!(issue["issue_approver_id"], admin_id);
}

#[tokio::test]
#[ignore]
async fn test_demoted_admin_token_loses_staff_rights() {
    let client = Client::new();
    let library = setup_library(&client).await;
    let (_, email, admin_token) = add_admin(&client, &library).await;

    let before = client
        .get(format!("{}/users", BASE_URL))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(before.status(), StatusCode::OK);

    let response = client
        .post(format!("{}/owner/revoke-admin", BASE_URL))
        .bearer_auth(&library.owner_token)
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Same token, still unexpired
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&admin_token)
        .json(&json!({
            "isbn": unique("isbn"),
            "title": "Stale",
            "author": "Nobody",
            "language": "en",
            "copies": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "NotAuthorized");
}
