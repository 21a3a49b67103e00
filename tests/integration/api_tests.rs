//! API integration tests
//!
//! Require a running server backed by PostgreSQL.

use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// Attach the acting-user headers every mutation needs
fn as_operator(builder: RequestBuilder) -> RequestBuilder {
    builder
        .header("X-Actor-Name", "integration-test")
        .header("X-Actor-Id", "1")
}

async fn create_employee(client: &Client, matricula: &str) {
    let response = as_operator(client.post(format!("{}/employees", BASE_URL)))
        .json(&json!({
            "matricula": matricula,
            "name": format!("Employee {}", matricula),
            "position": "Field technician"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
}

async fn create_device(client: &Client, imei: &str) {
    let response = as_operator(client.post(format!("{}/devices", BASE_URL)))
        .json(&json!({ "imei1": imei, "model": "Galaxy A54" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
}

async fn check_out(client: &Client, matricula: &str, imei: &str, date: &str) -> reqwest::Response {
    as_operator(client.post(format!("{}/records", BASE_URL)))
        .json(&json!({
            "employee_matricula": matricula,
            "device_imei": imei,
            "delivery_date": date,
            "delivery_condition": "New",
            "accessories": ["charger", "case"]
        }))
        .send()
        .await
        .expect("Failed to send request")
}

async fn device_status(client: &Client, imei: &str) -> Value {
    let body: Value = client
        .get(format!("{}/devices/{}", BASE_URL, imei))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["status"].clone()
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
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_mutation_requires_actor_header() {
    let client = Client::new();

    let response = client
        .post(format!("{}/employees", BASE_URL))
        .json(&json!({ "matricula": unique("E"), "name": "Nobody", "position": "None" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_employee_is_rejected() {
    let client = Client::new();
    let matricula = unique("E");
    create_employee(&client, &matricula).await;

    let response = as_operator(client.post(format!("{}/employees", BASE_URL)))
        .json(&json!({ "matricula": matricula, "name": "Again", "position": "Again" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Duplicate");
}

#[tokio::test]
#[ignore]
async fn test_check_out_and_return_cycle() {
    let client = Client::new();
    let matricula = unique("E");
    let imei = unique("IMEI");
    create_employee(&client, &matricula).await;
    create_device(&client, &imei).await;

    let response = check_out(&client, &matricula, &imei, "2024-01-10").await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["created"], true);
    assert_eq!(body["record"]["status"], "InUse");
    let record_id = body["record"]["id"].as_i64().expect("No record id");

    assert_eq!(device_status(&client, &imei).await, "InUse");

    let response = as_operator(client.post(format!("{}/records/{}/return", BASE_URL, record_id)))
        .json(&json!({ "return_date": "2024-02-01", "return_condition": "Good" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "Returned");
    assert_eq!(body["return"]["received_by"], "integration-test");

    assert_eq!(device_status(&client, &imei).await, "Available");

    // A second return is refused and leaves the first one untouched
    let response = as_operator(client.post(format!("{}/records/{}/return", BASE_URL, record_id)))
        .json(&json!({ "return_date": "2024-03-01", "return_condition": "Broken" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    let body: Value = client
        .get(format!("{}/records/{}", BASE_URL, record_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["return"]["date"], "2024-02-01");
    assert_eq!(body["return"]["condition"], "Good");
}

#[tokio::test]
#[ignore]
async fn test_conflict_names_the_existing_record() {
    let client = Client::new();
    let first = unique("E");
    let second = unique("E");
    let imei = unique("IMEI");
    create_employee(&client, &first).await;
    create_employee(&client, &second).await;
    create_device(&client, &imei).await;

    let body: Value = check_out(&client, &first, &imei, "2024-01-10")
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let record_id = body["record"]["id"].clone();

    for _ in 0..2 {
        let response = check_out(&client, &second, &imei, "2024-01-15").await;
        assert_eq!(response.status(), 409);
        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["conflict"]["kind"], "DeviceAlreadyAssigned");
        assert_eq!(body["conflict"]["conflicting_record_id"], record_id);
    }
}

#[tokio::test]
#[ignore]
async fn test_repeated_check_out_returns_existing_record() {
    let client = Client::new();
    let matricula = unique("E");
    let imei = unique("IMEI");
    create_employee(&client, &matricula).await;
    create_device(&client, &imei).await;

    let first: Value = check_out(&client, &matricula, &imei, "2024-01-10")
        .await
        .json()
        .await
        .expect("Failed to parse response");

    let response = check_out(&client, &matricula, &imei, "2024-01-10").await;
    assert_eq!(response.status(), 200);
    let second: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(second["created"], false);
    assert_eq!(second["record"]["id"], first["record"]["id"]);
}

#[tokio::test]
#[ignore]
async fn test_check_out_validation_and_missing_entities() {
    let client = Client::new();

    let response = as_operator(client.post(format!("{}/records", BASE_URL)))
        .json(&json!({ "employee_matricula": "E001" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let response = check_out(&client, &unique("E"), &unique("IMEI"), "2024-01-10").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_maintenance_window() {
    let client = Client::new();
    let matricula = unique("E");
    let imei = unique("IMEI");
    create_employee(&client, &matricula).await;
    create_device(&client, &imei).await;

    let response = as_operator(client.post(format!("{}/maintenance", BASE_URL)))
        .json(&json!({
            "device_imei": imei,
            "send_date": "2024-03-01",
            "reported_defect": "Cracked screen",
            "supplier": "Repair Co"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let order: Value = response.json().await.expect("Failed to parse response");
    assert!(order["order_number"].as_str().unwrap_or_default().starts_with("OS-2024-"));
    let order_id = order["id"].as_i64().expect("No order id");

    assert_eq!(device_status(&client, &imei).await, "Unavailable");

    let response = check_out(&client, &matricula, &imei, "2024-03-05").await;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["conflict"]["kind"], "DeviceUnderMaintenance");
    assert_eq!(body["conflict"]["conflicting_order_id"], order_id);

    let response = as_operator(client.post(format!("{}/maintenance/{}/close", BASE_URL, order_id)))
        .json(&json!({
            "return_date": "2024-03-10",
            "outcome": "Completed",
            "post_condition": "ApprovedForUse",
            "service_performed": "Screen replaced",
            "cost": "150.00"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let device: Value = client
        .get(format!("{}/devices/{}", BASE_URL, imei))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(device["status"], "Available");
    assert_eq!(device["condition"], "ApprovedForUse");

    let response = check_out(&client, &matricula, &imei, "2024-03-12").await;
    assert_eq!(response.status(), 201);

    let history: Value = client
        .get(format!("{}/devices/{}/history", BASE_URL, imei))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let kinds: Vec<&str> = history
        .as_array()
        .expect("History is not a list")
        .iter()
        .filter_map(|e| e["kind"].as_str())
        .collect();
    assert_eq!(kinds, vec!["Maintenance", "Custody"]);
}

#[tokio::test]
#[ignore]
async fn test_audit_trail_records_check_out() {
    let client = Client::new();
    let matricula = unique("E");
    let imei = unique("IMEI");
    create_employee(&client, &matricula).await;
    create_device(&client, &imei).await;

    let body: Value = check_out(&client, &matricula, &imei, "2024-01-10")
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let record_id = body["record"]["id"].as_i64().expect("No record id");

    let trail: Value = client
        .get(format!("{}/audit/records/{}", BASE_URL, record_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let entries = trail.as_array().expect("Audit trail is not a list");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "CheckOut");
    assert_eq!(entries[0]["actor_name"], "integration-test");
    assert_eq!(entries[0]["actor_id"], 1);
}

#[tokio::test]
#[ignore]
async fn test_unknown_audit_resource() {
    let client = Client::new();

    let response = client
        .get(format!("{}/audit/printers/1", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}
