// Integration tests for the instance endpoints.

mod common;

use common::create_test_server;
use serde_json::json;

#[tokio::test]
async fn test_launch_then_list() {
    let server = create_test_server().await;

    let response = server
        .post("/instances")
        .json(&json!({ "name": "web-1", "instance_class": "small" }))
        .await;
    assert_eq!(response.status_code(), 201);

    let body: serde_json::Value = response.json();
    let id = body["instance"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["instance"]["status"], "running");
    assert_eq!(body["instance"]["location"], "us-east-1");
    assert_eq!(body["instance"]["storage_gib"], 20);
    assert_eq!(body["instance"]["username"], "admin");
    assert_eq!(body["ssh_key_configured"], false);
    assert_eq!(body["password_set"], false);

    let response = server.get("/instances").await;
    assert_eq!(response.status_code(), 200);
    let listed: Vec<serde_json::Value> = response.json();
    let entry = listed
        .iter()
        .find(|i| i["id"] == json!(id))
        .expect("launched instance missing from list");
    assert_eq!(entry["name"], "web-1");
    assert_eq!(entry["status"], "running");
}

#[tokio::test]
async fn test_launch_rejects_missing_name() {
    let server = create_test_server().await;

    let response = server
        .post("/instances")
        .json(&json!({ "name": "  ", "instance_class": "small" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_launch_reports_credential_flags() {
    let server = create_test_server().await;

    let response = server
        .post("/instances")
        .json(&json!({
            "name": "bastion",
            "instance_class": "medium",
            "ssh_enabled": true,
            "ssh_public_key": "ssh-ed25519 AAAAC3Nza... ops@nimbus",
            "password": "hunter2"
        }))
        .await;
    assert_eq!(response.status_code(), 201);

    let body: serde_json::Value = response.json();
    assert_eq!(body["ssh_key_configured"], true);
    assert_eq!(body["password_set"], true);
    // Raw credential material is never echoed back.
    let raw = body.to_string();
    assert!(!raw.contains("hunter2"));
    assert!(!raw.contains("AAAAC3Nza"));
}

#[tokio::test]
async fn test_get_instance() {
    let server = create_test_server().await;

    let response = server
        .post("/instances")
        .json(&json!({ "name": "web-1", "instance_class": "large" }))
        .await;
    let id = response.json::<serde_json::Value>()["instance"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = server.get(&format!("/instances/{id}")).await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], json!(id));
    assert_eq!(body["cpu_count"], 4);
    assert_eq!(body["memory_gib"], 8);

    let response = server.get("/instances/does-not-exist").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_terminate_is_idempotent() {
    let server = create_test_server().await;

    let response = server
        .post("/instances")
        .json(&json!({ "name": "web-1", "instance_class": "small" }))
        .await;
    let id = response.json::<serde_json::Value>()["instance"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let first = server.delete(&format!("/instances/{id}")).await;
    assert_eq!(first.status_code(), 200);
    let second = server.delete(&format!("/instances/{id}")).await;
    assert_eq!(second.status_code(), 200);

    let fetched = server.get(&format!("/instances/{id}")).await;
    assert_eq!(fetched.json::<serde_json::Value>()["status"], "terminated");
}

#[tokio::test]
async fn test_terminate_unknown_instance_is_404() {
    let server = create_test_server().await;
    let response = server.delete("/instances/does-not-exist").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_stop_and_start_transitions() {
    let server = create_test_server().await;

    let response = server
        .post("/instances")
        .json(&json!({ "name": "web-1", "instance_class": "small" }))
        .await;
    let id = response.json::<serde_json::Value>()["instance"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let stopped = server.post(&format!("/instances/{id}/stop")).await;
    assert_eq!(stopped.status_code(), 200);
    assert_eq!(stopped.json::<serde_json::Value>()["status"], "stopped");

    let started = server.post(&format!("/instances/{id}/start")).await;
    assert_eq!(started.status_code(), 200);
    assert_eq!(started.json::<serde_json::Value>()["status"], "running");

    server.delete(&format!("/instances/{id}")).await;
    let conflict = server.post(&format!("/instances/{id}/start")).await;
    assert_eq!(conflict.status_code(), 409);
}

#[tokio::test]
async fn test_stats_backfill_and_ordering() {
    let server = create_test_server().await;

    let response = server
        .post("/instances")
        .json(&json!({ "name": "web-1", "instance_class": "small" }))
        .await;
    let id = response.json::<serde_json::Value>()["instance"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = server.get(&format!("/instances/{id}/stats")).await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["instance_id"], json!(id));

    let samples = body["samples"].as_array().unwrap();
    assert!(!samples.is_empty());
    assert!(samples.len() <= 10);
    for sample in samples {
        let cpu = sample["cpu_usage_percent"].as_f64().unwrap();
        let memory = sample["memory_usage_percent"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&cpu));
        assert!((0.0..=100.0).contains(&memory));
        assert!(sample["network_in_rate"].as_f64().unwrap() >= 0.0);
        assert!(sample["network_out_rate"].as_f64().unwrap() >= 0.0);
    }

    let timestamps: Vec<chrono::DateTime<chrono::Utc>> = samples
        .iter()
        .map(|s| s["timestamp"].as_str().unwrap().parse().unwrap())
        .collect();
    for pair in timestamps.windows(2) {
        assert!(pair[0] > pair[1]);
    }

    let response = server.get("/instances/does-not-exist/stats").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_owner_header_scopes_listing() {
    let server = create_test_server().await;

    server
        .post("/instances")
        .json(&json!({ "name": "web-1", "instance_class": "small" }))
        .await;

    let response = server
        .get("/instances")
        .add_header("x-owner-id", "owner-somebody-else")
        .await;
    assert_eq!(response.status_code(), 200);
    let listed: Vec<serde_json::Value> = response.json();
    assert!(listed.is_empty());
}
