use super::{InstanceStore, NewInstance};
use chrono::Utc;
use nimbus_common::{InstanceStatus, MetricSample, NimbusError};
use std::time::Duration;
use uuid::Uuid;

const OWNER: &str = "owner-a";

fn web_server_spec(name: &str) -> NewInstance {
    NewInstance {
        name: name.to_string(),
        instance_class: "small".to_string(),
        location: "us-east-1".to_string(),
        storage_gib: 20,
        ipv6_enabled: false,
        ssh_enabled: true,
        username: "admin".to_string(),
    }
}

fn sample_for(instance_id: &str) -> MetricSample {
    MetricSample {
        id: Uuid::new_v4().to_string(),
        instance_id: instance_id.to_string(),
        timestamp: Utc::now(),
        cpu_usage_percent: 42.0,
        memory_usage_percent: 55.0,
        network_in_rate: 1_000.0,
        network_out_rate: 500.0,
    }
}

#[tokio::test]
async fn create_assigns_running_and_equal_timestamps() {
    let store = InstanceStore::open_in_memory().await.unwrap();

    let instance = store.create(OWNER, &web_server_spec("web-1")).await.unwrap();

    assert_eq!(instance.status, InstanceStatus::Running);
    assert_eq!(instance.created_at, instance.updated_at);
    assert_eq!(instance.provider_instance_id, instance.id);
    assert_eq!(instance.cpu_count, 1);
    assert_eq!(instance.memory_gib, 2);

    let fetched = store.get(OWNER, &instance.id).await.unwrap();
    assert_eq!(fetched.name, "web-1");
}

#[tokio::test]
async fn create_rejects_blank_fields() {
    let store = InstanceStore::open_in_memory().await.unwrap();

    let mut spec = web_server_spec("  ");
    let err = store.create(OWNER, &spec).await.unwrap_err();
    assert!(matches!(err, NimbusError::Validation(_)));

    spec = web_server_spec("web-1");
    spec.instance_class = "".to_string();
    let err = store.create(OWNER, &spec).await.unwrap_err();
    assert!(matches!(err, NimbusError::Validation(_)));
}

#[tokio::test]
async fn unrecognized_class_gets_default_profile() {
    let store = InstanceStore::open_in_memory().await.unwrap();

    let mut spec = web_server_spec("web-1");
    spec.instance_class = "quantum-9000".to_string();
    let instance = store.create(OWNER, &spec).await.unwrap();

    assert_eq!(instance.instance_class, "quantum-9000");
    assert_eq!(instance.cpu_count, 2);
    assert_eq!(instance.memory_gib, 4);
}

#[tokio::test]
async fn list_is_owner_scoped_and_newest_first() {
    let store = InstanceStore::open_in_memory().await.unwrap();

    let first = store.create(OWNER, &web_server_spec("web-1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = store.create(OWNER, &web_server_spec("web-2")).await.unwrap();
    store
        .create("owner-b", &web_server_spec("intruder"))
        .await
        .unwrap();

    let listed = store.list(OWNER).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);

    let err = store.get("owner-b", &first.id).await.unwrap_err();
    assert!(matches!(err, NimbusError::NotFound { .. }));
}

#[tokio::test]
async fn legal_transitions_update_status_and_timestamp() {
    let store = InstanceStore::open_in_memory().await.unwrap();
    let instance = store.create(OWNER, &web_server_spec("web-1")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    let stopped = store
        .update_status(OWNER, &instance.id, InstanceStatus::Stopped)
        .await
        .unwrap();
    assert_eq!(stopped.status, InstanceStatus::Stopped);
    assert!(stopped.updated_at > instance.updated_at);

    let running = store
        .update_status(OWNER, &instance.id, InstanceStatus::Running)
        .await
        .unwrap();
    assert_eq!(running.status, InstanceStatus::Running);

    let terminated = store
        .update_status(OWNER, &instance.id, InstanceStatus::Terminated)
        .await
        .unwrap();
    assert_eq!(terminated.status, InstanceStatus::Terminated);
}

#[tokio::test]
async fn terminated_rejects_every_transition() {
    let store = InstanceStore::open_in_memory().await.unwrap();
    let instance = store.create(OWNER, &web_server_spec("web-1")).await.unwrap();
    store
        .update_status(OWNER, &instance.id, InstanceStatus::Terminated)
        .await
        .unwrap();

    let err = store
        .update_status(OWNER, &instance.id, InstanceStatus::Running)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NimbusError::InvalidTransition {
            from: InstanceStatus::Terminated,
            to: InstanceStatus::Running,
        }
    ));

    let err = store
        .update_status(OWNER, &instance.id, InstanceStatus::Terminated)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NimbusError::InvalidTransition {
            from: InstanceStatus::Terminated,
            to: InstanceStatus::Terminated,
        }
    ));
}

#[tokio::test]
async fn update_status_on_unknown_instance_is_not_found() {
    let store = InstanceStore::open_in_memory().await.unwrap();
    let err = store
        .update_status(OWNER, "missing", InstanceStatus::Terminated)
        .await
        .unwrap_err();
    assert!(matches!(err, NimbusError::NotFound { .. }));
}

#[tokio::test]
async fn metric_timestamps_stay_strictly_descending() {
    let store = InstanceStore::open_in_memory().await.unwrap();
    let instance = store.create(OWNER, &web_server_spec("web-1")).await.unwrap();

    // Same wall-clock timestamp on every append; the store must still hand
    // back a well-defined order.
    let base = sample_for(&instance.id);
    for _ in 0..5 {
        let mut sample = base.clone();
        sample.id = Uuid::new_v4().to_string();
        store.append_metric(&sample).await.unwrap();
    }

    let recent = store.recent_metrics(&instance.id, 10).await.unwrap();
    assert_eq!(recent.len(), 5);
    for pair in recent.windows(2) {
        assert!(pair[0].timestamp > pair[1].timestamp);
    }
}

#[tokio::test]
async fn recent_metrics_honors_limit() {
    let store = InstanceStore::open_in_memory().await.unwrap();
    let instance = store.create(OWNER, &web_server_spec("web-1")).await.unwrap();

    for _ in 0..8 {
        store.append_metric(&sample_for(&instance.id)).await.unwrap();
    }

    let recent = store.recent_metrics(&instance.id, 3).await.unwrap();
    assert_eq!(recent.len(), 3);
}

#[tokio::test]
async fn appends_for_different_instances_are_independent() {
    let store = InstanceStore::open_in_memory().await.unwrap();
    let a = store.create(OWNER, &web_server_spec("web-1")).await.unwrap();
    let b = store.create(OWNER, &web_server_spec("web-2")).await.unwrap();

    store.append_metric(&sample_for(&a.id)).await.unwrap();
    store.append_metric(&sample_for(&b.id)).await.unwrap();
    store.append_metric(&sample_for(&a.id)).await.unwrap();

    assert_eq!(store.recent_metrics(&a.id, 10).await.unwrap().len(), 2);
    assert_eq!(store.recent_metrics(&b.id, 10).await.unwrap().len(), 1);
}
