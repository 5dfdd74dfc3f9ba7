// Shared helpers for HTTP integration tests.
// IMPORTANT: servers are built without provider credentials so every
// request deterministically runs the simulated path.

use axum_test::TestServer;
use nimbus_api::app::AppState;
use nimbus_api::routes;
use nimbus_core::{ControlPlane, InstanceStore, MetricSampler, SimulatedProvider};

pub const TEST_OWNER: &str = "owner-tests";

pub async fn create_test_server() -> TestServer {
    let store = InstanceStore::open_in_memory().await.unwrap();
    let sim = SimulatedProvider::new(
        store,
        MetricSampler::with_seed(7),
        "us-east-1".to_string(),
    );
    let control = ControlPlane::with_adapter(None, sim);
    let state = AppState::new(control, TEST_OWNER.to_string());
    TestServer::new(routes::create_router(state)).unwrap()
}
