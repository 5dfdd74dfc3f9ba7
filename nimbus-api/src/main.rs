use nimbus_api::app::AppState;
use nimbus_api::routes;
use nimbus_api::settings::Settings;
use nimbus_core::{ControlPlane, InstanceStore, MetricSampler, SimulatedProvider};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;

    let store = InstanceStore::open(&settings.database_path).await?;
    let sim = SimulatedProvider::new(
        store,
        MetricSampler::from_entropy(),
        settings.provider.default_region.clone(),
    );
    let control = ControlPlane::new(&settings.provider, sim);
    let state = AppState::new(control, settings.default_owner.clone());

    let app = routes::create_router(state);

    info!("nimbus api listening on {}", settings.bind_addr);
    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
