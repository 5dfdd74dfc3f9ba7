use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nimbus Control Plane API",
        description = "Instance lifecycle, utilization stats and remote-command sessions"
    ),
    paths(
        crate::handlers::instances::list_instances,
        crate::handlers::instances::launch_instance,
        crate::handlers::instances::get_instance,
        crate::handlers::instances::terminate_instance,
        crate::handlers::instances::stop_instance,
        crate::handlers::instances::start_instance,
        crate::handlers::metrics::instance_stats,
        crate::handlers::sessions::connect,
        crate::handlers::sessions::exec,
        crate::handlers::sessions::disconnect,
    ),
    components(schemas(
        nimbus_common::Instance,
        nimbus_common::InstanceStatus,
        nimbus_common::MetricSample,
        nimbus_common::LaunchRequest,
        nimbus_common::LaunchOutcome,
        crate::handlers::metrics::StatsResponse,
        crate::handlers::sessions::ConnectResponse,
        crate::handlers::sessions::ExecRequest,
        crate::handlers::sessions::ExecResponse,
    ))
)]
pub struct ApiDoc;
