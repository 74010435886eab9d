//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Call once at startup, before any metric is recorded. The returned handle
/// renders `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Registered sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "sessions_active";
/// Connections rejected during session parameter resolution (counter).
pub const SESSION_AUTH_FAILURES_TOTAL: &str = "session_auth_failures_total";
/// Sessions evicted by a newer session for the same user (counter).
pub const SESSION_EVICTIONS_TOTAL: &str = "session_evictions_total";
/// Connections dropped because the inbound queue was full (counter).
pub const SESSION_QUEUE_FULL_TOTAL: &str = "session_queue_full_total";
/// Sessions torn down after a missed liveness check (counter).
pub const SESSION_HEARTBEAT_TIMEOUTS_TOTAL: &str = "session_heartbeat_timeouts_total";
/// Malformed or unrecognized requests dropped (counter).
pub const SESSION_PROTOCOL_ERRORS_TOTAL: &str = "session_protocol_errors_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_global_install() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = render(&handle);
        assert!(output.is_empty() || output.contains('\n'));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            WS_CONNECTIONS_TOTAL,
            WS_CONNECTIONS_ACTIVE,
            WS_DISCONNECTIONS_TOTAL,
            SESSIONS_ACTIVE,
            SESSION_AUTH_FAILURES_TOTAL,
            SESSION_EVICTIONS_TOTAL,
            SESSION_QUEUE_FULL_TOTAL,
            SESSION_HEARTBEAT_TIMEOUTS_TOTAL,
            SESSION_PROTOCOL_ERRORS_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
