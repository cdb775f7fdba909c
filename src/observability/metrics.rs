//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Metrics configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are recorded at all.
    pub enabled: bool,
    /// Address the scrape endpoint listens on.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings.
    #[must_use]
    pub const fn from_settings(settings: &MetricsSettings) -> Self {
        Self {
            enabled: settings.enabled,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), settings.port),
        }
    }
}

/// Handle to the installed recorder.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    prometheus: PrometheusHandle,
}

impl MetricsHandle {
    /// Renders the current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus.render()
    }
}

/// Installs the Prometheus recorder, and the scrape listener when `expose`.
///
/// Returns `Ok(None)` when metrics are disabled; `metrics` macros are then
/// no-ops. The listener runs on the current Tokio runtime.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed, or if
/// `expose` is set outside a Tokio runtime or the listener cannot bind.
pub fn install_prometheus(config: &MetricsConfig, expose: bool) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let builder = PrometheusBuilder::new();
    let prometheus = if expose {
        install_listener(builder.with_http_listener(config.listen_addr))?
    } else {
        builder.install_recorder().map_err(install_error)?
    };

    tracing::info!(
        listen_addr = %config.listen_addr,
        expose,
        "Metrics recorder installed"
    );
    Ok(Some(MetricsHandle { prometheus }))
}

fn install_listener(builder: PrometheusBuilder) -> Result<PrometheusHandle> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|e| Error::OperationFailed {
        operation: "metrics_listener_install".to_string(),
        cause: e.to_string(),
    })?;

    let (recorder, exporter) = {
        let _guard = runtime.enter();
        builder.build().map_err(install_error)?
    };
    let prometheus = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|e| Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    })?;
    runtime.spawn(exporter);
    Ok(prometheus)
}

#[allow(clippy::needless_pass_by_value)]
fn install_error(e: metrics_exporter_prometheus::BuildError) -> Error {
    Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let config = MetricsConfig::from_settings(&MetricsSettings {
            enabled: true,
            port: 9184,
        });
        assert!(config.enabled);
        assert_eq!(config.listen_addr.port(), 9184);
    }

    #[test]
    fn test_disabled_installs_nothing() {
        let config = MetricsConfig::from_settings(&MetricsSettings::default());
        let handle = install_prometheus(&config, true).expect("disabled is not an error");
        assert!(handle.is_none());
    }

    #[test]
    fn test_listener_requires_runtime() {
        let config = MetricsConfig::from_settings(&MetricsSettings {
            enabled: true,
            port: 0,
        });
        let result = install_prometheus(&config, true);
        assert!(matches!(
            result,
            Err(Error::OperationFailed { operation, .. }) if operation == "metrics_listener_install"
        ));
    }

    #[test]
    fn test_handle_renders_recorded_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = MetricsHandle {
            prometheus: recorder.handle(),
        };

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("sync_cycles_total", "outcome" => "ok").increment(1);
        });

        assert!(handle.render().contains("sync_cycles_total{outcome=\"ok\"} 1"));
    }

    #[test]
    fn test_metrics_registry_smoke() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("sync_items_delivered_total").increment(3);
        });

        assert!(handle.render().contains("sync_items_delivered_total 3"));
    }
}
