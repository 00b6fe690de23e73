//! Probe planning and HTTP probe target resolution.

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{
    first_for_target, Contributions, HttpScheme, PortConfig, ProbeConfig, ProbeKind,
    ProbePortName, TargetConfig, DEFAULT_HTTP_PORT_NAME,
};

use super::decorator::{Decorator, Probe};
use super::plan::PlanEmitter;
use super::ports::PortMap;

/// Port probes use when nothing else provides one.
pub const DEFAULT_PROBE_PORT: u16 = 8080;

/// Where an HTTP probe connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTarget {
    /// Resolved port name.
    pub port_name: String,
    /// Resolved port number.
    pub port: u16,
    /// Resolved scheme.
    pub scheme: HttpScheme,
}

/// Resolves the port and scheme of an HTTP probe.
///
/// The port name comes from the probe, then the hint, then `http`. The port
/// number comes from the probe, then the configured port of that name, then
/// the active port of that name, then 8080. The scheme comes from the probe,
/// then a TLS port configuration, then the hint when it names the same port,
/// and finally the port number.
#[must_use]
pub fn resolve_http_target(
    probe: &ProbeConfig,
    hint: Option<&ProbePortName>,
    active_ports: &PortMap,
    port_configs: &BTreeMap<String, PortConfig>,
) -> HttpTarget {
    let port_name = probe
        .http_action_port_name
        .clone()
        .or_else(|| hint.map(|h| h.name.clone()))
        .unwrap_or_else(|| String::from(DEFAULT_HTTP_PORT_NAME));

    let port_config = port_configs.get(&port_name);

    let port = probe
        .http_action_port
        .or_else(|| port_config.and_then(|c| c.container_port).filter(|p| *p != 0))
        .or_else(|| active_ports.get(&port_name).and_then(|p| p.container_port))
        .unwrap_or(DEFAULT_PROBE_PORT);

    let scheme = probe
        .http_action_scheme
        .or_else(|| port_config.filter(|c| c.tls).map(|_| HttpScheme::Https))
        .or_else(|| hint.filter(|h| h.name == port_name).and_then(|h| h.scheme))
        .unwrap_or_else(|| scheme_for_port(port));

    HttpTarget {
        port_name,
        port,
        scheme,
    }
}

/// Guesses the scheme from a well-known port number.
#[must_use]
pub const fn scheme_for_port(port: u16) -> HttpScheme {
    match port {
        443 | 8443 => HttpScheme::Https,
        _ => HttpScheme::Http,
    }
}

/// Plans the probes of one target.
///
/// A probe uses the configured action when there is one, otherwise the
/// discovered health path for its kind. Probes with neither are omitted.
pub fn plan_probes(
    emitter: &mut PlanEmitter,
    resource: &str,
    target: &TargetConfig,
    contributions: &Contributions,
    active_ports: &PortMap,
) {
    let target_name = target.name.as_str();
    let hint = first_for_target(&contributions.probe_port_names, target_name);

    for kind in ProbeKind::ALL {
        if kind == ProbeKind::Startup && !target.name.supports_startup_probe() {
            debug!("Skipping {} on {}", kind, target_name);
            continue;
        }

        let config = target.probe(kind);
        let probe = if config.has_user_supplied_action() {
            Probe::from_config(config)
        } else if let Some(health) = contributions.health_path(kind, target_name) {
            Probe::with_http_path(config, &health.path)
        } else {
            debug!("No action for {} on {}", kind, target_name);
            continue;
        };

        let is_http = probe.is_http();
        emitter.emit(Decorator::AddProbe {
            resource: resource.to_string(),
            probe_kind: kind,
            probe,
        });

        if is_http && target.name.supports_probe_ports() {
            let http = resolve_http_target(config, hint, active_ports, &target.ports);
            debug!(
                "{} on {} uses {} {}:{}",
                kind, target_name, http.scheme, http.port_name, http.port
            );
            emitter.emit(Decorator::ApplyHttpGetActionPort {
                resource: resource.to_string(),
                probe_kind: kind,
                port_name: http.port_name,
                port: http.port,
                scheme: http.scheme,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HealthPath, TargetKind};
    use crate::planner::ports::Port;

    fn active(name: &str, port: u16) -> PortMap {
        let mut ports = PortMap::new();
        ports.insert(
            name.to_string(),
            Port {
                name: name.to_string(),
                container_port: Some(port),
                host_port: None,
                path: None,
                tls: false,
            },
        );
        ports
    }

    fn health(kind: ProbeKind, path: &str) -> HealthPath {
        HealthPath {
            kind,
            path: path.to_string(),
            target: None,
        }
    }

    #[test]
    fn test_explicit_port_wins() {
        let probe = ProbeConfig {
            http_action_port: Some(9999),
            ..ProbeConfig::default()
        };
        let mut configs = BTreeMap::new();
        configs.insert(
            String::from("http"),
            PortConfig {
                container_port: Some(8080),
                ..PortConfig::default()
            },
        );

        let target = resolve_http_target(&probe, None, &active("http", 7070), &configs);
        assert_eq!(target.port, 9999);
        assert_eq!(target.port_name, "http");
    }

    #[test]
    fn test_port_config_before_active_port() {
        let mut configs = BTreeMap::new();
        configs.insert(
            String::from("http"),
            PortConfig {
                container_port: Some(8081),
                ..PortConfig::default()
            },
        );

        let target =
            resolve_http_target(&ProbeConfig::default(), None, &active("http", 7070), &configs);
        assert_eq!(target.port, 8081);

        let target = resolve_http_target(
            &ProbeConfig::default(),
            None,
            &active("http", 7070),
            &BTreeMap::new(),
        );
        assert_eq!(target.port, 7070);
    }

    #[test]
    fn test_fallback_port() {
        let target =
            resolve_http_target(&ProbeConfig::default(), None, &PortMap::new(), &BTreeMap::new());
        assert_eq!(target.port, DEFAULT_PROBE_PORT);
        assert_eq!(target.scheme, HttpScheme::Http);
    }

    #[test]
    fn test_scheme_from_port_number() {
        assert_eq!(scheme_for_port(8443), HttpScheme::Https);
        assert_eq!(scheme_for_port(443), HttpScheme::Https);
        assert_eq!(scheme_for_port(8080), HttpScheme::Http);

        let target = resolve_http_target(
            &ProbeConfig::default(),
            None,
            &active("http", 8443),
            &BTreeMap::new(),
        );
        assert_eq!(target.scheme, HttpScheme::Https);
    }

    #[test]
    fn test_hint_names_port_and_scheme() {
        let hint = ProbePortName {
            name: String::from("https"),
            scheme: Some(HttpScheme::Https),
            target: None,
        };
        let target = resolve_http_target(
            &ProbeConfig::default(),
            Some(&hint),
            &active("https", 9443),
            &BTreeMap::new(),
        );
        assert_eq!(target.port_name, "https");
        assert_eq!(target.port, 9443);
        assert_eq!(target.scheme, HttpScheme::Https);
    }

    #[test]
    fn test_hint_scheme_ignored_for_other_port() {
        let hint = ProbePortName {
            name: String::from("https"),
            scheme: Some(HttpScheme::Https),
            target: None,
        };
        let probe = ProbeConfig {
            http_action_port_name: Some(String::from("http")),
            ..ProbeConfig::default()
        };
        let target =
            resolve_http_target(&probe, Some(&hint), &active("http", 8080), &BTreeMap::new());
        assert_eq!(target.scheme, HttpScheme::Http);
    }

    #[test]
    fn test_tls_port_config_means_https() {
        let mut configs = BTreeMap::new();
        configs.insert(
            String::from("http"),
            PortConfig {
                tls: true,
                ..PortConfig::default()
            },
        );
        let target =
            resolve_http_target(&ProbeConfig::default(), None, &active("http", 8080), &configs);
        assert_eq!(target.scheme, HttpScheme::Https);
    }

    #[test]
    fn test_probes_need_action_or_health_path() {
        let target = TargetConfig::new(TargetKind::Kubernetes);
        let contributions = Contributions {
            health_paths: vec![health(ProbeKind::Readiness, "/q/health/ready")],
            ..Contributions::default()
        };

        let mut emitter = PlanEmitter::new("kubernetes");
        plan_probes(&mut emitter, "orders", &target, &contributions, &active("http", 8080));

        let records = emitter.into_records();
        assert_eq!(records.len(), 2);
        assert!(matches!(
            records[0].decorator,
            Decorator::AddProbe {
                probe_kind: ProbeKind::Readiness,
                ..
            }
        ));
        assert!(matches!(
            records[1].decorator,
            Decorator::ApplyHttpGetActionPort { port: 8080, .. }
        ));
    }

    #[test]
    fn test_knative_skips_startup_and_ports() {
        let target = TargetConfig::new(TargetKind::Knative);
        let contributions = Contributions {
            health_paths: vec![
                health(ProbeKind::Liveness, "/q/health/live"),
                health(ProbeKind::Startup, "/q/health/started"),
            ],
            ..Contributions::default()
        };

        let mut emitter = PlanEmitter::new("knative");
        plan_probes(&mut emitter, "orders", &target, &contributions, &active("http", 8080));

        let records = emitter.into_records();
        assert_eq!(records.len(), 1);
        assert!(matches!(
            records[0].decorator,
            Decorator::AddProbe {
                probe_kind: ProbeKind::Liveness,
                ..
            }
        ));
    }

    #[test]
    fn test_exec_probe_gets_no_port() {
        let mut target = TargetConfig::new(TargetKind::Kubernetes);
        target.liveness_probe.exec_action = Some(String::from("cat /tmp/alive"));

        let mut emitter = PlanEmitter::new("kubernetes");
        plan_probes(
            &mut emitter,
            "orders",
            &target,
            &Contributions::default(),
            &active("http", 8080),
        );
        assert_eq!(emitter.len(), 1);
    }
}
