//! Decorators: deferred mutations of a generated resource tree.
//!
//! The planner only builds and orders these values. Applying them to actual
//! resources is the job of whoever consumes the plan, so every variant is
//! plain data and serializes to a tagged JSON object.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{HttpScheme, PolicyRule, ProbeConfig, ProbeKind, RoleRef, Subject};

/// Which resources of a target a decorator applies to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum DecoratorScope {
    /// The application workload and everything generated for it.
    #[default]
    Application,
    /// A single named resource, e.g. one `Job`.
    Named {
        /// Resource kind.
        kind: String,
        /// Resource name.
        name: String,
    },
}

/// A decorator tagged with the target it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecoratorRecord {
    /// Deployment target identifier.
    pub target: String,
    /// Resources within the target the decorator applies to.
    #[serde(default, skip_serializing_if = "DecoratorScope::is_application")]
    pub scope: DecoratorScope,
    /// The mutation itself.
    pub decorator: Decorator,
}

/// All mutations the planner can emit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decorator {
    /// Adds a namespaced role.
    AddRole {
        /// Workload the role is generated for.
        resource: String,
        /// Role name.
        name: String,
        /// Role namespace.
        namespace: Option<String>,
        /// Extra labels.
        labels: BTreeMap<String, String>,
        /// Policy rules.
        rules: Vec<PolicyRule>,
    },
    /// Adds a cluster role.
    AddClusterRole {
        /// Workload the role is generated for.
        resource: String,
        /// Cluster role name.
        name: String,
        /// Extra labels.
        labels: BTreeMap<String, String>,
        /// Policy rules.
        rules: Vec<PolicyRule>,
    },
    /// Adds a role binding.
    AddRoleBinding {
        /// Workload the binding is generated for.
        resource: String,
        /// Binding name.
        name: String,
        /// Binding namespace.
        namespace: Option<String>,
        /// Extra labels.
        labels: BTreeMap<String, String>,
        /// Role being bound.
        role_ref: RoleRef,
        /// Subjects granted the role.
        subjects: Vec<Subject>,
    },
    /// Adds a cluster role binding.
    AddClusterRoleBinding {
        /// Workload the binding is generated for.
        resource: String,
        /// Binding name.
        name: String,
        /// Extra labels.
        labels: BTreeMap<String, String>,
        /// Cluster role being bound.
        role_ref: RoleRef,
        /// Subjects granted the role.
        subjects: Vec<Subject>,
    },
    /// Adds a service account resource.
    AddServiceAccount {
        /// Workload the account is generated for.
        resource: String,
        /// Account name.
        name: String,
        /// Account namespace.
        namespace: Option<String>,
        /// Extra labels.
        labels: BTreeMap<String, String>,
    },
    /// Sets the service account the workload runs under.
    ApplyServiceAccountName {
        /// Workload to update.
        resource: String,
        /// Service account name.
        service_account: String,
    },
    /// Adds a probe to the application container.
    AddProbe {
        /// Workload to update.
        resource: String,
        /// Probe kind.
        probe_kind: ProbeKind,
        /// Probe definition.
        probe: Probe,
    },
    /// Points the HTTP action of a probe at a port.
    ApplyHttpGetActionPort {
        /// Workload to update.
        resource: String,
        /// Probe kind.
        probe_kind: ProbeKind,
        /// Port name.
        port_name: String,
        /// Port number.
        port: u16,
        /// Scheme.
        scheme: HttpScheme,
    },
    /// Replaces the container command.
    ApplyCommand {
        /// Workload to update.
        resource: String,
        /// Command.
        command: Vec<String>,
    },
    /// Replaces the container arguments.
    ApplyArgs {
        /// Workload to update.
        resource: String,
        /// Arguments.
        args: Vec<String>,
    },
    /// Sets an environment variable, replacing any previous value.
    AddEnvVar {
        /// Workload to update.
        resource: String,
        /// Variable name.
        name: String,
        /// Variable value.
        value: String,
    },
    /// Creates a job running a single container.
    CreateJob {
        /// Job name.
        name: String,
        /// Container image.
        image: String,
        /// Container command.
        command: Vec<String>,
        /// Container arguments.
        arguments: Vec<String>,
    },
}

/// A probe definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Probe {
    /// What the probe does.
    pub action: ProbeAction,
    /// Seconds before the first probe.
    pub initial_delay_secs: u32,
    /// Seconds between probes.
    pub period_secs: u32,
    /// Seconds before a probe times out.
    pub timeout_secs: u32,
    /// Consecutive successes needed.
    pub success_threshold: u32,
    /// Consecutive failures tolerated.
    pub failure_threshold: u32,
}

/// The action a probe performs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProbeAction {
    /// Runs a command in the container.
    Exec {
        /// Command and arguments.
        command: Vec<String>,
    },
    /// Opens a TCP connection.
    TcpSocket {
        /// Host, defaults to the pod IP.
        host: Option<String>,
        /// Port number or name.
        port: String,
    },
    /// Calls the gRPC health service.
    Grpc {
        /// Port number or name.
        port: String,
        /// Service name.
        service: Option<String>,
    },
    /// Issues an HTTP GET. Port and scheme are applied separately.
    HttpGet {
        /// Path to request.
        path: String,
    },
}

impl DecoratorScope {
    /// Returns true for the application-wide scope.
    #[must_use]
    pub const fn is_application(&self) -> bool {
        matches!(self, Self::Application)
    }
}

impl DecoratorRecord {
    /// Creates an application-wide record.
    #[must_use]
    pub fn new(target: impl Into<String>, decorator: Decorator) -> Self {
        Self {
            target: target.into(),
            scope: DecoratorScope::Application,
            decorator,
        }
    }

    /// Creates a record restricted to one named resource.
    #[must_use]
    pub fn scoped(
        target: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        decorator: Decorator,
    ) -> Self {
        Self {
            target: target.into(),
            scope: DecoratorScope::Named {
                kind: kind.into(),
                name: name.into(),
            },
            decorator,
        }
    }
}

impl Decorator {
    /// Short name of the decorator kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AddRole { .. } => "add-role",
            Self::AddClusterRole { .. } => "add-cluster-role",
            Self::AddRoleBinding { .. } => "add-role-binding",
            Self::AddClusterRoleBinding { .. } => "add-cluster-role-binding",
            Self::AddServiceAccount { .. } => "add-service-account",
            Self::ApplyServiceAccountName { .. } => "apply-service-account-name",
            Self::AddProbe { .. } => "add-probe",
            Self::ApplyHttpGetActionPort { .. } => "apply-http-get-action-port",
            Self::ApplyCommand { .. } => "apply-command",
            Self::ApplyArgs { .. } => "apply-args",
            Self::AddEnvVar { .. } => "add-env-var",
            Self::CreateJob { .. } => "create-job",
        }
    }

    /// One-line human readable description.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::AddRole { name, rules, .. } => format!("role {name} ({} rules)", rules.len()),
            Self::AddClusterRole { name, rules, .. } => {
                format!("cluster role {name} ({} rules)", rules.len())
            }
            Self::AddRoleBinding {
                name,
                role_ref,
                subjects,
                ..
            }
            | Self::AddClusterRoleBinding {
                name,
                role_ref,
                subjects,
                ..
            } => format!(
                "{name} -> {}{} ({} subjects)",
                if role_ref.cluster_wide { "ClusterRole/" } else { "Role/" },
                role_ref.name,
                subjects.len()
            ),
            Self::AddServiceAccount {
                name, namespace, ..
            } => namespace
                .as_ref()
                .map_or_else(|| name.clone(), |ns| format!("{ns}/{name}")),
            Self::ApplyServiceAccountName {
                service_account, ..
            } => service_account.clone(),
            Self::AddProbe {
                probe_kind, probe, ..
            } => format!("{probe_kind} {}", probe.action),
            Self::ApplyHttpGetActionPort {
                probe_kind,
                port_name,
                port,
                scheme,
                ..
            } => format!("{probe_kind} {scheme} {port_name}:{port}"),
            Self::ApplyCommand { command, .. } => command.join(" "),
            Self::ApplyArgs { args, .. } => args.join(" "),
            Self::AddEnvVar { name, value, .. } => format!("{name}={value}"),
            Self::CreateJob { name, image, .. } => format!("{name} ({image})"),
        }
    }
}

impl Probe {
    /// Converts a probe configuration, using its own action.
    #[must_use]
    pub fn from_config(config: &ProbeConfig) -> Self {
        let action = if let Some(exec) = &config.exec_action {
            ProbeAction::Exec {
                command: exec.split_whitespace().map(String::from).collect(),
            }
        } else if let Some(tcp) = &config.tcp_socket_action {
            match tcp.rsplit_once(':') {
                Some((host, port)) => ProbeAction::TcpSocket {
                    host: Some(host.to_string()),
                    port: port.to_string(),
                },
                None => ProbeAction::TcpSocket {
                    host: None,
                    port: tcp.clone(),
                },
            }
        } else if let Some(grpc) = &config.grpc_action {
            match grpc.split_once(':') {
                Some((port, service)) => ProbeAction::Grpc {
                    port: port.to_string(),
                    service: Some(service.to_string()),
                },
                None => ProbeAction::Grpc {
                    port: grpc.clone(),
                    service: None,
                },
            }
        } else {
            ProbeAction::HttpGet {
                path: config.http_action_path.clone().unwrap_or_default(),
            }
        };

        Self::with_action(config, action)
    }

    /// Converts a probe configuration, probing `path` over HTTP.
    #[must_use]
    pub fn with_http_path(config: &ProbeConfig, path: &str) -> Self {
        Self::with_action(
            config,
            ProbeAction::HttpGet {
                path: path.to_string(),
            },
        )
    }

    const fn with_action(config: &ProbeConfig, action: ProbeAction) -> Self {
        Self {
            action,
            initial_delay_secs: config.initial_delay_secs,
            period_secs: config.period_secs,
            timeout_secs: config.timeout_secs,
            success_threshold: config.success_threshold,
            failure_threshold: config.failure_threshold,
        }
    }

    /// Returns true if the probe issues an HTTP GET.
    #[must_use]
    pub const fn is_http(&self) -> bool {
        matches!(self.action, ProbeAction::HttpGet { .. })
    }
}

impl std::fmt::Display for ProbeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exec { command } => write!(f, "exec `{}`", command.join(" ")),
            Self::TcpSocket { host, port } => match host {
                Some(host) => write!(f, "tcp {host}:{port}"),
                None => write!(f, "tcp {port}"),
            },
            Self::Grpc { port, service } => match service {
                Some(service) => write!(f, "grpc {port} ({service})"),
                None => write!(f, "grpc {port}"),
            },
            Self::HttpGet { path } => write!(f, "http-get {path}"),
        }
    }
}

impl std::fmt::Display for DecoratorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] ", self.target)?;
        if let DecoratorScope::Named { kind, name } = &self.scope {
            write!(f, "{kind}/{name} ")?;
        }
        write!(f, "{} {}", self.decorator.kind(), self.decorator.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_probe_wins_over_http_path() {
        let config = ProbeConfig {
            exec_action: Some(String::from("cat /tmp/healthy")),
            http_action_path: Some(String::from("/health")),
            ..ProbeConfig::default()
        };
        let probe = Probe::from_config(&config);
        assert_eq!(
            probe.action,
            ProbeAction::Exec {
                command: vec![String::from("cat"), String::from("/tmp/healthy")]
            }
        );
        assert!(!probe.is_http());
    }

    #[test]
    fn test_tcp_action_with_host() {
        let config = ProbeConfig {
            tcp_socket_action: Some(String::from("localhost:5432")),
            ..ProbeConfig::default()
        };
        let probe = Probe::from_config(&config);
        assert_eq!(
            probe.action,
            ProbeAction::TcpSocket {
                host: Some(String::from("localhost")),
                port: String::from("5432")
            }
        );
    }

    #[test]
    fn test_discovered_path_keeps_timings() {
        let config = ProbeConfig {
            period_secs: 42,
            ..ProbeConfig::default()
        };
        let probe = Probe::with_http_path(&config, "/q/health/ready");
        assert!(probe.is_http());
        assert_eq!(probe.period_secs, 42);
    }

    #[test]
    fn test_record_serializes_with_tags() {
        let record = DecoratorRecord::new(
            "kubernetes",
            Decorator::ApplyServiceAccountName {
                resource: String::from("orders"),
                service_account: String::from("orders-sa"),
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["target"], "kubernetes");
        assert_eq!(json["decorator"]["type"], "apply_service_account_name");
        assert!(json.get("scope").is_none());

        let scoped = DecoratorRecord::scoped("kubernetes", "Job", "migrate", record.decorator);
        let json = serde_json::to_value(&scoped).unwrap();
        assert_eq!(json["scope"]["scope"], "named");
        assert_eq!(json["scope"]["name"], "migrate");
    }
}
