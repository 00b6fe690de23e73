//! Configuration specification types for the planning engine.
//!
//! This module defines all the structs that map to the `deckhand.yaml` file.
//! Every keyed section is a `BTreeMap`, so iterating over configuration is
//! always in key order and "first wins" rules are reproducible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Port name probes fall back to when nothing else names one.
pub const DEFAULT_HTTP_PORT_NAME: &str = "http";

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployConfig {
    /// Application-level configuration.
    pub application: ApplicationConfig,
    /// Deployment targets to plan for, in declaration order.
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationConfig {
    /// Application name. Also the name of the generated workload.
    pub name: String,
    /// Namespace the application is deployed to (informational).
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Deployment target flavors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Vanilla Kubernetes.
    #[default]
    Kubernetes,
    /// `OpenShift`.
    Openshift,
    /// Knative serving.
    Knative,
    /// Minikube.
    Minikube,
    /// Kind.
    Kind,
}

/// Configuration for a single deployment target.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetConfig {
    /// Target flavor, doubles as the target identifier.
    pub name: TargetKind,
    /// Service account override. Always wins over anything else.
    pub service_account: Option<String>,
    /// Container command override.
    pub command: Option<Vec<String>>,
    /// Container arguments, appended to contributed ones.
    pub arguments: Option<Vec<String>>,
    /// Ingress configuration.
    pub ingress: IngressConfig,
    /// Port overrides keyed by port name.
    pub ports: BTreeMap<String, PortConfig>,
    /// Liveness probe configuration.
    pub liveness_probe: ProbeConfig,
    /// Readiness probe configuration.
    pub readiness_probe: ProbeConfig,
    /// Startup probe configuration.
    pub startup_probe: ProbeConfig,
    /// RBAC configuration.
    pub rbac: RbacConfig,
}

/// Ingress configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressConfig {
    /// Name of the port the application is reached on.
    #[serde(default = "default_target_port")]
    pub target_port: String,
}

/// Port override. Missing or zero fields inherit the contributed value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PortConfig {
    /// Port the container listens on.
    pub container_port: Option<u16>,
    /// Port exposed on the host.
    pub host_port: Option<u16>,
    /// HTTP path served on this port.
    pub path: Option<String>,
    /// Whether the port serves TLS.
    pub tls: bool,
}

/// HTTP scheme used by probes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpScheme {
    /// Plain HTTP.
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

/// Probe kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Liveness probe.
    Liveness,
    /// Readiness probe.
    Readiness,
    /// Startup probe.
    Startup,
}

/// Configuration for one probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Explicit port number for the HTTP action.
    pub http_action_port: Option<u16>,
    /// Explicit port name for the HTTP action.
    pub http_action_port_name: Option<String>,
    /// HTTP path to probe.
    pub http_action_path: Option<String>,
    /// Explicit scheme for the HTTP action.
    pub http_action_scheme: Option<HttpScheme>,
    /// Command to execute, split on whitespace.
    pub exec_action: Option<String>,
    /// `host:port` (or `port`) for a TCP socket action.
    pub tcp_socket_action: Option<String>,
    /// `port[:service]` for a gRPC action.
    pub grpc_action: Option<String>,
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

/// A single RBAC policy rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyRule {
    /// API groups the rule applies to.
    pub api_groups: Vec<String>,
    /// Non-resource URLs the rule applies to.
    pub non_resource_urls: Vec<String>,
    /// Resource names the rule is restricted to.
    pub resource_names: Vec<String>,
    /// Resource types the rule applies to.
    pub resources: Vec<String>,
    /// Allowed verbs.
    pub verbs: Vec<String>,
}

/// Identifies who a binding grants access to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    /// API group of the subject kind.
    #[serde(default)]
    pub api_group: Option<String>,
    /// Subject kind (`ServiceAccount`, `User`, `Group`).
    pub kind: String,
    /// Subject name.
    pub name: String,
    /// Subject namespace.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Reference from a binding to a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleRef {
    /// Role or cluster role name.
    pub name: String,
    /// Whether `name` refers to a cluster role.
    #[serde(default)]
    pub cluster_wide: bool,
}

/// RBAC configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RbacConfig {
    /// Roles keyed by name.
    pub roles: BTreeMap<String, RoleConfig>,
    /// Cluster roles keyed by name.
    pub cluster_roles: BTreeMap<String, ClusterRoleConfig>,
    /// Role bindings keyed by name.
    pub role_bindings: BTreeMap<String, RoleBindingConfig>,
    /// Cluster role bindings keyed by name.
    pub cluster_role_bindings: BTreeMap<String, ClusterRoleBindingConfig>,
    /// Service accounts keyed by name.
    pub service_accounts: BTreeMap<String, ServiceAccountConfig>,
}

/// A configured role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoleConfig {
    /// Role name, defaults to the map key.
    pub name: Option<String>,
    /// Role namespace.
    pub namespace: Option<String>,
    /// Extra labels.
    pub labels: BTreeMap<String, String>,
    /// Policy rules keyed by an arbitrary identifier.
    pub policy_rules: BTreeMap<String, PolicyRule>,
}

/// A configured cluster role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClusterRoleConfig {
    /// Cluster role name, defaults to the map key.
    pub name: Option<String>,
    /// Extra labels.
    pub labels: BTreeMap<String, String>,
    /// Policy rules keyed by an arbitrary identifier.
    pub policy_rules: BTreeMap<String, PolicyRule>,
}

/// A configured binding subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectConfig {
    /// Subject name, defaults to the map key.
    #[serde(default)]
    pub name: Option<String>,
    /// Subject kind.
    #[serde(default = "default_subject_kind")]
    pub kind: String,
    /// API group of the subject kind.
    #[serde(default)]
    pub api_group: Option<String>,
    /// Subject namespace.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// A configured role binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoleBindingConfig {
    /// Binding name, defaults to the map key.
    pub name: Option<String>,
    /// Extra labels.
    pub labels: BTreeMap<String, String>,
    /// Role to bind. Defaults to the first configured role.
    pub role_name: Option<String>,
    /// Whether `role_name` is a cluster role.
    pub cluster_wide: Option<bool>,
    /// Subjects keyed by name. Empty means the effective service account.
    pub subjects: BTreeMap<String, SubjectConfig>,
}

/// A configured cluster role binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClusterRoleBindingConfig {
    /// Binding name, defaults to the map key.
    pub name: Option<String>,
    /// Extra labels.
    pub labels: BTreeMap<String, String>,
    /// Cluster role to bind.
    pub role_name: String,
    /// Subjects keyed by name. Must not be empty.
    pub subjects: BTreeMap<String, SubjectConfig>,
}

/// A configured service account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceAccountConfig {
    /// Service account name, defaults to the map key.
    pub name: Option<String>,
    /// Service account namespace.
    pub namespace: Option<String>,
    /// Extra labels.
    pub labels: BTreeMap<String, String>,
    /// Whether this account should run the workload.
    pub use_as_default: bool,
}

// Default value functions

fn default_target_port() -> String {
    String::from(DEFAULT_HTTP_PORT_NAME)
}

fn default_subject_kind() -> String {
    String::from("ServiceAccount")
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            target_port: default_target_port(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            http_action_port: None,
            http_action_port_name: None,
            http_action_path: None,
            http_action_scheme: None,
            exec_action: None,
            tcp_socket_action: None,
            grpc_action: None,
            initial_delay_secs: 5,
            period_secs: 10,
            timeout_secs: 10,
            success_threshold: 1,
            failure_threshold: 3,
        }
    }
}

impl TargetKind {
    /// Returns the target identifier used to tag decorators.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kubernetes => "kubernetes",
            Self::Openshift => "openshift",
            Self::Knative => "knative",
            Self::Minikube => "minikube",
            Self::Kind => "kind",
        }
    }

    /// Knative rejects startup probes on its services.
    #[must_use]
    pub const fn supports_startup_probe(self) -> bool {
        !matches!(self, Self::Knative)
    }

    /// Knative manages probe ports itself.
    #[must_use]
    pub const fn supports_probe_ports(self) -> bool {
        !matches!(self, Self::Knative)
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for HttpScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => f.write_str("HTTP"),
            Self::Https => f.write_str("HTTPS"),
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Liveness => f.write_str("livenessProbe"),
            Self::Readiness => f.write_str("readinessProbe"),
            Self::Startup => f.write_str("startupProbe"),
        }
    }
}

impl ProbeKind {
    /// All probe kinds, in emission order.
    pub const ALL: [Self; 3] = [Self::Liveness, Self::Readiness, Self::Startup];
}

impl ProbeConfig {
    /// Returns true if the user configured the probe action themselves.
    #[must_use]
    pub const fn has_user_supplied_action(&self) -> bool {
        self.http_action_path.is_some()
            || self.exec_action.is_some()
            || self.tcp_socket_action.is_some()
            || self.grpc_action.is_some()
    }
}

impl DeployConfig {
    /// Returns the target identifiers in declaration order.
    #[must_use]
    pub fn target_names(&self) -> Vec<&'static str> {
        self.targets.iter().map(|t| t.name.as_str()).collect()
    }

    /// Finds the configuration of a target by identifier.
    #[must_use]
    pub fn find_target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name.as_str() == name)
    }
}

impl TargetConfig {
    /// Creates an empty configuration for the given target.
    #[must_use]
    pub fn new(name: TargetKind) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Returns the configuration of a probe kind.
    #[must_use]
    pub const fn probe(&self, kind: ProbeKind) -> &ProbeConfig {
        match kind {
            ProbeKind::Liveness => &self.liveness_probe,
            ProbeKind::Readiness => &self.readiness_probe,
            ProbeKind::Startup => &self.startup_probe,
        }
    }
}

impl SubjectConfig {
    /// Resolves this configured subject, using `key` when no name is set.
    #[must_use]
    pub fn to_subject(&self, key: &str) -> Subject {
        Subject {
            api_group: self.api_group.clone(),
            kind: self.kind.clone(),
            name: self.name.clone().unwrap_or_else(|| key.to_string()),
            namespace: self.namespace.clone(),
        }
    }
}

impl Subject {
    /// Creates a subject referring to a service account.
    #[must_use]
    pub fn service_account(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            api_group: None,
            kind: String::from("ServiceAccount"),
            name: name.into(),
            namespace,
        }
    }
}

impl RoleRef {
    /// Creates a role reference.
    #[must_use]
    pub fn new(name: impl Into<String>, cluster_wide: bool) -> Self {
        Self {
            name: name.into(),
            cluster_wide,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_defaults() {
        let probe = ProbeConfig::default();
        assert_eq!(probe.initial_delay_secs, 5);
        assert_eq!(probe.failure_threshold, 3);
        assert!(!probe.has_user_supplied_action());
    }

    #[test]
    fn test_user_supplied_action() {
        let probe = ProbeConfig {
            exec_action: Some(String::from("cat /tmp/ready")),
            ..ProbeConfig::default()
        };
        assert!(probe.has_user_supplied_action());

        // A port alone is not an action
        let probe = ProbeConfig {
            http_action_port: Some(9000),
            ..ProbeConfig::default()
        };
        assert!(!probe.has_user_supplied_action());
    }

    #[test]
    fn test_subject_defaults_to_key() {
        let subject = SubjectConfig {
            name: None,
            kind: String::from("User"),
            api_group: Some(String::from("rbac.authorization.k8s.io")),
            namespace: None,
        };
        let resolved = subject.to_subject("alice");
        assert_eq!(resolved.name, "alice");
        assert_eq!(resolved.kind, "User");
    }

    #[test]
    fn test_target_capabilities() {
        assert!(TargetKind::Kubernetes.supports_startup_probe());
        assert!(!TargetKind::Knative.supports_startup_probe());
        assert!(!TargetKind::Knative.supports_probe_ports());
        assert_eq!(TargetKind::Openshift.to_string(), "openshift");
    }
}
