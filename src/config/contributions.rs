//! Facts contributed by other build-time components.
//!
//! Contributed items arrive as plain lists. Each item may be restricted to a
//! single deployment target; an item without a target applies to all of them.
//! Planning never fails because an item belongs to another target, it is
//! simply skipped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::spec::{HttpScheme, PolicyRule, ProbeKind, RoleRef, Subject};

/// An item that can be restricted to one deployment target.
pub trait Targetable {
    /// Target this item is restricted to, `None` for every target.
    fn target(&self) -> Option<&str>;

    /// Returns true if this item applies to `target`.
    fn matches_target(&self, target: &str) -> bool {
        self.target().is_none_or(|t| t == target)
    }
}

/// Iterates over the items that apply to `target`, preserving order.
pub fn filter_by_target<'a, T: Targetable>(
    items: &'a [T],
    target: &'a str,
) -> impl Iterator<Item = &'a T> + 'a {
    items.iter().filter(move |item| item.matches_target(target))
}

/// Returns the first item that applies to `target`.
#[must_use]
pub fn first_for_target<'a, T: Targetable>(items: &'a [T], target: &str) -> Option<&'a T> {
    items.iter().find(|item| item.matches_target(target))
}

/// All facts contributed to the planner for one build.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Contributions {
    /// Ports the application listens on.
    pub ports: Vec<ContributedPort>,
    /// Container command and arguments.
    pub commands: Vec<ContributedCommand>,
    /// Discovered health-check paths.
    pub health_paths: Vec<HealthPath>,
    /// Port name (and scheme) hints for HTTP probes.
    pub probe_port_names: Vec<ProbePortName>,
    /// Roles required by other components.
    pub roles: Vec<ContributedRole>,
    /// Cluster roles required by other components.
    pub cluster_roles: Vec<ContributedClusterRole>,
    /// Role bindings required by other components.
    pub role_bindings: Vec<ContributedRoleBinding>,
    /// Cluster role bindings required by other components.
    pub cluster_role_bindings: Vec<ContributedClusterRoleBinding>,
    /// Service accounts required by other components.
    pub service_accounts: Vec<ContributedServiceAccount>,
    /// Effective service accounts resolved by other producers.
    pub effective_service_accounts: Vec<EffectiveServiceAccount>,
    /// Jobs that run before the application.
    pub jobs: Vec<ContributedJob>,
    /// Capabilities of dependent components.
    pub capabilities: Capabilities,
}

/// A port contributed by another component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContributedPort {
    /// Port name.
    pub name: String,
    /// Container port number.
    pub port: u16,
    /// Disabled ports are only exposed when configuration names them.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Component that contributed the port.
    #[serde(default)]
    pub source: Option<String>,
    /// Target restriction.
    #[serde(default)]
    pub target: Option<String>,
}

/// Container command and arguments contributed by another component.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContributedCommand {
    /// Command to run.
    pub command: Vec<String>,
    /// Arguments to pass.
    pub args: Vec<String>,
    /// Target restriction.
    pub target: Option<String>,
}

/// A discovered health-check path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthPath {
    /// Probe kind the path serves.
    pub kind: ProbeKind,
    /// HTTP path.
    pub path: String,
    /// Target restriction.
    #[serde(default)]
    pub target: Option<String>,
}

/// Port name hint for HTTP probes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbePortName {
    /// Port name probes should use.
    pub name: String,
    /// Scheme served on that port.
    #[serde(default)]
    pub scheme: Option<HttpScheme>,
    /// Target restriction.
    #[serde(default)]
    pub target: Option<String>,
}

/// A role contributed by another component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContributedRole {
    /// Role name.
    pub name: String,
    /// Role namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Policy rules.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    /// Target restriction.
    #[serde(default)]
    pub target: Option<String>,
}

/// A cluster role contributed by another component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContributedClusterRole {
    /// Cluster role name.
    pub name: String,
    /// Policy rules.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    /// Target restriction.
    #[serde(default)]
    pub target: Option<String>,
}

/// A role binding contributed by another component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContributedRoleBinding {
    /// Binding name, defaults to `<application>-<role>`.
    #[serde(default)]
    pub name: Option<String>,
    /// Binding namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Extra labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Role being bound.
    pub role_ref: RoleRef,
    /// Subjects granted the role.
    #[serde(default)]
    pub subjects: Vec<Subject>,
    /// Target restriction.
    #[serde(default)]
    pub target: Option<String>,
}

/// A cluster role binding contributed by another component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContributedClusterRoleBinding {
    /// Binding name, defaults to `<application>-<role>`.
    #[serde(default)]
    pub name: Option<String>,
    /// Extra labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Cluster role being bound.
    pub role_ref: RoleRef,
    /// Subjects granted the role.
    #[serde(default)]
    pub subjects: Vec<Subject>,
    /// Target restriction.
    #[serde(default)]
    pub target: Option<String>,
}

/// A service account contributed by another component.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContributedServiceAccount {
    /// Account name, defaults to the application name.
    pub name: Option<String>,
    /// Account namespace.
    pub namespace: Option<String>,
    /// Extra labels.
    pub labels: BTreeMap<String, String>,
    /// Whether this account should run the workload.
    pub use_as_default: bool,
    /// Target restriction.
    pub target: Option<String>,
}

/// The single identity a workload runs under on one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectiveServiceAccount {
    /// Service account name.
    pub name: String,
    /// Service account namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Whether the account was chosen explicitly rather than defaulted.
    #[serde(default)]
    pub was_set: bool,
    /// Target this account was resolved for.
    #[serde(default)]
    pub target: Option<String>,
}

/// A job contributed by another component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContributedJob {
    /// Job name.
    pub name: String,
    /// Container image.
    pub image: String,
    /// Container command.
    #[serde(default)]
    pub command: Vec<String>,
    /// Container arguments.
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Environment variables for the job container.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Target restriction.
    #[serde(default)]
    pub target: Option<String>,
}

/// Capabilities of components that depend on the generated resources.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Capabilities {
    /// A cluster client in the application needs read access by default.
    pub generate_rbac: bool,
}

const fn default_enabled() -> bool {
    true
}

macro_rules! impl_targetable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Targetable for $ty {
                fn target(&self) -> Option<&str> {
                    self.target.as_deref()
                }
            }
        )+
    };
}

impl_targetable!(
    ContributedPort,
    ContributedCommand,
    HealthPath,
    ProbePortName,
    ContributedRole,
    ContributedClusterRole,
    ContributedRoleBinding,
    ContributedClusterRoleBinding,
    ContributedServiceAccount,
    EffectiveServiceAccount,
    ContributedJob,
);

impl Contributions {
    /// Returns the health-check path discovered for a probe kind.
    #[must_use]
    pub fn health_path(&self, kind: ProbeKind, target: &str) -> Option<&HealthPath> {
        self.health_paths
            .iter()
            .find(|p| p.kind == kind && p.matches_target(target))
    }

    /// Returns the ports that apply to `target`.
    #[must_use]
    pub fn ports_for(&self, target: &str) -> Vec<ContributedPort> {
        filter_by_target(&self.ports, target).cloned().collect()
    }
}

impl ContributedPort {
    /// Creates an enabled port that applies to every target.
    #[must_use]
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
            enabled: true,
            source: None,
            target: None,
        }
    }

    /// Marks the port as disabled.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl EffectiveServiceAccount {
    /// Creates an effective service account resolved for `target`.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: Option<String>, was_set: bool, target: &str) -> Self {
        Self {
            name: name.into(),
            namespace,
            was_set,
            target: Some(target.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str, target: Option<&str>) -> ContributedRole {
        ContributedRole {
            name: name.to_string(),
            namespace: None,
            rules: vec![],
            target: target.map(String::from),
        }
    }

    #[test]
    fn test_untargeted_items_apply_everywhere() {
        let roles = vec![role("a", None), role("b", Some("openshift")), role("c", Some("kubernetes"))];

        let names: Vec<_> = filter_by_target(&roles, "kubernetes").map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);

        let names: Vec<_> = filter_by_target(&roles, "openshift").map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_first_for_target_skips_other_targets() {
        let commands = vec![
            ContributedCommand {
                command: vec![String::from("knative-only")],
                args: vec![],
                target: Some(String::from("knative")),
            },
            ContributedCommand {
                command: vec![String::from("java")],
                args: vec![],
                target: None,
            },
        ];

        let found = first_for_target(&commands, "kubernetes");
        assert_eq!(found.map(|c| c.command[0].as_str()), Some("java"));
    }

    #[test]
    fn test_parse_contributions_yaml() {
        let yaml = r"
ports:
  - name: http
    port: 8080
  - name: debug
    port: 5005
    enabled: false
health_paths:
  - kind: liveness
    path: /q/health/live
capabilities:
  generate_rbac: true
";
        let contributions: Contributions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(contributions.ports.len(), 2);
        assert!(contributions.ports[0].enabled);
        assert!(!contributions.ports[1].enabled);
        assert!(contributions.capabilities.generate_rbac);
        assert!(contributions.health_path(ProbeKind::Liveness, "kubernetes").is_some());
        assert!(contributions.health_path(ProbeKind::Readiness, "kubernetes").is_none());
    }
}
