//! Port resolution.
//!
//! Merges contributed ports with configured overrides into the single set of
//! active ports a target exposes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::config::{ContributedPort, PortConfig};
use crate::error::{PlanError, PortConflict, Result};

/// A resolved container port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Port {
    /// Port name, unique within a target.
    pub name: String,
    /// Port the container listens on.
    pub container_port: Option<u16>,
    /// Port exposed on the host.
    pub host_port: Option<u16>,
    /// HTTP path served on this port.
    pub path: Option<String>,
    /// Whether the port serves TLS.
    pub tls: bool,
}

/// Active ports keyed by name.
pub type PortMap = BTreeMap<String, Port>;

impl Port {
    /// Creates a port from a configured override alone.
    #[must_use]
    pub fn from_config(name: &str, config: &PortConfig) -> Self {
        Self {
            name: name.to_string(),
            container_port: config.container_port,
            host_port: config.host_port,
            path: config.path.clone(),
            tls: config.tls,
        }
    }

    /// Overlays the set, non-zero fields of `config` onto this port.
    #[must_use]
    pub fn merged_with(&self, config: &PortConfig) -> Self {
        Self {
            name: self.name.clone(),
            container_port: config
                .container_port
                .filter(|p| *p != 0)
                .or(self.container_port),
            host_port: config.host_port.filter(|p| *p != 0).or(self.host_port),
            path: config
                .path
                .clone()
                .filter(|p| !p.is_empty())
                .or_else(|| self.path.clone()),
            // Contributed ports never carry TLS
            tls: config.tls,
        }
    }
}

impl From<&ContributedPort> for Port {
    fn from(port: &ContributedPort) -> Self {
        Self {
            name: port.name.clone(),
            container_port: Some(port.port),
            host_port: None,
            path: None,
            tls: false,
        }
    }
}

/// Whether configuration overrides the container port of a contributed port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortOverride {
    /// Port name.
    pub name: String,
    /// Component that contributed the port.
    pub source: Option<String>,
    /// Configured container port, if any.
    pub container_port: Option<u16>,
}

/// Reports, for every enabled or configured contributed port, whether
/// configuration overrides its container port.
pub fn report_port_overrides(
    contributed: &[ContributedPort],
    configured: &BTreeMap<String, PortConfig>,
) -> Vec<PortOverride> {
    contributed
        .iter()
        .filter(|port| port.enabled || configured.contains_key(&port.name))
        .map(|port| {
            let report = PortOverride {
                name: port.name.clone(),
                source: port.source.clone(),
                container_port: configured
                    .get(&port.name)
                    .and_then(|config| config.container_port),
            };
            let source = report.source.as_deref().unwrap_or("unknown");
            match report.container_port {
                Some(value) => info!(
                    "The container port {} (from {}) is overridden by configuration: {}",
                    report.name, source, value
                ),
                None => info!(
                    "The container port {} (from {}) is not overridden, using {}",
                    report.name, source, port.port
                ),
            }
            report
        })
        .collect()
}

/// Resolves the active ports of one target.
///
/// Contributed ports are deduplicated by name, first occurrence winning,
/// to form the merge base. Enabled ports must be unique by name and by
/// number. Every configured override is then merged onto its contributed
/// counterpart, or used as is when nothing was contributed under that name,
/// so a configured entry can also expose a disabled port.
///
/// # Errors
///
/// Returns [`PlanError::DuplicatePort`] if two enabled ports share a name or
/// a port number.
pub fn resolve_ports(
    contributed: &[ContributedPort],
    configured: &BTreeMap<String, PortConfig>,
) -> Result<PortMap> {
    let mut all_ports: HashMap<&str, Port> = HashMap::new();
    for port in contributed {
        all_ports
            .entry(port.name.as_str())
            .or_insert_with(|| Port::from(port));
    }

    let mut active = verify_ports(contributed.iter().filter(|p| p.enabled))?;
    report_port_overrides(contributed, configured);

    for (name, config) in configured {
        let port = match all_ports.get(name.as_str()) {
            Some(existing) => existing.merged_with(config),
            None => Port::from_config(name, config),
        };
        active.insert(name.clone(), port);
    }

    debug!("Resolved {} active ports", active.len());
    Ok(active)
}

/// Checks that enabled ports are unique by name and number.
fn verify_ports<'a>(enabled: impl Iterator<Item = &'a ContributedPort>) -> Result<PortMap> {
    let mut by_name = PortMap::new();
    let mut numbers = HashMap::new();

    for port in enabled {
        if by_name.contains_key(&port.name) {
            return Err(PlanError::DuplicatePort(PortConflict::Name(port.name.clone())).into());
        }
        if let Some(previous) = numbers.insert(port.port, port.name.as_str()) {
            debug!("Port {} claimed by both '{}' and '{}'", port.port, previous, port.name);
            return Err(PlanError::DuplicatePort(PortConflict::Number(port.port)).into());
        }
        by_name.insert(port.name.clone(), Port::from(port));
    }

    Ok(by_name)
}

/// Looks up a resolved port by name.
#[must_use]
pub fn get_port<'a>(ports: &'a PortMap, name: &str) -> Option<&'a Port> {
    ports.get(name)
}
