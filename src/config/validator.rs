//! Configuration validation for planning input.
//!
//! Validation only looks at the configuration itself. Conflicts that depend
//! on contributed facts (duplicate ports, ambiguous service accounts, ...)
//! are detected by the planner.

use crate::error::{ConfigError, DeckhandError, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::spec::{
    ApplicationConfig, DeployConfig, PortConfig, ProbeConfig, ProbeKind, RbacConfig, SubjectConfig,
    TargetConfig,
};

/// Validator for planning configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error found if validation fails.
    pub fn validate(&self, config: &DeployConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(DeckhandError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, config: &DeployConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_application(&config.application, &mut result);
        Self::validate_targets(&config.targets, &mut result);

        result
    }

    /// Validates application configuration.
    fn validate_application(application: &ApplicationConfig, result: &mut ValidationResult) {
        if application.name.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("application.name"),
                message: String::from("Application name cannot be empty"),
            });
        } else if !is_valid_name(&application.name) {
            result.errors.push(ValidationError {
                field: String::from("application.name"),
                message: format!(
                    "Application name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    application.name
                ),
            });
        }

        if application.namespace.as_ref().is_some_and(String::is_empty) {
            result.errors.push(ValidationError {
                field: String::from("application.namespace"),
                message: String::from("Namespace cannot be empty when set"),
            });
        }
    }

    /// Validates all target configurations.
    fn validate_targets(targets: &[TargetConfig], result: &mut ValidationResult) {
        if targets.is_empty() {
            result.warnings.push(String::from("No targets defined in configuration"));
            return;
        }

        let mut seen_names = HashSet::new();

        for (i, target) in targets.iter().enumerate() {
            let prefix = format!("targets[{i}]");

            if !seen_names.insert(target.name) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("Duplicate target: {}", target.name),
                });
            }

            if target.service_account.as_ref().is_some_and(String::is_empty) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.service_account"),
                    message: String::from("Service account cannot be empty when set"),
                });
            }

            if target.command.as_ref().is_some_and(Vec::is_empty) {
                result.warnings.push(format!(
                    "{prefix}.command: Empty command will clear the container entrypoint"
                ));
            }

            Self::validate_ports(&target.ports, &prefix, result);

            for kind in ProbeKind::ALL {
                Self::validate_probe(target.probe(kind), &format!("{prefix}.{kind}"), result);
            }

            Self::validate_rbac(&target.rbac, &prefix, result);
        }
    }

    /// Validates port overrides.
    fn validate_ports(
        ports: &BTreeMap<String, PortConfig>,
        prefix: &str,
        result: &mut ValidationResult,
    ) {
        for (name, port) in ports {
            if let Some(path) = &port.path
                && !path.is_empty()
                && !path.starts_with('/') {
                    result.errors.push(ValidationError {
                        field: format!("{prefix}.ports.{name}.path"),
                        message: format!("Port path must be absolute: {path}"),
                    });
                }

            // Check for reserved ports
            if let Some(container_port) = port.container_port
                && container_port != 0
                && container_port < 1024
                && container_port != 80
                && container_port != 443 {
                    result.warnings.push(format!(
                        "{prefix}.ports.{name}: Port {container_port} is in the reserved range (<1024)"
                    ));
                }
        }
    }

    /// Validates a probe configuration.
    fn validate_probe(probe: &ProbeConfig, prefix: &str, result: &mut ValidationResult) {
        if probe.http_action_port == Some(0) {
            result.errors.push(ValidationError {
                field: format!("{prefix}.http_action_port"),
                message: String::from("Probe port must be between 1 and 65535"),
            });
        }

        if probe.exec_action.as_ref().is_some_and(|e| e.trim().is_empty()) {
            result.errors.push(ValidationError {
                field: format!("{prefix}.exec_action"),
                message: String::from("Exec action cannot be blank"),
            });
        }

        if probe.period_secs == 0 {
            result.errors.push(ValidationError {
                field: format!("{prefix}.period_secs"),
                message: String::from("Probe period must be at least 1 second"),
            });
        }
    }

    /// Validates RBAC configuration.
    fn validate_rbac(rbac: &RbacConfig, prefix: &str, result: &mut ValidationResult) {
        for (key, binding) in &rbac.role_bindings {
            Self::validate_subjects(
                &binding.subjects,
                &format!("{prefix}.rbac.role_bindings.{key}"),
                result,
            );
        }

        for (key, binding) in &rbac.cluster_role_bindings {
            let field = format!("{prefix}.rbac.cluster_role_bindings.{key}");
            if binding.role_name.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{field}.role_name"),
                    message: format!("Cluster role binding '{key}' must name a cluster role"),
                });
            }
            Self::validate_subjects(&binding.subjects, &field, result);
        }

        let defaults = rbac
            .service_accounts
            .values()
            .filter(|sa| sa.use_as_default)
            .count();
        if defaults > 1 {
            result.warnings.push(format!(
                "{prefix}.rbac.service_accounts: {defaults} accounts are marked use_as_default, the first one wins"
            ));
        }
    }

    /// Validates binding subjects.
    fn validate_subjects(
        subjects: &BTreeMap<String, SubjectConfig>,
        prefix: &str,
        result: &mut ValidationResult,
    ) {
        for (key, subject) in subjects {
            if subject.kind.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.subjects.{key}.kind"),
                    message: format!("Subject '{key}' must have a kind"),
                });
            }
        }
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    let mut chars = name.chars();

    // First character must be a letter
    if let Some(first) = chars.next()
        && !first.is_ascii_lowercase() {
            return false;
        }

    // Rest must be lowercase alphanumeric or hyphen
    for c in chars {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
            return false;
        }
    }

    // Cannot end with hyphen
    if name.ends_with('-') {
        return false;
    }

    // Cannot have consecutive hyphens
    if name.contains("--") {
        return false;
    }

    true
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::spec::{ClusterRoleBindingConfig, TargetKind};

    fn config_with(targets: Vec<TargetConfig>) -> DeployConfig {
        DeployConfig {
            application: ApplicationConfig {
                name: String::from("orders"),
                namespace: None,
            },
            targets,
        }
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("orders"));
        assert!(is_valid_name("my-app-123"));
        assert!(is_valid_name("a"));
    }

    #[test]
    fn test_invalid_name() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Orders")); // uppercase
        assert!(!is_valid_name("123-app")); // starts with number
        assert!(!is_valid_name("my_app")); // underscore
        assert!(!is_valid_name("app-")); // ends with hyphen
        assert!(!is_valid_name("my--app")); // consecutive hyphens
    }

    #[test]
    fn test_no_targets_is_a_warning() {
        let result = ConfigValidator::new().validate(&config_with(vec![])).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 1);
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let config = config_with(vec![
            TargetConfig::new(TargetKind::Kubernetes),
            TargetConfig::new(TargetKind::Kubernetes),
        ]);
        let result = ConfigValidator::new().validate(&config);
        assert!(matches!(
            result,
            Err(DeckhandError::Config(ConfigError::ValidationError { .. }))
        ));
    }

    #[test]
    fn test_check_collects_every_error() {
        let mut config = config_with(vec![
            TargetConfig::new(TargetKind::Kubernetes),
            TargetConfig::new(TargetKind::Kubernetes),
        ]);
        config.application.name = String::from("Orders");

        let result = ConfigValidator::new().check(&config);
        assert_eq!(result.error_count(), 2);
        assert!(!result.is_valid());
    }

    #[test]
    fn test_relative_port_path_rejected() {
        let mut target = TargetConfig::new(TargetKind::Kubernetes);
        target.ports.insert(
            String::from("http"),
            PortConfig {
                path: Some(String::from("metrics")),
                ..PortConfig::default()
            },
        );
        assert!(ConfigValidator::new().validate(&config_with(vec![target])).is_err());
    }

    #[test]
    fn test_zero_port_override_is_accepted() {
        let mut target = TargetConfig::new(TargetKind::Kubernetes);
        target.ports.insert(
            String::from("http"),
            PortConfig {
                container_port: Some(0),
                ..PortConfig::default()
            },
        );
        let result = ConfigValidator::new().validate(&config_with(vec![target])).unwrap();
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_cluster_role_binding_needs_role_name() {
        let mut target = TargetConfig::new(TargetKind::Openshift);
        target.rbac.cluster_role_bindings.insert(
            String::from("crb"),
            ClusterRoleBindingConfig::default(),
        );
        let err = ConfigValidator::new()
            .validate(&config_with(vec![target]))
            .unwrap_err();
        assert!(err.to_string().contains("must name a cluster role"));
    }
}
