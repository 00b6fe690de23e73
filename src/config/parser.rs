//! Configuration parser for loading configuration and contributed facts.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, DeckhandError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::contributions::Contributions;
use super::spec::DeployConfig;

/// Configuration parser for loading planning input.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = read_file(path)?;
        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeployConfig> {
        debug!("Parsing YAML configuration");

        let config: DeployConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            DeckhandError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed configuration for application: {}", config.application.name);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables are checked in the format:
    /// `DECKHAND_<SECTION>_<KEY>` (e.g., `DECKHAND_APPLICATION_NAME`)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let mut config = self.load_file(path)?;

        // Apply environment overrides
        Self::apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(config: &mut DeployConfig) {
        if let Ok(name) = std::env::var("DECKHAND_APPLICATION_NAME") {
            debug!("Overriding application.name from environment");
            config.application.name = name;
        }

        if let Ok(namespace) = std::env::var("DECKHAND_APPLICATION_NAMESPACE") {
            debug!("Overriding application.namespace from environment");
            config.application.namespace = Some(namespace);
        }

        if let Ok(service_account) = std::env::var("DECKHAND_SERVICE_ACCOUNT") {
            debug!("Overriding service_account of every target from environment");
            for target in &mut config.targets {
                target.service_account = Some(service_account.clone());
            }
        }
    }

    /// Loads contributed facts from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_contributions(&self, path: impl AsRef<Path>) -> Result<Contributions> {
        let path = path.as_ref();
        info!("Loading contributed facts from: {}", path.display());

        let content = read_file(path)?;
        Self::parse_contributions_yaml(&content, Some(path))
    }

    /// Parses contributed facts from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_contributions_yaml(content: &str, source: Option<&Path>) -> Result<Contributions> {
        if content.trim().is_empty() {
            return Ok(Contributions::default());
        }

        let contributions: Contributions = serde_yaml::from_str(content).map_err(|e| {
            DeckhandError::Config(ConfigError::ParseError {
                message: format!("YAML parse error in contributions: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })?;

        debug!(
            "Parsed contributions: {} ports, {} roles, {} service accounts",
            contributions.ports.len(),
            contributions.roles.len(),
            contributions.service_accounts.len()
        );
        Ok(contributions)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                DeckhandError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Reads a whole file, mapping failures to configuration errors.
fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(DeckhandError::Config(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        }));
    }

    std::fs::read_to_string(path).map_err(|e| {
        DeckhandError::Config(ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })
    })
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["deckhand.yaml", "deckhand.yml", ".deckhand.yaml"];

/// Finds the configuration file in the start directory or its parents.
///
/// A relative start directory is resolved against the working directory
/// before walking up to the filesystem root.
///
/// # Errors
///
/// Returns an error if the working directory cannot be read or no
/// configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = std::path::absolute(start_dir.as_ref())?;
    let mut current = start.clone();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(DeckhandError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::spec::{HttpScheme, TargetKind};

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r"
application:
  name: test-app
";
        let parser = ConfigParser::new();
        let result = parser.parse_yaml(yaml, None);
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config.application.name, "test-app");
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
application:
  name: orders
  namespace: shop

targets:
  - name: kubernetes
    service_account: orders-sa
    command: ["java", "-jar", "/app/orders.jar"]
    arguments: ["--verbose"]
    ports:
      http:
        container_port: 9090
      https:
        container_port: 8443
        tls: true
    liveness_probe:
      http_action_port_name: https
      period_secs: 30
    rbac:
      roles:
        pod-reader:
          policy_rules:
            pods:
              api_groups: [""]
              resources: ["pods"]
              verbs: ["get", "list"]
      role_bindings:
        read-pods:
          role_name: pod-reader
  - name: knative
"#;
        let parser = ConfigParser::new();
        let result = parser.parse_yaml(yaml, None);
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.target_names(), vec!["kubernetes", "knative"]);

        let kubernetes = &config.targets[0];
        assert_eq!(kubernetes.name, TargetKind::Kubernetes);
        assert_eq!(kubernetes.ports["https"].container_port, Some(8443));
        assert!(kubernetes.ports["https"].tls);
        assert_eq!(kubernetes.liveness_probe.period_secs, 30);
        assert_eq!(kubernetes.liveness_probe.timeout_secs, 10);
        assert_eq!(kubernetes.ingress.target_port, "http");
        assert_eq!(kubernetes.rbac.roles["pod-reader"].policy_rules["pods"].verbs.len(), 2);

        let knative = &config.targets[1];
        assert!(knative.rbac.roles.is_empty());
        assert_eq!(knative.readiness_probe.http_action_scheme, None::<HttpScheme>);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let parser = ConfigParser::new();
        let result = parser.parse_yaml("application: [", None);
        assert!(matches!(
            result,
            Err(DeckhandError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_empty_contributions() {
        let contributions = ConfigParser::parse_contributions_yaml("  \n", None).unwrap();
        assert!(contributions.ports.is_empty());
        assert!(!contributions.capabilities.generate_rbac);
    }

    #[test]
    fn test_find_config_file_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("deckhand.yaml"), "application:\n  name: x\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("deckhand.yaml"));
    }

    #[test]
    fn test_find_config_file_from_relative_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("deckhand.yaml"), "application:\n  name: x\n").unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(&nested).unwrap();
        let found = find_config_file(".");
        std::env::set_current_dir(previous).unwrap();

        let found = found.unwrap();
        assert_eq!(
            found.canonicalize().unwrap(),
            dir.path().join("deckhand.yaml").canonicalize().unwrap()
        );
    }

    #[test]
    fn test_load_missing_file() {
        let parser = ConfigParser::new();
        let result = parser.load_file("/definitely/not/here/deckhand.yaml");
        assert!(matches!(
            result,
            Err(DeckhandError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
