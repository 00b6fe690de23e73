//! Configuration module for the planning engine.
//!
//! This module handles all input-related functionality:
//! - Parsing and deserializing `deckhand.yaml`
//! - Loading facts contributed by other build-time components
//! - Validation of configuration values

mod contributions;
mod parser;
mod spec;
mod validator;

pub use contributions::{
    Capabilities, ContributedClusterRole, ContributedClusterRoleBinding, ContributedCommand,
    ContributedJob, ContributedPort, ContributedRole, ContributedRoleBinding,
    ContributedServiceAccount, Contributions, EffectiveServiceAccount, HealthPath, ProbePortName,
    Targetable, filter_by_target, first_for_target,
};
pub use parser::{ConfigParser, find_config_file};
pub use spec::{
    ApplicationConfig, ClusterRoleBindingConfig, ClusterRoleConfig, DEFAULT_HTTP_PORT_NAME,
    DeployConfig, HttpScheme, IngressConfig, PolicyRule, PortConfig, ProbeConfig, ProbeKind,
    RbacConfig, RoleBindingConfig, RoleConfig, RoleRef, ServiceAccountConfig, Subject,
    SubjectConfig, TargetConfig, TargetKind,
};
pub use validator::{ConfigValidator, ValidationResult};
