//! Planning module for resource customization.
//!
//! This module turns configuration and contributed facts into an ordered,
//! target-scoped list of decorators:
//! - Port resolution and HTTP probe targets
//! - RBAC and service account planning
//! - Command, arguments and job composition
//! - Plan fingerprinting

mod command;
mod decorator;
mod engine;
mod hash;
mod jobs;
mod plan;
mod ports;
mod probes;
mod rbac;

pub use command::{contributed_command, plan_args, plan_command};
pub use decorator::{Decorator, DecoratorRecord, DecoratorScope, Probe, ProbeAction};
pub use engine::Planner;
pub use hash::PlanHasher;
pub use jobs::plan_jobs;
pub use plan::{DeploymentPlan, PlanEmitter, TargetPlan};
pub use ports::{Port, PortMap, PortOverride, get_port, report_port_overrides, resolve_ports};
pub use probes::{
    DEFAULT_PROBE_PORT, HttpTarget, plan_probes, resolve_http_target, scheme_for_port,
};
pub use rbac::{
    DEFAULT_ROLE_NAME_VIEW, RbacPlanner, ServiceAccountResolution,
    compute_effective_service_account,
};
