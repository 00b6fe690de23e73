//! The planning engine.
//!
//! Plans every configured target independently. Within a target the
//! decorators are emitted in a fixed order: command, arguments, probes,
//! service accounts, RBAC, jobs.

use tracing::{debug, info, warn};

use crate::config::{Contributions, DeployConfig, TargetConfig};
use crate::error::Result;

use super::command::{contributed_command, plan_args, plan_command};
use super::hash::PlanHasher;
use super::jobs::plan_jobs;
use super::plan::{DeploymentPlan, PlanEmitter, TargetPlan};
use super::ports::{get_port, resolve_ports, PortMap};
use super::probes::plan_probes;
use super::rbac::{compute_effective_service_account, RbacPlanner};

/// Plans decorators from configuration and contributed facts.
#[derive(Debug)]
pub struct Planner<'a> {
    config: &'a DeployConfig,
    contributions: &'a Contributions,
}

impl<'a> Planner<'a> {
    /// Creates a planner over fully loaded input.
    #[must_use]
    pub const fn new(config: &'a DeployConfig, contributions: &'a Contributions) -> Self {
        Self {
            config,
            contributions,
        }
    }

    /// Plans every configured target.
    ///
    /// # Errors
    ///
    /// Returns the first planning conflict found.
    pub fn plan(&self) -> Result<DeploymentPlan> {
        info!(
            "Planning {} targets for application '{}'",
            self.config.targets.len(),
            self.config.application.name
        );

        let targets = self
            .config
            .targets
            .iter()
            .map(|target| self.plan_target(target))
            .collect::<Result<Vec<_>>>()?;

        let fingerprint = PlanHasher::new().hash_targets(&targets)?;
        debug!("Plan fingerprint: {}", fingerprint);

        Ok(DeploymentPlan {
            application: self.config.application.name.clone(),
            fingerprint,
            targets,
        })
    }

    /// Plans a single target.
    ///
    /// # Errors
    ///
    /// Returns an error if ports collide or RBAC cannot be planned.
    pub fn plan_target(&self, target: &TargetConfig) -> Result<TargetPlan> {
        let application = self.config.application.name.as_str();
        let target_name = target.name.as_str();
        debug!("Planning target {}", target_name);

        let ports = self.resolve_ports(target)?;
        let mut emitter = PlanEmitter::new(target_name);

        let command = contributed_command(&self.contributions.commands, target);
        plan_command(&mut emitter, application, target, command);
        plan_args(&mut emitter, application, target, command);

        if get_port(&ports, &target.ingress.target_port).is_some() {
            plan_probes(&mut emitter, application, target, self.contributions, &ports);
        } else {
            debug!(
                "No '{}' port on {}, skipping probes",
                target.ingress.target_port, target_name
            );
        }

        let resolution = compute_effective_service_account(
            &mut emitter,
            application,
            target,
            &self.contributions.service_accounts,
        );
        let effective_service_account =
            RbacPlanner::new(application, target_name, &target.rbac, self.contributions)
                .plan(&mut emitter, &resolution)?;

        plan_jobs(&mut emitter, &self.contributions.jobs);

        if emitter.is_empty() {
            warn!("Nothing to decorate on {}", target_name);
        }
        info!("Planned {} decorators for {}", emitter.len(), target_name);

        Ok(TargetPlan {
            target: target_name.to_string(),
            ports,
            effective_service_account,
            decorators: emitter.into_records(),
        })
    }

    /// Resolves the active ports of a target.
    ///
    /// # Errors
    ///
    /// Returns an error if two enabled ports share a name or number.
    pub fn resolve_ports(&self, target: &TargetConfig) -> Result<PortMap> {
        resolve_ports(&self.contributions.ports_for(target.name.as_str()), &target.ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ApplicationConfig, ClusterRoleBindingConfig, ContributedCommand, ContributedJob,
        ContributedPort, HealthPath, ProbeKind, RoleConfig, TargetKind,
    };
    use crate::error::{DeckhandError, PlanError};
    use crate::planner::decorator::Decorator;

    fn config(targets: Vec<TargetConfig>) -> DeployConfig {
        DeployConfig {
            application: ApplicationConfig {
                name: String::from("orders"),
                namespace: Some(String::from("shop")),
            },
            targets,
        }
    }

    fn contributions() -> Contributions {
        Contributions {
            ports: vec![ContributedPort::new("http", 8080)],
            commands: vec![ContributedCommand {
                command: vec![String::from("java")],
                args: vec![String::from("-jar"), String::from("/app/orders.jar")],
                target: None,
            }],
            health_paths: vec![
                HealthPath {
                    kind: ProbeKind::Liveness,
                    path: String::from("/q/health/live"),
                    target: None,
                },
                HealthPath {
                    kind: ProbeKind::Startup,
                    path: String::from("/q/health/started"),
                    target: None,
                },
            ],
            jobs: vec![ContributedJob {
                name: String::from("flyway"),
                image: String::from("registry.local/orders:1.0"),
                command: vec![],
                arguments: vec![],
                env: std::collections::BTreeMap::new(),
                target: Some(String::from("kubernetes")),
            }],
            ..Contributions::default()
        }
    }

    #[test]
    fn test_plan_order_within_target() {
        let mut target = TargetConfig::new(TargetKind::Kubernetes);
        target.rbac.roles.insert(String::from("reader"), RoleConfig::default());
        let config = config(vec![target]);
        let contributions = contributions();

        let plan = Planner::new(&config, &contributions).plan().unwrap();
        let kubernetes = plan.target("kubernetes").unwrap();
        let kinds: Vec<_> = kubernetes.decorators.iter().map(|r| r.decorator.kind()).collect();

        assert_eq!(
            kinds,
            vec![
                "apply-command",
                "apply-args",
                "add-probe",
                "apply-http-get-action-port",
                "add-probe",
                "apply-http-get-action-port",
                "add-role",
                "add-role-binding",
                "add-service-account",
                "apply-service-account-name",
                "apply-service-account-name",
                "create-job",
            ]
        );
        assert!(kubernetes.decorators.iter().all(|r| r.target == "kubernetes"));
        assert_eq!(kubernetes.effective_service_account.name, "orders");
    }

    #[test]
    fn test_targets_planned_independently() {
        let config = config(vec![
            TargetConfig::new(TargetKind::Kubernetes),
            TargetConfig::new(TargetKind::Knative),
        ]);
        let contributions = contributions();

        let plan = Planner::new(&config, &contributions).plan().unwrap();
        assert_eq!(plan.targets.len(), 2);

        let knative = plan.target("knative").unwrap();
        assert_eq!(knative.count_of("add-probe"), 1);
        assert_eq!(knative.count_of("apply-http-get-action-port"), 0);
        assert_eq!(knative.count_of("create-job"), 0);
    }

    #[test]
    fn test_probes_need_primary_port() {
        let mut target = TargetConfig::new(TargetKind::Kubernetes);
        target.ingress.target_port = String::from("web");
        let config = config(vec![target]);
        let contributions = contributions();

        let plan = Planner::new(&config, &contributions).plan().unwrap();
        assert_eq!(plan.targets[0].count_of("add-probe"), 0);
    }

    #[test]
    fn test_configured_probe_port_wins() {
        let mut target = TargetConfig::new(TargetKind::Kubernetes);
        target.liveness_probe.http_action_port = Some(9999);
        let config = config(vec![target]);
        let contributions = contributions();

        let plan = Planner::new(&config, &contributions).plan().unwrap();
        let port = plan.targets[0].decorators.iter().find_map(|r| match &r.decorator {
            Decorator::ApplyHttpGetActionPort {
                probe_kind: ProbeKind::Liveness,
                port,
                ..
            } => Some(*port),
            _ => None,
        });
        assert_eq!(port, Some(9999));
    }

    #[test]
    fn test_duplicate_ports_abort() {
        let config = config(vec![TargetConfig::new(TargetKind::Kubernetes)]);
        let mut contributions = contributions();
        contributions.ports.push(ContributedPort::new("http", 9090));

        let err = Planner::new(&config, &contributions).plan().unwrap_err();
        assert!(matches!(err, DeckhandError::Plan(PlanError::DuplicatePort(_))));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_missing_subjects_abort() {
        let mut target = TargetConfig::new(TargetKind::Openshift);
        target.rbac.cluster_role_bindings.insert(
            String::from("crb"),
            ClusterRoleBindingConfig {
                role_name: String::from("admin"),
                ..ClusterRoleBindingConfig::default()
            },
        );
        let config = config(vec![target]);

        let result = Planner::new(&config, &Contributions::default()).plan();
        assert!(matches!(
            result,
            Err(DeckhandError::Plan(PlanError::MissingSubjects { .. }))
        ));
    }

    #[test]
    fn test_planning_is_idempotent() {
        let mut target = TargetConfig::new(TargetKind::Kubernetes);
        target.rbac.roles.insert(String::from("reader"), RoleConfig::default());
        target.arguments = Some(vec![String::from("--verbose")]);
        let config = config(vec![target, TargetConfig::new(TargetKind::Openshift)]);
        let contributions = contributions();

        let first = Planner::new(&config, &contributions).plan().unwrap();
        let second = Planner::new(&config, &contributions).plan().unwrap();

        assert_eq!(first, second);
        assert!(PlanHasher::hashes_match(&first.fingerprint, &second.fingerprint));
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }
}
