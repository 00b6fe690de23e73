//! RBAC planning.
//!
//! Resolves the effective service account of a target, then plans roles,
//! cluster roles, their bindings, and the service account resource and
//! reference the bindings depend on.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::config::{
    filter_by_target, ContributedServiceAccount, Contributions, EffectiveServiceAccount,
    RbacConfig, RoleRef, Subject, SubjectConfig, TargetConfig, Targetable,
};
use crate::error::{PlanError, Result};

use super::decorator::Decorator;
use super::plan::PlanEmitter;

/// Cluster role bound when a dependent component asks for RBAC and nothing
/// else names a role.
pub const DEFAULT_ROLE_NAME_VIEW: &str = "view";

/// Outcome of service account resolution for one target.
#[derive(Debug, Clone)]
pub struct ServiceAccountResolution {
    /// The computed effective service account.
    pub effective: EffectiveServiceAccount,
    declared: BTreeSet<(String, Option<String>)>,
}

impl ServiceAccountResolution {
    /// Returns true if a service account resource with this name and
    /// namespace was already declared.
    #[must_use]
    pub fn is_declared(&self, name: &str, namespace: Option<&str>) -> bool {
        self.declared
            .contains(&(name.to_string(), namespace.map(String::from)))
    }
}

struct Candidate {
    name: String,
    namespace: Option<String>,
    use_as_default: bool,
}

/// Declares every contributed and configured service account, and picks the
/// one the workload runs under.
///
/// Contributed accounts are considered before configured ones. The first
/// account flagged `use_as_default` wins, otherwise the first one seen. A
/// target-level `service_account` overrides everything and has no namespace.
/// Without any account the application name is used and the result is not
/// marked as explicitly set.
pub fn compute_effective_service_account(
    emitter: &mut PlanEmitter,
    application: &str,
    target: &TargetConfig,
    contributed: &[ContributedServiceAccount],
) -> ServiceAccountResolution {
    let target_name = target.name.as_str();
    let mut declared = BTreeSet::new();
    let mut chosen: Option<Candidate> = None;

    let contributed = filter_by_target(contributed, target_name).map(|sa| {
        (
            sa.name.clone().unwrap_or_else(|| application.to_string()),
            sa.namespace.clone(),
            sa.labels.clone(),
            sa.use_as_default,
        )
    });
    let configured = target.rbac.service_accounts.iter().map(|(key, sa)| {
        (
            sa.name.clone().unwrap_or_else(|| key.clone()),
            sa.namespace.clone(),
            sa.labels.clone(),
            sa.use_as_default,
        )
    });

    for (name, namespace, labels, use_as_default) in contributed.chain(configured) {
        emitter.emit(Decorator::AddServiceAccount {
            resource: application.to_string(),
            name: name.clone(),
            namespace: namespace.clone(),
            labels,
        });
        declared.insert((name.clone(), namespace.clone()));

        let replace = match &chosen {
            None => true,
            Some(current) => use_as_default && !current.use_as_default,
        };
        if replace {
            chosen = Some(Candidate {
                name,
                namespace,
                use_as_default,
            });
        }
    }

    let effective = if let Some(name) = &target.service_account {
        debug!("Service account '{}' set explicitly for {}", name, target_name);
        EffectiveServiceAccount::new(name.clone(), None, true, target_name)
    } else if let Some(candidate) = chosen {
        EffectiveServiceAccount::new(candidate.name, candidate.namespace, true, target_name)
    } else {
        EffectiveServiceAccount::new(application, None, false, target_name)
    };

    ServiceAccountResolution {
        effective,
        declared,
    }
}

/// Plans the RBAC resources of one target.
#[derive(Debug)]
pub struct RbacPlanner<'a> {
    application: &'a str,
    target: &'a str,
    rbac: &'a RbacConfig,
    contributions: &'a Contributions,
}

impl<'a> RbacPlanner<'a> {
    /// Creates a planner for one target.
    #[must_use]
    pub const fn new(
        application: &'a str,
        target: &'a str,
        rbac: &'a RbacConfig,
        contributions: &'a Contributions,
    ) -> Self {
        Self {
            application,
            target,
            rbac,
            contributions,
        }
    }

    /// Emits the RBAC decorators and returns the effective service account.
    ///
    /// # Errors
    ///
    /// Returns an error if the target does not resolve to exactly one
    /// effective service account, if a configured role binding has no role
    /// to reference, or if a configured cluster role binding has no subjects.
    pub fn plan(
        &self,
        emitter: &mut PlanEmitter,
        resolution: &ServiceAccountResolution,
    ) -> Result<EffectiveServiceAccount> {
        let roles = self.plan_roles(emitter);
        let cluster_roles = self.plan_cluster_roles(emitter);
        let effective = self.select_effective_service_account(&resolution.effective)?;

        let (default_role, default_cluster_wide) = match (roles.first(), cluster_roles.first()) {
            (Some(role), _) => (Some(role.clone()), false),
            (None, Some(cluster_role)) => (Some(cluster_role.clone()), true),
            (None, None) => (None, false),
        };

        let subject = Subject::service_account(effective.name.clone(), effective.namespace.clone());
        let mut requires_service_account = false;

        for binding in filter_by_target(&self.contributions.role_bindings, self.target) {
            emitter.emit(Decorator::AddRoleBinding {
                resource: self.application.to_string(),
                name: self.binding_name(binding.name.as_deref(), &binding.role_ref),
                namespace: binding.namespace.clone(),
                labels: binding.labels.clone(),
                role_ref: binding.role_ref.clone(),
                subjects: binding.subjects.clone(),
            });
        }

        for (key, binding) in &self.rbac.role_bindings {
            let name = binding.name.clone().unwrap_or_else(|| key.clone());

            let subjects = if binding.subjects.is_empty() {
                requires_service_account = true;
                vec![subject.clone()]
            } else {
                resolve_subjects(&binding.subjects)
            };

            let role_name = binding
                .role_name
                .clone()
                .or_else(|| default_role.clone())
                .ok_or_else(|| PlanError::MissingRoleReference {
                    binding: name.clone(),
                })?;
            let cluster_wide = binding.cluster_wide.unwrap_or(default_cluster_wide);

            emitter.emit(Decorator::AddRoleBinding {
                resource: self.application.to_string(),
                name,
                namespace: None,
                labels: binding.labels.clone(),
                role_ref: RoleRef::new(role_name, cluster_wide),
                subjects,
            });
        }

        for binding in filter_by_target(&self.contributions.cluster_role_bindings, self.target) {
            emitter.emit(Decorator::AddClusterRoleBinding {
                resource: self.application.to_string(),
                name: self.binding_name(binding.name.as_deref(), &binding.role_ref),
                labels: binding.labels.clone(),
                role_ref: binding.role_ref.clone(),
                subjects: binding.subjects.clone(),
            });
        }

        for (key, binding) in &self.rbac.cluster_role_bindings {
            let name = binding.name.clone().unwrap_or_else(|| key.clone());
            if binding.subjects.is_empty() {
                return Err(PlanError::MissingSubjects { binding: name }.into());
            }

            emitter.emit(Decorator::AddClusterRoleBinding {
                resource: self.application.to_string(),
                name,
                labels: binding.labels.clone(),
                role_ref: RoleRef::new(binding.role_name.clone(), true),
                subjects: resolve_subjects(&binding.subjects),
            });
        }

        if self.rbac.role_bindings.is_empty() {
            let role_ref = match default_role {
                Some(role) => Some((self.application.to_string(), RoleRef::new(role, default_cluster_wide))),
                None if self.contributions.capabilities.generate_rbac => Some((
                    format!("{}-{DEFAULT_ROLE_NAME_VIEW}", self.application),
                    RoleRef::new(DEFAULT_ROLE_NAME_VIEW, true),
                )),
                None => None,
            };

            if let Some((name, role_ref)) = role_ref {
                info!(
                    "Generating role binding '{}' to {} for {}",
                    name, role_ref.name, self.target
                );
                requires_service_account = true;
                emitter.emit(Decorator::AddRoleBinding {
                    resource: self.application.to_string(),
                    name,
                    namespace: None,
                    labels: BTreeMap::new(),
                    role_ref,
                    subjects: vec![subject],
                });
            }
        }

        if requires_service_account
            && !resolution.is_declared(&effective.name, effective.namespace.as_deref())
        {
            emitter.emit(Decorator::AddServiceAccount {
                resource: self.application.to_string(),
                name: effective.name.clone(),
                namespace: effective.namespace.clone(),
                labels: BTreeMap::new(),
            });
        }

        if effective.was_set || requires_service_account {
            emitter.emit(Decorator::ApplyServiceAccountName {
                resource: self.application.to_string(),
                service_account: effective.name.clone(),
            });
        }

        Ok(effective)
    }

    /// Emits configured and contributed roles, returning the names of the
    /// configured ones in key order.
    fn plan_roles(&self, emitter: &mut PlanEmitter) -> Vec<String> {
        let mut names = Vec::new();

        for (key, role) in &self.rbac.roles {
            let name = role.name.clone().unwrap_or_else(|| key.clone());
            emitter.emit(Decorator::AddRole {
                resource: self.application.to_string(),
                name: name.clone(),
                namespace: role.namespace.clone(),
                labels: role.labels.clone(),
                rules: role.policy_rules.values().cloned().collect(),
            });
            if !names.contains(&name) {
                names.push(name);
            }
        }

        for role in filter_by_target(&self.contributions.roles, self.target) {
            emitter.emit(Decorator::AddRole {
                resource: self.application.to_string(),
                name: role.name.clone(),
                namespace: role.namespace.clone(),
                labels: BTreeMap::new(),
                rules: role.rules.clone(),
            });
        }

        names
    }

    /// Emits configured and contributed cluster roles, returning the names
    /// of the configured ones in key order.
    fn plan_cluster_roles(&self, emitter: &mut PlanEmitter) -> Vec<String> {
        let mut names = Vec::new();

        for (key, cluster_role) in &self.rbac.cluster_roles {
            let name = cluster_role.name.clone().unwrap_or_else(|| key.clone());
            emitter.emit(Decorator::AddClusterRole {
                resource: self.application.to_string(),
                name: name.clone(),
                labels: cluster_role.labels.clone(),
                rules: cluster_role.policy_rules.values().cloned().collect(),
            });
            if !names.contains(&name) {
                names.push(name);
            }
        }

        for cluster_role in filter_by_target(&self.contributions.cluster_roles, self.target) {
            emitter.emit(Decorator::AddClusterRole {
                resource: self.application.to_string(),
                name: cluster_role.name.clone(),
                labels: BTreeMap::new(),
                rules: cluster_role.rules.clone(),
            });
        }

        names
    }

    /// Picks the single effective service account for this target among the
    /// computed one and those contributed by other producers.
    fn select_effective_service_account(
        &self,
        computed: &EffectiveServiceAccount,
    ) -> Result<EffectiveServiceAccount> {
        let mut candidates: Vec<&EffectiveServiceAccount> = std::iter::once(computed)
            .filter(|sa| sa.matches_target(self.target))
            .chain(filter_by_target(
                &self.contributions.effective_service_accounts,
                self.target,
            ))
            .collect();

        match candidates.len() {
            0 => Err(PlanError::NoServiceAccount {
                application: self.application.to_string(),
                target: self.target.to_string(),
            }
            .into()),
            1 => Ok(candidates.remove(0).clone()),
            count => Err(PlanError::AmbiguousServiceAccount {
                application: self.application.to_string(),
                target: self.target.to_string(),
                count,
            }
            .into()),
        }
    }

    fn binding_name(&self, name: Option<&str>, role_ref: &RoleRef) -> String {
        match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}-{}", self.application, role_ref.name),
        }
    }
}

fn resolve_subjects(subjects: &BTreeMap<String, SubjectConfig>) -> Vec<Subject> {
    subjects
        .iter()
        .map(|(key, subject)| subject.to_subject(key))
        .collect()
}
