//! Plan types and the plan emitter.
//!
//! Every planning component writes into a [`PlanEmitter`] scoped to one
//! target. The emitted records are concatenated, in emission order, into a
//! [`TargetPlan`], and the target plans into a [`DeploymentPlan`].

use serde::{Deserialize, Serialize};

use crate::config::EffectiveServiceAccount;

use super::decorator::{Decorator, DecoratorRecord};
use super::ports::PortMap;

/// Collects the decorator records of one target in emission order.
#[derive(Debug)]
pub struct PlanEmitter {
    target: String,
    records: Vec<DecoratorRecord>,
}

/// The planning result for one deployment target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetPlan {
    /// Deployment target identifier.
    pub target: String,
    /// Resolved active ports.
    pub ports: PortMap,
    /// The identity the workload runs under.
    pub effective_service_account: EffectiveServiceAccount,
    /// Decorators in application order.
    pub decorators: Vec<DecoratorRecord>,
}

/// The planning result for every configured target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// Application name.
    pub application: String,
    /// SHA-256 fingerprint of the target plans.
    pub fingerprint: String,
    /// Target plans in configuration order.
    pub targets: Vec<TargetPlan>,
}

impl PlanEmitter {
    /// Creates an emitter for `target`.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            records: Vec::new(),
        }
    }

    /// Returns the target this emitter tags records with.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Emits an application-wide decorator.
    pub fn emit(&mut self, decorator: Decorator) {
        self.records
            .push(DecoratorRecord::new(self.target.clone(), decorator));
    }

    /// Emits a decorator restricted to the resource `kind/name`.
    pub fn emit_scoped(&mut self, kind: &str, name: &str, decorator: Decorator) {
        self.records.push(DecoratorRecord::scoped(
            self.target.clone(),
            kind,
            name,
            decorator,
        ));
    }

    /// Returns the records emitted so far.
    #[must_use]
    pub fn records(&self) -> &[DecoratorRecord] {
        &self.records
    }

    /// Returns the number of records emitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the emitter, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<DecoratorRecord> {
        self.records
    }
}

impl TargetPlan {
    /// Returns the number of decorators of the given kind.
    #[must_use]
    pub fn count_of(&self, kind: &str) -> usize {
        self.decorators
            .iter()
            .filter(|r| r.decorator.kind() == kind)
            .count()
    }

    /// Returns true if any decorator creates or binds RBAC objects.
    #[must_use]
    pub fn has_rbac(&self) -> bool {
        self.decorators.iter().any(|r| {
            matches!(
                r.decorator,
                Decorator::AddRole { .. }
                    | Decorator::AddClusterRole { .. }
                    | Decorator::AddRoleBinding { .. }
                    | Decorator::AddClusterRoleBinding { .. }
            )
        })
    }
}

impl DeploymentPlan {
    /// Returns true if no target has any decorator.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.iter().all(|t| t.decorators.is_empty())
    }

    /// Returns the total number of decorators.
    #[must_use]
    pub fn decorator_count(&self) -> usize {
        self.targets.iter().map(|t| t.decorators.len()).sum()
    }

    /// Finds the plan of one target.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<&TargetPlan> {
        self.targets.iter().find(|t| t.target == name)
    }

    /// Iterates over every record, target by target.
    pub fn records(&self) -> impl Iterator<Item = &DecoratorRecord> {
        self.targets.iter().flat_map(|t| t.decorators.iter())
    }
}

impl std::fmt::Display for TargetPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Target {} ({} decorators, service account {}):",
            self.target,
            self.decorators.len(),
            self.effective_service_account.name
        )?;
        for (i, record) in self.decorators.iter().enumerate() {
            writeln!(f, "  {i}. {record}")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No decorators planned for {}", self.application);
        }

        writeln!(
            f,
            "Plan for {} ({} decorators):",
            self.application,
            self.decorator_count()
        )?;
        for target in &self.targets {
            write!(f, "{target}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> Decorator {
        Decorator::ApplyCommand {
            resource: String::from("orders"),
            command: args.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn test_emitter_tags_target_and_keeps_order() {
        let mut emitter = PlanEmitter::new("openshift");
        emitter.emit(command(&["first"]));
        emitter.emit_scoped("Job", "migrate", command(&["second"]));
        assert_eq!(emitter.len(), 2);

        let records = emitter.into_records();
        assert!(records.iter().all(|r| r.target == "openshift"));
        assert_eq!(records[0].decorator.summary(), "first");
        assert!(!records[1].scope.is_application());
    }

    #[test]
    fn test_plan_counts() {
        let mut emitter = PlanEmitter::new("kubernetes");
        emitter.emit(command(&["java"]));
        let target = TargetPlan {
            target: String::from("kubernetes"),
            ports: PortMap::new(),
            effective_service_account: EffectiveServiceAccount::new(
                "orders",
                None,
                false,
                "kubernetes",
            ),
            decorators: emitter.into_records(),
        };
        assert_eq!(target.count_of("apply-command"), 1);
        assert!(!target.has_rbac());

        let plan = DeploymentPlan {
            application: String::from("orders"),
            fingerprint: String::new(),
            targets: vec![target],
        };
        assert!(!plan.is_empty());
        assert_eq!(plan.decorator_count(), 1);
        assert!(plan.target("kubernetes").is_some());
        assert!(plan.target("knative").is_none());
        assert!(plan.to_string().contains("apply-command java"));
    }
}
