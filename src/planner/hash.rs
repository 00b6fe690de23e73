//! Plan fingerprinting.
//!
//! A fingerprint is a SHA-256 digest over the canonical JSON form of every
//! decorator record, effective service account and port, in plan order.
//! Planning the same input twice must give the same fingerprint.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{DeckhandError, Result};

use super::plan::TargetPlan;

/// Hasher for computing plan fingerprints.
#[derive(Debug, Default)]
pub struct PlanHasher;

impl PlanHasher {
    /// Creates a new plan hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a list of target plans.
    ///
    /// # Errors
    ///
    /// Returns an error if a plan cannot be serialized.
    pub fn hash_targets(&self, targets: &[TargetPlan]) -> Result<String> {
        let mut hasher = Sha256::new();

        for target in targets {
            hasher.update(self.hash_target(target)?.as_bytes());
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Computes the fingerprint of a single target plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan cannot be serialized.
    pub fn hash_target(&self, target: &TargetPlan) -> Result<String> {
        let mut hasher = Sha256::new();

        hasher.update(target.target.as_bytes());
        update_json(&mut hasher, &target.effective_service_account)?;

        // Ports are keyed by name, so iteration is already sorted
        for port in target.ports.values() {
            update_json(&mut hasher, port)?;
        }

        for record in &target.decorators {
            update_json(&mut hasher, record)?;
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two hashes to determine if they are equal.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Feeds the JSON form of `value` into the hasher, followed by a separator.
fn update_json(hasher: &mut Sha256, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| DeckhandError::internal(format!("Failed to serialize plan: {e}")))?;
    hasher.update(&bytes);
    hasher.update([0u8]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectiveServiceAccount;
    use crate::planner::decorator::Decorator;
    use crate::planner::plan::PlanEmitter;
    use crate::planner::ports::PortMap;

    fn target_plan(service_account: &str, args: &[&str]) -> TargetPlan {
        let mut emitter = PlanEmitter::new("kubernetes");
        emitter.emit(Decorator::ApplyArgs {
            resource: String::from("orders"),
            args: args.iter().map(|s| (*s).to_string()).collect(),
        });
        TargetPlan {
            target: String::from("kubernetes"),
            ports: PortMap::new(),
            effective_service_account: EffectiveServiceAccount::new(
                service_account,
                None,
                true,
                "kubernetes",
            ),
            decorators: emitter.into_records(),
        }
    }

    #[test]
    fn test_target_hash_deterministic() {
        let hasher = PlanHasher::new();
        let plan = target_plan("orders", &["--port", "8080"]);

        let hash1 = hasher.hash_target(&plan).unwrap();
        let hash2 = hasher.hash_target(&plan.clone()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_plans_different_hash() {
        let hasher = PlanHasher::new();

        let hash1 = hasher.hash_target(&target_plan("orders", &["a"])).unwrap();
        let hash2 = hasher.hash_target(&target_plan("orders", &["b"])).unwrap();
        let hash3 = hasher.hash_target(&target_plan("billing", &["a"])).unwrap();

        assert_ne!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_argument_boundaries_matter() {
        let hasher = PlanHasher::new();

        let joined = hasher.hash_target(&target_plan("orders", &["ab"])).unwrap();
        let split = hasher.hash_target(&target_plan("orders", &["a", "b"])).unwrap();

        assert_ne!(joined, split);
    }

    #[test]
    fn test_short_hash() {
        let hasher = PlanHasher::new();
        let full_hash = "abcdef1234567890abcdef1234567890";
        let short = hasher.short_hash(full_hash);

        assert_eq!(short, "abcdef12");
        assert_eq!(short.len(), 8);
    }

    #[test]
    fn test_hashes_match() {
        assert!(PlanHasher::hashes_match("abc123", "abc123"));
        assert!(!PlanHasher::hashes_match("abc123", "abc124"));
        assert!(!PlanHasher::hashes_match("abc123", "abc12"));
    }
}
