// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is reported
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are reported
#![warn(unused_variables)]            // Unused variables are reported
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Deckhand
//!
//! A deterministic planning engine for customizing generated deployment resources.
//!
//! ## Overview
//!
//! Deckhand combines declarative configuration with facts contributed by other
//! build-time components and decides, per deployment target, which mutations
//! ("decorators") to apply to the generated resources:
//!
//! - Merge contributed ports with configured overrides and reject collisions
//! - Resolve the port and scheme of HTTP probes
//! - Plan roles, bindings and the single effective service account
//! - Compose the container command and arguments
//!
//! ## Architecture
//!
//! Every target is planned independently, from fully loaded input:
//!
//! 1. **Configuration**: Defined in `deckhand.yaml`
//! 2. **Contributions**: Facts supplied by other components, optionally per target
//! 3. **Planner**: Emits an ordered, target-scoped list of decorator records
//!
//! The same input always yields the same plan, and the plan fingerprint proves it.
//!
//! ## Modules
//!
//! - [`config`]: Configuration and contributions parsing and validation
//! - [`planner`]: Port, probe, RBAC and command planning
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! application:
//!   name: orders
//!
//! targets:
//!   - name: kubernetes
//!     ports:
//!       http:
//!         container_port: 9090
//!     rbac:
//!       roles:
//!         pod-reader:
//!           policy_rules:
//!             pods:
//!               api_groups: [""]
//!               resources: ["pods"]
//!               verbs: ["get", "list"]
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod planner;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, Contributions, DeployConfig};
pub use error::{DeckhandError, Result};
pub use planner::{DecoratorRecord, DeploymentPlan, PlanHasher, Planner, TargetPlan};
