//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::error::DeckhandError;
use crate::planner::{
    Decorator, DecoratorRecord, DecoratorScope, DeploymentPlan, PlanHasher, PortMap, TargetPlan,
};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Target summary row for table display.
#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Decorators")]
    decorators: usize,
    #[tabled(rename = "Probes")]
    probes: usize,
    #[tabled(rename = "RBAC")]
    rbac: String,
    #[tabled(rename = "Service account")]
    service_account: String,
}

/// Decorator row for table display.
#[derive(Tabled)]
struct DecoratorRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Decorator")]
    kind: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Port row for table display.
#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Container")]
    container_port: String,
    #[tabled(rename = "Host")]
    host_port: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "TLS")]
    tls: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &DeploymentPlan, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json if detailed => {
                serde_json::to_string_pretty(plan).unwrap_or_default()
            }
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanJson::from(plan)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(plan, detailed),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &DeploymentPlan, detailed: bool) -> String {
        if plan.is_empty() {
            return format!(
                "{} No decorators planned for {}.\n",
                "✓".green(),
                plan.application
            );
        }

        let mut output = String::new();

        let _ = writeln!(output, "\nPlan for {}", plan.application.bold());
        let _ = write!(
            output,
            "   Fingerprint: {}\n\n",
            PlanHasher::new().short_hash(&plan.fingerprint)
        );

        let rows: Vec<TargetRow> = plan.targets.iter().map(TargetRow::from).collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if detailed {
            for target in &plan.targets {
                Self::write_target_details(&mut output, target);
            }
        }

        let _ = write!(
            output,
            "\nPlan: {} decorators across {} targets\n",
            plan.decorator_count().to_string().green(),
            plan.targets.len()
        );

        output
    }

    /// Writes the decorator table of one target.
    fn write_target_details(output: &mut String, target: &TargetPlan) {
        let _ = writeln!(output, "\n{}", target.target.bold());

        if target.decorators.is_empty() {
            output.push_str("   Nothing to decorate.\n");
            return;
        }

        let rows: Vec<DecoratorRow> = target
            .decorators
            .iter()
            .enumerate()
            .map(|(i, record)| DecoratorRow {
                index: i + 1,
                kind: Self::format_kind(&record.decorator),
                scope: Self::format_scope(record),
                detail: Self::truncate(&record.decorator.summary(), 60),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');
    }

    /// Formats resolved ports for display.
    #[must_use]
    pub fn format_ports(&self, ports: &[(String, PortMap)]) -> String {
        match self.format {
            OutputFormat::Json => {
                let json: serde_json::Map<String, serde_json::Value> = ports
                    .iter()
                    .map(|(target, ports)| {
                        (
                            target.clone(),
                            serde_json::to_value(ports).unwrap_or_default(),
                        )
                    })
                    .collect();
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let rows: Vec<PortRow> = ports
                    .iter()
                    .flat_map(|(target, ports)| {
                        ports.values().map(move |port| PortRow {
                            target: target.clone(),
                            name: port.name.clone(),
                            container_port: Self::optional(port.container_port),
                            host_port: Self::optional(port.host_port),
                            path: port.path.clone().unwrap_or_else(|| String::from("-")),
                            tls: if port.tls { "yes".green().to_string() } else { String::from("no") },
                        })
                    })
                    .collect();

                if rows.is_empty() {
                    return String::from("   No ports resolved.\n");
                }

                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": result.warnings,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid!\n", "✓".green())
                } else {
                    let mut output = format!("{} Configuration is invalid:\n", "✗".red());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                    output
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output
            }
        }
    }

    /// Formats an error.
    #[must_use]
    pub fn format_error(&self, error: &DeckhandError) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "status": "error",
                    "conflict": error.is_conflict(),
                    "message": error.to_string(),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text if error.is_conflict() => {
                format!("{} Conflict: {error}", "✗".red())
            }
            OutputFormat::Text => format!("{} Error: {error}", "✗".red()),
        }
    }

    /// Formats a decorator kind with color.
    fn format_kind(decorator: &Decorator) -> String {
        let kind = decorator.kind();
        match decorator {
            Decorator::AddRole { .. }
            | Decorator::AddClusterRole { .. }
            | Decorator::AddRoleBinding { .. }
            | Decorator::AddClusterRoleBinding { .. } => kind.yellow().to_string(),
            Decorator::AddServiceAccount { .. } | Decorator::ApplyServiceAccountName { .. } => {
                kind.magenta().to_string()
            }
            Decorator::AddProbe { .. } | Decorator::ApplyHttpGetActionPort { .. } => {
                kind.cyan().to_string()
            }
            Decorator::CreateJob { .. } => kind.green().to_string(),
            Decorator::ApplyCommand { .. }
            | Decorator::ApplyArgs { .. }
            | Decorator::AddEnvVar { .. } => kind.to_string(),
        }
    }

    /// Formats the scope of a record.
    fn format_scope(record: &DecoratorRecord) -> String {
        match &record.scope {
            DecoratorScope::Application => "app".dimmed().to_string(),
            DecoratorScope::Named { kind, name } => format!("{kind}/{name}"),
        }
    }

    fn optional(port: Option<u16>) -> String {
        port.map_or_else(|| String::from("-"), |p| p.to_string())
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

impl From<&TargetPlan> for TargetRow {
    fn from(plan: &TargetPlan) -> Self {
        let service_account = &plan.effective_service_account;
        Self {
            target: plan.target.clone(),
            decorators: plan.decorators.len(),
            probes: plan.count_of("add-probe"),
            rbac: if plan.has_rbac() { String::from("yes") } else { String::from("no") },
            service_account: if service_account.was_set {
                service_account.name.clone()
            } else {
                format!("{} (default)", service_account.name)
            },
        }
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct PlanJson {
    application: String,
    fingerprint: String,
    decorator_count: usize,
    targets: Vec<TargetJson>,
}

#[derive(serde::Serialize)]
struct TargetJson {
    target: String,
    decorators: usize,
    service_account: String,
    service_account_set: bool,
    kinds: Vec<&'static str>,
}

impl From<&DeploymentPlan> for PlanJson {
    fn from(plan: &DeploymentPlan) -> Self {
        Self {
            application: plan.application.clone(),
            fingerprint: plan.fingerprint.clone(),
            decorator_count: plan.decorator_count(),
            targets: plan
                .targets
                .iter()
                .map(|t| TargetJson {
                    target: t.target.clone(),
                    decorators: t.decorators.len(),
                    service_account: t.effective_service_account.name.clone(),
                    service_account_set: t.effective_service_account.was_set,
                    kinds: t.decorators.iter().map(|r| r.decorator.kind()).collect(),
                })
                .collect(),
        }
    }
}
