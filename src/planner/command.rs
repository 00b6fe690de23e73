//! Container command and argument composition.

use tracing::debug;

use crate::config::{first_for_target, ContributedCommand, TargetConfig};

use super::decorator::Decorator;
use super::plan::PlanEmitter;

/// Emits the command decorator of one target.
///
/// A configured command replaces the contributed one entirely.
pub fn plan_command(
    emitter: &mut PlanEmitter,
    resource: &str,
    target: &TargetConfig,
    contributed: Option<&ContributedCommand>,
) {
    let command = match (&target.command, contributed) {
        (Some(configured), _) => configured.clone(),
        (None, Some(contributed)) => contributed.command.clone(),
        (None, None) => return,
    };

    debug!("Container command for {}: {:?}", target.name, command);
    emitter.emit(Decorator::ApplyCommand {
        resource: resource.to_string(),
        command,
    });
}

/// Emits the arguments decorator of one target.
///
/// Contributed arguments come first, configured ones are appended. Nothing
/// is emitted when both are empty.
pub fn plan_args(
    emitter: &mut PlanEmitter,
    resource: &str,
    target: &TargetConfig,
    contributed: Option<&ContributedCommand>,
) {
    let args: Vec<String> = contributed
        .map(|c| c.args.as_slice())
        .unwrap_or_default()
        .iter()
        .chain(target.arguments.iter().flatten())
        .cloned()
        .collect();

    if args.is_empty() {
        return;
    }

    emitter.emit(Decorator::ApplyArgs {
        resource: resource.to_string(),
        args,
    });
}

/// Finds the contributed command for a target.
#[must_use]
pub fn contributed_command<'a>(
    commands: &'a [ContributedCommand],
    target: &TargetConfig,
) -> Option<&'a ContributedCommand> {
    first_for_target(commands, target.name.as_str())
}
