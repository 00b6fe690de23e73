//! Jobs that run alongside the application.

use tracing::debug;

use crate::config::{filter_by_target, ContributedJob};

use super::decorator::Decorator;
use super::plan::PlanEmitter;

/// Resource kind the job decorators are scoped to.
const JOB_KIND: &str = "Job";

/// Emits the decorators of every contributed job of the target.
///
/// Each job inherits the service account applied to the application so
/// far, then gets its own environment and finally its resource.
pub fn plan_jobs(emitter: &mut PlanEmitter, jobs: &[ContributedJob]) {
    let target = emitter.target().to_string();

    let service_accounts: Vec<Decorator> = emitter
        .records()
        .iter()
        .filter(|r| matches!(r.decorator, Decorator::ApplyServiceAccountName { .. }))
        .map(|r| r.decorator.clone())
        .collect();

    for job in filter_by_target(jobs, &target) {
        debug!("Planning job '{}' for {}", job.name, target);

        for decorator in &service_accounts {
            emitter.emit_scoped(JOB_KIND, &job.name, decorator.clone());
        }

        for (name, value) in &job.env {
            emitter.emit_scoped(
                JOB_KIND,
                &job.name,
                Decorator::AddEnvVar {
                    resource: job.name.clone(),
                    name: name.clone(),
                    value: value.clone(),
                },
            );
        }

        emitter.emit(Decorator::CreateJob {
            name: job.name.clone(),
            image: job.image.clone(),
            command: job.command.clone(),
            arguments: job.arguments.clone(),
        });
    }
}
