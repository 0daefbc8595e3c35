//! Sequential execution of the selected tasks

use super::bots::Bots;
use super::context::TaskContext;
use super::reports::Reports;
use crate::models::{BotTask, Lookup, ReportTask, TaskKind};
use crate::services::logging::{log_task_failure, log_task_finished, log_task_start};
use std::future::Future;
use std::time::Instant;

/// Task IDs requested on the command line. Bots run before reports, each in the given order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub bots: Vec<u32>,
    pub reports: Vec<u32>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.bots.is_empty() && self.reports.is_empty()
    }
}

/// Outcome of a run, as `(kind, id)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: Vec<(TaskKind, u32)>,
    pub failed: Vec<(TaskKind, u32)>,
    pub retired: Vec<(TaskKind, u32)>,
    pub unknown: Vec<(TaskKind, u32)>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub struct TaskRunner {
    ctx: TaskContext,
}

impl TaskRunner {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }

    /// Run every selected task. A failing task is logged and does not stop the run.
    pub async fn run(&self, selection: &Selection) -> RunSummary {
        let mut summary = RunSummary::default();

        if !selection.bots.is_empty() {
            self.run_bots(&selection.bots, &mut summary).await;
        }

        if !selection.reports.is_empty() {
            let reports = Reports::new(self.ctx.clone());
            for &id in &selection.reports {
                match ReportTask::lookup(id) {
                    Lookup::Active(task) => {
                        run_one(TaskKind::Report, id, task.name(), reports.run(task), &mut summary)
                            .await
                    }
                    Lookup::Retired => retired(TaskKind::Report, id, &mut summary),
                    Lookup::Unknown => unknown(TaskKind::Report, id, &mut summary),
                }
            }
        }

        tracing::info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            skipped = summary.retired.len() + summary.unknown.len(),
            "Run complete"
        );
        summary
    }

    async fn run_bots(&self, ids: &[u32], summary: &mut RunSummary) {
        let bots = match Bots::new(self.ctx.clone()) {
            Ok(bots) => Some(bots),
            Err(e) => {
                tracing::error!(error = format!("{:#}", e), "Cannot run bot tasks");
                None
            }
        };

        for &id in ids {
            match BotTask::lookup(id) {
                Lookup::Active(task) => match &bots {
                    Some(bots) => {
                        run_one(TaskKind::Bot, id, task.name(), bots.run(task), summary).await
                    }
                    None => summary.failed.push((TaskKind::Bot, id)),
                },
                Lookup::Retired => retired(TaskKind::Bot, id, summary),
                Lookup::Unknown => unknown(TaskKind::Bot, id, summary),
            }
        }
    }
}

async fn run_one<F>(kind: TaskKind, id: u32, name: &str, task: F, summary: &mut RunSummary)
where
    F: Future<Output = anyhow::Result<()>>,
{
    log_task_start(kind, id, name);
    let started = Instant::now();

    match task.await {
        Ok(()) => {
            log_task_finished(kind, id, name, started.elapsed().as_secs_f64());
            summary.succeeded.push((kind, id));
        }
        Err(e) => {
            log_task_failure(kind, id, name, &e);
            summary.failed.push((kind, id));
        }
    }
}

fn retired(kind: TaskKind, id: u32, summary: &mut RunSummary) {
    tracing::info!(kind = %kind, id = id, "Task is retired, skipping");
    summary.retired.push((kind, id));
}

fn unknown(kind: TaskKind, id: u32, summary: &mut RunSummary) {
    tracing::warn!(kind = %kind, id = id, "No such task, skipping");
    summary.unknown.push((kind, id));
}
