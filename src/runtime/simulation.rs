//! Simulated workload: each job is a tokio task that requests resources,
//! works while holding them, then releases them.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::core::{AdmissionController, AdmissionError, AppResult, Grant};
use crate::util::clock::now_ms;
use crate::util::serde::{Priority, RequestId, ResourceAmounts};

/// One simulated requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimJob {
    /// Label used in logs and the timeline.
    pub name: String,
    /// Resources needed.
    pub amounts: ResourceAmounts,
    /// Priority class.
    pub priority: Priority,
}

impl SimJob {
    /// Create a job.
    pub fn new(name: impl Into<String>, amounts: ResourceAmounts, priority: Priority) -> Self {
        Self {
            name: name.into(),
            amounts,
            priority,
        }
    }
}

/// The five-task run: capacities 2/2/2 are shared by tasks needing one of each
/// resource with priorities Low, High, Low, High, Low.
#[must_use]
pub fn demo_jobs() -> Vec<SimJob> {
    [
        Priority::Low,
        Priority::High,
        Priority::Low,
        Priority::High,
        Priority::Low,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, priority)| SimJob::new(format!("Task{}", i + 1), ResourceAmounts::uniform(1), priority))
    .collect()
}

/// Lifecycle step recorded on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimPhase {
    /// Request accepted by the controller.
    Requested,
    /// Grant received; work starts.
    Granted,
    /// Work done; resources about to be returned.
    Released,
    /// Request refused at call time.
    Rejected,
}

/// Timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Job name.
    pub job: String,
    /// Step reached.
    pub phase: SimPhase,
    /// Request id, once assigned.
    pub request_id: Option<RequestId>,
    /// Wall-clock milliseconds.
    pub at_ms: u128,
}

/// Work performed while a grant is held.
#[async_trait]
pub trait GrantedWork: Send + Sync + Clone + 'static {
    /// Do the job's work. Resources are released when this returns.
    async fn perform(&self, job: &SimJob, grant: &Grant);
}

/// Work that just sleeps.
#[derive(Debug, Clone, Copy)]
pub struct SleepWork {
    duration: Duration,
}

impl SleepWork {
    /// Sleep for `duration` per job.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl GrantedWork for SleepWork {
    async fn perform(&self, job: &SimJob, _grant: &Grant) {
        tracing::info!(job = %job.name, "resources allocated, working");
        tokio::time::sleep(self.duration).await;
    }
}

type Timeline = Arc<Mutex<Vec<SimEvent>>>;

fn record(timeline: &Timeline, job: &SimJob, phase: SimPhase, request_id: Option<RequestId>) {
    timeline.lock().push(SimEvent {
        job: job.name.clone(),
        phase,
        request_id,
        at_ms: now_ms(),
    });
}

async fn run_job<W: GrantedWork>(
    controller: AdmissionController,
    job: SimJob,
    work: W,
    timeline: Timeline,
) -> AppResult<()> {
    tracing::info!(
        job = %job.name,
        amounts = %job.amounts,
        priority = %job.priority,
        "requesting resources"
    );
    let pending = match controller.request(job.amounts, job.priority) {
        Ok(pending) => pending,
        Err(err @ AdmissionError::CapacityExceeded { .. }) => {
            tracing::warn!(job = %job.name, error = %err, "failed to allocate resources");
            record(&timeline, &job, SimPhase::Rejected, None);
            return Ok(());
        }
        Err(err) => return Err(err).with_context(|| format!("{} request failed", job.name)),
    };
    let id = pending.id();
    record(&timeline, &job, SimPhase::Requested, Some(id));

    let grant = pending
        .await
        .with_context(|| format!("{} never received its grant", job.name))?;
    record(&timeline, &job, SimPhase::Granted, Some(id));

    work.perform(&job, &grant).await;

    tracing::info!(job = %job.name, "releasing resources");
    // Recorded first so the grant this release unblocks always appears after it.
    record(&timeline, &job, SimPhase::Released, Some(id));
    controller
        .release_grant(grant)
        .with_context(|| format!("{} release failed", job.name))?;
    Ok(())
}

/// Run every job concurrently against `controller` and return the timeline.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
/// The first job that fails for a reason other than `CapacityExceeded`, or a
/// panicked job task.
pub async fn run_simulation<W: GrantedWork>(
    controller: &AdmissionController,
    jobs: Vec<SimJob>,
    work: W,
) -> AppResult<Vec<SimEvent>> {
    let timeline: Timeline = Arc::new(Mutex::new(Vec::with_capacity(jobs.len() * 3)));
    let mut tasks = JoinSet::new();
    for job in jobs {
        tasks.spawn(run_job(
            controller.clone(),
            job,
            work.clone(),
            Arc::clone(&timeline),
        ));
    }
    while let Some(joined) = tasks.join_next().await {
        joined.context("simulation task panicked")??;
    }
    let events = timeline.lock().clone();
    Ok(events)
}
