use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use uuid::Uuid;

use crate::{
    api::{BulkSendRequest, MessagingService},
    error::{ClientError, Notice},
};

use super::job::BulkJobRequest;

pub const COMPLETED_MESSAGE: &str = "Bulk SMS sending completed successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Validating,
    Running,
    Completed,
    Failed,
}

/// Observable side effects of a running job. Progress counts requests issued, not messages
/// confirmed delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    StateChanged(JobState),
    BatchIssued { index: u32, size: u32 },
    /// The service declined one batch; the job carries on.
    BatchRejected { index: u32, error: ClientError },
    Progress { percent: u8, sent: u32 },
    Pausing { seconds: u64 },
}

pub trait ProgressSink: Send {
    fn on_event(&mut self, event: JobEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(JobEvent) + Send,
{
    fn on_event(&mut self, event: JobEvent) {
        self(event)
    }
}

/// Sink for callers that only want the final report.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&mut self, _event: JobEvent) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    /// Correlates the job's log events.
    pub job_id: Uuid,
    pub state: JobState,
    pub progress_percent: u8,
    pub sent: u32,
    pub batches_issued: u32,
    pub rejected_batches: Vec<(u32, ClientError)>,
    pub error: Option<ClientError>,
}

impl JobReport {
    fn new() -> Self {
        Self {
            job_id: Uuid::new_v4(),
            state: JobState::Validating,
            progress_percent: 0,
            sent: 0,
            batches_issued: 0,
            rejected_batches: Vec::new(),
            error: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }

    pub fn notice(&self) -> Option<Notice> {
        match (&self.state, &self.error) {
            (JobState::Completed, _) => Some(Notice::info(COMPLETED_MESSAGE)),
            (JobState::Failed, Some(err)) => Some(Notice::from(err)),
            _ => None,
        }
    }

    /// The terminal error for failed jobs, the report itself otherwise.
    pub fn into_result(self) -> Result<JobReport, ClientError> {
        match self.error.clone() {
            Some(err) if self.state == JobState::Failed => Err(err),
            _ => Ok(self),
        }
    }
}

fn percent(sent: u32, total: u32) -> u8 {
    let value = u64::from(sent) * 100 / u64::from(total.max(1));
    value.min(100) as u8
}

/// Runs paced, batched bulk jobs against the messaging service. A job runs to `Completed` or
/// `Failed` once started; there is no cancel operation. Clones share one job slot, so at most
/// one job is active at a time.
#[derive(Clone)]
pub struct BulkDispatcher {
    service: Arc<dyn MessagingService>,
    active: Arc<AtomicBool>,
}

struct ActiveJob(Arc<AtomicBool>);

impl Drop for ActiveJob {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BulkDispatcher {
    pub fn new(service: Arc<dyn MessagingService>) -> Self {
        Self {
            service,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn run(&self, request: BulkJobRequest, sink: &mut dyn ProgressSink) -> JobReport {
        let mut report = JobReport::new();
        sink.on_event(JobEvent::StateChanged(JobState::Validating));

        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return finish(report, JobState::Failed, Some(ClientError::InFlight), sink);
        }
        let _slot = ActiveJob(Arc::clone(&self.active));

        if let Err(err) = request.check() {
            tracing::warn!(
                job_id = %report.job_id,
                error = %err,
                "Bulk job rejected before start"
            );
            return finish(report, JobState::Failed, Some(err), sink);
        }

        let plan = request.plan();
        let batch_count = plan.batch_count();
        tracing::info!(
            job_id = %report.job_id,
            total = request.total_count,
            batches = batch_count,
            destinations = request.destinations.len(),
            provider = ?request.provider,
            "Bulk job started"
        );
        report.state = JobState::Running;
        sink.on_event(JobEvent::StateChanged(JobState::Running));
        sink.on_event(JobEvent::Progress {
            percent: 0,
            sent: 0,
        });

        for (size, index) in plan.zip(0u32..) {
            let batch = BulkSendRequest {
                phone_numbers: request.destinations.clone(),
                total_sms: size,
                pause_after: request.batch_size,
                pause_seconds: request.pause_secs,
                provider: request.provider,
                batch_index: index,
            };
            tracing::debug!(job_id = %report.job_id, index, size, "Issuing bulk batch");
            sink.on_event(JobEvent::BatchIssued { index, size });

            match self.service.bulk_send(&batch).await {
                Ok(_) => {}
                Err(err) if err.is_transport_level() => {
                    tracing::error!(
                        job_id = %report.job_id,
                        index,
                        error = %err,
                        "Bulk batch failed, aborting job"
                    );
                    return finish(report, JobState::Failed, Some(err), sink);
                }
                Err(err) => {
                    tracing::warn!(
                        job_id = %report.job_id,
                        index,
                        error = %err,
                        "Bulk batch declined by service"
                    );
                    sink.on_event(JobEvent::BatchRejected {
                        index,
                        error: err.clone(),
                    });
                    report.rejected_batches.push((index, err));
                }
            }

            report.batches_issued += 1;
            report.sent += size;
            report.progress_percent = percent(report.sent, request.total_count);
            sink.on_event(JobEvent::Progress {
                percent: report.progress_percent,
                sent: report.sent,
            });

            if index + 1 < batch_count {
                tracing::debug!(
                    job_id = %report.job_id,
                    seconds = request.pause_secs,
                    "Pausing between batches"
                );
                sink.on_event(JobEvent::Pausing {
                    seconds: request.pause_secs,
                });
                tokio::time::sleep(Duration::from_secs(request.pause_secs)).await;
            }
        }

        report.progress_percent = 100;
        finish(report, JobState::Completed, None, sink)
    }
}

fn finish(
    mut report: JobReport,
    state: JobState,
    error: Option<ClientError>,
    sink: &mut dyn ProgressSink,
) -> JobReport {
    report.state = state;
    report.error = error;
    if state == JobState::Completed {
        tracing::info!(
            job_id = %report.job_id,
            sent = report.sent,
            rejected = report.rejected_batches.len(),
            "Bulk job completed"
        );
    }
    sink.on_event(JobEvent::StateChanged(state));
    report
}
