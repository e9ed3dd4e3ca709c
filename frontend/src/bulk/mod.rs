mod dispatcher;
mod job;

pub use dispatcher::{
    BulkDispatcher, JobEvent, JobReport, JobState, NoProgress, ProgressSink, COMPLETED_MESSAGE,
};
pub use job::{
    parse_destinations, plan_batches, BatchPlan, BulkJobRequest, DEFAULT_BATCH_SIZE,
    DEFAULT_PAUSE_SECS, DEFAULT_TOTAL_COUNT,
};
