use validator::Validate;

use crate::{api::Provider, error::ClientError};

pub const DEFAULT_TOTAL_COUNT: u32 = 100;
pub const DEFAULT_BATCH_SIZE: u32 = 10;
pub const DEFAULT_PAUSE_SECS: u64 = 5;

/// Parameters of one bulk send, as entered by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct BulkJobRequest {
    #[validate(length(min = 1, message = "Please enter at least one phone number"))]
    pub destinations: Vec<String>,
    /// Number of sends to issue; independent of the number of destinations.
    #[validate(range(min = 1, message = "Please enter valid positive numbers"))]
    pub total_count: u32,
    #[validate(range(min = 1, message = "Please enter valid positive numbers"))]
    pub batch_size: u32,
    #[validate(range(min = 1, message = "Please enter valid positive numbers"))]
    pub pause_secs: u64,
    pub provider: Provider,
}

impl Default for BulkJobRequest {
    fn default() -> Self {
        Self {
            destinations: Vec::new(),
            total_count: DEFAULT_TOTAL_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            pause_secs: DEFAULT_PAUSE_SECS,
            provider: Provider::default(),
        }
    }
}

impl BulkJobRequest {
    /// Default pacing for the given newline-separated destination list.
    pub fn from_text(destinations: &str) -> Self {
        Self {
            destinations: parse_destinations(destinations),
            ..Self::default()
        }
    }

    pub fn check(&self) -> Result<(), ClientError> {
        self.validate().map_err(ClientError::from)
    }

    pub fn plan(&self) -> BatchPlan {
        plan_batches(self.total_count, self.batch_size)
    }
}

/// One destination per line; surrounding whitespace trimmed, blank lines dropped.
/// Order and duplicates are kept.
pub fn parse_destinations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split `total` into batches of `batch_size`; only the last batch may be smaller.
pub fn plan_batches(total: u32, batch_size: u32) -> BatchPlan {
    BatchPlan {
        remaining: if batch_size == 0 { 0 } else { total },
        batch_size,
    }
}

/// Batch sizes of a job, yielded one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    remaining: u32,
    batch_size: u32,
}

impl BatchPlan {
    /// Batches still to be yielded.
    pub fn batch_count(&self) -> u32 {
        if self.batch_size == 0 {
            return 0;
        }
        self.remaining.div_ceil(self.batch_size)
    }
}

impl Iterator for BatchPlan {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let size = self.batch_size.min(self.remaining);
        self.remaining -= size;
        Some(size)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = usize::try_from(self.batch_count()).ok();
        (count.unwrap_or(usize::MAX), count)
    }
}
