//! Structured batch logging.

use tracing::{error, info, warn, Span};

/// Logger carrying the batch name and operation on every line.
#[derive(Debug, Clone)]
pub struct BatchLogger {
    batch: String,
    operation: String,
}

impl BatchLogger {
    /// `operation` is the kind of run, e.g. "pipeline" or "manual".
    pub fn new(batch: &str, operation: &str) -> Self {
        Self {
            batch: batch.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, total: usize) {
        info!(
            batch = %self.batch,
            operation = %self.operation,
            total,
            "Batch started"
        );
    }

    pub fn log_item_failure(&self, item_id: i64, message: &str) {
        warn!(
            batch = %self.batch,
            operation = %self.operation,
            item_id,
            "Batch item failed: {}", message
        );
    }

    pub fn log_aborted(&self, message: &str) {
        error!(
            batch = %self.batch,
            operation = %self.operation,
            "Batch aborted: {}", message
        );
    }

    pub fn log_completion(&self, attempted: usize, failed: usize) {
        info!(
            batch = %self.batch,
            operation = %self.operation,
            attempted,
            failed,
            "Batch completed"
        );
    }

    pub fn batch(&self) -> &str {
        &self.batch
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!("batch", batch = %self.batch, operation = %self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_fields() {
        let logger = BatchLogger::new("transcribe", "pipeline");
        assert_eq!(logger.batch(), "transcribe");
        assert_eq!(logger.operation(), "pipeline");
        logger.log_start(3);
        logger.log_item_failure(2, "boom");
        logger.log_completion(3, 1);
    }
}
