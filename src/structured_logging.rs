//! Structured logging for build requests

use uuid::Uuid;

use crate::tx_builder::errors::TransactionBuilderError;

/// Structured logger carrying the request id through one build
#[derive(Debug, Clone)]
pub struct BuildLogger {
    request_id: String,
}

impl BuildLogger {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Logger with a fresh v4 request id
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn log_build_started(&self, operation: &str, owner: &str) {
        tracing::debug!(
            request_id = %self.request_id,
            operation = %operation,
            owner = %owner,
            "Build started"
        );
    }

    pub fn log_instructions_planned(&self, operation: &str, labels: &[&'static str]) {
        tracing::debug!(
            request_id = %self.request_id,
            operation = %operation,
            count = labels.len(),
            instructions = ?labels,
            "Instructions planned"
        );
    }

    pub fn log_build_succeeded(&self, operation: &str, size: usize, advisories: usize) {
        tracing::info!(
            request_id = %self.request_id,
            operation = %operation,
            size = size,
            advisories = advisories,
            "Build succeeded"
        );
    }

    pub fn log_build_failed(&self, operation: &str, error: &TransactionBuilderError) {
        tracing::warn!(
            request_id = %self.request_id,
            operation = %operation,
            category = error.category(),
            error = %error,
            "Build failed"
        );
    }
}

impl Default for BuildLogger {
    fn default() -> Self {
        Self::generate()
    }
}
