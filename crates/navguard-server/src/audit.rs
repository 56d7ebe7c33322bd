//! Audit logging for sanitize requests.
//!
//! Every `/sanitize` call emits an [`AuditEntry`] containing:
//! - Request ID (UUID)
//! - SHA-256 hash of the submitted code (never the full code in logs)
//! - A preview of the first 200 bytes of code
//! - Input and output sizes, statements removed
//! - Duration and outcome
//!
//! The [`AuditLogger`] trait allows pluggable backends.

use std::time::Instant;

use chrono::{DateTime, Utc};
use navguard_sanitizer::{Outcome, Sanitized};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Maximum length of the code preview in audit entries.
const CODE_PREVIEW_MAX: usize = 200;

/// A complete audit record for a single sanitize request.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Unique request identifier.
    pub request_id: String,
    /// ISO-8601 timestamp of when the request was received.
    pub timestamp: DateTime<Utc>,
    /// SHA-256 hash of the submitted code.
    pub code_hash: String,
    /// First N bytes of the code (for human review).
    pub code_preview: String,
    /// Size of the submitted code in bytes.
    pub input_bytes: usize,
    /// Size of the returned code in bytes.
    pub output_bytes: usize,
    /// Statements removed by the sanitizer.
    pub removed: usize,
    /// Total sanitize duration in milliseconds.
    pub duration_ms: u64,
    /// Final outcome.
    pub outcome: AuditOutcome,
}

/// The outcome of a sanitize request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum AuditOutcome {
    /// Input was already safe and returned verbatim.
    Clean,
    /// Navigation-redirect statements were removed.
    Stripped,
    /// Input could not be parsed; the fail-safe output was returned.
    Rejected {
        /// Machine-readable reason.
        code: String,
    },
}

impl From<&Outcome> for AuditOutcome {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Clean => Self::Clean,
            Outcome::Stripped { .. } => Self::Stripped,
            Outcome::Rejected(err) => Self::Rejected {
                code: err.code().to_string(),
            },
        }
    }
}

/// Trait for audit log backends.
#[async_trait::async_trait]
pub trait AuditLogger: Send + Sync {
    /// Write an audit entry.
    async fn log(&self, entry: &AuditEntry);
}

/// Compute the SHA-256 hash of a string, returned as a hex string.
pub fn sha256_hex(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Create a code preview (first N bytes, with ellipsis if truncated).
///
/// Truncates at a valid UTF-8 char boundary to avoid panics on multibyte characters.
pub fn code_preview(code: &str) -> String {
    if code.len() <= CODE_PREVIEW_MAX {
        code.to_string()
    } else {
        let mut end = CODE_PREVIEW_MAX;
        while !code.is_char_boundary(end) {
            end -= 1;
        }
        let mut preview = code[..end].to_string();
        preview.push_str("...");
        preview
    }
}

/// Builder for constructing audit entries around a sanitize call.
pub struct AuditEntryBuilder {
    request_id: String,
    timestamp: DateTime<Utc>,
    code_hash: String,
    code_preview: String,
    input_bytes: usize,
    start: Instant,
}

impl AuditEntryBuilder {
    /// Start building an audit entry for submitted code.
    pub fn new(code: &str) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            code_hash: sha256_hex(code),
            code_preview: code_preview(code),
            input_bytes: code.len(),
            start: Instant::now(),
        }
    }

    /// The request identifier assigned to this entry.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Finalize the audit entry with the sanitizer result.
    pub fn finish(self, result: &Sanitized) -> AuditEntry {
        AuditEntry {
            request_id: self.request_id,
            timestamp: self.timestamp,
            code_hash: self.code_hash,
            code_preview: self.code_preview,
            input_bytes: self.input_bytes,
            output_bytes: result.code.len(),
            removed: result.outcome.removed(),
            duration_ms: self.start.elapsed().as_millis() as u64,
            outcome: AuditOutcome::from(&result.outcome),
        }
    }
}

/// A no-op audit logger for when auditing is not needed.
pub struct NoopAuditLogger;

#[async_trait::async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn log(&self, _entry: &AuditEntry) {}
}

/// An audit logger that emits structured events via the [`tracing`] framework.
///
/// Entries are logged at `INFO` level with `audit = true` for easy filtering.
/// The code preview is left out of the event; only its hash is recorded.
pub struct TracingAuditLogger;

#[async_trait::async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log(&self, entry: &AuditEntry) {
        let (outcome, reason) = match &entry.outcome {
            AuditOutcome::Clean => ("clean", ""),
            AuditOutcome::Stripped => ("stripped", ""),
            AuditOutcome::Rejected { code } => ("rejected", code.as_str()),
        };
        tracing::info!(
            audit = true,
            request_id = %entry.request_id,
            code_hash = %entry.code_hash,
            input_bytes = entry.input_bytes,
            output_bytes = entry.output_bytes,
            removed = entry.removed,
            duration_ms = entry.duration_ms,
            outcome = outcome,
            reason = reason,
            "audit"
        );
    }
}
