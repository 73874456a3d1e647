//! Outcome values returned to the host.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of listing a remote path.
///
/// Serializes as `{"files": [...]}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOutcome {
    Files(Vec<String>),
    Error(String),
}

impl ListOutcome {
    pub fn files(&self) -> Option<&[String]> {
        match self {
            ListOutcome::Files(files) => Some(files),
            ListOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ListOutcome::Files(_) => None,
            ListOutcome::Error(error) => Some(error),
        }
    }
}

/// Step of a transfer that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStage {
    /// Opening the source remote.
    Source,
    /// Opening the destination remote.
    Destination,
    /// Copying the file.
    Transfer,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransferStage::Source => "Source",
            TransferStage::Destination => "Destination",
            TransferStage::Transfer => "Transfer",
        };
        f.write_str(label)
    }
}

/// Message reported by a successful transfer.
pub const TRANSFER_COMPLETE: &str = "Transfer complete.";

/// Result of a single-file transfer.
///
/// Serializes as `{"status": "complete", "message": ...}` or
/// `{"status": "failed", "stage": ..., "error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TransferOutcome {
    Complete { message: String },
    Failed { stage: TransferStage, error: String },
}

impl TransferOutcome {
    pub fn complete() -> Self {
        TransferOutcome::Complete {
            message: TRANSFER_COMPLETE.to_string(),
        }
    }

    /// Failure at `stage`, with the message prefixed by the stage name.
    pub fn failed(stage: TransferStage, error: impl fmt::Display) -> Self {
        TransferOutcome::Failed {
            stage,
            error: format!("{} error: {}", stage, error),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, TransferOutcome::Complete { .. })
    }

    /// Human-readable line for either variant.
    pub fn message(&self) -> &str {
        match self {
            TransferOutcome::Complete { message } => message,
            TransferOutcome::Failed { error, .. } => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_outcome_shapes() {
        let files = ListOutcome::Files(vec!["a.txt".into()]);
        assert_eq!(serde_json::to_value(&files).unwrap(), json!({"files": ["a.txt"]}));

        let error = ListOutcome::Error("Error listing: boom".into());
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"error": "Error listing: boom"})
        );
        assert!(error.files().is_none());
    }

    #[test]
    fn test_transfer_outcome_shapes() {
        assert_eq!(
            serde_json::to_value(TransferOutcome::complete()).unwrap(),
            json!({"status": "complete", "message": "Transfer complete."})
        );

        let failed = TransferOutcome::failed(TransferStage::Destination, "bad token");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"status": "failed", "stage": "destination", "error": "Destination error: bad token"})
        );
        assert!(!failed.is_complete());
    }
}
