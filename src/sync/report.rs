// Sync summary

use std::fmt;

use super::{FileEntry, SyncTarget, UploadOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub object_key: String,
    pub reason: String,
}

/// Counts accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub deleted_count: usize,
    pub uploaded_count: usize,
    pub failed_count: usize,
    pub failures: Vec<UploadFailure>,
}

impl SyncReport {
    pub fn record(&mut self, entry: &FileEntry, outcome: UploadOutcome) {
        match outcome {
            UploadOutcome::Uploaded => self.uploaded_count += 1,
            UploadOutcome::Failed(reason) => {
                self.failed_count += 1;
                self.failures.push(UploadFailure {
                    object_key: entry.object_key.clone(),
                    reason,
                });
            }
        }
    }

    /// Human-readable block printed at the end of the CLI run.
    pub fn summary<'a>(&'a self, target: &'a SyncTarget) -> Summary<'a> {
        Summary {
            report: self,
            target,
        }
    }
}

pub struct Summary<'a> {
    report: &'a SyncReport,
    target: &'a SyncTarget,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{}", rule)?;
        writeln!(f, "Sync complete")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Deleted:  {} files", self.report.deleted_count)?;
        writeln!(f, "Uploaded: {} files", self.report.uploaded_count)?;
        if self.report.failed_count > 0 {
            writeln!(f, "Failed:   {} files", self.report.failed_count)?;
            for failure in &self.report.failures {
                writeln!(f, "  {}: {}", failure.object_key, failure.reason)?;
            }
        }
        writeln!(f, "Location: {}", self.target.location())?;
        write!(f, "{}", rule)
    }
}
