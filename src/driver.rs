//! Multi-topic driver
//!
//! Runs the reconciler over each declaration file in order, one topic at a
//! time, and prints a report after every topic.

use std::io::Write;
use std::path::PathBuf;

use clap::ValueEnum;
use tracing::{error, info};

use crate::cluster::{TopicAdmin, TopicRegistry};
use crate::error::{Error, Result};
use crate::metrics;
use crate::reconcilers::{ReconciliationReport, TopicReconciler};
use crate::topic::TopicConfigRecord;

/// What to do when one topic fails
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop the whole run at the first failure
    Abort,
    /// Record the failure and move on to the next topic
    Continue,
}

impl ErrorPolicy {
    pub fn from_continue_flag(continue_on_error: bool) -> Self {
        if continue_on_error {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::Abort
        }
    }
}

/// Report rendering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// A topic that failed under [`ErrorPolicy::Continue`]
#[derive(Debug)]
pub struct TopicFailure {
    pub source: PathBuf,
    pub error: Error,
}

/// Outcome of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<ReconciliationReport>,
    pub failures: Vec<TopicFailure>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn created(&self) -> usize {
        self.reports.iter().filter(|r| r.created).count()
    }
}

/// Drives reconciliation over a list of declaration files
pub struct Driver<'a, R, A, W> {
    reconciler: TopicReconciler<'a, R, A>,
    policy: ErrorPolicy,
    format: OutputFormat,
    out: W,
}

impl<'a, R, A, W> Driver<'a, R, A, W>
where
    R: TopicRegistry,
    A: TopicAdmin,
    W: Write,
{
    pub fn new(reconciler: TopicReconciler<'a, R, A>, policy: ErrorPolicy, out: W) -> Self {
        Self {
            reconciler,
            policy,
            format: OutputFormat::default(),
            out,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Reconcile every file in order
    ///
    /// Under [`ErrorPolicy::Abort`] the first error is returned and the
    /// remaining files are not touched.
    pub async fn run(&mut self, files: &[PathBuf]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for path in files {
            let outcome = match TopicConfigRecord::load(path) {
                Ok(record) => self.reconciler.reconcile(&record).await,
                Err(e) => {
                    metrics::TOPICS.with_label_values(&["failure"]).inc();
                    Err(e)
                }
            };

            match outcome {
                Ok(report) => {
                    self.print(&report)?;
                    summary.reports.push(report);
                }
                Err(e) => match self.policy {
                    ErrorPolicy::Abort => return Err(e),
                    ErrorPolicy::Continue => {
                        error!(file = %path.display(), error = %e, "Skipping topic after failure");
                        summary.failures.push(TopicFailure {
                            source: path.clone(),
                            error: e,
                        });
                    }
                },
            }
        }

        info!(
            reconciled = summary.reports.len(),
            created = summary.created(),
            failed = summary.failures.len(),
            "Run finished"
        );

        Ok(summary)
    }

    fn print(&mut self, report: &ReconciliationReport) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", report)?,
            OutputFormat::Json => writeln!(self.out, "{}", serde_json::to_string(report)?)?,
        }
        self.out.flush()?;
        Ok(())
    }

    /// Give back the output sink
    pub fn into_output(self) -> W {
        self.out
    }
}
