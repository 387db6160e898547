// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Ordered stage outcomes and error aggregation for one invocation.

use crate::error::{Error, Result};
use std::ops::ControlFlow;
use tracing::{debug, error, info, warn};

/// Result of running a single stage
#[derive(Debug)]
pub enum StageOutcome {
    Completed,
    /// Gate not open, nothing to do
    Skipped(&'static str),
    /// End the invocation successfully without running later stages
    Halt(&'static str),
    /// Failure recorded in status only; later stages still run
    Degraded(Error),
    /// Failure reported to the caller after later stages have run
    Retryable(Error),
    /// Abort the remaining stages
    Fatal(Error),
}

/// Why a pipeline stopped before its last stage
#[derive(Debug)]
pub enum Termination {
    Halted,
    Failed(Error),
}

/// Observes stage outcomes in order and aggregates the retryable errors
#[derive(Debug, Default)]
pub struct StageRunner {
    errors: Vec<Error>,
}

impl StageRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome; `Break` means the remaining stages must not run
    pub fn observe(&mut self, stage: &str, outcome: StageOutcome) -> ControlFlow<Termination> {
        match outcome {
            StageOutcome::Completed => {
                debug!("Stage {} completed", stage);
                ControlFlow::Continue(())
            }
            StageOutcome::Skipped(reason) => {
                debug!("Stage {} skipped: {}", stage, reason);
                ControlFlow::Continue(())
            }
            StageOutcome::Halt(reason) => {
                info!("Stage {} ended the invocation: {}", stage, reason);
                ControlFlow::Break(Termination::Halted)
            }
            StageOutcome::Degraded(e) => {
                warn!("Stage {} failed, continuing: {}", stage, e);
                ControlFlow::Continue(())
            }
            StageOutcome::Retryable(e) => {
                error!("Stage {} failed: {}", stage, e);
                self.errors.push(e);
                ControlFlow::Continue(())
            }
            StageOutcome::Fatal(e) => {
                error!("Stage {} failed, aborting: {}", stage, e);
                ControlFlow::Break(Termination::Failed(e))
            }
        }
    }

    /// Add an error that did not come from a stage (e.g. persisting status)
    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    /// Combine every recorded error into one, keeping each message
    pub fn finish(self) -> Result<()> {
        concat_errors(self.errors)
    }
}

/// Join errors into a single newline-separated error; a lone error is returned as-is
pub fn concat_errors(mut errors: Vec<Error>) -> Result<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(Error::Aggregate(errors.iter().map(ToString::to_string).collect())),
    }
}
