// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cycle-gated check of the upstream source record.

use crate::collaborators::SourceRegistrar;
use crate::pipeline::StageOutcome;
use crate::scheduler::check_cycle;
use crate::stages::auth::AuthConfig;
use crate::types::{KokuMetricsConfigStatus, SourceSpec};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Compare the declared source against the one seen last invocation and remember it.
///
/// The previous value is overwritten whether or not a check ends up running.
pub fn source_changed(previous: &mut Option<SourceSpec>, current: &SourceSpec) -> bool {
    let changed = previous.as_ref().is_some_and(|p| p != current);
    *previous = Some(current.clone());
    changed
}

/// Check or create the source when its definition changed or the check cycle elapsed
pub async fn check_source(
    registrar: &dyn SourceRegistrar,
    auth: &AuthConfig,
    status: &mut KokuMetricsConfigStatus,
    changed: bool,
    now: DateTime<Utc>,
) -> StageOutcome {
    if status.source.name.is_empty() {
        debug!("No source name configured, skipping source check");
        return StageOutcome::Skipped("no source name");
    }

    if changed {
        info!("Source definition changed, checking source");
    } else if !check_cycle(
        "source check",
        status.source.check_cycle,
        status.source.last_check_time,
        now,
    ) {
        return StageOutcome::Skipped("source check not due");
    }

    status.source.error.clear();
    let result = registrar.check_or_create(status, auth).await;

    status.source.source_defined = Some(result.defined);
    status.source.last_check_time = Some(result.checked_at);

    match result.error {
        Some(e) => {
            info!("Source get or create message: {}", e);
            status.source.error = e.to_string();
            StageOutcome::Degraded(e)
        }
        None => StageOutcome::Completed,
    }
}
