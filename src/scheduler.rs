// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cycle gating for periodic actions.

use chrono::{DateTime, Utc};
use tracing::info;

/// Decide whether an action running every `interval_minutes` is due.
///
/// An action that has never succeeded is always due. Must be evaluated on every
/// invocation since `now` moves between invocations.
pub fn is_due(interval_minutes: i64, last_success: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_success {
        None => true,
        Some(last) => (now - last).num_minutes() >= interval_minutes,
    }
}

/// Same as [`is_due`] but logs the decision for the named action
pub fn check_cycle(
    action: &str,
    interval_minutes: i64,
    last_success: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let Some(last) = last_success else {
        info!("There have been no prior successful {}s", action);
        return true;
    };

    let minutes = (now - last).num_minutes();
    info!("It has been {} minute(s) since the last successful {}", minutes, action);

    let due = is_due(interval_minutes, last_success, now);
    if due {
        info!("Executing {}", action);
    } else {
        info!("Not time to execute the {}", action);
    }
    due
}
