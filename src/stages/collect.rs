// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Hourly metrics collection into local report files.

use crate::collaborators::{MetricsCollector, PrometheusConnection, PrometheusSettings, ReportWindow};
use crate::dirconfig::DirectoryConfig;
use crate::error::Error;
use crate::pipeline::StageOutcome;
use crate::types::KokuMetricsConfigStatus;
use chrono::{DateTime, Duration, DurationRound, Utc};
use tracing::{error, info};

const HOUR_FORMAT: &str = "%Y-%m-%dT%H";

fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::hours(1)).unwrap_or(t)
}

/// The most recently completed hour: `[HH-1:00:00, HH-1:59:59]`
pub fn report_window(now: DateTime<Utc>) -> ReportWindow {
    let start = truncate_to_hour(now) - Duration::hours(1);
    ReportWindow {
        start,
        end: start + Duration::minutes(59) + Duration::seconds(59),
        step: Duration::minutes(1),
    }
}

/// True when the last successful query happened in the same clock hour as `now`
pub fn already_collected(last_success: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last_success.is_some_and(|last| {
        last.format(HOUR_FORMAT).to_string() == now.format(HOUR_FORMAT).to_string()
    })
}

/// Reuse the cached connection unless the connection parameters changed
pub async fn connection(
    collector: &dyn MetricsCollector,
    cache: &mut Option<PrometheusConnection>,
    settings: &PrometheusSettings,
) -> Result<PrometheusConnection, Error> {
    if let Some(conn) = cache.as_ref().filter(|c| &c.settings == settings) {
        return Ok(conn.clone());
    }

    *cache = None;
    let conn = collector.connect(settings).await?;
    *cache = Some(conn.clone());
    Ok(conn)
}

/// Collect the last completed hour unless it was already collected
pub async fn collect_reports(
    collector: &dyn MetricsCollector,
    cache: &mut Option<PrometheusConnection>,
    dirs: &DirectoryConfig,
    status: &mut KokuMetricsConfigStatus,
    now: DateTime<Utc>,
) -> StageOutcome {
    let settings = PrometheusSettings {
        address: status.prometheus.service_address.clone(),
        skip_tls_verification: status.prometheus.skip_tls_verification,
    };

    let conn = match connection(collector, cache, &settings).await {
        Ok(c) => {
            status.prometheus.prometheus_connected = true;
            status.prometheus.connection_error.clear();
            c
        }
        Err(e) => {
            error!("Failed to get prometheus connection: {}", e);
            status.prometheus.prometheus_connected = false;
            status.prometheus.connection_error = e.to_string();
            return StageOutcome::Degraded(e);
        }
    };

    let window = report_window(now);
    if already_collected(status.prometheus.last_query_success_time, now) {
        info!(
            "Reports already generated for range {} - {}",
            window.start, window.end
        );
        return StageOutcome::Skipped("window already collected");
    }

    status.prometheus.last_query_start_time = Some(now);
    info!("Generating reports for range {} - {}", window.start, window.end);

    match collector.generate_reports(&conn, &window, dirs).await {
        Ok(()) => {
            info!("Reports generated for range {} - {}", window.start, window.end);
            status.prometheus.last_query_success_time = Some(now);
            status.reports.data_collected = true;
            status.reports.data_collection_message.clear();
            StageOutcome::Completed
        }
        Err(e) => {
            status.reports.data_collected = false;
            status.reports.data_collection_message = format!("error: {}", e);
            StageOutcome::Degraded(e)
        }
    }
}
