// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Prometheus backed report collection.

use crate::collaborators::{MetricsCollector, PrometheusConnection, PrometheusSettings, ReportWindow};
use crate::dirconfig::DirectoryConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// One report file and the query feeding it
#[derive(Debug, Clone, Copy)]
pub struct ReportQuery {
    pub name: &'static str,
    pub query: &'static str,
    pub labels: &'static [&'static str],
}

const POD_LABELS: &[&str] = &["namespace", "pod", "node"];
const NODE_LABELS: &[&str] = &["node"];
const VOLUME_LABELS: &[&str] = &["namespace", "persistentvolumeclaim"];

pub const REPORT_QUERIES: &[ReportQuery] = &[
    ReportQuery {
        name: "pod-cpu-usage",
        query: r#"sum by (namespace, pod, node) (rate(container_cpu_usage_seconds_total{container!="",container!="POD",pod!=""}[5m]))"#,
        labels: POD_LABELS,
    },
    ReportQuery {
        name: "pod-memory-usage",
        query: r#"sum by (namespace, pod, node) (container_memory_usage_bytes{container!="",container!="POD",pod!=""})"#,
        labels: POD_LABELS,
    },
    ReportQuery {
        name: "pod-cpu-requests",
        query: r#"sum by (namespace, pod, node) (kube_pod_container_resource_requests{resource="cpu"})"#,
        labels: POD_LABELS,
    },
    ReportQuery {
        name: "pod-memory-requests",
        query: r#"sum by (namespace, pod, node) (kube_pod_container_resource_requests{resource="memory"})"#,
        labels: POD_LABELS,
    },
    ReportQuery {
        name: "node-capacity-cpu",
        query: r#"max by (node) (kube_node_status_capacity{resource="cpu"})"#,
        labels: NODE_LABELS,
    },
    ReportQuery {
        name: "node-capacity-memory",
        query: r#"max by (node) (kube_node_status_capacity{resource="memory"})"#,
        labels: NODE_LABELS,
    },
    ReportQuery {
        name: "pvc-usage",
        query: r#"sum by (namespace, persistentvolumeclaim) (kubelet_volume_stats_used_bytes)"#,
        labels: VOLUME_LABELS,
    },
];

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<MatrixData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatrixData {
    #[serde(default)]
    result: Vec<Series>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// Name of the CSV file for a report and window, e.g. `pod-cpu-usage-2024031013.csv`
pub fn report_file_name(report: &str, window_start: DateTime<Utc>) -> String {
    format!("{}-{}.csv", report, window_start.format("%Y%m%d%H"))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_csv(query: &ReportQuery, series: &[Series]) -> String {
    let mut out = String::from("interval_start");
    for label in query.labels {
        out.push(',');
        out.push_str(label);
    }
    out.push_str(",value\n");

    for s in series {
        for (ts, value) in &s.values {
            let secs = ts.trunc() as i64;
            let start = DateTime::<Utc>::from_timestamp(secs, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            out.push_str(&start);
            for label in query.labels {
                let v = s.metric.get(*label).map(String::as_str).unwrap_or_default();
                let _ = write!(out, ",{}", csv_field(v));
            }
            let _ = writeln!(out, ",{}", csv_field(value));
        }
    }
    out
}

fn request(conn: &PrometheusConnection, path: &str) -> reqwest::RequestBuilder {
    let url = format!("{}{}", conn.settings.address.trim_end_matches('/'), path);
    let builder = conn.client.get(url);
    match &conn.bearer_token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

async fn decode(response: reqwest::Response) -> Result<ApiResponse> {
    let code = response.status();
    let text = response.text().await?;
    let body: ApiResponse = serde_json::from_str(&text).map_err(|_| {
        Error::Collection(format!("unexpected response {}: {}", code, text.trim()))
    })?;
    if body.status != "success" {
        return Err(Error::Collection(body.error.unwrap_or_else(|| code.to_string())));
    }
    Ok(body)
}

#[derive(Debug, Clone)]
pub struct PrometheusCollector {
    token_path: PathBuf,
}

impl PrometheusCollector {
    pub fn new(token_path: impl Into<PathBuf>) -> Self {
        PrometheusCollector {
            token_path: token_path.into(),
        }
    }

    async fn bearer_token(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.token_path).await {
            Ok(token) => Some(token.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(
                    "Could not read service account token {}: {}",
                    self.token_path.display(),
                    e
                );
                None
            }
        }
    }

    async fn query_range(
        &self,
        conn: &PrometheusConnection,
        query: &ReportQuery,
        window: &ReportWindow,
    ) -> Result<Vec<Series>> {
        let step = format!("{}s", window.step.num_seconds());
        let response = request(conn, "/api/v1/query_range")
            .query(&[
                ("query", query.query.to_string()),
                ("start", window.start.to_rfc3339()),
                ("end", window.end.to_rfc3339()),
                ("step", step),
            ])
            .send()
            .await
            .map_err(|e| Error::Collection(format!("{} query failed: {}", query.name, e)))?;

        let body = decode(response).await?;
        Ok(body.data.map(|d| d.result).unwrap_or_default())
    }
}

#[async_trait]
impl MetricsCollector for PrometheusCollector {
    #[instrument(skip(self))]
    async fn connect(&self, settings: &PrometheusSettings) -> Result<PrometheusConnection> {
        let client = Client::builder()
            .danger_accept_invalid_certs(settings.skip_tls_verification)
            .build()
            .map_err(|e| Error::PrometheusConnection(e.to_string()))?;

        let conn = PrometheusConnection {
            settings: settings.clone(),
            client,
            bearer_token: self.bearer_token().await,
        };

        let response = request(&conn, "/api/v1/query")
            .query(&[("query", "up")])
            .send()
            .await
            .map_err(|e| Error::PrometheusConnection(e.to_string()))?;
        decode(response)
            .await
            .map_err(|e| Error::PrometheusConnection(e.to_string()))?;

        info!("Connected to prometheus at {}", settings.address);
        Ok(conn)
    }

    #[instrument(skip_all, fields(start = %window.start))]
    async fn generate_reports(
        &self,
        conn: &PrometheusConnection,
        window: &ReportWindow,
        dirs: &DirectoryConfig,
    ) -> Result<()> {
        for query in REPORT_QUERIES {
            let series = self.query_range(conn, query, window).await?;
            let path = dirs.reports.join(report_file_name(query.name, window.start));
            debug!("Writing {} series to {}", series.len(), path.display());
            tokio::fs::write(&path, render_csv(query, &series)).await?;
        }
        Ok(())
    }
}
