// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sources API client used to look up or register this cluster.

use crate::collaborators::{SourceCheck, SourceRegistrar};
use crate::error::{Error, Result};
use crate::stages::auth::AuthConfig;
use crate::transport::{authorize, http_client};
use crate::types::KokuMetricsConfigStatus;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

const SOURCE_TYPE: &str = "OCP";

#[derive(Debug, Deserialize)]
struct SourceList {
    #[serde(default)]
    data: Vec<SourceRecord>,
}

#[derive(Debug, Deserialize)]
struct SourceRecord {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Serialize)]
struct NewSource<'a> {
    name: &'a str,
    source_type: &'a str,
    source_ref: &'a str,
}

/// `<apiURL><sourcesPath>sources/`
pub fn sources_url(api_url: &str, sources_path: &str) -> Result<Url> {
    let base = format!("{}{}", api_url.trim_end_matches('/'), sources_path);
    let base = if base.ends_with('/') { base } else { format!("{}/", base) };
    Url::parse(&base)
        .and_then(|u| u.join("sources/"))
        .map_err(|e| Error::SourceCheck(format!("invalid sources URL {}: {}", base, e)))
}

#[derive(Debug, Default, Clone)]
pub struct HttpSourceRegistrar;

impl HttpSourceRegistrar {
    pub fn new() -> Self {
        HttpSourceRegistrar
    }

    async fn lookup(&self, status: &KokuMetricsConfigStatus, auth: &AuthConfig) -> Result<bool> {
        let name = status.source.name.as_str();
        let endpoint = sources_url(&status.api_url, &status.source.sources_path)?;
        let client = http_client(auth.validate_cert)?;

        let mut query = endpoint.clone();
        query.query_pairs_mut().append_pair("name", name);
        debug!("Looking up source at {}", query);

        let response = authorize(client.get(query.as_str()), auth).send().await?;
        if !response.status().is_success() {
            return Err(Error::SourceCheck(format!(
                "source lookup returned {}",
                response.status()
            )));
        }

        let list: SourceList = response.json().await?;
        if list.data.iter().any(|s| s.name == name) {
            info!("Source {} is defined", name);
            return Ok(true);
        }

        if !status.source.create_source {
            return Err(Error::SourceCheck(format!("source {} does not exist", name)));
        }

        info!("Creating source {}", name);
        let body = NewSource {
            name,
            source_type: SOURCE_TYPE,
            source_ref: &status.cluster_id,
        };
        let response = authorize(client.post(endpoint.as_str()), auth)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let code = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::SourceCheck(format!(
                "failed to create source {}: {} {}",
                name,
                code,
                text.trim()
            )));
        }
        Ok(true)
    }
}

#[async_trait]
impl SourceRegistrar for HttpSourceRegistrar {
    #[instrument(skip_all, fields(source = %status.source.name))]
    async fn check_or_create(&self, status: &KokuMetricsConfigStatus, auth: &AuthConfig) -> SourceCheck {
        let result = self.lookup(status, auth).await;
        let checked_at = Utc::now();
        match result {
            Ok(defined) => SourceCheck {
                defined,
                checked_at,
                error: None,
            },
            Err(e) => SourceCheck {
                defined: false,
                checked_at,
                error: Some(e),
            },
        }
    }
}
