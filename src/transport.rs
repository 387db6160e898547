// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! HTTP plumbing shared by the upstream collaborators, and the bundle upload transport.

use crate::collaborators::{UploadReceipt, UploadTransport};
use crate::constants::upload::{ACCEPTED, BUNDLE_CONTENT_TYPE};
use crate::error::{Error, Result};
use crate::stages::auth::{AuthConfig, Credentials};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, RequestBuilder};
use std::path::Path;
use tracing::{debug, instrument};

/// Client honouring the certificate validation setting
pub fn http_client(validate_cert: bool) -> Result<Client> {
    Ok(Client::builder()
        .danger_accept_invalid_certs(!validate_cert)
        .build()?)
}

/// Attach credentials and the operator user agent to a request
pub fn authorize(request: RequestBuilder, auth: &AuthConfig) -> RequestBuilder {
    let request = request.header(header::USER_AGENT, auth.user_agent());
    match &auth.credentials {
        Credentials::None => request,
        Credentials::Bearer(token) => request.bearer_auth(token),
        Credentials::Basic { username, password } => request.basic_auth(username, Some(password)),
    }
}

/// Multipart body with the bundle as its single `file` part
pub async fn multipart_form(path: &Path) -> Result<Form> {
    let data = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let part = Part::bytes(data)
        .file_name(file_name)
        .mime_str(BUNDLE_CONTENT_TYPE)?;
    Ok(Form::new().part("file", part))
}

#[derive(Debug, Default, Clone)]
pub struct ReqwestUploadTransport;

impl ReqwestUploadTransport {
    pub fn new() -> Self {
        ReqwestUploadTransport
    }
}

#[async_trait]
impl UploadTransport for ReqwestUploadTransport {
    #[instrument(skip(self, auth), fields(file = %file.display()))]
    async fn upload(&self, auth: &AuthConfig, url: &str, file: &Path) -> Result<UploadReceipt> {
        let form = multipart_form(file).await?;
        let client = http_client(auth.validate_cert)?;

        let response = match authorize(client.post(url), auth).multipart(form).send().await {
            Ok(r) => r,
            Err(e) => {
                return Ok(UploadReceipt {
                    status: String::new(),
                    time: Utc::now(),
                    error: Some(Error::Http(e)),
                })
            }
        };

        let time = Utc::now();
        let status = response.status();
        debug!("Upload response status {}", status);

        let error = if status.as_u16() == ACCEPTED {
            None
        } else {
            let body = response.text().await.unwrap_or_default();
            Some(Error::Upload(format!("{}: {}", status, body.trim())))
        };

        Ok(UploadReceipt {
            status: status.to_string(),
            time,
            error,
        })
    }
}
