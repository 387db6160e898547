// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Credential resolution for upstream requests.

use crate::collaborators::SecretStore;
use crate::constants::auth;
use crate::error::{Error, Result};
use crate::types::{AuthType, KokuMetricsConfigStatus};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{error, info, instrument};

/// Resolved credentials; never persisted
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::None => write!(f, "None"),
            Credentials::Bearer(_) => write!(f, "Bearer(<redacted>)"),
            Credentials::Basic { username, .. } => {
                write!(f, "Basic {{ username: {:?}, password: <redacted> }}", username)
            }
        }
    }
}

/// Everything needed to authenticate and attribute an upstream request
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub auth_type: AuthType,
    pub credentials: Credentials,
    pub validate_cert: bool,
    pub cluster_id: String,
    pub operator_commit: String,
}

impl AuthConfig {
    /// Start from the working status, without credentials
    pub fn from_status(status: &KokuMetricsConfigStatus) -> Self {
        AuthConfig {
            auth_type: status.authentication.auth_type,
            credentials: Credentials::None,
            validate_cert: status.upload.validate_cert,
            cluster_id: status.cluster_id.clone(),
            operator_commit: status.operator_commit.clone(),
        }
    }

    pub fn user_agent(&self) -> String {
        format!(
            "koku-metrics-operator/{} cluster/{}",
            self.operator_commit, self.cluster_id
        )
    }
}

#[derive(Deserialize)]
struct SerializedAuthMap {
    #[serde(default)]
    auths: HashMap<String, SerializedAuth>,
}

#[derive(Deserialize)]
struct SerializedAuth {
    #[serde(default)]
    auth: String,
}

/// Extract the upstream bearer token from a `.dockerconfigjson` document
pub fn parse_pull_secret(data: &[u8]) -> Result<String> {
    if data.is_empty() {
        return Err(Error::Authentication(
            "cluster authorization secret did not have data".to_string(),
        ));
    }

    let pull_secret: SerializedAuthMap = serde_json::from_slice(data).map_err(|e| {
        Error::Authentication(format!("unable to unmarshal cluster pull-secret: {}", e))
    })?;

    let Some(entry) = pull_secret.auths.get(auth::PULL_SECRET_AUTH_KEY) else {
        return Err(Error::Authentication(
            "cluster authorization token was not found in secret data".to_string(),
        ));
    };

    let token = entry.auth.trim();
    if token.contains('\n') || token.contains('\r') {
        return Err(Error::InvalidToken("contains newlines".to_string()));
    }
    if token.is_empty() {
        return Err(Error::Authentication(
            "cluster authorization token is not found".to_string(),
        ));
    }
    Ok(token.to_string())
}

/// Obtain the bearer token from the cluster pull secret
#[instrument(skip(secrets))]
pub async fn pull_secret_token(secrets: &dyn SecretStore) -> Result<String> {
    let data = secrets
        .fetch(auth::PULL_SECRET_NAMESPACE, auth::PULL_SECRET_NAME)
        .await?;
    let encoded = data
        .get(auth::PULL_SECRET_DATA_KEY)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let token = parse_pull_secret(encoded)?;
    info!("Found {} token", auth::PULL_SECRET_AUTH_KEY);
    Ok(token)
}

/// Obtain username and password from the named secret in the resource namespace
#[instrument(skip(secrets))]
pub async fn basic_credentials(
    secrets: &dyn SecretStore,
    namespace: &str,
    name: &str,
) -> Result<Credentials> {
    let data = secrets.fetch(namespace, name).await?;

    let Some(username) = data.get(auth::SECRET_USER_KEY) else {
        return Err(Error::Authentication(
            "secret not found with expected user data".to_string(),
        ));
    };
    let Some(password) = data.get(auth::SECRET_PASSWORD_KEY) else {
        return Err(Error::Authentication(
            "secret not found with expected password data".to_string(),
        ));
    };

    Ok(Credentials::Basic {
        username: String::from_utf8_lossy(username).into_owned(),
        password: String::from_utf8_lossy(password).into_owned(),
    })
}

/// Resolve credentials for the configured auth type and record whether they were found
pub async fn resolve_authentication(
    secrets: &dyn SecretStore,
    namespace: &str,
    status: &mut KokuMetricsConfigStatus,
) -> Result<AuthConfig> {
    let mut auth_config = AuthConfig::from_status(status);

    let resolved = match status.authentication.auth_type {
        AuthType::Token => pull_secret_token(secrets).await.map(Credentials::Bearer),
        AuthType::Basic if status.authentication.secret_name.is_empty() => {
            Err(Error::MissingSecretName)
        }
        AuthType::Basic => {
            basic_credentials(secrets, namespace, &status.authentication.secret_name).await
        }
    };

    match resolved {
        Ok(credentials) => {
            status.authentication.credentials_found = Some(true);
            auth_config.credentials = credentials;
            Ok(auth_config)
        }
        Err(e) => {
            error!(
                "Failed to obtain {} authentication credentials: {}",
                status.authentication.auth_type, e
            );
            status.authentication.credentials_found = Some(false);
            Err(e)
        }
    }
}
