// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reflect declared spec values into the working status.

use crate::constants::defaults;
use crate::types::{KokuMetricsConfigSpec, KokuMetricsConfigStatus};
use rand::Rng;
use tracing::debug;

/// Make a string status item reflect the spec item, falling back to `default` when the spec is empty.
///
/// Returns true when the status value changed.
pub fn reflect_string(spec_item: &str, status_item: &mut String, default: &str) -> bool {
    if !status_item.is_empty() && spec_item == status_item.as_str() {
        return false;
    }

    let value = if !spec_item.is_empty() {
        spec_item
    } else if !default.is_empty() {
        default
    } else {
        spec_item
    };

    assign(status_item, value.to_string())
}

fn assign<T: PartialEq>(target: &mut T, value: T) -> bool {
    if *target == value {
        return false;
    }
    *target = value;
    true
}

/// Reflect the whole spec into status, generating an upload wait if none exists yet
pub fn reflect_spec(spec: &KokuMetricsConfigSpec, status: &mut KokuMetricsConfigStatus) -> bool {
    reflect_spec_with(spec, status, &mut rand::thread_rng())
}

pub fn reflect_spec_with<R: Rng>(
    spec: &KokuMetricsConfigSpec,
    status: &mut KokuMetricsConfigStatus,
    rng: &mut R,
) -> bool {
    let mut changed = false;

    changed |= reflect_string(&spec.api_url, &mut status.api_url, defaults::API_URL);

    let auth = &mut status.authentication;
    changed |= reflect_string(&spec.authentication.secret_name, &mut auth.secret_name, "");
    changed |= assign(&mut auth.auth_type, spec.authentication.auth_type);

    let upload = &mut status.upload;
    changed |= assign(&mut upload.validate_cert, spec.upload.validate_cert.unwrap_or(true));
    changed |= reflect_string(
        &spec.upload.ingress_path,
        &mut upload.ingress_path,
        defaults::INGRESS_PATH,
    );
    changed |= assign(&mut upload.upload, spec.upload.upload_toggle.unwrap_or(true));
    changed |= assign(
        &mut upload.upload_cycle,
        spec.upload.upload_cycle.unwrap_or(defaults::UPLOAD_CYCLE),
    );
    if let Some(wait) = spec.upload.upload_wait {
        changed |= assign(&mut upload.upload_wait, Some(wait));
    }
    if upload.upload_wait.is_none() {
        let wait = rng.gen_range(0..defaults::UPLOAD_WAIT_BOUND);
        debug!("Generated upload wait of {} seconds", wait);
        upload.upload_wait = Some(wait);
        changed = true;
    }

    changed |= assign(
        &mut status.packaging.max_size_mb,
        spec.packaging.max_size_mb.unwrap_or(defaults::MAX_PACKAGE_SIZE),
    );

    let source = &mut status.source;
    changed |= reflect_string(
        &spec.source.sources_path,
        &mut source.sources_path,
        defaults::SOURCES_PATH,
    );
    changed |= reflect_string(&spec.source.name, &mut source.name, "");
    changed |= assign(&mut source.create_source, spec.source.create_source.unwrap_or(false));
    changed |= assign(
        &mut source.check_cycle,
        spec.source.check_cycle.unwrap_or(defaults::SOURCE_CHECK_CYCLE),
    );

    let prometheus = &mut status.prometheus;
    changed |= reflect_string(
        &spec.prometheus_config.service_address,
        &mut prometheus.service_address,
        defaults::PROMETHEUS_ADDRESS,
    );
    changed |= assign(
        &mut prometheus.skip_tls_verification,
        spec.prometheus_config.skip_tls_verification.unwrap_or(false),
    );

    changed
}
