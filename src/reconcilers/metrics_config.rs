// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! KokuMetricsConfig reconciler - runs the collection and upload pipeline for each config.

use crate::constants::ERROR_REQUEUE_SECS;
use crate::error::{Error, Result};
use crate::pipeline::{StageOutcome, StageRunner, Termination};
use crate::reconcilers::context::{Context, RunState};
use crate::stages::auth::resolve_authentication;
use crate::stages::storage::{convert_to_claim, MountState, StorageTarget};
use crate::stages::{collect, package, projector, source, upload};
use crate::types::{KokuMetricsConfig, KokuMetricsConfigSpec, KokuMetricsConfigStatus};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub struct MetricsConfigReconciler {
    client: Client,
    context: Arc<Context>,
}

impl MetricsConfigReconciler {
    pub fn new(client: Client, context: Context) -> Self {
        Self {
            client,
            context: Arc::new(context),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let configs: Api<KokuMetricsConfig> =
            Api::namespaced(self.client.clone(), &self.context.config.namespace);

        Controller::new(configs, watcher::Config::default())
            .run(reconcile, error_policy, self.context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled KokuMetricsConfig: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

#[instrument(skip_all, fields(name = %config.name_any()))]
pub async fn reconcile(config: Arc<KokuMetricsConfig>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = config.namespace().unwrap_or_default();
    let name = config.name_any();

    let Some(fetched) = ctx.configs.fetch(&namespace, &name).await? else {
        info!("KokuMetricsConfig {}/{} is gone, nothing to do", namespace, name);
        return Ok(Action::await_change());
    };

    reconcile_config(&ctx, &fetched, Utc::now()).await?;
    Ok(Action::requeue(ctx.config.requeue_after))
}

/// Run every stage against a private copy of `fetched` and persist the resulting status
pub async fn reconcile_config(
    ctx: &Context,
    fetched: &KokuMetricsConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut state = ctx.state.lock().await;
    let namespace = fetched.namespace().unwrap_or_default();
    let mut status = fetched.status.clone().unwrap_or_default();
    let mut runner = StageRunner::new();

    let flow = run_stages(ctx, &mut state, fetched, &namespace, &mut status, &mut runner, now).await;
    if let ControlFlow::Break(Termination::Failed(e)) = flow {
        runner.push(e);
    }

    if fetched.status.as_ref() != Some(&status) {
        let mut updated = fetched.clone();
        updated.status = Some(status);
        if let Err(e) = ctx.configs.persist_status(&updated, fetched.status.as_ref()).await {
            error!("Failed to persist status: {}", e);
            runner.push(e);
        }
    } else {
        debug!("Status unchanged, not persisting");
    }

    runner.finish()
}

async fn run_stages(
    ctx: &Context,
    state: &mut RunState,
    fetched: &KokuMetricsConfig,
    namespace: &str,
    status: &mut KokuMetricsConfigStatus,
    runner: &mut StageRunner,
    now: DateTime<Utc>,
) -> ControlFlow<Termination> {
    let spec: &KokuMetricsConfigSpec = &fetched.spec;

    if projector::reflect_spec(spec, status) {
        debug!("Status updated from spec");
    }

    runner.observe("storage", storage_stage(ctx, fetched, status).await)?;
    runner.observe("cluster identity", cluster_identity_stage(ctx, status).await)?;
    status.operator_commit = ctx.config.git_commit.clone();

    let auth = match resolve_authentication(ctx.secrets.as_ref(), namespace, status).await {
        Ok(auth) => auth,
        Err(e) => return runner.observe("authentication", StageOutcome::Fatal(e)),
    };

    let changed = source::source_changed(&mut state.previous_source, &spec.source);
    runner.observe(
        "source",
        source::check_source(ctx.sources.as_ref(), &auth, status, changed, now).await,
    )?;

    let dirs = match state.directories(&ctx.config) {
        Ok(dirs) => dirs,
        Err(e) => return runner.observe("directories", StageOutcome::Fatal(e)),
    };

    runner.observe(
        "collection",
        collect::collect_reports(ctx.collector.as_ref(), &mut state.prometheus, &dirs, status, now)
            .await,
    )?;
    runner.observe(
        "packaging",
        package::package_reports(ctx.packager.as_ref(), &dirs, status, now),
    )?;
    runner.observe(
        "upload",
        upload::upload_files(
            ctx.transport.as_ref(),
            ctx.packager.as_ref(),
            &auth,
            &dirs,
            status,
            now,
        )
        .await,
    )?;

    ControlFlow::Continue(())
}

async fn storage_stage(
    ctx: &Context,
    config: &KokuMetricsConfig,
    status: &mut KokuMetricsConfigStatus,
) -> StageOutcome {
    let template = config.claim_template();
    let target = StorageTarget::from(&ctx.config);

    match convert_to_claim(ctx.workloads.as_ref(), &target, &template, &mut status.storage).await {
        Ok(state) => {
            status.storage.persistent_volume_claim = Some(template);
            match state {
                MountState::Mounted => StageOutcome::Completed,
                MountState::Patched => StageOutcome::Halt("deployment is rolling onto the claim"),
            }
        }
        Err(e) => StageOutcome::Fatal(e),
    }
}

async fn cluster_identity_stage(ctx: &Context, status: &mut KokuMetricsConfigStatus) -> StageOutcome {
    if !status.cluster_id.is_empty() {
        return StageOutcome::Skipped("cluster ID known");
    }
    match ctx.identity.cluster_id().await {
        Ok(id) => {
            status.cluster_id = id;
            StageOutcome::Completed
        }
        Err(e) => StageOutcome::Fatal(e),
    }
}

pub fn error_policy(config: Arc<KokuMetricsConfig>, error: &Error, ctx: Arc<Context>) -> Action {
    if error.is_configuration() {
        error!(
            "KokuMetricsConfig {} is misconfigured: {}",
            config.name_any(),
            error
        );
        return Action::requeue(ctx.config.requeue_after);
    }
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
}
