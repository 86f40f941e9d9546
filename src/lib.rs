// Copyright 2025 The rollouts-manager Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::config::Config;
use crate::context::Context;
use crate::reconcile::{error_policy, reconcile_rollout_manager};
use crate::store::KubeStore;
use crate::types::v1alpha1::rollout_manager::RolloutManager;
use futures::StreamExt;
use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::api::rbac::v1 as rbacv1;
use kube::runtime::{Controller, watcher};
use kube::{Api, Client, CustomResourceExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;
mod context;
mod diff;
pub mod reconcile;
mod store;
pub mod types;
pub mod utils;

#[cfg(test)]
mod tests;

const CONTROLLER_NAME: &str = "rollouts-manager";

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let config = Config::from_env();
    info!(
        namespace_scoped_only = config.namespace_scoped_only,
        image_override = ?config.image_override,
        "starting {CONTROLLER_NAME}"
    );

    let client = Client::try_default().await?;
    let store = Arc::new(KubeStore::new(client.clone(), CONTROLLER_NAME));

    let context = Context::discover(store, config).await?;
    Controller::new(
        Api::<RolloutManager>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<corev1::ServiceAccount>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<rbacv1::Role>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<rbacv1::RoleBinding>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<corev1::Secret>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<corev1::ConfigMap>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<corev1::Service>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(
        Api::<appsv1::Deployment>::all(client.clone()),
        watcher::Config::default(),
    )
    .shutdown_on_signal()
    .run(reconcile_rollout_manager, error_policy, Arc::new(context))
    .for_each(|res| async move {
        match res {
            Ok((rm, _)) => info!("reconciled successful, object {}", rm.name),
            Err(e) => warn!("reconcile failed: {}", e),
        }
    })
    .await;

    Ok(())
}

pub async fn crd(file: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer: Pin<Box<dyn AsyncWrite + Send>> = if let Some(file) = file {
        Box::pin(
            tokio::fs::OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(file)
                .await?,
        )
    } else {
        Box::pin(tokio::io::stdout())
    };

    writer
        .write_all(serde_yaml_ng::to_string(&RolloutManager::crd())?.as_bytes())
        .await?;
    writer.flush().await?;

    Ok(())
}
