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

use super::RolloutManager;
use crate::types;
use crate::types::v1alpha1::k8s;
use crate::types::v1alpha1::plugin::{self, Plugin};
use k8s_openapi::api::core::v1 as corev1;
use std::collections::BTreeMap;

pub const TRAFFIC_ROUTER_PLUGINS_KEY: &str = "trafficRouterPlugins";
pub const METRIC_PROVIDER_PLUGINS_KEY: &str = "metricProviderPlugins";

/// Reads a plugin list stored under `key`. A missing key is an empty list.
pub fn read_plugins(
    data: Option<&BTreeMap<String, String>>,
    key: &str,
) -> Result<Vec<Plugin>, types::error::Error> {
    match data.and_then(|d| d.get(key)) {
        Some(raw) if !raw.trim().is_empty() => Ok(serde_yaml_ng::from_str(raw)?),
        _ => Ok(Vec::new()),
    }
}

impl RolloutManager {
    /// The plugin registry read by the rollouts controller at start.
    pub fn new_plugin_config_map(&self) -> Result<corev1::ConfigMap, types::error::Error> {
        let user = self.spec.plugins.clone().unwrap_or_default();
        let traffic = plugin::traffic_router_plugins(&user.traffic_management)?;
        let metric = plugin::metric_provider_plugins(&user.metric)?;

        let data = BTreeMap::from([
            (
                TRAFFIC_ROUTER_PLUGINS_KEY.to_owned(),
                serde_yaml_ng::to_string(&traffic)?,
            ),
            (
                METRIC_PROVIDER_PLUGINS_KEY.to_owned(),
                serde_yaml_ng::to_string(&metric)?,
            ),
        ]);

        Ok(corev1::ConfigMap {
            metadata: self.namespaced_meta(k8s::CONFIG_MAP_NAME, k8s::COMPONENT_CONTROLLER)?,
            data: Some(data),
            ..Default::default()
        })
    }
}
