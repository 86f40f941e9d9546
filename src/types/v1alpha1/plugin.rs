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

use crate::types;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name of the traffic router plugin that ships with the platform.
pub const OPENSHIFT_ROUTE_PLUGIN_NAME: &str = "argoproj-labs/openshift";
pub const OPENSHIFT_ROUTE_PLUGIN_LOCATION: &str =
    "file:/plugins/rollouts-trafficrouter-openshift/openshift-route-plugin";

/// A traffic management or metric provider plugin, in the shape the rollouts controller reads
/// from its ConfigMap.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    pub name: String,

    pub location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Plugins {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traffic_management: Vec<Plugin>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric: Vec<Plugin>,
}

pub fn openshift_route_plugin() -> Plugin {
    Plugin {
        name: OPENSHIFT_ROUTE_PLUGIN_NAME.to_owned(),
        location: OPENSHIFT_ROUTE_PLUGIN_LOCATION.to_owned(),
        sha256: None,
    }
}

/// Builds the traffic router plugin list: the built-in route plugin first, then the user plugins
/// in the order given. The first occurrence of a name wins.
pub fn traffic_router_plugins(user: &[Plugin]) -> Result<Vec<Plugin>, types::error::Error> {
    let builtin = openshift_route_plugin();
    let mut seen = HashSet::from([builtin.name.clone()]);
    let mut plugins = vec![builtin];

    for plugin in user {
        if plugin.name == OPENSHIFT_ROUTE_PLUGIN_NAME {
            return Err(types::error::Error::ReservedPlugin {
                name: plugin.name.clone(),
            });
        }
        push_unique(&mut plugins, &mut seen, plugin)?;
    }

    Ok(plugins)
}

/// Builds the metric provider plugin list, first occurrence of a name wins.
pub fn metric_provider_plugins(user: &[Plugin]) -> Result<Vec<Plugin>, types::error::Error> {
    let mut seen = HashSet::new();
    let mut plugins = Vec::with_capacity(user.len());
    for plugin in user {
        push_unique(&mut plugins, &mut seen, plugin)?;
    }
    Ok(plugins)
}

fn push_unique(
    plugins: &mut Vec<Plugin>,
    seen: &mut HashSet<String>,
    plugin: &Plugin,
) -> Result<(), types::error::Error> {
    if plugin.location.trim().is_empty() {
        return Err(types::error::Error::MissingPluginLocation {
            name: plugin.name.clone(),
        });
    }
    if seen.insert(plugin.name.clone()) {
        plugins.push(plugin.clone());
    }
    Ok(())
}

/// Compares two plugin lists ignoring order.
pub fn same_plugins(a: &[Plugin], b: &[Plugin]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<_> = a.iter().collect();
    let mut b: Vec<_> = b.iter().collect();
    a.sort_by(|x, y| x.name.cmp(&y.name).then(x.location.cmp(&y.location)));
    b.sort_by(|x, y| x.name.cmp(&y.name).then(x.location.cmp(&y.location)));
    a == b
}
