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

use super::{Comparable, apply_meta, meta_difference, normalize_meta};
use crate::types;
use crate::types::v1alpha1::plugin::same_plugins;
use crate::types::v1alpha1::rollout_manager::{
    METRIC_PROVIDER_PLUGINS_KEY, TRAFFIC_ROUTER_PLUGINS_KEY, read_plugins,
};
use k8s_openapi::api::core::v1 as corev1;
use std::collections::BTreeMap;

const PLUGIN_KEYS: [&str; 2] = [TRAFFIC_ROUTER_PLUGINS_KEY, METRIC_PROVIDER_PLUGINS_KEY];

/// Both plugin lists parse and hold the same plugins, in any order.
fn same_plugin_lists(
    desired: Option<&BTreeMap<String, String>>,
    live: Option<&BTreeMap<String, String>>,
    key: &str,
) -> bool {
    match (read_plugins(desired, key), read_plugins(live, key)) {
        (Ok(a), Ok(b)) => same_plugins(&a, &b),
        _ => false,
    }
}

impl Comparable for corev1::ConfigMap {
    fn normalize(&self) -> Result<Self, types::error::Error> {
        let data: BTreeMap<String, String> = self
            .data
            .iter()
            .flatten()
            .filter(|(k, _)| PLUGIN_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(corev1::ConfigMap {
            metadata: normalize_meta(&self.metadata),
            data: if data.is_empty() { None } else { Some(data) },
            ..Default::default()
        })
    }

    fn first_difference(&self, live: &Self) -> Option<&'static str> {
        if !same_plugin_lists(self.data.as_ref(), live.data.as_ref(), TRAFFIC_ROUTER_PLUGINS_KEY) {
            return Some("data.trafficRouterPlugins");
        }
        if !same_plugin_lists(self.data.as_ref(), live.data.as_ref(), METRIC_PROVIDER_PLUGINS_KEY) {
            return Some("data.metricProviderPlugins");
        }
        meta_difference(&self.metadata, &live.metadata)
    }

    /// Writes the plugin keys; other keys on the live ConfigMap are kept.
    fn apply_to(&self, live: &mut Self) {
        apply_meta(&self.metadata, &mut live.metadata);

        let data = live.data.get_or_insert_with(Default::default);
        for key in PLUGIN_KEYS {
            match self.data.as_ref().and_then(|d| d.get(key)) {
                Some(value) => data.insert(key.to_owned(), value.clone()),
                None => data.remove(key),
            };
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use crate::diff::{Comparable, Verdict, compare};
    use crate::types::v1alpha1::plugin::{Plugin, Plugins};
    use crate::types::v1alpha1::rollout_manager::TRAFFIC_ROUTER_PLUGINS_KEY;

    fn plugin(name: &str) -> Plugin {
        Plugin {
            name: name.into(),
            location: format!("https://example.com/{name}"),
            sha256: None,
        }
    }

    #[test]
    fn test_plugin_order_is_ignored() {
        let mut rm = crate::tests::create_test_rollout_manager();
        rm.spec.plugins = Some(Plugins {
            traffic_management: vec![plugin("a/one"), plugin("b/two")],
            metric: vec![],
        });
        let desired = rm.new_plugin_config_map().unwrap();
        assert_eq!(desired.normalize().unwrap(), desired);

        rm.spec.plugins = Some(Plugins {
            traffic_management: vec![plugin("b/two"), plugin("a/one")],
            metric: vec![],
        });
        let reordered = rm.new_plugin_config_map().unwrap();

        assert_eq!(compare(&desired, &reordered).verdict, Verdict::Unchanged);
    }

    #[test]
    fn test_plugin_change_and_foreign_keys() {
        let rm = crate::tests::create_test_rollout_manager();
        let desired = rm.new_plugin_config_map().unwrap();

        let mut live = desired.clone();
        let data = live.data.as_mut().unwrap();
        data.insert("note".into(), "kept".into());
        data.insert(TRAFFIC_ROUTER_PLUGINS_KEY.into(), "[]\n".into());

        let comparison = compare(&desired, &live);
        assert_eq!(
            comparison.verdict,
            Verdict::Changed("data.trafficRouterPlugins")
        );

        comparison.target.apply_to(&mut live);
        let data = live.data.unwrap();
        assert_eq!(data.get("note").unwrap(), "kept");
        assert_eq!(
            data.get(TRAFFIC_ROUTER_PLUGINS_KEY),
            desired.data.as_ref().unwrap().get(TRAFFIC_ROUTER_PLUGINS_KEY)
        );
    }

    #[test]
    fn test_unparseable_live_data_differs() {
        let rm = crate::tests::create_test_rollout_manager();
        let desired = rm.new_plugin_config_map().unwrap();

        let mut live = desired.clone();
        live.data
            .as_mut()
            .unwrap()
            .insert(TRAFFIC_ROUTER_PLUGINS_KEY.into(), ": : :".into());

        assert_eq!(
            compare(&desired, &live).verdict,
            Verdict::Changed("data.trafficRouterPlugins")
        );
    }
}
