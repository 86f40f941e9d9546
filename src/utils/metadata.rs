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

//! Label and annotation ownership.
//!
//! Operator-managed keys are kept in sync with the desired value, every other key found on a live
//! object belongs to someone else and is carried over untouched.

use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use std::collections::BTreeMap;

/// `live` extended and overridden by `desired`. Empty results collapse to `None`.
pub fn merge(
    live: Option<&BTreeMap<String, String>>,
    desired: Option<&BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    let mut merged = live.cloned().unwrap_or_default();
    if let Some(desired) = desired {
        merged.extend(desired.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    non_empty(merged)
}

pub fn non_empty(map: BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    if map.is_empty() { None } else { Some(map) }
}

/// Folds the labels and annotations of `live` into `desired`, keeping desired values on conflict.
pub fn merge_into(desired: &mut metav1::ObjectMeta, live: &metav1::ObjectMeta) {
    desired.labels = merge(live.labels.as_ref(), desired.labels.as_ref());
    desired.annotations = merge(live.annotations.as_ref(), desired.annotations.as_ref());
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // Test: foreign keys survive, operator keys win
    #[test]
    fn test_merge_preserves_foreign_keys() {
        let live = map(&[("my-label", "my-value"), ("app.kubernetes.io/name", "stale")]);
        let desired = map(&[("app.kubernetes.io/name", "argo-rollouts")]);

        let merged = merge(Some(&live), Some(&desired)).unwrap();
        assert_eq!(merged.get("my-label").unwrap(), "my-value");
        assert_eq!(merged.get("app.kubernetes.io/name").unwrap(), "argo-rollouts");
    }

    // Test: a live superset merges to itself, empty maps collapse
    #[test]
    fn test_superset_merges_to_itself() {
        let live = map(&[("my-label", "my-value"), ("a", "1")]);
        let desired = map(&[("a", "1")]);

        assert_eq!(merge(Some(&live), Some(&desired)), Some(live.clone()));
        assert_eq!(merge(None, None), None);
        assert_eq!(merge(Some(&BTreeMap::new()), None), None);
        assert_eq!(merge(None, Some(&desired)), Some(desired));
    }

    #[test]
    fn test_merge_into_meta() {
        let live = metav1::ObjectMeta {
            annotations: Some(map(&[("kubectl.kubernetes.io/last-applied-configuration", "{}")])),
            ..Default::default()
        };
        let mut desired = metav1::ObjectMeta {
            labels: Some(map(&[("a", "1")])),
            ..Default::default()
        };

        merge_into(&mut desired, &live);
        assert_eq!(desired.labels, Some(map(&[("a", "1")])));
        assert_eq!(desired.annotations, live.annotations);
    }
}
