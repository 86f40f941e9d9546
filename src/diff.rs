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

//! Deciding whether a live object matches what the operator wants.
//!
//! Every owned kind implements [`Comparable`]: `normalize` projects an object onto the fields the
//! operator manages (dropping whatever the API server fills in by itself), `first_difference`
//! walks those fields in a fixed order and names the first mismatch, and `apply_to` writes the
//! managed fields back onto a live object before an update.

use crate::types;
use crate::utils::metadata;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use kube::{Resource, ResourceExt};
use std::fmt::Debug;
use tracing::{error, warn};

mod configmap;
mod deployment;
mod rbac;
mod service;

pub trait Comparable: Resource<DynamicType = ()> + Clone + PartialEq + Debug + Sized {
    /// Projects the object onto the fields the operator manages.
    fn normalize(&self) -> Result<Self, types::error::Error>;

    /// Name of the first managed field that differs from `live`. Both sides are normalized.
    fn first_difference(&self, live: &Self) -> Option<&'static str>;

    /// A differing field the API server refuses to change in place.
    fn immutable_difference(&self, live: &Self) -> Option<&'static str> {
        None
    }

    /// Carries foreign labels and annotations of `live` over into this desired object.
    fn merge_metadata(&mut self, live: &Self) {
        metadata::merge_into(self.meta_mut(), live.meta());
    }

    /// Writes the managed fields onto `live`, leaving everything else as found.
    fn apply_to(&self, live: &mut Self);
}

/// Outcome of comparing a desired object with its live counterpart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Unchanged,
    Changed(&'static str),
    /// The difference is in an immutable field; the object must be deleted and created again.
    Recreate(&'static str),
}

#[derive(Debug)]
pub struct Comparison<K> {
    /// Desired object with foreign metadata of the live object merged in.
    pub target: K,
    pub verdict: Verdict,
}

fn display_name<K: Resource<DynamicType = ()>>(obj: &K) -> String {
    format!("{} {}", K::kind(&()), obj.name_any())
}

/// Logs when a freshly synthesized object is not already in normal form.
pub fn check_normal_form<K: Comparable>(desired: &K) {
    match desired.normalize() {
        Ok(normalized) if &normalized == desired => {}
        Ok(normalized) => {
            let field = normalized.first_difference(desired).unwrap_or("unknown");
            error!(
                object = %display_name(desired),
                field,
                "synthesized object is not in normal form"
            );
        }
        Err(e) => error!(
            object = %display_name(desired),
            error = %e,
            "synthesized object cannot be normalized"
        ),
    }
}

pub fn compare<K: Comparable>(desired: &K, live: &K) -> Comparison<K> {
    let mut target = desired.clone();

    let live = match live.normalize() {
        Ok(normalized) => normalized,
        Err(e) => {
            warn!(
                object = %display_name(desired),
                error = %e,
                "live object is malformed, assuming it differs"
            );
            target.merge_metadata(live);
            return Comparison {
                target,
                verdict: Verdict::Changed("malformed"),
            };
        }
    };

    target.merge_metadata(&live);

    if let Some(field) = target.immutable_difference(&live) {
        return Comparison {
            target,
            verdict: Verdict::Recreate(field),
        };
    }

    let verdict = match target.first_difference(&live) {
        Some(field) => Verdict::Changed(field),
        None => {
            if target != live {
                warn!(
                    object = %display_name(desired),
                    "no managed field differs but the normalized objects are not equal"
                );
            }
            Verdict::Unchanged
        }
    };

    Comparison { target, verdict }
}

pub(crate) fn non_empty<T>(list: Option<&Vec<T>>) -> Option<Vec<T>>
where
    T: Clone,
{
    list.filter(|l| !l.is_empty()).cloned()
}

/// name, namespace, labels and annotations; everything else in metadata is server-owned.
pub(crate) fn normalize_meta(meta: &metav1::ObjectMeta) -> metav1::ObjectMeta {
    metav1::ObjectMeta {
        name: meta.name.clone(),
        namespace: meta.namespace.clone(),
        labels: meta.labels.clone().and_then(metadata::non_empty),
        annotations: meta.annotations.clone().and_then(metadata::non_empty),
        ..Default::default()
    }
}

pub(crate) fn meta_difference(
    desired: &metav1::ObjectMeta,
    live: &metav1::ObjectMeta,
) -> Option<&'static str> {
    if desired.labels != live.labels {
        Some("metadata.labels")
    } else if desired.annotations != live.annotations {
        Some("metadata.annotations")
    } else {
        None
    }
}

pub(crate) fn apply_meta(desired: &metav1::ObjectMeta, live: &mut metav1::ObjectMeta) {
    live.labels = desired.labels.clone();
    live.annotations = desired.annotations.clone();
}

pub(crate) fn missing_field(kind: &str, name: &str, field: &str) -> types::error::Error {
    types::error::Error::MissingField {
        kind: kind.to_owned(),
        name: name.to_owned(),
        field: field.to_owned(),
    }
}

pub(crate) fn expect_count(
    kind: &str,
    name: &str,
    field: &str,
    expected: usize,
    actual: usize,
) -> Result<(), types::error::Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(types::error::Error::UnexpectedCount {
            kind: kind.to_owned(),
            name: name.to_owned(),
            field: field.to_owned(),
            expected,
            actual,
        })
    }
}

impl Comparable for corev1::ServiceAccount {
    fn normalize(&self) -> Result<Self, types::error::Error> {
        Ok(corev1::ServiceAccount {
            metadata: normalize_meta(&self.metadata),
            ..Default::default()
        })
    }

    fn first_difference(&self, live: &Self) -> Option<&'static str> {
        meta_difference(&self.metadata, &live.metadata)
    }

    fn apply_to(&self, live: &mut Self) {
        apply_meta(&self.metadata, &mut live.metadata);
    }
}

/// Secret data is owned by users; only the metadata and type are managed.
impl Comparable for corev1::Secret {
    fn normalize(&self) -> Result<Self, types::error::Error> {
        Ok(corev1::Secret {
            metadata: normalize_meta(&self.metadata),
            type_: self.type_.clone(),
            ..Default::default()
        })
    }

    fn first_difference(&self, live: &Self) -> Option<&'static str> {
        if self.type_ != live.type_ {
            return Some("type");
        }
        meta_difference(&self.metadata, &live.metadata)
    }

    fn immutable_difference(&self, live: &Self) -> Option<&'static str> {
        (self.type_ != live.type_).then_some("type")
    }

    fn apply_to(&self, live: &mut Self) {
        apply_meta(&self.metadata, &mut live.metadata);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_data_is_ignored() {
        let rm = crate::tests::create_test_rollout_manager();
        let desired = rm.new_notification_secret().unwrap();

        let mut live = desired.clone();
        live.metadata.resource_version = Some("7".to_owned());
        live.string_data = None;
        live.data = Some(
            [(
                "slack-token".to_owned(),
                k8s_openapi::ByteString(b"xoxb".to_vec()),
            )]
            .into(),
        );

        let comparison = compare(&desired, &live);
        assert_eq!(comparison.verdict, Verdict::Unchanged);
    }

    #[test]
    fn test_secret_type_change_recreates() {
        let rm = crate::tests::create_test_rollout_manager();
        let desired = rm.new_notification_secret().unwrap();

        let mut live = desired.clone();
        live.type_ = Some("kubernetes.io/tls".to_owned());

        assert_eq!(compare(&desired, &live).verdict, Verdict::Recreate("type"));
    }

    #[test]
    fn test_service_account_foreign_labels() {
        let rm = crate::tests::create_test_rollout_manager();
        let desired = rm.new_service_account().unwrap();

        let mut live = desired.clone();
        live.metadata
            .labels
            .as_mut()
            .unwrap()
            .insert("my-label".into(), "my-value".into());
        live.secrets = Some(vec![corev1::ObjectReference {
            name: Some("argo-rollouts-token".into()),
            ..Default::default()
        }]);

        let comparison = compare(&desired, &live);
        assert_eq!(comparison.verdict, Verdict::Unchanged);
        assert_eq!(
            comparison.target.metadata.labels.unwrap().get("my-label").unwrap(),
            "my-value"
        );

        live.metadata
            .labels
            .as_mut()
            .unwrap()
            .remove(crate::types::v1alpha1::k8s::LABEL_PART_OF);
        assert_eq!(
            compare(&desired, &live).verdict,
            Verdict::Changed("metadata.labels")
        );
    }

    #[test]
    fn test_expect_count() {
        assert!(expect_count("Deployment", "x", "containers", 1, 1).is_ok());
        let err = expect_count("Deployment", "x", "containers", 1, 2).unwrap_err();
        assert!(matches!(
            err,
            types::error::Error::UnexpectedCount {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }
}
