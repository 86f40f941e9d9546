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
use crate::types::error::NoNamespaceSnafu;
use crate::types::v1alpha1::k8s;
use crate::types::v1alpha1::plugin::Plugins;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use kube::{CustomResource, Resource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::OptionExt;
use std::collections::BTreeMap;

mod configmap;
mod rbac;
mod secret;
mod services;
mod workloads;

pub use configmap::{METRIC_PROVIDER_PLUGINS_KEY, TRAFFIC_ROUTER_PLUGINS_KEY, read_plugins};
pub use rbac::{AggregateTo, aggregate_policy_rules, canonical_rules, controller_policy_rules};
pub use secret::NOTIFICATION_SECRET_TYPE;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[kube(
    group = "argoproj.io",
    version = "v1alpha1",
    kind = "RolloutManager",
    namespaced,
    status = "crate::types::v1alpha1::status::Status",
    plural = "rolloutmanagers",
    singular = "rolloutmanager",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Controller", "type":"string", "jsonPath":".status.rolloutController"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#,
    crates(serde_json = "k8s_openapi::serde_json")
)]
#[serde(rename_all = "camelCase")]
pub struct RolloutManagerSpec {
    /// Run the rollouts controller against this namespace only, instead of the whole cluster.
    #[serde(default)]
    pub namespace_scoped: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Image tag, or a digest when it contains ':'.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_command_args: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<corev1::EnvVar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_resources: Option<corev1::ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_placement: Option<NodePlacement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ha: Option<HighAvailability>,

    /// Labels and annotations merged into every owned object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_metadata: Option<AdditionalMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Plugins>,

    #[serde(default)]
    pub skip_notification_secret_deployment: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePlacement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<corev1::Toleration>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HighAvailability {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl RolloutManager {
    pub fn namespace(&self) -> Result<String, types::error::Error> {
        ResourceExt::namespace(self).context(NoNamespaceSnafu)
    }

    pub fn name(&self) -> String {
        ResourceExt::name_any(self)
    }

    pub fn is_namespace_scoped(&self) -> bool {
        self.spec.namespace_scoped
    }

    pub fn ha_enabled(&self) -> bool {
        self.spec.ha.as_ref().is_some_and(|ha| ha.enabled)
    }

    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// a new owner reference for the RolloutManager
    pub fn new_owner_ref(&self) -> metav1::OwnerReference {
        metav1::OwnerReference {
            api_version: Self::api_version(&()).to_string(),
            kind: Self::kind(&()).to_string(),
            name: self.name(),
            uid: self.meta().uid.clone().unwrap_or_default(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    /// Whether the object was created on behalf of this RolloutManager.
    pub fn owns(&self, meta: &metav1::ObjectMeta) -> bool {
        meta.owner_references.iter().flatten().any(|owner| {
            owner.kind == Self::kind(&()) && owner.name == ResourceExt::name_any(self)
        })
    }

    /// Operator-managed labels for an owned object named `name`.
    ///
    /// Additional labels from the spec are included, the fixed keys always win.
    pub fn labels(&self, name: &str, component: &str) -> BTreeMap<String, String> {
        let mut labels = self
            .spec
            .additional_metadata
            .as_ref()
            .map(|m| m.labels.clone())
            .unwrap_or_default();

        labels.insert(k8s::LABEL_NAME.to_owned(), name.to_owned());
        labels.insert(
            k8s::LABEL_PART_OF.to_owned(),
            k8s::DEFAULT_RESOURCE_NAME.to_owned(),
        );
        labels.insert(k8s::LABEL_COMPONENT.to_owned(), component.to_owned());
        labels
    }

    pub fn annotations(&self) -> Option<BTreeMap<String, String>> {
        self.spec
            .additional_metadata
            .as_ref()
            .map(|m| m.annotations.clone())
            .filter(|a| !a.is_empty())
    }

    /// Labels selecting the managed controller pods.
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        [(
            k8s::LABEL_NAME.to_owned(),
            k8s::DEFAULT_RESOURCE_NAME.to_owned(),
        )]
        .into_iter()
        .collect()
    }

    /// Metadata for a namespaced owned object. The owner reference is attached on create.
    pub fn namespaced_meta(
        &self,
        name: &str,
        component: &str,
    ) -> Result<metav1::ObjectMeta, types::error::Error> {
        Ok(metav1::ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(self.namespace()?),
            labels: Some(self.labels(name, component)),
            annotations: self.annotations(),
            ..Default::default()
        })
    }

    /// Metadata for a cluster-scoped owned object. These cannot reference a namespaced owner.
    pub fn cluster_meta(&self, name: &str, component: &str) -> metav1::ObjectMeta {
        metav1::ObjectMeta {
            name: Some(name.to_owned()),
            labels: Some(self.labels(name, component)),
            annotations: self.annotations(),
            ..Default::default()
        }
    }

    pub fn service_account_name(&self) -> String {
        k8s::DEFAULT_RESOURCE_NAME.to_owned()
    }

    pub fn deployment_name(&self) -> String {
        k8s::DEFAULT_RESOURCE_NAME.to_owned()
    }
}
