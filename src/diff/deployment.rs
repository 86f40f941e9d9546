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

use super::{Comparable, apply_meta, expect_count, missing_field, non_empty, normalize_meta};
use crate::types;
use crate::utils::metadata;
use k8s_openapi::api::apps::v1;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

const KIND: &str = "Deployment";
const SERVER_DEFAULT_SURGE: &str = "25%";

/// Drops the rolling update parameters the API server fills in when none were given.
fn normalize_strategy(strategy: Option<&v1::DeploymentStrategy>) -> Option<v1::DeploymentStrategy> {
    let mut strategy = strategy.cloned()?;
    let defaulted = IntOrString::String(SERVER_DEFAULT_SURGE.to_owned());

    if let Some(ref rolling) = strategy.rolling_update
        && rolling.max_surge.as_ref().is_none_or(|v| v == &defaulted)
        && rolling.max_unavailable.as_ref().is_none_or(|v| v == &defaulted)
    {
        strategy.rolling_update = None;
    }

    Some(strategy)
}

fn normalize_container(container: &corev1::Container) -> corev1::Container {
    corev1::Container {
        name: container.name.clone(),
        image: container.image.clone(),
        image_pull_policy: container.image_pull_policy.clone(),
        args: non_empty(container.args.as_ref()),
        command: non_empty(container.command.as_ref()),
        env: non_empty(container.env.as_ref()),
        ports: container.ports.clone(),
        liveness_probe: container.liveness_probe.clone(),
        readiness_probe: container.readiness_probe.clone(),
        resources: container
            .resources
            .clone()
            .filter(|r| r != &corev1::ResourceRequirements::default()),
        security_context: container.security_context.clone(),
        volume_mounts: container.volume_mounts.clone(),
        ..Default::default()
    }
}

fn template_meta(template: &corev1::PodTemplateSpec) -> (Option<&metav1::ObjectMeta>, Option<&corev1::PodSpec>) {
    (template.metadata.as_ref(), template.spec.as_ref())
}

impl Comparable for v1::Deployment {
    fn normalize(&self) -> Result<Self, types::error::Error> {
        let name = self.metadata.name.clone().unwrap_or_default();
        let spec = self
            .spec
            .as_ref()
            .ok_or_else(|| missing_field(KIND, &name, "spec"))?;

        if spec.selector.match_labels.is_none() {
            return Err(missing_field(KIND, &name, "spec.selector"));
        }

        let (template_metadata, pod) = template_meta(&spec.template);
        let pod = pod.ok_or_else(|| missing_field(KIND, &name, "spec.template.spec"))?;

        expect_count(
            KIND,
            &name,
            "spec.template.spec.containers",
            1,
            pod.containers.len(),
        )?;
        let container = &pod.containers[0];

        expect_count(
            KIND,
            &name,
            "container ports",
            2,
            container.ports.as_ref().map_or(0, Vec::len),
        )?;
        expect_count(
            KIND,
            &name,
            "container volumeMounts",
            2,
            container.volume_mounts.as_ref().map_or(0, Vec::len),
        )?;
        expect_count(
            KIND,
            &name,
            "spec.template.spec.volumes",
            2,
            pod.volumes.as_ref().map_or(0, Vec::len),
        )?;

        if container.security_context.is_none() {
            return Err(missing_field(KIND, &name, "container securityContext"));
        }
        if pod.security_context.is_none() {
            return Err(missing_field(KIND, &name, "spec.template.spec.securityContext"));
        }

        Ok(v1::Deployment {
            metadata: normalize_meta(&self.metadata),
            spec: Some(v1::DeploymentSpec {
                replicas: spec.replicas,
                selector: metav1::LabelSelector {
                    match_labels: spec.selector.match_labels.clone(),
                    match_expressions: non_empty(spec.selector.match_expressions.as_ref()),
                },
                strategy: normalize_strategy(spec.strategy.as_ref()),
                template: corev1::PodTemplateSpec {
                    metadata: Some(metav1::ObjectMeta {
                        labels: template_metadata
                            .and_then(|m| m.labels.clone())
                            .and_then(metadata::non_empty),
                        annotations: template_metadata
                            .and_then(|m| m.annotations.clone())
                            .and_then(metadata::non_empty),
                        ..Default::default()
                    }),
                    spec: Some(corev1::PodSpec {
                        service_account_name: pod.service_account_name.clone(),
                        containers: vec![normalize_container(container)],
                        node_selector: pod.node_selector.clone().and_then(metadata::non_empty),
                        tolerations: non_empty(pod.tolerations.as_ref()),
                        affinity: pod.affinity.clone(),
                        security_context: pod.security_context.clone(),
                        volumes: pod.volumes.clone(),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            status: None,
        })
    }

    fn first_difference(&self, live: &Self) -> Option<&'static str> {
        let (Some(desired), Some(current)) = (self.spec.as_ref(), live.spec.as_ref()) else {
            return (self.spec != live.spec).then_some("spec");
        };
        let (desired_meta, desired_pod) = template_meta(&desired.template);
        let (current_meta, current_pod) = template_meta(&current.template);
        let (Some(desired_pod), Some(current_pod)) = (desired_pod, current_pod) else {
            return (desired_pod != current_pod).then_some("spec.template.spec");
        };

        if desired_pod.containers != current_pod.containers {
            return Some("spec.template.spec.containers");
        }
        if desired_pod.service_account_name != current_pod.service_account_name {
            return Some("spec.template.spec.serviceAccountName");
        }
        if desired.strategy != current.strategy {
            return Some("spec.strategy");
        }
        if let Some(field) = super::meta_difference(&self.metadata, &live.metadata) {
            return Some(field);
        }
        if desired_meta.and_then(|m| m.labels.as_ref()) != current_meta.and_then(|m| m.labels.as_ref()) {
            return Some("spec.template.metadata.labels");
        }
        if desired_meta.and_then(|m| m.annotations.as_ref())
            != current_meta.and_then(|m| m.annotations.as_ref())
        {
            return Some("spec.template.metadata.annotations");
        }
        if desired.selector != current.selector {
            return Some("spec.selector");
        }
        if desired_pod.node_selector != current_pod.node_selector {
            return Some("spec.template.spec.nodeSelector");
        }
        if desired_pod.tolerations != current_pod.tolerations {
            return Some("spec.template.spec.tolerations");
        }
        if desired_pod.affinity != current_pod.affinity {
            return Some("spec.template.spec.affinity");
        }
        if desired_pod.security_context != current_pod.security_context {
            return Some("spec.template.spec.securityContext");
        }
        if desired_pod.volumes != current_pod.volumes {
            return Some("spec.template.spec.volumes");
        }
        if desired.replicas != current.replicas {
            return Some("spec.replicas");
        }
        None
    }

    fn immutable_difference(&self, live: &Self) -> Option<&'static str> {
        let desired = self.spec.as_ref().map(|s| &s.selector);
        let current = live.spec.as_ref().map(|s| &s.selector);
        (desired != current).then_some("spec.selector")
    }

    fn merge_metadata(&mut self, live: &Self) {
        metadata::merge_into(&mut self.metadata, &live.metadata);

        let live_template = live.spec.as_ref().and_then(|s| s.template.metadata.as_ref());
        if let (Some(desired_template), Some(live_template)) = (
            self.spec.as_mut().and_then(|s| s.template.metadata.as_mut()),
            live_template,
        ) {
            metadata::merge_into(desired_template, live_template);
        }
    }

    fn apply_to(&self, live: &mut Self) {
        apply_meta(&self.metadata, &mut live.metadata);

        let Some(desired) = self.spec.as_ref() else {
            return;
        };
        let current = live.spec.get_or_insert_with(Default::default);
        current.replicas = desired.replicas;
        current.selector = desired.selector.clone();
        current.strategy = desired.strategy.clone();
        current.template = desired.template.clone();
    }
}
