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
use crate::config::Config;
use crate::types;
use crate::types::v1alpha1::k8s;
use k8s_openapi::api::apps::v1;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

const SINGLE_REPLICA: i32 = 1;
const HA_REPLICAS: i32 = 2;

/// Joins an image and a tag; a version containing ':' is treated as a digest.
fn combine_image_tag(image: &str, version: &str) -> String {
    if version.contains(':') {
        format!("{image}@{version}")
    } else if !version.is_empty() {
        format!("{image}:{version}")
    } else {
        image.to_owned()
    }
}

fn http_probe(
    path: &str,
    port: &str,
    initial_delay: i32,
    period: i32,
    timeout: i32,
) -> corev1::Probe {
    corev1::Probe {
        http_get: Some(corev1::HTTPGetAction {
            path: Some(path.to_owned()),
            port: IntOrString::String(port.to_owned()),
            scheme: Some("HTTP".to_owned()),
            ..Default::default()
        }),
        initial_delay_seconds: Some(initial_delay),
        period_seconds: Some(period),
        timeout_seconds: Some(timeout),
        success_threshold: Some(1),
        failure_threshold: Some(3),
        ..Default::default()
    }
}

fn empty_dir_volume(name: &str) -> corev1::Volume {
    corev1::Volume {
        name: name.to_owned(),
        empty_dir: Some(corev1::EmptyDirVolumeSource::default()),
        ..Default::default()
    }
}

impl RolloutManager {
    /// Resolves the controller image.
    ///
    /// An explicit image/version in the spec wins, then the operator's image override (only when
    /// both are unset), then the built-in default.
    pub fn container_image(&self, config: &Config) -> String {
        let image = self.spec.image.as_deref().filter(|s| !s.is_empty());
        let version = self.spec.version.as_deref().filter(|s| !s.is_empty());

        if image.is_none()
            && version.is_none()
            && let Some(ref image_override) = config.image_override
        {
            return image_override.clone();
        }

        combine_image_tag(
            image.unwrap_or(k8s::DEFAULT_IMAGE),
            version.unwrap_or(k8s::DEFAULT_VERSION),
        )
    }

    /// Controller arguments: `--namespaced`, then leader election for HA, then the extra args.
    ///
    /// An extra arg repeating a flag the operator already sets is rejected.
    pub fn command_args(&self) -> Result<Vec<String>, types::error::Error> {
        let mut args = Vec::new();
        let mut implied = Vec::new();

        if self.is_namespace_scoped() {
            args.push(k8s::NAMESPACED_ARG.to_owned());
            implied.push(k8s::NAMESPACED_ARG);
        }

        if self.ha_enabled() {
            args.push(k8s::LEADER_ELECT_ARG.to_owned());
            args.push("true".to_owned());
            implied.push(k8s::LEADER_ELECT_ARG);
        }

        for arg in &self.spec.extra_command_args {
            let flag = arg.split('=').next().unwrap_or(arg);
            if implied.contains(&flag) {
                return Err(types::error::Error::DuplicateArgument { arg: arg.clone() });
            }
            args.push(arg.clone());
        }

        Ok(args)
    }

    /// Proxy variables from the operator environment, overridden by the spec's variables.
    pub fn container_env(&self, config: &Config) -> Vec<corev1::EnvVar> {
        let mut env_vars = config.proxy_env.clone();

        for user_env in &self.spec.env {
            env_vars.retain(|e| e.name != user_env.name);
            env_vars.push(user_env.clone());
        }

        env_vars.sort_by(|a, b| a.name.cmp(&b.name));
        env_vars
    }

    /// `kubernetes.io/os: linux`, extended by the spec's node selector.
    pub fn node_selector(&self) -> BTreeMap<String, String> {
        let mut selector = BTreeMap::from([(
            k8s::NODE_SELECTOR_OS_KEY.to_owned(),
            k8s::NODE_SELECTOR_OS_VALUE.to_owned(),
        )]);

        if let Some(user) = self
            .spec
            .node_placement
            .as_ref()
            .and_then(|p| p.node_selector.as_ref())
        {
            selector.extend(user.clone());
        }

        selector
    }

    fn tolerations(&self) -> Option<Vec<corev1::Toleration>> {
        self.spec
            .node_placement
            .as_ref()
            .and_then(|p| p.tolerations.clone())
            .filter(|t| !t.is_empty())
    }

    /// Spread replicas across zones when possible and never co-locate two on one node.
    fn ha_affinity(&self) -> corev1::Affinity {
        let selector = metav1::LabelSelector {
            match_labels: Some(self.selector_labels()),
            ..Default::default()
        };

        corev1::Affinity {
            pod_anti_affinity: Some(corev1::PodAntiAffinity {
                preferred_during_scheduling_ignored_during_execution: Some(vec![
                    corev1::WeightedPodAffinityTerm {
                        weight: 100,
                        pod_affinity_term: corev1::PodAffinityTerm {
                            label_selector: Some(selector.clone()),
                            topology_key: k8s::TOPOLOGY_ZONE_KEY.to_owned(),
                            ..Default::default()
                        },
                    },
                ]),
                required_during_scheduling_ignored_during_execution: Some(vec![
                    corev1::PodAffinityTerm {
                        label_selector: Some(selector),
                        topology_key: k8s::TOPOLOGY_HOSTNAME_KEY.to_owned(),
                        ..Default::default()
                    },
                ]),
            }),
            ..Default::default()
        }
    }

    pub fn new_deployment(&self, config: &Config) -> Result<v1::Deployment, types::error::Error> {
        let args = self.command_args()?;
        let env_vars = self.container_env(config);
        let labels = self.labels(k8s::DEFAULT_RESOURCE_NAME, k8s::COMPONENT_CONTROLLER);

        let container = corev1::Container {
            name: k8s::CONTAINER_NAME.to_owned(),
            image: Some(self.container_image(config)),
            image_pull_policy: Some("Always".to_owned()),
            args: if args.is_empty() { None } else { Some(args) },
            env: if env_vars.is_empty() {
                None
            } else {
                Some(env_vars)
            },
            ports: Some(vec![
                corev1::ContainerPort {
                    container_port: k8s::HEALTHZ_PORT,
                    name: Some(k8s::HEALTHZ_PORT_NAME.to_owned()),
                    protocol: Some("TCP".to_owned()),
                    ..Default::default()
                },
                corev1::ContainerPort {
                    container_port: k8s::METRICS_PORT,
                    name: Some(k8s::METRICS_PORT_NAME.to_owned()),
                    protocol: Some("TCP".to_owned()),
                    ..Default::default()
                },
            ]),
            liveness_probe: Some(http_probe("/healthz", k8s::HEALTHZ_PORT_NAME, 30, 20, 10)),
            readiness_probe: Some(http_probe("/metrics", k8s::METRICS_PORT_NAME, 10, 5, 4)),
            resources: self
                .spec
                .controller_resources
                .clone()
                .filter(|r| r != &corev1::ResourceRequirements::default()),
            security_context: Some(corev1::SecurityContext {
                allow_privilege_escalation: Some(false),
                capabilities: Some(corev1::Capabilities {
                    drop: Some(vec!["ALL".to_owned()]),
                    ..Default::default()
                }),
                read_only_root_filesystem: Some(true),
                run_as_non_root: Some(true),
                seccomp_profile: Some(corev1::SeccompProfile {
                    type_: "RuntimeDefault".to_owned(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            volume_mounts: Some(vec![
                corev1::VolumeMount {
                    name: k8s::PLUGIN_BIN_VOLUME.to_owned(),
                    mount_path: k8s::PLUGIN_BIN_MOUNT_PATH.to_owned(),
                    ..Default::default()
                },
                corev1::VolumeMount {
                    name: k8s::TMP_VOLUME.to_owned(),
                    mount_path: k8s::TMP_MOUNT_PATH.to_owned(),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };

        Ok(v1::Deployment {
            metadata: metav1::ObjectMeta {
                name: Some(self.deployment_name()),
                namespace: Some(self.namespace()?),
                labels: Some(labels.clone()),
                annotations: self.annotations(),
                ..Default::default()
            },
            spec: Some(v1::DeploymentSpec {
                replicas: Some(if self.ha_enabled() {
                    HA_REPLICAS
                } else {
                    SINGLE_REPLICA
                }),
                selector: metav1::LabelSelector {
                    match_labels: Some(self.selector_labels()),
                    ..Default::default()
                },
                strategy: Some(v1::DeploymentStrategy {
                    type_: Some("RollingUpdate".to_owned()),
                    rolling_update: None,
                }),
                template: corev1::PodTemplateSpec {
                    metadata: Some(metav1::ObjectMeta {
                        labels: Some(labels),
                        annotations: self.annotations(),
                        ..Default::default()
                    }),
                    spec: Some(corev1::PodSpec {
                        service_account_name: Some(self.service_account_name()),
                        containers: vec![container],
                        node_selector: Some(self.node_selector()),
                        tolerations: self.tolerations(),
                        affinity: self.ha_enabled().then(|| self.ha_affinity()),
                        security_context: Some(corev1::PodSecurityContext {
                            run_as_non_root: Some(true),
                            ..Default::default()
                        }),
                        volumes: Some(vec![
                            empty_dir_volume(k8s::PLUGIN_BIN_VOLUME),
                            empty_dir_volume(k8s::TMP_VOLUME),
                        ]),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}
