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
use crate::types::v1alpha1::monitor::{Endpoint, ServiceMonitor, ServiceMonitorSpec};
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use k8s_openapi::apimachinery::pkg::util::intstr;

impl RolloutManager {
    /// a new metrics Service in front of the rollouts controller
    pub fn new_metrics_service(&self) -> Result<corev1::Service, types::error::Error> {
        Ok(corev1::Service {
            metadata: self.namespaced_meta(k8s::METRICS_SERVICE_NAME, k8s::COMPONENT_SERVER)?,
            spec: Some(corev1::ServiceSpec {
                selector: Some(self.selector_labels()),
                ports: Some(vec![corev1::ServicePort {
                    name: Some(k8s::METRICS_PORT_NAME.to_owned()),
                    port: k8s::METRICS_PORT,
                    protocol: Some("TCP".to_owned()),
                    target_port: Some(intstr::IntOrString::Int(k8s::METRICS_PORT)),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    /// a new ServiceMonitor scraping the metrics Service
    pub fn new_service_monitor(&self) -> Result<ServiceMonitor, types::error::Error> {
        let mut metadata =
            self.namespaced_meta(k8s::METRICS_SERVICE_NAME, k8s::COMPONENT_SERVER)?;
        metadata.labels.get_or_insert_with(Default::default).insert(
            k8s::SERVICE_MONITOR_RELEASE_LABEL.to_owned(),
            k8s::SERVICE_MONITOR_RELEASE_VALUE.to_owned(),
        );

        Ok(ServiceMonitor {
            metadata,
            spec: ServiceMonitorSpec {
                selector: metav1::LabelSelector {
                    match_labels: Some(
                        [(
                            k8s::LABEL_NAME.to_owned(),
                            k8s::METRICS_SERVICE_NAME.to_owned(),
                        )]
                        .into(),
                    ),
                    ..Default::default()
                },
                endpoints: vec![Endpoint {
                    port: Some(k8s::METRICS_PORT_NAME.to_owned()),
                    ..Default::default()
                }],
            },
        })
    }
}
