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

use super::{Comparable, apply_meta, meta_difference, missing_field, non_empty, normalize_meta};
use crate::types;
use crate::types::v1alpha1::monitor::ServiceMonitor;
use crate::utils::metadata;
use k8s_openapi::api::core::v1 as corev1;

impl Comparable for corev1::Service {
    fn normalize(&self) -> Result<Self, types::error::Error> {
        let name = self.metadata.name.clone().unwrap_or_default();
        let spec = self
            .spec
            .as_ref()
            .ok_or_else(|| missing_field("Service", &name, "spec"))?;

        // clusterIP, nodePort and friends are allocated by the API server
        let ports = spec.ports.as_ref().map(|ports| {
            ports
                .iter()
                .map(|p| corev1::ServicePort {
                    name: p.name.clone(),
                    port: p.port,
                    protocol: p.protocol.clone(),
                    target_port: p.target_port.clone(),
                    ..Default::default()
                })
                .collect::<Vec<_>>()
        });

        Ok(corev1::Service {
            metadata: normalize_meta(&self.metadata),
            spec: Some(corev1::ServiceSpec {
                ports: non_empty(ports.as_ref()),
                selector: spec.selector.clone().and_then(metadata::non_empty),
                ..Default::default()
            }),
            status: None,
        })
    }

    fn first_difference(&self, live: &Self) -> Option<&'static str> {
        let desired = self.spec.clone().unwrap_or_default();
        let current = live.spec.clone().unwrap_or_default();

        if desired.ports != current.ports {
            return Some("spec.ports");
        }
        if desired.selector != current.selector {
            return Some("spec.selector");
        }
        meta_difference(&self.metadata, &live.metadata)
    }

    fn apply_to(&self, live: &mut Self) {
        apply_meta(&self.metadata, &mut live.metadata);

        let desired = self.spec.clone().unwrap_or_default();
        let current = live.spec.get_or_insert_with(Default::default);
        current.ports = desired.ports;
        current.selector = desired.selector;
    }
}

impl Comparable for ServiceMonitor {
    fn normalize(&self) -> Result<Self, types::error::Error> {
        Ok(ServiceMonitor {
            metadata: normalize_meta(&self.metadata),
            spec: self.spec.clone(),
        })
    }

    fn first_difference(&self, live: &Self) -> Option<&'static str> {
        if self.spec.selector != live.spec.selector {
            return Some("spec.selector");
        }
        if self.spec.endpoints != live.spec.endpoints {
            return Some("spec.endpoints");
        }
        meta_difference(&self.metadata, &live.metadata)
    }

    fn apply_to(&self, live: &mut Self) {
        apply_meta(&self.metadata, &mut live.metadata);
        live.spec = self.spec.clone();
    }
}
