// Copyright 2025 The rollouts-manager Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http:www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use std::sync::Arc;

use crate::config::Config;
use crate::context::Context;
use crate::store::memory::MemoryStore;
use crate::types::v1alpha1::rollout_manager::{RolloutManager, RolloutManagerSpec};

// Helper function to create a test RolloutManager (available to submodule tests via crate::tests)
pub fn create_test_rollout_manager() -> RolloutManager {
    RolloutManager {
        metadata: metav1::ObjectMeta {
            name: Some("test-rm".to_string()),
            namespace: Some("default".to_string()),
            uid: Some("test-uid-123".to_string()),
            ..Default::default()
        },
        spec: RolloutManagerSpec::default(),
        status: None,
    }
}

pub fn rollout_manager_in(namespace: &str, name: &str, namespace_scoped: bool) -> RolloutManager {
    RolloutManager {
        metadata: metav1::ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("{namespace}-{name}-uid")),
            ..Default::default()
        },
        spec: RolloutManagerSpec {
            namespace_scoped,
            ..Default::default()
        },
        status: None,
    }
}

/// A context over an empty in-memory store, cluster-scoped mode, no ServiceMonitor API.
pub fn create_test_context() -> (Arc<MemoryStore>, Context) {
    create_test_context_with(Config::default(), false)
}

pub fn create_test_context_with(
    config: Config,
    service_monitor_available: bool,
) -> (Arc<MemoryStore>, Context) {
    let store = Arc::new(MemoryStore::new());
    let ctx = Context::new(store.clone(), config, service_monitor_available);
    (store, ctx)
}
