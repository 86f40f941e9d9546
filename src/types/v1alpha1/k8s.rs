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

//! Well-known names, labels and defaults shared by every owned object.

/// Name of the managed controller; also used for its ServiceAccount, RBAC objects and Deployment.
pub const DEFAULT_RESOURCE_NAME: &str = "argo-rollouts";

pub const METRICS_SERVICE_NAME: &str = const_str::concat!(DEFAULT_RESOURCE_NAME, "-metrics");

pub const NOTIFICATION_SECRET_NAME: &str =
    const_str::concat!(DEFAULT_RESOURCE_NAME, "-notification-secret");

pub const CONFIG_MAP_NAME: &str = const_str::concat!(DEFAULT_RESOURCE_NAME, "-config");

pub const AGGREGATE_TO_ADMIN_NAME: &str =
    const_str::concat!(DEFAULT_RESOURCE_NAME, "-aggregate-to-admin");
pub const AGGREGATE_TO_EDIT_NAME: &str =
    const_str::concat!(DEFAULT_RESOURCE_NAME, "-aggregate-to-edit");
pub const AGGREGATE_TO_VIEW_NAME: &str =
    const_str::concat!(DEFAULT_RESOURCE_NAME, "-aggregate-to-view");

pub const DEFAULT_IMAGE: &str = "quay.io/argoproj/argo-rollouts";
pub const DEFAULT_VERSION: &str = "v1.8.3";

pub const CONTAINER_NAME: &str = DEFAULT_RESOURCE_NAME;
pub const METRICS_PORT: i32 = 8090;
pub const METRICS_PORT_NAME: &str = "metrics";
pub const HEALTHZ_PORT: i32 = 8080;
pub const HEALTHZ_PORT_NAME: &str = "healthz";

pub const PLUGIN_BIN_VOLUME: &str = "plugin-bin";
pub const PLUGIN_BIN_MOUNT_PATH: &str = "/home/argo-rollouts";
pub const TMP_VOLUME: &str = "tmp";
pub const TMP_MOUNT_PATH: &str = "/tmp";

pub const NAMESPACED_ARG: &str = "--namespaced";
pub const LEADER_ELECT_ARG: &str = "--leader-elect";

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const COMPONENT_CONTROLLER: &str = "rollouts-controller";
pub const COMPONENT_SERVER: &str = "server";

pub const LABEL_AGGREGATE_TO_ADMIN: &str = "rbac.authorization.k8s.io/aggregate-to-admin";
pub const LABEL_AGGREGATE_TO_EDIT: &str = "rbac.authorization.k8s.io/aggregate-to-edit";
pub const LABEL_AGGREGATE_TO_VIEW: &str = "rbac.authorization.k8s.io/aggregate-to-view";

pub const NODE_SELECTOR_OS_KEY: &str = "kubernetes.io/os";
pub const NODE_SELECTOR_OS_VALUE: &str = "linux";
pub const TOPOLOGY_ZONE_KEY: &str = "topology.kubernetes.io/zone";
pub const TOPOLOGY_HOSTNAME_KEY: &str = "kubernetes.io/hostname";

pub const SERVICE_MONITOR_RELEASE_LABEL: &str = "release";
pub const SERVICE_MONITOR_RELEASE_VALUE: &str = "prometheus-operator";

pub const FINALIZER: &str = "argoproj.io/rollout-manager-cleanup";
