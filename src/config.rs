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

use k8s_openapi::api::core::v1 as corev1;
use tracing::warn;

/// Overrides the rollouts controller image when the spec leaves both image and version unset.
pub const IMAGE_ENV: &str = "ARGO_ROLLOUTS_IMAGE";

/// When true only namespace-scoped RolloutManagers are accepted, otherwise only cluster-scoped.
pub const NAMESPACE_SCOPED_ENV: &str = "NAMESPACE_SCOPED_ARGO_ROLLOUTS";

const PROXY_ENV_NAMES: [&str; 3] = ["HTTP_PROXY", "HTTPS_PROXY", "NO_PROXY"];

/// Operator configuration, captured once from the process environment at start.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub image_override: Option<String>,

    pub namespace_scoped_only: bool,

    /// Proxy variables forwarded to the rollouts controller container, sorted by name.
    pub proxy_env: Vec<corev1::EnvVar>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Config::default();

        for (name, value) in vars {
            if name == IMAGE_ENV {
                config.image_override = Some(value).filter(|v| !v.is_empty());
            } else if name == NAMESPACE_SCOPED_ENV {
                config.namespace_scoped_only = match value.to_ascii_lowercase().parse::<bool>() {
                    Ok(v) => v,
                    Err(_) => {
                        warn!("ignoring invalid value '{value}' for {NAMESPACE_SCOPED_ENV}");
                        false
                    }
                };
            } else if PROXY_ENV_NAMES
                .iter()
                .any(|proxy| proxy.eq_ignore_ascii_case(&name))
            {
                config.proxy_env.push(corev1::EnvVar {
                    name,
                    value: Some(value),
                    ..Default::default()
                });
            }
        }

        config.proxy_env.sort_by(|a, b| a.name.cmp(&b.name));
        config
    }
}
