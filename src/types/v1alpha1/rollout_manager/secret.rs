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
use k8s_openapi::api::core::v1 as corev1;

pub const NOTIFICATION_SECRET_TYPE: &str = "Opaque";

impl RolloutManager {
    /// An empty notification Secret. Its data is filled in by users and never compared.
    pub fn new_notification_secret(&self) -> Result<corev1::Secret, types::error::Error> {
        Ok(corev1::Secret {
            metadata: self
                .namespaced_meta(k8s::NOTIFICATION_SECRET_NAME, k8s::COMPONENT_CONTROLLER)?,
            type_: Some(NOTIFICATION_SECRET_TYPE.to_owned()),
            ..Default::default()
        })
    }

    pub fn skips_notification_secret(&self) -> bool {
        self.spec.skip_notification_secret_deployment
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    #[test]
    fn test_notification_secret() {
        let rm = crate::tests::create_test_rollout_manager();
        let secret = rm.new_notification_secret().unwrap();

        assert_eq!(
            secret.metadata.name.as_deref(),
            Some("argo-rollouts-notification-secret")
        );
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        assert!(secret.data.is_none());
        assert!(!rm.skips_notification_secret());
    }
}
