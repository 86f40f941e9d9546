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

use super::{Comparable, apply_meta, meta_difference, normalize_meta};
use crate::types;
use crate::types::v1alpha1::rollout_manager::canonical_rules;
use k8s_openapi::api::rbac::v1 as rbacv1;

// Rules are compared as sets: both sides go through `canonical_rules`.
fn normalize_rules(rules: Option<&Vec<rbacv1::PolicyRule>>) -> Option<Vec<rbacv1::PolicyRule>> {
    rules.map(|r| canonical_rules(r)).filter(|r| !r.is_empty())
}

// The API server fills in an empty apiGroup for ServiceAccount subjects.
fn normalize_subjects(subjects: Option<&Vec<rbacv1::Subject>>) -> Option<Vec<rbacv1::Subject>> {
    subjects
        .filter(|s| !s.is_empty())
        .map(|subjects| {
            subjects
                .iter()
                .map(|s| rbacv1::Subject {
                    api_group: s.api_group.clone().filter(|g| !g.is_empty()),
                    ..s.clone()
                })
                .collect()
        })
}

impl Comparable for rbacv1::Role {
    fn normalize(&self) -> Result<Self, types::error::Error> {
        Ok(rbacv1::Role {
            metadata: normalize_meta(&self.metadata),
            rules: normalize_rules(self.rules.as_ref()),
        })
    }

    fn first_difference(&self, live: &Self) -> Option<&'static str> {
        if self.rules != live.rules {
            return Some("rules");
        }
        meta_difference(&self.metadata, &live.metadata)
    }

    fn apply_to(&self, live: &mut Self) {
        apply_meta(&self.metadata, &mut live.metadata);
        live.rules = self.rules.clone();
    }
}

impl Comparable for rbacv1::ClusterRole {
    fn normalize(&self) -> Result<Self, types::error::Error> {
        Ok(rbacv1::ClusterRole {
            metadata: normalize_meta(&self.metadata),
            rules: normalize_rules(self.rules.as_ref()),
            ..Default::default()
        })
    }

    fn first_difference(&self, live: &Self) -> Option<&'static str> {
        if self.rules != live.rules {
            return Some("rules");
        }
        meta_difference(&self.metadata, &live.metadata)
    }

    fn apply_to(&self, live: &mut Self) {
        apply_meta(&self.metadata, &mut live.metadata);
        live.rules = self.rules.clone();
    }
}

impl Comparable for rbacv1::RoleBinding {
    fn normalize(&self) -> Result<Self, types::error::Error> {
        Ok(rbacv1::RoleBinding {
            metadata: normalize_meta(&self.metadata),
            subjects: normalize_subjects(self.subjects.as_ref()),
            role_ref: self.role_ref.clone(),
        })
    }

    fn first_difference(&self, live: &Self) -> Option<&'static str> {
        if self.subjects != live.subjects {
            return Some("subjects");
        }
        if self.role_ref != live.role_ref {
            return Some("roleRef");
        }
        meta_difference(&self.metadata, &live.metadata)
    }

    fn immutable_difference(&self, live: &Self) -> Option<&'static str> {
        (self.role_ref != live.role_ref).then_some("roleRef")
    }

    fn apply_to(&self, live: &mut Self) {
        apply_meta(&self.metadata, &mut live.metadata);
        live.subjects = self.subjects.clone();
    }
}

impl Comparable for rbacv1::ClusterRoleBinding {
    fn normalize(&self) -> Result<Self, types::error::Error> {
        Ok(rbacv1::ClusterRoleBinding {
            metadata: normalize_meta(&self.metadata),
            subjects: normalize_subjects(self.subjects.as_ref()),
            role_ref: self.role_ref.clone(),
        })
    }

    fn first_difference(&self, live: &Self) -> Option<&'static str> {
        if self.subjects != live.subjects {
            return Some("subjects");
        }
        if self.role_ref != live.role_ref {
            return Some("roleRef");
        }
        meta_difference(&self.metadata, &live.metadata)
    }

    fn immutable_difference(&self, live: &Self) -> Option<&'static str> {
        (self.role_ref != live.role_ref).then_some("roleRef")
    }

    fn apply_to(&self, live: &mut Self) {
        apply_meta(&self.metadata, &mut live.metadata);
        live.subjects = self.subjects.clone();
    }
}
