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

//! Cluster-wide placement rules for RolloutManagers.
//!
//! Either a single cluster-scoped instance exists, or any number of namespace-scoped ones. The
//! check lists every instance and decides; it takes no lock, so two cluster-scoped instances
//! created at the same moment can both pass until each is reconciled again and sees the other.

use crate::config::NAMESPACE_SCOPED_ENV;
use crate::types::v1alpha1::rollout_manager::RolloutManager;
use crate::types::v1alpha1::status::condition::{
    REASON_INVALID_SCOPE, REASON_MULTIPLE_CLUSTER_SCOPED,
};
use kube::ResourceExt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeVerdict {
    Ok,

    /// The instance's scope contradicts the operator-wide scope mode.
    InvalidScope { message: String },

    /// A cluster-scoped instance coexists with another instance.
    MultipleClusterScoped { message: String },
}

impl ScopeVerdict {
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ScopeVerdict::Ok => None,
            ScopeVerdict::InvalidScope { .. } => Some(REASON_INVALID_SCOPE),
            ScopeVerdict::MultipleClusterScoped { .. } => Some(REASON_MULTIPLE_CLUSTER_SCOPED),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ScopeVerdict::Ok => "",
            ScopeVerdict::InvalidScope { message }
            | ScopeVerdict::MultipleClusterScoped { message } => message,
        }
    }
}

fn multiple_cluster_scoped() -> ScopeVerdict {
    ScopeVerdict::MultipleClusterScoped {
        message: "when there exists a cluster-scoped RolloutManager on the cluster, there may not \
                  exist another: only a single cluster-scoped RolloutManager is supported"
            .to_owned(),
    }
}

fn same_instance(a: &RolloutManager, b: &RolloutManager) -> bool {
    match (a.uid(), b.uid()) {
        (Some(x), Some(y)) => x == y,
        _ => a.metadata.namespace == b.metadata.namespace && a.metadata.name == b.metadata.name,
    }
}

/// Checks `rm` against every RolloutManager on the cluster.
///
/// Instances that are being deleted no longer count.
pub fn check_scope(
    rm: &RolloutManager,
    all: &[RolloutManager],
    namespace_scoped_only: bool,
) -> ScopeVerdict {
    let cluster_scoped = !rm.is_namespace_scoped();

    if namespace_scoped_only && cluster_scoped {
        return ScopeVerdict::InvalidScope {
            message: format!(
                "when Subscription has environment variable {NAMESPACE_SCOPED_ENV} set to True, \
                 there may not exist any cluster-scoped RolloutManagers: in this case, only \
                 namespace-scoped RolloutManager resources are supported"
            ),
        };
    }

    if !namespace_scoped_only && !cluster_scoped {
        return ScopeVerdict::InvalidScope {
            message: format!(
                "when Subscription has environment variable {NAMESPACE_SCOPED_ENV} set to False, \
                 there may not exist any namespace-scoped RolloutManagers: only a single \
                 cluster-scoped RolloutManager is supported"
            ),
        };
    }

    let others: Vec<_> = all
        .iter()
        .filter(|other| !same_instance(rm, other) && !other.is_deleting())
        .collect();

    if others.is_empty() {
        return ScopeVerdict::Ok;
    }

    if cluster_scoped || others.iter().any(|o| !o.is_namespace_scoped()) {
        return multiple_cluster_scoped();
    }

    ScopeVerdict::Ok
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::{ScopeVerdict, check_scope};
    use crate::tests::rollout_manager_in;

    // Test: a lone instance always passes
    #[test]
    fn test_single_instance_passes() {
        let rm = rollout_manager_in("argo-rollouts", "cluster", false);
        assert_eq!(
            check_scope(&rm, std::slice::from_ref(&rm), false),
            ScopeVerdict::Ok
        );
        assert_eq!(check_scope(&rm, &[], false), ScopeVerdict::Ok);
    }

    // Test: scope flag contradicts the operator mode
    #[test]
    fn test_invalid_scope() {
        let cluster = rollout_manager_in("a", "rm", false);
        let verdict = check_scope(&cluster, std::slice::from_ref(&cluster), true);
        assert_eq!(verdict.reason(), Some("InvalidRolloutManagerScope"));
        assert!(verdict.message().contains("set to True"));

        let namespaced = rollout_manager_in("a", "rm", true);
        let verdict = check_scope(&namespaced, std::slice::from_ref(&namespaced), false);
        assert_eq!(verdict.reason(), Some("InvalidRolloutManagerScope"));
        assert!(verdict.message().contains("set to False"));
    }

    // Test: two cluster-scoped instances both fail
    #[test]
    fn test_two_cluster_scoped_instances() {
        let first = rollout_manager_in("a", "rm", false);
        let second = rollout_manager_in("b", "rm", false);
        let all = vec![first.clone(), second.clone()];

        for rm in [&first, &second] {
            let verdict = check_scope(rm, &all, false);
            assert_eq!(
                verdict.reason(),
                Some("MultipleClusterScopedRolloutManager")
            );
        }
    }

    // Test: namespace-scoped instances coexist
    #[test]
    fn test_namespace_scoped_instances_coexist() {
        let a = rollout_manager_in("a", "rm", true);
        let b = rollout_manager_in("b", "rm", true);
        let all = vec![a.clone(), b.clone()];

        assert_eq!(check_scope(&a, &all, true), ScopeVerdict::Ok);
        assert_eq!(check_scope(&b, &all, true), ScopeVerdict::Ok);
    }

    // Test: a namespace-scoped instance next to a stray cluster-scoped one fails
    #[test]
    fn test_namespace_scoped_next_to_cluster_scoped() {
        let namespaced = rollout_manager_in("a", "rm", true);
        let stray = rollout_manager_in("b", "rm", false);
        let all = vec![namespaced.clone(), stray];

        assert_eq!(
            check_scope(&namespaced, &all, true).reason(),
            Some("MultipleClusterScopedRolloutManager")
        );
    }

    // Test: instances being deleted do not count
    #[test]
    fn test_deleting_instances_are_ignored() {
        let first = rollout_manager_in("a", "rm", false);
        let mut second = rollout_manager_in("b", "rm", false);
        second.metadata.deletion_timestamp = Some(
            k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(chrono::Utc::now()),
        );

        assert_eq!(
            check_scope(&first, &[first.clone(), second], false),
            ScopeVerdict::Ok
        );
    }

    // Test: with no lock, two cluster-scoped instances that each list before the other is
    // stored both pass, and both fail once a later pass sees the other
    #[test]
    fn test_concurrent_cluster_scoped_instances_both_pass() {
        let first = rollout_manager_in("a", "rm", false);
        let second = rollout_manager_in("b", "rm", false);

        assert_eq!(
            check_scope(&first, std::slice::from_ref(&first), false),
            ScopeVerdict::Ok
        );
        assert_eq!(
            check_scope(&second, std::slice::from_ref(&second), false),
            ScopeVerdict::Ok
        );

        let all = vec![first.clone(), second.clone()];
        assert!(check_scope(&first, &all, false).reason().is_some());
        assert!(check_scope(&second, &all, false).reason().is_some());
    }
}
