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
use k8s_openapi::Resource as _;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::api::rbac::v1 as rbacv1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;

const ALL_VERBS: [&str; 8] = [
    "create",
    "delete",
    "deletecollection",
    "get",
    "list",
    "patch",
    "update",
    "watch",
];
const READ_VERBS: [&str; 3] = ["get", "list", "watch"];

const AGGREGATED_RESOURCES: [&str; 7] = [
    "rollouts",
    "rollouts/scale",
    "rollouts/status",
    "experiments",
    "analysistemplates",
    "clusteranalysistemplates",
    "analysisruns",
];

fn rule(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> rbacv1::PolicyRule {
    let owned = |items: &[&str]| items.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>();
    rbacv1::PolicyRule {
        api_groups: Some(owned(api_groups)),
        resources: Some(owned(resources)),
        verbs: owned(verbs),
        ..Default::default()
    }
}

/// Puts a rule set into canonical order: every list inside a rule is sorted and deduplicated,
/// then the rules themselves are sorted and deduplicated. Rule order carries no meaning to RBAC.
pub fn canonical_rules(rules: &[rbacv1::PolicyRule]) -> Vec<rbacv1::PolicyRule> {
    fn sorted(list: &Option<Vec<String>>) -> Option<Vec<String>> {
        list.as_ref().filter(|l| !l.is_empty()).map(|l| {
            let mut l = l.clone();
            l.sort();
            l.dedup();
            l
        })
    }

    let mut rules: Vec<_> = rules
        .iter()
        .map(|r| {
            let mut verbs = r.verbs.clone();
            verbs.sort();
            verbs.dedup();
            rbacv1::PolicyRule {
                api_groups: sorted(&r.api_groups),
                non_resource_urls: sorted(&r.non_resource_urls),
                resource_names: sorted(&r.resource_names),
                resources: sorted(&r.resources),
                verbs,
            }
        })
        .collect();

    rules.sort_by(|a, b| rule_key(a).cmp(&rule_key(b)));
    rules.dedup();
    rules
}

type RuleKey<'a> = (
    &'a Option<Vec<String>>,
    &'a Option<Vec<String>>,
    &'a Vec<String>,
    &'a Option<Vec<String>>,
    &'a Option<Vec<String>>,
);

fn rule_key(rule: &rbacv1::PolicyRule) -> RuleKey<'_> {
    (
        &rule.api_groups,
        &rule.resources,
        &rule.verbs,
        &rule.resource_names,
        &rule.non_resource_urls,
    )
}

/// Permissions required by the rollouts controller, shared by the Role and the ClusterRole.
pub fn controller_policy_rules() -> Vec<rbacv1::PolicyRule> {
    canonical_rules(&[
        rule(
            &["argoproj.io"],
            &["rollouts", "rollouts/status", "rollouts/finalizers"],
            &["get", "list", "watch", "update", "patch"],
        ),
        rule(
            &["argoproj.io"],
            &[
                "analysisruns",
                "analysisruns/finalizers",
                "experiments",
                "experiments/finalizers",
            ],
            &["create", "get", "list", "watch", "update", "patch", "delete"],
        ),
        rule(
            &["argoproj.io"],
            &["analysistemplates", "clusteranalysistemplates"],
            &READ_VERBS,
        ),
        rule(
            &["apps"],
            &["replicasets"],
            &["create", "get", "list", "watch", "update", "patch", "delete"],
        ),
        rule(&["", "apps"], &["deployments", "podtemplates"], &READ_VERBS),
        rule(
            &[""],
            &["services"],
            &["get", "list", "watch", "patch", "create", "delete"],
        ),
        rule(
            &["coordination.k8s.io"],
            &["leases"],
            &["create", "get", "update"],
        ),
        rule(&[""], &["secrets", "configmaps"], &READ_VERBS),
        rule(&[""], &["pods"], &["list", "update", "watch"]),
        rule(&[""], &["pods/eviction"], &["create"]),
        rule(
            &["", "events.k8s.io"],
            &["events"],
            &["create", "update", "patch"],
        ),
        rule(
            &["networking.k8s.io", "extensions"],
            &["ingresses"],
            &["create", "get", "list", "watch", "update", "patch"],
        ),
        rule(
            &["batch"],
            &["jobs"],
            &["create", "get", "list", "watch", "update", "patch", "delete"],
        ),
        rule(
            &["networking.istio.io"],
            &["virtualservices", "destinationrules"],
            &["watch", "get", "update", "patch", "list"],
        ),
        rule(
            &["split.smi-spec.io"],
            &["trafficsplits"],
            &["create", "watch", "get", "update", "patch"],
        ),
        rule(
            &["getambassador.io", "x.getambassador.io"],
            &["mappings", "ambassadormappings"],
            &["create", "watch", "get", "update", "list", "delete"],
        ),
        rule(&[""], &["endpoints"], &["get"]),
        rule(&["elbv2.k8s.aws"], &["targetgroupbindings"], &["list", "get"]),
        rule(&["appmesh.k8s.aws"], &["virtualservices"], &READ_VERBS),
        rule(
            &["appmesh.k8s.aws"],
            &["virtualnodes", "virtualrouters"],
            &["watch", "get", "list", "update", "patch"],
        ),
        rule(
            &["traefik.containo.us", "traefik.io"],
            &["traefikservices"],
            &["watch", "get", "update"],
        ),
        rule(
            &["apisix.apache.org"],
            &["apisixroutes"],
            &["watch", "get", "update"],
        ),
        rule(
            &["route.openshift.io"],
            &["routes"],
            &["create", "watch", "get", "update", "patch", "list"],
        ),
    ])
}

/// One of the fixed ClusterRoles that extend the built-in admin/edit/view roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum AggregateTo {
    #[strum(to_string = "admin")]
    Admin,
    #[strum(to_string = "edit")]
    Edit,
    #[strum(to_string = "view")]
    View,
}

impl AggregateTo {
    pub fn role_name(self) -> &'static str {
        match self {
            AggregateTo::Admin => k8s::AGGREGATE_TO_ADMIN_NAME,
            AggregateTo::Edit => k8s::AGGREGATE_TO_EDIT_NAME,
            AggregateTo::View => k8s::AGGREGATE_TO_VIEW_NAME,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AggregateTo::Admin => k8s::LABEL_AGGREGATE_TO_ADMIN,
            AggregateTo::Edit => k8s::LABEL_AGGREGATE_TO_EDIT,
            AggregateTo::View => k8s::LABEL_AGGREGATE_TO_VIEW,
        }
    }
}

pub fn aggregate_policy_rules(to: AggregateTo) -> Vec<rbacv1::PolicyRule> {
    let verbs: &[&str] = match to {
        AggregateTo::Admin | AggregateTo::Edit => &ALL_VERBS,
        AggregateTo::View => &READ_VERBS,
    };
    canonical_rules(&[rule(&["argoproj.io"], &AGGREGATED_RESOURCES, verbs)])
}

impl RolloutManager {
    fn controller_subject(&self) -> Result<rbacv1::Subject, types::error::Error> {
        Ok(rbacv1::Subject {
            kind: corev1::ServiceAccount::KIND.to_owned(),
            namespace: Some(self.namespace()?),
            name: self.service_account_name(),
            ..Default::default()
        })
    }

    pub fn new_service_account(&self) -> Result<corev1::ServiceAccount, types::error::Error> {
        Ok(corev1::ServiceAccount {
            metadata: self.namespaced_meta(&self.service_account_name(), k8s::COMPONENT_CONTROLLER)?,
            ..Default::default()
        })
    }

    pub fn new_role(&self) -> Result<rbacv1::Role, types::error::Error> {
        Ok(rbacv1::Role {
            metadata: self.namespaced_meta(k8s::DEFAULT_RESOURCE_NAME, k8s::COMPONENT_CONTROLLER)?,
            rules: Some(controller_policy_rules()),
        })
    }

    pub fn new_cluster_role(&self) -> rbacv1::ClusterRole {
        rbacv1::ClusterRole {
            metadata: self.cluster_meta(k8s::DEFAULT_RESOURCE_NAME, k8s::COMPONENT_CONTROLLER),
            rules: Some(controller_policy_rules()),
            ..Default::default()
        }
    }

    pub fn new_aggregate_cluster_role(&self, to: AggregateTo) -> rbacv1::ClusterRole {
        let mut metadata = self.cluster_meta(to.role_name(), k8s::COMPONENT_CONTROLLER);
        metadata
            .labels
            .get_or_insert_with(Default::default)
            .insert(to.label().to_owned(), "true".to_owned());

        rbacv1::ClusterRole {
            metadata,
            rules: Some(aggregate_policy_rules(to)),
            ..Default::default()
        }
    }

    pub fn new_role_binding(&self) -> Result<rbacv1::RoleBinding, types::error::Error> {
        Ok(rbacv1::RoleBinding {
            metadata: self.namespaced_meta(k8s::DEFAULT_RESOURCE_NAME, k8s::COMPONENT_CONTROLLER)?,
            subjects: Some(vec![self.controller_subject()?]),
            role_ref: rbacv1::RoleRef {
                api_group: rbacv1::Role::GROUP.to_owned(),
                kind: rbacv1::Role::KIND.to_owned(),
                name: k8s::DEFAULT_RESOURCE_NAME.to_owned(),
            },
        })
    }

    pub fn new_cluster_role_binding(
        &self,
    ) -> Result<rbacv1::ClusterRoleBinding, types::error::Error> {
        Ok(rbacv1::ClusterRoleBinding {
            metadata: self.cluster_meta(k8s::DEFAULT_RESOURCE_NAME, k8s::COMPONENT_CONTROLLER),
            subjects: Some(vec![self.controller_subject()?]),
            role_ref: rbacv1::RoleRef {
                api_group: rbacv1::ClusterRole::GROUP.to_owned(),
                kind: rbacv1::ClusterRole::KIND.to_owned(),
                name: k8s::DEFAULT_RESOURCE_NAME.to_owned(),
            },
        })
    }

    /// Whether a ClusterRoleBinding grants the controller role to this instance's ServiceAccount.
    pub fn is_bound_by(&self, binding: &rbacv1::ClusterRoleBinding) -> bool {
        let Ok(namespace) = self.namespace() else {
            return false;
        };
        binding.subjects.iter().flatten().any(|s| {
            s.kind == corev1::ServiceAccount::KIND
                && s.name == self.service_account_name()
                && s.namespace.as_deref() == Some(namespace.as_str())
        })
    }
}
