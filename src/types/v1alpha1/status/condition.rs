// Copyright 2025 The rollouts-manager Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

pub const TYPE_RECONCILED: &str = "Reconciled";

pub const REASON_SUCCESS: &str = "Success";
pub const REASON_ERROR_OCCURRED: &str = "ErrorOccurred";
pub const REASON_INVALID_SCOPE: &str = "InvalidRolloutManagerScope";
pub const REASON_MULTIPLE_CLUSTER_SCOPED: &str = "MultipleClusterScopedRolloutManager";

#[derive(Default, Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, Display, PartialEq, Eq)]
pub enum ConditionStatus {
    #[strum(to_string = "True")]
    True,

    #[strum(to_string = "False")]
    False,

    #[default]
    #[strum(to_string = "Unknown")]
    Unknown,
}

/// A machine readable status entry. At most one condition per `type_` is kept on a status.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: ConditionStatus,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub message: String,

    /// RFC3339 timestamp of the last status/reason/message change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn reconciled(status: ConditionStatus, reason: &str, message: impl Into<String>) -> Self {
        Self {
            type_: TYPE_RECONCILED.to_owned(),
            status,
            reason: reason.to_owned(),
            message: message.into(),
            last_transition_time: None,
        }
    }

    /// true if both conditions carry the same observable state, ignoring the transition time
    pub fn same_state(&self, other: &Condition) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}
