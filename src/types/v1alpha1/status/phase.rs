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

/// Coarse lifecycle phase of the managed rollouts controller.
#[derive(Default, Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, Display, PartialEq, Eq)]
pub enum Phase {
    #[default]
    #[strum(to_string = "Unknown")]
    Unknown,

    /// The Deployment exists but has not reached its replica target yet.
    #[strum(to_string = "Pending")]
    Pending,

    #[strum(to_string = "Available")]
    Available,

    /// The Deployment is missing or the RolloutManager violates the scope invariant.
    #[strum(to_string = "Failure")]
    Failure,
}
