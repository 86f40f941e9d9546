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

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("object has no namespace associated"))]
    NoNamespace,

    #[snafu(display(
        "duplicate argument error: extra command argument '{}' is already set by the operator",
        arg
    ))]
    DuplicateArgument { arg: String },

    #[snafu(display(
        "the plugin '{}' is managed by the operator and cannot be redefined in the RolloutManager spec",
        name
    ))]
    ReservedPlugin { name: String },

    #[snafu(display("plugin '{}' must specify a location", name))]
    MissingPluginLocation { name: String },

    #[snafu(display("{} '{}' is missing required field '{}'", kind, name, field))]
    MissingField {
        kind: String,
        name: String,
        field: String,
    },

    #[snafu(display(
        "{} '{}' has an unexpected number of {}: expected {}, got {}",
        kind,
        name,
        field,
        expected,
        actual
    ))]
    UnexpectedCount {
        kind: String,
        name: String,
        field: String,
        expected: usize,
        actual: usize,
    },

    #[snafu(display("yaml error: {}", source))]
    Yaml { source: serde_yaml_ng::Error },

    #[snafu(display("serde_json error: {}", source))]
    SerdeJson { source: serde_json::Error },
}

impl Error {
    /// Errors caused by the RolloutManager spec itself rather than by live cluster state.
    pub fn is_invalid_spec(&self) -> bool {
        matches!(
            self,
            Error::DuplicateArgument { .. }
                | Error::ReservedPlugin { .. }
                | Error::MissingPluginLocation { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::SerdeJson { source }
    }
}

impl From<serde_yaml_ng::Error> for Error {
    fn from(source: serde_yaml_ng::Error) -> Self {
        Error::Yaml { source }
    }
}
