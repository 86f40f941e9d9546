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

//! Access to the Kubernetes object store.
//!
//! Everything the reconciler reads or writes goes through [`ObjectStore`], keyed by an
//! [`ApiResource`] and an optional namespace (`None` is cluster scope, or all namespaces for
//! `list`). [`KubeStore`] talks to the API server; tests use the in-memory store.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::core::{DynamicObject, TypeMeta};
use kube::discovery::ApiResource;
use kube::runtime::events::{Event, Recorder, Reporter};
use snafu::Snafu;
use tracing::debug;

#[cfg(test)]
pub mod memory;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{} '{}' not found", kind, name))]
    NotFound { kind: String, name: String },

    #[snafu(display("conflict writing {} '{}': {}", kind, name, message))]
    Conflict {
        kind: String,
        name: String,
        message: String,
    },

    #[snafu(display("{} '{}' already exists", kind, name))]
    AlreadyExists { kind: String, name: String },

    #[snafu(display("Kubernetes API error: {}", source))]
    Kube { source: kube::Error },

    #[snafu(display("record event error: {}", source))]
    Record { source: kube::Error },

    #[snafu(transparent)]
    Serde { source: serde_json::Error },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. } | Error::AlreadyExists { .. })
    }

    /// Classifies an API server error for an object of kind `ar` named `name`.
    fn from_kube(ar: &ApiResource, name: &str, source: kube::Error) -> Self {
        match source {
            kube::Error::Api(ref response) if response.code == 404 => Error::NotFound {
                kind: ar.kind.clone(),
                name: name.to_owned(),
            },
            kube::Error::Api(ref response)
                if response.code == 409 && response.reason == "AlreadyExists" =>
            {
                Error::AlreadyExists {
                    kind: ar.kind.clone(),
                    name: name.to_owned(),
                }
            }
            kube::Error::Api(ref response) if response.code == 409 => Error::Conflict {
                kind: ar.kind.clone(),
                name: name.to_owned(),
                message: response.message.clone(),
            },
            source => Error::Kube { source },
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, Error>;

    /// Lists objects, optionally filtered by an equality label selector (`k=v,k2=v2`).
    async fn list(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, Error>;

    async fn create(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, Error>;

    /// Replaces an object. A set `resourceVersion` makes the write conditional.
    async fn replace(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, Error>;

    async fn replace_status(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, Error>;

    async fn delete(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), Error>;

    /// Whether the API server serves `kind` in `group_version`.
    async fn has_api(&self, group_version: &str, kind: &str) -> Result<bool, Error>;

    async fn publish(&self, event: &Event, reference: &ObjectReference) -> Result<(), Error>;
}

pub struct KubeStore {
    client: kube::Client,
    recorder: Recorder,
}

impl KubeStore {
    pub fn new(client: kube::Client, controller: &str) -> Self {
        let reporter = Reporter {
            controller: controller.into(),
            instance: std::env::var("HOSTNAME").ok(),
        };

        let recorder = Recorder::new(client.clone(), reporter);
        Self { client, recorder }
    }

    fn api(&self, ar: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, ar),
            None => Api::all_with(self.client.clone(), ar),
        }
    }
}

fn object_name(obj: &DynamicObject) -> String {
    obj.metadata.name.clone().unwrap_or_default()
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, Error> {
        self.api(ar, namespace)
            .get(name)
            .await
            .map_err(|e| Error::from_kube(ar, name, e))
    }

    async fn list(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, Error> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }

        let list = self
            .api(ar, namespace)
            .list(&params)
            .await
            .map_err(|e| Error::from_kube(ar, "", e))?;

        // list items come back without apiVersion/kind
        Ok(list
            .items
            .into_iter()
            .map(|mut item| {
                item.types.get_or_insert_with(|| TypeMeta {
                    api_version: ar.api_version.clone(),
                    kind: ar.kind.clone(),
                });
                item
            })
            .collect())
    }

    async fn create(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, Error> {
        self.api(ar, namespace)
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| Error::from_kube(ar, &object_name(obj), e))
    }

    async fn replace(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, Error> {
        let name = object_name(obj);
        self.api(ar, namespace)
            .replace(&name, &PostParams::default(), obj)
            .await
            .map_err(|e| Error::from_kube(ar, &name, e))
    }

    async fn replace_status(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, Error> {
        let name = object_name(obj);
        let body = serde_json::to_vec(obj)?;
        self.api(ar, namespace)
            .replace_status(&name, &PostParams::default(), body)
            .await
            .map_err(|e| Error::from_kube(ar, &name, e))
    }

    async fn delete(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), Error> {
        self.api(ar, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| Error::from_kube(ar, name, e))?;
        Ok(())
    }

    async fn has_api(&self, group_version: &str, kind: &str) -> Result<bool, Error> {
        match self.client.list_api_group_resources(group_version).await {
            Ok(resources) => Ok(resources.resources.iter().any(|r| r.kind == kind)),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                debug!("API group {group_version} is not served");
                Ok(false)
            }
            Err(source) => Err(Error::Kube { source }),
        }
    }

    async fn publish(&self, event: &Event, reference: &ObjectReference) -> Result<(), Error> {
        self.recorder
            .publish(event, reference)
            .await
            .map_err(|source| Error::Record { source })
    }
}
