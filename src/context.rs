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

use crate::config::Config;
use crate::store::{self, ObjectStore};
use crate::types;
use crate::types::v1alpha1::monitor::ServiceMonitor;
use crate::types::v1alpha1::rollout_manager::RolloutManager;
use kube::Resource;
use kube::core::DynamicObject;
use kube::discovery::ApiResource;
use kube::runtime::events::{Event, EventType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::Snafu;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Store { source: store::Error },

    #[snafu(transparent)]
    Types { source: types::error::Error },

    #[snafu(transparent)]
    Serde { source: serde_json::Error },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Store { source } if source.is_not_found())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Store { source } if source.is_conflict())
    }

    pub fn is_invalid_spec(&self) -> bool {
        matches!(self, Error::Types { source } if source.is_invalid_spec())
    }
}

/// Shared state handed to every reconcile call.
pub struct Context {
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) config: Config,

    /// Whether the ServiceMonitor API was served when the controller started.
    pub(crate) service_monitor_available: bool,
}

fn to_dynamic<T: Serialize>(obj: &T) -> Result<DynamicObject, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(obj)?)
}

fn from_dynamic<T: DeserializeOwned>(obj: DynamicObject) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(obj)?)
}

impl Context {
    pub fn new(store: Arc<dyn ObjectStore>, config: Config, service_monitor_available: bool) -> Self {
        Self {
            store,
            config,
            service_monitor_available,
        }
    }

    /// Builds the context, asking the API server once whether the ServiceMonitor API is served.
    pub async fn discover(store: Arc<dyn ObjectStore>, config: Config) -> Result<Self, Error> {
        let service_monitor_available = store
            .has_api(&ServiceMonitor::api_version(&()), &ServiceMonitor::kind(&()))
            .await?;
        info!("ServiceMonitor API available: {service_monitor_available}");
        Ok(Self::new(store, config, service_monitor_available))
    }

    /// send event
    #[inline]
    pub async fn record(
        &self,
        resource: &RolloutManager,
        event_type: EventType,
        reason: &str,
        message: &str,
    ) -> Result<(), Error> {
        self.store
            .publish(
                &Event {
                    type_: event_type,
                    reason: reason.to_owned(),
                    note: Some(message.into()),
                    action: "Reconcile".into(),
                    secondary: None,
                },
                &resource.object_ref(&()),
            )
            .await?;
        Ok(())
    }

    pub async fn get<T>(&self, name: &str, namespace: Option<&str>) -> Result<T, Error>
    where
        T: Resource<DynamicType = ()> + DeserializeOwned + Clone + Debug,
    {
        let ar = ApiResource::erase::<T>(&());
        let obj = self.store.get(&ar, namespace, name).await?;
        Ok(from_dynamic(obj)?)
    }

    /// Like [`Context::get`], with "not found" as `None`.
    pub async fn get_opt<T>(&self, name: &str, namespace: Option<&str>) -> Result<Option<T>, Error>
    where
        T: Resource<DynamicType = ()> + DeserializeOwned + Clone + Debug,
    {
        match self.get(name, namespace).await {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list<T>(
        &self,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<T>, Error>
    where
        T: Resource<DynamicType = ()> + DeserializeOwned + Clone + Debug,
    {
        let ar = ApiResource::erase::<T>(&());
        self.store
            .list(&ar, namespace, label_selector)
            .await?
            .into_iter()
            .map(|obj| from_dynamic(obj).map_err(Error::from))
            .collect()
    }

    pub async fn create<T>(&self, resource: &T) -> Result<T, Error>
    where
        T: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Clone + Debug,
    {
        let ar = ApiResource::erase::<T>(&());
        let namespace = resource.meta().namespace.as_deref();
        let created = self
            .store
            .create(&ar, namespace, &to_dynamic(resource)?)
            .await?;
        Ok(from_dynamic(created)?)
    }

    /// Replaces the object, conditional on its resource version.
    pub async fn update<T>(&self, resource: &T) -> Result<T, Error>
    where
        T: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Clone + Debug,
    {
        let ar = ApiResource::erase::<T>(&());
        let namespace = resource.meta().namespace.as_deref();
        let updated = self
            .store
            .replace(&ar, namespace, &to_dynamic(resource)?)
            .await?;
        Ok(from_dynamic(updated)?)
    }

    pub async fn update_status(&self, resource: &RolloutManager) -> Result<RolloutManager, Error> {
        let ar = ApiResource::erase::<RolloutManager>(&());
        let namespace = resource.meta().namespace.as_deref();
        let updated = self
            .store
            .replace_status(&ar, namespace, &to_dynamic(resource)?)
            .await?;
        Ok(from_dynamic(updated)?)
    }

    pub async fn delete<T>(&self, name: &str, namespace: Option<&str>) -> Result<(), Error>
    where
        T: Resource<DynamicType = ()>,
    {
        let ar = ApiResource::erase::<T>(&());
        self.store.delete(&ar, namespace, name).await?;
        Ok(())
    }

    /// Deletes the object, treating "already gone" as success.
    pub async fn delete_if_exists<T>(&self, name: &str, namespace: Option<&str>) -> Result<bool, Error>
    where
        T: Resource<DynamicType = ()>,
    {
        match self.delete::<T>(name, namespace).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
