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

//! An in-memory [`ObjectStore`] used by the reconciler tests.
//!
//! It keeps objects as JSON, assigns resource versions and uids, rejects stale writes, honours
//! finalizers on delete and counts every write so tests can assert on convergence.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{Error, ObjectStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Resource;
use kube::core::DynamicObject;
use kube::discovery::ApiResource;
use kube::runtime::events::Event;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

type Key = (String, String, String);

/// Writes issued against the store since the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Writes {
    pub creates: usize,
    pub updates: usize,
    pub status_updates: usize,
    pub deletes: usize,
}

impl Writes {
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.status_updates + self.deletes
    }
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<Key, Value>,
    next_version: u64,
    writes: Writes,
    events: Vec<String>,
    apis: HashSet<String>,
}

impl Inner {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn kind_key(ar: &ApiResource) -> String {
    format!("{}/{}", ar.api_version, ar.kind)
}

fn key(ar: &ApiResource, namespace: Option<&str>, name: &str) -> Key {
    (
        kind_key(ar),
        namespace.unwrap_or_default().to_owned(),
        name.to_owned(),
    )
}

fn matches_selector(value: &Value, selector: Option<&str>) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    let labels = &value["metadata"]["labels"];
    selector
        .split(',')
        .filter(|s| !s.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels[k].as_str() == Some(v),
            None => !labels[term].is_null(),
        })
}

fn has_finalizers(value: &Value) -> bool {
    value["metadata"]["finalizers"]
        .as_array()
        .is_some_and(|f| !f.is_empty())
}

fn to_dynamic(value: &Value) -> Result<DynamicObject, Error> {
    Ok(serde_json::from_value(value.clone())?)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `group_version` as served, e.g. `monitoring.coreos.com/v1`.
    pub fn with_api(self, group_version: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .apis
            .insert(group_version.to_owned());
        self
    }

    /// Stores an object as-is, without counting a write.
    pub fn insert<K>(&self, obj: &K)
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let ar = ApiResource::erase::<K>(&());
        let mut value = serde_json::to_value(obj).unwrap();
        let name = value["metadata"]["name"].as_str().unwrap().to_owned();
        let namespace = value["metadata"]["namespace"].as_str().map(str::to_owned);

        let mut inner = self.inner.lock().unwrap();
        let version = inner.bump();
        value["apiVersion"] = json!(ar.api_version);
        value["kind"] = json!(ar.kind);
        value["metadata"]["resourceVersion"] = json!(version);
        if value["metadata"]["uid"].is_null() {
            value["metadata"]["uid"] = json!(format!("uid-{version}"));
        }
        inner
            .objects
            .insert(key(&ar, namespace.as_deref(), &name), value);
    }

    pub fn get_typed<K>(&self, namespace: Option<&str>, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let ar = ApiResource::erase::<K>(&());
        let inner = self.inner.lock().unwrap();
        inner
            .objects
            .get(&key(&ar, namespace, name))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    /// Edits a stored object in place, as another actor would. Counts no write.
    pub fn modify<K>(&self, namespace: Option<&str>, name: &str, f: impl FnOnce(&mut K))
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
    {
        let mut obj: K = self.get_typed(namespace, name).unwrap();
        f(&mut obj);
        self.insert(&obj);
    }

    pub fn writes(&self) -> Writes {
        self.inner.lock().unwrap().writes
    }

    pub fn reset_writes(&self) {
        self.inner.lock().unwrap().writes = Writes::default();
    }

    pub fn events(&self) -> Vec<String> {
        self.inner.lock().unwrap().events.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, Error> {
        let inner = self.inner.lock().unwrap();
        match inner.objects.get(&key(ar, namespace, name)) {
            Some(value) => to_dynamic(value),
            None => Err(Error::NotFound {
                kind: ar.kind.clone(),
                name: name.to_owned(),
            }),
        }
    }

    async fn list(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, Error> {
        let kind = kind_key(ar);
        let inner = self.inner.lock().unwrap();
        inner
            .objects
            .iter()
            .filter(|((k, ns, _), _)| *k == kind && namespace.is_none_or(|n| n == ns.as_str()))
            .filter(|(_, v)| matches_selector(v, label_selector))
            .map(|(_, v)| to_dynamic(v))
            .collect()
    }

    async fn create(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, Error> {
        let name = obj.metadata.name.clone().unwrap_or_default();
        let k = key(ar, namespace, &name);

        let mut inner = self.inner.lock().unwrap();
        if inner.objects.contains_key(&k) {
            return Err(Error::AlreadyExists {
                kind: ar.kind.clone(),
                name,
            });
        }

        let version = inner.bump();
        let mut value = serde_json::to_value(obj)?;
        value["apiVersion"] = json!(ar.api_version);
        value["kind"] = json!(ar.kind);
        value["metadata"]["resourceVersion"] = json!(version);
        value["metadata"]["uid"] = json!(format!("uid-{version}"));

        inner.writes.creates += 1;
        inner.objects.insert(k, value.clone());
        to_dynamic(&value)
    }

    async fn replace(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, Error> {
        let name = obj.metadata.name.clone().unwrap_or_default();
        let k = key(ar, namespace, &name);

        let mut inner = self.inner.lock().unwrap();
        let Some(current) = inner.objects.get(&k).cloned() else {
            return Err(Error::NotFound {
                kind: ar.kind.clone(),
                name,
            });
        };

        if let Some(ref rv) = obj.metadata.resource_version
            && current["metadata"]["resourceVersion"].as_str() != Some(rv.as_str())
        {
            return Err(Error::Conflict {
                kind: ar.kind.clone(),
                name,
                message: "the object has been modified".to_owned(),
            });
        }

        let version = inner.bump();
        let mut value = serde_json::to_value(obj)?;
        value["apiVersion"] = json!(ar.api_version);
        value["kind"] = json!(ar.kind);
        value["metadata"]["resourceVersion"] = json!(version);
        value["metadata"]["uid"] = current["metadata"]["uid"].clone();
        value["metadata"]["deletionTimestamp"] = current["metadata"]["deletionTimestamp"].clone();
        // status is only written through the status subresource
        match current.get("status") {
            Some(status) => value["status"] = status.clone(),
            None => {
                if let Some(map) = value.as_object_mut() {
                    map.remove("status");
                }
            }
        }

        inner.writes.updates += 1;
        if !value["metadata"]["deletionTimestamp"].is_null() && !has_finalizers(&value) {
            inner.objects.remove(&k);
        } else {
            inner.objects.insert(k, value.clone());
        }
        to_dynamic(&value)
    }

    async fn replace_status(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, Error> {
        let name = obj.metadata.name.clone().unwrap_or_default();
        let k = key(ar, namespace, &name);

        let mut inner = self.inner.lock().unwrap();
        let Some(mut current) = inner.objects.get(&k).cloned() else {
            return Err(Error::NotFound {
                kind: ar.kind.clone(),
                name,
            });
        };

        if let Some(ref rv) = obj.metadata.resource_version
            && current["metadata"]["resourceVersion"].as_str() != Some(rv.as_str())
        {
            return Err(Error::Conflict {
                kind: ar.kind.clone(),
                name,
                message: "the object has been modified".to_owned(),
            });
        }

        let version = inner.bump();
        current["status"] = obj.data.get("status").cloned().unwrap_or(Value::Null);
        current["metadata"]["resourceVersion"] = json!(version);

        inner.writes.status_updates += 1;
        inner.objects.insert(k, current.clone());
        to_dynamic(&current)
    }

    async fn delete(
        &self,
        ar: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), Error> {
        let k = key(ar, namespace, name);

        let mut inner = self.inner.lock().unwrap();
        let Some(current) = inner.objects.get(&k) else {
            return Err(Error::NotFound {
                kind: ar.kind.clone(),
                name: name.to_owned(),
            });
        };

        if has_finalizers(current) {
            if let Some(current) = inner.objects.get_mut(&k) {
                current["metadata"]["deletionTimestamp"] = json!("2025-01-01T00:00:00Z");
            }
        } else {
            inner.objects.remove(&k);
        }
        inner.writes.deletes += 1;
        Ok(())
    }

    async fn has_api(&self, group_version: &str, _kind: &str) -> Result<bool, Error> {
        Ok(self.inner.lock().unwrap().apis.contains(group_version))
    }

    async fn publish(&self, event: &Event, _reference: &ObjectReference) -> Result<(), Error> {
        self.inner.lock().unwrap().events.push(event.reason.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn config_map(name: &str, labels: &[(&str, &str)]) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some("default".to_owned()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_stale_resource_version_conflicts() {
        let store = MemoryStore::new();
        store.insert(&config_map("cm", &[]));
        let ar = ApiResource::erase::<ConfigMap>(&());

        let mut first = store.get(&ar, Some("default"), "cm").await.unwrap();
        let stale = first.clone();

        first.data["data"] = json!({"a": "1"});
        store.replace(&ar, Some("default"), &first).await.unwrap();

        let err = store
            .replace(&ar, Some("default"), &stale)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.writes().updates, 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_label() {
        let store = MemoryStore::new();
        store.insert(&config_map("a", &[("app", "x")]));
        store.insert(&config_map("b", &[("app", "y")]));
        let ar = ApiResource::erase::<ConfigMap>(&());

        let found = store.list(&ar, None, Some("app=x")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata.name.as_deref(), Some("a"));

        let none = store.list(&ar, Some("other"), None).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_honours_finalizers() {
        let store = MemoryStore::new();
        let mut cm = config_map("cm", &[]);
        cm.metadata.finalizers = Some(vec!["example.com/hold".to_owned()]);
        store.insert(&cm);
        let ar = ApiResource::erase::<ConfigMap>(&());

        store.delete(&ar, Some("default"), "cm").await.unwrap();
        let held: ConfigMap = store.get_typed(Some("default"), "cm").unwrap();
        assert!(held.metadata.deletion_timestamp.is_some());

        let mut obj = store.get(&ar, Some("default"), "cm").await.unwrap();
        obj.metadata.finalizers = Some(vec![]);
        store.replace(&ar, Some("default"), &obj).await.unwrap();
        assert!(store.get_typed::<ConfigMap>(Some("default"), "cm").is_none());
    }
}
