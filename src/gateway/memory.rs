// In-memory gateway fake for tests and offline development.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{merge_fields, Document, DocumentGateway, GatewayError, ObjectStore, UserDirectory};

/// In-process stand-in for the hosted backend, implementing all three
/// gateway traits over mutex-guarded maps.
///
/// `BTreeMap` keeps listing order deterministic, which the integration
/// tests rely on.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    collections: Mutex<BTreeMap<String, BTreeMap<String, serde_json::Value>>>,
    /// Object name -> public URL.
    objects: Mutex<BTreeMap<String, String>>,
    /// Email -> account uid.
    accounts: Mutex<BTreeMap<String, String>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a document.
    pub fn seed_document(&self, collection: &str, id: &str, fields: serde_json::Value) {
        let mut collections = self.collections.lock().expect("gateway mutex poisoned");
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Seed a stored object with its public URL.
    pub fn seed_object(&self, name: &str, url: &str) {
        let mut objects = self.objects.lock().expect("gateway mutex poisoned");
        objects.insert(name.to_string(), url.to_string());
    }

    /// Seed a directory account.
    pub fn seed_account(&self, email: &str, uid: &str) {
        let mut accounts = self.accounts.lock().expect("gateway mutex poisoned");
        accounts.insert(email.to_string(), uid.to_string());
    }

    /// Snapshot a document's fields, for assertions.
    pub fn document_fields(&self, collection: &str, id: &str) -> Option<serde_json::Value> {
        let collections = self.collections.lock().expect("gateway mutex poisoned");
        collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }
}

#[async_trait]
impl DocumentGateway for MemoryGateway {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, GatewayError> {
        let collections = self.collections.lock().expect("gateway mutex poisoned");
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, GatewayError> {
        let collections = self.collections.lock().expect("gateway mutex poisoned");
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn merge_update(
        &self,
        collection: &str,
        id: &str,
        fields: &serde_json::Value,
    ) -> Result<(), GatewayError> {
        let mut collections = self.collections.lock().expect("gateway mutex poisoned");
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) => merge_fields(existing, fields),
            None => {
                docs.insert(id.to_string(), fields.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryGateway {
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, GatewayError> {
        let objects = self.objects.lock().expect("gateway mutex poisoned");
        Ok(objects
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn public_url(&self, name: &str) -> Result<String, GatewayError> {
        let objects = self.objects.lock().expect("gateway mutex poisoned");
        objects.get(name).cloned().ok_or(GatewayError::Status {
            code: 404,
            url: format!("memory://objects/{name}"),
        })
    }
}

#[async_trait]
impl UserDirectory for MemoryGateway {
    async fn lookup_by_email(&self, email: &str) -> Result<Option<String>, GatewayError> {
        let accounts = self.accounts.lock().expect("gateway mutex poisoned");
        Ok(accounts.get(email).cloned())
    }
}
