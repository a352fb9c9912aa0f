// HTTP client for the hosted backend's REST surface.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{Document, DocumentGateway, GatewayError, ObjectStore, UserDirectory};
use crate::config::GatewayConfig;

/// Gateway client backed by the hosted backend's REST API.
///
/// Cheap to clone; the inner `reqwest::Client` is an Arc internally.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct ListObjectsResponse {
    #[serde(default)]
    objects: Vec<StoredObject>,
}

#[derive(Debug, Deserialize)]
struct StoredObject {
    name: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRecordResponse {
    uid: String,
}

impl HttpGateway {
    /// Build a gateway client from config. Fails only if the underlying
    /// reqwest client cannot be constructed.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(HttpGateway {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Option<T>, GatewayError> {
        debug!("GET {}", url);
        let response = self.request(reqwest::Method::GET, url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.json::<T>().await.map_err(|e| GatewayError::Decode {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
                Ok(Some(body))
            }
            status => Err(GatewayError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

#[async_trait]
impl DocumentGateway for HttpGateway {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, GatewayError> {
        let url = format!("{}/v1/collections/{}/documents", self.base_url, collection);
        let body: Option<ListDocumentsResponse> = self.get_json(&url).await?;
        // A missing collection lists as empty rather than erroring.
        Ok(body.map(|b| b.documents).unwrap_or_default())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, GatewayError> {
        let url = format!(
            "{}/v1/collections/{}/documents/{}",
            self.base_url, collection, id
        );
        self.get_json(&url).await
    }

    async fn merge_update(
        &self,
        collection: &str,
        id: &str,
        fields: &serde_json::Value,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/v1/collections/{}/documents/{}?merge=true",
            self.base_url, collection, id
        );
        debug!("PATCH {}", url);
        let response = self
            .request(reqwest::Method::PATCH, &url)
            .json(fields)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                code: status.as_u16(),
                url,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for HttpGateway {
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, GatewayError> {
        let url = format!("{}/v1/objects?prefix={}", self.base_url, prefix);
        let body: Option<ListObjectsResponse> = self.get_json(&url).await?;
        Ok(body
            .map(|b| b.objects.into_iter().map(|o| o.name).collect())
            .unwrap_or_default())
    }

    async fn public_url(&self, name: &str) -> Result<String, GatewayError> {
        let url = format!("{}/v1/objects?prefix={}", self.base_url, name);
        let body: Option<ListObjectsResponse> = self.get_json(&url).await?;
        let matched = body
            .and_then(|b| b.objects.into_iter().find(|o| o.name == name))
            .and_then(|o| o.url);
        match matched {
            Some(u) => Ok(u),
            None => Err(GatewayError::Status {
                code: 404,
                url: format!("{}/v1/objects/{}", self.base_url, name),
            }),
        }
    }
}

#[async_trait]
impl UserDirectory for HttpGateway {
    async fn lookup_by_email(&self, email: &str) -> Result<Option<String>, GatewayError> {
        let url = format!("{}/v1/users/by-email/{}", self.base_url, email);
        let body: Option<UserRecordResponse> = self.get_json(&url).await?;
        Ok(body.map(|b| b.uid))
    }
}
