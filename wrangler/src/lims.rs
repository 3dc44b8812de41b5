//! Downstream LIMS (Sequencescape) client
//!
//! Two operations are needed: resolving an entity name (study, purpose) to
//! its UUID, and POSTing a labware body. Neither retries; failures surface
//! straight to the caller.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use wrangler_common::config::LimsConfig;
use wrangler_common::{Error, Result};

/// Entity category for studies
pub const STUDY_ENTITY: &str = "studies";

/// Entity category for plate and tube rack purposes
pub const PLATE_PURPOSE_ENTITY: &str = "plate_purposes";

/// JSON:API media type
const JSON_API: &str = "application/vnd.api+json";

/// Header carrying the LIMS API key
const CLIENT_ID_HEADER: &str = "x-sequencescape-client-id";

/// Status and parsed JSON body of a LIMS response
#[derive(Debug, Clone, PartialEq)]
pub struct LimsResponse {
    pub status: u16,
    pub body: Value,
}

impl LimsResponse {
    /// True for 201 Created, the LIMS reply to a registered labware
    pub fn is_created(&self) -> bool {
        self.status == 201
    }
}

/// Operations the wrangler needs from the downstream LIMS
#[async_trait]
pub trait Lims: Send + Sync {
    /// UUID of the single entity of category `entity` named `name`
    ///
    /// # Errors
    /// - [`Error::EntityNotFound`] when nothing matches
    /// - [`Error::AmbiguousEntity`] when several entities match
    /// - [`Error::Lims`] on transport or decoding failure
    async fn entity_uuid(&self, entity: &str, name: &str) -> Result<String>;

    /// POST `body` to `endpoint`; any HTTP status is returned, not raised
    async fn post(&self, endpoint: &str, body: &Value) -> Result<LimsResponse>;
}

#[derive(Debug, Deserialize)]
struct EntityList {
    data: Vec<EntityRecord>,
}

#[derive(Debug, Deserialize)]
struct EntityRecord {
    attributes: EntityAttributes,
}

#[derive(Debug, Deserialize)]
struct EntityAttributes {
    uuid: String,
}

/// reqwest-backed Sequencescape client
#[derive(Clone)]
pub struct SequencescapeClient {
    http_client: Client,
    config: LimsConfig,
}

impl SequencescapeClient {
    pub fn new(config: &LimsConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(JSON_API));
        let api_key = header::HeaderValue::from_str(&config.api_key)
            .map_err(|e| Error::Config(format!("Invalid LIMS api_key: {}", e)))?;
        headers.insert(CLIENT_ID_HEADER, api_key);

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Lims(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Lims for SequencescapeClient {
    async fn entity_uuid(&self, entity: &str, name: &str) -> Result<String> {
        info!("Getting UUID for '{}' - '{}'", entity, name);

        let url = self.config.url_for(&format!("/api/v2/{}", entity));
        debug!("Sending GET to {}", url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("filter[name]", name)])
            .send()
            .await
            .map_err(|e| Error::Lims(format!("{} lookup request failed: {}", entity, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Lims(format!(
                "{} lookup returned error {}: {}",
                entity, status, body
            )));
        }

        let list: EntityList = response
            .json()
            .await
            .map_err(|e| Error::Lims(format!("Failed to parse {} lookup response: {}", entity, e)))?;

        let mut records = list.data.into_iter();
        match (records.next(), records.len()) {
            (None, _) => Err(Error::EntityNotFound {
                entity: entity.to_string(),
                name: name.to_string(),
            }),
            (Some(record), 0) => Ok(record.attributes.uuid),
            (Some(_), others) => Err(Error::AmbiguousEntity {
                entity: entity.to_string(),
                name: name.to_string(),
                count: others + 1,
            }),
        }
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<LimsResponse> {
        let url = self.config.url_for(endpoint);
        debug!("Sending POST to {}", url);

        let payload = serde_json::to_vec(body)
            .map_err(|e| Error::Lims(format!("Failed to encode request body: {}", e)))?;

        let response = self
            .http_client
            .post(&url)
            .header(header::CONTENT_TYPE, JSON_API)
            .body(payload)
            .send()
            .await
            .map_err(|e| Error::Lims(format!("POST to {} failed: {}", endpoint, e)))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Lims(format!("Failed to read response from {}: {}", endpoint, e)))?;

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            json!({})
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                Error::Lims(format!("Response from {} is not JSON: {}", endpoint, e))
            })?
        };

        info!("Response code from LIMS: {}", status);
        debug!(body = %body, "LIMS response body");

        Ok(LimsResponse { status, body })
    }
}

/// Memo of entity UUID lookups for one run
#[derive(Debug, Default)]
pub struct UuidCache {
    uuids: HashMap<(String, String), String>,
}

impl UuidCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached UUID, looking it up on first use; failures are not cached
    pub async fn entity_uuid(&mut self, lims: &dyn Lims, entity: &str, name: &str) -> Result<String> {
        let key = (entity.to_string(), name.to_string());
        if let Some(uuid) = self.uuids.get(&key) {
            return Ok(uuid.clone());
        }

        let uuid = lims.entity_uuid(entity, name).await?;
        self.uuids.insert(key, uuid.clone());
        Ok(uuid)
    }

    pub fn len(&self) -> usize {
        self.uuids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uuids.is_empty()
    }
}
