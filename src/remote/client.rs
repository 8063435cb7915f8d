use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::edit::{apply_patch, prepare_new, UPDATABLE_KEYS};
use crate::error::{FacilityError, FacilityResult};
use crate::geojson::{record_from_value, records_from_collection, to_feature};
use crate::model::{Document, DocumentKind, FacilityRecord};
use crate::store::FacilityStore;

/// Folder new document items are filed under
const DOC_ROOT: &str = "root";

/// Client for the facility directory HTTP API
pub struct RemoteDirectory {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Document item as returned by `/api/doc_items`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocItem {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    url: Option<String>,
    storage_path: Option<String>,
    size: Option<u64>,
}

impl RemoteDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid remote directory URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Remote directory URL cannot be a base: {}", base_url);
        }

        let client = Client::builder()
            .user_agent(concat!("lithium-facilities/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Attach the bearer token sent with write requests
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> FacilityResult<RequestBuilder> {
        let token = self.token.as_deref().ok_or(FacilityError::Unauthorized)?;
        Ok(request.bearer_auth(token))
    }

    /// Send the request and map non-success statuses onto [`FacilityError`].
    fn send(&self, request: RequestBuilder, id: &str) -> FacilityResult<Response> {
        let response = request.send()?;
        let status = response.status();
        debug!(%status, url = %response.url(), "directory response");
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or(text);
        Err(status_error(status, id, message))
    }
}

/// Error for a failed directory response.
pub fn status_error(status: StatusCode, id: &str, message: String) -> FacilityError {
    match status {
        StatusCode::NOT_FOUND => FacilityError::NotFound(id.to_string()),
        StatusCode::BAD_REQUEST => FacilityError::Validation(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FacilityError::Unauthorized,
        StatusCode::CONFLICT => FacilityError::Conflict(id.to_string()),
        _ if message.is_empty() => FacilityError::Transport(status.to_string()),
        _ => FacilityError::Transport(format!("{}: {}", status, message)),
    }
}

/// Body for `PUT /api/facilities/{id}`.
///
/// Carries the patched keys as they resolved in `updated`, plus both year
/// fields so the server drops the one that no longer applies.
fn wire_patch(patch: &Value, updated: &FacilityRecord) -> FacilityResult<Value> {
    let resolved = serde_json::to_value(updated)?;
    let mut body = Map::new();

    if let Value::Object(patch) = patch {
        for key in patch.keys().filter(|k| UPDATABLE_KEYS.contains(&k.as_str())) {
            let value = resolved.get(key).cloned().unwrap_or(Value::Null);
            body.insert(key.clone(), value);
        }
    }
    for key in ["yearStarted", "yearPlanned"] {
        let value = resolved.get(key).cloned().unwrap_or(Value::Null);
        body.insert(key.to_string(), value);
    }

    Ok(Value::Object(body))
}

impl DocItem {
    fn into_document(self, added_at: Option<chrono::DateTime<chrono::Utc>>) -> FacilityResult<Document> {
        let kind = match self.kind.as_str() {
            "link" => DocumentKind::Link {
                url: self.url.unwrap_or_default(),
            },
            "file" => DocumentKind::File {
                path: self.storage_path.unwrap_or_default(),
                size: self.size,
            },
            other => {
                return Err(FacilityError::Transport(format!(
                    "Unexpected document type from directory: {}",
                    other
                )))
            }
        };

        Ok(Document {
            id: self.id,
            name: self.name,
            kind,
            added_at,
        })
    }
}

impl FacilityStore for RemoteDirectory {
    fn list_facilities(&self) -> FacilityResult<Vec<FacilityRecord>> {
        let response = self.send(self.client.get(self.url(&["api", "facilities"])), "")?;
        let records = records_from_collection(response.json()?)?;
        info!(count = records.len(), "fetched facilities from directory");
        Ok(records)
    }

    fn get_facility(&self, id: &str) -> FacilityResult<FacilityRecord> {
        let response = self.send(self.client.get(self.url(&["api", "facilities", id])), id)?;
        record_from_value(response.json()?)
    }

    fn create_facility(&mut self, record: FacilityRecord) -> FacilityResult<FacilityRecord> {
        let record = prepare_new(record)?;
        let request = self
            .authorized(self.client.post(self.url(&["api", "facilities"])))?
            .json(&to_feature(&record)?);

        let response = self.send(request, &record.id)?;
        let created = record_from_value(response.json()?)?;
        info!(id = %created.id, "created facility in directory");
        Ok(created)
    }

    fn update_facility(&mut self, id: &str, patch: &Value) -> FacilityResult<FacilityRecord> {
        // Validate locally first so a bad patch never reaches the server
        let current = self.get_facility(id)?;
        let updated = apply_patch(&current, patch)?;

        let request = self
            .authorized(self.client.put(self.url(&["api", "facilities", id])))?
            .json(&wire_patch(patch, &updated)?);
        let response = self.send(request, id)?;

        // The server answers with properties only
        let mut stored = record_from_value(json!({ "properties": response.json::<Value>()? }))?;
        if stored.id.is_empty() {
            stored.id = id.to_string();
        }
        if stored.geometry.is_none() {
            stored.geometry = updated.geometry;
        }
        info!(id, "updated facility in directory");
        Ok(stored)
    }

    fn delete_facility(&mut self, id: &str) -> FacilityResult<()> {
        let request = self.authorized(self.client.delete(self.url(&["api", "facilities", id])))?;
        self.send(request, id)?;
        info!(id, "deleted facility from directory");
        Ok(())
    }

    fn add_document(&mut self, id: &str, document: Document) -> FacilityResult<Document> {
        self.get_facility(id)?;

        let mut body = json!({
            "name": document.name,
            "type": document.type_name(),
            "parentId": DOC_ROOT,
            "facilityId": id,
        });
        match &document.kind {
            DocumentKind::Link { url } => body["url"] = json!(url),
            DocumentKind::File { path, size } => {
                body["storagePath"] = json!(path);
                body["size"] = json!(size.unwrap_or(0));
            }
        }

        let request = self
            .authorized(self.client.post(self.url(&["api", "doc_items"])))?
            .json(&body);
        let item: DocItem = self.send(request, id)?.json()?;
        item.into_document(document.added_at)
    }

    fn remove_document(&mut self, id: &str, document_id: &str) -> FacilityResult<()> {
        let request =
            self.authorized(self.client.delete(self.url(&["api", "doc_items", document_id])))?;
        match self.send(request, document_id) {
            Ok(_) => Ok(()),
            Err(FacilityError::NotFound(_)) => Err(FacilityError::DocumentNotFound {
                facility_id: id.to_string(),
                document_id: document_id.to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}
