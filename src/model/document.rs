use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FacilityError, FacilityResult};

/// An attachment on a facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: DocumentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DocumentKind {
    /// Stored file; `path` is the object-storage key
    File {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
    },
    Link {
        url: String,
    },
}

impl Document {
    /// Create a link document with a fresh id.
    ///
    /// The URL must be absolute and use http or https.
    pub fn link(name: &str, url: &str) -> FacilityResult<Self> {
        let name = required_name(name)?;
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| FacilityError::validation(format!("Invalid URL format: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FacilityError::validation(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        Ok(Self {
            id: new_document_id(),
            name,
            kind: DocumentKind::Link {
                url: parsed.to_string(),
            },
            added_at: Some(Utc::now()),
        })
    }

    /// Create file metadata with a fresh id. The bytes live in external storage.
    pub fn file(name: &str, path: &str, size: Option<u64>) -> FacilityResult<Self> {
        let name = required_name(name)?;
        if path.trim().is_empty() {
            return Err(FacilityError::validation("Missing storage path for file"));
        }

        Ok(Self {
            id: new_document_id(),
            name,
            kind: DocumentKind::File {
                path: path.trim().to_string(),
                size,
            },
            added_at: Some(Utc::now()),
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            DocumentKind::File { .. } => "file",
            DocumentKind::Link { .. } => "link",
        }
    }

    /// URL for links, storage path for files
    pub fn target(&self) -> &str {
        match &self.kind {
            DocumentKind::File { path, .. } => path,
            DocumentKind::Link { url } => url,
        }
    }
}

fn required_name(name: &str) -> FacilityResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FacilityError::validation("Missing document name"));
    }
    Ok(name.to_string())
}

fn new_document_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
