use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ANONYMOUS: &str = "Anonymous";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    File,
    Image,
    Text,
}

impl UploadKind {
    /// Classifies binary content by its declared MIME type.
    pub fn for_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image") {
            UploadKind::Image
        } else {
            UploadKind::File
        }
    }
}

/// What a record holds. Binary variants point at a stored file; the text
/// variant carries its content inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UploadContent {
    #[serde(rename_all = "camelCase")]
    File {
        display_name: String,
        location_ref: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        display_name: String,
        location_ref: String,
    },
    Text { text: String },
}

impl UploadContent {
    /// Content for a binary written to disk, classified by `content_type`.
    pub fn stored(content_type: &str, display_name: String, location_ref: String) -> Self {
        match UploadKind::for_content_type(content_type) {
            UploadKind::Image => UploadContent::Image {
                display_name,
                location_ref,
            },
            _ => UploadContent::File {
                display_name,
                location_ref,
            },
        }
    }

    pub fn kind(&self) -> UploadKind {
        match self {
            UploadContent::File { .. } => UploadKind::File,
            UploadContent::Image { .. } => UploadKind::Image,
            UploadContent::Text { .. } => UploadKind::Text,
        }
    }

    pub fn location_ref(&self) -> Option<&str> {
        match self {
            UploadContent::File { location_ref, .. } | UploadContent::Image { location_ref, .. } => {
                Some(location_ref.as_str())
            }
            UploadContent::Text { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            UploadContent::Text { text } => Some(text.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    #[serde(flatten)]
    pub content: UploadContent,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

impl UploadRecord {
    pub fn new(content: UploadContent, uploaded_by: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            uploaded_by: uploader_or_anonymous(uploaded_by),
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> UploadKind {
        self.content.kind()
    }
}

/// A binary part received from the client.
#[derive(Debug, Clone)]
pub struct BinaryPayload {
    pub original_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Everything a client may send to `/api/upload`.
#[derive(Debug, Clone, Default)]
pub struct UploadInput {
    pub file: Option<BinaryPayload>,
    pub text: Option<String>,
    pub uploaded_by: Option<String>,
}

impl UploadInput {
    pub fn text(text: impl Into<String>, uploaded_by: Option<&str>) -> Self {
        Self {
            text: Some(text.into()),
            uploaded_by: uploaded_by.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn binary(
        original_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
        uploaded_by: Option<&str>,
    ) -> Self {
        Self {
            file: Some(BinaryPayload {
                original_name: original_name.into(),
                content_type: content_type.into(),
                data,
            }),
            uploaded_by: uploaded_by.map(str::to_string),
            ..Self::default()
        }
    }
}

fn uploader_or_anonymous(uploaded_by: Option<String>) -> String {
    uploaded_by
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_type_classification() {
        assert_eq!(UploadKind::for_content_type("image/png"), UploadKind::Image);
        assert_eq!(UploadKind::for_content_type("image/svg+xml"), UploadKind::Image);
        assert_eq!(UploadKind::for_content_type("application/pdf"), UploadKind::File);
        assert_eq!(UploadKind::for_content_type(DEFAULT_CONTENT_TYPE), UploadKind::File);
    }

    #[test]
    fn uploader_defaults_to_anonymous() {
        let content = UploadContent::Text { text: "hi".into() };
        assert_eq!(UploadRecord::new(content.clone(), None).uploaded_by, "Anonymous");
        assert_eq!(UploadRecord::new(content.clone(), Some(String::new())).uploaded_by, "Anonymous");
        assert_eq!(UploadRecord::new(content, Some("alice".into())).uploaded_by, "alice");
    }

    #[test]
    fn text_record_wire_shape() {
        let record = UploadRecord::new(UploadContent::Text { text: "hello".into() }, Some("alice".into()));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["kind"], json!("text"));
        assert_eq!(value["text"], json!("hello"));
        assert_eq!(value["uploadedBy"], json!("alice"));
        assert!(value.get("locationRef").is_none());
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn image_record_wire_shape() {
        let content = UploadContent::stored(
            "image/png",
            "cat.png".into(),
            "/uploads/1-cat.png".into(),
        );
        let record = UploadRecord::new(content, None);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["kind"], json!("image"));
        assert_eq!(value["displayName"], json!("cat.png"));
        assert_eq!(value["locationRef"], json!("/uploads/1-cat.png"));
        assert!(value.get("text").is_none());

        let back: UploadRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
