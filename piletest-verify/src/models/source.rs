//! Uploaded field sheet sources

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Content types the OCR collaborator accepts
const ACCEPTED_CONTENT_TYPES: [&str; 2] = ["image/", "application/pdf"];

/// One uploaded field sheet (image or PDF)
///
/// The payload is held in memory for the lifetime of the report and never
/// serialized back to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl SourceFile {
    /// Validate and wrap an upload
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<Self, EngineError> {
        let file_name = file_name.into();
        let content_type = content_type.into();

        if !ACCEPTED_CONTENT_TYPES
            .iter()
            .any(|accepted| content_type.contains(accepted))
        {
            return Err(EngineError::InvalidSource(format!(
                "{}: unsupported content type '{}', only images and PDFs are accepted",
                file_name, content_type
            )));
        }
        if data.is_empty() {
            return Err(EngineError::InvalidSource(format!("{}: file is empty", file_name)));
        }

        Ok(Self {
            file_name,
            content_type,
            size_bytes: data.len(),
            data,
        })
    }
}
