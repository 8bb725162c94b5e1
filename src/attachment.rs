use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Please upload only PDF files ({name} is {media_type})")]
    NotPdf { name: String, media_type: String },

    #[error("Could not read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A document attached to a query. Only PDFs can be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: &str, media_type: &str, bytes: Vec<u8>) -> Result<Self, AttachmentError> {
        if !is_pdf(media_type) {
            return Err(AttachmentError::NotPdf {
                name: name.to_string(),
                media_type: media_type.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            media_type: PDF_MEDIA_TYPE.to_string(),
            bytes,
        })
    }

    /// Load a file from disk. The declared media type comes from the file
    /// extension and is checked before the file is read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AttachmentError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let media_type = media_type_for(path);
        if !is_pdf(media_type) {
            return Err(AttachmentError::NotPdf {
                name,
                media_type: media_type.to_string(),
            });
        }

        let bytes = fs::read(path).map_err(|source| AttachmentError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Self::new(&name, media_type, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

fn is_pdf(media_type: &str) -> bool {
    media_type.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE)
}

/// Declared media type for a path, by extension
fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => PDF_MEDIA_TYPE,
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
