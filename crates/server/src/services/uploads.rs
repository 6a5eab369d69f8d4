//! Image uploads stored under the upload directory and served at `/uploads`.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted file.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// URL prefix the upload directory is served under.
pub const UPLOADS_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file in upload")]
    MissingFile,

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("file content does not match its type")]
    ContentMismatch,

    #[error("SVG contains scripts or external content")]
    UnsafeSvg,

    #[error("file exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Gif,
    Svg,
}

impl ImageKind {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Svg => "svg",
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            "image/svg+xml" => Some(Self::Svg),
            _ => None,
        }
    }

    fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Whether the leading bytes look like this format.
    fn matches(self, bytes: &[u8]) -> bool {
        match self {
            Self::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            Self::Png => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
            Self::Gif => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
            Self::Webp => bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()),
            Self::Svg => {
                let head = bytes.get(..1024).unwrap_or(bytes);
                String::from_utf8_lossy(head).contains("<svg")
            }
        }
    }
}

/// SVG elements that run script or embed foreign content.
const SVG_BLOCKED_ELEMENTS: &[&str] = &["<script", "<foreignobject", "<iframe", "<embed", "<object"];

/// URI schemes that execute when followed.
const SVG_BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:text/html"];

/// Whether an SVG document is free of script elements, event handler
/// attributes and script URIs.
#[must_use]
pub fn svg_is_safe(bytes: &[u8]) -> bool {
    let text = String::from_utf8_lossy(bytes).to_ascii_lowercase();
    if SVG_BLOCKED_ELEMENTS
        .iter()
        .chain(SVG_BLOCKED_SCHEMES)
        .any(|needle| text.contains(needle))
    {
        return false;
    }
    !has_event_handler(&text)
}

/// Finds `on<letters>=` attributes, e.g. `onload=` or `onclick =`.
fn has_event_handler(text: &str) -> bool {
    text.match_indices("on").any(|(at, _)| {
        let preceded_by_space = text
            .get(..at)
            .and_then(|before| before.chars().next_back())
            .is_some_and(|c| c.is_ascii_whitespace() || c == '/');
        let Some(after) = text.get(at + 2..) else {
            return false;
        };
        let name_end = after
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after.len());
        preceded_by_space
            && name_end > 0
            && after
                .get(name_end..)
                .is_some_and(|rest| rest.trim_start().starts_with('='))
    })
}

/// Determine the image type from the declared content type, falling back to
/// the file name.
///
/// # Errors
///
/// Returns `UploadError::UnsupportedType` for anything but jpeg, png, webp,
/// gif and svg.
pub fn detect_kind(
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<ImageKind, UploadError> {
    content_type
        .and_then(ImageKind::from_content_type)
        .or_else(|| file_name.and_then(ImageKind::from_file_name))
        .ok_or_else(|| {
            UploadError::UnsupportedType(
                content_type
                    .or(file_name)
                    .unwrap_or("unknown")
                    .to_string(),
            )
        })
}

/// A stored upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    pub file_name: String,
    pub url: String,
    pub size: usize,
}

/// Check and write an upload as `<upload_dir>/<uuid>.<ext>`.
///
/// # Errors
///
/// Returns `UploadError` if the file is empty, too large, does not match
/// its declared type, or cannot be written.
pub async fn store(
    upload_dir: &Path,
    kind: ImageKind,
    bytes: &[u8],
) -> Result<StoredUpload, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::MissingFile);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            max: MAX_UPLOAD_BYTES,
        });
    }
    if !kind.matches(bytes) {
        return Err(UploadError::ContentMismatch);
    }
    if kind == ImageKind::Svg && !svg_is_safe(bytes) {
        return Err(UploadError::UnsafeSvg);
    }

    tokio::fs::create_dir_all(upload_dir).await?;
    let file_name = format!("{}.{}", Uuid::new_v4(), kind.extension());
    tokio::fs::write(upload_dir.join(&file_name), bytes).await?;

    tracing::info!(file = %file_name, size = bytes.len(), "Upload stored");
    Ok(StoredUpload {
        url: format!("{UPLOADS_PREFIX}/{file_name}"),
        file_name,
        size: bytes.len(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_detect_kind_prefers_content_type() {
        assert_eq!(
            detect_kind(Some("image/png"), Some("photo.jpg")).unwrap(),
            ImageKind::Png
        );
        assert_eq!(
            detect_kind(Some("application/octet-stream"), Some("Photo.JPEG")).unwrap(),
            ImageKind::Jpeg
        );
        assert!(matches!(
            detect_kind(Some("application/pdf"), Some("doc.pdf")),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(detect_kind(None, None).is_err());
    }

    #[test]
    fn test_magic_bytes() {
        assert!(ImageKind::Png.matches(PNG));
        assert!(!ImageKind::Jpeg.matches(PNG));
        assert!(ImageKind::Webp.matches(b"RIFF\0\0\0\0WEBPVP8 "));
        assert!(ImageKind::Svg.matches(br#"<?xml version="1.0"?><svg xmlns="x"/>"#));
        assert!(!ImageKind::Gif.matches(b"GIF"));
    }

    #[test]
    fn test_svg_safety() {
        assert!(svg_is_safe(
            br#"<svg xmlns="http://www.w3.org/2000/svg"><circle r="4" fill="red"/></svg>"#
        ));
        assert!(!svg_is_safe(br"<svg><script>alert(1)</script></svg>"));
        assert!(!svg_is_safe(br#"<svg onload="alert(1)"/>"#));
        assert!(!svg_is_safe(br#"<svg><rect ONCLICK = "x()"/></svg>"#));
        assert!(!svg_is_safe(br#"<svg><a href="javascript:x()">y</a></svg>"#));
        assert!(svg_is_safe(br#"<svg><text font-family="Montserrat">on sale</text></svg>"#));
    }

    #[tokio::test]
    async fn test_store_writes_uuid_named_file() {
        let dir = std::env::temp_dir().join(format!("shoply-upload-{}", Uuid::new_v4()));
        let stored = store(&dir, ImageKind::Png, PNG).await.unwrap();

        assert!(stored.file_name.ends_with(".png"));
        assert_eq!(stored.url, format!("/uploads/{}", stored.file_name));
        assert_eq!(
            tokio::fs::read(dir.join(&stored.file_name)).await.unwrap(),
            PNG
        );

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_rejects_mismatch_and_empty() {
        let dir = std::env::temp_dir().join("shoply-upload-rejects");
        assert!(matches!(
            store(&dir, ImageKind::Jpeg, PNG).await,
            Err(UploadError::ContentMismatch)
        ));
        assert!(matches!(
            store(&dir, ImageKind::Png, b"").await,
            Err(UploadError::MissingFile)
        ));
    }
}
