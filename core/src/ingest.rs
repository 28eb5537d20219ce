//! Media ingest: validation and normalization of uploaded frames, video
//! references and diagnostic text before they reach a model backend.

use crate::errors::IngestError;
use crate::types::DiagnosticRequest;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// MIME type used when nothing better is known about an upload
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Image container formats recognised from magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
    Heic,
}

impl ImageFormat {
    /// Detect the format from the leading bytes of a file
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::Webp);
        }
        if data.len() >= 12 && &data[4..8] == b"ftyp" {
            let brand = &data[8..12];
            if [b"heic", b"heix", b"hevc", b"heim", b"heis", b"mif1", b"msf1"]
                .iter()
                .any(|b| &b[..] == brand)
            {
                return Some(ImageFormat::Heic);
            }
        }
        if data.starts_with(b"BM") && data.len() >= 14 {
            return Some(ImageFormat::Bmp);
        }
        None
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Heic => "image/heic",
        }
    }
}

/// A single uploaded camera frame, normalized for model consumption
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFrame {
    /// Client-supplied file name, if any
    pub file_name: Option<String>,
    /// Resolved MIME type
    pub mime_type: String,
    /// Detected image format, `None` when the bytes are not a known image
    pub format: Option<ImageFormat>,
    /// Raw file content
    pub data: Vec<u8>,
}

impl MediaFrame {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the frame can be sent to a vision model as an image
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Validate an uploaded frame and resolve its MIME type.
///
/// The content itself is never rejected: empty and non-image uploads are
/// passed through with an `application/octet-stream` type. Only the size
/// limit is enforced here.
pub fn normalize_frame(
    file_name: Option<String>,
    declared_type: Option<&str>,
    data: Vec<u8>,
    max_bytes: usize,
) -> Result<MediaFrame, IngestError> {
    if data.len() > max_bytes {
        return Err(IngestError::PayloadTooLarge {
            size: data.len(),
            limit: max_bytes,
        });
    }

    let format = ImageFormat::sniff(&data);
    let mime_type = match (format, declared_type) {
        (Some(format), _) => format.mime_type().to_string(),
        (None, Some(declared)) if declared.trim().to_ascii_lowercase().starts_with("image/") => {
            declared.trim().to_ascii_lowercase()
        }
        _ => OCTET_STREAM.to_string(),
    };

    let file_name = file_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    debug!(
        "Normalized frame {:?}: {} bytes as {}",
        file_name,
        data.len(),
        mime_type
    );

    Ok(MediaFrame {
        file_name,
        mime_type,
        format,
        data,
    })
}

/// Where the vetting video lives
#[derive(Debug, Clone, PartialEq)]
pub enum VideoSource {
    /// An absolute http(s) URL
    Remote(Url),
    /// Anything else the client sent, kept verbatim (trimmed)
    Reference(String),
}

impl VideoSource {
    /// Classify a raw `video_url` value. Never fails.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => VideoSource::Remote(url),
            _ => VideoSource::Reference(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VideoSource::Remote(url) => url.as_str(),
            VideoSource::Reference(reference) => reference,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, VideoSource::Remote(_))
    }
}

impl std::fmt::Display for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim diagnostic text; a blank quote counts as no quote
pub fn normalize_diagnostic(request: DiagnosticRequest) -> DiagnosticRequest {
    let quote_data = request
        .quote_data
        .map(|quote| quote.trim().to_string())
        .filter(|quote| !quote.is_empty());

    DiagnosticRequest {
        audio_description: request.audio_description.trim().to_string(),
        quote_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_HEADER: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

    #[test]
    fn test_sniff_known_formats() {
        assert_eq!(ImageFormat::sniff(&JPEG_HEADER), Some(ImageFormat::Jpeg));
        assert_eq!(
            ImageFormat::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00]),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::sniff(b"GIF89a...."), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::sniff(b"RIFF\x10\x00\x00\x00WEBPVP8 "), Some(ImageFormat::Webp));
        assert_eq!(
            ImageFormat::sniff(b"\x00\x00\x00\x18ftypheic\x00\x00"),
            Some(ImageFormat::Heic)
        );
    }

    #[test]
    fn test_sniff_unknown() {
        assert_eq!(ImageFormat::sniff(b""), None);
        assert_eq!(ImageFormat::sniff(b"hello world"), None);
        assert_eq!(ImageFormat::sniff(b"RIFF\x10\x00\x00\x00WAVEfmt "), None);
    }

    #[test]
    fn test_normalize_frame_prefers_sniffed_type() {
        let frame = normalize_frame(
            Some("scene.png".to_string()),
            Some("image/png"),
            JPEG_HEADER.to_vec(),
            1024,
        )
        .unwrap();

        assert_eq!(frame.mime_type, "image/jpeg");
        assert_eq!(frame.format, Some(ImageFormat::Jpeg));
        assert!(frame.is_image());
    }

    #[test]
    fn test_normalize_frame_falls_back_to_declared_image_type() {
        let frame = normalize_frame(None, Some(" Image/AVIF "), b"opaque".to_vec(), 1024).unwrap();
        assert_eq!(frame.mime_type, "image/avif");
        assert_eq!(frame.format, None);
    }

    #[test]
    fn test_normalize_frame_accepts_any_content() {
        let empty = normalize_frame(Some("  ".to_string()), None, Vec::new(), 1024).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.file_name, None);
        assert_eq!(empty.mime_type, OCTET_STREAM);

        let text =
            normalize_frame(None, Some("text/plain"), b"not an image".to_vec(), 1024).unwrap();
        assert_eq!(text.mime_type, OCTET_STREAM);
        assert!(!text.is_image());
    }

    #[test]
    fn test_normalize_frame_enforces_limit() {
        let result = normalize_frame(None, None, vec![0u8; 11], 10);
        assert!(matches!(
            result,
            Err(IngestError::PayloadTooLarge { size: 11, limit: 10 })
        ));
    }

    #[test]
    fn test_video_source_classification() {
        let remote = VideoSource::parse(" https://cdn.example.com/car.mp4 ");
        assert!(remote.is_remote());
        assert_eq!(remote.as_str(), "https://cdn.example.com/car.mp4");

        let opaque = VideoSource::parse("listing-4471");
        assert_eq!(opaque, VideoSource::Reference("listing-4471".to_string()));

        let ftp = VideoSource::parse("ftp://example.com/car.mp4");
        assert!(!ftp.is_remote());

        assert_eq!(VideoSource::parse(""), VideoSource::Reference(String::new()));
    }

    #[test]
    fn test_normalize_diagnostic_blank_quote() {
        let request = normalize_diagnostic(DiagnosticRequest {
            audio_description: "  ticking at idle ".to_string(),
            quote_data: Some("   ".to_string()),
        });
        assert_eq!(request.audio_description, "ticking at idle");
        assert_eq!(request.quote_data, None);
    }
}
