//! File type sniffing from response metadata and body content.
//!
//! Determines the best file extension for a downloaded resource by combining
//! the server's declared content-type, the first bytes of the body, and the
//! URL path. Explicit signals outrank weaker inference: a known declared type
//! wins over a byte signature, which wins over a URL-embedded extension,
//! which wins over the coarse content-type category fallback.

/// Number of body-prefix bytes sufficient for signature matching.
pub const SNIFF_PREFIX_LEN: usize = 64;

/// Extension used when no signal yields a usable type.
pub const FALLBACK_EXTENSION: &str = ".bin";

/// Signal that produced a sniffed extension, strongest first.
///
/// The declaration order is the trust hierarchy; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SniffSource {
    /// Declared content-type found in the MIME table.
    DeclaredType,
    /// Magic-number prefix match on the body.
    ByteSignature,
    /// Known extension embedded in the URL path.
    UrlPath,
    /// Coarse fallback from the declared type's top-level category.
    TypeCategory,
    /// No signal produced an extension.
    Unknown,
}

/// Result of a sniff: the chosen extension (with leading dot) and the signal
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffResult {
    /// Sniffed extension including the leading dot, or `None` when unknown.
    pub extension: Option<String>,
    /// The signal the extension came from.
    pub source: SniffSource,
}

impl SniffResult {
    fn known(extension: &str, source: SniffSource) -> Self {
        Self {
            extension: Some(extension.to_string()),
            source,
        }
    }

    fn unknown() -> Self {
        Self {
            extension: None,
            source: SniffSource::Unknown,
        }
    }

    /// Returns the sniffed extension, or [`FALLBACK_EXTENSION`] when unknown.
    #[must_use]
    pub fn extension_or_default(&self) -> String {
        self.extension
            .clone()
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
    }
}

/// Determines the best extension for a resource.
///
/// Resolution order, first match wins:
/// 1. Declared content-type through the MIME table (`application/octet-stream`
///    is a wildcard placeholder and falls through).
/// 2. Magic-number prefix match against the body's first bytes.
/// 3. Known extension in the decoded URL path.
/// 4. Coarse category fallback from the declared type.
#[must_use]
pub fn sniff(
    declared_content_type: Option<&str>,
    body_prefix: Option<&[u8]>,
    url_path: &str,
) -> SniffResult {
    let mime = declared_content_type.map(normalize_mime);

    if let Some(mime) = mime.as_deref()
        && let Some(ext) = extension_from_mime(mime)
    {
        return SniffResult::known(ext, SniffSource::DeclaredType);
    }

    if let Some(prefix) = body_prefix
        && let Some(ext) = extension_from_signature(prefix)
    {
        return SniffResult::known(ext, SniffSource::ByteSignature);
    }

    if let Some(ext) = extension_from_path(url_path) {
        return SniffResult::known(&ext, SniffSource::UrlPath);
    }

    if let Some(mime) = mime.as_deref() {
        return SniffResult::known(extension_from_category(mime), SniffSource::TypeCategory);
    }

    SniffResult::unknown()
}

/// Strips parameters (`; charset=...`) and lowercases the media type.
fn normalize_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Fixed MIME-to-extension table.
///
/// `application/octet-stream` is deliberately absent: it declares nothing
/// about the payload and must fall through to the byte-signature check.
fn extension_from_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        "application/pdf" => ".pdf",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/tiff" => ".tif",
        "text/html" => ".html",
        "text/plain" => ".txt",
        "text/csv" => ".csv",
        "text/css" => ".css",
        "text/javascript" | "application/javascript" => ".js",
        "application/json" => ".json",
        "application/xml" | "text/xml" => ".xml",
        "application/zip" => ".zip",
        "application/gzip" => ".gz",
        "application/x-rar-compressed" | "application/vnd.rar" => ".rar",
        "application/x-7z-compressed" => ".7z",
        "application/x-tar" => ".tar",
        "application/msword" => ".doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        "application/vnd.ms-excel" => ".xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => ".xlsx",
        "application/vnd.ms-powerpoint" => ".ppt",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => ".pptx",
        "application/rtf" => ".rtf",
        "application/epub+zip" => ".epub",
        "audio/mpeg" => ".mp3",
        "audio/wav" | "audio/x-wav" => ".wav",
        "audio/ogg" => ".ogg",
        "video/mp4" => ".mp4",
        "video/mpeg" => ".mpg",
        "video/webm" => ".webm",
        "video/x-matroska" => ".mkv",
        _ => return None,
    };
    Some(ext)
}

/// Fixed magic-number prefix table. Longer signatures are listed before
/// shorter ones that could shadow them.
const SIGNATURES: &[(&[u8], &str)] = &[
    (&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], ".png"),
    (&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1], ".doc"),
    (b"Rar!\x1A\x07", ".rar"),
    (b"GIF87a", ".gif"),
    (b"GIF89a", ".gif"),
    (b"%PDF", ".pdf"),
    (&[0x50, 0x4B, 0x03, 0x04], ".zip"),
    (&[0x50, 0x4B, 0x05, 0x06], ".zip"),
    (&[0x50, 0x4B, 0x07, 0x08], ".zip"),
    (&[0x7F, 0x45, 0x4C, 0x46], ".elf"),
    (&[0xFF, 0xD8, 0xFF], ".jpg"),
    (b"BM", ".bmp"),
    (b"MZ", ".exe"),
];

fn extension_from_signature(prefix: &[u8]) -> Option<&'static str> {
    SIGNATURES
        .iter()
        .find(|(signature, _)| prefix.starts_with(signature))
        .map(|(_, ext)| *ext)
}

/// Extensions trusted when found in a URL path.
const KNOWN_PATH_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".rtf", ".odt", ".ods", ".epub",
    ".txt", ".csv", ".html", ".htm", ".xml", ".json", ".css", ".js", ".jpg", ".jpeg", ".png",
    ".gif", ".bmp", ".webp", ".svg", ".tif", ".tiff", ".zip", ".rar", ".7z", ".tar", ".gz",
    ".mp3", ".wav", ".ogg", ".mp4", ".mpg", ".webm", ".mkv", ".avi", ".bin", ".exe",
];

/// Extracts a known extension from the decoded last path segment.
fn extension_from_path(url_path: &str) -> Option<String> {
    let last_segment = url_path.rsplit('/').next()?;
    let decoded = urlencoding::decode(last_segment).ok()?;
    let dot_index = decoded.rfind('.')?;
    let ext = decoded[dot_index..].to_lowercase();
    KNOWN_PATH_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Coarse fallback by the declared type's top-level category.
///
/// `application/*` defaults to `.pdf`: documents are the dominant payload
/// this tool is pointed at. Unrecognized categories land on the unknown
/// binary extension.
fn extension_from_category(mime: &str) -> &'static str {
    let category = mime.split('/').next().unwrap_or("");
    match category {
        "image" => ".img",
        "text" => ".txt",
        "application" => ".pdf",
        _ => FALLBACK_EXTENSION,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- declared content-type ---

    #[test]
    fn test_sniff_declared_pdf_wins_over_body() {
        // Declared type in the table beats a conflicting byte signature.
        let result = sniff(Some("application/pdf"), Some(b"\x89PNG\r\n\x1a\n"), "/x");
        assert_eq!(result.extension.as_deref(), Some(".pdf"));
        assert_eq!(result.source, SniffSource::DeclaredType);
    }

    #[test]
    fn test_sniff_declared_type_strips_parameters() {
        let result = sniff(Some("text/html; charset=utf-8"), None, "/page");
        assert_eq!(result.extension.as_deref(), Some(".html"));
        assert_eq!(result.source, SniffSource::DeclaredType);
    }

    #[test]
    fn test_sniff_declared_type_case_insensitive() {
        let result = sniff(Some("Application/PDF"), None, "/x");
        assert_eq!(result.extension.as_deref(), Some(".pdf"));
    }

    #[test]
    fn test_sniff_octet_stream_falls_through_to_signature() {
        let result = sniff(Some("application/octet-stream"), Some(b"%PDF-1.7 ..."), "/x");
        assert_eq!(result.extension.as_deref(), Some(".pdf"));
        assert_eq!(result.source, SniffSource::ByteSignature);
    }

    // --- byte signatures ---

    #[test]
    fn test_sniff_signature_jpeg() {
        let result = sniff(None, Some(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), "/x");
        assert_eq!(result.extension.as_deref(), Some(".jpg"));
        assert_eq!(result.source, SniffSource::ByteSignature);
    }

    #[test]
    fn test_sniff_signature_png() {
        let result = sniff(None, Some(b"\x89PNG\r\n\x1a\n____"), "/x");
        assert_eq!(result.extension.as_deref(), Some(".png"));
    }

    #[test]
    fn test_sniff_signature_gif_both_versions() {
        assert_eq!(
            sniff(None, Some(b"GIF87a___"), "/x").extension.as_deref(),
            Some(".gif")
        );
        assert_eq!(
            sniff(None, Some(b"GIF89a___"), "/x").extension.as_deref(),
            Some(".gif")
        );
    }

    #[test]
    fn test_sniff_signature_zip_family() {
        assert_eq!(
            sniff(None, Some(b"PK\x03\x04rest"), "/x").extension.as_deref(),
            Some(".zip")
        );
        assert_eq!(
            sniff(None, Some(b"PK\x05\x06"), "/x").extension.as_deref(),
            Some(".zip")
        );
    }

    #[test]
    fn test_sniff_signature_ole_compound() {
        let prefix = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00];
        assert_eq!(
            sniff(None, Some(&prefix), "/x").extension.as_deref(),
            Some(".doc")
        );
    }

    #[test]
    fn test_sniff_signature_rar() {
        assert_eq!(
            sniff(None, Some(b"Rar!\x1A\x07\x00data"), "/x")
                .extension
                .as_deref(),
            Some(".rar")
        );
    }

    #[test]
    fn test_sniff_signature_elf_and_exe() {
        assert_eq!(
            sniff(None, Some(b"\x7FELF\x02\x01"), "/x").extension.as_deref(),
            Some(".elf")
        );
        assert_eq!(
            sniff(None, Some(b"MZ\x90\x00"), "/x").extension.as_deref(),
            Some(".exe")
        );
    }

    #[test]
    fn test_sniff_signature_beats_url_extension() {
        // Body bytes outrank URL guesswork.
        let result = sniff(None, Some(b"%PDF-1.4"), "/files/picture.jpg");
        assert_eq!(result.extension.as_deref(), Some(".pdf"));
        assert_eq!(result.source, SniffSource::ByteSignature);
    }

    // --- URL path ---

    #[test]
    fn test_sniff_url_path_known_extension() {
        let result = sniff(None, Some(b"no signature here"), "/docs/report.pdf");
        assert_eq!(result.extension.as_deref(), Some(".pdf"));
        assert_eq!(result.source, SniffSource::UrlPath);
    }

    #[test]
    fn test_sniff_url_path_decoded_and_lowercased() {
        let result = sniff(None, None, "/docs/My%20Report.PDF");
        assert_eq!(result.extension.as_deref(), Some(".pdf"));
    }

    #[test]
    fn test_sniff_url_path_unknown_extension_rejected() {
        let result = sniff(None, None, "/release/v1.0.73");
        assert_eq!(result.source, SniffSource::Unknown);
    }

    // --- category fallback ---

    #[test]
    fn test_sniff_category_image_fallback() {
        let result = sniff(Some("image/x-exotic"), None, "/pic");
        assert_eq!(result.extension.as_deref(), Some(".img"));
        assert_eq!(result.source, SniffSource::TypeCategory);
    }

    #[test]
    fn test_sniff_category_text_fallback() {
        let result = sniff(Some("text/x-log"), None, "/log");
        assert_eq!(result.extension.as_deref(), Some(".txt"));
        assert_eq!(result.source, SniffSource::TypeCategory);
    }

    #[test]
    fn test_sniff_category_application_defaults_to_pdf() {
        let result = sniff(Some("application/x-mystery"), None, "/dl");
        assert_eq!(result.extension.as_deref(), Some(".pdf"));
        assert_eq!(result.source, SniffSource::TypeCategory);
    }

    #[test]
    fn test_sniff_category_only_after_path() {
        // URL path extension outranks the category fallback.
        let result = sniff(Some("image/x-exotic"), None, "/pics/photo.png");
        assert_eq!(result.extension.as_deref(), Some(".png"));
        assert_eq!(result.source, SniffSource::UrlPath);
    }

    // --- unknown ---

    #[test]
    fn test_sniff_no_signals_is_unknown() {
        let result = sniff(None, Some(b"plain old bytes"), "/resource");
        assert_eq!(result.extension, None);
        assert_eq!(result.source, SniffSource::Unknown);
        assert_eq!(result.extension_or_default(), ".bin");
    }

    #[test]
    fn test_sniff_unrecognized_category_falls_back_to_binary() {
        let result = sniff(Some("model/gltf-binary"), None, "/asset");
        assert_eq!(result.extension.as_deref(), Some(".bin"));
        assert_eq!(result.source, SniffSource::TypeCategory);
    }

    #[test]
    fn test_sniff_source_ordering_matches_trust() {
        assert!(SniffSource::DeclaredType < SniffSource::ByteSignature);
        assert!(SniffSource::ByteSignature < SniffSource::UrlPath);
        assert!(SniffSource::UrlPath < SniffSource::TypeCategory);
        assert!(SniffSource::TypeCategory < SniffSource::Unknown);
    }

    #[test]
    fn test_sniff_empty_prefix_no_signature() {
        let result = sniff(None, Some(b""), "/x");
        assert_eq!(result.source, SniffSource::Unknown);
    }
}
