//! Candidate filename resolution.
//!
//! Combines a caller-requested base name, the URL's own path, and the sniffed
//! extension into a single candidate filename. The sniffed extension is
//! authoritative: a requested or URL-derived extension that disagrees with it
//! is replaced. Output is a plain filename, not yet guaranteed unique.

use sha2::{Digest, Sha256};
use url::Url;

use super::sniff::FALLBACK_EXTENSION;

/// Length of the hex hash suffix in synthesized names.
const SYNTH_HASH_LEN: usize = 8;

/// Longest suffix (after the dot) still treated as a filename extension.
const MAX_EXTENSION_LEN: usize = 5;

/// Resolves the candidate filename for a download.
///
/// - With a requested name, the (sanitized) request is the base name.
/// - Otherwise the base is derived from the URL's decoded path basename; when
///   the path yields no usable stem, a deterministic `host_hash` stem is
///   synthesized so repeated runs name the same URL identically.
/// - An existing extension is compared case-insensitively against
///   `sniffed_extension` and replaced on mismatch; a missing extension is
///   appended. An empty sniffed extension falls back to `.bin`.
#[must_use]
pub fn resolve_filename(
    requested_name: Option<&str>,
    url: &str,
    sniffed_extension: &str,
) -> String {
    let extension = if sniffed_extension.is_empty() {
        FALLBACK_EXTENSION
    } else {
        sniffed_extension
    };

    let base = requested_name
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| base_name_from_url(url));

    match split_extension(&base) {
        Some((_, existing)) if existing.eq_ignore_ascii_case(extension) => base,
        Some((stem, _)) => format!("{stem}{extension}"),
        None => format!("{base}{extension}"),
    }
}

/// Splits `name` into (stem, extension) when it carries a plausible extension:
/// a final dot-separated suffix of 1 to [`MAX_EXTENSION_LEN`] alphanumeric
/// characters, not at the start of the name.
fn split_extension(name: &str) -> Option<(&str, &str)> {
    let dot_index = name.rfind('.')?;
    if dot_index == 0 {
        return None;
    }
    let suffix = &name[dot_index + 1..];
    if suffix.is_empty()
        || suffix.len() > MAX_EXTENSION_LEN
        || !suffix.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some((&name[..dot_index], &name[dot_index..]))
}

/// Derives a base name from the URL's decoded path, or synthesizes one.
fn base_name_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return synthesize_stem(None, url);
    };

    if let Some(mut segments) = parsed.path_segments()
        && let Some(last) = segments.next_back()
        && !last.is_empty()
    {
        let decoded = urlencoding::decode(last)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| last.to_string());
        let sanitized = sanitize_filename(&decoded);
        if has_plausible_stem(&sanitized) {
            return sanitized;
        }
    }

    synthesize_stem(parsed.host_str(), url)
}

/// True when the name has something usable before any extension.
fn has_plausible_stem(name: &str) -> bool {
    let stem = split_extension(name).map_or(name, |(stem, _)| stem);
    stem.chars().any(|c| c.is_alphanumeric())
}

/// Builds a deterministic `host_hash` stem from the URL.
///
/// The hash is the leading hex of SHA-256 over the full URL, so the same URL
/// always synthesizes the same stem across runs.
fn synthesize_stem(host: Option<&str>, url: &str) -> String {
    let host = host
        .map(|h| sanitize_filename(&h.replace('.', "-")))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "download".to_string());
    let digest = Sha256::digest(url.as_bytes());
    let hex = format!("{digest:x}");
    format!("{host}_{}", &hex[..SYNTH_HASH_LEN])
}

/// Sanitizes a filename for filesystem safety.
///
/// Replaces path separators, characters invalid on common filesystems, and
/// control characters with `_`, and rewrites bare dot segments so the result
/// can never escape the destination directory.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.chars().all(|c| c == '.' || c == '_') {
        return sanitized.replace('.', "_");
    }

    sanitized
}
