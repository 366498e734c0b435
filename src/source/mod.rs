//! Row sources: turning URL list files into download requests.
//!
//! Two file shapes are supported:
//!
//! - **Plain list** (`.txt` or anything not recognized below): one URL per
//!   line, blank lines and `#` comments skipped, optionally paired
//!   line-by-line with a separate names file.
//! - **Spreadsheet-style** (`.csv`/`.tsv`): two columns, column 1 the
//!   desired name (may be blank), column 2 the URL. A cell may hold several
//!   values separated by comma, semicolon, or space; when the name count in
//!   a cell does not match its URL count, names become `{base}_{index}`.
//!
//! Malformed rows are skipped with a diagnostic and never abort the batch;
//! only an unreadable or empty source file is fatal.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use url::Url;

/// One resource to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// The resource URL.
    pub url: String,
    /// Caller-requested base name, if any.
    pub requested_name: Option<String>,
}

impl DownloadRequest {
    /// Creates a request with an optional requested name.
    #[must_use]
    pub fn new(url: impl Into<String>, requested_name: Option<String>) -> Self {
        Self {
            url: url.into(),
            requested_name,
        }
    }

    /// Creates a request with no requested name.
    #[must_use]
    pub fn bare(url: impl Into<String>) -> Self {
        Self::new(url, None)
    }
}

impl fmt::Display for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.requested_name {
            Some(name) => write!(f, "{} -> {name}", self.url),
            None => write!(f, "{}", self.url),
        }
    }
}

/// Requests parsed from a source file, plus the rows that were skipped.
#[derive(Debug, Default)]
pub struct RowSet {
    /// Successfully parsed requests, in source order.
    pub requests: Vec<DownloadRequest>,
    /// Rows/cells that could not be parsed, with a reason (for logging).
    pub skipped: Vec<String>,
}

impl RowSet {
    /// Returns true if no requests were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Number of parsed requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Number of skipped rows.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    fn add_request(&mut self, url: &str, name: Option<String>) {
        match validate_url(url) {
            Ok(url) => self.requests.push(DownloadRequest::new(url, name)),
            Err(reason) => self.skipped.push(format!("{url}: {reason}")),
        }
    }
}

/// Error reading a source file. Fatal: the batch does not run.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source file could not be read.
    #[error("cannot read source file {path}: {source}")]
    Io {
        /// The source file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The source file held no rows at all.
    #[error("source file {path} contains no rows")]
    Empty {
        /// The source file path.
        path: PathBuf,
    },
}

/// Reads download requests from `path`.
///
/// `.csv` and `.tsv` files are parsed as two-column spreadsheets; everything
/// else as a plain URL list, optionally paired with `names_path` (one name
/// per line, matched line-by-line; on a count mismatch the longer list is
/// truncated with a warning).
///
/// # Errors
///
/// Returns [`SourceError::Io`] when a file cannot be read and
/// [`SourceError::Empty`] when the source holds no rows.
pub fn read_rows(path: &Path, names_path: Option<&Path>) -> Result<RowSet, SourceError> {
    let contents = read_file(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let rows = match extension.as_deref() {
        Some("csv") => parse_delimited(&contents, ','),
        Some("tsv") => parse_delimited(&contents, '\t'),
        _ => {
            let names = names_path.map(read_file).transpose()?;
            parse_plain(&contents, names.as_deref())
        }
    };

    if rows.requests.is_empty() && rows.skipped.is_empty() {
        return Err(SourceError::Empty {
            path: path.to_path_buf(),
        });
    }

    Ok(rows)
}

fn read_file(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parses a plain URL list, optionally paired with a names file.
fn parse_plain(contents: &str, names: Option<&str>) -> RowSet {
    let urls: Vec<&str> = data_lines(contents).collect();

    let names: Option<Vec<&str>> = names.map(|n| data_lines(n).collect());
    let pair_count = match &names {
        Some(names) if names.len() != urls.len() => {
            warn!(
                urls = urls.len(),
                names = names.len(),
                "URL and name counts differ; using the shorter list"
            );
            urls.len().min(names.len())
        }
        _ => urls.len(),
    };

    let mut rows = RowSet::default();
    for (index, url) in urls.iter().enumerate() {
        if names.is_some() && index >= pair_count {
            break;
        }
        let name = names
            .as_ref()
            .and_then(|names| names.get(index))
            .map(|n| (*n).to_string());
        rows.add_request(url, name);
    }
    rows
}

/// Non-blank, non-comment lines, trimmed.
fn data_lines(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Parses two-column spreadsheet-style rows (name, URL).
fn parse_delimited(contents: &str, delimiter: char) -> RowSet {
    let mut rows = RowSet::default();

    for line in data_lines(contents) {
        let cells = split_row(line, delimiter);
        let name_cell = cells.first().map(|c| c.trim()).unwrap_or("");
        let url_cell = cells.get(1).map(|c| c.trim()).unwrap_or("");

        if url_cell.is_empty() {
            rows.skipped.push(format!("{line}: missing URL column"));
            continue;
        }

        let urls = split_cell(url_cell);
        let names = cell_names(name_cell, urls.len());

        for (url, name) in urls.iter().zip(names) {
            rows.add_request(url, name);
        }
    }

    rows
}

/// Expands a name cell against `url_count` URLs from the same row.
///
/// Matching counts pair one-to-one. A blank cell yields no names. Any other
/// mismatch falls back to `{base}_{index}` per URL (1-based).
fn cell_names(name_cell: &str, url_count: usize) -> Vec<Option<String>> {
    if name_cell.is_empty() {
        return vec![None; url_count];
    }

    let names = split_cell(name_cell);
    if names.len() == url_count {
        return names.into_iter().map(Some).collect();
    }

    (1..=url_count)
        .map(|index| Some(format!("{name_cell}_{index}")))
        .collect()
}

/// Splits a cell into values on the first separator found among comma,
/// semicolon, and space.
fn split_cell(cell: &str) -> Vec<String> {
    for separator in [',', ';', ' '] {
        if cell.contains(separator) {
            return cell
                .split(separator)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
    vec![cell.to_string()]
}

/// Splits a delimited row into cells, honoring double-quoted cells
/// (with `""` as an escaped quote).
fn split_row(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' && current.is_empty() {
            in_quotes = true;
        } else if c == delimiter {
            cells.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    cells.push(current);
    cells
}

/// Validates a URL string, returning the trimmed URL or a reason to skip.
fn validate_url(url: &str) -> Result<String, &'static str> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err("blank URL");
    }
    match Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        Ok(_) => Err("unsupported URL scheme"),
        Err(_) => Err("not a valid URL"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_source(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    // --- plain lists ---

    #[test]
    fn test_plain_list_one_url_per_line() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "urls.txt",
            "https://a.test/1.pdf\n\nhttps://a.test/2.pdf\n",
        );

        let rows = read_rows(&path, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.requests[0], DownloadRequest::bare("https://a.test/1.pdf"));
        assert_eq!(rows.requests[1].requested_name, None);
    }

    #[test]
    fn test_plain_list_skips_comments_and_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "urls.txt",
            "# header\nhttps://a.test/ok.pdf\nnot a url\nftp://a.test/no\n",
        );

        let rows = read_rows(&path, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.skipped_count(), 2);
        assert!(rows.skipped[0].contains("not a valid URL"));
        assert!(rows.skipped[1].contains("unsupported URL scheme"));
    }

    #[test]
    fn test_plain_list_with_names_file() {
        let dir = TempDir::new().unwrap();
        let urls = write_source(&dir, "urls.txt", "https://a.test/1\nhttps://a.test/2\n");
        let names = write_source(&dir, "names.txt", "first\nsecond\n");

        let rows = read_rows(&urls, Some(names.as_path())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.requests[0].requested_name.as_deref(), Some("first"));
        assert_eq!(rows.requests[1].requested_name.as_deref(), Some("second"));
    }

    #[test]
    fn test_plain_list_name_count_mismatch_truncates() {
        let dir = TempDir::new().unwrap();
        let urls = write_source(
            &dir,
            "urls.txt",
            "https://a.test/1\nhttps://a.test/2\nhttps://a.test/3\n",
        );
        let names = write_source(&dir, "names.txt", "only\n");

        let rows = read_rows(&urls, Some(names.as_path())).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.requests[0].requested_name.as_deref(), Some("only"));
    }

    // --- spreadsheet-style ---

    #[test]
    fn test_csv_name_and_url_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "rows.csv",
            "report,https://a.test/r.pdf\n,https://a.test/anon.pdf\n",
        );

        let rows = read_rows(&path, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.requests[0].requested_name.as_deref(), Some("report"));
        assert_eq!(rows.requests[1].requested_name, None);
    }

    #[test]
    fn test_csv_missing_url_column_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "rows.csv", "name-only\nok,https://a.test/x.pdf\n");

        let rows = read_rows(&path, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.skipped_count(), 1);
        assert!(rows.skipped[0].contains("missing URL column"));
    }

    #[test]
    fn test_csv_multi_url_cell_with_matching_names() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "rows.csv",
            "\"a; b\",\"https://a.test/1.pdf; https://a.test/2.pdf\"\n",
        );

        let rows = read_rows(&path, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.requests[0].requested_name.as_deref(), Some("a"));
        assert_eq!(rows.requests[1].requested_name.as_deref(), Some("b"));
    }

    #[test]
    fn test_csv_multi_url_cell_name_mismatch_gets_indexed_names() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "rows.csv",
            "paper,\"https://a.test/1.pdf https://a.test/2.pdf https://a.test/3.pdf\"\n",
        );

        let rows = read_rows(&path, None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.requests[0].requested_name.as_deref(), Some("paper_1"));
        assert_eq!(rows.requests[2].requested_name.as_deref(), Some("paper_3"));
    }

    #[test]
    fn test_csv_quoted_cell_with_commas() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "rows.csv",
            "x,\"https://a.test/1.pdf,https://a.test/2.pdf\"\n",
        );

        let rows = read_rows(&path, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.requests[0].requested_name.as_deref(), Some("x_1"));
    }

    #[test]
    fn test_tsv_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "rows.tsv", "doc\thttps://a.test/doc.pdf\n");

        let rows = read_rows(&path, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.requests[0].requested_name.as_deref(), Some("doc"));
    }

    // --- fatal errors ---

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = read_rows(&dir.path().join("nope.txt"), None);
        assert!(matches!(result, Err(SourceError::Io { .. })));
    }

    #[test]
    fn test_empty_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "urls.txt", "\n\n# only a comment\n");
        assert!(matches!(
            read_rows(&path, None),
            Err(SourceError::Empty { .. })
        ));
    }

    // --- helpers ---

    #[test]
    fn test_split_row_plain() {
        assert_eq!(split_row("a,b,c", ','), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_row_quoted_with_escape() {
        assert_eq!(
            split_row("\"say \"\"hi\"\"\",rest", ','),
            vec!["say \"hi\"", "rest"]
        );
    }

    #[test]
    fn test_split_cell_prefers_first_separator_found() {
        assert_eq!(split_cell("a,b c"), vec!["a", "b c"]);
        assert_eq!(split_cell("a; b"), vec!["a", "b"]);
        assert_eq!(split_cell("single"), vec!["single"]);
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(DownloadRequest::bare("https://a.test/x").to_string(), "https://a.test/x");
        assert_eq!(
            DownloadRequest::new("https://a.test/x", Some("n".into())).to_string(),
            "https://a.test/x -> n"
        );
    }
}
