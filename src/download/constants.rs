//! Constants for the download module (timeouts, buffering).

/// Per-attempt HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Per-attempt HTTP read timeout between body chunks (30 seconds).
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Buffered-writer capacity for streaming body chunks to disk.
pub const WRITE_BUFFER_BYTES: usize = 8 * 1024;
