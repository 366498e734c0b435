//! Filename and type resolution for downloaded resources.
//!
//! Three cooperating pieces decide what a downloaded resource is called on
//! disk:
//!
//! - [`sniff`] determines the best extension from response metadata and the
//!   first bytes of the body;
//! - [`resolve_filename`] combines a requested name, the URL path, and the
//!   sniffed extension into a candidate filename;
//! - [`NamingLedger`] turns candidates into collision-free reserved names,
//!   atomically with respect to concurrent download tasks.

mod ledger;
mod resolve;
mod sniff;

pub use ledger::NamingLedger;
pub use resolve::{resolve_filename, sanitize_filename};
pub use sniff::{FALLBACK_EXTENSION, SNIFF_PREFIX_LEN, SniffResult, SniffSource, sniff};
