//! Per-run ledger of claimed filenames in a destination directory.
//!
//! The ledger is the single source of truth for filename uniqueness within a
//! batch: it is seeded from the files already on disk and extended by every
//! reservation made by an in-flight task. Check-then-reserve is atomic under
//! the ledger's mutex, so two tasks racing on the same candidate can never
//! receive the same final name.
//!
//! Reservations are held for the lifetime of the run and are never released,
//! even when the owning task fails. A retried or re-run task therefore cannot
//! overwrite another task's output with a differently-shaped error payload.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Set of filenames claimed in one destination directory.
#[derive(Debug, Default)]
pub struct NamingLedger {
    claimed: Mutex<HashSet<String>>,
}

impl NamingLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger seeded with the entries already present in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn scan_dir(dir: &Path) -> io::Result<Self> {
        let mut claimed = HashSet::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if let Ok(name) = entry.file_name().into_string() {
                claimed.insert(name);
            }
        }
        Ok(Self {
            claimed: Mutex::new(claimed),
        })
    }

    /// Reserves a collision-free filename derived from `candidate`.
    ///
    /// Returns `candidate` unchanged when it is unclaimed; otherwise probes
    /// `stem-1.ext`, `stem-2.ext`, … in increasing order and reserves the
    /// first free variant. The probe and the reservation happen under one
    /// lock acquisition.
    #[must_use = "the reserved name may differ from the candidate"]
    pub fn reserve(&self, candidate: &str) -> String {
        let mut claimed = self
            .claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if claimed.insert(candidate.to_string()) {
            return candidate.to_string();
        }

        let (stem, ext) = split_stem(candidate);
        for counter in 1usize.. {
            let variant = format!("{stem}-{counter}{ext}");
            if claimed.insert(variant.clone()) {
                return variant;
            }
        }
        unreachable!("suffix probing exhausted usize")
    }

    /// Returns true when `name` is already claimed.
    #[must_use]
    pub fn is_claimed(&self, name: &str) -> bool {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Number of claimed names (pre-existing files plus reservations).
    #[must_use]
    pub fn len(&self) -> usize {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true when nothing is claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits a filename into stem and extension (extension keeps the dot).
fn split_stem(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    }
}
