//! Converts MapReduce application names to actual application code.
//!
//! # Example
//!
//! To get the word count application:
//! ```
//! # use anyhow::Result;
//! use mrlocal::workload;
//! # fn main() -> Result<()> {
//! let wc = workload::named("wc")?;
//! assert!(wc.combine_fn.is_some());
//! # Ok(())
//! # }
//! ```

use crate::{ByteWorkload, Workload};
use anyhow::{bail, Result};

pub mod grep;
pub mod tfidf;
pub mod wc;

/// Gets the [`Workload`] named `name`.
///
/// Returns [`None`] if no application with the given name was found.
pub fn try_named(name: &str) -> Option<ByteWorkload> {
    match name {
        "wc" => Some(Workload::new(wc::map, wc::reduce).with_combiner(wc::combine)),
        "grep" => Some(Workload::new(grep::map, grep::reduce)),
        "tfidf" => Some(Workload::new(tfidf::map, tfidf::reduce)),
        _ => None,
    }
}

/// Gets the [`Workload`] named `name`.
///
/// Returns an [`anyhow::Error`] if no application with the given name was found.
pub fn named(name: &str) -> Result<ByteWorkload> {
    match try_named(name) {
        Some(app) => Ok(app),
        None => bail!("No app named `{}` found.", name),
    }
}

/// Arguments a runner appends for `name` on top of the user's, given the
/// number of input records.
pub fn implied_args(name: &str, num_records: usize) -> Vec<String> {
    match name {
        "tfidf" => vec![format!("--total-docs={}", num_records)],
        _ => Vec::new(),
    }
}
