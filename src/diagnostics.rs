//! Diagnostics record embedded in the output package.
//!
//! A small JSON document recording where and when the EPUB was rebuilt,
//! written beside the package document and registered in the manifest.
//! It is never referenced from the spine, so reading devices treat it as
//! an inert resource.

use std::env;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::package::PackageDocument;

/// In-archive location of the record, relative to the package document.
pub const DIAGNOSTICS_HREF: &str = "_diagnostics.json";

const DIAGNOSTICS_ID: &str = "diagnostics";

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsRecord {
    pub build_time: String,
    pub workflow_run_id: String,
    pub git_sha: String,
    pub processor_version: String,
    pub input_file: String,
    pub output_file: String,
    pub raw_size_bytes: u64,
    pub processing_time_ms: u64,
    pub article_count: usize,
    pub sections_found: Vec<String>,
    pub debug_mode: bool,
}

impl DiagnosticsRecord {
    /// Build a record for the current run. Provenance identifiers come
    /// from the calling environment (`WORKFLOW_RUN_ID`, `GIT_SHA`) with
    /// sentinel defaults when absent.
    pub fn collect(
        input: &Path,
        output: &Path,
        raw_size_bytes: u64,
        processing_time_ms: u64,
        article_count: usize,
        debug_mode: bool,
    ) -> Self {
        Self {
            build_time: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            workflow_run_id: env::var("WORKFLOW_RUN_ID").unwrap_or_else(|_| "local".into()),
            git_sha: env::var("GIT_SHA").unwrap_or_else(|_| "unknown".into()),
            processor_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: file_name(input),
            output_file: file_name(output),
            raw_size_bytes,
            processing_time_ms,
            article_count,
            sections_found: Vec::new(),
            debug_mode,
        }
    }
}

/// Write the record beside the package document and register it in the
/// manifest.
pub fn embed(record: &DiagnosticsRecord, package: &mut PackageDocument) -> Result<()> {
    let path = package.dir().join(DIAGNOSTICS_HREF);
    fs::write(&path, serde_json::to_vec_pretty(record)?)?;
    package.register_item(DIAGNOSTICS_ID, DIAGNOSTICS_HREF, "application/json");
    debug!(path = %path.display(), "embedded diagnostics record");
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
