//! Linear processing pipeline.
//!
//! One run owns one EPUB: extract into a scoped working directory, parse
//! the package document, trim the generator's front matter off the spine,
//! strip images, swap the stylesheet, shorten navigation labels, embed
//! the diagnostics record, re-serialize the package document, and repack.
//! Validation, extraction, package parsing, and repacking are fatal;
//! everything else degrades to warnings on the report.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use crate::container::{self, MIN_EPUB_SIZE};
use crate::diagnostics::{self, DiagnosticsRecord};
use crate::error::{Result, Warning};
use crate::media;
use crate::nav;
use crate::package::{self, PackageDocument};
use crate::title::{DEFAULT_MAX_TITLE_LEN, DEFAULT_SOURCE_MARKER, Shortener};

/// In-package name of the replacement stylesheet.
pub const STYLESHEET_HREF: &str = "stylesheet.css";

const NCX_NAME: &str = "toc.ncx";
const NAV_NAME: &str = "nav.xhtml";

/// Settings for one processing run. Owned by the caller; there is no
/// ambient configuration.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Display budget for navigation labels, in characters.
    pub max_title_len: usize,
    /// Leading spine entries the upstream generator always emits (cover
    /// page and section index) that the device should not page through.
    pub front_matter_pages: usize,
    /// Replacement stylesheet copied into the package, when configured.
    pub stylesheet: Option<PathBuf>,
    /// News-source marker stripped from title suffixes.
    pub source_marker: String,
    /// Recorded in the diagnostics record.
    pub debug: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            max_title_len: DEFAULT_MAX_TITLE_LEN,
            front_matter_pages: 2,
            stylesheet: None,
            source_marker: DEFAULT_SOURCE_MARKER.to_string(),
            debug: false,
        }
    }
}

/// Outcome of a successful run. Warnings are accumulated here, never
/// raised as errors.
#[derive(Debug)]
pub struct Report {
    pub output_bytes: u64,
    pub spine_trimmed: usize,
    pub images_removed: usize,
    pub labels_rewritten: usize,
    pub article_count: usize,
    pub warnings: Vec<Warning>,
}

/// Process `input` into a device-ready EPUB at `output`.
///
/// The output's parent directories are created when missing and an
/// existing file at the output path is replaced. On error no file is
/// left at the output path, and the working directory is removed on
/// every exit path.
pub fn process(input: &Path, output: &Path, options: &ProcessOptions) -> Result<Report> {
    let started = Instant::now();
    info!(input = %input.display(), output = %output.display(), "processing EPUB");

    let (workspace, mut warnings) = container::extract(input)?;
    let input_size = fs::metadata(input)?.len();
    let root = workspace.path();

    let opf_path = package::find_opf(root)?;
    let mut package = PackageDocument::parse(&opf_path)?;

    let requested = options.front_matter_pages;
    let article_count = package.spine().len().saturating_sub(requested);
    let spine_trimmed = package.trim_spine(requested);
    if spine_trimmed < requested {
        warn!(requested, removed = spine_trimmed, "spine shorter than trim request");
        warnings.push(Warning::ShortSpine {
            requested,
            removed: spine_trimmed,
        });
    }

    let strip = media::strip_images(root, &mut package)?;
    info!(
        files = strip.files_removed,
        manifest = strip.manifest_removed,
        documents = strip.documents_rewritten,
        "stripped images"
    );
    let images_removed = strip.files_removed;
    warnings.extend(strip.warnings);

    if let Some(css) = &options.stylesheet {
        match fs::read(css) {
            Ok(content) => {
                fs::write(package.dir().join(STYLESHEET_HREF), content)?;
                if !package.has_href(STYLESHEET_HREF) {
                    package.register_item("stylesheet", STYLESHEET_HREF, "text/css");
                }
                info!(path = %css.display(), "replaced stylesheet");
            }
            Err(_) => {
                warn!(path = %css.display(), "replacement stylesheet not found, skipping");
                warnings.push(Warning::StylesheetMissing { path: css.clone() });
            }
        }
    }

    let shortener = Shortener::new(&options.source_marker);
    let max_len = options.max_title_len;
    let rewrite = |title: &str| shortener.shorten(title, max_len);

    let mut labels_rewritten = 0usize;
    let opf_dir = package.dir().to_path_buf();
    let rewriters: [(&str, nav::Rewriter); 2] = [
        (NCX_NAME, nav::rewrite_ncx),
        (NAV_NAME, nav::rewrite_nav_xhtml),
    ];
    for (name, rewriter) in rewriters {
        let path = opf_dir.join(name);
        if !path.exists() {
            continue;
        }
        match rewriter(&path, &rewrite) {
            Ok(changed) => labels_rewritten += changed,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "navigation rewrite failed, continuing");
                warnings.push(Warning::Navigation {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    let record = DiagnosticsRecord::collect(
        input,
        output,
        input_size,
        started.elapsed().as_millis() as u64,
        article_count,
        options.debug,
    );
    diagnostics::embed(&record, &mut package)?;

    package.save()?;

    let output_bytes = container::pack(root, output)?;
    if output_bytes < MIN_EPUB_SIZE {
        warn!(output_bytes, "output is implausibly small");
    }

    info!(
        bytes = output_bytes,
        elapsed_ms = started.elapsed().as_millis() as u64,
        warnings = warnings.len(),
        "processing complete"
    );
    Ok(Report {
        output_bytes,
        spine_trimmed,
        images_removed,
        labels_rewritten,
        article_count,
        warnings,
    })
}
