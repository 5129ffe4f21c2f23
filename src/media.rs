//! Media stripping for devices that render no images.
//!
//! Removes raster and vector image files from the working tree, prunes
//! their manifest entries, and elides inline image references from the
//! content documents. The cover image is exempt: the target device will
//! not render it, but other readers opening the same file do.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Result, Warning};
use crate::package::PackageDocument;

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "svg", "webp"];

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid regex"));
static EMPTY_FIGURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<figure\b[^>]*>\s*</figure>").expect("valid regex"));
static EMPTY_IMG_CONTAINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div\b[^>]*class="[^"]*img[^"]*"[^>]*>\s*</div>"#).expect("valid regex")
});

/// What one stripping pass did.
#[derive(Debug, Default)]
pub struct StripReport {
    pub files_removed: usize,
    pub manifest_removed: usize,
    pub documents_rewritten: usize,
    pub warnings: Vec<Warning>,
}

/// Strip images from the working tree and the manifest.
///
/// A file is an image when its extension is in the raster/vector set; it
/// is spared when its name contains `cover` (case-insensitive). Deletion
/// failures are warnings, and markup rewriting still runs for files that
/// could not be deleted. Running the stripper twice removes nothing new.
pub fn strip_images(root: &Path, package: &mut PackageDocument) -> Result<StripReport> {
    let mut report = StripReport::default();

    let mut files = Vec::new();
    collect_files(root, &mut files)?;

    for path in &files {
        if !has_image_extension(path) || names_cover(path) {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed image");
                report.files_removed += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove image");
                report.warnings.push(Warning::ImageNotDeleted {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let doomed: Vec<String> = package
        .manifest_items()
        .filter(|(_, item)| {
            item.media_type.starts_with("image/")
                && !item.href.to_ascii_lowercase().contains("cover")
        })
        .map(|(id, _)| id.to_string())
        .collect();
    for id in &doomed {
        package.remove_item(id);
    }
    report.manifest_removed = doomed.len();

    for path in &files {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if !matches!(ext.as_deref(), Some("html") | Some("xhtml")) {
            continue;
        }
        match strip_markup_references(path) {
            Ok(true) => report.documents_rewritten += 1,
            Ok(false) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to rewrite markup"),
        }
    }

    Ok(report)
}

/// Remove image references from one content document. Returns whether
/// the file was rewritten.
fn strip_markup_references(path: &Path) -> std::io::Result<bool> {
    let content = fs::read_to_string(path)?;
    let pass = IMG_TAG.replace_all(&content, "");
    let pass = EMPTY_FIGURE.replace_all(&pass, "");
    let pass = EMPTY_IMG_CONTAINER.replace_all(&pass, "");
    if pass == content {
        return Ok(false);
    }
    fs::write(path, pass.as_bytes())?;
    Ok(true)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn names_cover(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase().contains("cover"))
        .unwrap_or(false)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
