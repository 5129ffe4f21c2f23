//! EPUB container extraction and packaging.
//!
//! An EPUB is a ZIP archive whose first entry must be an uncompressed
//! `mimetype` file containing exactly `application/epub+zip`. Extraction
//! materializes the archive into a scoped temporary directory; packaging
//! re-emits the directory with the mimetype-first layout restored.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result, Warning};

/// Required content of the `mimetype` entry.
pub const MIMETYPE: &str = "application/epub+zip";

/// Smallest plausible EPUB. Anything under this is empty or truncated.
pub const MIN_EPUB_SIZE: u64 = 1000;

/// A scoped working extraction of an EPUB container.
///
/// The backing directory is removed when the workspace is dropped, on
/// every exit path.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Extract an EPUB into a scoped temporary directory.
///
/// Fails with [`Error::InvalidInput`] when the path does not exist, does
/// not carry an `.epub` extension, is smaller than [`MIN_EPUB_SIZE`], or
/// is not a readable ZIP archive. A missing `mimetype` entry is reported
/// as a warning, not an error.
pub fn extract(input: &Path) -> Result<(Workspace, Vec<Warning>)> {
    let invalid = |reason: String| Error::InvalidInput {
        path: input.to_path_buf(),
        reason,
    };

    if !input.exists() {
        return Err(invalid("file not found".into()));
    }

    let is_epub = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("epub"));
    if !is_epub {
        return Err(invalid("not an .epub file".into()));
    }

    let size = fs::metadata(input)?.len();
    if size < MIN_EPUB_SIZE {
        return Err(invalid(format!(
            "file is too small ({size} bytes), possibly empty or corrupt"
        )));
    }
    debug!(size, "validated input container");

    let file = fs::File::open(input)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| invalid(format!("not a valid ZIP archive: {e}")))?;

    let mut warnings = Vec::new();
    if archive.by_name("mimetype").is_err() {
        warn!("container has no mimetype entry, may be malformed");
        warnings.push(Warning::MissingMimetype);
    }

    let dir = TempDir::new().map_err(|e| Error::ContainerIo {
        context: "creating working directory".into(),
        source: e,
    })?;
    archive.extract(dir.path()).map_err(|e| Error::ContainerIo {
        context: format!("extracting {}", input.display()),
        source: std::io::Error::other(e),
    })?;

    info!(entries = archive.len(), "extracted container");
    Ok((Workspace { dir }, warnings))
}

/// Package a directory tree as an EPUB at `output`, returning the number
/// of bytes written.
///
/// The `mimetype` entry is written first and uncompressed; every other
/// file follows deflated, with its path relative to `source_dir` as the
/// entry name. The archive is assembled in a sibling temp file and
/// renamed into place, so a failure never leaves a partial file at the
/// final path. An existing file at `output` is replaced.
pub fn pack(source_dir: &Path, output: &Path) -> Result<u64> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::ContainerIo {
        context: format!("creating output directory {}", parent.display()),
        source: e,
    })?;

    let staging = NamedTempFile::new_in(parent).map_err(|e| Error::ContainerIo {
        context: "creating staging file".into(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(staging);

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // mimetype must be the first entry and uncompressed
    zip.start_file("mimetype", stored)?;
    let mimetype_path = source_dir.join("mimetype");
    if mimetype_path.exists() {
        zip.write_all(&fs::read(&mimetype_path)?)?;
    } else {
        zip.write_all(MIMETYPE.as_bytes())?;
    }

    let mut entries = Vec::new();
    collect_entries(source_dir, "", &mut entries)?;
    entries.sort();

    let mut file_count = 1usize;
    for (name, path) in &entries {
        if name == "mimetype" {
            continue;
        }
        zip.start_file(name.as_str(), deflated)?;
        zip.write_all(&fs::read(path)?)?;
        file_count += 1;
    }

    let staging = zip.finish()?;
    staging.persist(output).map_err(|e| Error::ContainerIo {
        context: format!("replacing {}", output.display()),
        source: e.error,
    })?;

    let written = fs::metadata(output)?.len();
    info!(files = file_count, bytes = written, "packed container");
    Ok(written)
}

fn collect_entries(dir: &Path, prefix: &str, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let rel = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        if path.is_dir() {
            collect_entries(&path, &rel, out)?;
        } else {
            out.push((rel, path));
        }
    }
    Ok(())
}
