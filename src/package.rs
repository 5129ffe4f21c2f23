//! OPF package document model.
//!
//! The package document declares the manifest (every content file, indexed
//! by item id) and the spine (linear reading order, a sequence of manifest
//! id references). This module parses the document into an id-indexed
//! model, lets the pipeline trim the spine and prune manifest items, and
//! re-serializes by streaming the original XML events back out — so the
//! default OPF namespace and the `dc:` prefix survive byte-for-byte.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::{Error, Result};

/// A manifest entry: where the file lives (relative to the package
/// document's directory) and what it is.
#[derive(Debug, Clone)]
pub struct ManifestItem {
    pub href: String,
    pub media_type: String,
}

/// In-memory model of one OPF package document.
///
/// Owned exclusively by the pipeline for the duration of a run; mutated
/// in place by spine trimming, media stripping, and item registration.
#[derive(Debug)]
pub struct PackageDocument {
    path: PathBuf,
    raw: String,
    manifest: HashMap<String, ManifestItem>,
    spine: Vec<String>,
    removed: HashSet<String>,
    appended: Vec<(String, String, String)>,
    spine_skip: usize,
}

/// Locate the package document under an extraction root.
pub fn find_opf(root: &Path) -> Result<PathBuf> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        let mut entries: Vec<_> = fs::read_dir(dir)?.flatten().map(|e| e.path()).collect();
        entries.sort();
        for path in entries {
            if path.is_dir() {
                walk(&path, out)?;
            } else if path.extension().and_then(|e| e.to_str()) == Some("opf") {
                out.push(path);
            }
        }
        Ok(())
    }

    let mut found = Vec::new();
    walk(root, &mut found)?;
    found
        .into_iter()
        .next()
        .ok_or_else(|| Error::MalformedPackage("no .opf file found in container".into()))
}

impl PackageDocument {
    /// Parse the package document at `opf_path`.
    ///
    /// Fails with [`Error::MalformedPackage`] when the document has no
    /// manifest or no spine element, or when a spine reference does not
    /// resolve in the manifest.
    pub fn parse(opf_path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(opf_path)?;

        let mut reader = Reader::from_str(&raw);
        reader.config_mut().trim_text(true);

        let mut manifest: HashMap<String, ManifestItem> = HashMap::new();
        let mut spine: Vec<String> = Vec::new();
        let mut manifest_seen = false;
        let mut spine_seen = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"manifest" => manifest_seen = true,
                        b"spine" => spine_seen = true,
                        b"item" => {
                            let id = attr_value(&e, b"id");
                            let href = attr_value(&e, b"href");
                            let media_type = attr_value(&e, b"media-type");
                            if let (Some(id), Some(href)) = (id, href) {
                                manifest.insert(
                                    id,
                                    ManifestItem {
                                        href,
                                        media_type: media_type.unwrap_or_default(),
                                    },
                                );
                            }
                        }
                        b"itemref" => {
                            if let Some(idref) = attr_value(&e, b"idref") {
                                spine.push(idref);
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(e)),
                _ => {}
            }
        }

        if !manifest_seen {
            return Err(Error::MalformedPackage("no manifest element".into()));
        }
        if !spine_seen {
            return Err(Error::MalformedPackage("no spine element".into()));
        }
        for idref in &spine {
            if !manifest.contains_key(idref) {
                return Err(Error::MalformedPackage(format!(
                    "spine entry '{idref}' does not resolve in the manifest"
                )));
            }
        }

        debug!(
            items = manifest.len(),
            spine = spine.len(),
            "parsed package document"
        );
        Ok(Self {
            path: opf_path.to_path_buf(),
            raw,
            manifest,
            spine,
            removed: HashSet::new(),
            appended: Vec::new(),
            spine_skip: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the package document lives in; manifest hrefs are
    /// relative to it.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Spine idrefs in reading order, after any trimming.
    pub fn spine(&self) -> &[String] {
        &self.spine
    }

    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.get(id)
    }

    /// Live manifest entries (removed items excluded, registered items
    /// included).
    pub fn manifest_items(&self) -> impl Iterator<Item = (&str, &ManifestItem)> {
        self.manifest.iter().map(|(id, item)| (id.as_str(), item))
    }

    pub fn has_href(&self, href: &str) -> bool {
        self.manifest.values().any(|item| item.href == href)
    }

    /// Remove up to `n` leading spine entries, returning how many were
    /// actually removed. The corresponding manifest items are retained:
    /// trimmed documents may still be linked from navigation.
    pub fn trim_spine(&mut self, n: usize) -> usize {
        let removed = n.min(self.spine.len());
        for idref in self.spine.drain(..removed) {
            debug!(idref, "trimmed spine entry");
        }
        self.spine_skip += removed;
        removed
    }

    /// Remove a manifest item by id. Returns false when no such live
    /// item exists.
    pub fn remove_item(&mut self, id: &str) -> bool {
        if self.manifest.remove(id).is_some() {
            self.removed.insert(id.to_string());
            true
        } else {
            false
        }
    }

    /// Register a new manifest item, serialized just before the closing
    /// manifest tag. Returns false when the id is already taken.
    pub fn register_item(&mut self, id: &str, href: &str, media_type: &str) -> bool {
        if self.manifest.contains_key(id) {
            return false;
        }
        self.manifest.insert(
            id.to_string(),
            ManifestItem {
                href: href.to_string(),
                media_type: media_type.to_string(),
            },
        );
        self.appended
            .push((id.to_string(), href.to_string(), media_type.to_string()));
        true
    }

    /// Serialize the package document: the original event stream with
    /// removed items and trimmed itemrefs filtered out and registered
    /// items inserted. Namespace declarations pass through untouched.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut reader = Reader::from_str(&self.raw);
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        let mut first = true;
        let mut skip_depth = 0usize;
        let mut itemrefs_seen = 0usize;

        loop {
            let ev = match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(ev) => ev,
                Err(e) => return Err(Error::Xml(e)),
            };

            if first {
                first = false;
                if !matches!(&ev, Event::Decl(_)) {
                    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
                }
            }

            if skip_depth > 0 {
                match ev {
                    Event::Start(_) => skip_depth += 1,
                    Event::End(_) => skip_depth -= 1,
                    _ => {}
                }
                continue;
            }

            match &ev {
                Event::Empty(e) | Event::Start(e)
                    if local_name(e.name().as_ref()) == b"item"
                        && attr_value(e, b"id").is_some_and(|id| self.removed.contains(&id)) =>
                {
                    if matches!(&ev, Event::Start(_)) {
                        skip_depth = 1;
                    }
                    continue;
                }
                Event::Empty(e) | Event::Start(e)
                    if local_name(e.name().as_ref()) == b"itemref" =>
                {
                    itemrefs_seen += 1;
                    if itemrefs_seen <= self.spine_skip {
                        if matches!(&ev, Event::Start(_)) {
                            skip_depth = 1;
                        }
                        continue;
                    }
                }
                Event::Empty(e) if local_name(e.name().as_ref()) == b"manifest" => {
                    // Degenerate self-closed manifest: expand so that
                    // registered items have somewhere to live.
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    writer.write_event(Event::Start(e.clone().into_owned()))?;
                    self.write_appended(&mut writer)?;
                    writer.write_event(Event::End(BytesEnd::new(name)))?;
                    continue;
                }
                Event::End(e) if local_name(e.name().as_ref()) == b"manifest" => {
                    self.write_appended(&mut writer)?;
                }
                _ => {}
            }

            writer.write_event(ev)?;
        }

        Ok(writer.into_inner().into_inner())
    }

    fn write_appended(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<()> {
        for (id, href, media_type) in &self.appended {
            if self.removed.contains(id) {
                continue;
            }
            let mut item = BytesStart::new("item");
            item.push_attribute(("id", id.as_str()));
            item.push_attribute(("href", href.as_str()));
            item.push_attribute(("media-type", media_type.as_str()));
            writer.write_event(Event::Empty(item))?;
        }
        Ok(())
    }

    /// Write the serialized document back to its on-disk path.
    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, self.serialize()?)?;
        Ok(())
    }
}

/// Extract local name from a potentially namespaced XML name.
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| String::from_utf8(attr.value.to_vec()).ok())
}
