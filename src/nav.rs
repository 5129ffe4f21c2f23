//! Navigation document rewriting.
//!
//! Both navigation dialects carry human-readable labels: NCX documents in
//! `navLabel/text` nodes, XHTML nav documents as the inline text of
//! anchor elements. Each rewriter streams the document's XML events back
//! out unchanged except for the label text, so hierarchy, hrefs, and
//! ordering survive untouched. The two run independently; the pipeline
//! invokes whichever documents are present.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::{Error, Result};

/// Signature shared by the two navigation rewriters, so the pipeline can
/// drive them uniformly.
pub type Rewriter = fn(&Path, &dyn Fn(&str) -> String) -> Result<usize>;

/// Label content collected between an opening and closing tag.
///
/// Text and entity references accumulate into a rewritable string; any
/// nested markup marks the label opaque, and the original events are
/// replayed verbatim instead.
#[derive(Default)]
struct Capture {
    text: String,
    events: Vec<Event<'static>>,
    opaque: bool,
}

impl Capture {
    fn push(&mut self, ev: Event<'_>) {
        match &ev {
            Event::Text(e) => self.text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                let resolved = match entity.as_ref() {
                    "apos" => "'",
                    "quot" => "\"",
                    "lt" => "<",
                    "gt" => ">",
                    "amp" => "&",
                    _ => "",
                };
                self.text.push_str(resolved);
            }
            Event::Comment(_) => {}
            _ => self.opaque = true,
        }
        self.events.push(ev.into_owned());
    }
}

/// Rewrite every `navLabel` text node in an NCX document, in place.
///
/// Returns the number of labels whose text changed. The document is not
/// rewritten on disk when nothing changed.
pub fn rewrite_ncx(path: &Path, rewrite: &dyn Fn(&str) -> String) -> Result<usize> {
    let raw = fs::read_to_string(path)?;

    let mut reader = Reader::from_str(&raw);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut in_nav_label = false;
    let mut capture: Option<Capture> = None;
    let mut changed = 0usize;

    loop {
        let ev = match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(ev) => ev,
            Err(e) => return Err(Error::Xml(e)),
        };

        if capture.is_some() {
            if matches!(&ev, Event::End(e) if local_name(e.name().as_ref()) == b"text") {
                let cap = capture.take().unwrap_or_default();
                changed += flush_label(&mut writer, cap, rewrite)?;
                writer.write_event(ev)?;
            } else if let Some(cap) = capture.as_mut() {
                cap.push(ev);
            }
            continue;
        }

        match &ev {
            Event::Start(e) if local_name(e.name().as_ref()) == b"navLabel" => {
                in_nav_label = true;
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"navLabel" => {
                in_nav_label = false;
            }
            Event::Start(e) if in_nav_label && local_name(e.name().as_ref()) == b"text" => {
                writer.write_event(ev)?;
                capture = Some(Capture::default());
                continue;
            }
            _ => {}
        }
        writer.write_event(ev)?;
    }

    if changed > 0 {
        fs::write(path, writer.into_inner().into_inner())?;
    }
    debug!(path = %path.display(), changed, "rewrote NCX labels");
    Ok(changed)
}

/// Rewrite the inline text of simple anchors in an XHTML nav document,
/// in place.
///
/// Anchors containing nested markup are replayed verbatim; only pure
/// text labels are rewritten. Returns the number of labels changed.
pub fn rewrite_nav_xhtml(path: &Path, rewrite: &dyn Fn(&str) -> String) -> Result<usize> {
    let raw = fs::read_to_string(path)?;

    let mut reader = Reader::from_str(&raw);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut capture: Option<Capture> = None;
    let mut changed = 0usize;

    loop {
        let ev = match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(ev) => ev,
            Err(e) => return Err(Error::Xml(e)),
        };

        if capture.is_some() {
            if matches!(&ev, Event::End(e) if local_name(e.name().as_ref()) == b"a") {
                let cap = capture.take().unwrap_or_default();
                changed += flush_label(&mut writer, cap, rewrite)?;
                writer.write_event(ev)?;
            } else if let Some(cap) = capture.as_mut() {
                cap.push(ev);
            }
            continue;
        }

        if matches!(&ev, Event::Start(e) if local_name(e.name().as_ref()) == b"a") {
            writer.write_event(ev)?;
            capture = Some(Capture::default());
            continue;
        }
        writer.write_event(ev)?;
    }

    if changed > 0 {
        fs::write(path, writer.into_inner().into_inner())?;
    }
    debug!(path = %path.display(), changed, "rewrote nav anchors");
    Ok(changed)
}

/// Emit a captured label: rewritten as a single text node when it held
/// plain text, replayed as-is otherwise. Returns 1 when the text changed.
fn flush_label(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    cap: Capture,
    rewrite: &dyn Fn(&str) -> String,
) -> Result<usize> {
    if cap.opaque || cap.text.is_empty() {
        for ev in cap.events {
            writer.write_event(ev)?;
        }
        return Ok(0);
    }

    let rewritten = rewrite(&cap.text);
    if rewritten == cap.text {
        for ev in cap.events {
            writer.write_event(ev)?;
        }
        Ok(0)
    } else {
        writer.write_event(Event::Text(BytesText::new(&rewritten)))?;
        Ok(1)
    }
}

/// Extract local name from a potentially namespaced XML name.
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <docTitle><text>Daily Digest</text></docTitle>
  <navMap>
    <navPoint id="n1" playOrder="1">
      <navLabel><text>Fed Hikes Rates - Bloomberg Markets Wrap</text></navLabel>
      <content src="article1.xhtml"/>
    </navPoint>
    <navPoint id="n2" playOrder="2">
      <navLabel><text>Short Title</text></navLabel>
      <content src="article2.xhtml"/>
    </navPoint>
  </navMap>
</ncx>
"#;

    fn shorten50(s: &str) -> String {
        crate::title::shorten(s, 50)
    }

    #[test]
    fn ncx_labels_are_rewritten_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("toc.ncx");
        fs::write(&path, NCX).unwrap();

        let changed = rewrite_ncx(&path, &shorten50).unwrap();
        assert_eq!(changed, 1);

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("<text>Fed Hikes Rates</text>"));
        assert!(out.contains("<text>Short Title</text>"));
        // structure untouched
        assert!(out.contains(r#"<content src="article1.xhtml"/>"#));
        assert!(out.contains(r#"playOrder="2""#));
        assert!(out.contains(r#"xmlns="http://www.daisy.org/z3986/2005/ncx/""#));
    }

    #[test]
    fn ncx_doc_title_is_not_a_nav_label() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("toc.ncx");
        let ncx = NCX.replace(
            "Daily Digest",
            "A Doc Title That Is Long Enough To Be Shortened If It Were A Label Somewhere",
        );
        fs::write(&path, &ncx).unwrap();

        rewrite_ncx(&path, &shorten50).unwrap();
        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("A Doc Title That Is Long Enough To Be Shortened If It Were A Label Somewhere"));
    }

    #[test]
    fn ncx_entities_survive_rewriting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("toc.ncx");
        let ncx = NCX.replace(
            "Fed Hikes Rates - Bloomberg Markets Wrap",
            "Don&apos;t Fight the Fed - Bloomberg Markets Wrap",
        );
        fs::write(&path, &ncx).unwrap();

        let changed = rewrite_ncx(&path, &shorten50).unwrap();
        assert_eq!(changed, 1);
        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("Don&apos;t Fight the Fed</text>"));
    }

    #[test]
    fn unchanged_ncx_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("toc.ncx");
        fs::write(&path, NCX.replace("Fed Hikes Rates - Bloomberg Markets Wrap", "Tiny")).unwrap();

        let changed = rewrite_ncx(&path, &shorten50).unwrap();
        assert_eq!(changed, 0);
        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("<text>Tiny</text>"));
    }

    #[test]
    fn nav_xhtml_simple_anchors_are_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nav.xhtml");
        fs::write(
            &path,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<body>
<nav epub:type="toc" xmlns:epub="http://www.idpf.org/2007/ops">
  <ol>
    <li><a href="article1.xhtml">Fed Hikes Rates - Bloomberg Markets Wrap</a></li>
    <li><a href="article2.xhtml"><span>Nested</span> Markup Stays</a></li>
  </ol>
</nav>
</body>
</html>
"#,
        )
        .unwrap();

        let changed = rewrite_nav_xhtml(&path, &shorten50).unwrap();
        assert_eq!(changed, 1);

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains(r#"<a href="article1.xhtml">Fed Hikes Rates</a>"#));
        assert!(out.contains("<span>Nested</span> Markup Stays"));
    }

    #[test]
    fn malformed_ncx_reports_an_error_and_leaves_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("toc.ncx");
        let garbage = "<ncx><navMap><navPoint></navMap>";
        fs::write(&path, garbage).unwrap();

        assert!(rewrite_ncx(&path, &shorten50).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), garbage);
    }
}
