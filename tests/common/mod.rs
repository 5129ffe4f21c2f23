//! Shared test fixtures: synthetic EPUBs assembled with the zip crate,
//! no binary fixture files.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Body filler so fixture containers clear the minimum plausible EPUB
/// size. Stored uncompressed when packed below.
pub const FILLER: &str = "The quick brown fox jumps over the lazy dog while markets \
digest another round of policy surprises, freight rates wobble, and readers wait \
for tomorrow's edition to land on devices that render two shades of gray at best.";

pub struct FixtureEpub {
    /// (manifest id, navigation title); href becomes `<id>.xhtml`.
    pub pages: Vec<(&'static str, &'static str)>,
    /// File names under `OEBPS/images/`.
    pub images: Vec<&'static str>,
    pub with_ncx: bool,
    pub with_nav: bool,
    /// Replaces the generated NCX body verbatim when set.
    pub ncx_override: Option<&'static str>,
}

impl FixtureEpub {
    /// The upstream generator's canonical shape: cover page, section
    /// index, three articles, a cover image and one content image.
    pub fn standard() -> Self {
        Self {
            pages: vec![
                ("cover", "Cover"),
                ("index", "Index"),
                ("article1", "Fed Hikes Rates - Bloomberg Markets Wrap"),
                ("article2", "Short Title"),
                (
                    "article3",
                    "A Very Long Article Title That Exceeds The Fifty Character Limit For Display",
                ),
            ],
            images: vec!["cover.jpg", "photo.jpg"],
            with_ncx: true,
            with_nav: false,
            ncx_override: None,
        }
    }

    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let file = fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);

        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("META-INF/container.xml", stored).unwrap();
        zip.write_all(CONTAINER_XML.as_bytes()).unwrap();

        zip.start_file("OEBPS/content.opf", stored).unwrap();
        zip.write_all(self.opf().as_bytes()).unwrap();

        if self.with_ncx {
            zip.start_file("OEBPS/toc.ncx", stored).unwrap();
            match self.ncx_override {
                Some(body) => zip.write_all(body.as_bytes()).unwrap(),
                None => zip.write_all(self.ncx().as_bytes()).unwrap(),
            }
        }
        if self.with_nav {
            zip.start_file("OEBPS/nav.xhtml", stored).unwrap();
            zip.write_all(self.nav().as_bytes()).unwrap();
        }

        for (id, title) in &self.pages {
            zip.start_file(format!("OEBPS/{id}.xhtml"), stored).unwrap();
            zip.write_all(page_xhtml(title).as_bytes()).unwrap();
        }
        for name in &self.images {
            zip.start_file(format!("OEBPS/images/{name}"), stored).unwrap();
            zip.write_all(b"not a real image, nobody decodes it").unwrap();
        }

        zip.finish().unwrap();
    }

    fn opf(&self) -> String {
        let mut manifest = String::new();
        for (id, _) in &self.pages {
            manifest.push_str(&format!(
                "    <item id=\"{id}\" href=\"{id}.xhtml\" media-type=\"application/xhtml+xml\"/>\n"
            ));
        }
        for (i, name) in self.images.iter().enumerate() {
            let media_type = match name.rsplit('.').next() {
                Some("svg") => "image/svg+xml",
                Some("png") => "image/png",
                _ => "image/jpeg",
            };
            manifest.push_str(&format!(
                "    <item id=\"img{i}\" href=\"images/{name}\" media-type=\"{media_type}\"/>\n"
            ));
        }
        if self.with_ncx {
            manifest.push_str(
                "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
            );
        }
        if self.with_nav {
            manifest.push_str(
                "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
            );
        }

        let mut spine = String::new();
        for (id, _) in &self.pages {
            spine.push_str(&format!("    <itemref idref=\"{id}\"/>\n"));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Daily Digest</dc:title>
    <dc:identifier id="BookId">urn:uuid:00000000-0000-0000-0000-000000000000</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#
        )
    }

    fn ncx(&self) -> String {
        let mut nav_points = String::new();
        for (i, (id, title)) in self.pages.iter().enumerate() {
            let order = i + 1;
            nav_points.push_str(&format!(
                r#"    <navPoint id="navpoint-{order}" playOrder="{order}">
      <navLabel><text>{title}</text></navLabel>
      <content src="{id}.xhtml"/>
    </navPoint>
"#
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="urn:uuid:00000000-0000-0000-0000-000000000000"/>
    <meta name="dtb:depth" content="1"/>
  </head>
  <docTitle><text>Daily Digest</text></docTitle>
  <navMap>
{nav_points}  </navMap>
</ncx>
"#
        )
    }

    fn nav(&self) -> String {
        let mut items = String::new();
        for (id, title) in &self.pages {
            items.push_str(&format!("      <li><a href=\"{id}.xhtml\">{title}</a></li>\n"));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Daily Digest</title></head>
<body>
  <nav epub:type="toc">
    <ol>
{items}    </ol>
  </nav>
</body>
</html>
"#
        )
    }
}

fn page_xhtml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{title}</title></head>
<body>
<h1>{title}</h1>
<figure class="lede"><img src="images/photo.jpg" alt=""/></figure>
<p>{FILLER}</p>
</body>
</html>
"#
    )
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// List archive entry names in order.
pub fn zip_entry_names(path: &Path) -> Vec<String> {
    let file = fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Read one archive entry as a string.
pub fn zip_entry_string(path: &Path, name: &str) -> String {
    use std::io::Read;
    let file = fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut out = String::new();
    entry.read_to_string(&mut out).unwrap();
    out
}
