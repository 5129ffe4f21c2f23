//! # inkprep
//!
//! Post-processes EPUBs for resource-limited e-ink reading devices.
//!
//! An upstream generator produces full-featured EPUBs: cover page,
//! section index, images, web-oriented stylesheets, verbose article
//! titles. Small e-ink readers render almost none of that well. This
//! crate rewrites such an EPUB in place-semantics:
//!
//! - drops the leading front-matter pages from the spine
//! - strips raster/vector images (the cover is kept for other readers)
//! - shortens navigation labels to a display budget
//! - optionally swaps in a device-tuned stylesheet
//! - embeds a diagnostics record for debugging builds in the field
//! - re-emits a conformant container (`mimetype` first, uncompressed)
//!
//! ## Quick Start
//!
//! ```no_run
//! use inkprep::{process, ProcessOptions};
//!
//! let report = process(
//!     "daily.epub".as_ref(),
//!     "out/daily-eink.epub".as_ref(),
//!     &ProcessOptions::default(),
//! )?;
//! println!("wrote {} bytes, {} warnings", report.output_bytes, report.warnings.len());
//! # Ok::<(), inkprep::Error>(())
//! ```
//!
//! Title shortening is also available standalone:
//!
//! ```
//! use inkprep::shorten;
//!
//! assert_eq!(shorten("Fed Hikes Rates - Bloomberg Markets Wrap", 50), "Fed Hikes Rates");
//! ```

pub mod container;
pub mod diagnostics;
pub mod error;
pub mod media;
pub mod nav;
pub mod package;
pub mod pipeline;
pub mod title;

pub use error::{Error, Result, Warning};
pub use package::PackageDocument;
pub use pipeline::{ProcessOptions, Report, process};
pub use title::shorten;
