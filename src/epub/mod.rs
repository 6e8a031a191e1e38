/*!
 * EPUB container handling.
 *
 * - `archive`: zip codec preserving per-entry compression and order
 * - `package`: container and package document loading
 * - `document`: parsed XHTML sections, text extraction and write-back
 * - `paths`: spine href → archive path resolution
 */

pub mod archive;
pub mod document;
pub mod package;
pub mod paths;

// Re-export main types
pub use archive::{Archive, ArchiveEntry, OutputArchive};
pub use document::{TextUnit, XhtmlDocument};
pub use package::{DocumentLoader, EpubLoader, Publication, Section};
pub use paths::{PathStrategy, resolve_section_path};
