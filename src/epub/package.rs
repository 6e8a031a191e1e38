/*!
 * Package document loading.
 *
 * Reads `META-INF/container.xml` to find the package document, then the
 * package document itself for the title, the manifest and the spine.
 */

use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use url::Url;

use crate::epub::archive::Archive;
use crate::epub::document::XhtmlDocument;
use crate::epub::paths::{resolve_section_path, url_to_archive_path};
use crate::errors::EpubError;

/// Location of the container descriptor
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Base URL sections are resolved against
const ARCHIVE_ROOT_URL: &str = "epub:///";

/// One spine entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Manifest href, relative to the package document
    pub href: String,
    /// Absolute `epub:///` URL of the section when it could be resolved
    pub url: Option<String>,
    /// Declared media type
    pub media_type: String,
}

/// Publication metadata and reading order
#[derive(Debug, Clone)]
pub struct Publication {
    /// First `dc:title`, if any
    pub title: Option<String>,
    /// Spine sections in reading order
    pub sections: Vec<Section>,
    /// Archive path of the package document
    pub package_path: String,
}

/// Document-loading collaborator
pub trait DocumentLoader: Send + Sync {
    /// Read the publication metadata and spine
    fn open(&self, archive: &Archive) -> Result<Publication, EpubError>;

    /// Parse one section
    fn load_section(&self, archive: &Archive, section: &Section) -> Result<XhtmlDocument, EpubError>;
}

/// Loader for OPF-based EPUB 2 and EPUB 3 publications
#[derive(Debug, Default, Clone, Copy)]
pub struct EpubLoader;

impl DocumentLoader for EpubLoader {
    fn open(&self, archive: &Archive) -> Result<Publication, EpubError> {
        let container = archive
            .read_string(CONTAINER_PATH)
            .map_err(|_| EpubError::MissingPackage)?;
        let package_path = find_rootfile(&container)?.ok_or(EpubError::MissingPackage)?;
        let package = archive.read_string(&package_path)?;

        let parsed = parse_package(&package_path, &package)?;
        let base = section_base_url(&package_path)?;

        let mut sections = Vec::with_capacity(parsed.spine.len());
        for idref in &parsed.spine {
            let Some((href, media_type)) = parsed.manifest.get(idref) else {
                warn!("Spine references unknown manifest item {}", idref);
                continue;
            };
            sections.push(Section {
                href: href.clone(),
                url: base.join(href).ok().map(String::from),
                media_type: media_type.clone(),
            });
        }

        debug!(
            "Package {} declares {} spine sections",
            package_path,
            sections.len()
        );
        Ok(Publication {
            title: parsed.title,
            sections,
            package_path,
        })
    }

    fn load_section(&self, archive: &Archive, section: &Section) -> Result<XhtmlDocument, EpubError> {
        let canonical = section.url.as_deref().map(url_to_archive_path);
        let path = match canonical.filter(|path| archive.contains(path)) {
            Some(path) => path,
            None => {
                let paths: Vec<&str> = archive.paths().collect();
                resolve_section_path(section, &paths)
                    .map(|(path, _)| path.to_string())
                    .ok_or_else(|| EpubError::SectionNotFound(section.href.clone()))?
            }
        };

        let source = archive.read_string(&path)?;
        XhtmlDocument::parse(&path, &source)
    }
}

#[derive(Debug, Default)]
struct PackageDocument {
    title: Option<String>,
    /// id → (href, media type)
    manifest: HashMap<String, (String, String)>,
    spine: Vec<String>,
}

fn section_base_url(package_path: &str) -> Result<Url, EpubError> {
    Url::parse(ARCHIVE_ROOT_URL)
        .and_then(|root| root.join(package_path))
        .map_err(|e| EpubError::Malformed {
            path: package_path.to_string(),
            message: e.to_string(),
        })
}

fn malformed(path: &str, reader: &Reader<&[u8]>, error: impl std::fmt::Display) -> EpubError {
    EpubError::Malformed {
        path: path.to_string(),
        message: format!("{} at position {}", error, reader.buffer_position()),
    }
}

fn attribute(path: &str, element: &BytesStart<'_>, name: &str) -> Result<Option<String>, EpubError> {
    let malformed = |error: String| EpubError::Malformed {
        path: path.to_string(),
        message: error,
    };
    match element.try_get_attribute(name).map_err(|e| malformed(e.to_string()))? {
        Some(value) => Ok(Some(
            value
                .unescape_value()
                .map_err(|e| malformed(e.to_string()))?
                .into_owned(),
        )),
        None => Ok(None),
    }
}

/// First rootfile `full-path` declared by the container
fn find_rootfile(container: &str) -> Result<Option<String>, EpubError> {
    let mut reader = Reader::from_str(container);
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element))
                if element.local_name().as_ref() == b"rootfile" =>
            {
                if let Some(path) = attribute(CONTAINER_PATH, &element, "full-path")? {
                    return Ok(Some(path));
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(malformed(CONTAINER_PATH, &reader, e)),
        }
    }
}

fn parse_package(path: &str, source: &str) -> Result<PackageDocument, EpubError> {
    let mut reader = Reader::from_str(source.trim_start_matches('\u{feff}'));
    let mut package = PackageDocument::default();
    let mut in_metadata = false;
    let mut title: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| malformed(path, &reader, e))?;
        match event {
            Event::Start(element) => match element.local_name().as_ref() {
                b"metadata" => in_metadata = true,
                b"title" if in_metadata && package.title.is_none() => title = Some(String::new()),
                b"item" => add_manifest_item(path, &element, &mut package)?,
                b"itemref" => add_spine_item(path, &element, &mut package)?,
                _ => {}
            },
            Event::Empty(element) => match element.local_name().as_ref() {
                b"item" => add_manifest_item(path, &element, &mut package)?,
                b"itemref" => add_spine_item(path, &element, &mut package)?,
                _ => {}
            },
            Event::Text(text) => {
                if let Some(buffer) = title.as_mut() {
                    let value = text
                        .unescape_with(resolve_html5_entity)
                        .map_err(|e| malformed(path, &reader, e))?;
                    buffer.push_str(&value);
                }
            }
            Event::CData(data) => {
                if let Some(buffer) = title.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"metadata" => in_metadata = false,
                b"title" => {
                    if let Some(value) = title.take() {
                        let value = value.trim();
                        if !value.is_empty() {
                            package.title = Some(value.to_string());
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(package)
}

fn add_manifest_item(path: &str, element: &BytesStart<'_>, package: &mut PackageDocument) -> Result<(), EpubError> {
    let id = attribute(path, element, "id")?;
    let href = attribute(path, element, "href")?;
    if let (Some(id), Some(href)) = (id, href) {
        let media_type = attribute(path, element, "media-type")?.unwrap_or_default();
        package.manifest.insert(id, (href, media_type));
    }
    Ok(())
}

fn add_spine_item(path: &str, element: &BytesStart<'_>, package: &mut PackageDocument) -> Result<(), EpubError> {
    if let Some(idref) = attribute(path, element, "idref")? {
        package.spine.push(idref);
    }
    Ok(())
}
