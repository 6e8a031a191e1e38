/*!
 * Output archive assembly.
 *
 * Section documents are overwritten during the run; this module applies the
 * last metadata change (the translated title) and encodes the final zip.
 */

use log::debug;
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use regex::{Captures, Regex};

use crate::epub::archive::OutputArchive;
use crate::errors::EpubError;

/// Media type of the produced archive
pub const EPUB_MEDIA_TYPE: &str = "application/epub+zip";

static TITLE_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(<dc:title[^>]*>)(.*?)(</dc:title>)").unwrap());

/// Archive path of the package document, found by naming convention
pub fn find_package_path(output: &OutputArchive) -> Option<String> {
    output
        .paths()
        .find(|path| path.ends_with(".opf") || path.contains("content.opf"))
        .map(str::to_string)
}

/// Replace the content of the first `<dc:title>` with `title`.
///
/// Returns the patched path, or `None` when there is no package document or
/// it declares no title element.
pub fn patch_package_title(output: &mut OutputArchive, title: &str) -> Result<Option<String>, EpubError> {
    let Some(path) = find_package_path(output) else {
        return Ok(None);
    };
    let data = output
        .get(&path)
        .ok_or_else(|| EpubError::MissingEntry(path.clone()))?;
    let package = String::from_utf8(data.to_vec()).map_err(|_| EpubError::InvalidEncoding(path.clone()))?;

    if !TITLE_ELEMENT.is_match(&package) {
        return Ok(None);
    }
    let escaped = escape(title);
    let patched = TITLE_ELEMENT.replacen(&package, 1, |caps: &Captures| {
        format!("{}{}{}", &caps[1], escaped, &caps[3])
    });

    output.overwrite(&path, patched.into_owned())?;
    debug!("Patched title in {}", path);
    Ok(Some(path))
}

/// Encode the output archive off the async runtime
pub async fn rebuild(output: OutputArchive) -> Result<Vec<u8>, EpubError> {
    tokio::task::spawn_blocking(move || output.into_bytes())
        .await
        .map_err(|e| EpubError::Task(e.to_string()))?
}
