/*!
 * Section path resolution.
 *
 * Spine hrefs are relative to the package document while archive paths are
 * relative to the container root, and real-world books disagree on how the
 * two relate. Resolution tries a fixed list of strategies in order and
 * returns the first archive path that exists.
 */

use log::debug;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::epub::package::Section;

/// Conventional content roots
const OEBPS_ROOT: &str = "OEBPS/";
const OPS_ROOT: &str = "OPS/";

/// Ordered path-guessing strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStrategy {
    /// The href as declared
    Verbatim,
    /// `OEBPS/` + href
    OebpsPrefix,
    /// `OPS/` + href
    OpsPrefix,
    /// The resolved URL without scheme and host
    UrlPath,
    /// File name of the URL matched against XHTML/HTML paths
    MarkupFilename,
    /// File name of the href matched against every path
    AnyFilename,
}

impl PathStrategy {
    /// Precedence order; never reordered
    pub const ORDER: [PathStrategy; 6] = [
        PathStrategy::Verbatim,
        PathStrategy::OebpsPrefix,
        PathStrategy::OpsPrefix,
        PathStrategy::UrlPath,
        PathStrategy::MarkupFilename,
        PathStrategy::AnyFilename,
    ];

    fn resolve<'a>(self, section: &Section, paths: &[&'a str]) -> Option<&'a str> {
        let exact = |candidate: &str| paths.iter().copied().find(|path| *path == candidate);

        match self {
            Self::Verbatim => exact(&section.href),
            Self::OebpsPrefix => exact(&format!("{}{}", OEBPS_ROOT, section.href)),
            Self::OpsPrefix => exact(&format!("{}{}", OPS_ROOT, section.href)),
            Self::UrlPath => section.url.as_deref().and_then(|url| exact(&url_to_archive_path(url))),
            Self::MarkupFilename => {
                let url = section.url.as_deref()?;
                let name = file_name(&url_to_archive_path(url))?.to_string();
                paths
                    .iter()
                    .copied()
                    .filter(|path| is_markup(path))
                    .find(|path| ends_with_file(path, &name))
            }
            Self::AnyFilename => {
                let name = file_name(&section.href)?;
                paths.iter().copied().find(|path| ends_with_file(path, name))
            }
        }
    }
}

/// Locate the archive path holding a section.
///
/// Returns the matching path and the strategy that found it, or `None` when
/// no strategy matches.
pub fn resolve_section_path<'a>(section: &Section, paths: &[&'a str]) -> Option<(&'a str, PathStrategy)> {
    let found = PathStrategy::ORDER
        .iter()
        .find_map(|strategy| strategy.resolve(section, paths).map(|path| (path, *strategy)));

    if let Some((path, strategy)) = found {
        debug!("Resolved section {} to {} via {:?}", section.href, path, strategy);
    }
    found
}

/// Convert a resolved section URL into an archive path.
///
/// Scheme and host are dropped, leading slashes removed and percent-escapes
/// decoded. Strings that are not URLs only lose a `scheme://` prefix.
pub fn url_to_archive_path(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => match url.split_once("://") {
            Some((_, rest)) => rest.to_string(),
            None => url.to_string(),
        },
    };

    percent_decode_str(path.trim_start_matches('/'))
        .decode_utf8_lossy()
        .into_owned()
}

fn file_name(path: &str) -> Option<&str> {
    let path = path.split(['#', '?']).next().unwrap_or(path);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Whole-component suffix match: `ch1.xhtml` matches `OEBPS/ch1.xhtml` but not `xch1.xhtml`
fn ends_with_file(path: &str, name: &str) -> bool {
    path == name
        || path
            .strip_suffix(name)
            .is_some_and(|prefix| prefix.ends_with('/'))
}

fn is_markup(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".xhtml") || lower.ends_with(".html")
}
