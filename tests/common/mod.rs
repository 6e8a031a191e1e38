/*!
 * Common test utilities for the epubtl test suite
 */

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Cursor, Write};

use epubtl::app_config::{AiConfiguration, ProviderKind};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Stylesheet shipped with every generated book
pub const STYLESHEET: &str = "p { margin: 0; }\n";

/// Bytes standing in for a cover image
pub const COVER_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 1, 2, 3];

/// Builds small EPUB archives in memory
#[derive(Debug, Clone)]
pub struct EpubBuilder {
    title: Option<String>,
    sections: Vec<Vec<String>>,
    missing: HashSet<usize>,
}

impl Default for EpubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self {
            title: Some("Test Book".to_string()),
            sections: Vec::new(),
            missing: HashSet::new(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn without_title(mut self) -> Self {
        self.title = None;
        self
    }

    /// Add a section with one `<p>` per paragraph
    pub fn section(mut self, paragraphs: &[&str]) -> Self {
        self.sections.push(paragraphs.iter().map(|p| p.to_string()).collect());
        self
    }

    /// Add `count` sections with a single numbered paragraph each
    pub fn numbered_sections(mut self, count: usize) -> Self {
        for n in 0..count {
            self.sections.push(vec![format!("Paragraph of section {}", n + 1)]);
        }
        self
    }

    /// Keep section `index` (zero-based) in the spine but leave its file out
    pub fn missing_section(mut self, index: usize) -> Self {
        self.missing.insert(index);
        self
    }

    /// Archive path of section `index`
    pub fn section_path(index: usize) -> String {
        format!("OEBPS/text/chapter{}.xhtml", index + 1)
    }

    /// Manifest href of section `index`
    pub fn section_href(index: usize) -> String {
        format!("text/chapter{}.xhtml", index + 1)
    }

    pub fn package(&self) -> String {
        let title = self
            .title
            .as_ref()
            .map(|title| format!("    <dc:title>{}</dc:title>\n", title))
            .unwrap_or_default();
        let mut manifest = String::new();
        let mut spine = String::new();
        for index in 0..self.sections.len() {
            manifest.push_str(&format!(
                "    <item id=\"chapter{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                index + 1,
                Self::section_href(index)
            ));
            spine.push_str(&format!("    <itemref idref=\"chapter{}\"/>\n", index + 1));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
{}    <dc:identifier id="uid">urn:uuid:test</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{}    <item id="css" href="css/style.css" media-type="text/css"/>
    <item id="cover" href="images/cover.png" media-type="image/png"/>
  </manifest>
  <spine>
{}  </spine>
</package>
"#,
            title, manifest, spine
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

        writer.start_file("mimetype", stored).unwrap();
        writer.write_all(b"application/epub+zip").unwrap();

        writer.start_file("META-INF/container.xml", deflated).unwrap();
        writer.write_all(container_xml().as_bytes()).unwrap();

        writer.start_file("OEBPS/content.opf", deflated).unwrap();
        writer.write_all(self.package().as_bytes()).unwrap();

        for (index, paragraphs) in self.sections.iter().enumerate() {
            if self.missing.contains(&index) {
                continue;
            }
            writer.start_file(Self::section_path(index), deflated).unwrap();
            writer.write_all(section_xhtml(index, paragraphs).as_bytes()).unwrap();
        }

        writer.start_file("OEBPS/css/style.css", deflated).unwrap();
        writer.write_all(STYLESHEET.as_bytes()).unwrap();

        writer.start_file("OEBPS/images/cover.png", stored).unwrap();
        writer.write_all(COVER_BYTES).unwrap();

        writer.finish().unwrap().into_inner()
    }
}

pub fn container_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#
    .to_string()
}

pub fn section_xhtml(index: usize, paragraphs: &[String]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|paragraph| format!("    <p>{}</p>\n", paragraph))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
  <head>
    <title>Chapter {}</title>
    <link rel="stylesheet" type="text/css" href="../css/style.css"/>
  </head>
  <body>
{}  </body>
</html>
"#,
        index + 1,
        body
    )
}

/// Route library logs through the test harness; safe to call repeatedly
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Valid configuration for the Anthropic provider
pub fn test_config() -> AiConfiguration {
    AiConfiguration::new(ProviderKind::Anthropic, "sk-test", "claude-test")
}
