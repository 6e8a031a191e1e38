/*!
 * Parsed XHTML content documents.
 *
 * A section is held as the flat list of XML events produced by the parser.
 * Text extraction walks that list once and returns an ordered snapshot of
 * addressable text units; translated text is then written back by event
 * index, so the document is never mutated while it is being traversed.
 */

use once_cell::sync::Lazy;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;

use crate::errors::EpubError;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Well-formed entity or character reference at the start of a string
static ENTITY_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9A-Fa-f]+);").unwrap());

/// Elements whose text content is never translated
const OPAQUE_ELEMENTS: &[&[u8]] = &[b"script", b"style"];

/// One translatable text node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    /// Index of the text event inside the document
    pub index: usize,
    /// Text content, unescaped unless `escaped` is set
    pub text: String,
    /// The content held an entity neither XML nor HTML defines and is
    /// carried in its escaped source form
    pub escaped: bool,
}

impl TextUnit {
    /// Length in Unicode scalar values
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Parsed XHTML document
#[derive(Debug, Clone)]
pub struct XhtmlDocument {
    path: String,
    events: Vec<Event<'static>>,
    byte_order_mark: bool,
}

impl XhtmlDocument {
    /// Parse a content document; `path` is only used in error messages
    pub fn parse(path: &str, source: &str) -> Result<Self, EpubError> {
        let (byte_order_mark, source) = match source.strip_prefix(BYTE_ORDER_MARK) {
            Some(rest) => (true, rest),
            None => (false, source),
        };

        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(false);

        let mut events = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(event) => events.push(event.into_owned()),
                Err(e) => {
                    return Err(EpubError::Malformed {
                        path: path.to_string(),
                        message: format!("{} at position {}", e, reader.buffer_position()),
                    });
                }
            }
        }

        Ok(Self {
            path: path.to_string(),
            events,
            byte_order_mark,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Extract the translatable text units in document order.
    ///
    /// Only text inside `<body>` is considered, unless the document has no
    /// body at all. Text inside script and style elements, CDATA sections and
    /// whitespace-only nodes are skipped.
    pub fn text_units(&self) -> Vec<TextUnit> {
        let has_body = self
            .events
            .iter()
            .any(|event| matches!(event, Event::Start(start) if is_element(start.local_name().as_ref(), b"body")));

        let mut in_body = !has_body;
        let mut opaque_depth = 0usize;
        let mut units = Vec::new();

        for (index, event) in self.events.iter().enumerate() {
            match event {
                Event::Start(start) => {
                    let name = start.local_name();
                    if is_element(name.as_ref(), b"body") {
                        in_body = true;
                    } else if is_opaque(name.as_ref()) {
                        opaque_depth += 1;
                    }
                }
                Event::End(end) => {
                    let name = end.local_name();
                    if is_element(name.as_ref(), b"body") {
                        in_body = false;
                    } else if is_opaque(name.as_ref()) {
                        opaque_depth = opaque_depth.saturating_sub(1);
                    }
                }
                Event::Text(text) if in_body && opaque_depth == 0 => {
                    if let Some(unit) = text_unit(index, text) {
                        units.push(unit);
                    }
                }
                _ => {}
            }
        }

        units
    }

    /// Replace the content of an extracted unit.
    ///
    /// Identical text leaves the node untouched. Whitespace the provider
    /// stripped from either end of the node is restored.
    pub fn write_back(&mut self, unit: &TextUnit, translated: &str) -> Result<(), EpubError> {
        match self.events.get(unit.index) {
            Some(Event::Text(_)) => {}
            _ => return Err(EpubError::StaleTextUnit(unit.index)),
        }
        if translated == unit.text {
            return Ok(());
        }

        let content = restore_padding(&unit.text, translated);
        let text = if unit.escaped {
            BytesText::from_escaped(escape_markup(&content))
        } else {
            BytesText::new(&content).into_owned()
        };
        self.events[unit.index] = Event::Text(text);
        Ok(())
    }

    /// Serialize the document back to markup
    pub fn serialize(&self) -> Result<String, EpubError> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer
                .write_event(event)
                .map_err(|e| EpubError::Malformed {
                    path: self.path.clone(),
                    message: e.to_string(),
                })?;
        }

        let body = String::from_utf8(writer.into_inner())
            .map_err(|_| EpubError::InvalidEncoding(self.path.clone()))?;
        if self.byte_order_mark {
            Ok(format!("{}{}", BYTE_ORDER_MARK, body))
        } else {
            Ok(body)
        }
    }
}

fn is_element(name: &[u8], expected: &[u8]) -> bool {
    name.eq_ignore_ascii_case(expected)
}

fn is_opaque(name: &[u8]) -> bool {
    OPAQUE_ELEMENTS.iter().any(|opaque| is_element(name, opaque))
}

fn text_unit(index: usize, text: &BytesText<'_>) -> Option<TextUnit> {
    let (content, escaped) = match text.unescape_with(resolve_html5_entity) {
        Ok(unescaped) => (unescaped.into_owned(), false),
        Err(_) => (String::from_utf8_lossy(text).into_owned(), true),
    };

    if content.trim().is_empty() {
        return None;
    }
    Some(TextUnit {
        index,
        text: content,
        escaped,
    })
}

/// Escape markup characters in text that is already partly escaped.
///
/// Well-formed references are kept; a bare `&`, `<` or `>` is escaped.
fn escape_markup(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for (position, c) in text.char_indices() {
        match c {
            '&' if ENTITY_REFERENCE.is_match(&text[position..]) => result.push('&'),
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

fn restore_padding(original: &str, translated: &str) -> String {
    let leading = &original[..original.len() - original.trim_start().len()];
    let trailing = &original[original.trim_end().len()..];

    let mut result = String::with_capacity(leading.len() + translated.len() + trailing.len());
    if !translated.starts_with(char::is_whitespace) {
        result.push_str(leading);
    }
    result.push_str(translated);
    if !translated.ends_with(char::is_whitespace) {
        result.push_str(trailing);
    }
    result
}
