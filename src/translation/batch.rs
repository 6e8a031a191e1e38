/*!
 * Batch translation processing.
 *
 * Text units of one section are packed into size-bounded batches, each batch
 * is sent as a single request with the units joined by the segment
 * delimiter, and the response is split back onto the units by position.
 * Batches are translated strictly one after another: write-back is
 * positional and the next batch must see the previous one committed.
 */

use log::{debug, warn};
use std::ops::Range;

use crate::app_config::BatchLimits;
use crate::epub::document::{TextUnit, XhtmlDocument};
use crate::errors::TranslationError;
use crate::providers::TextTranslator;
use crate::translation::progress::CancellationFlag;
use crate::translation::prompts::{SEGMENT_DELIMITER, batch_instructions};

/// A contiguous run of text units sent in one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Positions of the member units in the unit sequence
    pub units: Range<usize>,
    /// Sum of the member lengths in characters
    pub char_len: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Partition unit lengths into ordered batches.
///
/// The open batch is closed before a unit that would push it past
/// `max_chars`, or, once it holds at least `min_chars`, before a unit that
/// would push it past 90% of `max_chars`. The first unit of a batch is always
/// accepted, so an oversized unit travels alone.
pub fn plan_batches(lengths: &[usize], limits: &BatchLimits) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut size = 0usize;

    for (position, &len) in lengths.iter().enumerate() {
        let next = size + len;
        let over_max = next > limits.max_chars;
        let over_soft_limit = size >= limits.min_chars && next * 10 > limits.max_chars * 9;

        if position > start && (over_max || over_soft_limit) {
            batches.push(Batch {
                units: start..position,
                char_len: size,
            });
            start = position;
            size = 0;
        }
        size += len;
    }

    if start < lengths.len() {
        batches.push(Batch {
            units: start..lengths.len(),
            char_len: size,
        });
    }
    batches
}

/// Join unit texts with the segment delimiter
pub fn join_segments<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    texts.into_iter().collect::<Vec<_>>().join(SEGMENT_DELIMITER)
}

/// Split a translated batch on the segment delimiter
pub fn split_segments(text: &str) -> Vec<&str> {
    text.split(SEGMENT_DELIMITER).collect()
}

/// Counters for one translated document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStats {
    /// Text units extracted
    pub text_units: usize,
    /// Requests sent
    pub batches: usize,
    /// Requests that failed with a non-critical error
    pub failed_batches: usize,
    /// Units that kept their original text
    pub untranslated_units: usize,
}

impl DocumentStats {
    pub fn merge(&mut self, other: &DocumentStats) {
        self.text_units += other.text_units;
        self.batches += other.batches;
        self.failed_batches += other.failed_batches;
        self.untranslated_units += other.untranslated_units;
    }
}

/// Batch translator for the text units of a document
pub struct BatchTranslator<'a> {
    /// Back-end used for every request
    translator: &'a dyn TextTranslator,
    /// Instructions including the delimiter note
    instructions: String,
    /// Batch size thresholds
    limits: BatchLimits,
    /// Checked before every request
    cancel: Option<&'a CancellationFlag>,
}

impl<'a> BatchTranslator<'a> {
    /// Create a new batch translator
    pub fn new(translator: &'a dyn TextTranslator, instructions: Option<&str>, limits: BatchLimits) -> Self {
        Self {
            translator,
            instructions: batch_instructions(instructions),
            limits,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: &'a CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Translate every text unit of `document` in place.
    ///
    /// Critical provider errors and cancellation abort with an error; other
    /// provider failures leave the batch's units untranslated.
    pub async fn translate_document(&self, document: &mut XhtmlDocument) -> Result<DocumentStats, TranslationError> {
        let units = document.text_units();
        let lengths: Vec<usize> = units.iter().map(TextUnit::char_len).collect();
        let batches = plan_batches(&lengths, &self.limits);

        let mut stats = DocumentStats {
            text_units: units.len(),
            ..DocumentStats::default()
        };
        debug!(
            "{}: {} text units in {} batches",
            document.path(),
            units.len(),
            batches.len()
        );

        for (batch_index, batch) in batches.iter().enumerate() {
            if self.cancel.is_some_and(CancellationFlag::is_cancelled) {
                return Err(TranslationError::Cancelled);
            }

            let members = &units[batch.units.clone()];
            let joined = join_segments(members.iter().map(|unit| unit.text.as_str()));
            stats.batches += 1;
            debug!(
                "{}: batch {}/{} with {} units ({} chars)",
                document.path(),
                batch_index + 1,
                batches.len(),
                batch.len(),
                batch.char_len
            );

            match self.translator.translate(&joined, Some(self.instructions.as_str())).await {
                Ok(translated) => {
                    let parts = split_segments(&translated);
                    for (unit, part) in members.iter().zip(parts.iter()) {
                        document.write_back(unit, part)?;
                    }
                    if parts.len() < members.len() {
                        warn!(
                            "{}: delimiter lost in batch {}, {} of {} units keep their original text",
                            document.path(),
                            batch_index + 1,
                            members.len() - parts.len(),
                            members.len()
                        );
                        stats.untranslated_units += members.len() - parts.len();
                    }
                }
                Err(e) if e.is_critical() => return Err(e.into()),
                Err(e) => {
                    warn!(
                        "{}: batch {} failed, keeping original text: {}",
                        document.path(),
                        batch_index + 1,
                        e
                    );
                    stats.failed_batches += 1;
                    stats.untranslated_units += members.len();
                }
            }
        }

        Ok(stats)
    }
}
