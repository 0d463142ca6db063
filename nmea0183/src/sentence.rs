use std::fmt;
use std::ops::Range;

use chrono::{DateTime, Utc};

use crate::checksum;

/// Sentence types the gateway understands, classified by the last three
/// characters of the tag so that any talker id is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentenceType {
    Gga,
    Rmc,
    Gll,
    Vtg,
    Hdt,
    Hdm,
    Dpt,
    Dbt,
    Mwv,
    Mwd,
    Mtw,
    Vhw,
    Vlw,
    Vdm,
    Vdo,
    Unsupported,
}

impl SentenceType {
    pub fn from_tag(tag: &str) -> Self {
        if tag.len() < 3 || !tag.is_ascii() {
            return SentenceType::Unsupported;
        }
        match &tag[tag.len() - 3..] {
            "GGA" => SentenceType::Gga,
            "RMC" => SentenceType::Rmc,
            "GLL" => SentenceType::Gll,
            "VTG" => SentenceType::Vtg,
            "HDT" => SentenceType::Hdt,
            "HDM" => SentenceType::Hdm,
            "DPT" => SentenceType::Dpt,
            "DBT" => SentenceType::Dbt,
            "MWV" => SentenceType::Mwv,
            "MWD" => SentenceType::Mwd,
            "MTW" => SentenceType::Mtw,
            "VHW" => SentenceType::Vhw,
            "VLW" => SentenceType::Vlw,
            "VDM" => SentenceType::Vdm,
            "VDO" => SentenceType::Vdo,
            _ => SentenceType::Unsupported,
        }
    }

    pub fn is_ais(&self) -> bool {
        matches!(self, SentenceType::Vdm | SentenceType::Vdo)
    }
}

/// One received protocol line.
#[derive(Debug, Clone)]
pub struct Sentence {
    pub raw: String,
    /// Characters between the sentinel and the first comma, e.g. `GPGGA`
    pub type_tag: String,
    pub sentence_type: SentenceType,
    pub checksum_ok: bool,
    pub received_at: DateTime<Utc>,
    /// Byte ranges of the data fields within `raw`
    spans: Vec<Range<usize>>,
}

impl Sentence {
    /// Classify and checksum a framed line.
    ///
    /// Returns `None` only when the line does not begin with `$` or `!`.
    pub fn parse(line: &str) -> Option<Self> {
        Self::parse_at(line, Utc::now())
    }

    pub fn parse_at(line: &str, received_at: DateTime<Utc>) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if !(line.starts_with('$') || line.starts_with('!')) {
            return None;
        }

        let body = &line[1..];
        let tag_end = body
            .find(|c: char| c == ',' || c == '*')
            .unwrap_or(body.len());
        let type_tag = body[..tag_end].to_string();

        Some(Self {
            raw: line.to_string(),
            sentence_type: SentenceType::from_tag(&type_tag),
            type_tag,
            checksum_ok: checksum::validate(line),
            received_at,
            spans: field_spans(line),
        })
    }

    /// A line without a sentinel, kept only so it can still be forwarded.
    pub fn unframed(line: &str, received_at: DateTime<Utc>) -> Self {
        Self {
            raw: line.trim_end_matches(['\r', '\n']).to_string(),
            type_tag: String::new(),
            sentence_type: SentenceType::Unsupported,
            checksum_ok: false,
            received_at,
            spans: Vec::new(),
        }
    }

    /// Number of data fields, excluding the tag and the checksum.
    pub fn field_count(&self) -> usize {
        self.spans.len()
    }

    /// 1-based positional field; an absent field is the empty string.
    pub fn field(&self, index: usize) -> &str {
        match index.checked_sub(1).and_then(|i| self.spans.get(i)) {
            Some(span) => &self.raw[span.clone()],
            None => "",
        }
    }

    /// True for `!` encapsulated sentences.
    pub fn is_encapsulated(&self) -> bool {
        self.raw.starts_with('!')
    }
}

/// Split the data section once; the tag before the first comma is skipped.
fn field_spans(line: &str) -> Vec<Range<usize>> {
    let end = line.find('*').unwrap_or(line.len());
    let mut spans = Vec::new();
    let mut start = 1;
    for part in line[1..end].split(',') {
        spans.push(start..start + part.len());
        start += part.len() + 1;
    }
    if !spans.is_empty() {
        spans.remove(0);
    }
    spans
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
