// THEORY:
// An `AlertRecord` is the append-only unit of the alert log, and this module owns
// its one textual encoding. Writer and reader both go through here so they cannot
// drift apart.
//
// The line shape is fixed and stays greppable:
//
//     [HH:MM:SS] ZONE=<zone> | NIVEAU=<level> | SCORE=<int> | OBJETS=['a', 'b']
//
// Fields are parsed from the right, so a zone name is the only field allowed to
// contain the separator. Hazard labels are written as quoted, escaped literals
// in the style of a Python list repr, which is what older deployments wrote.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use chrono::NaiveTime;

use crate::core_modules::detection::HazardSet;
use crate::core_modules::risk_model::RiskLevel;
use crate::error::RecordParseError;

pub const FIELD_SEPARATOR: &str = " | ";
const TIME_FORMAT: &str = "%H:%M:%S";

/// One persisted alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRecord {
    /// Local time of day of the write, second precision.
    pub timestamp: NaiveTime,
    pub zone: String,
    pub level: RiskLevel,
    pub score: u32,
    /// Hazard labels in detection order.
    pub hazards: Vec<String>,
}

impl AlertRecord {
    /// Decodes one log line. A trailing newline is accepted.
    pub fn parse_line(line: &str) -> Result<Self, RecordParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (time, rest) = line
            .strip_prefix('[')
            .and_then(|l| l.split_once("] "))
            .ok_or(RecordParseError::MissingTimestamp)?;
        let timestamp = NaiveTime::parse_from_str(time, TIME_FORMAT)
            .map_err(|_| RecordParseError::InvalidTimestamp(time.to_string()))?;

        let mut fields = rest.rsplitn(4, FIELD_SEPARATOR);
        let hazards = field(fields.next(), "OBJETS")?;
        let score = field(fields.next(), "SCORE")?;
        let level = field(fields.next(), "NIVEAU")?;
        let zone = field(fields.next(), "ZONE")?;

        Ok(Self {
            timestamp,
            zone: zone.to_string(),
            level: level.parse()?,
            score: score
                .trim()
                .parse()
                .map_err(|_| RecordParseError::InvalidScore(score.to_string()))?,
            hazards: parse_hazards(hazards)?,
        })
    }
}

impl fmt::Display for AlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] ZONE={}{sep}NIVEAU={}{sep}SCORE={}{sep}OBJETS={}",
            self.timestamp.format(TIME_FORMAT),
            self.zone,
            self.level.token(),
            self.score,
            HazardSet::from(self.hazards.clone()),
            sep = FIELD_SEPARATOR,
        )
    }
}

fn field<'a>(raw: Option<&'a str>, key: &'static str) -> Result<&'a str, RecordParseError> {
    raw.and_then(|r| r.strip_prefix(key))
        .and_then(|r| r.strip_prefix('='))
        .ok_or(RecordParseError::MissingField(key))
}

/// Writes `label` as a quoted literal. Single quotes are used unless the label
/// holds a single quote and no double quote. Backslashes, the quote in use and
/// control characters are backslash-escaped, and `|` is written as `\x7c` so a
/// label can never produce a field separator.
pub(crate) fn write_quoted<W: fmt::Write>(out: &mut W, label: &str) -> fmt::Result {
    let quote = if label.contains('\'') && !label.contains('"') { '"' } else { '\'' };
    out.write_char(quote)?;
    for c in label.chars() {
        match c {
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c if c == quote => {
                out.write_char('\\')?;
                out.write_char(c)?;
            }
            c if c.is_ascii_control() || c == '|' => write!(out, "\\x{:02x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char(quote)
}

fn parse_hazards(raw: &str) -> Result<Vec<String>, RecordParseError> {
    let invalid = || RecordParseError::InvalidHazards(raw.to_string());
    let inner = raw
        .trim()
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or_else(invalid)?;

    let mut chars = inner.chars().peekable();
    let mut labels = Vec::new();
    loop {
        skip_spaces(&mut chars);
        let quote = match chars.next() {
            None => break,
            Some(quote @ ('\'' | '"')) => quote,
            Some(_) => return Err(invalid()),
        };
        labels.push(read_quoted(&mut chars, quote).ok_or_else(invalid)?);

        skip_spaces(&mut chars);
        match chars.next() {
            None => break,
            Some(',') => {}
            Some(_) => return Err(invalid()),
        }
    }
    Ok(labels)
}

fn skip_spaces(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

/// Reads up to and including the closing `quote`, undoing `write_quoted`.
fn read_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> Option<String> {
    let mut label = String::new();
    loop {
        match chars.next()? {
            c if c == quote => return Some(label),
            '\\' => label.push(match chars.next()? {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                'x' => {
                    let hex: String = chars.by_ref().take(2).collect();
                    char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?
                }
                other => other,
            }),
            c => label.push(c),
        }
    }
}
