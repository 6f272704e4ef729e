//! Grammar-driven decoder for multi-record event lists.
//!
//! List actions (`QueueStatus`, `CoreShowChannels`) answer with a series of
//! `Event:` blocks and no length prefix. Record boundaries are only visible
//! through marker lines, so each action gets a small declarative [`Grammar`]:
//!
//! | Grammar               | Start marker             | Completion marker                 |
//! |-----------------------|--------------------------|-----------------------------------|
//! | [`QUEUE_STATUS`]      | `Event: QueueParams`     | `Event: QueueStatusComplete`      |
//! | [`CORE_SHOW_CHANNELS`]| `Event: CoreShowChannel` | `Event: CoreShowChannelsComplete` |
//!
//! Both also stop at the hard terminator [`END_COMMAND`].
//!
//! Field tables map a header key to a record attribute and a [`Coercion`].
//! The same key (for example `Queue`) appears in several block types with
//! different meanings, which is why fields are only collected while a record
//! opened by the grammar's own start marker is under construction. Any other
//! `Event:` line closes the current record.
//!
//! Markers match whole lines, so `Event: CoreShowChannelsComplete` is never
//! taken for `Event: CoreShowChannel`.

use tracing::{debug, warn};

use crate::models::channel::ChannelRecord;
use crate::models::queue::QueueSnapshot;
use crate::{AppError, Result};

/// Hard terminator ending a command's output.
pub const END_COMMAND: &str = "--END COMMAND--";

/// Prefix shared by every event header line.
pub const EVENT_PREFIX: &str = "Event: ";

/// Target type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Unsigned integer.
    Integer,
    /// Floating point number.
    Float,
    /// Verbatim text.
    Text,
}

/// A raw header value after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Result of [`Coercion::Integer`].
    Integer(u64),
    /// Result of [`Coercion::Float`].
    Float(f64),
    /// Result of [`Coercion::Text`].
    Text(String),
}

impl Coercion {
    /// Convert an already trimmed header value.
    ///
    /// Returns `None` when the value does not parse as the target type.
    #[must_use]
    pub fn apply(self, raw: &str) -> Option<FieldValue> {
        match self {
            Self::Integer => raw.parse().ok().map(FieldValue::Integer),
            Self::Float => raw.parse().ok().map(FieldValue::Float),
            Self::Text => Some(FieldValue::Text(raw.to_owned())),
        }
    }
}

impl FieldValue {
    fn into_integer(self) -> u64 {
        match self {
            Self::Integer(v) => v,
            _ => 0,
        }
    }

    fn into_float(self) -> f64 {
        match self {
            Self::Float(v) => v,
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(v) => v as f64,
            Self::Text(_) => 0.0,
        }
    }

    fn into_text(self) -> String {
        match self {
            Self::Text(v) => v,
            Self::Integer(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
        }
    }
}

/// One row of a grammar's field table.
pub struct FieldRule<R> {
    /// Header key, matched exactly against the text before the first `:`.
    pub key: &'static str,
    /// Conversion applied to the trimmed value.
    pub coercion: Coercion,
    /// Stores the converted value on the record.
    pub assign: fn(&mut R, FieldValue),
    /// The record is complete once this field is seen.
    pub closes_record: bool,
}

impl<R> std::fmt::Debug for FieldRule<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRule")
            .field("key", &self.key)
            .field("coercion", &self.coercion)
            .field("closes_record", &self.closes_record)
            .finish_non_exhaustive()
    }
}

/// Per-action decoding rules.
#[derive(Debug)]
pub struct Grammar<R: 'static> {
    /// Action this grammar decodes, for logs and errors.
    pub name: &'static str,
    /// Line that opens a new record.
    pub start_marker: &'static str,
    /// Named completion event closing the list, if the action emits one.
    pub completion_marker: Option<&'static str>,
    /// Field table.
    pub fields: &'static [FieldRule<R>],
}

impl<R: 'static> Grammar<R> {
    fn rule_for(&self, key: &str) -> Option<&FieldRule<R>> {
        self.fields.iter().find(|rule| rule.key == key)
    }
}

/// `QueueStatus` → [`QueueSnapshot`].
pub static QUEUE_STATUS: Grammar<QueueSnapshot> = Grammar {
    name: "QueueStatus",
    start_marker: "Event: QueueParams",
    completion_marker: Some("Event: QueueStatusComplete"),
    fields: &[
        FieldRule {
            key: "Queue",
            coercion: Coercion::Text,
            assign: |q, v| q.name = v.into_text(),
            closes_record: false,
        },
        FieldRule {
            key: "Calls",
            coercion: Coercion::Integer,
            assign: |q, v| q.calls = v.into_integer(),
            closes_record: false,
        },
        FieldRule {
            key: "Completed",
            coercion: Coercion::Integer,
            assign: |q, v| q.completed = v.into_integer(),
            closes_record: false,
        },
        FieldRule {
            key: "Abandoned",
            coercion: Coercion::Integer,
            assign: |q, v| q.abandoned = v.into_integer(),
            closes_record: false,
        },
        FieldRule {
            key: "ServiceLevel",
            coercion: Coercion::Float,
            assign: |q, v| q.service_level = v.into_float(),
            closes_record: false,
        },
    ],
};

/// `CoreShowChannels` → [`ChannelRecord`].
///
/// `Application` is the last field of interest in each block and completes
/// the record. `Duration` stays text (`HH:MM:SS`).
pub static CORE_SHOW_CHANNELS: Grammar<ChannelRecord> = Grammar {
    name: "CoreShowChannels",
    start_marker: "Event: CoreShowChannel",
    completion_marker: Some("Event: CoreShowChannelsComplete"),
    fields: &[
        FieldRule {
            key: "Channel",
            coercion: Coercion::Text,
            assign: |c, v| c.channel = v.into_text(),
            closes_record: false,
        },
        FieldRule {
            key: "CallerIDNum",
            coercion: Coercion::Text,
            assign: |c, v| c.caller_id = v.into_text(),
            closes_record: false,
        },
        FieldRule {
            key: "Duration",
            coercion: Coercion::Text,
            assign: |c, v| c.duration = v.into_text(),
            closes_record: false,
        },
        FieldRule {
            key: "Application",
            coercion: Coercion::Text,
            assign: |c, v| c.application = v.into_text(),
            closes_record: true,
        },
    ],
};

/// How a list ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// [`END_COMMAND`] was seen; nothing of the response remains unread.
    Terminator,
    /// The named completion event was seen; the rest of its header block
    /// (`EventList`, `ListItems`, closing blank line) is still on the wire.
    Event,
}

/// Result of feeding one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More lines are needed.
    Continue,
    /// The list is complete.
    Complete(Completion),
}

/// Record under construction.
#[derive(Debug)]
struct Pending<R> {
    record: R,
    touched: bool,
}

/// Stateful decoder turning lines into records according to a [`Grammar`].
///
/// Holds at most one record under construction; every start marker flushes
/// the previous one if any field was set on it.
#[derive(Debug)]
pub struct EventBlockParser<'g, R: 'static> {
    grammar: &'g Grammar<R>,
    current: Option<Pending<R>>,
    records: Vec<R>,
    complete: bool,
}

impl<'g, R: Default + 'static> EventBlockParser<'g, R> {
    /// Create a parser with no record under construction.
    #[must_use]
    pub fn new(grammar: &'g Grammar<R>) -> Self {
        Self {
            grammar,
            current: None,
            records: Vec::new(),
            complete: false,
        }
    }

    /// Decode every line of a complete response.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Protocol` if the lines run out before a terminator
    /// or completion event.
    pub fn parse_lines<I, T>(grammar: &'g Grammar<R>, lines: I) -> Result<Vec<R>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut parser = Self::new(grammar);
        for line in lines {
            if let Progress::Complete(_) = parser.feed(line.as_ref()) {
                return Ok(parser.into_records());
            }
        }
        Err(parser.truncated())
    }

    /// Consume one line.
    ///
    /// Lines fed after completion are ignored.
    pub fn feed(&mut self, line: &str) -> Progress {
        if self.complete {
            return Progress::Complete(Completion::Terminator);
        }

        let line = line.trim_end();

        if line == END_COMMAND {
            self.flush();
            self.complete = true;
            return Progress::Complete(Completion::Terminator);
        }

        if self.grammar.completion_marker == Some(line) {
            self.flush();
            self.complete = true;
            return Progress::Complete(Completion::Event);
        }

        if line == self.grammar.start_marker {
            self.flush();
            self.current = Some(Pending {
                record: R::default(),
                touched: false,
            });
            return Progress::Continue;
        }

        if line.starts_with(EVENT_PREFIX) {
            debug!(
                grammar = self.grammar.name,
                event = line,
                "ami parser: foreign event closes current record"
            );
            self.flush();
            return Progress::Continue;
        }

        self.apply_field(line);
        Progress::Continue
    }

    /// Whether a terminator or completion event has been seen.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Records completed so far.
    #[must_use]
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Take the decoded records.
    #[must_use]
    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    /// Error describing a response that ended before its terminator.
    #[must_use]
    pub fn truncated(&self) -> AppError {
        AppError::Protocol(format!(
            "{} response truncated after {} record(s)",
            self.grammar.name,
            self.records.len()
        ))
    }

    fn apply_field(&mut self, line: &str) {
        let Some(pending) = self.current.as_mut() else {
            return;
        };
        let Some((key, raw)) = line.split_once(':') else {
            return;
        };
        let Some(rule) = self.grammar.rule_for(key.trim()) else {
            return;
        };

        let raw = raw.trim();
        let Some(value) = rule.coercion.apply(raw) else {
            warn!(
                grammar = self.grammar.name,
                key = rule.key,
                value = raw,
                "ami parser: value does not match declared type, skipping line"
            );
            return;
        };

        (rule.assign)(&mut pending.record, value);
        pending.touched = true;

        if rule.closes_record {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if let Some(pending) = self.current.take() {
            if pending.touched {
                self.records.push(pending.record);
            }
        }
    }
}
