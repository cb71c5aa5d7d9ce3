//! Per-block orchestration: strip the delimiter, parse headers, decode,
//! classify, and emit one record per retained message.

use serde::Serialize;
use tracing::debug;

use crate::classify::SelfEmailClassifier;
use crate::model::message::{MessageRecord, NO_RECIPIENT, NO_SENDER, NO_SUBJECT};
use crate::parser::body::decode_quoted_printable;
use crate::parser::date::normalize_date;
use crate::parser::header::split_message;
use crate::parser::mbox::{MessageBlock, MessageSplitter};

/// Counters for one extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Blocks the splitter produced.
    pub total_blocks: u64,
    /// Blocks dropped because no header section could be found.
    pub header_failures: u64,
    /// Blocks dropped because `From:` or `To:` was missing.
    pub missing_address: u64,
    /// Blocks dropped by the self-email classifier.
    pub self_excluded: u64,
    /// Records emitted.
    pub emitted: u64,
}

/// What became of one block.
#[derive(Debug)]
pub enum BlockOutcome {
    /// A complete record.
    Message(Box<MessageRecord>),
    /// No header section could be identified.
    NoHeaders,
    /// `From:` or `To:` was absent after parsing.
    MissingAddress,
    /// The sender (or sender and recipients) matched the configured identity.
    SelfAddressed,
}

/// Assembles structured records from raw message blocks.
///
/// Blocks are independent: the only shared state is the read-only
/// classifier, so callers may process blocks in parallel as long as the
/// original split order is preserved for any sequence-dependent output.
pub struct MessageAssembler {
    classifier: SelfEmailClassifier,
}

impl MessageAssembler {
    /// Create an assembler around a configured classifier.
    pub fn new(classifier: SelfEmailClassifier) -> Self {
        Self { classifier }
    }

    /// Process one block (leading delimiter line still attached).
    pub fn assemble(&self, block: MessageBlock<'_>) -> BlockOutcome {
        let content = strip_delimiter_line(block.raw);

        let Some((headers, raw_body)) = split_message(content) else {
            return BlockOutcome::NoHeaders;
        };

        let from = headers.get("From").unwrap_or(NO_SENDER).to_string();
        let to = headers.get("To").unwrap_or(NO_RECIPIENT).to_string();
        if from.is_empty() || from == NO_SENDER || to.is_empty() || to == NO_RECIPIENT {
            return BlockOutcome::MissingAddress;
        }

        if self.classifier.is_excluded(&from, &to) {
            return BlockOutcome::SelfAddressed;
        }

        let subject = match headers.get("Subject") {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => NO_SUBJECT.to_string(),
        };
        let date = headers.get("Date").unwrap_or_default().to_string();
        let parsed_date = normalize_date(&date);
        let message_id = headers.get("Message-ID").unwrap_or_default().to_string();
        let body = decode_quoted_printable(raw_body);

        let record = MessageRecord {
            subject,
            from,
            to,
            date,
            parsed_date,
            message_id,
            body,
            headers,
            sequence: block.index,
        };
        debug!(
            sequence = record.sequence,
            subject = %record.subject,
            "assembled message"
        );
        BlockOutcome::Message(Box::new(record))
    }

    /// Run the whole archive, preserving split order.
    pub fn extract(&self, content: &str) -> (Vec<MessageRecord>, RunStats) {
        self.extract_with(content, |_| {})
    }

    /// Like [`MessageAssembler::extract`], invoking `progress` with the
    /// number of blocks handled after each one.
    pub fn extract_with(
        &self,
        content: &str,
        mut progress: impl FnMut(u64),
    ) -> (Vec<MessageRecord>, RunStats) {
        let splitter = MessageSplitter::new(content);
        let mut records = Vec::new();
        let mut stats = RunStats::default();

        for block in splitter.blocks() {
            stats.total_blocks += 1;
            match self.assemble(block) {
                BlockOutcome::Message(record) => {
                    stats.emitted += 1;
                    records.push(*record);
                }
                BlockOutcome::NoHeaders => stats.header_failures += 1,
                BlockOutcome::MissingAddress => stats.missing_address += 1,
                BlockOutcome::SelfAddressed => stats.self_excluded += 1,
            }
            progress(stats.total_blocks);
        }

        (records, stats)
    }
}

/// Drop the leading `From ` delimiter line, if present.
fn strip_delimiter_line(raw: &str) -> &str {
    if raw.starts_with("From ") {
        match raw.find('\n') {
            Some(pos) => &raw[pos + 1..],
            None => "",
        }
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdentitySettings;

    fn assembler() -> MessageAssembler {
        MessageAssembler::new(SelfEmailClassifier::new(&IdentitySettings::default()))
    }

    fn block(raw: &str) -> MessageBlock<'_> {
        MessageBlock { index: 0, raw }
    }

    #[test]
    fn test_assemble_complete_message() {
        let raw = "From a@x.com Mon Jan 01 00:00:00 2024\n\
                   From: Alice <a@x.com>\n\
                   To: Bob <b@y.com>\n\
                   Subject: Greetings\n\
                   Date: Thu, 04 Jan 2024 10:00:00 +0000\n\
                   Message-ID: <m1@x.com>\n\
                   \n\
                   Hello Bob.\n";
        let BlockOutcome::Message(record) = assembler().assemble(block(raw)) else {
            panic!("expected a record");
        };
        assert_eq!(record.subject, "Greetings");
        assert_eq!(record.from, "Alice <a@x.com>");
        assert_eq!(record.to, "Bob <b@y.com>");
        assert_eq!(record.message_id, "<m1@x.com>");
        assert_eq!(record.body, "Hello Bob.");
        assert!(record.parsed_date.is_some());
    }

    #[test]
    fn test_missing_to_is_dropped() {
        let raw = "From a@x.com Mon\nFrom: a@x.com\nSubject: no recipient\n\nbody\n";
        assert!(matches!(
            assembler().assemble(block(raw)),
            BlockOutcome::MissingAddress
        ));
    }

    #[test]
    fn test_no_headers_is_dropped() {
        let raw = "From a@x.com Mon\nnothing that looks like a header\n";
        assert!(matches!(
            assembler().assemble(block(raw)),
            BlockOutcome::NoHeaders
        ));
    }

    #[test]
    fn test_subject_defaults_to_placeholder() {
        let raw = "From a@x.com Mon\nFrom: a@x.com\nTo: b@y.com\n\nbody\n";
        let BlockOutcome::Message(record) = assembler().assemble(block(raw)) else {
            panic!("expected a record");
        };
        assert_eq!(record.subject, NO_SUBJECT);
        assert_eq!(record.message_id, "");
        assert!(record.parsed_date.is_none());
    }

    #[test]
    fn test_quoted_printable_body_decoded() {
        let raw = "From a@x.com Mon\nFrom: a@x.com\nTo: b@y.com\n\nCaf=E9 time=\ncontinues\n";
        let BlockOutcome::Message(record) = assembler().assemble(block(raw)) else {
            panic!("expected a record");
        };
        assert_eq!(record.body, "Café timecontinues");
    }

    #[test]
    fn test_extract_counts_and_order() {
        let archive = "From a@x.com Mon\nFrom: a@x.com\nTo: b@y.com\nSubject: one\n\nbody\n\
                       From broken\nno headers here\n\
                       From c@z.com Tue\nFrom: c@z.com\nTo: d@w.com\nSubject: two\n\nbody\n";
        let (records, stats) = assembler().extract(archive);
        assert_eq!(stats.total_blocks, 3);
        assert_eq!(stats.header_failures, 1);
        assert_eq!(stats.emitted, 2);
        assert_eq!(records[0].subject, "one");
        assert_eq!(records[1].subject, "two");
        assert_eq!(records[0].sequence, 0);
        assert_eq!(records[1].sequence, 2);
    }

    #[test]
    fn test_self_email_excluded_and_counted() {
        let identity = IdentitySettings {
            ignored_senders: Vec::new(),
            my_addresses: vec!["me@x.com".to_string()],
            my_names: Vec::new(),
        };
        let assembler = MessageAssembler::new(SelfEmailClassifier::new(&identity));
        let archive = "From me@x.com Mon\nFrom: me@x.com\nTo: me@x.com\nSubject: note\n\nbody\n";
        let (records, stats) = assembler.extract(archive);
        assert!(records.is_empty());
        assert_eq!(stats.self_excluded, 1);
    }
}
