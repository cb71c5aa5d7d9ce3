//! The structured record emitted for each retained message.

use chrono::{DateTime, Utc};

use crate::parser::header::HeaderMap;

/// Placeholder used when a message has no usable `Subject:` header.
pub const NO_SUBJECT: &str = "(No Subject)";

/// Placeholder for a missing `From:` header.
///
/// A candidate still carrying this after parsing is dropped, never emitted.
pub const NO_SENDER: &str = "(No Sender)";

/// Placeholder for a missing `To:` header. Same drop rule as [`NO_SENDER`].
pub const NO_RECIPIENT: &str = "(No Recipient)";

/// One extracted message, ready for downstream rendering.
///
/// Constructed once per retained block and immutable thereafter. Field
/// values have RFC 2047 encoded words resolved; the body has
/// quoted-printable transport encoding reversed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MessageRecord {
    /// Decoded subject line.
    pub subject: String,

    /// Raw `From:` value (decoded, but name and address not split apart).
    pub from: String,

    /// Raw `To:` value, possibly several comma-separated recipients.
    pub to: String,

    /// The `Date:` header exactly as it appeared.
    pub date: String,

    /// Absolute timestamp, `None` when the date could not be parsed.
    /// Consumers sort unparseable dates last (or first) consistently.
    pub parsed_date: Option<DateTime<Utc>>,

    /// The `Message-ID` header value, empty when absent.
    pub message_id: String,

    /// Decoded body text.
    pub body: String,

    /// Every parsed header, in arrival order.
    pub headers: HeaderMap,

    /// Position in the original archive (split order, 0-based).
    /// Downstream numbering is defined over this order.
    pub sequence: u64,
}
