//! Header section parsing: boundary detection, folding, RFC 2047 words.

use tracing::trace;

/// How far into a line a colon may sit for the line to count as a header
/// during the fallback boundary scan.
const MAX_COLON_DISTANCE: usize = 200;

/// Ordered header map.
///
/// Keys keep the case they arrived with; lookups match case-insensitively
/// and return the value of the last occurrence (last write wins). Folded
/// continuation lines are merged into the most recently started header
/// with a single inserted space.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    /// Append a header, keeping earlier occurrences of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Case-insensitive lookup; the last occurrence wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Number of stored entries (duplicates included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No headers were parsed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fold a continuation fragment onto the most recently started header.
    fn append_to_last(&mut self, fragment: &str) {
        if let Some(last) = self.entries.last_mut() {
            last.1.push(' ');
            last.1.push_str(fragment);
        }
    }
}

/// Split a block (delimiter line already stripped) into headers and body.
///
/// The primary boundary is the first blank line. When the block has none,
/// [`scan_boundary`] walks lines from the top to find where header-like
/// content stops. Returns `None` when nothing header-like exists at all.
pub fn split_message(block: &str) -> Option<(HeaderMap, &str)> {
    if let Some(pos) = block.find("\n\n") {
        let headers = parse_header_section(&block[..pos]);
        if headers.is_empty() {
            return None;
        }
        return Some((headers, &block[pos + 2..]));
    }

    let (header_end, body_start) = scan_boundary(block)?;
    let headers = parse_header_section(&block[..header_end]);
    if headers.is_empty() {
        return None;
    }
    Some((headers, &block[body_start..]))
}

/// States of the fallback boundary scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// Expecting a header line.
    ScanningHeaders,
    /// The previous line belonged to a header; folds may follow.
    InContinuation,
    /// Past the boundary.
    Body,
}

/// Find the header/body boundary when the block has no blank line.
///
/// A header line has no leading whitespace and a colon within its first
/// [`MAX_COLON_DISTANCE`] characters; a whitespace-led line continues the
/// previous header. The section ends at a blank line, at the first
/// non-continuation line without a colon (that line starts the body), or
/// at end of content (body empty).
///
/// Returns `(header_end, body_start)` byte offsets, or `None` when no
/// header line was seen before the boundary.
fn scan_boundary(block: &str) -> Option<(usize, usize)> {
    let mut state = Scan::ScanningHeaders;
    let mut seen_header = false;
    let mut boundary = (block.len(), block.len());
    let mut offset = 0usize;

    for line in block.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let text = line.trim_end_matches(['\r', '\n']);

        state = if text.is_empty() {
            boundary = (start, offset);
            Scan::Body
        } else if text.starts_with(' ') || text.starts_with('\t') {
            if !seen_header {
                // A continuation with nothing to continue: unparseable
                return None;
            }
            Scan::InContinuation
        } else if is_header_line(text) {
            seen_header = true;
            Scan::ScanningHeaders
        } else {
            // First non-continuation line without a colon starts the body
            boundary = (start, start);
            Scan::Body
        };

        if state == Scan::Body {
            break;
        }
    }

    seen_header.then_some(boundary)
}

/// A header line has no leading whitespace and a colon within its first
/// [`MAX_COLON_DISTANCE`] bytes.
fn is_header_line(text: &str) -> bool {
    if text.starts_with(' ') || text.starts_with('\t') {
        return false;
    }
    matches!(text.find(':'), Some(pos) if pos < MAX_COLON_DISTANCE)
}

/// Parse already-bounded header text into a [`HeaderMap`].
///
/// Continuation lines fold onto the most recently started header with one
/// space; non-continuation lines without a colon are skipped as noise.
/// Every completed value has its RFC 2047 encoded words resolved, so a
/// word split across a fold is reassembled before decoding.
fn parse_header_section(text: &str) -> HeaderMap {
    let mut map = HeaderMap::default();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with(' ') || line.starts_with('\t') {
            map.append_to_last(line.trim());
        } else if let Some(pos) = line.find(':') {
            let name = line[..pos].trim();
            if !name.is_empty() {
                map.insert(name, line[pos + 1..].trim());
            }
        }
    }

    for (_, value) in &mut map.entries {
        *value = decode_encoded_words(value);
    }

    map
}

// ── RFC 2047 encoded words ──────────────────────────────────────

/// Replace every RFC 2047 encoded word (`=?charset?B|Q?payload?=`) in a
/// header value with its decoded text.
///
/// Whitespace between two adjacent encoded words is dropped (RFC 2047
/// §6.2). A word that fails to decode is left exactly as it appeared.
pub fn decode_encoded_words(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut prev_was_word = false;

    while let Some(start) = rest.find("=?") {
        let gap = &rest[..start];
        if !prev_was_word || !gap.trim().is_empty() {
            out.push_str(gap);
        }

        match decode_one_word(&rest[start..]) {
            Some((text, consumed)) => {
                out.push_str(&text);
                rest = &rest[start + consumed..];
                prev_was_word = true;
            }
            None => {
                out.push_str("=?");
                rest = &rest[start + 2..];
                prev_was_word = false;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decode one encoded word at the start of `s` (which begins with `=?`).
/// Returns the decoded text and the total bytes consumed.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    // Layout after the leading "=?": charset?encoding?payload?=
    let inner = &s[2..];
    let q1 = inner.find('?')?;
    let charset = &inner[..q1];

    let rest = &inner[q1 + 1..];
    let q2 = rest.find('?')?;
    let encoding = &rest[..q2];

    let payload_and_tail = &rest[q2 + 1..];
    let end = payload_and_tail.find("?=")?;
    let payload = &payload_and_tail[..end];

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload)?,
        "Q" | "q" => decode_q(payload),
        _ => return None,
    };

    let consumed = 2 + q1 + 1 + q2 + 1 + end + 2;
    Some((decode_charset(charset, &bytes), consumed))
}

/// Minimal base64 decoder, tolerant of embedded whitespace and padding.
fn decode_base64(input: &str) -> Option<Vec<u8>> {
    fn sextet(c: u8) -> Option<u32> {
        match c {
            b'A'..=b'Z' => Some(u32::from(c - b'A')),
            b'a'..=b'z' => Some(u32::from(c - b'a') + 26),
            b'0'..=b'9' => Some(u32::from(c - b'0') + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;

    for &b in input.as_bytes() {
        if b.is_ascii_whitespace() || b == b'=' {
            continue;
        }
        acc = (acc << 6) | sextet(b)?;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }

    Some(out)
}

/// Decode Q-encoding: underscores become spaces, `=XX` becomes the byte.
/// Malformed escapes pass through as literal text.
fn decode_q(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                out.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(b'=');
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    out
}

/// Decode payload bytes using the declared charset, falling back to lossy
/// UTF-8 when the label is unknown.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    if charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("utf8") {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    match encoding_rs::Encoding::for_label(charset.as_bytes()) {
        Some(enc) => enc.decode(bytes).0.into_owned(),
        None => {
            trace!(charset, "unknown charset in encoded word");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_boundary() {
        let block = "Subject: Hi\nFrom: a@x.com\n\nthe body\n";
        let (headers, body) = split_message(block).unwrap();
        assert_eq!(headers.get("Subject"), Some("Hi"));
        assert_eq!(headers.get("from"), Some("a@x.com"));
        assert_eq!(body, "the body\n");
    }

    #[test]
    fn test_folded_header_joined_with_one_space() {
        let block = "Subject: This is a long\n\tsubject line\nFrom: a@x.com\n\nbody\n";
        let (headers, _) = split_message(block).unwrap();
        assert_eq!(headers.get("Subject"), Some("This is a long subject line"));
    }

    #[test]
    fn test_duplicate_header_last_write_wins() {
        let block = "X-Tag: first\nX-Tag: second\nFrom: a@x.com\n\nbody\n";
        let (headers, _) = split_message(block).unwrap();
        assert_eq!(headers.get("x-tag"), Some("second"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_fallback_boundary_stops_at_non_colon_line() {
        // No blank line anywhere: the first colon-less line starts the body.
        let block = "Subject: Hi\nFrom: a@x.com\nthis line has no separator\nmore body\n";
        let (headers, body) = split_message(block).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(body, "this line has no separator\nmore body\n");
    }

    #[test]
    fn test_fallback_boundary_continuation_then_body() {
        let block = "Subject: part one\n part two\nno colon here either\n";
        let (headers, body) = split_message(block).unwrap();
        assert_eq!(headers.get("Subject"), Some("part one part two"));
        assert_eq!(body, "no colon here either\n");
    }

    #[test]
    fn test_fallback_everything_is_header() {
        let block = "Subject: only headers\nFrom: a@x.com\nTo: b@y.com";
        let (headers, body) = split_message(block).unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(body, "");
    }

    #[test]
    fn test_no_header_like_content_is_dropped() {
        assert!(split_message("no colons at all\njust prose\n").is_none());
    }

    #[test]
    fn test_colon_past_limit_is_not_a_header() {
        let far = format!("{}: value\n", "x".repeat(MAX_COLON_DISTANCE + 10));
        assert!(!is_header_line(far.trim_end()));
        assert!(is_header_line("Subject: ok"));
        assert!(!is_header_line("\tSubject: folded"));
    }

    #[test]
    fn test_decode_base64_word() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SGVsbG8=?="), "Hello");
    }

    #[test]
    fn test_decode_q_word_latin1() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_decode_q_underscores() {
        assert_eq!(
            decode_encoded_words("=?ISO-8859-1?Q?R=E9sum=E9_du_projet?="),
            "Résumé du projet"
        );
    }

    #[test]
    fn test_decode_adjacent_words_drop_gap() {
        assert_eq!(
            decode_encoded_words("=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="),
            "Hola mundo"
        );
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        assert_eq!(
            decode_encoded_words("Re: =?UTF-8?B?SG9sYQ==?= there"),
            "Re: Hola there"
        );
    }

    #[test]
    fn test_decode_unknown_encoding_left_verbatim() {
        let input = "=?UTF-8?X?bogus?=";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_decode_truncated_word_left_verbatim() {
        let input = "=?UTF-8?B?SGVsbG8";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_decode_base64_utf8_japanese() {
        // 山田太郎
        assert_eq!(decode_encoded_words("=?UTF-8?B?5bGx55Sw5aSq6YOO?="), "山田太郎");
    }

    #[test]
    fn test_header_values_decoded_in_map() {
        let block = "Subject: =?UTF-8?B?SGVsbG8=?=\nFrom: a@x.com\n\nbody\n";
        let (headers, _) = split_message(block).unwrap();
        assert_eq!(headers.get("Subject"), Some("Hello"));
    }
}
