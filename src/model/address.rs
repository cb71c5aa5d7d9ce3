//! Email address extraction from header fields.

/// Address and display name pulled out of a `From:` or `To:` field.
///
/// Extraction is deliberately loose: real mailboxes contain fields like
/// `"Last, First" <user@host>`, bare addresses, and plain names with no
/// address at all.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
/// - `"Postmaster"` → `display_name = "Postmaster"`, `address = ""`
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`, may be empty).
    pub address: String,
}

impl EmailAddress {
    /// Extract address and display name from a single header entry.
    ///
    /// Angle-bracketed addresses win; otherwise the first `@`-bearing token
    /// is taken as the address. A field with neither brackets nor an `@`
    /// is treated as a display name only.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        // "Display Name <address>" or "<address>"
        if let Some(open) = trimmed.find('<') {
            let inner = &trimmed[open + 1..];
            let address = match inner.find('>') {
                Some(close) => &inner[..close],
                None => inner,
            };
            return Self {
                display_name: strip_quotes(&trimmed[..open]),
                address: address.trim().to_string(),
            };
        }

        // Bare address somewhere in the field
        if let Some(address) = first_bare_address(trimmed) {
            return Self {
                display_name: String::new(),
                address: address.to_string(),
            };
        }

        // No address at all: the whole field is a name
        Self {
            display_name: trimmed.to_string(),
            address: String::new(),
        }
    }

    /// Parse a comma-separated list of entries.
    ///
    /// Handles quoted commas: `"Last, First" <a@b.com>, other@c.com`.
    /// Entries that yield neither an address nor a name are skipped.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;

        for ch in raw.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '<' if !in_quotes => {
                    in_angle = true;
                    current.push(ch);
                }
                '>' if !in_quotes => {
                    in_angle = false;
                    current.push(ch);
                }
                ',' if !in_quotes && !in_angle => {
                    let entry = Self::parse(&current);
                    if !entry.is_empty() {
                        results.push(entry);
                    }
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        // Last segment
        let entry = Self::parse(&current);
        if !entry.is_empty() {
            results.push(entry);
        }

        results
    }

    /// Both address and display name are empty.
    pub fn is_empty(&self) -> bool {
        self.address.is_empty() && self.display_name.is_empty()
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else if self.address.is_empty() {
            self.display_name.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// First whitespace- or separator-delimited token containing `@`, with
/// surrounding punctuation removed.
fn first_bare_address(field: &str) -> Option<&str> {
    field
        .split([' ', '\t', ',', ';'])
        .map(|tok| tok.trim_matches(['<', '>', '"', '\'', '(', ')', ':', ';', ',']))
        .find(|tok| {
            tok.len() > 2 && tok.contains('@') && !tok.starts_with('@') && !tok.ends_with('@')
        })
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let entry = EmailAddress::parse("user@example.com");
        assert_eq!(entry.address, "user@example.com");
        assert_eq!(entry.display_name, "");
    }

    #[test]
    fn test_parse_angle_address() {
        let entry = EmailAddress::parse("<user@example.com>");
        assert_eq!(entry.address, "user@example.com");
        assert_eq!(entry.display_name, "");
    }

    #[test]
    fn test_parse_name_and_address() {
        let entry = EmailAddress::parse("User One <user1@example.com>");
        assert_eq!(entry.address, "user1@example.com");
        assert_eq!(entry.display_name, "User One");
    }

    #[test]
    fn test_parse_quoted_name() {
        let entry = EmailAddress::parse("\"Last, First\" <user@example.com>");
        assert_eq!(entry.address, "user@example.com");
        assert_eq!(entry.display_name, "Last, First");
    }

    #[test]
    fn test_parse_bare_address_inside_text() {
        let entry = EmailAddress::parse("reply to user@example.com please");
        assert_eq!(entry.address, "user@example.com");
        assert_eq!(entry.display_name, "");
    }

    #[test]
    fn test_parse_name_without_address() {
        let entry = EmailAddress::parse("Mail Delivery Subsystem");
        assert_eq!(entry.address, "");
        assert_eq!(entry.display_name, "Mail Delivery Subsystem");
    }

    #[test]
    fn test_parse_list() {
        let list =
            EmailAddress::parse_list("User One <a@b.com>, User Two <c@d.com>, plain@addr.com");
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].address, "a@b.com");
        assert_eq!(list[1].display_name, "User Two");
        assert_eq!(list[2].address, "plain@addr.com");
    }

    #[test]
    fn test_parse_list_with_quoted_comma() {
        let list = EmailAddress::parse_list("\"Last, First\" <a@b.com>, other@c.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Last, First");
        assert_eq!(list[0].address, "a@b.com");
    }

    #[test]
    fn test_parse_list_keeps_name_only_entries() {
        let list = EmailAddress::parse_list("Undisclosed Recipients, b@c.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Undisclosed Recipients");
        assert_eq!(list[0].address, "");
    }

    #[test]
    fn test_display_with_name() {
        let entry = EmailAddress {
            display_name: "Alice".to_string(),
            address: "alice@example.com".to_string(),
        };
        assert_eq!(entry.display(), "Alice <alice@example.com>");
    }

    #[test]
    fn test_parse_empty() {
        let entry = EmailAddress::parse("");
        assert!(entry.is_empty());
    }
}
