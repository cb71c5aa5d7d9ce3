//! Self-email classification against configured identity lists.

use crate::config::IdentitySettings;
use crate::model::address::EmailAddress;

/// Decides whether a message is self-addressed or ignorable noise.
///
/// Matching is case-insensitive substring in one direction only: a
/// configured fragment must occur inside the message field. Fragments are
/// lowercased once at construction; the identity lists are read-only for
/// the classifier's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SelfEmailClassifier {
    ignored_senders: Vec<String>,
    my_addresses: Vec<String>,
    my_names: Vec<String>,
}

impl SelfEmailClassifier {
    /// Build a classifier from explicit identity configuration.
    pub fn new(identity: &IdentitySettings) -> Self {
        fn lowered(fragments: &[String]) -> Vec<String> {
            fragments.iter().map(|s| s.to_lowercase()).collect()
        }
        Self {
            ignored_senders: lowered(&identity.ignored_senders),
            my_addresses: lowered(&identity.my_addresses),
            my_names: lowered(&identity.my_names),
        }
    }

    /// `true` when the message should be dropped.
    ///
    /// An ignored sender excludes outright, regardless of recipient.
    /// Otherwise exclusion requires BOTH the sender and at least one
    /// recipient to match the configured identity: a message merely *from*
    /// the user to someone else is kept.
    pub fn is_excluded(&self, from: &str, to: &str) -> bool {
        if self.is_ignored_sender(from) {
            return true;
        }
        self.is_me(&EmailAddress::parse(from))
            && EmailAddress::parse_list(to)
                .iter()
                .any(|entry| self.is_me(entry))
    }

    /// Ignored-sender fragments match the raw field or its display name.
    fn is_ignored_sender(&self, from: &str) -> bool {
        if self.ignored_senders.is_empty() {
            return false;
        }
        let raw = from.to_lowercase();
        let name = EmailAddress::parse(from).display_name.to_lowercase();
        self.ignored_senders
            .iter()
            .any(|frag| raw.contains(frag.as_str()) || name.contains(frag.as_str()))
    }

    /// Addresses match `my_addresses` fragments, names match `my_names`.
    fn is_me(&self, entry: &EmailAddress) -> bool {
        let address = entry.address.to_lowercase();
        let name = entry.display_name.to_lowercase();
        (!address.is_empty()
            && self
                .my_addresses
                .iter()
                .any(|frag| address.contains(frag.as_str())))
            || (!name.is_empty()
                && self.my_names.iter().any(|frag| name.contains(frag.as_str())))
    }
}
