//! Run reporting helpers over extracted records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::address::EmailAddress;
use crate::model::message::MessageRecord;

/// Date range (oldest, newest) across records with a parseable date.
pub fn date_range(records: &[MessageRecord]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut dates = records.iter().filter_map(|r| r.parsed_date);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

/// Top `n` senders by record count, name preferred over address.
pub fn top_senders(records: &[MessageRecord], n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        let sender = EmailAddress::parse(&record.from);
        let key = if !sender.display_name.is_empty() {
            sender.display_name
        } else if !sender.address.is_empty() {
            sender.address
        } else {
            record.from.clone()
        };
        *counts.entry(key).or_default() += 1;
    }

    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}
