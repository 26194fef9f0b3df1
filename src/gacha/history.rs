//! Pull history log and the discovery index.

use chrono::{DateTime, Utc};

use super::types::{Account, DrawResult, PullRecord, HISTORY_LIMIT};

/// Append a pull snapshot, evicting the oldest entries past [`HISTORY_LIMIT`].
pub fn record_pull(account: &mut Account, draw: &DrawResult, now: DateTime<Utc>) {
    account.history.push_back(PullRecord::new(draw, now));
    while account.history.len() > HISTORY_LIMIT {
        account.history.pop_front();
    }
}

/// Add `unit_name` to the discovery index. Returns true if it was new.
pub fn discover(account: &mut Account, unit_name: &str) -> bool {
    if is_discovered(account, unit_name) {
        return false;
    }
    account.index.push(unit_name.to_string());
    true
}

/// Discovery is permanent: selling every copy does not undo it.
pub fn is_discovered(account: &Account, unit_name: &str) -> bool {
    account.index.iter().any(|name| name == unit_name)
}

pub fn discovery_count(account: &Account) -> usize {
    account.index.len()
}
