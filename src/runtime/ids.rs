//! Client-side conversation identifiers.

use chrono::Utc;

/// Produces millisecond-timestamp identifiers for fresh conversations.
///
/// Values are strictly increasing within one process, even when two are
/// requested in the same millisecond. They are not globally unique.
#[derive(Debug, Default)]
pub struct ConversationIds {
    last: u64,
}

impl ConversationIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.last = now.max(self.last + 1);
        self.last.to_string()
    }
}
