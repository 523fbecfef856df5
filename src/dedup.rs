use std::collections::HashSet;

/// Compose the stable identity of a record: `at://{did}/{collection}/{rkey}`.
pub fn compose_uri(originator_id: &str, collection: &str, record_key: &str) -> String {
    format!("at://{originator_id}/{collection}/{record_key}")
}

/// Remembers every uri seen during a run so a post observed twice is only
/// offered to the reservoir once.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `uri`; returns `true` the first time it is seen.
    pub fn first_sighting(&mut self, uri: &str) -> bool {
        if self.seen.contains(uri) {
            return false;
        }
        self.seen.insert(uri.to_owned())
    }
}
