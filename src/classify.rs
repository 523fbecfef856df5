use std::fmt;

use crate::dedup::compose_uri;
use crate::document::CandidateItem;
use crate::event::Event;

/// Why an event was not accepted. Only used for logging and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    Malformed,
    NoCommit,
    NotCreate,
    EmptyText,
    Language,
    MissingIdentity,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rejection::Malformed => "malformed",
            Rejection::NoCommit => "no commit",
            Rejection::NotCreate => "not a create",
            Rejection::EmptyText => "empty text",
            Rejection::Language => "language mismatch",
            Rejection::MissingIdentity => "missing identity",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept(CandidateItem),
    Reject(Rejection),
}

/// Decides whether a stream event is a freshly created post in the target
/// language.
#[derive(Debug, Clone)]
pub struct Classifier {
    language: String,
}

impl Classifier {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Decode and classify a raw frame.
    pub fn classify_raw(&self, raw: &str) -> Verdict {
        match Event::parse(raw) {
            Some(evt) => self.classify(evt),
            None => Verdict::Reject(Rejection::Malformed),
        }
    }

    /// Checks run in a fixed order and stop at the first failure.
    pub fn classify(&self, event: Event) -> Verdict {
        let Some(commit) = event.commit else {
            return Verdict::Reject(Rejection::NoCommit);
        };
        if commit.operation.as_deref() != Some("create") {
            return Verdict::Reject(Rejection::NotCreate);
        }
        let Some(record) = commit.record else {
            return Verdict::Reject(Rejection::EmptyText);
        };
        if record.text.as_deref().is_none_or(str::is_empty) {
            return Verdict::Reject(Rejection::EmptyText);
        }
        let speaks = record
            .langs
            .as_ref()
            .is_some_and(|langs| langs.iter().any(|l| *l == self.language));
        if !speaks {
            return Verdict::Reject(Rejection::Language);
        }
        let (Some(did), Some(collection), Some(rkey)) = (event.did, commit.collection, commit.rkey)
        else {
            return Verdict::Reject(Rejection::MissingIdentity);
        };
        Verdict::Accept(CandidateItem {
            uri: compose_uri(&did, &collection, &rkey),
            originator_id: did,
            record_key: rkey,
            record,
        })
    }
}
