//! Query enhancement.
//!
//! Casual phrasing rarely contains the vocabulary the knowledge base is
//! written in ("when do they pick up trash" vs "collection schedule
//! zones"). Before retrieval the question is matched against topic
//! triggers and, on the first hit, a fixed keyword suffix is appended to
//! pull the embedding toward domain terms. The original question is kept
//! for generation; only retrieval sees the enhanced form.

/// Trigger terms and the suffix they select, checked in order; the first
/// matching row wins.
const TOPIC_TRIGGERS: [(&[&str], &str); 5] = [
    (&["permit", "building"], "form requirements fees process"),
    (&["business", "license"], "application fees requirements renewal"),
    (&["garbage", "waste", "collection"], "schedule zones pickup days"),
    (&["library", "hours"], "opening times schedule location"),
    (&["sector", "zone"], "waste collection schedule zones"),
];

/// Append the suffix of the first matching topic, if any. Matching is a
/// case-insensitive substring test.
pub fn enhance_query(question: &str) -> String {
    let lowered = question.to_lowercase();

    for (triggers, suffix) in TOPIC_TRIGGERS {
        if triggers.iter().any(|t| lowered.contains(t)) {
            return format!("{} {}", question, suffix);
        }
    }

    question.to_string()
}
