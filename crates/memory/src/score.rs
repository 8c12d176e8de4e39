//! Relevance scoring of memory entries against a prompt.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::schema::MemoryEntry;

/// Below this score an entry is not considered a match.
pub(crate) const SCORE_THRESHOLD: f32 = 0.1;

/// Lowercased, alphanumeric-delimited tokens of `text`. Unlike a full-text
/// search index this keeps every token, including short ones — the scoring
/// formula only needs substring containment, not stopword filtering.
pub(crate) fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn recency_bonus(now: DateTime<Utc>, timestamp: DateTime<Utc>) -> f32 {
    let age_hours = (now - timestamp).num_seconds().max(0) as f32 / 3600.0;
    if age_hours < 1.0 {
        1.2
    } else if age_hours < 24.0 {
        1.1
    } else {
        1.0
    }
}

/// A query word `w` "relates to" a tag `t` if either contains the other,
/// case-insensitively.
fn word_matches_tag(word: &str, tag: &str) -> bool {
    let tag = tag.to_lowercase();
    tag.contains(word) || word.contains(tag.as_str())
}

/// Score `entry` against tokenized prompt words `query_words` and the raw
/// `prompt` (needed for the context-map substring test). Returns `None` if
/// the score falls at or below [`SCORE_THRESHOLD`].
pub(crate) fn score(
    entry: &MemoryEntry,
    prompt: &str,
    query_words: &BTreeSet<String>,
    now: DateTime<Utc>,
) -> Option<f32> {
    let content_lower = entry.content.to_lowercase();
    let content_component: f32 = query_words
        .iter()
        .filter(|w| content_lower.contains(w.as_str()))
        .count() as f32
        * 0.5;

    let tag_component: f32 = entry
        .tags
        .iter()
        .map(|tag| {
            query_words.iter().filter(|w| word_matches_tag(w, tag)).count() as f32
        })
        .sum::<f32>()
        * 0.3;

    let prompt_lower = prompt.to_lowercase();
    let context_component: f32 = entry
        .context_map
        .iter()
        .filter(|(k, v)| {
            prompt_lower.contains(&k.to_lowercase()) || prompt_lower.contains(&v.to_lowercase())
        })
        .count() as f32
        * 0.2;

    let base = content_component + tag_component + context_component;
    let score = base
        * entry.decay
        * entry.weight
        * recency_bonus(now, entry.timestamp)
        * entry.entry_type.type_bonus();

    trace!(id = %entry.id, score, "scored memory entry");

    if score > SCORE_THRESHOLD { Some(score) } else { None }
}

/// Rank `entries` against `prompt`, returning the top `limit` by score
/// (descending), ties broken by most-recent first.
pub(crate) fn rank<'a>(
    entries: impl IntoIterator<Item = &'a MemoryEntry>,
    prompt: &str,
    limit: usize,
) -> Vec<MemoryEntry> {
    let query_words = tokenize(prompt);
    let now = Utc::now();

    let mut scored: Vec<(f32, &MemoryEntry)> = entries
        .into_iter()
        .filter_map(|e| score(e, prompt, &query_words, now).map(|s| (s, e)))
        .collect();

    scored.sort_by(|(sa, ea), (sb, eb)| {
        sb.total_cmp(sa).then_with(|| eb.timestamp.cmp(&ea.timestamp))
    });

    scored.into_iter().take(limit).map(|(_, e)| e.clone()).collect()
}
