//! Short-term → long-term consolidation: similarity pairing, the merge rule,
//! and the decay pass that follows every consolidation.

use std::collections::VecDeque;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::schema::{MemoryConfig, MemoryEntry};
use crate::score::tokenize;

fn jaccard<T: Eq + std::hash::Hash + Clone>(a: &[T], b: &[T]) -> f32 {
    use std::collections::HashSet;
    let sa: HashSet<&T> = a.iter().collect();
    let sb: HashSet<&T> = b.iter().collect();
    if sa.is_empty() && sb.is_empty() {
        return 0.0;
    }
    let inter = sa.intersection(&sb).count() as f32;
    let union = sa.union(&sb).count() as f32;
    if union == 0.0 { 0.0 } else { inter / union }
}

/// `e1` and `e2` are similar enough to merge: same type, within an hour of
/// each other, and either their tag sets or their long-word content
/// overlap substantially.
fn similar(e1: &MemoryEntry, e2: &MemoryEntry) -> bool {
    if std::mem::discriminant(&e1.entry_type) != std::mem::discriminant(&e2.entry_type) {
        return false;
    }
    let dt = (e1.timestamp - e2.timestamp).num_seconds().abs();
    if dt > 3600 {
        return false;
    }

    let tag_sim = jaccard(&e1.tags, &e2.tags);
    if tag_sim > 0.3 {
        return true;
    }

    let words_a: Vec<String> = tokenize(&e1.content).into_iter().filter(|w| w.len() > 3).collect();
    let words_b: Vec<String> = tokenize(&e2.content).into_iter().filter(|w| w.len() > 3).collect();
    jaccard(&words_a, &words_b) > 0.2
}

/// Merge two similar entries into one long-term entry.
fn merge_entries(e1: &MemoryEntry, e2: &MemoryEntry) -> MemoryEntry {
    let (newer, older) = if e1.timestamp >= e2.timestamp { (e1, e2) } else { (e2, e1) };

    let mut tags = older.tags.clone();
    for t in &newer.tags {
        if !tags.contains(t) {
            tags.push(t.clone());
        }
    }

    MemoryEntry {
        id: Uuid::new_v4(),
        entry_type: newer.entry_type,
        content: format!("[consolidated] {} | {}", older.content, newer.content),
        tags,
        context_map: newer.context_map.clone(),
        timestamp: newer.timestamp,
        weight: (e1.weight + e2.weight) / 2.0,
        decay: (e1.decay + e2.decay) / 2.0,
    }
}

/// Sort `short_term` by `weight·decay` desc (ties by recency desc), keep the
/// top half in place, and pairwise-merge the bottom half by similarity,
/// returning the entries to append to long-term. Entries in the bottom half
/// that can't be paired are carried over to long-term unmerged rather than
/// dropped.
pub(crate) fn consolidate(short_term: &mut VecDeque<MemoryEntry>) -> Vec<MemoryEntry> {
    let mut ordered: Vec<MemoryEntry> = short_term.drain(..).collect();
    ordered.sort_by(|a, b| {
        let sa = a.weight * a.decay;
        let sb = b.weight * b.decay;
        sb.total_cmp(&sa).then_with(|| b.timestamp.cmp(&a.timestamp))
    });

    let keep = ordered.len().div_ceil(2);
    let (top, bottom) = ordered.split_at(keep);

    *short_term = top.iter().cloned().collect();

    let mut pool: VecDeque<MemoryEntry> = bottom.iter().cloned().collect();
    let mut promoted = Vec::new();

    while let Some(candidate) = pool.pop_front() {
        let partner_idx = pool.iter().position(|other| similar(&candidate, other));
        match partner_idx {
            Some(idx) => {
                let partner = pool.remove(idx).unwrap();
                promoted.push(merge_entries(&candidate, &partner));
            }
            None => promoted.push(candidate),
        }
    }

    debug!(kept = top.len(), promoted = promoted.len(), "consolidated short-term memory");
    promoted
}

/// Decay every long-term entry by its age in days, then evict anything below
/// `decay_floor`. Run after every consolidation.
pub(crate) fn decay_pass(long_term: &mut Vec<MemoryEntry>, config: &MemoryConfig) {
    let now = Utc::now();
    for entry in long_term.iter_mut() {
        let age_days = (now - entry.timestamp).num_seconds().max(0) as f32 / 86_400.0;
        entry.decay *= config.decay_rate * (1.0 / (1.0 + 0.1 * age_days));
    }
    long_term.retain(|e| e.decay >= config.decay_floor);

    if long_term.len() > config.long_term_limit {
        long_term.sort_by(|a, b| (b.weight * b.decay).total_cmp(&(a.weight * a.decay)));
        long_term.truncate(config.long_term_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MemoryEntryType;

    fn entry(content: &str, weight: f32, tags: &[&str]) -> MemoryEntry {
        MemoryEntry::new(MemoryEntryType::Interaction, content)
            .with_weight(weight)
            .with_tags(tags.iter().map(|s| s.to_string()))
    }

    #[test]
    fn consolidate_keeps_top_half_in_short_term() {
        let mut st: VecDeque<MemoryEntry> = (0..10)
            .map(|i| entry(&format!("entry {i}"), i as f32 / 10.0, &[]))
            .collect();
        let promoted = consolidate(&mut st);
        assert_eq!(st.len(), 5);
        assert_eq!(promoted.len(), 5);
    }

    #[test]
    fn similar_entries_merge_into_one() {
        let mut st: VecDeque<MemoryEntry> = VecDeque::new();
        st.push_back(entry("budget review meeting notes", 0.1, &["finance"]));
        st.push_back(entry("budget review meeting followups", 0.1, &["finance"]));
        let promoted = consolidate(&mut st);
        assert_eq!(promoted.len(), 1);
        assert!(promoted[0].content.starts_with("[consolidated]"));
    }

    #[test]
    fn no_entry_is_lost_during_consolidation() {
        let mut st: VecDeque<MemoryEntry> = (0..7)
            .map(|i| entry(&format!("unrelated topic number {i}"), 0.1, &[]))
            .collect();
        let before = st.len();
        let promoted = consolidate(&mut st);
        assert!(st.len() + promoted.len() >= before);
    }

    #[test]
    fn decay_pass_evicts_below_floor() {
        let config = MemoryConfig { decay_floor: 0.5, ..Default::default() };
        let mut lt = vec![entry("old fact", 0.5, &[])];
        lt[0].decay = 0.01;
        decay_pass(&mut lt, &config);
        assert!(lt.is_empty());
    }

    #[test]
    fn decay_pass_evicts_excess_beyond_limit() {
        let config = MemoryConfig { long_term_limit: 2, decay_floor: 0.0, ..Default::default() };
        let mut lt: Vec<MemoryEntry> = (0..5).map(|i| entry(&format!("fact {i}"), 1.0, &[])).collect();
        decay_pass(&mut lt, &config);
        assert_eq!(lt.len(), 2);
    }
}
