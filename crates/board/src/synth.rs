//! Synthesizer (C8): combines accepted per-persona responses into a
//! session's summary, ranked insights, grouped recommendations, and
//! aggregate metrics; also hosts the discussion-mode convergence predicate
//! and divergence flag, and the evaluation/prediction extraction helpers.

use std::collections::{BTreeMap, BTreeSet};

use tracing::instrument;
use uuid::Uuid;

use crate::model::{Response, SessionMetrics};

/// Rank a deduplicated union of insights by `confidence · trait_weight`,
/// where `trait_weight` favors a persona whose expertise overlaps the
/// topic. Ties keep first-seen order (stable sort).
pub fn rank_insights(
    responses: &[Response],
    persona_expertise: &BTreeMap<Uuid, Vec<String>>,
    topic: &str,
    top_n: usize,
) -> Vec<String> {
    let topic_words: BTreeSet<String> = conclave_memory_tokenize(topic);

    let mut seen = BTreeSet::new();
    let mut scored: Vec<(f32, String)> = Vec::new();

    for response in responses {
        let weight = trait_weight(persona_expertise.get(&response.persona_id), &topic_words);
        for insight in &response.insights {
            if seen.insert(insight.clone()) {
                scored.push((response.confidence * weight, insight.clone()));
            }
        }
    }

    scored.sort_by(|(sa, _), (sb, _)| sb.total_cmp(sa));
    scored.into_iter().take(top_n).map(|(_, i)| i).collect()
}

fn trait_weight(expertise: Option<&Vec<String>>, topic_words: &BTreeSet<String>) -> f32 {
    let Some(areas) = expertise else { return 1.0 };
    if areas.is_empty() || topic_words.is_empty() {
        return 1.0;
    }
    let overlapping = areas
        .iter()
        .filter(|area| {
            let area_lower = area.to_lowercase();
            topic_words.iter().any(|w| area_lower.contains(w.as_str()))
        })
        .count();
    1.0 + 0.2 * overlapping as f32
}

fn conclave_memory_tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Recommendations grouped by the persona that made them.
pub fn group_recommendations(responses: &[Response]) -> BTreeMap<Uuid, Vec<String>> {
    let mut grouped: BTreeMap<Uuid, Vec<String>> = BTreeMap::new();
    for response in responses {
        if !response.recommendations.is_empty() {
            grouped.entry(response.persona_id).or_default().extend(response.recommendations.clone());
        }
    }
    grouped
}

pub fn compute_metrics(responses: &[Response]) -> SessionMetrics {
    if responses.is_empty() {
        return SessionMetrics::default();
    }
    let total_confidence: f32 = responses.iter().map(|r| r.confidence).sum();
    let total_tokens: u32 = responses.iter().map(|r| r.token_usage).sum();
    SessionMetrics {
        mean_confidence: total_confidence / responses.len() as f32,
        response_count: responses.len(),
        total_tokens,
        total_duration_ms: 0, // filled in by the orchestrator, which tracks wall-clock time
    }
}

/// A short, deterministic prose summary: persona count, mean confidence,
/// and the single top-ranked insight if any survived ranking.
pub fn build_summary(responses: &[Response], top_insight: Option<&str>) -> String {
    if responses.is_empty() {
        return "No persona produced an accepted response.".to_string();
    }
    let metrics = compute_metrics(responses);
    let mut summary = format!(
        "{} persona(s) responded with mean confidence {:.2}.",
        metrics.response_count, metrics.mean_confidence
    );
    if let Some(insight) = top_insight {
        summary.push_str(&format!(" Leading insight: {insight}"));
    }
    summary
}

/// Cosine-distance proxy over the bag-of-keywords of the last two
/// discussion rounds: Jaccard-style overlap on tokenized content. Returns
/// `true` when the rounds have converged (distance below 0.15).
pub fn has_converged(previous_round: &[Response], current_round: &[Response]) -> bool {
    let prev_words = bag_of_words(previous_round);
    let curr_words = bag_of_words(current_round);
    if prev_words.is_empty() && curr_words.is_empty() {
        return true;
    }
    let intersection = prev_words.intersection(&curr_words).count() as f32;
    let union = prev_words.union(&curr_words).count() as f32;
    let similarity = if union == 0.0 { 1.0 } else { intersection / union };
    let distance = 1.0 - similarity;
    distance < 0.15
}

fn bag_of_words(round: &[Response]) -> BTreeSet<String> {
    round.iter().flat_map(|r| conclave_memory_tokenize(&r.content)).collect()
}

/// Variance of confidence across the final round; divergence is flagged
/// when it exceeds 0.25 (§4.8).
pub fn confidence_variance_exceeds(round: &[Response], threshold: f32) -> bool {
    if round.len() < 2 {
        return false;
    }
    let mean: f32 = round.iter().map(|r| r.confidence).sum::<f32>() / round.len() as f32;
    let variance: f32 =
        round.iter().map(|r| (r.confidence - mean).powi(2)).sum::<f32>() / round.len() as f32;
    variance > threshold
}

/// Evaluation mode: extract `Criterion: Score` lines (score in `[0, 10]`)
/// from every response and average per criterion across personas.
#[instrument(skip(responses))]
pub fn extract_evaluation_scores(responses: &[Response]) -> BTreeMap<String, f32> {
    let mut totals: BTreeMap<String, (f32, u32)> = BTreeMap::new();
    for response in responses {
        for line in response.content.lines() {
            let Some((criterion, rest)) = line.split_once(':') else { continue };
            let criterion = criterion.trim();
            if criterion.is_empty() || criterion.len() > 64 {
                continue;
            }
            let Some(score) = rest.trim().split_whitespace().next().and_then(|s| s.parse::<f32>().ok()) else {
                continue;
            };
            if !(0.0..=10.0).contains(&score) {
                continue;
            }
            let entry = totals.entry(criterion.to_string()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }
    totals.into_iter().map(|(k, (sum, count))| (k, sum / count as f32)).collect()
}

/// Prediction mode: lines that carry an elicited probability ("%" or the
/// word "probability").
pub fn extract_forecasts(responses: &[Response]) -> Vec<String> {
    responses
        .iter()
        .flat_map(|r| r.content.lines())
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains('%') || lower.contains("probability") || lower.contains("likely")
        })
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn response(persona_id: Uuid, confidence: f32, content: &str, insights: Vec<&str>) -> Response {
        Response {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            persona_id,
            content: content.to_string(),
            reasoning_tag: "Mixed".to_string(),
            confidence,
            emotional_tone: "balanced".to_string(),
            turn_order: 0,
            memories_used: vec![],
            traits_influence: BTreeMap::new(),
            token_usage: 10,
            created_at: Utc::now(),
            insights: insights.into_iter().map(String::from).collect(),
            recommendations: vec![],
        }
    }

    #[test]
    fn rank_insights_dedupes_and_orders_by_confidence() {
        let persona_a = Uuid::new_v4();
        let persona_b = Uuid::new_v4();
        let responses = vec![
            response(persona_a, 0.9, "content a", vec!["growth is key"]),
            response(persona_b, 0.5, "content b", vec!["growth is key", "risk matters"]),
        ];
        let ranked = rank_insights(&responses, &BTreeMap::new(), "growth", 5);
        assert_eq!(ranked.len(), 2); // "growth is key" deduped across personas
        assert_eq!(ranked[0], "growth is key");
    }

    #[test]
    fn expertise_overlap_increases_trait_weight() {
        let persona = Uuid::new_v4();
        let mut expertise = BTreeMap::new();
        expertise.insert(persona, vec!["pricing strategy".to_string()]);
        let weight = trait_weight(expertise.get(&persona), &conclave_memory_tokenize("pricing"));
        assert!(weight > 1.0);
    }

    #[test]
    fn converged_rounds_with_identical_content_detected() {
        let persona = Uuid::new_v4();
        let round = vec![response(persona, 0.8, "the market is stable and growing", vec![])];
        assert!(has_converged(&round, &round));
    }

    #[test]
    fn divergence_flag_set_above_variance_threshold() {
        let a = response(Uuid::new_v4(), 0.1, "x", vec![]);
        let b = response(Uuid::new_v4(), 0.9, "y", vec![]);
        assert!(confidence_variance_exceeds(&[a, b], 0.25));
    }

    #[test]
    fn evaluation_scores_average_across_personas() {
        let a = response(Uuid::new_v4(), 0.8, "Feasibility: 8\nRisk: 4", vec![]);
        let b = response(Uuid::new_v4(), 0.8, "Feasibility: 6", vec![]);
        let scores = extract_evaluation_scores(&[a, b]);
        assert_eq!(scores.get("Feasibility"), Some(&7.0));
        assert_eq!(scores.get("Risk"), Some(&4.0));
    }

    #[test]
    fn forecasts_capture_probability_lines() {
        let a = response(Uuid::new_v4(), 0.8, "There is a 70% chance of adoption.\nOther line.", vec![]);
        let forecasts = extract_forecasts(&[a]);
        assert_eq!(forecasts.len(), 1);
        assert!(forecasts[0].contains("70%"));
    }
}
