//! Lexical extraction of insights/questions/recommendations from a response
//! (§4.4 step 7). Specified as keyword matching, which is crude — kept
//! pluggable behind [`InsightExtractor`] so a smarter strategy can replace
//! the default without touching the pipeline.

/// What step 7 pulls out of a persona's raw response text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub insights: Vec<String>,
    pub questions: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Splits a response into insights, questions and recommendations. The
/// only contract callers (and property tests) may rely on: each returned
/// line is a non-empty line drawn verbatim from `content`.
pub trait InsightExtractor: Send + Sync {
    fn extract(&self, content: &str) -> Extracted;
}

/// The keyword-match extractor named in §4.4 step 7.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInsightExtractor;

const INSIGHT_MARKERS: &[&str] = &["key insight", "important", "crucial"];
const RECOMMENDATION_MARKERS: &[&str] = &["recommend", "suggest", "should"];

impl InsightExtractor for DefaultInsightExtractor {
    fn extract(&self, content: &str) -> Extracted {
        let mut extracted = Extracted::default();
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lower = trimmed.to_lowercase();

            if INSIGHT_MARKERS.iter().any(|m| lower.contains(m)) {
                extracted.insights.push(trimmed.to_string());
            }
            if trimmed.contains('?') {
                extracted.questions.push(trimmed.to_string());
            }
            if RECOMMENDATION_MARKERS.iter().any(|m| lower.contains(m)) {
                extracted.recommendations.push(trimmed.to_string());
            }
        }
        extracted
    }
}
