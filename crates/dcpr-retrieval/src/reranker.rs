use dcpr_core::error::{DcprError, Result};
use dcpr_core::models::ScoredPassage;
use dcpr_llm::ports::CrossEncoder;
use std::cmp::Ordering;

use crate::models::RankedPassage;

/// Reorders candidates by cross-encoder relevance and keeps the best `top_n`
pub struct Reranker<C: CrossEncoder> {
    encoder: C,
}

impl<C: CrossEncoder> Reranker<C> {
    pub fn new(encoder: C) -> Self {
        Self { encoder }
    }

    pub fn model_name(&self) -> &str {
        self.encoder.model_name()
    }

    /// Score every candidate jointly with `query` and return at most `top_n`
    /// of them, most relevant first.
    ///
    /// The sort is stable, so equal scores keep candidate order. NaN scores
    /// rank below every number.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<ScoredPassage>,
        top_n: usize,
    ) -> Result<Vec<RankedPassage>> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = candidates.iter().map(|c| c.passage.text.as_str()).collect();
        let scores = self.encoder.score(query, &texts).await?;

        if scores.len() != candidates.len() {
            return Err(DcprError::RerankerUnavailable {
                reason: format!(
                    "cross-encoder returned {} scores for {} passages",
                    scores.len(),
                    candidates.len()
                ),
                remediation: format!("Check the reranker serving '{}'", self.encoder.model_name()),
            });
        }

        let mut ranked: Vec<RankedPassage> = candidates
            .into_iter()
            .zip(scores)
            .map(|(candidate, relevance)| RankedPassage {
                passage: candidate.passage,
                similarity: candidate.score,
                relevance,
            })
            .collect();

        ranked.sort_by(|a, b| by_relevance_desc(a.relevance, b.relevance));
        ranked.truncate(top_n);

        tracing::debug!(
            model = self.encoder.model_name(),
            kept = ranked.len(),
            top_score = ranked.first().map(|r| r.relevance),
            "Candidates reranked"
        );

        Ok(ranked)
    }
}

fn by_relevance_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
