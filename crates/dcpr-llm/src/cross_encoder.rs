use async_trait::async_trait;
use dcpr_core::error::{DcprError, Result};
use serde::{Deserialize, Serialize};

use crate::ports::CrossEncoder;

/// Cross-encoder served behind a `/rerank` endpoint in the
/// text-embeddings-inference format
pub struct HttpCrossEncoder {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl HttpCrossEncoder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    fn unavailable(&self, reason: String) -> DcprError {
        DcprError::RerankerUnavailable {
            reason,
            remediation: format!(
                "Ensure a rerank server for '{}' is running at {}",
                self.model, self.base_url
            ),
        }
    }
}

#[async_trait]
impl CrossEncoder for HttpCrossEncoder {
    async fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let request = RerankRequest {
            query,
            texts: passages,
            raw_scores: true,
        };

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.unavailable(format!("Failed to connect to reranker: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("Reranker error ({}): {}", status, error_text)));
        }

        let ranked: Vec<RankedText> = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("Failed to parse reranker response: {}", e)))?;

        scores_in_input_order(ranked, passages.len()).map_err(|reason| self.unavailable(reason))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// The server returns entries sorted by score; put them back in input order.
fn scores_in_input_order(ranked: Vec<RankedText>, expected: usize) -> std::result::Result<Vec<f32>, String> {
    let mut scores = vec![None; expected];

    for entry in ranked {
        let slot = scores
            .get_mut(entry.index)
            .ok_or_else(|| format!("Reranker returned out-of-range index {}", entry.index))?;
        *slot = Some(entry.score);
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(i, score)| score.ok_or_else(|| format!("Reranker returned no score for passage {}", i)))
        .collect()
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [&'a str],
    raw_scores: bool,
}

#[derive(Debug, Deserialize)]
struct RankedText {
    index: usize,
    score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_reordered_to_input() {
        let ranked = vec![
            RankedText { index: 2, score: 0.9 },
            RankedText { index: 0, score: 0.5 },
            RankedText { index: 1, score: -1.0 },
        ];

        assert_eq!(scores_in_input_order(ranked, 3).unwrap(), vec![0.5, -1.0, 0.9]);
    }

    #[test]
    fn test_missing_score_is_error() {
        let ranked = vec![RankedText { index: 0, score: 0.5 }];
        assert!(scores_in_input_order(ranked, 2).is_err());

        let ranked = vec![RankedText { index: 5, score: 0.5 }];
        assert!(scores_in_input_order(ranked, 1).is_err());
    }

    #[tokio::test]
    async fn test_score_over_http() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rerank")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"query":"fsi","texts":["a","b"],"raw_scores":true}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"[{"index":1,"score":3.5},{"index":0,"score":-2.0}]"#)
            .create_async()
            .await;

        let encoder = HttpCrossEncoder::new(server.url(), "ms-marco");
        let scores = encoder.score("fsi", &["a", "b"]).await.unwrap();

        assert_eq!(scores, vec![-2.0, 3.5]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_passages_skip_request() {
        let encoder = HttpCrossEncoder::new("http://127.0.0.1:9", "ms-marco");
        assert!(encoder.score("q", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/rerank").with_status(500).create_async().await;

        let encoder = HttpCrossEncoder::new(server.url(), "ms-marco");
        let err = encoder.score("q", &["a"]).await.unwrap_err();

        assert!(matches!(err, DcprError::RerankerUnavailable { .. }));
    }
}
