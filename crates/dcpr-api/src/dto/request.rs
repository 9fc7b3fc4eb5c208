use serde::Deserialize;

/// Ask request body
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Thumbs up or down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackScore {
    Up,
    Down,
}

/// Feedback on one assistant turn of a session
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    /// Index into the session history
    pub turn: usize,
    pub score: FeedbackScore,
    #[serde(default)]
    pub comment: Option<String>,
}
