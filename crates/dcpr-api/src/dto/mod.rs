mod request;
mod response;

pub use request::{AskRequest, FeedbackRequest, FeedbackScore};
pub use response::{
    AskResponse, HealthResponse, ReloadResponse, SessionDetailResponse, SessionResponse,
};
