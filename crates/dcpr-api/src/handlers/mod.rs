mod health;
mod index;
mod sessions;

pub use health::health_check;
pub use index::reload_index;
pub use sessions::{
    ask, clear_history, create_session, delete_session, get_session, list_sessions,
    submit_feedback,
};
