pub mod chat;
pub mod health;

pub use chat::{
    clear_history, create_session, get_history, get_images, get_records, get_session,
    post_message, update_settings,
};
pub use health::{health_check, readiness_check, service_status};
