pub mod auth;
pub mod request_id;

pub use auth::{bearer_token, extract_current_user, CurrentUser};
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
