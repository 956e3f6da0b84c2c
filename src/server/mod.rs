mod admin;
pub mod dto;
mod member;
pub mod response;
mod router;
mod session;
pub mod validation;

pub use admin::admin_router;
pub use member::member_router;
pub use router::{AppState, create_router};
pub use session::auth_router;
