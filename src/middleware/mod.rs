pub mod auth;

#[allow(unused_imports)]
pub use auth::{AuthUser, Claims};
