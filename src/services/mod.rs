//! Typed operations over the request client and the cache.

pub mod auth;
pub mod todos;

pub use auth::AuthService;
pub use todos::TodoService;
