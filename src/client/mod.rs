//! Authenticated access to the to-do API.
//!
//! Every request goes through [`ApiClient`], which attaches the bearer token
//! from the injected [`TokenStore`](crate::store::TokenStore) and performs a
//! single refresh-and-retry when the API answers 401.

pub mod api_client;
pub mod navigator;
pub mod request;

pub use api_client::ApiClient;
pub use navigator::{LoggingNavigator, Navigator};
pub use request::ApiRequest;
