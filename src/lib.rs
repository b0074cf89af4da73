//! Library exports for todoclient, shared between the binary and tests.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod startup;
pub mod state;
pub mod store;
pub mod utils;

pub use error::{ClientError, Result};
pub use state::Session;
