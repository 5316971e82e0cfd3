//! Feed API boundary for pagefeed.
//!
//! [`FeedClient`] is the one-request-per-page contract the controller talks
//! to. [`RestFeedClient`] implements it over HTTP; it performs no caching and
//! no retries.

pub mod api_client;
pub mod config;
pub mod credential;
pub mod wire;

pub use api_client::{ClientError, FeedClient, FeedRequest, RestFeedClient};
pub use config::{ConfigError, FeedConfig, DEFAULT_FEATURE};
pub use credential::ApiCredential;
