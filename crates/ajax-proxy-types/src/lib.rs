//! # AJAX Proxy Types
//!
//! Configuration models and error definitions for the AJAX proxy relay.
//!
//! - **`config`** - Relay configuration (CORS, redirect limits, outbound proxy)
//! - **`error`** - Typed configuration errors
//!
//! ## Architecture Role
//!
//! ```text
//!   ajax-proxy-types (this crate)
//!            │
//!            ▼
//!   ajax-proxy-core (relay + router)
//! ```
//!
//! Everything here is serializable and free of any HTTP stack so it can be
//! shared with embedding applications that only need to read or write config.

pub mod config;
pub mod error;

pub use config::{RelayConfig, UpstreamProxyConfig, DEFAULT_ALLOWED_ORIGIN};
pub use error::ConfigError;
