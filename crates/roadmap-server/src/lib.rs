//! Roadmap Server
//!
//! HTTP surface for quota-governed roadmap generation and report storage.
//!
//! # Layout
//!
//! - [`config`]: TOML-backed [`ServerConfig`]
//! - [`cli`]: argument parsing and override merging
//! - [`logging`]: tracing subscriber setup
//! - [`openai`]: the chat-completions [`ContentGenerator`](roadmap_core::ContentGenerator)
//! - [`state`]: [`AppState`] wiring stores, governor and generator together
//! - [`routes`] and [`handlers`]: the warp filter tree and its endpoints
//! - [`reply`]: error-to-response mapping
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ServerConfig::new().with_database("memory");
//! let state = AppState::from_config(&config).await?;
//! warp::serve(routes(state, config.max_body_bytes)).run(config.bind).await;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod openai;
pub mod reply;
pub mod routes;
pub mod state;

pub use config::{ConfigError, Environment, GeneratorConfig, LogConfig, LogFormat, ServerConfig};
pub use openai::OpenAiGenerator;
pub use routes::routes;
pub use state::{AppState, StartupError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
