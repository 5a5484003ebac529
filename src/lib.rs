//! # taskgate
//!
//! An HTTP gateway for submitting named tasks, polling their status and
//! listing what was submitted. Task lifecycle and metadata coordination live
//! in the [`taskgate_tasks`] crate; this crate puts it behind `axum`,
//! loads configuration and runs the process.
//!
//! ```no_run
//! use taskgate::app::Gateway;
//! use taskgate::config::GatewayConfig;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = GatewayConfig::default();
//! let gateway = Gateway::from_config(&config).await?;
//! let listener = tokio::net::TcpListener::bind(config.listen_addr()?).await?;
//! axum::serve(listener, gateway.router()).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod builtin;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;

pub use app::Gateway;
pub use config::GatewayConfig;
pub use error::ApiError;
pub use taskgate_tasks;
