//! valchain-core library: value-chain model, SQLite gateway and editor session.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums in library APIs; `anyhow::Result` at
//!   the config and database-open boundaries.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod db;
pub mod editor;
pub mod error;
pub mod model;
