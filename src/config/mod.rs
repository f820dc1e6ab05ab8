//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (AppConfig::default)
//!     → optional TOML file (--config)
//!     → environment variables (12-factor)
//!     → loader.rs (figment merge & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow an empty environment
//! - Environment profile (dev/staging/prod) only supplies defaults and checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, LogLevel, Profile};
pub use validation::ValidationError;
