//! # EMBER Engine
//!
//! The layer a game links against: configuration, the shared engine
//! context and the fixed-step main loop that feeds the graphics thread.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember::{EmptyGame, Engine, EngineConfig};
//! use ember_rendering::HeadlessBackend;
//!
//! let config = EngineConfig::from_file("ember.toml")?;
//! let mut engine = Engine::new(config, HeadlessBackend::new(1280, 720), EmptyGame)?;
//! for _ in 0..600 {
//!     engine.tick(1.0 / 60.0)?;
//! }
//! let stats = engine.shutdown()?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod game;

pub use config::EngineConfig;
pub use context::EngineContext;
pub use engine::{Engine, TickReport};
pub use error::{EngineError, EngineResult};
pub use game::{EmptyGame, Game};
