//! MarketPulse
//!
//! Business phase and sentiment classification for asset price series.
//! A price is in **Expansion** when it trades at or above its trailing trend
//! baseline and in **Contraction** below it; an RSI-style oscillator places
//! its momentum in the **Heated**, **Value** or **Neutral** zone.
//!
//! ```no_run
//! use market_pulse::{data, ClassificationEngine, EngineConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let series = data::load_csv("data/NVDA.csv")?;
//!     let engine = ClassificationEngine::new(EngineConfig::default())?;
//!     let classification = engine.classify(&series)?;
//!
//!     for point in &classification {
//!         println!("{} {:?} {:?}", point.point.timestamp, point.phase, point.sentiment);
//!     }
//!     println!("{:?}", classification.current_state());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod types;

pub use config::{Config, EngineConfig, Smoothing};
pub use engine::{AssetState, Classification, ClassificationEngine};
pub use error::{ClassifyError, ClassifyResult, ValidationError};
pub use types::*;
