//! # rf-reel-machine: reel motion and win evaluation for slot displays
//!
//! Simulates the reels of a multi-reel slot machine and decides whether
//! their resting symbols form a winning line. Rendering, input and asset
//! loading stay with the host, which drives everything through one
//! `Machine::tick(dt)` call per frame.
//!
//! ## Features
//!
//! - **Reel motion**: continuous scroll with speed ramp, wrap-around recycling
//!   and jitter-free stop alignment
//! - **Cascaded sequencing**: staggered spin/stop commands with configurable delays
//! - **Win evaluation**: adjacency search across reels with one-row diagonal tolerance
//! - **Timing Profiles**: Normal, Turbo, Studio
//!
//! ## Architecture
//!
//! ```text
//! Machine
//!     │
//!     ├── MachineConfig (geometry, motion, timing)
//!     ├── SymbolCatalog (host-provided handles)
//!     ├── Vec<Reel> ── ring of Cells
//!     └── WinEvaluator
//!           │
//!           v
//!     RoundOutcome → RoundObserver
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rf_reel_machine::{Machine, MachineConfig, NamedCatalog, NullObserver};
//!
//! let mut machine = Machine::new(MachineConfig::default(), NamedCatalog::standard(3), NullObserver)?;
//! machine.spin_round(false)?;
//! loop {
//!     if let Some(outcome) = machine.tick(1.0 / 60.0)? {
//!         println!("won: {}", outcome.won);
//!         break;
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod machine;
pub mod reel;
pub mod symbols;
pub mod timing;

pub use config::*;
pub use error::*;
pub use evaluator::*;
pub use machine::*;
pub use reel::*;
pub use symbols::*;
pub use timing::*;
