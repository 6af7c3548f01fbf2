//! # hebi-core - steering and body simulation
//!
//! Pure, synchronous simulation for a snake that chases a moving target:
//! - Smoothed steering toward a target with toroidal wrap
//! - Segment chain relaxation and lazy growth
//! - Food pickup and respawn
//! - Target resolution between a tracked signal and autonomous wander
//!
//! Nothing in this crate performs I/O or depends on an async runtime; the
//! streaming session lives in `hebi-live` and feeds [`FingerSignal`]s in.

pub mod arena;
pub mod body;
pub mod collision;
pub mod config;
pub mod game_loop;
pub mod rng;
pub mod segment;
pub mod signal;
pub mod state;
pub mod steering;
pub mod target;

pub use arena::Arena;
pub use body::BodyChain;
pub use collision::{CollisionSystem, Pickup};
pub use config::{
    BodyConfig, ConfigError, FoodConfig, GameConfig, SteeringConfig, TrackingConfig,
};
pub use game_loop::{GameLoop, GamePhase, TickReport};
pub use rng::GameRng;
pub use segment::{Segment, SegmentChain, SegmentId};
pub use signal::FingerSignal;
pub use state::GameState;
pub use steering::{Direction, SteeringEngine, SteeringStep};
pub use target::{SourceTransition, Target, TargetResolution, TargetResolver, TargetSource};
