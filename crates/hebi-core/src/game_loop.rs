//! Per-refresh orchestration
//!
//! One tick: resolve target → steer head → relax body → check food.
//! The loop owns the [`GameState`] and builds it exactly once per start;
//! calling [`GameLoop::start`] while running is a no-op.

use glam::Vec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use web_time::Instant;

use crate::arena::Arena;
use crate::body::BodyChain;
use crate::collision::{CollisionSystem, Pickup};
use crate::config::GameConfig;
use crate::signal::FingerSignal;
use crate::state::GameState;
use crate::steering::{Direction, SteeringEngine};
use crate::target::{SourceTransition, Target, TargetResolver};

/// Re-rolls allowed so the first food does not spawn under the head
const FOOD_SPAWN_ATTEMPTS: usize = 8;

/// Whether a game is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Waiting for `start`
    Ready,
    Running,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub target: Target,
    pub transition: Option<SourceTransition>,
    pub pickup: Option<Pickup>,
    pub head: Vec2,
    pub length: usize,
    pub score: u32,
}

/// Drives steering, body and collision once per display refresh
pub struct GameLoop {
    arena: Arena,
    steering: SteeringEngine,
    body: BodyChain,
    collision: CollisionSystem,
    resolver: TargetResolver,
    state: Option<GameState>,
    rng: Xoshiro256StarStar,
}

impl GameLoop {
    /// Create a loop in the `Ready` phase with a seeded RNG
    pub fn new(config: GameConfig, seed: u64) -> Self {
        Self {
            arena: config.arena,
            steering: SteeringEngine::new(config.steering),
            body: BodyChain::new(config.body),
            collision: CollisionSystem::new(config.food),
            resolver: TargetResolver::new(config.tracking),
            state: None,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn phase(&self) -> GamePhase {
        if self.state.is_some() {
            GamePhase::Running
        } else {
            GamePhase::Ready
        }
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Begin a game. Returns false (and changes nothing) if one is running.
    pub fn start(&mut self) -> bool {
        if self.state.is_some() {
            log::debug!("start ignored: game already running");
            return false;
        }

        let head = self.arena.center();
        let direction = Direction::RIGHT;
        let chain = self.body.spawn(head, direction.as_vec2());
        let mut state = GameState::new(chain, direction, head);
        for _ in 0..FOOD_SPAWN_ATTEMPTS {
            state.food = self.collision.spawn_food(&self.arena, &mut self.rng);
            if !self.collision.in_reach(&state, &self.arena) {
                break;
            }
        }

        log::info!(
            "Game started: {} segments, food at ({:.0}, {:.0})",
            state.length(),
            state.food.x,
            state.food.y
        );
        self.resolver.reset();
        self.state = Some(state);
        true
    }

    /// End the current game, returning its final state
    pub fn reset(&mut self) -> Option<GameState> {
        let finished = self.state.take();
        if let Some(state) = &finished {
            log::info!(
                "Game reset after {} ticks: score {} length {}",
                state.ticks,
                state.score,
                state.length()
            );
        }
        self.resolver.reset();
        finished
    }

    /// Advance one tick. Returns `None` when no game is running.
    pub fn tick(&mut self, signal: Option<&FingerSignal>, now: Instant) -> Option<TickReport> {
        let state = self.state.as_mut()?;

        let resolution = self
            .resolver
            .resolve(signal, now, &self.arena, &mut self.rng);
        match resolution.transition {
            Some(SourceTransition::Lost) => log::info!("Tracking lost, wandering"),
            Some(SourceTransition::Acquired) => log::info!("Tracking acquired"),
            None => {}
        }

        let step = self.steering.step(
            state.head(),
            state.direction,
            resolution.target.position,
            &self.arena,
        );
        state.direction = step.direction;
        self.body.relax(&mut state.chain, step.head, &self.arena);

        let pickup = self
            .collision
            .check(state, &self.body, &self.arena, &mut self.rng);

        state.ticks += 1;
        Some(TickReport {
            tick: state.ticks,
            target: resolution.target,
            transition: resolution.transition,
            pickup,
            head: state.head(),
            length: state.length(),
            score: state.score,
        })
    }
}
