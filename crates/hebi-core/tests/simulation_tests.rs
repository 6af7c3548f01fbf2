//! End-to-end tests for the steering/body/collision pipeline
//!
//! These drive the public API only, the way the app does once per refresh.

use std::time::Duration;

use glam::Vec2;
use hebi_core::{
    Arena, BodyChain, BodyConfig, CollisionSystem, Direction, FingerSignal, FoodConfig,
    GameConfig, GameLoop, GameState, SourceTransition, SteeringConfig, SteeringEngine,
    TargetResolver, TargetSource, TrackingConfig,
};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use web_time::Instant;

// ============================================================================
// Worked examples
// ============================================================================

#[test]
fn test_first_step_toward_tracked_target() {
    let arena = Arena::new(800.0, 600.0);
    let steering = SteeringEngine::new(SteeringConfig::default());

    let step = steering.step(
        Vec2::new(100.0, 100.0),
        Direction::RIGHT,
        Vec2::new(400.0, 300.0),
        &arena,
    );

    let expected = Vec2::new(0.975, 0.083).normalize();
    assert!((step.direction.x() - expected.x).abs() < 1e-3);
    assert!((step.direction.y() - expected.y).abs() < 1e-3);
}

#[test]
fn test_pickup_grows_by_five_and_scores_ten() {
    let arena = Arena::new(800.0, 600.0);
    let body = BodyChain::new(BodyConfig::default());
    let collision = CollisionSystem::new(FoodConfig::default());
    let mut rng = Xoshiro256StarStar::seed_from_u64(4);

    let head = Vec2::new(400.0, 300.0);
    let mut state = GameState::new(body.spawn(head, Vec2::X), Direction::RIGHT, head + Vec2::new(9.0, 12.0));
    let length = state.length();

    let pickup = collision.check(&mut state, &body, &arena, &mut rng);

    assert!(pickup.is_some());
    assert_eq!(state.score, 10);
    assert_eq!(state.length(), length + 5);
}

#[test]
fn test_stale_signal_reports_wander() {
    let arena = Arena::new(800.0, 600.0);
    let mut resolver = TargetResolver::new(TrackingConfig::default());
    let mut rng = Xoshiro256StarStar::seed_from_u64(8);
    let t0 = Instant::now();
    let signal = FingerSignal::new(0.5, 0.5, t0).unwrap();

    let resolution = resolver.resolve(Some(&signal), t0 + Duration::from_millis(2100), &arena, &mut rng);

    assert_eq!(resolution.target.source, TargetSource::Wander);
}

// ============================================================================
// Properties over long runs
// ============================================================================

#[test]
fn test_spacing_holds_after_relaxation() {
    let config = GameConfig::default();
    let spacing = config.body.segment_spacing;
    let mut game = GameLoop::new(config, 1234);
    game.start();

    let t0 = Instant::now();
    // Alternate between a jumping tracked target and wander
    for tick in 0..3_000u64 {
        let now = t0 + Duration::from_millis(tick * 16);
        let phase = (tick / 200) % 3;
        let signal = match phase {
            0 => FingerSignal::new(0.2, 0.8, now),
            1 => FingerSignal::new(0.85, 0.1, now),
            _ => None,
        };
        game.tick(signal.as_ref(), now);

        let state = game.state().unwrap();
        let arena = game.arena();
        for pair in state.chain.segments().windows(2) {
            let gap = arena.distance(pair[0].position, pair[1].position);
            assert!(gap <= spacing + 1e-3, "gap {} at tick {}", gap, tick);
        }
        assert!((state.direction.as_vec2().length() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn test_pickups_are_atomic() {
    // Huge pickup radius: the head eats on almost every respawn
    let config = GameConfig {
        food: FoodConfig {
            pickup_radius: 250.0,
            ..FoodConfig::default()
        },
        ..GameConfig::default()
    };
    let mut game = GameLoop::new(config, 77);
    game.start();
    let now = Instant::now();

    let mut pickups = 0;
    let mut previous = game.state().cloned().unwrap();
    for _ in 0..500 {
        let report = game.tick(None, now).unwrap();
        let state = game.state().unwrap();
        match report.pickup {
            Some(_) => {
                pickups += 1;
                assert_eq!(state.score, previous.score + 10);
                assert_eq!(state.length(), previous.length() + 5);
            }
            None => {
                assert_eq!(state.score, previous.score);
                assert_eq!(state.length(), previous.length());
            }
        }
        previous = state.clone();
    }
    assert!(pickups > 0);
    assert_eq!(previous.score, pickups * 10);
}

#[test]
fn test_losing_tracking_flips_once_in_game_loop() {
    let mut game = GameLoop::new(GameConfig::default(), 5);
    game.start();
    let t0 = Instant::now();
    let signal = FingerSignal::new(0.4, 0.6, t0).unwrap();

    let transitions: Vec<SourceTransition> = (0..400u64)
        .filter_map(|tick| {
            game.tick(Some(&signal), t0 + Duration::from_millis(tick * 16))
                .and_then(|r| r.transition)
        })
        .collect();

    assert_eq!(
        transitions,
        vec![SourceTransition::Acquired, SourceTransition::Lost]
    );
}

#[test]
fn test_same_seed_same_game() {
    let run = |seed| {
        let mut game = GameLoop::new(GameConfig::default(), seed);
        game.start();
        let now = Instant::now();
        for _ in 0..1_000 {
            game.tick(None, now);
        }
        game.state().cloned().unwrap()
    };
    assert_eq!(run(42), run(42));
}
