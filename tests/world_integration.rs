use std::collections::BTreeMap;
use std::sync::Arc;

use life::agent::SMOOTHING;
use life::steering::limit;
use life::{Bird, Life, Plant, SimulationParams, World};
use nannou::prelude::*;

fn params(seed: u64, parallel: bool) -> SimulationParams {
    SimulationParams {
        rng_seed: Some(seed),
        enable_parallel: parallel,
        populations: BTreeMap::new(),
        ..SimulationParams::default()
    }
}

fn empty_world(seed: u64) -> World {
    World::new(params(seed, false)).expect("world")
}

#[test]
fn lone_agent_moves_and_smooths_without_side_effects() {
    let mut world = empty_world(21);
    let id = world.spawn(Arc::new(Life), pt2(0.0, 0.0), Some(10.0));
    {
        let agent = world.get_mut(id).expect("agent");
        agent.fullness = 1.0;
        agent.life = 0;
        agent.target_weight = 12.0;
        agent.max_speed = 1.0;
        agent.max_speed_target = 2.0;
        agent.velocity = vec2(0.5, 0.0);
        agent.acceleration = vec2(0.2, 0.1);
        agent.heading = 0.0;
    }
    let before = world.get(id).expect("agent").clone();

    let info = world.tick().clone();

    let agent = world.get(id).expect("agent");
    let expected_weight = 10.0 + (12.0 - 10.0) * SMOOTHING;
    let expected_speed = 1.0 + (2.0 - 1.0) * SMOOTHING;
    assert!((agent.weight - expected_weight).abs() < 1e-5);
    assert!((agent.max_speed - expected_speed).abs() < 1e-5);

    let expected_velocity = limit(before.velocity + before.acceleration, expected_speed);
    assert!((agent.velocity - expected_velocity).length() < 1e-5);
    assert!((agent.position - (before.position + expected_velocity)).length() < 1e-5);
    assert!(agent.velocity.length() <= agent.max_speed + 1e-5);
    assert_eq!(agent.acceleration, Vec2::ZERO);

    assert!(agent.target.is_none());
    assert!(!agent.birth);
    assert_eq!(agent.life, 1);
    assert_eq!(info.births, 0);
    assert_eq!(info.predations, 0);
    assert_eq!(world.len(), 1);
}

#[test]
fn hungry_agent_acquires_small_prey_and_speeds_up() {
    let mut world = empty_world(5);
    let hunter = world.spawn(Arc::new(Life), pt2(0.0, 0.0), Some(20.0));
    let prey = world.spawn(Arc::new(Bird), pt2(40.0, 0.0), Some(9.5));
    {
        let agent = world.get_mut(hunter).expect("hunter");
        agent.fullness = 0.5;
        agent.heading = 0.0;
        agent.velocity = vec2(1.0, 0.0);
    }

    world.tick();

    let agent = world.get(hunter).expect("hunter");
    assert_eq!(agent.target, Some(prey));
    assert_eq!(agent.max_speed_target, agent.fast_speed);
    assert!(world.get(prey).is_some(), "prey is still out of reach");
}

#[test]
fn predation_zeroes_prey_and_transfers_sixty_percent() {
    let mut world = empty_world(8);
    let hunter = world.spawn(Arc::new(Life), pt2(0.0, 0.0), Some(20.0));
    let prey = world.spawn(Arc::new(Bird), pt2(5.0, 0.0), Some(8.0));
    {
        let agent = world.get_mut(hunter).expect("hunter");
        agent.fullness = 0.5;
        agent.heading = 0.0;
        agent.velocity = Vec2::ZERO;
        agent.acceleration = Vec2::ZERO;
    }
    let prey_weight = world.get(prey).expect("prey").weight;

    let info = world.tick().clone();

    assert!(world.get(prey).is_none(), "eaten prey is compacted away");
    assert_eq!(info.predations, 1);
    assert_eq!(info.deaths, 1);

    let agent = world.get(hunter).expect("hunter");
    assert!((agent.target_weight - (20.0 + prey_weight * 0.6)).abs() < 1e-4);
    assert!(agent.target.is_none());
    assert_eq!(agent.max_speed_target, agent.normal_speed);
    assert!(agent.fullness <= 1.0);
}

#[test]
fn predation_gain_is_capped_at_weight_limit() {
    let mut world = empty_world(9);
    let hunter = world.spawn(Arc::new(Life), pt2(0.0, 0.0), Some(29.0));
    let plant = world.spawn(Arc::new(Plant), pt2(3.0, 0.0), Some(14.0));
    {
        let agent = world.get_mut(hunter).expect("hunter");
        agent.fullness = 0.1;
        agent.heading = 0.0;
        agent.velocity = Vec2::ZERO;
        agent.acceleration = Vec2::ZERO;
    }
    // Plants are spawned as seedlings
    world.get_mut(plant).expect("plant").weight = 14.0;

    world.tick();

    let agent = world.get(hunter).expect("hunter");
    assert_eq!(agent.target_weight, agent.weight_limit);
    assert_eq!(world.len(), 1);
}

#[test]
fn birds_reproduce_on_schedule() {
    let mut world = empty_world(13);
    let bird = world.spawn(Arc::new(Bird), pt2(0.0, 0.0), Some(10.0));
    {
        let agent = world.get_mut(bird).expect("bird");
        agent.fullness = 1.0;
        agent.birth_time = 1;
    }

    let info = world.tick().clone();
    assert_eq!(info.births, 1);
    assert_eq!(world.len(), 2);
    assert_eq!(world.agents().filter(|(_, a)| a.kind() == "bird").count(), 2);

    let info = world.tick().clone();
    assert_eq!(info.births, 0);
}

#[test]
fn plants_wither_and_disappear_at_end_of_life() {
    let mut world = empty_world(4);
    let plant = world.spawn(Arc::new(Plant), pt2(0.0, 0.0), Some(10.0));
    world.get_mut(plant).expect("plant").life_span = 100.0;

    for _ in 0..40 {
        world.tick();
    }
    let grown = world.get(plant).expect("plant").weight;
    assert!(grown > 5.0);

    for _ in 40..90 {
        world.tick();
    }
    let withering = world.get(plant).expect("plant");
    assert_eq!(withering.target_weight, 0.0);
    assert!(withering.weight < grown);

    for _ in 90..110 {
        world.tick();
    }
    assert!(world.get(plant).is_none());
}

#[test]
fn plants_neither_move_nor_hunt() {
    let mut world = empty_world(12);
    let plant = world.spawn(Arc::new(Plant), pt2(0.0, 0.0), Some(20.0));
    world.spawn(Arc::new(Life), pt2(10.0, 0.0), Some(5.0));
    {
        let agent = world.get_mut(plant).expect("plant");
        agent.weight = 20.0;
        agent.fullness = 0.1;
    }
    let before = world.get(plant).expect("plant").clone();

    for _ in 0..5 {
        world.tick();
    }

    let agent = world.get(plant).expect("plant");
    assert_eq!(agent.position, before.position);
    assert_eq!(agent.velocity, Vec2::ZERO);
    assert_eq!(agent.acceleration, Vec2::ZERO);
    assert_eq!(agent.heading, before.heading);
    assert!(agent.target.is_none());
    assert!(agent.in_sight.is_empty());
    assert_eq!(agent.fullness, before.fullness);
    assert_eq!(agent.life, 5);
}

#[test]
fn starving_agents_lose_life_span() {
    let mut world = empty_world(6);
    let id = world.spawn(Arc::new(Life), pt2(0.0, 0.0), Some(10.0));
    world.get_mut(id).expect("agent").fullness = 0.0;
    let span = world.get(id).expect("agent").life_span;

    world.tick();

    let agent = world.get(id).expect("agent");
    assert_eq!(agent.fullness, 0.0);
    assert!(agent.life_span < span);
}

#[test]
fn parallel_perception_matches_sequential() {
    let mut populations = BTreeMap::new();
    populations.insert("bird".to_string(), 30);
    populations.insert("life".to_string(), 30);
    populations.insert("plant".to_string(), 40);

    let mut sequential = World::new(SimulationParams {
        populations: populations.clone(),
        ..params(77, false)
    })
    .expect("world");
    let mut parallel = World::new(SimulationParams {
        populations,
        ..params(77, true)
    })
    .expect("world");
    sequential.populate().expect("populate");
    parallel.populate().expect("populate");

    for _ in 0..60 {
        sequential.tick();
        parallel.tick();
    }

    assert_eq!(sequential.len(), parallel.len());
    for ((_, a), (_, b)) in sequential.agents().zip(parallel.agents()) {
        assert_eq!(a.position, b.position);
        assert_eq!(a.weight, b.weight);
        assert_eq!(a.kind(), b.kind());
    }
}

#[test]
fn long_run_preserves_invariants() {
    let mut world = World::new(SimulationParams {
        rng_seed: Some(2024),
        ..SimulationParams::default()
    })
    .expect("world");
    world.populate().expect("populate");

    for _ in 0..300 {
        let info = world.tick().clone();
        assert_eq!(info.population, world.len());
        for (_, agent) in world.agents() {
            assert!(agent.weight > 0.0);
            assert!(agent.weight <= agent.weight_limit + 1e-4);
            assert!(agent.velocity.length() <= agent.max_speed + 1e-4);
            assert!((0.0..=1.0).contains(&agent.fullness));
        }
    }
    assert_eq!(world.elapsed_ticks(), 300);
}
