/*
 * Species Module
 *
 * A species decides three things about its agents: the tunables they are
 * built with (`configure`), what they do once their own tick is over
 * (`on_tick`, typically spawning offspring) and the shape they are drawn
 * with (`render_shape`). Agents compare kinds by species name.
 */

use std::sync::Arc;

use nannou::prelude::*;
use rand::{Rng, RngCore};

use crate::agent::{Agent, Traits};

/// Capability interface implemented by every kind of agent.
pub trait Species: Send + Sync {
    /// Name used to tell kinds apart.
    fn name(&self) -> &'static str;

    /// Stationary species skip perception, movement and predation.
    fn stationary(&self) -> bool {
        false
    }

    fn configure(&self, _traits: &mut Traits) {}

    /// Called after the agent finished its tick.
    fn on_tick(&self, _agent: &Agent, _nursery: &mut Nursery, _rng: &mut dyn RngCore) {}

    /// Draw the agent in its local frame: origin at its position, +x along
    /// its heading.
    fn render_shape(&self, agent: &Agent, draw: &Draw);
}

/// An offspring requested by a species during the tick.
pub struct Birth {
    pub species: Arc<dyn Species>,
    pub position: Point2,
    pub weight: Option<f32>,
}

/// Collects births during a tick; the world spawns them once every agent
/// has been updated.
#[derive(Default)]
pub struct Nursery {
    births: Vec<Birth>,
}

impl Nursery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, species: Arc<dyn Species>, position: Point2, weight: Option<f32>) {
        self.births.push(Birth {
            species,
            position,
            weight,
        });
    }

    pub fn len(&self) -> usize {
        self.births.len()
    }

    pub fn is_empty(&self) -> bool {
        self.births.is_empty()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, Birth> {
        self.births.drain(..)
    }
}

/// Plain wandering creature drawn as an outline. Does not reproduce.
#[derive(Debug, Clone, Copy, Default)]
pub struct Life;

impl Species for Life {
    fn name(&self) -> &'static str {
        "life"
    }

    fn render_shape(&self, agent: &Agent, draw: &Draw) {
        draw.ellipse()
            .x_y(0.0, 0.0)
            .w_h(agent.weight, agent.weight)
            .no_fill()
            .stroke(WHITE)
            .stroke_weight(1.0);
    }
}

/// Fast, far-sighted flocking species. Lays its offspring where it stands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bird;

impl Species for Bird {
    fn name(&self) -> &'static str {
        "bird"
    }

    fn configure(&self, traits: &mut Traits) {
        traits.life_span = 60.0 * 60.0;
        traits.normal_speed = 4.0;
        traits.fast_speed = 6.0;
        traits.sight_range = 80.0;
    }

    fn on_tick(&self, agent: &Agent, nursery: &mut Nursery, _rng: &mut dyn RngCore) {
        if agent.birth {
            nursery.spawn(agent.species().clone(), agent.position, None);
        }
    }

    fn render_shape(&self, agent: &Agent, draw: &Draw) {
        let w = agent.weight;
        // Body
        draw.ellipse()
            .x_y(0.0, 0.0)
            .w_h(w * 0.8, w * 0.8)
            .color(rgb(45u8, 56, 113));
        // Beak
        draw.tri()
            .points(pt2(w * 0.55, 0.0), pt2(w * 0.35, w * 0.1), pt2(w * 0.35, -w * 0.1))
            .color(rgb(255u8, 202, 96));
        // Eye
        draw.ellipse()
            .x_y(w * 0.2, w * 0.1)
            .w_h(w * 0.1, w * 0.1)
            .color(WHITE);
    }
}

/// Stationary grower. Scatters seedlings around itself when it reproduces.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plant;

/// Distance within which a plant drops its seedlings.
pub const SEED_SPREAD: f32 = 40.0;

impl Species for Plant {
    fn name(&self) -> &'static str {
        "plant"
    }

    fn stationary(&self) -> bool {
        true
    }

    fn configure(&self, traits: &mut Traits) {
        traits.normal_speed = 0.0;
        traits.fast_speed = 0.0;
        traits.birth_interval = 60 * 8;
        traits.birth_interval_jitter = 10;
        traits.grow_speed = 0.01;
    }

    fn on_tick(&self, agent: &Agent, nursery: &mut Nursery, rng: &mut dyn RngCore) {
        if agent.birth {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let distance = rng.gen_range(agent.weight..agent.weight + SEED_SPREAD);
            let offset = vec2(angle.cos(), angle.sin()) * distance;
            nursery.spawn(agent.species().clone(), agent.position + offset, None);
        }
    }

    fn render_shape(&self, agent: &Agent, draw: &Draw) {
        draw.ellipse()
            .x_y(0.0, 0.0)
            .w_h(agent.weight, agent.weight)
            .color(rgba(70u8, 170, 90, 200));
    }
}

/// Names accepted by [`lookup`].
pub const KNOWN_SPECIES: &[&str] = &["life", "bird", "plant"];

/// Species factory keyed by name.
pub fn lookup(name: &str) -> Option<Arc<dyn Species>> {
    match name {
        "life" => Some(Arc::new(Life)),
        "bird" => Some(Arc::new(Bird)),
        "plant" => Some(Arc::new(Plant)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn lookup_knows_every_listed_species() {
        for name in KNOWN_SPECIES {
            let species = lookup(name).expect("species");
            assert_eq!(species.name(), *name);
        }
        assert!(lookup("dragon").is_none());
    }

    #[test]
    fn bird_configuration_overrides_defaults() {
        let mut traits = Traits::default();
        Bird.configure(&mut traits);
        assert_eq!(traits.normal_speed, 4.0);
        assert_eq!(traits.fast_speed, 6.0);
        assert_eq!(traits.sight_range, 80.0);
        assert_eq!(traits.weight_limit, 30.0);
    }

    #[test]
    fn bird_lays_offspring_in_place_when_birth_fires() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut bird = Agent::new(Arc::new(Bird), pt2(5.0, -3.0), None, &mut rng);
        let mut nursery = Nursery::new();

        Bird.on_tick(&bird, &mut nursery, &mut rng);
        assert!(nursery.is_empty());

        bird.birth = true;
        Bird.on_tick(&bird, &mut nursery, &mut rng);
        let births: Vec<Birth> = nursery.drain().collect();
        assert_eq!(births.len(), 1);
        assert_eq!(births[0].position, pt2(5.0, -3.0));
        assert_eq!(births[0].species.name(), "bird");
    }

    #[test]
    fn plant_scatters_seedlings() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut plant = Agent::new(Arc::new(Plant), Vec2::ZERO, None, &mut rng);
        plant.birth = true;
        let mut nursery = Nursery::new();
        Plant.on_tick(&plant, &mut nursery, &mut rng);
        let births: Vec<Birth> = nursery.drain().collect();
        assert_eq!(births.len(), 1);
        let d = births[0].position.length();
        assert!(d >= plant.weight && d <= plant.weight + SEED_SPREAD);
    }

    #[test]
    fn life_does_not_reproduce() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut agent = Agent::new(Arc::new(Life), Vec2::ZERO, None, &mut rng);
        agent.birth = true;
        let mut nursery = Nursery::new();
        Life.on_tick(&agent, &mut nursery, &mut rng);
        assert!(nursery.is_empty());
    }
}
