/*
 * Agent Module
 *
 * This module defines the Agent struct, the living entity of the ecosystem.
 * Each tick a mobile agent:
 * 1. Perceives the entities inside its sight cone
 * 2. Picks a prey target when hungry
 * 3. Composes separation, alignment, cohesion, avoidance and pursuit forces
 * 4. Integrates its motion and eats its prey on contact
 * 5. Ages, starves and reproduces
 *
 * Stationary agents (plants) skip perception and movement and only grow,
 * age and reproduce.
 */

use std::fmt;
use std::sync::Arc;

use nannou::prelude::*;
use rand::Rng;
use slotmap::new_key_type;

use crate::params::BehaviorWeights;
use crate::species::Species;
use crate::steering::{approach, heading, limit, set_magnitude, wrap_signed_angle};

new_key_type! {
    /// Stable handle for agents backed by a generational slot map.
    pub struct AgentId;
}

/// Smoothing factor applied to weight and speed each tick.
pub const SMOOTHING: f32 = 0.1;
/// Agents at or above this fullness do not hunt.
pub const HUNT_BELOW_FULLNESS: f32 = 0.7;
/// Share of the prey's weight a predator gains.
pub const PREDATION_GAIN: f32 = 0.6;
/// Fullness lost per tick by mobile agents.
pub const FULLNESS_DECAY: f32 = 0.01;
/// Life span lost per tick while starving.
pub const STARVATION_DRAIN: f32 = 0.01;
/// Ticks before death during which a mobile agent slows to a halt.
pub const SENESCENCE_TICKS: f32 = 30.0;
/// Ticks before death during which a plant withers.
pub const WITHER_TICKS: f32 = 60.0;
/// Largest heading change considered per tick, before smoothing.
pub const MAX_TURN: f32 = std::f32::consts::PI * 0.1;
/// Fraction of the clamped heading change applied per tick.
pub const TURN_SMOOTHING: f32 = 0.3;
/// Weight of a freshly sprouted plant.
pub const SEEDLING_WEIGHT: f32 = 0.1;

/// Per-species tunables. Species adjust the defaults in
/// [`Species::configure`] before an agent is built from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Traits {
    pub normal_speed: f32,
    pub fast_speed: f32,
    pub sight_range: f32,
    /// Half-angle of the field of view, in radians.
    pub sight_angle: f32,
    /// Body radius; same-kind agents closer than twice this separate.
    pub radius: f32,
    pub max_force: f32,
    pub weight_limit: f32,
    /// Life span in ticks before jitter.
    pub life_span: f32,
    pub birth_interval: u32,
    /// Each agent's interval is offset by a fixed draw from
    /// `[-birth_interval_jitter, birth_interval_jitter)`.
    pub birth_interval_jitter: u32,
    /// Target weight gained per tick by stationary agents.
    pub grow_speed: f32,
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            normal_speed: 1.0,
            fast_speed: 2.0,
            sight_range: 100.0,
            sight_angle: std::f32::consts::PI * 0.4,
            radius: 20.0,
            max_force: 0.1,
            weight_limit: 30.0,
            life_span: 60.0 * 60.0,
            birth_interval: 60 * 20,
            birth_interval_jitter: 0,
            grow_speed: 0.01,
        }
    }
}

/// What an agent knows about another entity it perceived this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: AgentId,
    pub kind: &'static str,
    pub stationary: bool,
    pub position: Point2,
    pub velocity: Vec2,
    pub weight: f32,
    /// The entity is hunting the observer.
    pub targets_observer: bool,
}

impl Neighbor {
    pub fn observe(id: AgentId, other: &Agent, observer: AgentId) -> Self {
        Self {
            id,
            kind: other.kind(),
            stationary: other.is_stationary(),
            position: other.position,
            velocity: other.velocity,
            weight: other.weight,
            targets_observer: other.target == Some(observer),
        }
    }
}

/// Result of an agent's perception step.
#[derive(Debug, Clone, Default)]
pub struct Perception {
    /// Entities inside the sight cone.
    pub in_sight: Vec<Neighbor>,
    /// Everything the sight-radius query returned, self excluded.
    pub nearby: Vec<Neighbor>,
    /// Where the current prey stood, if it is still alive. It may be
    /// outside the sight cone.
    pub target_position: Option<Point2>,
}

#[derive(Clone)]
pub struct Agent {
    species: Arc<dyn Species>,
    pub position: Point2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub heading: f32,
    pub max_speed: f32,
    pub max_speed_target: f32,
    pub normal_speed: f32,
    pub fast_speed: f32,
    pub max_force: f32,
    pub radius: f32,
    pub sight: f32,
    pub sight_range: f32,
    pub sight_angle: f32,
    pub weight: f32,
    pub target_weight: f32,
    pub weight_limit: f32,
    pub life: u32,
    pub life_span: f32,
    pub fullness: f32,
    pub birth: bool,
    pub birth_interval: u32,
    pub birth_time: u32,
    pub grow_speed: f32,
    pub target: Option<AgentId>,
    pub in_sight: Vec<Neighbor>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("kind", &self.kind())
            .field("position", &self.position)
            .field("velocity", &self.velocity)
            .field("weight", &self.weight)
            .field("target_weight", &self.target_weight)
            .field("life", &self.life)
            .field("fullness", &self.fullness)
            .field("target", &self.target)
            .finish()
    }
}

impl Agent {
    /// Build an agent of the given species. Without an explicit `weight` the
    /// size is drawn at random from the lower part of the weight range.
    pub fn new<R: Rng + ?Sized>(
        species: Arc<dyn Species>,
        position: Point2,
        weight: Option<f32>,
        rng: &mut R,
    ) -> Self {
        let mut traits = Traits::default();
        species.configure(&mut traits);
        let stationary = species.stationary();

        let initial_weight = weight
            .unwrap_or_else(|| rng.gen_range(0.0..0.3) * traits.weight_limit + 5.0)
            .clamp(0.0, traits.weight_limit);

        let (heading, velocity, acceleration) = if stationary {
            (0.0, Vec2::ZERO, Vec2::ZERO)
        } else {
            let heading = rng.gen_range(0.0..std::f32::consts::TAU);
            let velocity = vec2(heading.cos(), heading.sin()) * traits.normal_speed;
            // Initial random push
            let push_angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let push = vec2(push_angle.cos(), push_angle.sin()) * rng.gen_range(0.0..1.0);
            (heading, velocity, push)
        };

        let jitter = traits.birth_interval_jitter as i64;
        let birth_interval = if jitter > 0 {
            (traits.birth_interval as i64 + rng.gen_range(-jitter..jitter)).max(1) as u32
        } else {
            traits.birth_interval.max(1)
        };
        let mut agent = Self {
            species,
            position,
            velocity,
            acceleration,
            heading,
            max_speed: traits.normal_speed,
            max_speed_target: traits.normal_speed,
            normal_speed: traits.normal_speed,
            fast_speed: traits.fast_speed,
            max_force: traits.max_force,
            radius: traits.radius,
            sight: initial_weight + traits.sight_range,
            sight_range: traits.sight_range,
            sight_angle: traits.sight_angle,
            weight: initial_weight,
            target_weight: initial_weight,
            weight_limit: traits.weight_limit,
            life: 0,
            life_span: traits.life_span + rng.gen_range(-60.0..60.0),
            fullness: rng.gen_range(0.5..1.0),
            birth: false,
            birth_interval,
            birth_time: 0,
            grow_speed: traits.grow_speed,
            target: None,
            in_sight: Vec::new(),
        };
        agent.birth_time = agent.next_birth_offset(rng);

        if stationary {
            agent.weight = SEEDLING_WEIGHT.min(agent.weight_limit);
        }
        agent
    }

    pub fn species(&self) -> &Arc<dyn Species> {
        &self.species
    }

    pub fn kind(&self) -> &'static str {
        self.species.name()
    }

    pub fn is_stationary(&self) -> bool {
        self.species.stationary()
    }

    pub fn is_alive(&self) -> bool {
        self.weight > 0.0
    }

    pub fn same_kind(&self, other: &Neighbor) -> bool {
        other.kind == self.kind()
    }

    /// Radius of the perception query; larger agents see farther.
    pub fn perception_radius(&self) -> f32 {
        self.weight + self.sight_range
    }

    // Schedule offset for the next birth, jittered
    fn next_birth_offset<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let jitter: i64 = rng.gen_range(-5..30);
        (self.birth_interval as i64 + jitter).max(1) as u32
    }

    /// Keep freshly placed stationary agents inside the viewport, nudged a
    /// little way in from the edge they overshot.
    pub fn settle_within<R: Rng + ?Sized>(&mut self, half_width: f32, half_height: f32, rng: &mut R) {
        let mut inset = || rng.gen_range(0.0..100.0_f32);
        if self.position.x > half_width {
            self.position.x = half_width - inset();
        }
        if self.position.x < -half_width {
            self.position.x = -half_width + inset();
        }
        if self.position.y > half_height {
            self.position.y = half_height - inset();
        }
        if self.position.y < -half_height {
            self.position.y = -half_height + inset();
        }
    }

    // Apply a force to the agent
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force;
    }

    /// Angle between the agent's heading and the direction to `point`,
    /// wrapped into (-π, π].
    pub fn bearing_to(&self, point: Point2) -> f32 {
        wrap_signed_angle(heading(point - self.position) - self.heading)
    }

    /// Is `point` inside the sight cone of radius `sight`? An entity at the
    /// agent's own position is never seen.
    pub fn sees(&self, point: Point2, sight: f32) -> bool {
        let d = self.position.distance(point);
        d > 0.0 && d < sight && self.bearing_to(point).abs() < self.sight_angle
    }

    /// Split the raw results of a sight-radius query into the neighbours
    /// inside the sight cone and the full set around the agent.
    pub fn perceive<I>(&self, id: AgentId, candidates: I) -> Perception
    where
        I: IntoIterator<Item = Neighbor>,
    {
        let sight = self.perception_radius();
        let mut perception = Perception::default();
        for neighbor in candidates {
            if neighbor.id == id {
                continue;
            }
            if self.sees(neighbor.position, sight) {
                perception.in_sight.push(neighbor);
            }
            perception.nearby.push(neighbor);
        }
        perception
    }

    /// Steer towards `target`. Targets outside the sight cone produce no force.
    pub fn seek(&self, target: Point2) -> Vec2 {
        if !self.sees(target, self.sight) {
            return Vec2::ZERO;
        }
        let desired = set_magnitude(target - self.position, self.max_speed);
        limit(desired - self.velocity, self.max_force)
    }

    // Calculate separation force (avoid crowding same-kind neighbours)
    pub fn separate(&self, neighbors: &[Neighbor]) -> Vec2 {
        let desired_separation = self.radius * 2.0;
        let mut sum = Vec2::ZERO;
        let mut count = 0;

        for other in neighbors.iter().filter(|n| self.same_kind(n)) {
            if self.position.distance(other.position) < desired_separation {
                let desired = set_magnitude(other.position - self.position, -self.max_speed);
                sum += limit(desired - self.velocity, self.max_force);
                count += 1;
            }
        }

        if count > 0 {
            sum /= count as f32;
        }
        sum
    }

    // Calculate alignment (average heading of same-kind neighbours at least
    // as large as this agent). Returns a velocity-like vector, not limited.
    pub fn align(&self, neighbors: &[Neighbor]) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut count = 0;

        for other in neighbors.iter().filter(|n| self.same_kind(n) && n.weight >= self.weight) {
            sum += other.velocity;
            count += 1;
        }

        if count == 0 {
            return Vec2::ZERO;
        }
        set_magnitude(sum / count as f32, self.max_speed)
    }

    // Calculate cohesion force (seek the centroid of same-kind neighbours at
    // least as large as this agent)
    pub fn cohesion(&self, neighbors: &[Neighbor]) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut count = 0;

        for other in neighbors.iter().filter(|n| self.same_kind(n) && n.weight >= self.weight) {
            sum += other.position;
            count += 1;
        }

        if count == 0 {
            return Vec2::ZERO;
        }
        self.seek(sum / count as f32)
    }

    /// Flee from much larger entities of other kinds and from anything
    /// hunting this agent. Returns the averaged force and whether anything
    /// was avoided.
    pub fn avoid(&self, nearby: &[Neighbor]) -> (Vec2, bool) {
        let mut sum = Vec2::ZERO;
        let mut count = 0;

        for other in nearby {
            if other.stationary || self.same_kind(other) || other.weight <= 0.0 {
                continue;
            }
            let distance = self.position.distance(other.position);
            if distance >= self.sight {
                continue;
            }

            let away = set_magnitude(self.position - other.position, 1.0);
            let mut force: Option<Vec2> = None;

            if other.weight >= self.weight * 2.0 {
                let strength = map_range(distance, 0.0, self.sight, 1.0, 0.1);
                let desired = away * self.max_speed * strength;
                force = Some(limit(desired - self.velocity, self.max_force * 2.0));
            }

            if other.targets_observer {
                let strength = map_range(distance, 0.0, self.sight, 1.5, 0.2);
                let desired = away * self.max_speed * strength;
                let tracked = limit(desired - self.velocity, self.max_force * 3.0);
                force = Some(match force {
                    Some(bigger) if bigger.length_squared() > 0.0 => {
                        limit(bigger + tracked, self.max_force * 3.0)
                    }
                    _ => tracked,
                });
            }

            if let Some(force) = force {
                sum += force;
                count += 1;
            }
        }

        if count > 0 {
            sum /= count as f32;
        }
        (sum, count > 0)
    }

    /// Pick the nearest smaller entity of another kind in sight as prey.
    /// An existing target at `target_position` is only replaced by a strictly
    /// nearer candidate. Satiated agents keep whatever target they have but
    /// do not look for one.
    pub fn find_target(&mut self, target_position: Option<Point2>) {
        if self.fullness >= HUNT_BELOW_FULLNESS {
            return;
        }

        let nearest = self
            .in_sight
            .iter()
            .filter(|n| !self.same_kind(n) && n.weight > 0.0 && n.weight < self.weight / 2.0)
            .map(|n| (n.id, self.position.distance_squared(n.position)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((id, distance_sq)) = nearest else {
            return;
        };
        let current = self
            .target
            .and(target_position)
            .map(|p| self.position.distance_squared(p));
        if current.map_or(true, |d| distance_sq < d) {
            self.target = Some(id);
        }
        self.max_speed_target = self.fast_speed;
    }

    /// Compose every behaviour into this tick's acceleration.
    pub fn apply_behaviors(&mut self, nearby: &[Neighbor], target_position: Option<Point2>, weights: &BehaviorWeights) {
        self.find_target(target_position);

        let separate = self.separate(&self.in_sight) * weights.separate;
        let align = self.align(&self.in_sight) * weights.align;
        let cohesion = self.cohesion(&self.in_sight) * weights.cohesion;
        let (avoid, alarmed) = self.avoid(nearby);

        if alarmed {
            self.max_speed_target = self.fast_speed;
        }

        let pursuit = self
            .target
            .and_then(|id| self.in_sight.iter().find(|n| n.id == id))
            .map_or(Vec2::ZERO, |prey| self.seek(prey.position) * weights.pursuit);

        self.apply_force(pursuit);
        self.apply_force(separate);
        self.apply_force(align);
        self.apply_force(cohesion);
        self.apply_force(avoid * weights.avoid);
    }

    /// Steps 1 to 7 of a mobile agent's tick: grow towards target size,
    /// take in the perception, steer, move and turn.
    pub fn act(&mut self, perception: Perception, weights: &BehaviorWeights, half_extent: (f32, f32)) {
        self.sight = self.perception_radius();
        self.weight = approach(self.weight, self.target_weight, SMOOTHING);
        self.max_speed = approach(self.max_speed, self.max_speed_target, SMOOTHING);

        self.in_sight = perception.in_sight;
        self.apply_behaviors(&perception.nearby, perception.target_position, weights);

        self.integrate();
        self.wrap_edges(half_extent.0, half_extent.1);
        self.turn();
    }

    /// Plant counterpart of [`Agent::act`]: only the weight moves.
    pub fn grow(&mut self) {
        self.weight = approach(self.weight, self.target_weight, SMOOTHING);
    }

    // Update the agent's position based on its velocity and acceleration
    pub fn integrate(&mut self) {
        self.velocity = limit(self.velocity + self.acceleration, self.max_speed);
        self.position += self.velocity;
        self.acceleration = Vec2::ZERO;
    }

    /// Toroidal wrap. Agents leave the viewport by their sight radius before
    /// reappearing on the far side.
    pub fn wrap_edges(&mut self, half_width: f32, half_height: f32) {
        let x_bound = half_width + self.sight;
        let y_bound = half_height + self.sight;

        if self.position.x > x_bound {
            self.position.x = -x_bound;
        } else if self.position.x < -x_bound {
            self.position.x = x_bound;
        }

        if self.position.y > y_bound {
            self.position.y = -y_bound;
        } else if self.position.y < -y_bound {
            self.position.y = y_bound;
        }
    }

    // Ease the stored heading towards the direction of motion
    pub fn turn(&mut self) {
        let delta = wrap_signed_angle(heading(self.velocity) - self.heading).clamp(-MAX_TURN, MAX_TURN);
        self.heading += delta * TURN_SMOOTHING;
    }

    /// Prey within contact distance of this agent's body?
    pub fn in_reach(&self, prey_position: Point2) -> bool {
        self.position.distance(prey_position) < self.weight
    }

    /// Take in a consumed prey of the given weight. Returns the target weight
    /// gained after the weight limit is applied.
    pub fn consume(&mut self, prey_weight: f32) -> f32 {
        let before = self.target_weight;
        self.target_weight = (before + prey_weight * PREDATION_GAIN).min(self.weight_limit);
        let gained = (self.target_weight - before).max(0.0);

        self.target = None;
        self.max_speed_target = self.normal_speed;
        if self.weight > 0.0 {
            self.fullness = (self.fullness + gained / self.weight).min(1.0);
        }
        gained
    }

    /// Mark the agent dead; it is removed when the world compacts.
    pub fn kill(&mut self) {
        self.weight = 0.0;
        self.target_weight = 0.0;
    }

    /// Advance the life counter: death past the life span, senescent
    /// slowdown or withering near the end, hunger for mobile agents and
    /// growth for stationary ones.
    pub fn age(&mut self) {
        self.life += 1;
        let life = self.life as f32;
        if life > self.life_span {
            self.kill();
        }

        if self.is_stationary() {
            if life > self.life_span - WITHER_TICKS {
                self.target_weight = 0.0;
            } else {
                self.target_weight = (self.target_weight + self.grow_speed).min(self.weight_limit);
            }
            return;
        }

        if life > self.life_span - SENESCENCE_TICKS {
            self.max_speed_target = 0.0;
        }

        self.fullness -= FULLNESS_DECAY;
        if self.fullness < 0.0 {
            self.fullness = 0.0;
            self.life_span -= STARVATION_DRAIN;
        }
    }

    /// Raise the birth flag on scheduled ticks and schedule the next one.
    pub fn update_birth<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.birth = self.is_alive() && self.life == self.birth_time;
        if self.life >= self.birth_time {
            self.birth_time = self.life + self.next_birth_offset(rng);
        }
    }
}
