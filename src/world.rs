/*
 * World Module
 *
 * The World owns every agent and the quadtree used for neighbour queries.
 * A tick:
 * 1. Rebuilds the quadtree from the current agent positions
 * 2. Lets every agent perceive its surroundings (read-only, optionally in
 *    parallel)
 * 3. Updates every agent in turn: steering, movement, predation, aging and
 *    reproduction
 * 4. Spawns the births requested during the tick
 * 5. Removes every agent whose weight dropped to zero
 */

use std::sync::Arc;

use nannou::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rayon::prelude::*;
use slotmap::SlotMap;
use tracing::{debug, trace};

use crate::agent::{Agent, AgentId, Neighbor, Perception};
use crate::debug::{DebugInfo, StrongestInfo};
use crate::params::{ParamsError, SimulationParams};
use crate::quadtree::{Boundary, QuadTree};
use crate::species::{self, Nursery, Species};

pub struct World {
    agents: SlotMap<AgentId, Agent>,
    quadtree: QuadTree<AgentId>,
    params: SimulationParams,
    rng: SmallRng,
    paused: bool,
    ticks: u64,
    debug_info: DebugInfo,
}

impl World {
    /// Build an empty world sized to the viewport in `params`.
    pub fn new(params: SimulationParams) -> Result<Self, ParamsError> {
        params.validate()?;

        let rng = match params.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let boundary = Boundary::centered(params.viewport_width, params.viewport_height);
        let quadtree = QuadTree::with_max_depth(boundary, params.quadtree_capacity, params.quadtree_max_depth);

        debug!(
            width = params.viewport_width,
            height = params.viewport_height,
            capacity = params.quadtree_capacity,
            seed = ?params.rng_seed,
            "world created"
        );

        Ok(Self {
            agents: SlotMap::with_key(),
            quadtree,
            paused: params.pause_simulation,
            params,
            rng,
            ticks: 0,
            debug_info: DebugInfo::default(),
        })
    }

    /// Create the initial population listed in the parameters.
    pub fn populate(&mut self) -> Result<usize, ParamsError> {
        let mut plan = Vec::with_capacity(self.params.populations.len());
        for (name, &count) in &self.params.populations {
            let species = species::lookup(name).ok_or_else(|| ParamsError::UnknownSpecies(name.clone()))?;
            plan.push((species, count));
        }

        let mut created = 0;
        for (species, count) in plan {
            created += self.create(species, count).len();
        }
        debug!(created, "initial population spawned");
        Ok(created)
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn add(&mut self, agent: Agent) -> AgentId {
        self.agents.insert(agent)
    }

    /// Build an agent of `species` at `position` and add it to the world.
    pub fn spawn(&mut self, species: Arc<dyn Species>, position: Point2, weight: Option<f32>) -> AgentId {
        let mut agent = Agent::new(species, position, weight, &mut self.rng);
        if agent.is_stationary() {
            let (half_width, half_height) = self.params.half_extent();
            agent.settle_within(half_width, half_height, &mut self.rng);
        }
        self.add(agent)
    }

    /// Spawn `count` agents of `species` at random positions in the viewport.
    pub fn create(&mut self, species: Arc<dyn Species>, count: usize) -> Vec<AgentId> {
        let (half_width, half_height) = self.params.half_extent();
        (0..count)
            .map(|_| {
                let position = pt2(
                    self.rng.gen_range(-half_width..half_width),
                    self.rng.gen_range(-half_height..half_height),
                );
                self.spawn(species.clone(), position, None)
            })
            .collect()
    }

    pub fn stop(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    pub fn agents(&self) -> impl Iterator<Item = (AgentId, &Agent)> {
        self.agents.iter()
    }

    pub fn quadtree(&self) -> &QuadTree<AgentId> {
        &self.quadtree
    }

    pub fn debug_info(&self) -> &DebugInfo {
        &self.debug_info
    }

    pub fn debug_info_mut(&mut self) -> &mut DebugInfo {
        &mut self.debug_info
    }

    /// Number of ticks the simulation has advanced while running.
    pub fn elapsed_ticks(&self) -> u64 {
        self.ticks
    }

    /// The heaviest agent, if any.
    pub fn strongest(&self) -> Option<(AgentId, &Agent)> {
        self.agents
            .iter()
            .max_by(|a, b| a.1.weight.total_cmp(&b.1.weight))
    }

    /// Entities currently inside the sight cone of `id`, according to the
    /// index built at the start of the last tick.
    pub fn neighbors_of(&self, id: AgentId) -> Vec<AgentId> {
        self.perceive(id).in_sight.iter().map(|n| n.id).collect()
    }

    /// Clear the quadtree and insert every agent at its current position.
    /// Returns the number of agents that fell outside the index region.
    pub fn rebuild_index(&mut self) -> usize {
        self.quadtree.clear();
        let mut unindexed = 0;
        for (id, agent) in &self.agents {
            if !self.quadtree.insert(agent.position, id) {
                unindexed += 1;
            }
        }
        unindexed
    }

    /// Advance the simulation by one frame.
    pub fn tick(&mut self) -> &DebugInfo {
        let unindexed = self.rebuild_index();
        let mut births = 0;
        let mut predations = 0;

        if !self.paused {
            let ids: Vec<AgentId> = self.agents.keys().collect();

            let perceptions: Vec<Perception> = if self.params.enable_parallel {
                ids.par_iter().map(|&id| self.perceive(id)).collect()
            } else {
                ids.iter().map(|&id| self.perceive(id)).collect()
            };

            let mut nursery = Nursery::new();
            for (id, perception) in ids.into_iter().zip(perceptions) {
                if self.step(id, perception, &mut nursery) {
                    predations += 1;
                }
            }

            births = nursery.len();
            for birth in nursery.drain() {
                let child = self.spawn(birth.species, birth.position, birth.weight);
                trace!(?child, "agent born");
            }
            self.ticks += 1;
        }

        let before = self.agents.len();
        self.agents.retain(|_, agent| agent.is_alive());
        let deaths = before - self.agents.len();

        self.refresh_debug_info(births, deaths, predations, unindexed);
        self.debug_info.log();
        &self.debug_info
    }

    // Query the index around an agent and sort the results into what it sees
    fn perceive(&self, id: AgentId) -> Perception {
        let Some(agent) = self.agents.get(id) else {
            return Perception::default();
        };
        if agent.is_stationary() || !agent.is_alive() {
            return Perception::default();
        }

        let candidates = self.quadtree.query_circle(agent.position, agent.perception_radius());
        let mut perception = agent.perceive(
            id,
            candidates
                .into_iter()
                .filter_map(|other_id| self.agents.get(other_id).map(|other| Neighbor::observe(other_id, other, id))),
        );
        perception.target_position = agent
            .target
            .and_then(|prey| self.agents.get(prey))
            .filter(|prey| prey.is_alive())
            .map(|prey| prey.position);
        perception
    }

    // Update a single agent. Returns true if it ate this tick.
    fn step(&mut self, id: AgentId, perception: Perception, nursery: &mut Nursery) -> bool {
        let half_extent = self.params.half_extent();
        let weights = self.params.behavior;

        let target = match self.agents.get_mut(id) {
            // Eaten earlier this tick
            Some(agent) if !agent.is_alive() => return false,
            Some(agent) if agent.is_stationary() => {
                agent.grow();
                None
            }
            Some(agent) => {
                agent.act(perception, &weights, half_extent);
                agent.target
            }
            None => return false,
        };

        let predated = match target {
            Some(prey) => self.resolve_predation(id, prey),
            None => false,
        };

        let Some(agent) = self.agents.get_mut(id) else {
            return predated;
        };
        agent.age();
        agent.update_birth(&mut self.rng);
        let species = agent.species().clone();
        species.on_tick(agent, nursery, &mut self.rng);

        predated
    }

    // Eat the prey if it is still alive and within reach
    fn resolve_predation(&mut self, predator_id: AgentId, prey_id: AgentId) -> bool {
        let prey = self
            .agents
            .get(prey_id)
            .filter(|prey| prey.is_alive())
            .map(|prey| (prey.position, prey.weight));

        let Some(predator) = self.agents.get_mut(predator_id) else {
            return false;
        };
        let Some((prey_position, prey_weight)) = prey else {
            predator.target = None;
            return false;
        };
        if !predator.in_reach(prey_position) {
            return false;
        }

        let gained = predator.consume(prey_weight);
        trace!(?predator_id, ?prey_id, prey_weight, gained, "predation");

        if let Some(prey) = self.agents.get_mut(prey_id) {
            prey.kill();
        }
        true
    }

    fn refresh_debug_info(&mut self, births: usize, deaths: usize, predations: usize, unindexed: usize) {
        let mut population_by_kind = std::collections::BTreeMap::new();
        for agent in self.agents.values() {
            *population_by_kind.entry(agent.kind()).or_insert(0) += 1;
        }

        let strongest = self.strongest().map(|(_, agent)| StrongestInfo {
            kind: agent.kind(),
            weight: agent.weight,
            sight: agent.sight,
            sight_angle_degrees: agent.sight_angle.to_degrees(),
            in_sight: agent.in_sight.len(),
            query_nodes: self.quadtree.count_query_nodes(agent.position, agent.sight),
        });

        let info = &mut self.debug_info;
        info.tick = self.ticks;
        info.population = self.agents.len();
        info.population_by_kind = population_by_kind;
        info.births = births;
        info.deaths = deaths;
        info.predations = predations;
        info.unindexed = unindexed;
        info.quadtree_nodes = self.quadtree.node_count();
        info.strongest = strongest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::{Bird, Life, Plant};
    use std::collections::BTreeMap;

    fn empty_world() -> World {
        let params = SimulationParams {
            rng_seed: Some(17),
            enable_parallel: false,
            populations: BTreeMap::new(),
            ..SimulationParams::default()
        };
        World::new(params).expect("world")
    }

    #[test]
    fn rejects_invalid_params() {
        let params = SimulationParams {
            viewport_width: -1.0,
            ..SimulationParams::default()
        };
        assert!(World::new(params).is_err());
    }

    #[test]
    fn populate_spawns_requested_counts() {
        let mut params = SimulationParams {
            rng_seed: Some(1),
            ..SimulationParams::default()
        };
        params.populations = BTreeMap::from([("bird".to_string(), 3), ("plant".to_string(), 5)]);
        let mut world = World::new(params).expect("world");
        assert_eq!(world.populate().expect("populate"), 8);
        assert_eq!(world.len(), 8);
        assert_eq!(world.agents().filter(|(_, a)| a.kind() == "plant").count(), 5);
    }

    #[test]
    fn rejects_unknown_species() {
        let mut params = SimulationParams {
            rng_seed: Some(1),
            ..SimulationParams::default()
        };
        params.populations = BTreeMap::from([("unicorn".to_string(), 1)]);
        assert!(matches!(World::new(params), Err(ParamsError::UnknownSpecies(name)) if name == "unicorn"));
    }

    #[test]
    fn rebuild_counts_agents_outside_region() {
        let mut world = empty_world();
        world.spawn(Arc::new(Life), pt2(0.0, 0.0), None);
        world.spawn(Arc::new(Life), pt2(5000.0, 0.0), None);
        assert_eq!(world.rebuild_index(), 1);
        assert_eq!(world.quadtree().len(), 1);
    }

    #[test]
    fn paused_world_only_rebuilds() {
        let mut world = empty_world();
        let id = world.spawn(Arc::new(Bird), pt2(0.0, 0.0), Some(10.0));
        world.stop();
        let before = world.get(id).expect("agent").position;
        world.tick();
        assert_eq!(world.get(id).expect("agent").position, before);
        assert_eq!(world.elapsed_ticks(), 0);
        assert_eq!(world.quadtree().len(), 1);

        world.resume();
        world.tick();
        assert_eq!(world.elapsed_ticks(), 1);
    }

    #[test]
    fn dead_agents_are_compacted() {
        let mut world = empty_world();
        let doomed = world.spawn(Arc::new(Life), pt2(0.0, 0.0), Some(10.0));
        let survivor = world.spawn(Arc::new(Life), pt2(200.0, 0.0), Some(10.0));
        world.get_mut(doomed).expect("agent").kill();

        let info = world.tick().clone();
        assert!(world.get(doomed).is_none());
        assert!(world.get(survivor).is_some());
        assert_eq!(info.deaths, 1);
        assert!(world.agents().all(|(_, a)| a.weight > 0.0));
    }

    #[test]
    fn plants_are_kept_inside_the_viewport() {
        let mut world = empty_world();
        let id = world.spawn(Arc::new(Plant), pt2(10_000.0, -10_000.0), None);
        let plant = world.get(id).expect("plant");
        let (hw, hh) = world.params().half_extent();
        assert!(plant.position.x <= hw && plant.position.x >= hw - 100.0);
        assert!(plant.position.y >= -hh && plant.position.y <= -hh + 100.0);
    }

    #[test]
    fn neighbors_of_uses_the_sight_cone() {
        let mut world = empty_world();
        let watcher = world.spawn(Arc::new(Life), pt2(0.0, 0.0), Some(10.0));
        let ahead = world.spawn(Arc::new(Life), pt2(30.0, 0.0), Some(10.0));
        let _behind = world.spawn(Arc::new(Life), pt2(-30.0, 0.0), Some(10.0));
        world.get_mut(watcher).expect("agent").heading = 0.0;
        world.rebuild_index();

        assert_eq!(world.neighbors_of(watcher), vec![ahead]);
    }
}
