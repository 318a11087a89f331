/*
 * Life Ecosystem Simulation - Module Definitions
 *
 * This file defines the module structure for the ecosystem simulation.
 * The core (quadtree, agents, species, world) runs headless; the renderer
 * draws it with nannou.
 */

// Re-export key components for easier access
pub use agent::{Agent, AgentId, Neighbor, Perception, Traits};
pub use debug::DebugInfo;
pub use params::{BehaviorWeights, ParamsError, SimulationParams};
pub use quadtree::{Boundary, QuadTree};
pub use species::{Bird, Life, Nursery, Plant, Species};
pub use world::World;

// Define modules
pub mod agent;
pub mod debug;
pub mod params;
pub mod quadtree;
pub mod renderer;
pub mod species;
pub mod steering;
pub mod world;
