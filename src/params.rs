/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct that configures a World:
 * viewport size, spatial index tuning, behaviour weights shared by every
 * agent, the random seed and the initial population of each species.
 * Parameters can be loaded from a JSON file; missing fields fall back to
 * their defaults.
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quadtree::{DEFAULT_CAPACITY, DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};
use crate::species::KNOWN_SPECIES;

/// Errors raised while building or validating simulation parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    /// A value that cannot be used (e.g., a non-positive viewport).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A population entry names a species the registry does not know.
    #[error("unknown species `{0}`")]
    UnknownSpecies(String),
    #[error("failed to read parameters from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse parameters: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Scale factors applied to each steering behaviour before the forces are
/// summed into an agent's acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorWeights {
    pub separate: f32,
    pub align: f32,
    pub cohesion: f32,
    pub avoid: f32,
    /// Strength of the seek force towards a prey target.
    pub pursuit: f32,
}

impl Default for BehaviorWeights {
    fn default() -> Self {
        Self {
            separate: 0.9,
            align: 0.6,
            cohesion: 0.6,
            avoid: 1.0,
            pursuit: 3.0,
        }
    }
}

impl BehaviorWeights {
    fn is_valid(&self) -> bool {
        [self.separate, self.align, self.cohesion, self.avoid, self.pursuit]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
    }
}

// Parameters for a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub quadtree_capacity: usize,
    pub quadtree_max_depth: u32,
    pub behavior: BehaviorWeights,
    /// Seed for the world RNG; `None` draws one from the OS.
    pub rng_seed: Option<u64>,
    /// Run the perception pass across threads.
    pub enable_parallel: bool,
    pub pause_simulation: bool,
    pub show_quadtree: bool,
    /// Species name to initial head count.
    pub populations: BTreeMap<String, usize>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        let mut populations = BTreeMap::new();
        populations.insert("bird".to_string(), 24);
        populations.insert("life".to_string(), 40);
        populations.insert("plant".to_string(), 60);

        Self {
            viewport_width: 1280.0,
            viewport_height: 800.0,
            quadtree_capacity: DEFAULT_CAPACITY,
            quadtree_max_depth: DEFAULT_MAX_DEPTH,
            behavior: BehaviorWeights::default(),
            rng_seed: None,
            enable_parallel: true,
            pause_simulation: false,
            show_quadtree: false,
            populations,
        }
    }
}

impl SimulationParams {
    /// Parse parameters from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ParamsError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ParamsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.viewport_width > 0.0 && self.viewport_height > 0.0) {
            return Err(ParamsError::InvalidConfig("viewport dimensions must be positive"));
        }
        if !self.viewport_width.is_finite() || !self.viewport_height.is_finite() {
            return Err(ParamsError::InvalidConfig("viewport dimensions must be finite"));
        }
        if self.quadtree_capacity == 0 {
            return Err(ParamsError::InvalidConfig("quadtree_capacity must be at least 1"));
        }
        if self.quadtree_max_depth > MAX_DEPTH_LIMIT {
            return Err(ParamsError::InvalidConfig("quadtree_max_depth must be at most 20"));
        }
        if !self.behavior.is_valid() {
            return Err(ParamsError::InvalidConfig("behaviour weights must be finite and non-negative"));
        }
        if let Some(name) = self.populations.keys().find(|name| !KNOWN_SPECIES.contains(&name.as_str())) {
            return Err(ParamsError::UnknownSpecies(name.clone()));
        }
        Ok(())
    }

    pub fn half_extent(&self) -> (f32, f32) {
        (self.viewport_width / 2.0, self.viewport_height / 2.0)
    }
}
