/*
 * Debug Information Module
 *
 * This module defines the DebugInfo struct that summarises the last tick:
 * population per species, births, deaths and predation events, the size of
 * the spatial index, and a closer look at the heaviest agent.
 */

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

/// Perception figures for the heaviest agent in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrongestInfo {
    pub kind: &'static str,
    pub weight: f32,
    pub sight: f32,
    pub sight_angle_degrees: f32,
    /// Entities inside its sight cone.
    pub in_sight: usize,
    /// Quadtree nodes its sight query visits.
    pub query_nodes: usize,
}

// Debug information about the last tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugInfo {
    pub fps: f32,
    pub frame_time: Duration,
    pub tick: u64,
    pub population: usize,
    pub population_by_kind: BTreeMap<&'static str, usize>,
    pub births: usize,
    pub deaths: usize,
    pub predations: usize,
    /// Agents outside the index region this tick (beyond the viewport,
    /// before wrapping), invisible to everyone's perception.
    pub unindexed: usize,
    pub quadtree_nodes: usize,
    pub strongest: Option<StrongestInfo>,
}

impl DebugInfo {
    pub fn log(&self) {
        debug!(
            tick = self.tick,
            population = self.population,
            births = self.births,
            deaths = self.deaths,
            predations = self.predations,
            unindexed = self.unindexed,
            quadtree_nodes = self.quadtree_nodes,
            "tick complete"
        );
    }

    /// Multi-line overlay text.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("tick: {}", self.tick),
            format!("fps: {:.0} ({:.1} ms)", self.fps, self.frame_time.as_secs_f32() * 1000.0),
            format!("population: {}", self.population),
        ];
        for (kind, count) in &self.population_by_kind {
            lines.push(format!("  {kind}: {count}"));
        }
        lines.push(format!(
            "births: {}  deaths: {}  predations: {}",
            self.births, self.deaths, self.predations
        ));
        lines.push(format!("quadtree nodes: {}", self.quadtree_nodes));
        if let Some(s) = &self.strongest {
            lines.push(format!("strongest: {} weight {:.2}", s.kind, s.weight));
            lines.push(format!(
                "  sight {:.1} / {:.1}°, in sight {}, nodes queried {}",
                s.sight, s.sight_angle_degrees, s.in_sight, s.query_nodes
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_species_and_strongest() {
        let mut info = DebugInfo {
            tick: 12,
            population: 3,
            ..DebugInfo::default()
        };
        info.population_by_kind.insert("bird", 2);
        info.population_by_kind.insert("plant", 1);
        info.strongest = Some(StrongestInfo {
            kind: "bird",
            weight: 14.5,
            sight: 94.5,
            sight_angle_degrees: 72.0,
            in_sight: 1,
            query_nodes: 3,
        });

        info.frame_time = Duration::from_millis(20);

        let text = info.summary();
        assert!(text.contains("tick: 12"));
        assert!(text.contains("(20.0 ms)"));
        assert!(text.contains("  bird: 2"));
        assert!(text.contains("  plant: 1"));
        assert!(text.contains("strongest: bird weight 14.50"));
    }
}
