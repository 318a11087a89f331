/*
 * Renderer Module
 *
 * Draws the world with nannou: plants first (back to front by height),
 * then mobile agents rotated to their heading. Each species draws its own
 * shape in the agent's local frame. Optionally overlays the quadtree
 * partition and the debug summary.
 */

use nannou::prelude::*;

use crate::agent::Agent;
use crate::world::World;

// Render the world
pub fn draw_world(draw: &Draw, world: &World) {
    if world.params().show_quadtree {
        draw_quadtree(draw, world);
    }

    let (mut plants, animals): (Vec<&Agent>, Vec<&Agent>) =
        world.agents().map(|(_, agent)| agent).partition(|agent| agent.is_stationary());
    plants.sort_by(|a, b| b.position.y.total_cmp(&a.position.y));

    for plant in plants {
        draw_agent(draw, plant);
    }
    for animal in animals {
        draw_agent(draw, animal);
    }

    if world.params().show_quadtree {
        draw_summary(draw, world);
    }
}

fn draw_agent(draw: &Draw, agent: &Agent) {
    let local = draw.xy(agent.position);
    let local = if agent.is_stationary() {
        local
    } else {
        local.rotate(agent.heading)
    };
    agent.species().render_shape(agent, &local);
}

// Outline every quadtree node
fn draw_quadtree(draw: &Draw, world: &World) {
    for boundary in world.quadtree().boundaries() {
        let center = boundary.center();
        draw.rect()
            .x_y(center.x, center.y)
            .w_h(boundary.w, boundary.h)
            .no_fill()
            .stroke_weight(1.0)
            .stroke(rgba(1.0, 1.0, 1.0, 0.25));
    }

    if let Some((_, strongest)) = world.strongest() {
        draw.ellipse()
            .xy(strongest.position)
            .w_h(strongest.sight * 2.0, strongest.sight * 2.0)
            .no_fill()
            .stroke_weight(2.0)
            .stroke(rgba(0.0, 1.0, 0.0, 0.6));
        for neighbor in &strongest.in_sight {
            draw.line()
                .start(strongest.position)
                .end(neighbor.position)
                .weight(1.0)
                .color(rgba(1.0, 0.0, 0.0, 0.6));
        }
    }
}

fn draw_summary(draw: &Draw, world: &World) {
    let params = world.params();
    let (half_width, half_height) = params.half_extent();
    draw.text(&world.debug_info().summary())
        .x_y(-half_width + 160.0, half_height - 90.0)
        .w_h(300.0, 160.0)
        .left_justify()
        .align_text_top()
        .font_size(12)
        .color(WHITE);
}
