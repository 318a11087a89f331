/*
 * QuadTree Module
 *
 * Spatial index for neighbor lookups. The region is split recursively into
 * four equal quadrants once a node holds more than `capacity` entries, so a
 * circular query only has to visit the nodes whose region touches the
 * query's bounding square.
 *
 * The tree is rebuilt from scratch every tick: there is no removal API,
 * moving entities are simply re-inserted after `clear()`.
 */

use nannou::prelude::*;

/// Default number of entries a node holds before it subdivides.
pub const DEFAULT_CAPACITY: usize = 4;

/// Default depth at which nodes stop subdividing. Coincident points pile up
/// in a node at this depth instead of recursing forever.
pub const DEFAULT_MAX_DEPTH: u32 = 16;

/// Deepest configurable tree. Past this, node extents in a viewport-sized
/// region approach f32 resolution.
pub const MAX_DEPTH_LIMIT: u32 = 20;

/// Axis-aligned region given by its minimum corner and its extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Boundary {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Region of the given size centered on the origin.
    pub fn centered(w: f32, h: f32) -> Self {
        Self::new(-w / 2.0, -h / 2.0, w, h)
    }

    /// Bounding square of a circle.
    pub fn around(center: Point2, radius: f32) -> Self {
        Self::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0)
    }

    /// Half-open containment: the minimum edges belong to the region, the
    /// maximum edges do not, so neighbouring quadrants never share a point.
    #[inline]
    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }

    #[inline]
    pub fn intersects(&self, other: &Boundary) -> bool {
        !(other.x > self.x + self.w
            || other.x + other.w < self.x
            || other.y > self.y + self.h
            || other.y + other.h < self.y)
    }

    #[inline]
    fn contains_inclusive(&self, p: Point2) -> bool {
        self.x <= p.x && p.x <= self.x + self.w && self.y <= p.y && p.y <= self.y + self.h
    }

    pub fn center(&self) -> Point2 {
        pt2(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

struct Children<T> {
    northeast: QuadTree<T>,
    northwest: QuadTree<T>,
    southeast: QuadTree<T>,
    southwest: QuadTree<T>,
}

impl<T> Children<T> {
    fn iter(&self) -> impl Iterator<Item = &QuadTree<T>> {
        [&self.northeast, &self.northwest, &self.southeast, &self.southwest].into_iter()
    }
}

/// A quadtree node storing `(position, item)` pairs.
pub struct QuadTree<T> {
    boundary: Boundary,
    capacity: usize,
    depth: u32,
    max_depth: u32,
    entries: Vec<(Point2, T)>,
    children: Option<Box<Children<T>>>,
}

impl<T: Copy> QuadTree<T> {
    pub fn new(boundary: Boundary, capacity: usize) -> Self {
        Self::with_max_depth(boundary, capacity, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(boundary: Boundary, capacity: usize, max_depth: u32) -> Self {
        Self::node(boundary, capacity.max(1), 0, max_depth)
    }

    fn node(boundary: Boundary, capacity: usize, depth: u32, max_depth: u32) -> Self {
        Self {
            boundary,
            capacity,
            depth,
            max_depth,
            entries: Vec::with_capacity(capacity),
            children: None,
        }
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn is_divided(&self) -> bool {
        self.children.is_some()
    }

    // Split this node into four equal quadrants
    fn subdivide(&mut self) {
        let Boundary { x, y, w, h } = self.boundary;
        let (w, h) = (w / 2.0, h / 2.0);
        let depth = self.depth + 1;
        let child = |bx, by| QuadTree::node(Boundary::new(bx, by, w, h), self.capacity, depth, self.max_depth);

        self.children = Some(Box::new(Children {
            northeast: child(x + w, y),
            northwest: child(x, y),
            southeast: child(x + w, y + h),
            southwest: child(x, y + h),
        }));
    }

    /// Insert an item at `position`. Returns false only when the position
    /// lies outside this node's region.
    pub fn insert(&mut self, position: Point2, item: T) -> bool {
        if !self.boundary.contains(position) {
            return false;
        }

        if self.entries.len() < self.capacity || self.depth >= self.max_depth {
            self.entries.push((position, item));
            return true;
        }

        if self.children.is_none() {
            self.subdivide();
        }

        let Some(children) = self.children.as_mut() else {
            return false;
        };

        let placed = children.northeast.insert(position, item)
            || children.northwest.insert(position, item)
            || children.southeast.insert(position, item)
            || children.southwest.insert(position, item);

        // Child edges can round short of this node's far edge
        if !placed {
            self.entries.push((position, item));
        }
        true
    }

    /// All items within `radius` of `center`.
    pub fn query_circle(&self, center: Point2, radius: f32) -> Vec<T> {
        let mut found = Vec::new();
        self.query_circle_into(center, radius, &mut found);
        found
    }

    /// Like [`QuadTree::query_circle`] but appends into a caller-owned buffer.
    pub fn query_circle_into(&self, center: Point2, radius: f32, found: &mut Vec<T>) {
        let range = Boundary::around(center, radius);
        self.collect_circle(center, radius, &range, found);
    }

    fn collect_circle(&self, center: Point2, radius: f32, range: &Boundary, found: &mut Vec<T>) {
        if !self.boundary.intersects(range) {
            return;
        }

        let radius_sq = radius * radius;
        found.extend(
            self.entries
                .iter()
                .filter(|(p, _)| p.distance_squared(center) <= radius_sq)
                .map(|&(_, item)| item),
        );

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_circle(center, radius, range, found);
            }
        }
    }

    /// All items inside the rectangle (edges inclusive).
    pub fn query_rect(&self, range: &Boundary) -> Vec<T> {
        let mut found = Vec::new();
        self.collect_rect(range, &mut found);
        found
    }

    fn collect_rect(&self, range: &Boundary, found: &mut Vec<T>) {
        if !self.boundary.intersects(range) {
            return;
        }

        found.extend(
            self.entries
                .iter()
                .filter(|(p, _)| range.contains_inclusive(*p))
                .map(|&(_, item)| item),
        );

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_rect(range, found);
            }
        }
    }

    /// Drop every entry and child node, leaving a single empty leaf.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.children = None;
    }

    /// Number of stored items in the whole subtree.
    pub fn len(&self) -> usize {
        self.entries.len()
            + self
                .children
                .as_ref()
                .map_or(0, |c| c.iter().map(QuadTree::len).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes in the subtree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |c| c.iter().map(QuadTree::node_count).sum())
    }

    /// Number of nodes a circle query visits, i.e. nodes whose region touches
    /// the query's bounding square.
    pub fn count_query_nodes(&self, center: Point2, radius: f32) -> usize {
        let range = Boundary::around(center, radius);
        self.count_nodes_intersecting(&range)
    }

    fn count_nodes_intersecting(&self, range: &Boundary) -> usize {
        if !self.boundary.intersects(range) {
            return 0;
        }
        1 + self
            .children
            .as_ref()
            .map_or(0, |c| c.iter().map(|child| child.count_nodes_intersecting(range)).sum())
    }

    /// Regions of every node, parents before children.
    pub fn boundaries(&self) -> Vec<Boundary> {
        let mut out = Vec::with_capacity(self.node_count());
        self.collect_boundaries(&mut out);
        out
    }

    fn collect_boundaries(&self, out: &mut Vec<Boundary>) {
        out.push(self.boundary);
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_boundaries(out);
            }
        }
    }

    /// Every stored `(position, item)` pair in the subtree.
    pub fn entries(&self) -> Vec<(Point2, T)> {
        let mut out = Vec::with_capacity(self.len());
        self.collect_entries(&mut out);
        out
    }

    fn collect_entries(&self, out: &mut Vec<(Point2, T)>) {
        out.extend(self.entries.iter().copied());
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_entries(out);
            }
        }
    }

    #[cfg(test)]
    fn max_depth_reached(&self) -> u32 {
        self.children.as_ref().map_or(self.depth, |c| {
            c.iter().map(QuadTree::max_depth_reached).max().unwrap_or(self.depth)
        })
    }
}
