//! Discrete Voronoi diagram over particle positions.
//!
//! Generators are rasterized onto a uniform grid one merge-radius wide per
//! cell, claimed cells flood outward breadth-first, and a bounded number of
//! relaxation sweeps repairs cells that a nearer generator should own. Every
//! place where three mutually distinct owners meet across a 2x2 block is
//! reported as a triangle node exactly once.

use std::collections::VecDeque;

use glam::Vec2;

#[derive(Clone, Copy)]
struct Generator {
    center: Vec2,
    tag: usize,
}

struct FillTask {
    x: usize,
    y: usize,
    cell: usize,
    generator: u32,
}

/// Voronoi triangulation helper for elastic-triad construction.
pub struct VoronoiDiagram {
    generators: Vec<Generator>,
    count_x: usize,
    count_y: usize,
    /// Owning generator slot per cell, filled by [`VoronoiDiagram::generate`].
    diagram: Vec<Option<u32>>,
}

impl VoronoiDiagram {
    pub fn new(generator_capacity: usize) -> Self {
        Self {
            generators: Vec::with_capacity(generator_capacity),
            count_x: 0,
            count_y: 0,
            diagram: Vec::new(),
        }
    }

    /// Register a generator point carrying an arbitrary `tag` (a particle
    /// index, for the callers in this crate).
    pub fn add_generator(&mut self, center: Vec2, tag: usize) {
        self.generators.push(Generator { center, tag });
    }

    /// Rasterize and flood the diagram. Generators closer together than
    /// `radius` land in one cell and merge: the first to claim the cell wins.
    pub fn generate(&mut self, radius: f32) {
        debug_assert!(self.diagram.is_empty(), "generate runs once per diagram");
        if self.generators.is_empty() {
            return;
        }
        let inverse_radius = 1.0 / radius;
        let mut lower = Vec2::splat(f32::MAX);
        let mut upper = Vec2::splat(f32::MIN);
        for g in &self.generators {
            lower = lower.min(g.center);
            upper = upper.max(g.center);
        }
        self.count_x = 1 + (inverse_radius * (upper.x - lower.x)) as usize;
        self.count_y = 1 + (inverse_radius * (upper.y - lower.y)) as usize;
        self.diagram = vec![None; self.count_x * self.count_y];

        // Work in cell units from here on.
        for g in &mut self.generators {
            g.center = inverse_radius * (g.center - lower);
        }

        // Breadth-first claim outward from each generator's own cell.
        let mut queue: VecDeque<FillTask> = VecDeque::new();
        for (slot, g) in self.generators.iter().enumerate() {
            let x = (g.center.x as usize).min(self.count_x - 1);
            let y = (g.center.y as usize).min(self.count_y - 1);
            queue.push_back(FillTask {
                x,
                y,
                cell: x + y * self.count_x,
                generator: slot as u32,
            });
        }
        while let Some(task) = queue.pop_front() {
            if self.diagram[task.cell].is_some() {
                continue;
            }
            self.diagram[task.cell] = Some(task.generator);
            self.push_neighbors(&mut queue, task.x, task.y, task.generator);
        }

        // The flood is first-come-first-served, so repair cells where a
        // neighboring column/row is owned by a strictly nearer generator.
        let max_iterations = self.count_x + self.count_y;
        for _ in 0..max_iterations {
            for y in 0..self.count_y {
                for x in 0..self.count_x.saturating_sub(1) {
                    let cell = x + y * self.count_x;
                    let a = self.diagram[cell];
                    let b = self.diagram[cell + 1];
                    if a != b {
                        queue.push_back(FillTask { x, y, cell, generator: b.unwrap() });
                        queue.push_back(FillTask {
                            x: x + 1,
                            y,
                            cell: cell + 1,
                            generator: a.unwrap(),
                        });
                    }
                }
            }
            for y in 0..self.count_y.saturating_sub(1) {
                for x in 0..self.count_x {
                    let cell = x + y * self.count_x;
                    let a = self.diagram[cell];
                    let b = self.diagram[cell + self.count_x];
                    if a != b {
                        queue.push_back(FillTask { x, y, cell, generator: b.unwrap() });
                        queue.push_back(FillTask {
                            x,
                            y: y + 1,
                            cell: cell + self.count_x,
                            generator: a.unwrap(),
                        });
                    }
                }
            }
            let mut updated = false;
            while let Some(task) = queue.pop_front() {
                let occupant = self.diagram[task.cell].expect("flooded diagram has no holes");
                if occupant == task.generator {
                    continue;
                }
                let p = Vec2::new(task.x as f32, task.y as f32);
                let candidate = self.generators[task.generator as usize].center - p;
                let current = self.generators[occupant as usize].center - p;
                if candidate.length_squared() < current.length_squared() {
                    self.diagram[task.cell] = Some(task.generator);
                    self.push_neighbors(&mut queue, task.x, task.y, task.generator);
                    updated = true;
                }
            }
            if !updated {
                break;
            }
        }
    }

    fn push_neighbors(&self, queue: &mut VecDeque<FillTask>, x: usize, y: usize, generator: u32) {
        if x > 0 {
            queue.push_back(FillTask { x: x - 1, y, cell: x - 1 + y * self.count_x, generator });
        }
        if y > 0 {
            queue.push_back(FillTask { x, y: y - 1, cell: x + (y - 1) * self.count_x, generator });
        }
        if x < self.count_x - 1 {
            queue.push_back(FillTask { x: x + 1, y, cell: x + 1 + y * self.count_x, generator });
        }
        if y < self.count_y - 1 {
            queue.push_back(FillTask { x, y: y + 1, cell: x + (y + 1) * self.count_x, generator });
        }
    }

    /// Invoke `callback` with the generator tags of every triangle node:
    /// each 2x2 block of cells owned by three distinct generators yields one
    /// node, and no triangle is reported twice.
    pub fn get_nodes(&self, mut callback: impl FnMut(usize, usize, usize)) {
        for y in 0..self.count_y.saturating_sub(1) {
            for x in 0..self.count_x.saturating_sub(1) {
                let cell = x + y * self.count_x;
                let a = self.diagram[cell];
                let b = self.diagram[cell + 1];
                let c = self.diagram[cell + self.count_x];
                let d = self.diagram[cell + 1 + self.count_x];
                if b != c {
                    let (b, c) = (b.unwrap(), c.unwrap());
                    if a != Some(b) && a != Some(c) {
                        let a = a.unwrap();
                        callback(
                            self.generators[a as usize].tag,
                            self.generators[b as usize].tag,
                            self.generators[c as usize].tag,
                        );
                    }
                    if d != Some(b) && d != Some(c) {
                        let d = d.unwrap();
                        callback(
                            self.generators[b as usize].tag,
                            self.generators[d as usize].tag,
                            self.generators[c as usize].tag,
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes_of(diagram: &VoronoiDiagram) -> Vec<[usize; 3]> {
        let mut nodes = Vec::new();
        diagram.get_nodes(|a, b, c| {
            let mut node = [a, b, c];
            node.sort_unstable();
            nodes.push(node);
        });
        nodes
    }

    #[test]
    fn triangle_of_generators_yields_their_node() {
        let mut diagram = VoronoiDiagram::new(3);
        diagram.add_generator(Vec2::new(0.0, 0.0), 10);
        diagram.add_generator(Vec2::new(1.0, 0.0), 11);
        diagram.add_generator(Vec2::new(0.5, 1.0), 12);
        diagram.generate(0.1);

        let nodes = nodes_of(&diagram);
        assert!(
            nodes.contains(&[10, 11, 12]),
            "expected the three generators to meet, got {nodes:?}"
        );
    }

    #[test]
    fn collinear_pair_has_no_node() {
        let mut diagram = VoronoiDiagram::new(2);
        diagram.add_generator(Vec2::new(0.0, 0.0), 0);
        diagram.add_generator(Vec2::new(1.0, 0.0), 1);
        diagram.generate(0.1);
        assert!(nodes_of(&diagram).is_empty());
    }

    #[test]
    fn merged_generators_collapse_to_one_cell() {
        // Closer together than the merge radius: the diagram behaves as if
        // only one of them existed, so no three-owner node can form.
        let mut diagram = VoronoiDiagram::new(3);
        diagram.add_generator(Vec2::new(0.0, 0.0), 0);
        diagram.add_generator(Vec2::new(0.01, 0.0), 1);
        diagram.add_generator(Vec2::new(0.02, 0.01), 2);
        diagram.generate(1.0);
        assert!(nodes_of(&diagram).is_empty());
    }

    #[test]
    fn lattice_reports_each_triangle_once() {
        // Slightly irregular lattice so no cell boundary lands on an exact
        // tie between generators.
        let mut diagram = VoronoiDiagram::new(9);
        for y in 0..3 {
            for x in 0..3 {
                let jitter = 0.11 * ((x * 2 + y * 5) % 3) as f32;
                diagram.add_generator(Vec2::new(x as f32 + jitter, y as f32 - jitter), x + y * 3);
            }
        }
        diagram.generate(0.5);

        let mut nodes = nodes_of(&diagram);
        let total = nodes.len();
        nodes.sort_unstable();
        nodes.dedup();
        assert_eq!(total, nodes.len(), "no triangle may be reported twice");
        assert!(total >= 4, "a 3x3 lattice should triangulate, got {total}");
    }
}
