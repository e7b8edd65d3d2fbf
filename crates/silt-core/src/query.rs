//! Particle queries over the sorted proxy range.

use glam::Vec2;

use crate::grid;
use crate::math::Aabb;
use crate::system::ParticleSystem;

impl ParticleSystem {
    /// Invoke `callback` for every particle strictly inside `aabb`, in tag
    /// order. Returning `false` stops the enumeration.
    ///
    /// The proxy order reflects the positions at the last contact update;
    /// particles moved since then by direct buffer writes may be missed.
    pub fn query_aabb(&self, mut callback: impl FnMut(usize) -> bool, aabb: &Aabb) {
        if self.proxies.is_empty() {
            return;
        }
        let (first, last) = self.proxy_range(aabb);
        for proxy in &self.proxies[first..last] {
            let i = proxy.index;
            let p = self.store.position[i];
            if aabb.lower.x < p.x && p.x < aabb.upper.x && aabb.lower.y < p.y && p.y < aabb.upper.y
            {
                if !callback(i) {
                    break;
                }
            }
        }
    }

    /// Cast the segment `point1 -> point2` against every particle disc in
    /// its path, nearest candidates limited by the callback's returned
    /// fraction. The callback receives `(index, point, normal, fraction)`
    /// and returns the new maximum fraction; a non-positive return stops the
    /// cast.
    pub fn ray_cast(
        &self,
        mut callback: impl FnMut(usize, Vec2, Vec2, f32) -> f32,
        point1: Vec2,
        point2: Vec2,
    ) {
        if self.proxies.is_empty() {
            return;
        }
        let inverse_diameter = self.inverse_diameter;
        let first = grid::lower_bound(
            &self.proxies,
            grid::compute_tag(
                inverse_diameter * point1.x.min(point2.x) - 1.0,
                inverse_diameter * point1.y.min(point2.y) - 1.0,
            ),
        );
        let last = grid::upper_bound(
            &self.proxies,
            grid::compute_tag(
                inverse_diameter * point1.x.max(point2.x) + 1.0,
                inverse_diameter * point1.y.max(point2.y) + 1.0,
            ),
        );
        let mut fraction = 1.0f32;
        // Solving ((1 - t) * point1 + t * point2 - position)^2 = diameter^2
        // for the smallest admissible t.
        let v = point2 - point1;
        let v2 = v.dot(v);
        if v2 <= 0.0 {
            return;
        }
        for proxy in &self.proxies[first..last] {
            let i = proxy.index;
            let p = point1 - self.store.position[i];
            let pv = p.dot(v);
            let p2 = p.dot(p);
            let determinant = pv * pv - v2 * (p2 - self.squared_diameter);
            if determinant >= 0.0 {
                let sqrt_determinant = determinant.sqrt();
                let mut t = (-pv - sqrt_determinant) / v2;
                if t > fraction {
                    continue;
                }
                if t < 0.0 {
                    t = (-pv + sqrt_determinant) / v2;
                    if t < 0.0 || t > fraction {
                        continue;
                    }
                }
                let n = (p + t * v).normalize_or_zero();
                let f = callback(i, point1 + t * v, n, t);
                fraction = fraction.min(f);
                if fraction <= 0.0 {
                    break;
                }
            }
        }
    }
}
