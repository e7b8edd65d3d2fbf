use glam::Vec2;

/// 2-D rotation stored as sine/cosine.
///
/// The components are not required to be normalized; the rigid-group solver
/// deliberately builds scaled "differential" rotations whose application is
/// still a plain linear map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rot {
    pub s: f32,
    pub c: f32,
}

impl Rot {
    pub const IDENTITY: Self = Self { s: 0.0, c: 1.0 };

    /// Rotation by `angle` radians.
    #[inline]
    pub fn new(angle: f32) -> Self {
        Self {
            s: angle.sin(),
            c: angle.cos(),
        }
    }

    /// Apply the rotation to a vector.
    #[inline]
    pub fn apply(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Compose two rotations: `self` after `other`.
    #[inline]
    pub fn mul(&self, other: &Rot) -> Rot {
        Rot {
            s: self.s * other.c + self.c * other.s,
            c: self.c * other.c - self.s * other.s,
        }
    }
}

/// Rigid transform: rotation followed by translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub p: Vec2,
    pub q: Rot,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        p: Vec2::ZERO,
        q: Rot::IDENTITY,
    };

    #[inline]
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self {
            p: position,
            q: Rot::new(angle),
        }
    }

    /// Transform a point: `q * v + p`.
    #[inline]
    pub fn apply(&self, v: Vec2) -> Vec2 {
        self.q.apply(v) + self.p
    }

    /// Compose two transforms: `self` after `other`.
    #[inline]
    pub fn mul(&self, other: &Transform) -> Transform {
        Transform {
            p: self.q.apply(other.p) + self.p,
            q: self.q.mul(&other.q),
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub lower: Vec2,
    pub upper: Vec2,
}

impl Aabb {
    /// An empty box that absorbs the first point fed to [`Aabb::encapsulate`].
    pub const EMPTY: Self = Self {
        lower: Vec2::new(f32::MAX, f32::MAX),
        upper: Vec2::new(f32::MIN, f32::MIN),
    };

    #[inline]
    pub fn new(lower: Vec2, upper: Vec2) -> Self {
        Self { lower, upper }
    }

    /// Grow the box to contain `p`.
    #[inline]
    pub fn encapsulate(&mut self, p: Vec2) {
        self.lower = self.lower.min(p);
        self.upper = self.upper.max(p);
    }

    /// Smallest box containing both operands.
    #[inline]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Pad the box by `margin` on every side.
    #[inline]
    pub fn inflate(&mut self, margin: f32) {
        self.lower -= Vec2::splat(margin);
        self.upper += Vec2::splat(margin);
    }

    /// Inclusive containment test.
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        self.lower.x <= p.x && p.x <= self.upper.x && self.lower.y <= p.y && p.y <= self.upper.y
    }
}

/// Input for a fixture ray cast: the segment `p1 -> p2`, clipped to
/// `max_fraction` of its length.
#[derive(Clone, Copy, Debug)]
pub struct RayCastInput {
    pub p1: Vec2,
    pub p2: Vec2,
    pub max_fraction: f32,
}

/// A fixture ray-cast hit: fraction along the input segment plus the surface
/// normal at the hit point.
#[derive(Clone, Copy, Debug)]
pub struct RayCastHit {
    pub fraction: f32,
    pub normal: Vec2,
}
