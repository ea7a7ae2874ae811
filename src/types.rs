use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;

/// User-defined opaque key carried through queries (the world packs its `ActorId` here).
pub type ColKey = u64;

/// Handle of a body (a shared position) inside the collider registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub u32);

/// Handle of a registered collider.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColliderId(pub u32);

/// Handle of a simulated actor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl ActorId {
    pub fn key(self) -> ColKey {
        self.0 as ColKey
    }

    pub fn from_key(key: ColKey) -> Self {
        Self(key as u32)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

/// Horizontal facing / side.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// Side for a signed scalar; `None` for zero.
    pub fn from_sign(x: f32) -> Option<Self> {
        if x > 0.0 {
            Some(Facing::Right)
        } else if x < 0.0 {
            Some(Facing::Left)
        } else {
            None
        }
    }
}

/// Axis-aligned rectangle in screen space (+y down): `min` is the top-left corner.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// Rect from a corner and a size; negative sizes are normalised.
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        let p1 = pos + size;
        Self {
            min: pos.min(p1),
            max: pos.max(p1),
        }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        let h = half_extents.abs();
        Self {
            min: center - h,
            max: center + h,
        }
    }

    /// Checked constructor from the four edges.
    pub fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Result<Self, PhysicsError> {
        if !(left <= right && top <= bottom) {
            return Err(PhysicsError::InvalidRect {
                left,
                right,
                top,
                bottom,
            });
        }
        Ok(Self {
            min: Vec2::new(left, top),
            max: Vec2::new(right, bottom),
        })
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.min.x
    }
    #[inline]
    pub fn right(&self) -> f32 {
        self.max.x
    }
    #[inline]
    pub fn top(&self) -> f32 {
        self.min.y
    }
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.max.y
    }
    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    #[inline]
    pub fn translate(&self, d: Vec2) -> Rect {
        Rect {
            min: self.min + d,
            max: self.max + d,
        }
    }

    /// Grow on every side by `amount` per axis (Minkowski sum with a centred box).
    #[inline]
    pub fn expand(&self, amount: Vec2) -> Rect {
        Rect {
            min: self.min - amount,
            max: self.max + amount,
        }
    }

    #[inline]
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Non-strict overlap: edge-touching counts, so resting contacts register.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Strict overlap: positive-area intersection only.
    #[inline]
    pub fn penetrates(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Overlap depth per axis (negative when separated on that axis).
    pub fn overlap_depth(&self, other: &Rect) -> Vec2 {
        self.max.min(other.max) - self.min.max(other.min)
    }
}

/// Collision tag. Responses branch on this, never on the owning actor type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderTag {
    Player,
    Terrain,
    /// Stair step whose uphill side is to the left.
    StairLeft,
    /// Stair step whose uphill side is to the right.
    StairRight,
    Enemy,
    Projectile,
    Trigger,
    Pickup,
}

impl ColliderTag {
    /// Tags that block movement.
    pub fn is_solid(self) -> bool {
        match self {
            ColliderTag::Terrain | ColliderTag::StairLeft | ColliderTag::StairRight => true,
            ColliderTag::Player
            | ColliderTag::Enemy
            | ColliderTag::Projectile
            | ColliderTag::Trigger
            | ColliderTag::Pickup => false,
        }
    }

    /// Direction you walk to go up this stair.
    pub fn uphill(self) -> Option<Facing> {
        match self {
            ColliderTag::StairLeft => Some(Facing::Left),
            ColliderTag::StairRight => Some(Facing::Right),
            _ => None,
        }
    }
}

/// Which sides were halted during a resolution (+y down).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Blocked(pub u8);

impl Blocked {
    pub const NONE: Self = Self(0);
    /// Upward motion halted (head bump).
    pub const ABOVE: Self = Self(1 << 0);
    /// Downward motion halted (landed).
    pub const BELOW: Self = Self(1 << 1);
    pub const LEFT: Self = Self(1 << 2);
    pub const RIGHT: Self = Self(1 << 3);

    pub const HORIZONTAL: Self = Self(Self::LEFT.0 | Self::RIGHT.0);
    pub const VERTICAL: Self = Self(Self::ABOVE.0 | Self::BELOW.0);

    /// Flag for motion along `axis` with the given sign being stopped.
    pub fn from_motion(axis: Axis, dir: f32) -> Self {
        match (axis, dir > 0.0) {
            (Axis::X, true) => Self::RIGHT,
            (Axis::X, false) => Self::LEFT,
            (Axis::Y, true) => Self::BELOW,
            (Axis::Y, false) => Self::ABOVE,
        }
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Blocked {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Blocked {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A blocking rectangle handed to the resolver.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Obstacle {
    pub rect: Rect,
    pub tag: ColliderTag,
}

impl Obstacle {
    pub fn terrain(rect: Rect) -> Self {
        Self {
            rect,
            tag: ColliderTag::Terrain,
        }
    }
}

/// One collider to register. Its bounds follow `body` every query.
#[derive(Copy, Clone, Debug)]
pub struct ColliderDesc {
    pub body: BodyId,
    /// Top-left corner relative to the body position.
    pub offset: Vec2,
    pub size: Vec2,
    pub tag: ColliderTag,
    /// Triggers are reported by queries but never block.
    pub is_trigger: bool,
    /// Optional user key echoed in query results.
    pub owner: Option<ColKey>,
}

/// Slab test result of a segment against a rect.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SlabHit {
    /// Latest slab entry (may be negative when the origin is already inside).
    pub t_enter: f32,
    /// Earliest slab exit.
    pub t_exit: f32,
    /// Axis whose slab was entered last.
    pub axis: Axis,
}

/// Ray/segment hit.
#[derive(Copy, Clone, Debug)]
pub struct SweepHit {
    /// Distance along the ray in units of `dir`.
    pub toi: f32,
    /// Entry normal (zero when the origin starts inside).
    pub normal: Vec2,
    pub contact: Vec2,
}

/// Minimal translation out of a penetration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Overlap {
    /// Push direction for A out of B (axis-aligned unit).
    pub normal: Vec2,
    /// Distance along `normal` to clear B (> 0).
    pub depth: f32,
    pub axis: Axis,
}

/// One blocking contact found by the resolver.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Contact {
    /// Index into the obstacle slice passed to the resolver.
    pub obstacle: usize,
    pub axis: Axis,
    /// Entry fraction of the displacement at which the contact happened;
    /// negative when the mover started inside the obstacle.
    pub toi: f32,
}

/// Output of the displacement resolver.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    /// Displacement to actually apply.
    pub displacement: Vec2,
    /// `displacement - proposed`.
    pub correction: Vec2,
    pub blocked: Blocked,
    /// Contacts in resolution order.
    pub contacts: Vec<Contact>,
}

impl Resolution {
    pub fn unobstructed(displacement: Vec2) -> Self {
        Self {
            displacement,
            correction: Vec2::ZERO,
            blocked: Blocked::NONE,
            contacts: Vec::new(),
        }
    }

    /// The earliest contact, for callers that only honour one collision.
    pub fn first_contact(&self) -> Option<&Contact> {
        self.contacts.first()
    }
}

/// Per-tick control intent, filled by the host's input layer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Desired horizontal direction in [-1, 1].
    pub move_x: f32,
    pub jump: bool,
    pub grapple: bool,
    /// Aim direction for the grapple (need not be normalised).
    pub aim: Vec2,
}

/// Gameplay events buffered during a tick and handed out by `World::drain_events`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    PlayerDamaged {
        player: ActorId,
        source: ActorId,
        amount: f32,
        health: f32,
    },
    PlayerDefeated {
        player: ActorId,
    },
    ProjectileSpawned {
        projectile: ActorId,
        source: ActorId,
    },
    PickupCollected {
        pickup: ActorId,
        by: ActorId,
        value: u32,
    },
    GrappleAttached {
        actor: ActorId,
        anchor: Vec2,
        radius: f32,
    },
    /// `broken` is set when terrain cut the swing short rather than the player letting go.
    GrappleReleased {
        actor: ActorId,
        broken: bool,
    },
    ActorRemoved {
        actor: ActorId,
    },
}
