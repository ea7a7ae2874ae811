//! platbonk: 2D platformer physics (swept AABB resolution, stairs, grapple, actors)

pub mod error;
pub mod vector;
pub mod types;
pub mod api;
pub mod narrowphase;
pub mod arena;
pub mod registry;
pub mod resolve;
pub mod integrator;
pub mod config;
pub mod tiles;
pub mod stairs;
pub mod grapple;
pub mod movement;
pub mod actors;
pub mod world;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::PhysicsError;
pub use crate::config::*;
pub use crate::narrowphase::Narrowphase;
pub use crate::registry::ColliderRegistry;
pub use crate::resolve::{probe_below, resolve_against, resolve_displacement};
pub use crate::integrator::PhysicsBody;
pub use crate::tiles::{TileGrid, TileKind};
pub use crate::stairs::{StairController, StairMode};
pub use crate::grapple::{FuelTanks, Grapple, Swing};
pub use crate::actors::{AttackPolicy, EnemySpec, MovePolicy, PlayerSpec};
pub use crate::world::{World, WorldStats};
