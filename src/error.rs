use thiserror::Error;

use crate::types::{ActorId, BodyId, ColliderId};

/// Errors surfaced by construction-time validation and handle lookups.
///
/// Per-tick physics never returns these for numeric trouble: degenerate
/// vectors and empty axes are clamped or skipped instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("cannot normalize a zero-length vector")]
    ZeroLengthVector,

    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    #[error("rect edges out of order: left={left} right={right} top={top} bottom={bottom}")]
    InvalidRect {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
    },

    #[error("tile grid expects {expected} cells, got {got}")]
    InvalidTileGrid { expected: usize, got: usize },

    #[error("patrol bounds inverted: min_x={min_x} > max_x={max_x}")]
    InvalidPatrol { min_x: f32, max_x: f32 },

    #[error("tether radius must be positive and finite, got {radius}")]
    InvalidTether { radius: f32 },

    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),

    #[error("unknown collider {0:?}")]
    UnknownCollider(ColliderId),

    #[error("unknown actor {0:?}")]
    UnknownActor(ActorId),
}
