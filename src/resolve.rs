//! Swept AABB displacement resolution against many static obstacles.
//!
//! The mover's centre is cast along the proposed displacement against each
//! obstacle grown by the mover's half extents (Minkowski sum). The contact
//! axis of an obstacle is the slab entered last; the most imminent contact
//! is clipped first, leaving an `epsilon` gap, and the sweep is repeated
//! with the clipped displacement until nothing is hit.
//!
//! A mover that already penetrates an obstacle is handled separately: only
//! the axis of its shortest way out counts, and only motion pushing further
//! in along that axis is clipped, back to the obstacle's face.

use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::config::ResolverConfig;
use crate::narrowphase::Narrowphase;
use crate::types::*;
use crate::vector::sign;

/// Resolve `displacement` of `mover` against `obstacles`.
///
/// Obstacles the mover starts inside of are cleared along their shortest
/// exit axis, and only when the motion pushes deeper along it; sliding
/// along or leaving them is free. A zero displacement is returned untouched
/// (resting contact is a grounded probe's job, not a sweep's).
pub fn resolve_displacement(
    mover: Rect,
    displacement: Vec2,
    obstacles: &[Rect],
    cfg: &ResolverConfig,
) -> Resolution {
    if displacement.length_squared() == 0.0 || obstacles.is_empty() {
        return Resolution::unobstructed(displacement);
    }

    let mut d = displacement;
    let mut blocked = Blocked::NONE;
    let mut contacts = Vec::new();

    for pass in 0..cfg.max_passes {
        let Some(clip) = most_imminent(mover, d, obstacles, cfg.epsilon) else {
            break;
        };
        let i = clip.axis.index();
        blocked |= Blocked::from_motion(clip.axis, sign(d[i]));
        d[i] = clip.to;
        contacts.push(Contact {
            obstacle: clip.index,
            axis: clip.axis,
            toi: clip.toi,
        });
        log::trace!(
            "resolve pass {pass}: obstacle {} on {:?} at t={:.4}, d -> {d:?}",
            clip.index,
            clip.axis,
            clip.toi
        );
    }

    Resolution {
        displacement: d,
        correction: d - displacement,
        blocked,
        contacts,
    }
}

/// Convenience over tagged obstacles.
pub fn resolve_against(
    mover: Rect,
    displacement: Vec2,
    obstacles: &[Obstacle],
    cfg: &ResolverConfig,
) -> Resolution {
    let rects: Vec<Rect> = obstacles.iter().map(|o| o.rect).collect();
    resolve_displacement(mover, displacement, &rects, cfg)
}

/// One axis clip: `d[axis]` becomes `to`.
struct Clip {
    index: usize,
    axis: Axis,
    /// Entry fraction; negative for an obstacle the mover started inside.
    toi: f32,
    to: f32,
}

fn most_imminent(mover: Rect, d: Vec2, obstacles: &[Rect], epsilon: f32) -> Option<Clip> {
    let mut best: Option<Clip> = None;
    for (index, ob) in obstacles.iter().enumerate() {
        let clip = if let Some(inside) = Narrowphase::overlap_rect_rect(mover, *ob) {
            let i = inside.axis.index();
            let push = inside.normal[i];
            // Zero or outward motion on the exit axis: sliding along or leaving
            if d[i] * push >= 0.0 {
                continue;
            }
            Clip {
                index,
                axis: inside.axis,
                toi: -inside.depth / d[i].abs(),
                to: push * (inside.depth + epsilon),
            }
        } else {
            let Some(hit) = Narrowphase::sweep_rect_rect(mover, d, *ob) else {
                continue;
            };
            if hit.t_enter < 0.0 || hit.t_enter > 1.0 {
                continue;
            }
            let i = hit.axis.index();
            Clip {
                index,
                axis: hit.axis,
                toi: hit.t_enter,
                to: d[i] * hit.t_enter - sign(d[i]) * epsilon,
            }
        };
        if best.as_ref().is_none_or(|b| clip.toi < b.toi) {
            best = Some(clip);
        }
    }
    best
}

/// Index of an obstacle whose top lies within `probe` of the rect's bottom edge
/// and which sits under it horizontally.
pub fn probe_below(mover: Rect, obstacles: &[Obstacle], probe: f32) -> Option<usize> {
    let feet = mover.bottom();
    obstacles.iter().position(|o| {
        o.rect.left() < mover.right()
            && o.rect.right() > mover.left()
            && o.rect.top() >= feet - probe
            && o.rect.top() <= feet + probe
    })
}
