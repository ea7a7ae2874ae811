//! Stair handling: stepped stair tiles behave like ramps.
//!
//! While on stairs, a small downward step snaps the feet onto the highest stair
//! below, so walking downhill does not fall tile by tile. Otherwise stairs
//! are resolved like terrain, except that a step on the uphill side is climbed
//! and a step behind a downhill walker is ignored.

use glam::Vec2;

use crate::config::{ResolverConfig, StairConfig};
use crate::resolve::{probe_below, resolve_against};
use crate::types::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum StairMode {
    #[default]
    Normal,
    OnStairs,
}

/// Per-actor stair state, carried across ticks.
#[derive(Clone, Debug, Default)]
pub struct StairController {
    mode: StairMode,
}

/// A subset of the obstacle list, remembering the original indices.
#[derive(Default)]
struct Subset {
    obstacles: Vec<Obstacle>,
    index: Vec<usize>,
}

impl Subset {
    fn pick(all: &[Obstacle], keep: impl Fn(&Obstacle) -> bool) -> Self {
        let mut s = Subset::default();
        for (i, o) in all.iter().enumerate() {
            if keep(o) {
                s.push(i, *o);
            }
        }
        s
    }

    fn push(&mut self, index: usize, o: Obstacle) {
        self.obstacles.push(o);
        self.index.push(index);
    }

    /// Resolve against the subset, reporting contacts in terms of the full list.
    fn resolve(&self, mover: Rect, d: Vec2, cfg: &ResolverConfig) -> Resolution {
        let mut res = resolve_against(mover, d, &self.obstacles, cfg);
        for c in &mut res.contacts {
            c.obstacle = self.index[c.obstacle];
        }
        res
    }
}

fn spans(a: Rect, b: Rect) -> bool {
    a.left() < b.right() && a.right() > b.left()
}

fn merge(first: Resolution, second: Resolution, proposed: Vec2) -> Resolution {
    let displacement = first.displacement + second.displacement;
    let mut contacts = first.contacts;
    contacts.extend(second.contacts);
    Resolution {
        displacement,
        correction: displacement - proposed,
        blocked: first.blocked | second.blocked,
        contacts,
    }
}

impl StairController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> StairMode {
        self.mode
    }

    pub fn on_stairs(&self) -> bool {
        self.mode == StairMode::OnStairs
    }

    /// Drop out of stair mode (jumping, grappling).
    pub fn leave(&mut self) {
        self.set_mode(StairMode::Normal);
    }

    fn set_mode(&mut self, mode: StairMode) {
        if self.mode != mode {
            log::debug!("stair mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Resolve `d` for `mover` against `obstacles`, applying stair rules.
    pub fn resolve(
        &mut self,
        mover: Rect,
        d: Vec2,
        obstacles: &[Obstacle],
        stairs: &StairConfig,
        resolver: &ResolverConfig,
    ) -> Resolution {
        let moving = Facing::from_sign(d.x);
        if self.mode == StairMode::OnStairs && d.y >= 0.0 && d.y <= stairs.snap_down_threshold {
            if let Some(res) = self.snap_down(mover, d, moving, obstacles, stairs, resolver) {
                return res;
            }
        }
        self.standard(mover, d, moving, obstacles, stairs, resolver)
    }

    fn snap_down(
        &mut self,
        mover: Rect,
        d: Vec2,
        moving: Option<Facing>,
        obstacles: &[Obstacle],
        stairs: &StairConfig,
        resolver: &ResolverConfig,
    ) -> Option<Resolution> {
        let feet = mover.bottom();
        let moved = mover.translate(Vec2::new(d.x, 0.0));
        let (index, stair) = obstacles
            .iter()
            .enumerate()
            .filter(|(_, o)| o.tag.uphill().is_some() && spans(moved, o.rect))
            .filter(|(_, o)| {
                o.rect.top() >= feet - stairs.contact_tolerance
                    && o.rect.top() <= feet + stairs.probe_depth
            })
            .min_by(|a, b| a.1.rect.top().total_cmp(&b.1.rect.top()))?;
        if moving.is_some() && moving == stair.tag.uphill() {
            return None;
        }

        let walls = Subset::pick(obstacles, |o| o.tag.is_solid() && o.tag.uphill().is_none());
        let horizontal = walls.resolve(mover, Vec2::new(d.x, 0.0), resolver);
        let slid = mover.translate(horizontal.displacement);
        let snap = stair.rect.top() - resolver.epsilon - feet;
        let vertical = walls.resolve(slid, Vec2::new(0.0, snap), resolver);

        let mut res = merge(horizontal, vertical, d);
        if !res.blocked.contains(Blocked::BELOW) {
            res.contacts.push(Contact {
                obstacle: index,
                axis: Axis::Y,
                toi: 1.0,
            });
        }
        res.blocked |= Blocked::BELOW;
        log::trace!("stair snap to top {:.2} (dy {snap:.3})", stair.rect.top());
        Some(res)
    }

    fn standard(
        &mut self,
        mover: Rect,
        d: Vec2,
        moving: Option<Facing>,
        obstacles: &[Obstacle],
        stairs: &StairConfig,
        resolver: &ResolverConfig,
    ) -> Resolution {
        let feet = mover.bottom();
        let moved = mover.translate(Vec2::new(d.x, 0.0));
        let mut keep = Subset::default();
        let mut step: Option<(usize, Obstacle)> = None;

        for (i, o) in obstacles.iter().enumerate() {
            let Some(uphill) = o.tag.uphill() else {
                keep.push(i, *o);
                continue;
            };
            let top = o.rect.top();
            if top >= feet - stairs.contact_tolerance {
                // At or below the feet: an ordinary floor
                keep.push(i, *o);
                continue;
            }
            match moving {
                Some(dir) if dir != uphill => {}
                Some(_) if feet - top <= stairs.max_step_up && spans(moved, o.rect) => {
                    if step.is_none_or(|(_, s)| top < s.rect.top()) {
                        if let Some((j, prev)) = step {
                            keep.push(j, prev);
                        }
                        step = Some((i, *o));
                    } else {
                        keep.push(i, *o);
                    }
                }
                _ => keep.push(i, *o),
            }
        }

        if let Some((i, stair)) = step {
            let lift = Vec2::new(0.0, stair.rect.top() - resolver.epsilon - feet);
            let up = keep.resolve(mover, lift, resolver);
            if !up.blocked.contains(Blocked::ABOVE) {
                let raised = mover.translate(up.displacement);
                let across = keep.resolve(raised, Vec2::new(d.x, 0.0), resolver);
                let mut res = merge(up, across, d);
                res.blocked |= Blocked::BELOW;
                res.contacts.push(Contact {
                    obstacle: i,
                    axis: Axis::Y,
                    toi: 1.0,
                });
                log::trace!("stepped up {:.2}", -lift.y);
                self.set_mode(StairMode::OnStairs);
                return res;
            }
            // No headroom: the step is a wall
            keep.push(i, stair);
        }

        let res = keep.resolve(mover, d, resolver);
        let end = mover.translate(res.displacement);
        let reach = stairs.contact_tolerance + resolver.epsilon;
        let support = probe_below(end, &keep.obstacles, reach).map(|k| keep.obstacles[k].tag);
        match support {
            Some(tag) if tag.uphill().is_some() => self.set_mode(StairMode::OnStairs),
            _ => self.set_mode(StairMode::Normal),
        }
        res
    }
}
