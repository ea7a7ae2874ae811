use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::types::*;

/// Narrowphase primitive tests.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn ray_rect(origin: Vec2, dir: Vec2, rect: Rect) -> Option<SweepHit> {
        // Slab method with normal tracking; returns earliest t >= 0
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        let mut n_enter = Vec2::ZERO;

        for axis in [Axis::X, Axis::Y] {
            let i = axis.index();
            let (o, d, lo, hi) = (origin[i], dir[i], rect.min[i], rect.max[i]);
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            let mut n = -1.0;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
                n = 1.0;
            }
            if t1 > tmin {
                tmin = t1;
                n_enter = match axis {
                    Axis::X => Vec2::new(n, 0.0),
                    Axis::Y => Vec2::new(0.0, n),
                };
            }
            if t2 < tmax {
                tmax = t2;
            }
            if tmin > tmax {
                return None;
            }
        }

        // Box entirely behind the origin
        if tmax < 0.0 {
            return None;
        }
        // Zero direction with the origin inside: immediate hit
        if !tmin.is_finite() {
            return Some(SweepHit {
                toi: 0.0,
                normal: Vec2::ZERO,
                contact: origin,
            });
        }

        // If origin inside, tmin < 0; treat as immediate hit
        let toi = if tmin < 0.0 { 0.0 } else { tmin };
        let contact = origin + dir * toi;
        let normal = if tmin < 0.0 { Vec2::ZERO } else { n_enter };
        Some(SweepHit {
            toi,
            normal,
            contact,
        })
    }

    fn line_circle(a: Vec2, b: Vec2, center: Vec2, r: f32) -> Option<(f32, f32)> {
        // Solve |a + t d - c|^2 = r^2 over the whole line
        let d = b - a;
        let m = a - center;
        let acoef = d.length_squared();
        if acoef <= f32::EPSILON {
            return None;
        }
        let bcoef = 2.0 * m.dot(d);
        let ccoef = m.length_squared() - r * r;
        let disc = bcoef * bcoef - 4.0 * acoef * ccoef;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        let t0 = (-bcoef - sqrt_disc) / (2.0 * acoef);
        let t1 = (-bcoef + sqrt_disc) / (2.0 * acoef);
        Some((t0, t1))
    }

    fn slab_interval(origin: Vec2, delta: Vec2, rect: Rect) -> Option<SlabHit> {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut entry_axis = None;

        for axis in [Axis::X, Axis::Y] {
            let i = axis.index();
            let (o, d, lo, hi) = (origin[i], delta[i], rect.min[i], rect.max[i]);
            if d.abs() < f32::EPSILON {
                // No motion on this axis: only the open interior counts
                if o <= lo || o >= hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
            }
            if t1 > t_enter {
                t_enter = t1;
                entry_axis = Some(axis);
            }
            if t2 < t_exit {
                t_exit = t2;
            }
            if t_enter >= t_exit {
                return None;
            }
        }

        let axis = entry_axis?;
        Some(SlabHit {
            t_enter,
            t_exit,
            axis,
        })
    }

    fn overlap_rect_rect(a: Rect, b: Rect) -> Option<Overlap> {
        if !a.penetrates(&b) {
            return None;
        }
        // Distance A must travel to leave B towards -axis and towards +axis
        let to_min = a.max - b.min;
        let to_max = b.max - a.min;
        let exit = to_min.min(to_max);
        let axis = if exit.x <= exit.y { Axis::X } else { Axis::Y };
        let i = axis.index();
        let mut normal = Vec2::ZERO;
        normal[i] = if to_min[i] <= to_max[i] { -1.0 } else { 1.0 };
        Some(Overlap {
            normal,
            depth: exit[i],
            axis,
        })
    }

    fn sweep_rect_rect(mover: Rect, delta: Vec2, obstacle: Rect) -> Option<SlabHit> {
        let expanded = obstacle.expand(mover.half_extents());
        Self::slab_interval(mover.center(), delta, expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[test]
    fn test_overlap_rect_rect_basic() {
        let a = Rect::from_center(Vec2::ZERO, Vec2::ONE);
        let b = Rect::from_center(Vec2::new(1.5, 0.0), Vec2::ONE);
        let o = Narrowphase::overlap_rect_rect(a, b).unwrap();
        assert!((o.depth - 0.5).abs() < 1e-5);
        // A sits left of B, so it is pushed further left
        assert_eq!(o.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_overlap_rect_rect_separated() {
        let a = Rect::from_center(Vec2::ZERO, Vec2::ONE);
        let b = Rect::from_center(Vec2::new(3.1, 0.0), Vec2::ONE);
        assert!(Narrowphase::overlap_rect_rect(a, b).is_none());
    }

    #[test]
    fn test_overlap_rect_rect_takes_nearest_exit_when_contained() {
        let outer = Rect::new(Vec2::ZERO, Vec2::new(100.0, 40.0));
        let inner = Rect::new(Vec2::new(10.0, 5.0), Vec2::new(10.0, 30.0));
        let o = Narrowphase::overlap_rect_rect(inner, outer).unwrap();
        // Leaving left takes 20 units, up 35
        assert_eq!(o.axis, Axis::X);
        assert!((o.depth - 20.0).abs() < 1e-5);
        assert_eq!(o.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_overlap_rect_rect_edge_touch_is_none() {
        let a = Rect::new(Vec2::ZERO, Vec2::splat(10.0));
        let b = Rect::new(Vec2::new(10.0, 0.0), Vec2::splat(10.0));
        assert!(Narrowphase::overlap_rect_rect(a, b).is_none());
    }

    #[test]
    fn test_ray_rect_hit() {
        let r = Rect::from_center(Vec2::ZERO, Vec2::ONE);
        let hit = Narrowphase::ray_rect(Vec2::new(-5.0, 0.0), Vec2::X, r).unwrap();
        assert!((hit.toi - 4.0).abs() < 1e-5);
        assert!((hit.normal.x + 1.0).abs() < 1e-5);
        assert!((hit.contact.x + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ray_rect_parallel_miss_and_behind() {
        let r = Rect::from_center(Vec2::ZERO, Vec2::ONE);
        assert!(Narrowphase::ray_rect(Vec2::new(-5.0, 2.0), Vec2::X, r).is_none());
        assert!(Narrowphase::ray_rect(Vec2::new(5.0, 0.0), Vec2::X, r).is_none());
    }

    #[test]
    fn test_ray_rect_origin_inside() {
        let r = Rect::from_center(Vec2::ZERO, Vec2::ONE);
        let hit = Narrowphase::ray_rect(Vec2::new(0.5, 0.0), Vec2::X, r).unwrap();
        assert_eq!(hit.toi, 0.0);
        assert_eq!(hit.normal, Vec2::ZERO);
    }

    #[test]
    fn test_line_circle_roots() {
        let (t0, t1) =
            Narrowphase::line_circle(Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0), Vec2::ZERO, 1.0)
                .unwrap();
        assert!((t0 - 0.25).abs() < 1e-5);
        assert!((t1 - 0.75).abs() < 1e-5);
        assert!(
            Narrowphase::line_circle(Vec2::new(-2.0, 3.0), Vec2::new(2.0, 3.0), Vec2::ZERO, 1.0)
                .is_none()
        );
        assert!(Narrowphase::line_circle(Vec2::ONE, Vec2::ONE, Vec2::ZERO, 1.0).is_none());
    }

    #[test]
    fn test_slab_interval_entry_axis() {
        let r = rect(10.0, -10.0, 10.0, 20.0);
        let hit = Narrowphase::slab_interval(Vec2::ZERO, Vec2::new(20.0, 0.0), r).unwrap();
        assert_eq!(hit.axis, Axis::X);
        assert!((hit.t_enter - 0.5).abs() < 1e-6);
        assert!((hit.t_exit - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_slab_interval_grazing_edge_is_a_miss() {
        // Moving along y = 0 exactly on the rect's top edge
        let r = rect(10.0, 0.0, 10.0, 10.0);
        assert!(Narrowphase::slab_interval(Vec2::ZERO, Vec2::new(30.0, 0.0), r).is_none());
    }

    #[test]
    fn test_slab_interval_origin_inside_has_negative_entry() {
        let r = rect(-5.0, -5.0, 10.0, 10.0);
        let hit = Narrowphase::slab_interval(Vec2::ZERO, Vec2::new(10.0, 0.0), r).unwrap();
        assert!(hit.t_enter < 0.0);
        assert!((hit.t_exit - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_slab_interval_zero_delta_is_none() {
        let r = rect(-5.0, -5.0, 10.0, 10.0);
        assert!(Narrowphase::slab_interval(Vec2::ZERO, Vec2::ZERO, r).is_none());
    }

    #[test]
    fn test_sweep_rect_rect_head_on() {
        let mover = Rect::from_center(Vec2::new(-3.0, 0.0), Vec2::ONE);
        let wall = Rect::from_center(Vec2::ZERO, Vec2::ONE);
        let hit = Narrowphase::sweep_rect_rect(mover, Vec2::new(5.0, 0.0), wall).unwrap();
        assert!((hit.t_enter - 0.2).abs() < 1e-5);
        assert_eq!(hit.axis, Axis::X);
    }
}
