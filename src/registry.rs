use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::arena::Arena;
use crate::error::PhysicsError;
use crate::narrowphase::Narrowphase;
use crate::types::*;

/// Owned registry of bodies (shared positions) and the colliders attached to them.
///
/// Removal is two-phase: `unregister`/`remove_body` only flag entries, which stay
/// visible to queries until `compact` swap-removes them.
#[derive(Default)]
pub struct ColliderRegistry {
    bodies: Arena<Vec2>,
    colliders: Arena<ColliderDesc>,
}

/// Debug statistics for the current registry contents.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub bodies: usize,
    pub colliders: usize,
    pub triggers: usize,
    pub pending_bodies: usize,
    pub pending_colliders: usize,
}

/// What one `compact` call removed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactReport {
    pub bodies: usize,
    pub colliders: usize,
}

impl ColliderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Bodies ------------------------------------------------------------

    pub fn add_body(&mut self, position: Vec2) -> BodyId {
        BodyId(self.bodies.insert(position))
    }

    pub fn position(&self, body: BodyId) -> Option<Vec2> {
        self.bodies.get(body.0).copied()
    }

    pub fn set_position(&mut self, body: BodyId, position: Vec2) -> Result<(), PhysicsError> {
        let p = self
            .bodies
            .get_mut(body.0)
            .ok_or(PhysicsError::UnknownBody(body))?;
        *p = position;
        Ok(())
    }

    /// Move a body and, through it, every collider attached to it.
    pub fn translate(&mut self, body: BodyId, d: Vec2) -> Result<(), PhysicsError> {
        let p = self
            .bodies
            .get_mut(body.0)
            .ok_or(PhysicsError::UnknownBody(body))?;
        *p += d;
        Ok(())
    }

    /// Flag a body and all of its colliders for removal.
    pub fn remove_body(&mut self, body: BodyId) -> bool {
        if !self.bodies.mark_removed(body.0) {
            return false;
        }
        let attached: Vec<u32> = self
            .colliders
            .iter()
            .filter(|(_, desc, _)| desc.body == body)
            .map(|(id, _, _)| id)
            .collect();
        for id in attached {
            self.colliders.mark_removed(id);
        }
        true
    }

    // --- Colliders ---------------------------------------------------------

    pub fn register(&mut self, desc: ColliderDesc) -> Result<ColliderId, PhysicsError> {
        if !self.bodies.contains(desc.body.0) {
            return Err(PhysicsError::UnknownBody(desc.body));
        }
        Ok(ColliderId(self.colliders.insert(desc)))
    }

    /// Convenience: a static body holding one collider covering `rect`.
    pub fn register_static(&mut self, rect: Rect, tag: ColliderTag) -> ColliderId {
        let body = self.add_body(rect.min);
        ColliderId(self.colliders.insert(ColliderDesc {
            body,
            offset: Vec2::ZERO,
            size: rect.size(),
            tag,
            is_trigger: false,
            owner: None,
        }))
    }

    /// Flag a collider for removal at the next `compact`.
    pub fn unregister(&mut self, id: ColliderId) -> bool {
        self.colliders.mark_removed(id.0)
    }

    pub fn is_pending_removal(&self, id: ColliderId) -> bool {
        self.colliders.is_marked(id.0)
    }

    pub fn desc(&self, id: ColliderId) -> Option<&ColliderDesc> {
        self.colliders.get(id.0)
    }

    /// World-space bounds, derived from the owning body's current position.
    pub fn bounds(&self, id: ColliderId) -> Option<Rect> {
        self.colliders.get(id.0).and_then(|d| self.rect_of(d))
    }

    /// Drop every flagged body and collider.
    pub fn compact(&mut self) -> CompactReport {
        let colliders = self.colliders.compact().len();
        let bodies = self.bodies.compact().len();
        if colliders + bodies > 0 {
            log::debug!("registry compacted: {bodies} bodies, {colliders} colliders");
        }
        CompactReport { bodies, colliders }
    }

    // --- Queries -----------------------------------------------------------

    /// Every other collider overlapping `id` (edge contact included), in storage order.
    ///
    /// Lazy and recomputed on every call. Callers that take only the first
    /// match get whichever comes first in storage order.
    pub fn query_overlaps(
        &self,
        id: ColliderId,
    ) -> impl Iterator<Item = (ColliderId, &ColliderDesc)> + '_ {
        let this = self.bounds(id);
        self.colliders.iter().filter_map(move |(cid, desc, _)| {
            let this = this?;
            if cid == id.0 {
                return None;
            }
            let r = self.rect_of(desc)?;
            this.overlaps(&r).then_some((ColliderId(cid), desc))
        })
    }

    /// Every collider overlapping `region`.
    pub fn query_rect(
        &self,
        region: Rect,
    ) -> impl Iterator<Item = (ColliderId, &ColliderDesc, Rect)> + '_ {
        self.colliders.iter().filter_map(move |(cid, desc, _)| {
            let r = self.rect_of(desc)?;
            region.overlaps(&r).then_some((ColliderId(cid), desc, r))
        })
    }

    /// Blocking colliders touching `region`, skipping those attached to `exclude`.
    pub fn solids_in(&self, region: Rect, exclude: Option<BodyId>) -> Vec<Obstacle> {
        self.query_rect(region)
            .filter(|(_, desc, _)| {
                desc.tag.is_solid() && !desc.is_trigger && Some(desc.body) != exclude
            })
            .map(|(_, desc, rect)| Obstacle {
                rect,
                tag: desc.tag,
            })
            .collect()
    }

    /// Closest collider hit by the ray among those `accept` lets through.
    pub fn raycast(
        &self,
        origin: Vec2,
        dir: Vec2,
        max_t: f32,
        accept: impl Fn(&ColliderDesc) -> bool,
    ) -> Option<(ColliderId, SweepHit, Option<ColKey>)> {
        if dir.length_squared() == 0.0 {
            return None;
        }
        let mut best: Option<(ColliderId, SweepHit, Option<ColKey>)> = None;
        for (cid, desc, _) in self.colliders.iter() {
            if !accept(desc) {
                continue;
            }
            let Some(rect) = self.rect_of(desc) else {
                continue;
            };
            let Some(h) = Narrowphase::ray_rect(origin, dir, rect) else {
                continue;
            };
            if h.toi < 0.0 || h.toi > max_t {
                continue;
            }
            match &best {
                Some((_, bh, _)) if h.toi >= bh.toi => {}
                _ => best = Some((ColliderId(cid), h, desc.owner)),
            }
        }
        best
    }

    /// Return debug stats for the current contents.
    pub fn debug_stats(&self) -> RegistryStats {
        RegistryStats {
            bodies: self.bodies.len(),
            colliders: self.colliders.len(),
            triggers: self.colliders.iter().filter(|(_, d, _)| d.is_trigger).count(),
            pending_bodies: self.bodies.pending_removals(),
            pending_colliders: self.colliders.pending_removals(),
        }
    }

    fn rect_of(&self, desc: &ColliderDesc) -> Option<Rect> {
        match self.bodies.get(desc.body.0) {
            Some(p) => Some(Rect::new(*p + desc.offset, desc.size)),
            None => {
                log::warn!("collider on missing body {:?} skipped", desc.body);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(body: BodyId, size: Vec2, tag: ColliderTag) -> ColliderDesc {
        ColliderDesc {
            body,
            offset: Vec2::ZERO,
            size,
            tag,
            is_trigger: false,
            owner: None,
        }
    }

    #[test]
    fn test_colliders_follow_shared_body() {
        let mut reg = ColliderRegistry::new();
        let body = reg.add_body(Vec2::new(10.0, 10.0));
        let hull = reg
            .register(desc(body, Vec2::splat(4.0), ColliderTag::Player))
            .unwrap();
        let reach = reg
            .register(ColliderDesc {
                offset: Vec2::new(-4.0, -4.0),
                size: Vec2::splat(12.0),
                is_trigger: true,
                ..desc(body, Vec2::ZERO, ColliderTag::Trigger)
            })
            .unwrap();
        reg.translate(body, Vec2::new(5.0, -2.0)).unwrap();
        assert_eq!(reg.bounds(hull).unwrap().min, Vec2::new(15.0, 8.0));
        assert_eq!(reg.bounds(reach).unwrap().min, Vec2::new(11.0, 4.0));
    }

    #[test]
    fn test_register_on_unknown_body_fails() {
        let mut reg = ColliderRegistry::new();
        let err = reg
            .register(desc(BodyId(7), Vec2::ONE, ColliderTag::Enemy))
            .unwrap_err();
        assert_eq!(err, PhysicsError::UnknownBody(BodyId(7)));
    }

    #[test]
    fn test_query_overlaps_excludes_self_and_is_restartable() {
        let mut reg = ColliderRegistry::new();
        let a = reg.register_static(Rect::new(Vec2::ZERO, Vec2::splat(10.0)), ColliderTag::Terrain);
        let b = reg.register_static(
            Rect::new(Vec2::new(10.0, 0.0), Vec2::splat(10.0)),
            ColliderTag::Terrain,
        );
        let _far = reg.register_static(
            Rect::new(Vec2::new(50.0, 50.0), Vec2::splat(1.0)),
            ColliderTag::Terrain,
        );
        let hits: Vec<ColliderId> = reg.query_overlaps(a).map(|(id, _)| id).collect();
        assert_eq!(hits, vec![b]);
        // Edge contact counts, and a second run yields the same sequence
        let again: Vec<ColliderId> = reg.query_overlaps(a).map(|(id, _)| id).collect();
        assert_eq!(hits, again);
        assert_eq!(reg.query_overlaps(ColliderId(999)).count(), 0);
    }

    #[test]
    fn test_removal_is_deferred_until_compact() {
        let mut reg = ColliderRegistry::new();
        let a = reg.register_static(Rect::new(Vec2::ZERO, Vec2::splat(10.0)), ColliderTag::Terrain);
        let b = reg.register_static(
            Rect::new(Vec2::splat(5.0), Vec2::splat(10.0)),
            ColliderTag::Enemy,
        );
        assert!(reg.unregister(b));
        assert!(reg.is_pending_removal(b));
        assert_eq!(reg.query_overlaps(a).count(), 1);
        assert_eq!(reg.debug_stats().pending_colliders, 1);

        let report = reg.compact();
        assert_eq!(report.colliders, 1);
        assert_eq!(reg.query_overlaps(a).count(), 0);
        assert!(reg.bounds(b).is_none());
    }

    #[test]
    fn test_remove_body_takes_its_colliders() {
        let mut reg = ColliderRegistry::new();
        let body = reg.add_body(Vec2::ZERO);
        reg.register(desc(body, Vec2::ONE, ColliderTag::Enemy)).unwrap();
        reg.register(desc(body, Vec2::splat(3.0), ColliderTag::Trigger)).unwrap();
        assert!(reg.remove_body(body));
        assert_eq!(reg.debug_stats().pending_colliders, 2);
        let report = reg.compact();
        assert_eq!(report, CompactReport { bodies: 1, colliders: 2 });
        assert_eq!(reg.debug_stats().colliders, 0);
        assert!(reg.position(body).is_none());
    }

    #[test]
    fn test_solids_in_filters_tags_and_own_body() {
        let mut reg = ColliderRegistry::new();
        let region = Rect::new(Vec2::ZERO, Vec2::splat(100.0));
        reg.register_static(Rect::new(Vec2::ZERO, Vec2::splat(10.0)), ColliderTag::Terrain);
        reg.register_static(
            Rect::new(Vec2::splat(20.0), Vec2::splat(10.0)),
            ColliderTag::StairRight,
        );
        reg.register_static(Rect::new(Vec2::splat(40.0), Vec2::splat(10.0)), ColliderTag::Pickup);
        let me = reg.add_body(Vec2::splat(60.0));
        reg.register(desc(me, Vec2::ONE, ColliderTag::Terrain)).unwrap();
        let solids = reg.solids_in(region, Some(me));
        assert_eq!(solids.len(), 2);
        assert!(solids.iter().all(|o| o.tag.is_solid()));
    }

    #[test]
    fn test_raycast_hits_closest() {
        let mut reg = ColliderRegistry::new();
        let tile = |x: f32| Rect::from_center(Vec2::new(x, 0.0), Vec2::splat(0.5));
        let near = reg.register_static(tile(2.0), ColliderTag::Terrain);
        let _far = reg.register_static(tile(4.0), ColliderTag::Terrain);
        let (id, hit, _) = reg
            .raycast(Vec2::ZERO, Vec2::X, 10.0, |d| d.tag.is_solid())
            .unwrap();
        assert_eq!(id, near);
        assert!((hit.toi - 1.5).abs() < 1e-5);
        assert!(reg.raycast(Vec2::ZERO, -Vec2::X, 10.0, |_| true).is_none());
        assert!(reg.raycast(Vec2::ZERO, Vec2::X, 1.0, |_| true).is_none());
    }
}
