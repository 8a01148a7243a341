//! Arena of celestial bodies and the orbit tree between them.
//!
//! Bodies are owned by the [`Sky`] and referenced everywhere else through
//! generational [`BodyId`] handles. Parent, child and light-source links are
//! handles too, so dropping a body never leaks the rest of the tree and a
//! stale handle simply resolves to nothing.

use std::collections::VecDeque;

use glam::Vec2;

use crate::body::{DrawContext, OrbitLink};
use crate::orbit::Orbit;
use crate::{CelestialBody, Environment, ShaderHandle, SkyError, SpriteBatch};

/// Non-owning handle to a body in a [`Sky`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId {
    index: u32,
    generation: u32,
}

impl BodyId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    body: Option<CelestialBody>,
}

/// Owner of every body in a scene.
#[derive(Debug)]
pub struct Sky {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
    shading_shader: ShaderHandle,
}

impl Default for Sky {
    fn default() -> Self {
        Self::new()
    }
}

impl Sky {
    /// Create an empty sky using the shared [`ShaderHandle::shading`] shader.
    pub fn new() -> Self {
        Self::with_shading_shader(ShaderHandle::shading())
    }

    /// Create an empty sky that shades light-relative layers with `shader`.
    pub fn with_shading_shader(shader: ShaderHandle) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            shading_shader: shader,
        }
    }

    pub fn shading_shader(&self) -> &ShaderHandle {
        &self.shading_shader
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Take ownership of a body and return its handle.
    ///
    /// Links the body carried from a previous sky are dropped.
    pub fn insert(&mut self, mut body: CelestialBody) -> BodyId {
        body.orbit = None;
        body.orbit_children.clear();
        body.light_source = None;

        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            BodyId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                body: Some(body),
            });
            BodyId::new(index, 0)
        }
    }

    /// Remove a body, detaching it from its parent, children and any body
    /// using it as a light source.
    pub fn remove(&mut self, id: BodyId) -> Option<CelestialBody> {
        self.get(id)?;

        if let Some(parent) = self.get(id).and_then(|b| b.orbit_parent()) {
            self.unlink_child(parent, id);
        }
        let children = self.get(id).map(|b| b.orbit_children.clone()).unwrap_or_default();
        for child in children {
            if let Some(body) = self.get_mut(child) {
                body.orbit = None;
            }
        }
        for slot in &mut self.slots {
            if let Some(body) = slot.body.as_mut()
                && body.light_source == Some(id)
            {
                body.light_source = None;
            }
        }

        let slot = &mut self.slots[id.index as usize];
        let mut body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;

        body.orbit = None;
        body.orbit_children.clear();
        body.light_source = None;
        log::debug!("removed body {id:?}");
        Some(body)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: BodyId) -> Option<&CelestialBody> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut CelestialBody> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    fn require(&self, id: BodyId) -> Result<&CelestialBody, SkyError> {
        self.get(id).ok_or(SkyError::UnknownBody(id))
    }

    fn require_mut(&mut self, id: BodyId) -> Result<&mut CelestialBody, SkyError> {
        self.get_mut(id).ok_or(SkyError::UnknownBody(id))
    }

    /// Handles of every live body, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.body
                .as_ref()
                .map(|_| BodyId::new(index as u32, slot.generation))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &CelestialBody)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.body
                .as_ref()
                .map(|body| (BodyId::new(index as u32, slot.generation), body))
        })
    }

    // --- Light sources ---

    /// Use `light` as the light source for `id`'s shading, or clear it.
    pub fn set_light_source(&mut self, id: BodyId, light: Option<BodyId>) -> Result<(), SkyError> {
        if light == Some(id) {
            return Err(SkyError::SelfLight(id));
        }
        if let Some(light) = light {
            self.require(light)?;
        }
        self.require_mut(id)?.light_source = light;
        Ok(())
    }

    // --- Positioning relative to other bodies ---

    /// Place `id` at `reference`'s position plus `offset`.
    pub fn set_position_relative(
        &mut self,
        id: BodyId,
        reference: BodyId,
        offset: Vec2,
    ) -> Result<(), SkyError> {
        let origin = self.require(reference)?.position();
        let body = self.require_mut(id)?;
        body.set_position(origin.x + offset.x, origin.y + offset.y);
        Ok(())
    }

    /// Place `id` at polar coordinates around `reference`'s position.
    pub fn set_position_polar_from_body(
        &mut self,
        id: BodyId,
        reference: BodyId,
        radius: f32,
        theta: f32,
    ) -> Result<(), SkyError> {
        let origin = self.require(reference)?.position();
        self.require_mut(id)?.set_position_polar(origin, radius, theta);
        Ok(())
    }

    // --- Orbit tree ---

    /// Make `child` orbit `parent` on a circle.
    pub fn set_orbit_parent(
        &mut self,
        child: BodyId,
        parent: BodyId,
        radius: f32,
        phase: f32,
        angular_rate: f32,
    ) -> Result<(), SkyError> {
        self.attach(child, parent, Orbit::circular(radius, phase, angular_rate))
    }

    /// Make `child` orbit `parent` on an ellipse with axes `ellipse` tilted by `tilt`.
    pub fn set_orbit_parent_elliptic(
        &mut self,
        child: BodyId,
        parent: BodyId,
        ellipse: Vec2,
        tilt: f32,
        phase: f32,
        angular_rate: f32,
    ) -> Result<(), SkyError> {
        self.attach(
            child,
            parent,
            Orbit::elliptical(ellipse, tilt, phase, angular_rate),
        )
    }

    /// Parent-side form of [`Sky::set_orbit_parent`].
    pub fn add_orbit_child(
        &mut self,
        parent: BodyId,
        child: BodyId,
        radius: f32,
        phase: f32,
        angular_rate: f32,
    ) -> Result<(), SkyError> {
        self.set_orbit_parent(child, parent, radius, phase, angular_rate)
    }

    /// Parent-side form of [`Sky::set_orbit_parent_elliptic`].
    pub fn add_orbit_child_elliptic(
        &mut self,
        parent: BodyId,
        child: BodyId,
        ellipse: Vec2,
        tilt: f32,
        phase: f32,
        angular_rate: f32,
    ) -> Result<(), SkyError> {
        self.set_orbit_parent_elliptic(child, parent, ellipse, tilt, phase, angular_rate)
    }

    /// Attach `child` under `parent` with the given orbit.
    ///
    /// Re-attaching under the same parent only replaces the orbit; attaching
    /// under a different parent moves the child.
    pub fn attach(&mut self, child: BodyId, parent: BodyId, orbit: Orbit) -> Result<(), SkyError> {
        if child == parent {
            log::warn!("rejected self-orbit for {child:?}");
            return Err(SkyError::SelfOrbit(child));
        }
        self.require(parent)?;
        let previous = self.require(child)?.orbit_parent();

        if !orbit.is_valid() {
            log::warn!("rejected invalid orbit {orbit:?} for {child:?}");
            return Err(SkyError::InvalidOrbit {
                child,
                ellipse: orbit.ellipse,
            });
        }

        if self.is_ancestor(child, parent) {
            log::warn!("rejected orbit cycle: {child:?} is an ancestor of {parent:?}");
            return Err(SkyError::OrbitCycle { child, parent });
        }

        if let Some(previous) = previous
            && previous != parent
        {
            self.unlink_child(previous, child);
        }

        self.require_mut(child)?.orbit = Some(OrbitLink { parent, orbit });
        let siblings = &mut self.require_mut(parent)?.orbit_children;
        if !siblings.contains(&child) {
            siblings.push(child);
        }
        log::debug!("attached {child:?} to {parent:?}");
        Ok(())
    }

    /// Stop `child` orbiting its parent. Its position stays where it is.
    pub fn detach(&mut self, child: BodyId) -> Result<(), SkyError> {
        let parent = self.require(child)?.orbit_parent();
        if let Some(parent) = parent {
            self.unlink_child(parent, child);
        }
        self.require_mut(child)?.orbit = None;
        Ok(())
    }

    fn unlink_child(&mut self, parent: BodyId, child: BodyId) {
        if let Some(body) = self.get_mut(parent) {
            body.orbit_children.retain(|&c| c != child);
        }
    }

    /// Whether `ancestor` appears on the parent chain starting at `id` (inclusive).
    pub fn is_ancestor(&self, ancestor: BodyId, id: BodyId) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            // A chain longer than the arena can only be a corrupted cycle.
            steps += 1;
            if steps > self.len {
                return true;
            }
            current = self.get(node).and_then(|b| b.orbit_parent());
        }
        false
    }

    /// Detach the whole subtree below `id`.
    ///
    /// Every descendant loses its parent link and every children list in the
    /// subtree, including `id`'s, ends up empty.
    pub fn clear_orbit_children(&mut self, id: BodyId) -> Result<(), SkyError> {
        let children = std::mem::take(&mut self.require_mut(id)?.orbit_children);
        for child in children {
            if let Some(body) = self.get_mut(child) {
                body.orbit = None;
            }
            // Children were validated on attach; a stale one is just skipped.
            let _ = self.clear_orbit_children(child);
        }
        Ok(())
    }

    pub fn orbit_parent(&self, id: BodyId) -> Option<BodyId> {
        self.get(id)?.orbit_parent()
    }

    pub fn orbit_children(&self, id: BodyId) -> &[BodyId] {
        self.get(id).map_or(&[], |b| b.orbit_children())
    }

    /// Every body in parents-before-children order.
    ///
    /// Roots come first in slot order, then their descendants breadth-first.
    pub fn topological_order(&self) -> Vec<BodyId> {
        let mut order = Vec::with_capacity(self.len);
        let mut queue: VecDeque<BodyId> = self
            .iter()
            .filter(|(_, body)| {
                body.orbit_parent()
                    .is_none_or(|parent| !self.contains(parent))
            })
            .map(|(id, _)| id)
            .collect();

        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.orbit_children(id).iter().copied());
        }
        order
    }

    // --- Frame pipeline ---

    /// Update every body, parents strictly before their children.
    pub fn update(&mut self, env: &Environment) {
        if env.paused {
            return;
        }
        for id in self.topological_order() {
            self.update_body(id, env);
        }
    }

    /// Update a single body against its parent's current position.
    pub fn update_body(&mut self, id: BodyId, env: &Environment) {
        let parent_position = self
            .orbit_parent(id)
            .and_then(|parent| self.get(parent))
            .map(|parent| parent.position());
        if let Some(body) = self.get_mut(id) {
            body.update(env, parent_position);
        }
    }

    fn draw_context<'a>(&'a self, id: BodyId, env: &'a Environment) -> Option<DrawContext<'a>> {
        let body = self.get(id)?;
        let light_source = body
            .light_source()
            .and_then(|light| self.get(light))
            .map(|light| light.position());
        Some(DrawContext {
            env,
            light_source,
            shading_shader: &self.shading_shader,
        })
    }

    /// Draw one body's layers. Returns `false` if it is unknown or hidden.
    pub fn draw(&self, id: BodyId, batch: &mut dyn SpriteBatch, env: &Environment) -> bool {
        let (Some(body), Some(ctx)) = (self.get(id), self.draw_context(id, env)) else {
            return false;
        };
        body.draw_layers(batch, &ctx)
    }

    /// Draw the orbit children of `id` accepted by `should_draw`.
    ///
    /// With `recursive`, each drawn child's own children are visited too.
    pub fn draw_children(
        &self,
        id: BodyId,
        batch: &mut dyn SpriteBatch,
        env: &Environment,
        should_draw: &dyn Fn(BodyId, &CelestialBody) -> bool,
        recursive: bool,
    ) {
        for &child in self.orbit_children(id) {
            let Some(body) = self.get(child) else {
                continue;
            };
            if should_draw(child, body) {
                self.draw(child, batch, env);
                if recursive {
                    self.draw_children(child, batch, env, should_draw, recursive);
                }
            }
        }
    }

    /// Update every body, then draw them all in topological order.
    ///
    /// Returns the number of bodies that were visible.
    pub fn render(&mut self, batch: &mut dyn SpriteBatch, env: &Environment) -> usize {
        self.update(env);
        self.topological_order()
            .into_iter()
            .filter(|&id| self.draw(id, batch, env))
            .count()
    }
}
