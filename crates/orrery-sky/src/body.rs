//! A single drawable celestial body.
//!
//! A body owns its transform, three visual layers and the configuration of
//! one of three motion strategies (parallax, day/night arc, orbit). Links to
//! other bodies (orbit parent, children, light source) are plain [`BodyId`]
//! handles into the owning [`Sky`](crate::Sky) and never keep a body alive.

use glam::Vec2;

use crate::motion::{self, Parallax, SkyRotationMode};
use crate::orbit::{self, Orbit};
use crate::{
    BatchState, BlendMode, BodyId, Color, DrawOverride, Environment, Layer, LayerDraw, LayerKind,
    Rect, SamplerMode, ShaderBinding, ShaderConfigurator, ShaderHandle, ShaderOverride,
    ShadingParams, SortMode, SourceRect, SpriteBatch, SpriteDraw, TextureHandle,
};

/// Orbit of a body around a parent body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitLink {
    pub parent: BodyId,
    pub orbit: Orbit,
}

/// Per-draw inputs that come from outside the body.
#[derive(Clone, Copy, Debug)]
pub struct DrawContext<'a> {
    pub env: &'a Environment,
    /// Current position of the body's light source, if it has a live one.
    pub light_source: Option<Vec2>,
    /// Shader bound when a layer is shaded relative to the light source.
    pub shading_shader: &'a ShaderHandle,
}

/// A celestial body: transform, layers and motion configuration.
#[derive(Debug)]
pub struct CelestialBody {
    position: Vec2,
    base_size: Vec2,
    scale: f32,
    rotation: f32,
    color: Color,
    should_update: bool,

    back: Layer,
    body: Layer,
    front: Layer,

    parallax: Parallax,
    rotation_mode: SkyRotationMode,

    pub(crate) light_source: Option<BodyId>,
    pub(crate) orbit: Option<OrbitLink>,
    pub(crate) orbit_children: Vec<BodyId>,
}

impl Default for CelestialBody {
    fn default() -> Self {
        Self::new()
    }
}

impl CelestialBody {
    /// A body with no textures, unit size, scale 1 and no rotation.
    pub fn new() -> Self {
        CelestialBodyBuilder::default().build()
    }

    pub fn builder() -> CelestialBodyBuilder {
        CelestialBodyBuilder::default()
    }

    // --- Transform ---

    /// Screen-space center.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Size at scale 1.
    pub fn base_size(&self) -> Vec2 {
        self.base_size
    }

    /// Current size, always `base_size * scale`.
    pub fn size(&self) -> Vec2 {
        self.base_size * self.scale
    }

    pub fn width(&self) -> f32 {
        self.size().x
    }

    pub fn height(&self) -> f32 {
        self.size().y
    }

    /// Bounding rectangle centered on the position.
    pub fn hitbox(&self) -> Rect {
        let size = self.size();
        Rect {
            x: (self.position.x - size.x / 2.0) as i32,
            y: (self.position.y - size.y / 2.0) as i32,
            width: size.x as i32,
            height: size.y as i32,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn should_update(&self) -> bool {
        self.should_update
    }

    /// Freeze or unfreeze the body's per-frame motion.
    pub fn set_should_update(&mut self, should_update: bool) {
        self.should_update = should_update;
    }

    // --- Positioning ---

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
    }

    /// Place the body at `reference`'s position plus `offset`.
    pub fn set_position_relative(&mut self, reference: &CelestialBody, offset: Vec2) {
        self.position = reference.position + offset;
    }

    /// Place the body at polar coordinates around `origin`.
    pub fn set_position_polar(&mut self, origin: Vec2, radius: f32, theta: f32) {
        self.position = origin + orbit::polar(radius, theta);
    }

    /// Place the body at polar coordinates around the viewport center.
    pub fn set_position_polar_from_screen_center(
        &mut self,
        env: &Environment,
        radius: f32,
        theta: f32,
    ) {
        self.set_position_polar(env.screen_center(), radius, theta);
    }

    /// Place the body at polar coordinates around `reference`'s position.
    pub fn set_position_polar_around(&mut self, reference: &CelestialBody, radius: f32, theta: f32) {
        self.set_position_polar(reference.position, radius, theta);
    }

    // --- Layers ---

    pub fn layer(&self, kind: LayerKind) -> &Layer {
        match kind {
            LayerKind::Back => &self.back,
            LayerKind::Body => &self.body,
            LayerKind::Front => &self.front,
        }
    }

    pub fn layer_mut(&mut self, kind: LayerKind) -> &mut Layer {
        match kind {
            LayerKind::Back => &mut self.back,
            LayerKind::Body => &mut self.body,
            LayerKind::Front => &mut self.front,
        }
    }

    /// Replace all three textures. Absent layers are skipped when drawing.
    pub fn set_textures(
        &mut self,
        body: Option<TextureHandle>,
        back: Option<TextureHandle>,
        front: Option<TextureHandle>,
    ) {
        self.body.texture = body;
        self.back.texture = back;
        self.front.texture = front;
    }

    pub fn set_texture(&mut self, kind: LayerKind, texture: Option<TextureHandle>) {
        self.layer_mut(kind).texture = texture;
    }

    pub fn set_source_rectangles(
        &mut self,
        back: Option<SourceRect>,
        body: Option<SourceRect>,
        front: Option<SourceRect>,
    ) {
        self.back.source = back;
        self.body.source = body;
        self.front.source = front;
    }

    /// Use the same source rectangle for every layer.
    pub fn set_common_source_rectangle(&mut self, rect: Option<SourceRect>) {
        self.set_source_rectangles(rect, rect, rect);
    }

    pub fn set_shader_config(
        &mut self,
        kind: LayerKind,
        config: Option<Box<dyn ShaderConfigurator>>,
    ) {
        self.layer_mut(kind).shader_config = config;
    }

    pub fn set_shader_override(&mut self, kind: LayerKind, shader: Option<Box<dyn ShaderOverride>>) {
        self.layer_mut(kind).shader_override = shader;
    }

    pub fn set_draw_override(&mut self, kind: LayerKind, draw: Option<Box<dyn DrawOverride>>) {
        self.layer_mut(kind).draw_override = draw;
    }

    // --- Motion configuration ---

    /// Configure parallax. All-zero arguments turn parallax off.
    pub fn set_parallax(&mut self, speed_x: f32, speed_y: f32, average_offset: Vec2) {
        self.parallax = Parallax {
            speed_x,
            speed_y,
            average_offset,
        };
    }

    pub fn parallax(&self) -> &Parallax {
        &self.parallax
    }

    pub fn set_rotation_mode(&mut self, mode: SkyRotationMode) {
        self.rotation_mode = mode;
    }

    pub fn rotation_mode(&self) -> SkyRotationMode {
        self.rotation_mode
    }

    pub fn light_source(&self) -> Option<BodyId> {
        self.light_source
    }

    pub fn orbit_parent(&self) -> Option<BodyId> {
        self.orbit.map(|link| link.parent)
    }

    pub fn orbit(&self) -> Option<&Orbit> {
        self.orbit.as_ref().map(|link| &link.orbit)
    }

    /// Current orbit phase, `0.0` when not orbiting.
    pub fn orbit_phase(&self) -> f32 {
        self.orbit().map_or(0.0, |o| o.phase)
    }

    /// Configured angular rate, `0.0` when not orbiting.
    pub fn orbit_speed(&self) -> f32 {
        self.orbit().map_or(0.0, |o| o.angular_rate)
    }

    pub fn orbit_tilt(&self) -> f32 {
        self.orbit().map_or(0.0, |o| o.tilt)
    }

    pub fn orbit_ellipse(&self) -> Vec2 {
        self.orbit().map_or(Vec2::ZERO, |o| o.ellipse)
    }

    pub fn orbit_children(&self) -> &[BodyId] {
        &self.orbit_children
    }

    // --- Frame pipeline ---

    /// Recompute the position for this frame.
    ///
    /// `parent_position` is the orbit parent's position for this frame; a
    /// body whose parent is gone keeps its last position.
    pub fn update(&mut self, env: &Environment, parent_position: Option<Vec2>) {
        if env.paused || !self.should_update {
            return;
        }

        if self.parallax.is_active() {
            self.position = self.parallax.position(env);
        } else if self.rotation_mode != SkyRotationMode::None {
            let width = self
                .body
                .texture
                .as_ref()
                .map_or(self.base_size.x, |t| t.width() as f32);
            let pose = motion::sky_arc(env, width);
            self.position = pose.position;
            self.rotation = pose.rotation;
            self.set_scale(pose.scale);
            self.color = pose.color;
        } else if let Some(link) = self.orbit.as_mut()
            && let Some(parent) = parent_position
        {
            let offset = link.orbit.step();
            self.position = parent + offset;
        }
    }

    /// Whether the body is visible for the host's current half of the day.
    pub fn should_draw(&self, is_day: bool) -> bool {
        self.rotation_mode.is_visible(is_day)
    }

    /// Draw the back, body and front layers.
    ///
    /// The caller's batch is ended for the duration and restored with its
    /// saved state afterward. Returns `false` if the body was not visible.
    pub fn draw_layers(&self, batch: &mut dyn SpriteBatch, ctx: &DrawContext<'_>) -> bool {
        if !self.should_draw(ctx.env.is_day) {
            return false;
        }

        let saved = batch.state();
        let was_begun = batch.is_begun();
        if was_begun {
            batch.end();
        }

        for kind in LayerKind::ALL {
            self.draw_layer(kind, batch, &saved, ctx);
        }

        if was_begun {
            batch.begin(&saved);
        }
        true
    }

    fn draw_layer(
        &self,
        kind: LayerKind,
        batch: &mut dyn SpriteBatch,
        saved: &BatchState,
        ctx: &DrawContext<'_>,
    ) {
        let layer = self.layer(kind);
        let shader = self.resolve_shader(kind, ctx);

        if let Some(draw) = &layer.draw_override {
            draw.draw(
                batch,
                LayerDraw {
                    body: self,
                    kind,
                    state: saved,
                    texture: layer.texture.as_ref(),
                    shader: shader.as_ref(),
                },
            );
            return;
        }

        let Some(texture) = &layer.texture else {
            return;
        };
        if !texture.is_drawable() {
            log::debug!("skipping {kind:?} layer: texture `{}` has no size", texture.path());
            return;
        }

        let (sort, blend) = match kind {
            LayerKind::Body => (SortMode::Immediate, BlendMode::AlphaBlend),
            LayerKind::Back | LayerKind::Front => (SortMode::Deferred, BlendMode::Additive),
        };
        let state = BatchState {
            sort,
            blend,
            sampler: SamplerMode::LinearClamp,
            rasterizer: saved.rasterizer,
            shader,
            transform: saved.transform,
        };

        batch.begin(&state);
        batch.draw(&SpriteDraw {
            texture: texture.clone(),
            position: self.position,
            source: layer.source,
            color: self.color,
            rotation: self.rotation,
            origin: layer.origin().unwrap_or(Vec2::ZERO),
            scale: self.scale,
        });
        batch.end();
    }

    /// Shader for a layer: its override, else light-relative shading, else none.
    fn resolve_shader(&self, kind: LayerKind, ctx: &DrawContext<'_>) -> Option<ShaderBinding> {
        let layer = self.layer(kind);
        if let Some(shader) = &layer.shader_override {
            return Some(shader.shader());
        }

        let (Some(light), Some(config), Some(texture)) =
            (ctx.light_source, &layer.shader_config, &layer.texture)
        else {
            return None;
        };

        let to_body = self.position - light;
        let angle = to_body.y.atan2(to_body.x);
        let mut shade_resolution = texture.size();
        let terms = config.configure(self, angle, &mut shade_resolution);

        Some(ShaderBinding {
            shader: ctx.shading_shader.clone(),
            params: Some(ShadingParams::new(
                terms.intensity,
                terms.offset,
                terms.radius,
                shade_resolution,
                layer.normalized_source(),
            )),
        })
    }
}

/// Construction parameters for a [`CelestialBody`].
#[derive(Debug)]
pub struct CelestialBodyBuilder {
    body: Option<TextureHandle>,
    back: Option<TextureHandle>,
    front: Option<TextureHandle>,
    body_source: Option<SourceRect>,
    back_source: Option<SourceRect>,
    front_source: Option<SourceRect>,
    size: Option<Vec2>,
    scale: f32,
    rotation: f32,
}

impl Default for CelestialBodyBuilder {
    fn default() -> Self {
        Self {
            body: None,
            back: None,
            front: None,
            body_source: None,
            back_source: None,
            front_source: None,
            size: None,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

impl CelestialBodyBuilder {
    pub fn body_texture(mut self, texture: TextureHandle) -> Self {
        self.body = Some(texture);
        self
    }

    pub fn back_texture(mut self, texture: TextureHandle) -> Self {
        self.back = Some(texture);
        self
    }

    pub fn front_texture(mut self, texture: TextureHandle) -> Self {
        self.front = Some(texture);
        self
    }

    pub fn body_source(mut self, rect: SourceRect) -> Self {
        self.body_source = Some(rect);
        self
    }

    pub fn back_source(mut self, rect: SourceRect) -> Self {
        self.back_source = Some(rect);
        self
    }

    pub fn front_source(mut self, rect: SourceRect) -> Self {
        self.front_source = Some(rect);
        self
    }

    /// Explicit size at scale 1. Otherwise inferred from the body layer.
    pub fn size(mut self, size: Vec2) -> Self {
        self.size = Some(size);
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn build(self) -> CelestialBody {
        let base_size = match (self.size, &self.body, &self.body_source) {
            (Some(size), _, _) => size,
            (None, Some(_), Some(rect)) => rect.size(),
            (None, Some(texture), None) => texture.size(),
            (None, None, _) => Vec2::ONE,
        };

        CelestialBody {
            position: Vec2::ZERO,
            base_size,
            scale: self.scale,
            rotation: self.rotation,
            color: Color::WHITE,
            should_update: true,
            back: Layer::with_texture(self.back, self.back_source),
            body: Layer::with_texture(self.body, self.body_source),
            front: Layer::with_texture(self.front, self.front_source),
            parallax: Parallax::default(),
            rotation_mode: SkyRotationMode::None,
            light_source: None,
            orbit: None,
            orbit_children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::f32::consts::TAU;
    use std::rc::Rc;

    use super::*;
    use crate::{BatchCommand, RecordingBatch, ShadingTerms};

    fn ctx<'a>(env: &'a Environment, shader: &'a ShaderHandle) -> DrawContext<'a> {
        DrawContext {
            env,
            light_source: None,
            shading_shader: shader,
        }
    }

    fn three_layer_body() -> CelestialBody {
        CelestialBody::builder()
            .body_texture(TextureHandle::new("body", 64, 64))
            .back_texture(TextureHandle::new("back", 128, 128))
            .front_texture(TextureHandle::new("front", 96, 96))
            .build()
    }

    #[test]
    fn test_size_inferred_from_body_texture() {
        let body = CelestialBody::builder()
            .body_texture(TextureHandle::new("moon", 80, 40))
            .build();
        assert_eq!(body.base_size(), Vec2::new(80.0, 40.0));
    }

    #[test]
    fn test_size_inferred_from_source_rect() {
        let body = CelestialBody::builder()
            .body_texture(TextureHandle::new("sheet", 256, 64))
            .body_source(SourceRect::new(64, 0, 64, 64))
            .build();
        assert_eq!(body.base_size(), Vec2::new(64.0, 64.0));
    }

    #[test]
    fn test_size_defaults_to_unit_without_texture() {
        assert_eq!(CelestialBody::new().base_size(), Vec2::ONE);
        let sized = CelestialBody::builder().size(Vec2::new(5.0, 6.0)).build();
        assert_eq!(sized.base_size(), Vec2::new(5.0, 6.0));
    }

    #[test]
    fn test_size_tracks_scale() {
        let mut body = CelestialBody::builder().size(Vec2::new(30.0, 20.0)).build();
        for s in [0.1_f32, 0.5, 1.0, 2.25, 7.0] {
            body.set_scale(s);
            assert_eq!(body.size(), Vec2::new(30.0, 20.0) * s);
        }
    }

    #[test]
    fn test_hitbox_centered_on_position() {
        let mut body = CelestialBody::builder().size(Vec2::new(20.0, 10.0)).build();
        body.set_position(100.0, 50.0);
        assert_eq!(
            body.hitbox(),
            Rect {
                x: 90,
                y: 45,
                width: 20,
                height: 10
            }
        );
        assert_eq!(body.width(), 20.0);
        assert_eq!(body.height(), 10.0);
    }

    #[test]
    fn test_polar_position_round_trip() {
        let mut body = CelestialBody::new();
        let origin = Vec2::new(300.0, -20.0);
        for i in 0..24 {
            let theta = i as f32 / 24.0 * TAU;
            let radius = i as f32 * 10.0;
            body.set_position_polar(origin, radius, theta);
            let d = body.position() - origin;
            assert!((d.length() - radius).abs() < 1e-3);
            if radius > 0.0 {
                let back = d.y.atan2(d.x).rem_euclid(TAU);
                let diff = (back - theta).abs();
                assert!(diff < 1e-3 || (TAU - diff) < 1e-3);
            }
        }
    }

    #[test]
    fn test_relative_and_screen_positioning() {
        let mut anchor = CelestialBody::new();
        anchor.set_position(10.0, 20.0);
        let mut body = CelestialBody::new();
        body.set_position_relative(&anchor, Vec2::new(5.0, -5.0));
        assert_eq!(body.position(), Vec2::new(15.0, 15.0));

        body.set_position_polar_around(&anchor, 10.0, 0.0);
        assert!((body.position() - Vec2::new(20.0, 20.0)).length() < 1e-4);

        let env = Environment::default();
        body.set_position_polar_from_screen_center(&env, 0.0, 1.0);
        assert_eq!(body.position(), env.screen_center());
    }

    #[test]
    fn test_manual_position_persists_without_strategy() {
        let mut body = CelestialBody::new();
        body.set_position(42.0, 24.0);
        body.update(&Environment::default(), None);
        assert_eq!(body.position(), Vec2::new(42.0, 24.0));
    }

    #[test]
    fn test_update_skipped_when_paused_or_frozen() {
        let mut body = CelestialBody::new();
        body.set_parallax(0.5, 0.5, Vec2::new(10.0, 10.0));
        body.set_position(1.0, 1.0);

        let paused = Environment {
            paused: true,
            ..Default::default()
        };
        body.update(&paused, None);
        assert_eq!(body.position(), Vec2::new(1.0, 1.0));

        body.set_should_update(false);
        body.update(&Environment::default(), None);
        assert_eq!(body.position(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_parallax_takes_priority_over_rotation() {
        let mut body = CelestialBody::new();
        body.set_rotation_mode(SkyRotationMode::Any);
        body.set_parallax(0.0, 0.0, Vec2::new(25.0, 0.0));
        let env = Environment::default();
        body.update(&env, None);
        assert_eq!(body.position(), env.screen_center() + Vec2::new(25.0, 0.0));
        assert_eq!(body.rotation(), 0.0, "arc did not run");
    }

    #[test]
    fn test_rotation_takes_priority_over_orbit() {
        let mut body = three_layer_body();
        body.orbit = Some(OrbitLink {
            parent: BodyId::new(0, 0),
            orbit: Orbit::circular(100.0, 0.0, 0.1),
        });
        body.set_rotation_mode(SkyRotationMode::Day);
        body.update(&Environment::default(), Some(Vec2::ZERO));
        assert_eq!(body.orbit_phase(), 0.0, "orbit did not advance");
        assert_eq!(body.position().x, -64.0);
    }

    #[test]
    fn test_arc_updates_scale_and_color() {
        let mut body = three_layer_body();
        body.set_rotation_mode(SkyRotationMode::Any);
        let env = Environment {
            time: 27_000.0,
            cloud_alpha: 1.0,
            ..Default::default()
        };
        body.update(&env, None);
        assert!((body.scale() - 1.2).abs() < 1e-6);
        assert_eq!(body.size(), Vec2::splat(64.0) * body.scale());
        assert_eq!(body.color(), Color::TRANSPARENT);
    }

    #[test]
    fn test_draws_three_layers_with_blend_modes() {
        let body = three_layer_body();
        let env = Environment::default();
        let shader = ShaderHandle::shading();
        let mut batch = RecordingBatch::new();
        assert!(body.draw_layers(&mut batch, &ctx(&env, &shader)));

        let begins: Vec<_> = batch
            .commands()
            .iter()
            .filter_map(|c| match c {
                BatchCommand::Begin(s) => Some((s.sort, s.blend)),
                _ => None,
            })
            .collect();
        assert_eq!(
            begins,
            vec![
                (SortMode::Deferred, BlendMode::Additive),
                (SortMode::Immediate, BlendMode::AlphaBlend),
                (SortMode::Deferred, BlendMode::Additive),
            ]
        );
        let paths: Vec<_> = batch.draws().map(|d| d.texture.path().to_string()).collect();
        assert_eq!(paths, ["back", "body", "front"]);
        assert!(!batch.is_begun());
    }

    #[test]
    fn test_missing_body_texture_skips_only_body_layer() {
        let mut body = three_layer_body();
        body.set_texture(LayerKind::Body, None);
        let env = Environment::default();
        let shader = ShaderHandle::shading();
        let mut batch = RecordingBatch::new();
        body.draw_layers(&mut batch, &ctx(&env, &shader));

        let paths: Vec<_> = batch.draws().map(|d| d.texture.path().to_string()).collect();
        assert_eq!(paths, ["back", "front"]);
    }

    #[test]
    fn test_zero_sized_texture_is_skipped() {
        let mut body = CelestialBody::new();
        body.set_texture(LayerKind::Body, Some(TextureHandle::new("unloaded", 0, 0)));
        let env = Environment::default();
        let shader = ShaderHandle::shading();
        let mut batch = RecordingBatch::new();
        body.draw_layers(&mut batch, &ctx(&env, &shader));
        assert!(batch.commands().is_empty());
    }

    #[test]
    fn test_caller_batch_is_restored() {
        let body = three_layer_body();
        let env = Environment::default();
        let shader = ShaderHandle::shading();
        let caller_state = BatchState {
            rasterizer: crate::RasterizerMode::ScissorTest,
            transform: glam::Mat4::from_scale(glam::Vec3::splat(2.0)),
            ..Default::default()
        };
        let mut batch = RecordingBatch::begun(caller_state.clone());
        body.draw_layers(&mut batch, &ctx(&env, &shader));

        assert!(batch.is_begun());
        assert_eq!(batch.state(), caller_state);
        let commands = batch.commands();
        assert_eq!(commands.first(), Some(&BatchCommand::End));
        assert_eq!(commands.last(), Some(&BatchCommand::Begin(caller_state.clone())));
        for command in commands {
            if let BatchCommand::Begin(s) = command {
                assert_eq!(s.rasterizer, caller_state.rasterizer);
                assert_eq!(s.transform, caller_state.transform);
            }
        }
    }

    #[test]
    fn test_day_only_body_hidden_at_night() {
        let mut body = three_layer_body();
        body.set_rotation_mode(SkyRotationMode::Day);
        let night = Environment {
            is_day: false,
            ..Default::default()
        };
        let shader = ShaderHandle::shading();
        let mut batch = RecordingBatch::new();
        assert!(!body.draw_layers(&mut batch, &ctx(&night, &shader)));
        assert!(batch.commands().is_empty());
    }

    #[test]
    fn test_sprite_uses_transform_and_pivot() {
        let mut body = CelestialBody::builder()
            .body_texture(TextureHandle::new("sheet", 128, 64))
            .body_source(SourceRect::new(64, 0, 64, 64))
            .scale(2.0)
            .rotation(0.5)
            .build();
        body.set_position(10.0, 20.0);
        let env = Environment::default();
        let shader = ShaderHandle::shading();
        let mut batch = RecordingBatch::new();
        body.draw_layers(&mut batch, &ctx(&env, &shader));

        let sprite = batch.draws().next().cloned().unwrap();
        assert_eq!(sprite.position, Vec2::new(10.0, 20.0));
        assert_eq!(sprite.origin, Vec2::new(32.0, 32.0));
        assert_eq!(sprite.scale, 2.0);
        assert_eq!(sprite.rotation, 0.5);
        assert_eq!(sprite.source, Some(SourceRect::new(64, 0, 64, 64)));
    }

    #[test]
    fn test_shading_params_bound_with_light_source() {
        let mut body = CelestialBody::builder()
            .body_texture(TextureHandle::new("planet", 100, 50))
            .build();
        body.set_position(10.0, 0.0);
        let seen_angle = Rc::new(Cell::new(f32::NAN));
        let seen = seen_angle.clone();
        body.set_shader_config(
            LayerKind::Body,
            Some(Box::new(move |_: &CelestialBody, angle: f32, res: &mut Vec2| {
                seen.set(angle);
                *res = Vec2::new(32.0, 32.0);
                ShadingTerms {
                    intensity: 0.75,
                    offset: Vec2::new(1.0, 0.0),
                    radius: 12.0,
                }
            })),
        );

        let env = Environment::default();
        let shader = ShaderHandle::shading();
        let mut batch = RecordingBatch::new();
        let context = DrawContext {
            env: &env,
            light_source: Some(Vec2::new(0.0, 0.0)),
            shading_shader: &shader,
        };
        body.draw_layers(&mut batch, &context);

        assert!(seen_angle.get().abs() < 1e-6, "body is to the right of the light");
        let binding = batch
            .commands()
            .iter()
            .find_map(|c| match c {
                BatchCommand::Begin(s) => s.shader.clone(),
                _ => None,
            })
            .unwrap();
        assert_eq!(binding.shader, shader);
        let params = binding.params.unwrap();
        assert_eq!(params.intensity, 0.75);
        assert_eq!(params.radius, 12.0);
        assert_eq!(params.offset, [1.0, 0.0]);
        assert_eq!(params.shade_resolution, [32.0, 32.0]);
        assert_eq!(params.source_rect, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_no_light_source_draws_flat() {
        let mut body = three_layer_body();
        body.set_shader_config(LayerKind::Body, Some(Box::new(crate::TerminatorShading::default())));
        let env = Environment::default();
        let shader = ShaderHandle::shading();
        let mut batch = RecordingBatch::new();
        body.draw_layers(&mut batch, &ctx(&env, &shader));
        for command in batch.commands() {
            if let BatchCommand::Begin(s) = command {
                assert!(s.shader.is_none());
            }
        }
    }

    #[test]
    fn test_shader_override_wins() {
        let mut body = three_layer_body();
        body.set_shader_config(LayerKind::Front, Some(Box::new(crate::TerminatorShading::default())));
        body.set_shader_override(
            LayerKind::Front,
            Some(Box::new(|| ShaderBinding::plain(ShaderHandle::new("Glow")))),
        );
        let env = Environment::default();
        let shader = ShaderHandle::shading();
        let mut batch = RecordingBatch::new();
        let context = DrawContext {
            env: &env,
            light_source: Some(Vec2::new(-100.0, 0.0)),
            shading_shader: &shader,
        };
        body.draw_layers(&mut batch, &context);

        let last_shader = batch
            .commands()
            .iter()
            .filter_map(|c| match c {
                BatchCommand::Begin(s) => Some(s.shader.clone()),
                _ => None,
            })
            .last()
            .flatten()
            .unwrap();
        assert_eq!(last_shader.shader.name(), "Glow");
        assert!(last_shader.params.is_none());
    }

    #[test]
    fn test_draw_override_bypasses_builtin_draw() {
        let mut body = three_layer_body();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        body.set_draw_override(
            LayerKind::Body,
            Some(Box::new(move |_: &mut dyn SpriteBatch, layer: LayerDraw<'_>| {
                assert_eq!(layer.kind, LayerKind::Body);
                assert_eq!(layer.texture.map(|t| t.path()), Some("body"));
                counter.set(counter.get() + 1);
            })),
        );
        let env = Environment::default();
        let shader = ShaderHandle::shading();
        let mut batch = RecordingBatch::new();
        body.draw_layers(&mut batch, &ctx(&env, &shader));

        assert_eq!(calls.get(), 1);
        let paths: Vec<_> = batch.draws().map(|d| d.texture.path().to_string()).collect();
        assert_eq!(paths, ["back", "front"]);
    }
}
