//! Visual layers of a celestial body and the caller strategies that customize them.

use std::sync::Arc;

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::{BatchState, CelestialBody, ShaderBinding, SpriteBatch};

/// Shared reference to an image resolved by the host's asset pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(Arc<TextureInfo>);

#[derive(Debug, PartialEq, Eq, Hash)]
struct TextureInfo {
    path: String,
    width: u32,
    height: u32,
}

impl TextureHandle {
    pub fn new(path: impl Into<String>, width: u32, height: u32) -> Self {
        Self(Arc::new(TextureInfo {
            path: path.into(),
            width,
            height,
        }))
    }

    pub fn path(&self) -> &str {
        &self.0.path
    }

    pub fn width(&self) -> u32 {
        self.0.width
    }

    pub fn height(&self) -> u32 {
        self.0.height
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.0.width as f32, self.0.height as f32)
    }

    /// A texture with a zero dimension cannot be drawn.
    pub fn is_drawable(&self) -> bool {
        self.0.width > 0 && self.0.height > 0
    }
}

/// Pixel rectangle selecting a region of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl SourceRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// `(x, y, w, h)` as fractions of `texture_size`.
    pub fn normalized(&self, texture_size: Vec2) -> Vec4 {
        Vec4::new(
            self.x as f32 / texture_size.x,
            self.y as f32 / texture_size.y,
            self.width as f32 / texture_size.x,
            self.height as f32 / texture_size.y,
        )
    }
}

/// Integer axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// The three stacked layers of a body, drawn back to front.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Additive glow behind the body.
    Back,
    /// The body sprite itself.
    Body,
    /// Additive glow in front of the body.
    Front,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Back, LayerKind::Body, LayerKind::Front];
}

/// Terms a shading strategy supplies for one draw.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShadingTerms {
    pub intensity: f32,
    pub offset: Vec2,
    pub radius: f32,
}

/// Derives shading parameters from the angle between a body and its light source.
///
/// `angle` is the direction from the light source to the body in radians.
/// `shade_resolution` starts at the texture size and may be changed.
pub trait ShaderConfigurator {
    fn configure(
        &self,
        body: &CelestialBody,
        angle: f32,
        shade_resolution: &mut Vec2,
    ) -> ShadingTerms;
}

impl<F> ShaderConfigurator for F
where
    F: Fn(&CelestialBody, f32, &mut Vec2) -> ShadingTerms,
{
    fn configure(
        &self,
        body: &CelestialBody,
        angle: f32,
        shade_resolution: &mut Vec2,
    ) -> ShadingTerms {
        self(body, angle, shade_resolution)
    }
}

/// Replaces the shader a layer is drawn with.
pub trait ShaderOverride {
    fn shader(&self) -> ShaderBinding;
}

impl<F> ShaderOverride for F
where
    F: Fn() -> ShaderBinding,
{
    fn shader(&self) -> ShaderBinding {
        self()
    }
}

/// Everything a draw override receives for one layer.
pub struct LayerDraw<'a> {
    pub body: &'a CelestialBody,
    pub kind: LayerKind,
    /// Batch configuration saved before the body started drawing.
    pub state: &'a BatchState,
    pub texture: Option<&'a TextureHandle>,
    pub shader: Option<&'a ShaderBinding>,
}

/// Takes over drawing of a layer. Implementations open and close the batch themselves.
pub trait DrawOverride {
    fn draw(&self, batch: &mut dyn SpriteBatch, layer: LayerDraw<'_>);
}

impl<F> DrawOverride for F
where
    F: Fn(&mut dyn SpriteBatch, LayerDraw<'_>),
{
    fn draw(&self, batch: &mut dyn SpriteBatch, layer: LayerDraw<'_>) {
        self(batch, layer)
    }
}

/// Built-in terminator shading: a fixed-strength shadow pushed away from the light.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminatorShading {
    /// Darkening strength in `[0, 1]`.
    pub intensity: f32,
    /// Radius of the lit sphere relative to half the shade resolution.
    pub radius: f32,
    /// Distance of the sphere center from the sprite center, relative to
    /// half the shade resolution.
    pub offset: f32,
}

impl Default for TerminatorShading {
    fn default() -> Self {
        Self {
            intensity: 0.9,
            radius: 1.0,
            offset: 0.6,
        }
    }
}

impl ShaderConfigurator for TerminatorShading {
    fn configure(
        &self,
        _body: &CelestialBody,
        angle: f32,
        shade_resolution: &mut Vec2,
    ) -> ShadingTerms {
        let half = shade_resolution.min_element() / 2.0;
        // Light comes from `angle + π`, so the lit sphere sits toward it.
        let toward_light = -crate::orbit::polar(1.0, angle);
        ShadingTerms {
            intensity: self.intensity,
            offset: toward_light * self.offset * half,
            radius: self.radius * half,
        }
    }
}

/// One layer: texture, optional source rectangle and optional strategies.
#[derive(Default)]
pub struct Layer {
    pub texture: Option<TextureHandle>,
    pub source: Option<SourceRect>,
    pub shader_config: Option<Box<dyn ShaderConfigurator>>,
    pub shader_override: Option<Box<dyn ShaderOverride>>,
    pub draw_override: Option<Box<dyn DrawOverride>>,
}

impl Layer {
    pub fn with_texture(texture: Option<TextureHandle>, source: Option<SourceRect>) -> Self {
        Self {
            texture,
            source,
            ..Default::default()
        }
    }

    /// Pivot of the drawn region: the center of the source rectangle or texture.
    pub fn origin(&self) -> Option<Vec2> {
        match (&self.source, &self.texture) {
            (Some(rect), _) => Some(rect.size() / 2.0),
            (None, Some(texture)) => Some(texture.size() / 2.0),
            (None, None) => None,
        }
    }

    /// Normalized source rectangle, whole texture when unset.
    pub fn normalized_source(&self) -> Vec4 {
        match (&self.source, &self.texture) {
            (Some(rect), Some(texture)) if texture.is_drawable() => {
                rect.normalized(texture.size())
            }
            _ => Vec4::new(0.0, 0.0, 1.0, 1.0),
        }
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("texture", &self.texture)
            .field("source", &self.source)
            .field("shader_config", &self.shader_config.is_some())
            .field("shader_override", &self.shader_override.is_some())
            .field("draw_override", &self.draw_override.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_rect_normalized() {
        let rect = SourceRect::new(32, 0, 32, 64);
        let n = rect.normalized(Vec2::new(128.0, 64.0));
        assert_eq!(n, Vec4::new(0.25, 0.0, 0.25, 1.0));
    }

    #[test]
    fn test_layer_origin_prefers_source_rect() {
        let tex = TextureHandle::new("moon", 128, 64);
        let whole = Layer::with_texture(Some(tex.clone()), None);
        assert_eq!(whole.origin(), Some(Vec2::new(64.0, 32.0)));

        let framed = Layer::with_texture(Some(tex), Some(SourceRect::new(64, 0, 64, 64)));
        assert_eq!(framed.origin(), Some(Vec2::new(32.0, 32.0)));

        assert_eq!(Layer::default().origin(), None);
    }

    #[test]
    fn test_normalized_source_defaults_to_whole_texture() {
        let layer = Layer::with_texture(Some(TextureHandle::new("sun", 10, 10)), None);
        assert_eq!(layer.normalized_source(), Vec4::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_zero_sized_texture_not_drawable() {
        assert!(!TextureHandle::new("broken", 0, 16).is_drawable());
        assert!(TextureHandle::new("ok", 1, 1).is_drawable());
    }

    #[test]
    fn test_terminator_points_toward_light() {
        let body = CelestialBody::new();
        let mut res = Vec2::new(100.0, 100.0);
        // Body sits to the right of the light: angle 0.
        let terms = TerminatorShading::default().configure(&body, 0.0, &mut res);
        assert!(terms.offset.x < 0.0, "lit side faces the light on the left");
        assert!(terms.offset.y.abs() < 1e-4);
        assert!((terms.radius - 50.0).abs() < 1e-4);
        assert_eq!(res, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_closure_configurator() {
        let body = CelestialBody::new();
        let config = |_: &CelestialBody, angle: f32, res: &mut Vec2| {
            *res = Vec2::splat(8.0);
            ShadingTerms {
                intensity: angle,
                ..Default::default()
            }
        };
        let mut res = Vec2::ZERO;
        let terms = config.configure(&body, 0.5, &mut res);
        assert_eq!(terms.intensity, 0.5);
        assert_eq!(res, Vec2::splat(8.0));
    }
}
