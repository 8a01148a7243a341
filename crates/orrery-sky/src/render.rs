//! Host render-batch abstraction.
//!
//! The engine draws through a [`SpriteBatch`] owned by the host. Each layer of
//! a body opens its own begin/end pair so it can bind a different blend mode
//! and shader. [`RecordingBatch`] captures the command stream for headless
//! hosts and tests.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec4};

use crate::{Color, SourceRect, TextureHandle};

/// Name under which hosts register the shared shading shader.
pub const SHADING_SHADER_NAME: &str = "CelestialBodyShading";

/// Order in which sprites inside a begin/end pair reach the GPU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortMode {
    /// Queued and flushed at `end`.
    #[default]
    Deferred,
    /// Flushed as each sprite is drawn, keeping order with other immediate draws.
    Immediate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    AlphaBlend,
    Additive,
    Opaque,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SamplerMode {
    #[default]
    LinearClamp,
    LinearWrap,
    PointClamp,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RasterizerMode {
    #[default]
    CullNone,
    CullCounterClockwise,
    ScissorTest,
}

/// Shared, named shader program resolved by the host's asset pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShaderHandle(Arc<str>);

impl ShaderHandle {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// The shared shading shader used for light-relative terminators.
    pub fn shading() -> Self {
        Self::new(SHADING_SHADER_NAME)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Uniform block of the shading shader.
///
/// Field order and padding follow the WGSL `ShadingUniforms` struct in
/// [`SHADING_SHADER_SOURCE`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShadingParams {
    /// Normalized source rectangle `(x, y, w, h)` within the texture.
    pub source_rect: [f32; 4],
    /// Terminator offset from the sprite center, in shade-resolution pixels.
    pub offset: [f32; 2],
    /// Resolution the shade is computed at.
    pub shade_resolution: [f32; 2],
    /// Darkening strength in `[0, 1]`.
    pub intensity: f32,
    /// Radius of the fictitious lit sphere.
    pub radius: f32,
    /// Padding for 16-byte alignment.
    pub _padding: [f32; 2],
}

impl ShadingParams {
    pub fn new(
        intensity: f32,
        offset: Vec2,
        radius: f32,
        shade_resolution: Vec2,
        source_rect: Vec4,
    ) -> Self {
        Self {
            source_rect: source_rect.to_array(),
            offset: offset.to_array(),
            shade_resolution: shade_resolution.to_array(),
            intensity,
            radius,
            _padding: [0.0; 2],
        }
    }
}

/// A shader plus the parameters bound for the next draw, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderBinding {
    pub shader: ShaderHandle,
    pub params: Option<ShadingParams>,
}

impl ShaderBinding {
    /// A shader with no engine-supplied parameters.
    pub fn plain(shader: ShaderHandle) -> Self {
        Self {
            shader,
            params: None,
        }
    }
}

/// Complete configuration of a begin/end pair.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchState {
    pub sort: SortMode,
    pub blend: BlendMode,
    pub sampler: SamplerMode,
    pub rasterizer: RasterizerMode,
    pub shader: Option<ShaderBinding>,
    pub transform: Mat4,
}

impl Default for BatchState {
    fn default() -> Self {
        Self {
            sort: SortMode::default(),
            blend: BlendMode::default(),
            sampler: SamplerMode::default(),
            rasterizer: RasterizerMode::default(),
            shader: None,
            transform: Mat4::IDENTITY,
        }
    }
}

/// One textured quad.
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteDraw {
    pub texture: TextureHandle,
    /// Screen position of the pivot.
    pub position: Vec2,
    /// Region of the texture to draw, whole texture when `None`.
    pub source: Option<SourceRect>,
    pub color: Color,
    pub rotation: f32,
    /// Pivot in source-region pixels.
    pub origin: Vec2,
    pub scale: f32,
}

/// Immediate-mode sprite renderer supplied by the host.
pub trait SpriteBatch {
    /// Whether a begin/end pair is currently open.
    fn is_begun(&self) -> bool;

    /// Configuration of the open pair, or of the last one opened.
    fn state(&self) -> BatchState;

    fn begin(&mut self, state: &BatchState);

    fn end(&mut self);

    fn draw(&mut self, sprite: &SpriteDraw);
}

/// A single call made against a [`RecordingBatch`].
#[derive(Clone, Debug, PartialEq)]
pub enum BatchCommand {
    Begin(BatchState),
    End,
    Draw(SpriteDraw),
}

/// [`SpriteBatch`] that records every call instead of rendering.
#[derive(Debug, Default)]
pub struct RecordingBatch {
    commands: Vec<BatchCommand>,
    state: BatchState,
    begun: bool,
}

impl RecordingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch that is already open with `state`, as a host mid-frame would be.
    pub fn begun(state: BatchState) -> Self {
        Self {
            commands: Vec::new(),
            state,
            begun: true,
        }
    }

    pub fn commands(&self) -> &[BatchCommand] {
        &self.commands
    }

    /// All sprites drawn so far, in order.
    pub fn draws(&self) -> impl Iterator<Item = &SpriteDraw> {
        self.commands.iter().filter_map(|c| match c {
            BatchCommand::Draw(d) => Some(d),
            _ => None,
        })
    }

    /// Number of sprites drawn using `texture`.
    pub fn draw_count_for(&self, texture: &TextureHandle) -> usize {
        self.draws().filter(|d| &d.texture == texture).count()
    }

    /// Forget recorded commands, keeping the open/closed state.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl SpriteBatch for RecordingBatch {
    fn is_begun(&self) -> bool {
        self.begun
    }

    fn state(&self) -> BatchState {
        self.state.clone()
    }

    fn begin(&mut self, state: &BatchState) {
        debug_assert!(!self.begun, "begin called twice without end");
        self.begun = true;
        self.state = state.clone();
        self.commands.push(BatchCommand::Begin(state.clone()));
    }

    fn end(&mut self) {
        debug_assert!(self.begun, "end called without begin");
        self.begun = false;
        self.commands.push(BatchCommand::End);
    }

    fn draw(&mut self, sprite: &SpriteDraw) {
        debug_assert!(self.begun, "draw called outside begin/end");
        self.commands.push(BatchCommand::Draw(sprite.clone()));
    }
}

/// WGSL source for the shared shading shader.
///
/// Darkens the half of the sprite facing away from the light with a soft
/// terminator around a sphere of `radius` centered at `offset`.
pub const SHADING_SHADER_SOURCE: &str = r#"
struct ShadingUniforms {
    source_rect: vec4<f32>,
    offset: vec2<f32>,
    shade_resolution: vec2<f32>,
    intensity: f32,
    radius: f32,
};

@group(0) @binding(0)
var sprite_texture: texture_2d<f32>;
@group(0) @binding(1)
var sprite_sampler: sampler;

@group(1) @binding(0)
var<uniform> shading: ShadingUniforms;

struct FragmentInput {
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@fragment
fn fs_shading(in: FragmentInput) -> @location(0) vec4<f32> {
    let base = textureSample(sprite_texture, sprite_sampler, in.uv) * in.color;

    // Position inside the source rectangle, in shade-resolution pixels.
    let local = (in.uv - shading.source_rect.xy) / shading.source_rect.zw;
    let pixel = (local - vec2<f32>(0.5, 0.5)) * shading.shade_resolution;

    let dist = length(pixel - shading.offset);
    let edge = smoothstep(shading.radius * 0.9, shading.radius * 1.1, dist);
    let shade = 1.0 - shading.intensity * (1.0 - edge);

    return vec4<f32>(base.rgb * shade, base.a);
}
"#;
