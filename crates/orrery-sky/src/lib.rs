//! Celestial bodies for 2D skies: orbit trees, parallax and day/night arcs,
//! and three-layer shaded compositing through a host sprite batch.
//!
//! A [`Sky`] owns every [`CelestialBody`] and hands out [`BodyId`] handles.
//! Each frame the host builds an [`Environment`] snapshot, calls
//! [`Sky::update`] (parents strictly before children) and draws bodies into
//! its [`SpriteBatch`].

pub mod body;
pub mod color;
pub mod environment;
pub mod error;
pub mod layer;
pub mod motion;
pub mod orbit;
pub mod render;
pub mod scene;
pub mod sky;

pub use body::{CelestialBody, CelestialBodyBuilder, DrawContext, OrbitLink};
pub use color::Color;
pub use environment::{DEFAULT_DAY_LENGTH, DEFAULT_NIGHT_LENGTH, Environment, SkyClock};
pub use error::SkyError;
pub use layer::{
    DrawOverride, Layer, LayerDraw, LayerKind, Rect, ShaderConfigurator, ShaderOverride,
    ShadingTerms, SourceRect, TerminatorShading, TextureHandle,
};
pub use motion::{ArcPose, Parallax, SkyRotationMode};
pub use orbit::{Orbit, ellipse_radius};
pub use render::{
    BatchCommand, BatchState, BlendMode, RasterizerMode, RecordingBatch, SHADING_SHADER_NAME,
    SHADING_SHADER_SOURCE, SamplerMode, ShaderBinding, ShaderHandle, ShadingParams, SortMode,
    SpriteBatch, SpriteDraw,
};
pub use scene::{BodyDef, OrbitDef, OrbitShape, ParallaxDef, Scene, SceneDef, TextureDef};
pub use sky::{BodyId, Sky};
