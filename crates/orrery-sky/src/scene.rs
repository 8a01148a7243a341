//! RON scene descriptions.
//!
//! A scene names each body and wires orbits and light sources by name. Links
//! are resolved after every body exists, so declaration order is free.
//!
//! ```ron
//! (
//!     bodies: [
//!         (name: "sun", body: Some((path: "sky/sun", width: 64, height: 64)), rotation_mode: Day),
//!         (
//!             name: "moon",
//!             body: Some((path: "sky/moon", width: 32, height: 32)),
//!             orbit: Some((parent: "sun", shape: Circle(120.0), rate: 0.01)),
//!             light_source: Some("sun"),
//!             shading: Some((intensity: 0.9)),
//!         ),
//!     ],
//! )
//! ```

use std::collections::HashMap;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    BodyId, CelestialBody, Color, LayerKind, Sky, SkyError, SkyRotationMode, SourceRect,
    TerminatorShading, TextureHandle,
};

/// Texture reference with the dimensions the host resolved for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureDef {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

impl TextureDef {
    fn handle(&self) -> TextureHandle {
        TextureHandle::new(self.path.clone(), self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum OrbitShape {
    /// Circle of the given radius.
    Circle(f32),
    /// Ellipse with axes `(a, b)` at zero tilt.
    Ellipse(f32, f32),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitDef {
    pub parent: String,
    pub shape: OrbitShape,
    #[serde(default)]
    pub tilt: f32,
    #[serde(default)]
    pub phase: f32,
    /// Radians per tick.
    pub rate: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallaxDef {
    pub speed_x: f32,
    pub speed_y: f32,
    pub average_offset: [f32; 2],
}

/// One body in a scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyDef {
    pub name: String,
    pub body: Option<TextureDef>,
    pub back: Option<TextureDef>,
    pub front: Option<TextureDef>,
    pub source: Option<SourceRect>,
    pub size: Option<[f32; 2]>,
    pub scale: f32,
    pub rotation: f32,
    pub position: [f32; 2],
    pub color: Color,
    pub parallax: Option<ParallaxDef>,
    pub rotation_mode: SkyRotationMode,
    pub orbit: Option<OrbitDef>,
    pub light_source: Option<String>,
    /// Terminator shading applied to the body layer.
    pub shading: Option<TerminatorShading>,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            body: None,
            back: None,
            front: None,
            source: None,
            size: None,
            scale: 1.0,
            rotation: 0.0,
            position: [0.0, 0.0],
            color: Color::WHITE,
            parallax: None,
            rotation_mode: SkyRotationMode::None,
            orbit: None,
            light_source: None,
            shading: None,
        }
    }
}

impl BodyDef {
    fn to_body(&self) -> CelestialBody {
        let mut builder = CelestialBody::builder()
            .scale(self.scale)
            .rotation(self.rotation);
        if let Some(texture) = &self.body {
            builder = builder.body_texture(texture.handle());
        }
        if let Some(texture) = &self.back {
            builder = builder.back_texture(texture.handle());
        }
        if let Some(texture) = &self.front {
            builder = builder.front_texture(texture.handle());
        }
        if let Some(rect) = self.source {
            builder = builder
                .body_source(rect)
                .back_source(rect)
                .front_source(rect);
        }
        if let Some([w, h]) = self.size {
            builder = builder.size(Vec2::new(w, h));
        }

        let mut body = builder.build();
        body.set_position(self.position[0], self.position[1]);
        body.set_color(self.color);
        body.set_rotation_mode(self.rotation_mode);
        if let Some(p) = &self.parallax {
            body.set_parallax(p.speed_x, p.speed_y, Vec2::from_array(p.average_offset));
        }
        if let Some(shading) = self.shading {
            body.set_shader_config(LayerKind::Body, Some(Box::new(shading)));
        }
        body
    }
}

/// Serialized form of a scene.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDef {
    pub bodies: Vec<BodyDef>,
}

impl SceneDef {
    pub fn from_ron_str(source: &str) -> Result<Self, SkyError> {
        ron::from_str(source).map_err(SkyError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, SkyError> {
        let contents = std::fs::read_to_string(path).map_err(SkyError::Read)?;
        let def = Self::from_ron_str(&contents)?;
        log::info!("Loaded scene from {} ({} bodies)", path.display(), def.bodies.len());
        Ok(def)
    }
}

/// A built sky plus the name of every body in it.
#[derive(Debug)]
pub struct Scene {
    pub sky: Sky,
    names: HashMap<String, BodyId>,
}

impl Scene {
    /// Instantiate every body, then resolve orbits and light sources by name.
    pub fn build(def: &SceneDef) -> Result<Self, SkyError> {
        let mut sky = Sky::new();
        let mut names = HashMap::with_capacity(def.bodies.len());

        for body_def in &def.bodies {
            if names.contains_key(&body_def.name) {
                return Err(SkyError::DuplicateName(body_def.name.clone()));
            }
            let id = sky.insert(body_def.to_body());
            names.insert(body_def.name.clone(), id);
        }

        let lookup = |name: &str| {
            names
                .get(name)
                .copied()
                .ok_or_else(|| SkyError::UnknownName(name.to_string()))
        };

        for body_def in &def.bodies {
            let id = lookup(&body_def.name)?;
            if let Some(orbit) = &body_def.orbit {
                let parent = lookup(&orbit.parent)?;
                match orbit.shape {
                    OrbitShape::Circle(radius) => {
                        sky.set_orbit_parent(id, parent, radius, orbit.phase, orbit.rate)?
                    }
                    OrbitShape::Ellipse(a, b) => sky.set_orbit_parent_elliptic(
                        id,
                        parent,
                        Vec2::new(a, b),
                        orbit.tilt,
                        orbit.phase,
                        orbit.rate,
                    )?,
                }
            }
            if let Some(light) = &body_def.light_source {
                sky.set_light_source(id, Some(lookup(light)?))?;
            }
        }

        Ok(Self { sky, names })
    }

    pub fn from_ron_str(source: &str) -> Result<Self, SkyError> {
        Self::build(&SceneDef::from_ron_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, SkyError> {
        Self::build(&SceneDef::load(path)?)
    }

    pub fn id(&self, name: &str) -> Option<BodyId> {
        self.names.get(name).copied()
    }

    pub fn body(&self, name: &str) -> Option<&CelestialBody> {
        self.sky.get(self.id(name)?)
    }

    /// Name of the body behind `id`, if it came from this scene.
    pub fn name_of(&self, id: BodyId) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, candidate)| **candidate == id)
            .map(|(name, _)| name.as_str())
    }
}
