//! Sky configuration error types.

use crate::BodyId;

/// Errors raised while configuring a sky or loading a scene description.
///
/// Per-frame update and draw never fail; only configuration that would
/// corrupt the orbit graph or reference missing data is rejected.
#[derive(Debug, thiserror::Error)]
pub enum SkyError {
    /// The handle does not refer to a live body in this sky.
    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),

    /// A body was asked to orbit itself.
    #[error("body {0:?} cannot orbit itself")]
    SelfOrbit(BodyId),

    /// Attaching the child would make it an ancestor of itself.
    #[error("attaching {child:?} to {parent:?} would create an orbit cycle")]
    OrbitCycle { child: BodyId, parent: BodyId },

    /// The orbit has a non-finite value or an ellipse with a non-positive axis.
    #[error("invalid orbit for {child:?}: axes {ellipse:?}")]
    InvalidOrbit { child: BodyId, ellipse: glam::Vec2 },

    /// A body was asked to be its own light source.
    #[error("body {0:?} cannot be its own light source")]
    SelfLight(BodyId),

    /// A scene description referenced a body name that was never declared.
    #[error("scene references unknown body `{0}`")]
    UnknownName(String),

    /// A scene description declared the same body name twice.
    #[error("scene declares body `{0}` more than once")]
    DuplicateName(String),

    /// Failed to read a scene file from disk.
    #[error("failed to read scene: {0}")]
    Read(#[source] std::io::Error),

    /// Failed to parse RON scene content.
    #[error("failed to parse scene: {0}")]
    Parse(#[source] ron::error::SpannedError),
}
