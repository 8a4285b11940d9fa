use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Cartesian triple used for positions, scales and rotations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Creates a triple from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Multiplies every component by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

/// Placement of one entity read from the position source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    /// Ordinal of the record among qualifying lines.
    pub index: usize,
    /// Position in scene coordinates.
    pub position: Vec3,
    /// Per-axis scale factors.
    pub scale: Vec3,
    /// Rotation angles; zero when the line carries none.
    pub rotation: Vec3,
}

/// One soil folder candidate for substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoilVariant {
    /// Folder name, also used as the soil identity.
    pub name: String,
    /// Absolute or config-relative folder path.
    pub directory_path: PathBuf,
    /// Number of per-band files found in the folder.
    pub band_file_count: usize,
}
