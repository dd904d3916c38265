//! Scene loading and saving
//!
//! Uses RON (Rusty Object Notation) for human-readable scene files: vertex
//! positions, vertex colors, and the triangle index list. Index validation
//! happens when the scene is applied to a rasterizer, so a bad file rejects
//! the whole load.

use std::fs;
use std::path::Path;
use serde::{Serialize, Deserialize};
use crate::rasterizer::{Color, MeshError, Rasterizer, Vec3};

/// Color of the demo cube's front face (shared by its four front vertices).
pub const CUBE_FRONT_COLOR: Color = Color { r: 217, g: 238, b: 185, a: 255 };

/// Color of the demo cube's back face.
pub const CUBE_BACK_COLOR: Color = Color { r: 185, g: 217, b: 238, a: 255 };

/// A renderable scene: parallel position/color lists plus triangles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Color>,
    pub indices: Vec<[usize; 3]>,
}

impl Scene {
    /// Load this scene into a rasterizer, replacing whatever mesh it held.
    pub fn apply(&self, r: &mut Rasterizer) -> Result<(), MeshError> {
        r.load_vertices(&self.positions, &self.colors)?;
        r.load_indices(&self.indices)
    }
}

/// Error type for scene loading
#[derive(Debug)]
pub enum SceneError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
}

impl From<std::io::Error> for SceneError {
    fn from(e: std::io::Error) -> Self {
        SceneError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for SceneError {
    fn from(e: ron::error::SpannedError) -> Self {
        SceneError::ParseError(e)
    }
}

impl From<ron::Error> for SceneError {
    fn from(e: ron::Error) -> Self {
        SceneError::SerializeError(e)
    }
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::IoError(e) => write!(f, "IO error: {}", e),
            SceneError::ParseError(e) => write!(f, "Parse error: {}", e),
            SceneError::SerializeError(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

/// Load a scene from a RON file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<Scene, SceneError> {
    let contents = fs::read_to_string(path)?;
    load_scene_from_str(&contents)
}

/// Load a scene from a RON string (for embedded scenes or testing)
pub fn load_scene_from_str(s: &str) -> Result<Scene, SceneError> {
    let scene = ron::from_str(s)?;
    Ok(scene)
}

/// Save a scene to a RON file
pub fn save_scene<P: AsRef<Path>>(scene: &Scene, path: P) -> Result<(), SceneError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(3)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(scene, config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// The classic two-triangle demo: a light green triangle in front of a
/// light blue one, partially overlapping.
pub fn two_triangles() -> Scene {
    Scene {
        positions: vec![
            Vec3::new(2.0, 0.0, -2.0),
            Vec3::new(0.0, 2.0, -2.0),
            Vec3::new(-2.0, 0.0, -2.0),
            Vec3::new(3.5, -1.0, -5.0),
            Vec3::new(2.5, 1.5, -5.0),
            Vec3::new(-1.0, 0.5, -5.0),
        ],
        colors: vec![
            Color::with_alpha(217, 238, 185, 255),
            Color::with_alpha(217, 238, 185, 255),
            Color::with_alpha(217, 238, 185, 255),
            Color::with_alpha(185, 217, 238, 255),
            Color::with_alpha(185, 217, 238, 255),
            Color::with_alpha(185, 217, 238, 255),
        ],
        indices: vec![[0, 1, 2], [3, 4, 5]],
    }
}

/// A unit-scaled box around the origin: 8 corner vertices, 12 triangles
/// over its 6 faces. Front (+Z) vertices share one color, back vertices
/// another, so the facing faces render flat.
pub fn cube() -> Scene {
    let positions = vec![
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
    ];
    let colors = vec![
        CUBE_FRONT_COLOR,
        CUBE_FRONT_COLOR,
        CUBE_FRONT_COLOR,
        CUBE_FRONT_COLOR,
        CUBE_BACK_COLOR,
        CUBE_BACK_COLOR,
        CUBE_BACK_COLOR,
        CUBE_BACK_COLOR,
    ];
    let indices = vec![
        [0, 1, 2], [0, 2, 3], // front
        [5, 4, 7], [5, 7, 6], // back
        [4, 0, 3], [4, 3, 7], // left
        [1, 5, 6], [1, 6, 2], // right
        [3, 2, 6], [3, 6, 7], // top
        [4, 5, 1], [4, 1, 0], // bottom
    ];
    Scene { positions, colors, indices }
}
