//! Camera and animation state
//!
//! Owns everything the transform builders read: the eye position, the model
//! yaw/pitch angle indices, the accumulated translation offset, and the
//! pointer-driven look angles. The driver loop samples its input source into
//! a plain [`InputState`] once per frame, so this module never sees a
//! windowing type.

use super::math::{Mat4, Vec3};
use super::table::TrigTable;
use super::transform::{look_view_matrix, model_matrix, view_matrix};

/// Table steps the model rotates per frame while a rotation key is held.
const ROTATE_STEP: i32 = 2;

/// World units the offset moves per frame while a move key is held.
const MOVE_STEP: f32 = 0.05;

/// Look-angle table steps per pixel of pointer travel.
const POINTER_SENSITIVITY: f32 = 0.25;

/// Which of the two view derivations is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// Axis-aligned camera: view is a pure eye translation
    Translate,
    /// Pointer-driven look-at basis
    FreeLook,
}

/// Pressed-state of the named controls plus the pointer position, sampled
/// once per frame by the driver loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub yaw_left: bool,
    pub yaw_right: bool,
    pub pitch_up: bool,
    pub pitch_down: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub move_in: bool,
    pub move_out: bool,
    pub pointer: (f32, f32),
}

/// Mutable camera/animation state, updated once per frame.
pub struct CameraController {
    pub eye: Vec3,
    pub mode: CameraMode,
    model_yaw: i32,
    model_pitch: i32,
    look_yaw: i32,
    look_pitch: i32,
    offset: Vec3,
    last_pointer: Option<(f32, f32)>,
}

impl CameraController {
    pub fn new(eye: Vec3) -> Self {
        Self {
            eye,
            mode: CameraMode::Translate,
            model_yaw: 0,
            model_pitch: 0,
            look_yaw: 0,
            look_pitch: 0,
            offset: Vec3::ZERO,
            last_pointer: None,
        }
    }

    pub fn model_angles(&self) -> (i32, i32) {
        (self.model_yaw, self.model_pitch)
    }

    /// Apply one frame of input. Angle indices wrap into the table range on
    /// every update; there is no out-of-range state to reject.
    pub fn update(&mut self, input: &InputState) {
        if input.yaw_left {
            self.model_yaw -= ROTATE_STEP;
        }
        if input.yaw_right {
            self.model_yaw += ROTATE_STEP;
        }
        if input.pitch_up {
            self.model_pitch -= ROTATE_STEP;
        }
        if input.pitch_down {
            self.model_pitch += ROTATE_STEP;
        }

        if input.move_left {
            self.offset.x -= MOVE_STEP;
        }
        if input.move_right {
            self.offset.x += MOVE_STEP;
        }
        if input.move_down {
            self.offset.y -= MOVE_STEP;
        }
        if input.move_up {
            self.offset.y += MOVE_STEP;
        }
        if input.move_out {
            self.offset.z -= MOVE_STEP;
        }
        if input.move_in {
            self.offset.z += MOVE_STEP;
        }

        if let Some((lx, ly)) = self.last_pointer {
            let dx = input.pointer.0 - lx;
            let dy = input.pointer.1 - ly;
            self.look_yaw += (dx * POINTER_SENSITIVITY).round() as i32;
            self.look_pitch += (dy * POINTER_SENSITIVITY).round() as i32;
        }
        self.last_pointer = Some(input.pointer);

        self.model_yaw = TrigTable::wrap(self.model_yaw) as i32;
        self.model_pitch = TrigTable::wrap(self.model_pitch) as i32;
        self.look_yaw = TrigTable::wrap(self.look_yaw) as i32;
        self.look_pitch = TrigTable::wrap(self.look_pitch) as i32;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            CameraMode::Translate => CameraMode::FreeLook,
            CameraMode::FreeLook => CameraMode::Translate,
        };
    }

    /// Model matrix for the current animation state.
    pub fn model_matrix(&self, table: &TrigTable) -> Mat4 {
        model_matrix(table, self.model_yaw, self.model_pitch, self.offset)
    }

    /// View matrix for the active camera mode.
    pub fn view_matrix(&self, table: &TrigTable) -> Mat4 {
        match self.mode {
            CameraMode::Translate => view_matrix(self.eye),
            CameraMode::FreeLook => {
                look_view_matrix(table, self.eye, self.look_yaw, self.look_pitch)
            }
        }
    }
}
