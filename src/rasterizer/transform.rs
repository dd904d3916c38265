//! Model/View/Projection matrix builders
//!
//! All builders are called once per frame and read their trig values from
//! the shared lookup table; only `TrigTable::new` ever touches libm. The
//! convention throughout is column vectors (`M * v`), so a composed matrix
//! applies its rightmost factor first.

use super::math::{Mat4, Vec3};
use super::table::TrigTable;

/// Mirrors the X axis; applied as the innermost factor of every model
/// matrix to match the renderer's handedness convention.
const FLIP_X: Mat4 = Mat4 {
    m: [
        [-1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ],
};

/// Model matrix: translation, yaw about Y, pitch about X, and the fixed
/// handedness flip. Angles are lookup-table indices.
pub fn model_matrix(table: &TrigTable, yaw_index: i32, pitch_index: i32, offset: Vec3) -> Mat4 {
    let (ys, yc) = (table.sin(yaw_index) as f32, table.cos(yaw_index) as f32);
    let (ps, pc) = (table.sin(pitch_index) as f32, table.cos(pitch_index) as f32);

    let yaw = Mat4::new([
        [yc, 0.0, ys, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [-ys, 0.0, yc, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);
    let pitch = Mat4::new([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, pc, -ps, 0.0],
        [0.0, ps, pc, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    Mat4::translation(offset) * yaw * pitch * FLIP_X
}

/// Axis-aligned camera: translate the world by the negated eye position.
pub fn view_matrix(eye: Vec3) -> Mat4 {
    Mat4::new([
        [1.0, 0.0, 0.0, -eye.x],
        [0.0, 1.0, 0.0, -eye.y],
        [0.0, 0.0, 1.0, -eye.z],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// Free-look camera: a right-handed orthonormal basis derived from the
/// yaw/pitch lookup indices, assembled as rows (right, up, -forward) with
/// the eye projected onto each basis vector as the translation column.
pub fn look_view_matrix(table: &TrigTable, eye: Vec3, yaw_index: i32, pitch_index: i32) -> Mat4 {
    let (ys, yc) = (table.sin(yaw_index) as f32, table.cos(yaw_index) as f32);
    let (ps, pc) = (table.sin(pitch_index) as f32, table.cos(pitch_index) as f32);

    let forward = Vec3::new(pc * ys, -ps, pc * yc).normalize_or(Vec3::FORWARD);
    // Straight up/down pitch leaves the cross product degenerate; fall back
    // to the world X axis.
    let right = forward.cross(Vec3::UP).normalize_or(Vec3::X);
    let up = right.cross(forward);

    Mat4::new([
        [right.x, right.y, right.z, -eye.dot(right)],
        [up.x, up.y, up.z, -eye.dot(up)],
        [-forward.x, -forward.y, -forward.z, eye.dot(forward)],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// Perspective projection. `fov_degrees` is the full vertical field of view;
/// its half-angle cotangent comes from the lookup table. Depth lands in
/// clip space via the conventional (n+f)/(n-f) remap row, and the -1 divide
/// row makes w grow with distance in front of the camera so that NDC depth
/// is monotonic (near -> -1, far -> +1).
pub fn projection_matrix(
    table: &TrigTable,
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
) -> Mat4 {
    let half_fov = (fov_degrees as f64).to_radians() / 2.0;
    let cot = table.cot(TrigTable::index_for(half_fov)) as f32;
    let n_f = 1.0 / (near - far);

    Mat4::new([
        [cot / aspect, 0.0, 0.0, 0.0],
        [0.0, cot, 0.0, 0.0],
        [0.0, 0.0, (near + far) * n_f, 2.0 * near * far * n_f],
        [0.0, 0.0, -1.0, 0.0],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::math::Vec4;
    use crate::rasterizer::table::TABLE_SIZE;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{} != {}", a, b);
    }

    #[test]
    fn test_model_identity_angles_is_flip() {
        let table = TrigTable::new();
        let m = model_matrix(&table, 0, 0, Vec3::ZERO);
        let p = m * Vec4::from_point(Vec3::new(2.0, 3.0, 4.0));
        assert_close(p.x, -2.0);
        assert_close(p.y, 3.0);
        assert_close(p.z, 4.0);
    }

    #[test]
    fn test_model_quarter_turn_yaw() {
        let table = TrigTable::new();
        // pi/2 is 157 table steps
        let m = model_matrix(&table, 157, 0, Vec3::ZERO);
        // X flip first maps (1,0,0) to (-1,0,0); the yaw then takes it to
        // roughly (0,0,1).
        let p = m * Vec4::from_point(Vec3::new(1.0, 0.0, 0.0));
        assert!(p.x.abs() < 0.01);
        assert!((p.z - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_model_translation_applies_last() {
        let table = TrigTable::new();
        let m = model_matrix(&table, 0, 0, Vec3::new(10.0, 0.0, 0.0));
        let p = m * Vec4::from_point(Vec3::new(1.0, 0.0, 0.0));
        assert_close(p.x, 9.0); // flipped to -1, then offset by +10
    }

    #[test]
    fn test_view_translate_moves_eye_to_origin() {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let v = view_matrix(eye) * Vec4::from_point(eye);
        assert_eq!((v.x, v.y, v.z, v.w), (0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_look_view_maps_eye_to_origin() {
        let table = TrigTable::new();
        let eye = Vec3::new(1.5, -2.0, 4.0);
        let v = look_view_matrix(&table, eye, 271, -88) * Vec4::from_point(eye);
        assert_close(v.x, 0.0);
        assert_close(v.y, 0.0);
        assert_close(v.z, 0.0);
    }

    #[test]
    fn test_look_view_basis_is_orthonormal() {
        let table = TrigTable::new();
        let m = look_view_matrix(&table, Vec3::ZERO, 42, 130).m;
        let rows = [
            Vec3::new(m[0][0], m[0][1], m[0][2]),
            Vec3::new(m[1][0], m[1][1], m[1][2]),
            Vec3::new(m[2][0], m[2][1], m[2][2]),
        ];
        for (i, a) in rows.iter().enumerate() {
            assert_close(a.len(), 1.0);
            for b in &rows[i + 1..] {
                assert_close(a.dot(*b), 0.0);
            }
        }
    }

    #[test]
    fn test_look_view_wraps_angle_indices() {
        let table = TrigTable::new();
        let a = look_view_matrix(&table, Vec3::ZERO, -1, 0);
        let b = look_view_matrix(&table, Vec3::ZERO, TABLE_SIZE as i32 - 1, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_look_view_stays_orthonormal_near_pole() {
        let table = TrigTable::new();
        // pitch within one table step of pi/2: forward is almost parallel
        // to world up and the cross product nearly vanishes.
        let m = look_view_matrix(&table, Vec3::ZERO, 0, 157).m;
        let right = Vec3::new(m[0][0], m[0][1], m[0][2]);
        let up = Vec3::new(m[1][0], m[1][1], m[1][2]);
        assert!((right.len() - 1.0).abs() < 1e-3);
        assert!(right.dot(up).abs() < 1e-3);
    }

    #[test]
    fn test_projection_depth_remap() {
        let table = TrigTable::new();
        let (near, far) = (0.1, 50.0);
        let p = projection_matrix(&table, 45.0, 1.0, near, far);

        // View-space points straight ahead: w = -z, NDC z = clip.z / w
        let at_near = p * Vec4::from_point(Vec3::new(0.0, 0.0, -near));
        assert_close(at_near.z / at_near.w, -1.0);
        let at_far = p * Vec4::from_point(Vec3::new(0.0, 0.0, -far));
        assert_close(at_far.z / at_far.w, 1.0);
    }

    #[test]
    fn test_projection_depth_is_monotonic() {
        let table = TrigTable::new();
        let p = projection_matrix(&table, 45.0, 1.0, 0.1, 50.0);
        let ndc_z = |z: f32| {
            let c = p * Vec4::from_point(Vec3::new(0.0, 0.0, z));
            c.z / c.w
        };
        assert!(ndc_z(-4.0) < ndc_z(-6.0));
        assert!(ndc_z(-6.0) < ndc_z(-49.0));
    }

    #[test]
    fn test_projection_w_positive_in_front() {
        let table = TrigTable::new();
        let p = projection_matrix(&table, 45.0, 1.0, 0.1, 50.0);
        let c = p * Vec4::from_point(Vec3::new(0.3, -0.2, -4.0));
        assert_close(c.w, 4.0);
    }
}
