//! Rasterizer core
//!
//! Owns the loaded mesh, the current Model/View/Projection matrices and the
//! supersampled framebuffer. `draw` transforms every vertex once, prepares
//! the surviving triangles, and fans the fill out over disjoint column bands
//! of the buffer with rayon — each worker owns an exclusive `&mut` range of
//! whole columns, so depth writes need no synchronization, and the join at
//! the end of the parallel iterator is the barrier before any read-back.

use rayon::prelude::*;

use super::framebuffer::{Framebuffer, Pixel};
use super::math::{barycentric, Mat4, Vec3, Vec4};
use super::types::{ClearFlags, Color, MeshError, Primitive, Vertex};

/// Columns per parallel fill band.
const BAND_COLUMNS: usize = 64;

/// Clip-space w at or below this is behind the eye; such vertices are
/// dropped and their triangles skipped. The only clipping performed.
const MIN_W: f32 = 1e-3;

/// Coverage tolerance: weights this far below zero still count, keeping
/// triangle edges inclusive.
const EDGE_TOLERANCE: f32 = -1e-4;

/// Screen-space area (doubled) under which a triangle is degenerate.
const MIN_AREA: f32 = 1e-4;

/// A vertex mapped to supersampled buffer coordinates.
/// `pos.z` is the remapped depth in [0, 1].
#[derive(Clone, Copy)]
struct ScreenVertex {
    pos: Vec3,
    color: Color,
}

/// A triangle that survived preparation, ready for the fill workers.
struct Surface {
    v1: ScreenVertex,
    v2: ScreenVertex,
    v3: ScreenVertex,
}

/// Software rasterizer with a supersampled color+depth buffer.
pub struct Rasterizer {
    framebuffer: Framebuffer,
    supersample: usize,
    output_width: usize,
    output_height: usize,
    primitive: Primitive,
    vertices: Vec<Vertex>,
    triangles: Vec<[usize; 3]>,
    model: Mat4,
    view: Mat4,
    projection: Mat4,
}

impl Rasterizer {
    /// Create a rasterizer presenting at `output_width` x `output_height`;
    /// the internal buffer is `SUPERSAMPLE` times larger per axis. Starts
    /// in triangle-list mode with identity matrices and an empty mesh.
    pub fn new(output_width: usize, output_height: usize) -> Self {
        let supersample = super::SUPERSAMPLE;
        Self {
            framebuffer: Framebuffer::new(
                output_width * supersample,
                output_height * supersample,
            ),
            supersample,
            output_width,
            output_height,
            primitive: Primitive::default(),
            vertices: Vec::new(),
            triangles: Vec::new(),
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }

    /// Replace the mesh vertices. Rejects mismatched position/color lists;
    /// any previously loaded indices are dropped since they may no longer
    /// be valid for the new mesh.
    pub fn load_vertices(&mut self, positions: &[Vec3], colors: &[Color]) -> Result<(), MeshError> {
        if positions.len() != colors.len() {
            return Err(MeshError::CountMismatch {
                positions: positions.len(),
                colors: colors.len(),
            });
        }
        self.vertices = positions
            .iter()
            .zip(colors)
            .map(|(&pos, &color)| Vertex::new(pos, color))
            .collect();
        self.triangles.clear();
        Ok(())
    }

    /// Replace the triangle list. Every index must reference a loaded
    /// vertex; one bad index rejects the whole call and leaves the stored
    /// mesh untouched.
    pub fn load_indices(&mut self, triangles: &[[usize; 3]]) -> Result<(), MeshError> {
        for (t, tri) in triangles.iter().enumerate() {
            for &index in tri {
                if index >= self.vertices.len() {
                    return Err(MeshError::IndexOutOfRange {
                        triangle: t,
                        index,
                        vertex_count: self.vertices.len(),
                    });
                }
            }
        }
        self.triangles = triangles.to_vec();
        Ok(())
    }

    pub fn set_primitive(&mut self, primitive: Primitive) {
        self.primitive = primitive;
    }

    pub fn set_model_matrix(&mut self, m: Mat4) {
        self.model = m;
    }

    pub fn set_view_matrix(&mut self, m: Mat4) {
        self.view = m;
    }

    pub fn set_projection_matrix(&mut self, m: Mat4) {
        self.projection = m;
    }

    /// Reset the selected framebuffer planes to background color / far
    /// depth.
    pub fn clear(&mut self, flags: ClearFlags) {
        self.framebuffer.clear(flags);
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn supersample(&self) -> usize {
        self.supersample
    }

    pub fn output_width(&self) -> usize {
        self.output_width
    }

    pub fn output_height(&self) -> usize {
        self.output_height
    }

    /// Downsample the supersampled buffer to a row-major RGBA byte vec at
    /// output resolution.
    pub fn resolve(&self) -> Vec<u8> {
        self.framebuffer.resolve(self.supersample)
    }

    /// Rasterize every loaded triangle into the framebuffer. Fragments are
    /// depth-tested against whatever the buffer already holds, so repeated
    /// draws without a clear compose; the usual per-frame sequence is
    /// clear-then-draw.
    pub fn draw(&mut self) {
        let mvp = self.projection * self.view * self.model;
        let w = self.framebuffer.width() as f32;
        let h = self.framebuffer.height() as f32;

        // Transform, divide, and viewport-map each vertex once. Y inverts
        // for the top-left raster origin; NDC z remaps to [0, 1] depth.
        let screen: Vec<Option<ScreenVertex>> = self
            .vertices
            .iter()
            .map(|v| {
                let clip = mvp * Vec4::from_point(v.pos);
                if clip.w < MIN_W {
                    return None;
                }
                let inv_w = 1.0 / clip.w;
                Some(ScreenVertex {
                    pos: Vec3::new(
                        (clip.x * inv_w + 1.0) * 0.5 * w,
                        (1.0 - clip.y * inv_w) * 0.5 * h,
                        (clip.z * inv_w + 1.0) * 0.5,
                    ),
                    color: v.color,
                })
            })
            .collect();

        let surfaces: Vec<Surface> = match self.primitive {
            Primitive::TriangleList => self
                .triangles
                .iter()
                .filter_map(|tri| {
                    let v1 = screen[tri[0]]?;
                    let v2 = screen[tri[1]]?;
                    let v3 = screen[tri[2]]?;

                    // Degenerate triangles rasterize to nothing
                    let area = (v2.pos.x - v1.pos.x) * (v3.pos.y - v1.pos.y)
                        - (v3.pos.x - v1.pos.x) * (v2.pos.y - v1.pos.y);
                    if area.abs() < MIN_AREA {
                        return None;
                    }

                    // Triangles fully outside the buffer are skipped, not an
                    // error
                    let min_x = v1.pos.x.min(v2.pos.x).min(v3.pos.x);
                    let max_x = v1.pos.x.max(v2.pos.x).max(v3.pos.x);
                    let min_y = v1.pos.y.min(v2.pos.y).min(v3.pos.y);
                    let max_y = v1.pos.y.max(v2.pos.y).max(v3.pos.y);
                    if max_x < 0.0 || min_x >= w || max_y < 0.0 || min_y >= h {
                        return None;
                    }

                    Some(Surface { v1, v2, v3 })
                })
                .collect(),
        };

        if surfaces.is_empty() {
            return;
        }

        // Column-major cells: a chunk of BAND_COLUMNS * height cells is a
        // band of whole columns, exclusively owned by one worker.
        let height = self.framebuffer.height();
        self.framebuffer
            .cells_mut()
            .par_chunks_mut(BAND_COLUMNS * height)
            .enumerate()
            .for_each(|(band, cells)| {
                let x0 = band * BAND_COLUMNS;
                let band_width = cells.len() / height;
                for surface in &surfaces {
                    fill_band(cells, x0, band_width, height, surface);
                }
            });
    }
}

/// Rasterize one triangle into a band of whole columns starting at `x0`.
/// The triangle's bounding box is clamped to the band; pixels are covered
/// when all three barycentric weights are non-negative (within the edge
/// tolerance), and write only when strictly nearer than the stored depth.
fn fill_band(cells: &mut [Pixel], x0: usize, band_width: usize, height: usize, s: &Surface) {
    let (a, b, c) = (s.v1.pos, s.v2.pos, s.v3.pos);

    let min_x = a.x.min(b.x).min(c.x).max(x0 as f32) as usize;
    let max_x = (a.x.max(b.x).max(c.x) + 1.0).min((x0 + band_width) as f32) as usize;
    let min_y = a.y.min(b.y).min(c.y).max(0.0) as usize;
    let max_y = (a.y.max(b.y).max(c.y) + 1.0).min(height as f32) as usize;

    for x in min_x..max_x {
        let column = (x - x0) * height;
        for y in min_y..max_y {
            let bc = barycentric(x as f32, y as f32, a, b, c);
            if bc.x >= EDGE_TOLERANCE && bc.y >= EDGE_TOLERANCE && bc.z >= EDGE_TOLERANCE {
                let depth = bc.x * a.z + bc.y * b.z + bc.z * c.z;
                let cell = &mut cells[column + y];
                if depth < cell.depth {
                    cell.depth = depth;
                    cell.color = Color::blend3(bc, s.v1.color, s.v2.color, s.v3.color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::framebuffer::FAR_DEPTH;
    use crate::rasterizer::table::TrigTable;
    use crate::rasterizer::transform::{projection_matrix, view_matrix};
    use crate::scene;

    const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };

    /// Rasterizer with identity matrices: vertex positions are NDC, depth
    /// is (z + 1) / 2.
    fn ndc_rasterizer() -> Rasterizer {
        let mut r = Rasterizer::new(8, 8);
        r.set_primitive(Primitive::TriangleList);
        r
    }

    /// A triangle spanning most of the buffer at constant NDC depth `z`.
    fn big_triangle(z: f32) -> [Vec3; 3] {
        [
            Vec3::new(-1.0, -1.0, z),
            Vec3::new(1.0, -1.0, z),
            Vec3::new(0.0, 1.0, z),
        ]
    }

    fn load_triangles(r: &mut Rasterizer, tris: &[([Vec3; 3], Color)]) {
        let mut positions = Vec::new();
        let mut colors = Vec::new();
        let mut indices = Vec::new();
        for (verts, color) in tris {
            let base = positions.len();
            positions.extend_from_slice(verts);
            colors.extend(std::iter::repeat(*color).take(3));
            indices.push([base, base + 1, base + 2]);
        }
        r.load_vertices(&positions, &colors).unwrap();
        r.load_indices(&indices).unwrap();
    }

    fn center_pixel(r: &Rasterizer) -> Pixel {
        let fb = r.framebuffer();
        fb.pixel(fb.width() / 2, fb.height() / 2).unwrap()
    }

    #[test]
    fn test_nearer_triangle_wins_either_draw_order() {
        for order in [[(-0.5, RED), (0.5, BLUE)], [(0.5, BLUE), (-0.5, RED)]] {
            let mut r = ndc_rasterizer();
            let tris: Vec<_> = order
                .iter()
                .map(|&(z, color)| (big_triangle(z), color))
                .collect();
            load_triangles(&mut r, &tris);
            r.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
            r.draw();
            let p = center_pixel(&r);
            assert_eq!(p.color, RED);
            assert!((p.depth - 0.25).abs() < 1e-4);
        }
    }

    #[test]
    fn test_draws_accumulate_until_cleared() {
        let mut r = ndc_rasterizer();
        load_triangles(&mut r, &[(big_triangle(-0.5), RED)]);
        r.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        r.draw();

        // A farther triangle drawn in a second pass loses to the stored
        // depth
        load_triangles(&mut r, &[(big_triangle(0.5), BLUE)]);
        r.draw();
        assert_eq!(center_pixel(&r).color, RED);

        // After a clear it wins
        r.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        r.draw();
        assert_eq!(center_pixel(&r).color, BLUE);
    }

    #[test]
    fn test_clear_restores_background_and_far_depth() {
        let mut r = ndc_rasterizer();
        load_triangles(&mut r, &[(big_triangle(0.0), RED)]);
        r.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        r.draw();
        r.clear(ClearFlags::COLOR | ClearFlags::DEPTH);

        let fb = r.framebuffer();
        for x in 0..fb.width() {
            for y in 0..fb.height() {
                let p = fb.pixel(x, y).unwrap();
                assert_eq!(p.color, fb.background());
                assert_eq!(p.depth, FAR_DEPTH);
            }
        }
    }

    #[test]
    fn test_degenerate_triangles_write_nothing() {
        let mut r = ndc_rasterizer();
        let point = Vec3::new(0.0, 0.0, 0.0);
        let colinear = [
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.5, 0.5, 0.0),
        ];
        load_triangles(&mut r, &[([point, point, point], RED), (colinear, BLUE)]);
        r.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        r.draw();

        let fb = r.framebuffer();
        for x in 0..fb.width() {
            for y in 0..fb.height() {
                assert_eq!(fb.pixel(x, y).unwrap().depth, FAR_DEPTH);
            }
        }
    }

    #[test]
    fn test_offscreen_triangle_is_skipped() {
        let mut r = ndc_rasterizer();
        let far_right = [
            Vec3::new(3.0, -1.0, 0.0),
            Vec3::new(5.0, -1.0, 0.0),
            Vec3::new(4.0, 1.0, 0.0),
        ];
        load_triangles(&mut r, &[(far_right, RED)]);
        r.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        r.draw();

        let fb = r.framebuffer();
        for x in 0..fb.width() {
            for y in 0..fb.height() {
                assert_eq!(fb.pixel(x, y).unwrap().depth, FAR_DEPTH);
            }
        }
    }

    #[test]
    fn test_behind_camera_triangle_is_skipped() {
        let table = TrigTable::new();
        let mut r = ndc_rasterizer();
        r.set_view_matrix(view_matrix(Vec3::new(0.0, 0.0, 5.0)));
        r.set_projection_matrix(projection_matrix(&table, 45.0, 1.0, 0.1, 50.0));
        // Behind the eye at z = 6
        let behind = [
            Vec3::new(-1.0, -1.0, 6.0),
            Vec3::new(1.0, -1.0, 6.0),
            Vec3::new(0.0, 1.0, 6.0),
        ];
        load_triangles(&mut r, &[(behind, RED)]);
        r.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        r.draw();
        assert_eq!(center_pixel(&r).depth, FAR_DEPTH);
    }

    #[test]
    fn test_load_indices_rejects_out_of_range() {
        let mut r = ndc_rasterizer();
        let positions = [Vec3::ZERO, Vec3::X, Vec3::UP];
        let colors = [RED; 3];
        r.load_vertices(&positions, &colors).unwrap();
        r.load_indices(&[[0, 1, 2]]).unwrap();

        // The whole load is rejected: the first triangle is valid but must
        // not survive
        let err = r.load_indices(&[[0, 1, 2], [0, 1, 5]]).unwrap_err();
        assert!(matches!(err, MeshError::IndexOutOfRange { index: 5, .. }));
        assert_eq!(r.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_load_vertices_rejects_count_mismatch() {
        let mut r = ndc_rasterizer();
        let err = r.load_vertices(&[Vec3::ZERO], &[RED, BLUE]).unwrap_err();
        assert!(matches!(err, MeshError::CountMismatch { positions: 1, colors: 2 }));
        assert!(r.vertices.is_empty());
    }

    #[test]
    fn test_reloading_vertices_drops_stale_indices() {
        let mut r = ndc_rasterizer();
        let positions = [Vec3::ZERO, Vec3::X, Vec3::UP];
        r.load_vertices(&positions, &[RED; 3]).unwrap();
        r.load_indices(&[[0, 1, 2]]).unwrap();

        r.load_vertices(&positions[..2], &[RED; 2]).unwrap();
        assert!(r.triangles.is_empty());
    }

    #[test]
    fn test_cube_front_face_wins_at_center() {
        let table = TrigTable::new();
        let mut r = Rasterizer::new(64, 64);
        scene::cube().apply(&mut r).unwrap();

        r.set_model_matrix(crate::rasterizer::transform::model_matrix(
            &table,
            0,
            0,
            Vec3::ZERO,
        ));
        r.set_view_matrix(view_matrix(Vec3::new(0.0, 0.0, 5.0)));
        r.set_projection_matrix(projection_matrix(&table, 45.0, 1.0, 0.1, 50.0));
        r.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        r.draw();

        let p = center_pixel(&r);
        assert_eq!(p.color, scene::CUBE_FRONT_COLOR);
        assert!(p.depth < FAR_DEPTH);

        // The box-filtered output pixel agrees: the whole center block is
        // front-face
        let out = r.framebuffer().resolve_pixel(r.supersample(), 32, 32);
        assert_eq!(out, scene::CUBE_FRONT_COLOR);
    }
}
