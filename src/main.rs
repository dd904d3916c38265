//! Prism Engine: supersampled software rasterizer
//!
//! Renders a triangle mesh on the CPU every frame: transform, depth-tested
//! fill at 2x resolution, box-filter downsample, then a single texture blit
//! to the window. The window, input polling and frame pacing live here;
//! everything under `rasterizer` is windowing-free.
//!
//! Controls: A/D yaw, W/S pitch, arrows/Q/E translate, Tab toggles the
//! camera between the fixed axis-aligned view and pointer-driven free look,
//! F12 writes the current frame to capture.png.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod rasterizer;
mod scene;

use macroquad::prelude::*;
use rasterizer::{
    transform, CameraController, ClearFlags, InputState, Primitive, Rasterizer, TrigTable,
    Vec3 as RasterVec3, HEIGHT, WIDTH,
};
use scene::{load_scene, two_triangles};

const FOV_DEGREES: f32 = 45.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 50.0;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Prism Engine v{}", VERSION),
        window_width: WIDTH as i32,
        window_height: HEIGHT as i32,
        window_resizable: false,
        high_dpi: true,
        ..Default::default()
    }
}

fn sample_input() -> InputState {
    InputState {
        yaw_left: is_key_down(KeyCode::A),
        yaw_right: is_key_down(KeyCode::D),
        pitch_up: is_key_down(KeyCode::W),
        pitch_down: is_key_down(KeyCode::S),
        move_left: is_key_down(KeyCode::Left),
        move_right: is_key_down(KeyCode::Right),
        move_up: is_key_down(KeyCode::Up),
        move_down: is_key_down(KeyCode::Down),
        move_in: is_key_down(KeyCode::E),
        move_out: is_key_down(KeyCode::Q),
        pointer: mouse_position(),
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    // Built once; read-only for the rest of the run
    let table = TrigTable::new();

    // Optional scene argument: a built-in name or a RON file path. A bad
    // scene is fatal before the loop starts.
    let demo = match std::env::args().nth(1).as_deref() {
        None | Some("triangles") => two_triangles(),
        Some("cube") => scene::cube(),
        Some(path) => match load_scene(path) {
            Ok(s) => {
                println!("Loaded scene: {} ({} triangles)", path, s.indices.len());
                s
            }
            Err(e) => {
                eprintln!("Failed to load {}: {}", path, e);
                std::process::exit(1);
            }
        },
    };

    let mut raster = Rasterizer::new(WIDTH, HEIGHT);
    raster.set_primitive(Primitive::TriangleList);
    if let Err(e) = demo.apply(&mut raster) {
        eprintln!("Invalid mesh: {}", e);
        std::process::exit(1);
    }

    let mut camera = CameraController::new(RasterVec3::new(0.0, 0.0, 5.0));

    let mut frame = Image::gen_image_color(WIDTH as u16, HEIGHT as u16, BLACK);
    let texture = Texture2D::from_image(&frame);
    texture.set_filter(FilterMode::Nearest);

    let mut frame_count: u32 = 0;
    let mut report_start = get_time();

    println!("=== Prism Engine ===");

    loop {
        if is_key_pressed(KeyCode::Tab) {
            camera.toggle_mode();
            println!("Camera mode: {:?}", camera.mode);
        }
        camera.update(&sample_input());

        raster.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        raster.set_model_matrix(camera.model_matrix(&table));
        raster.set_view_matrix(camera.view_matrix(&table));
        raster.set_projection_matrix(transform::projection_matrix(
            &table,
            FOV_DEGREES,
            WIDTH as f32 / HEIGHT as f32,
            NEAR,
            FAR,
        ));
        raster.draw();

        // Downsample and hand the frame to the display surface
        let pixels = raster.resolve();
        frame.bytes.copy_from_slice(&pixels);
        texture.update(&frame);

        clear_background(BLACK);
        draw_texture_ex(
            &texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(screen_width(), screen_height())),
                ..Default::default()
            },
        );

        if is_key_pressed(KeyCode::F12) {
            capture_frame(&pixels, raster.output_width(), raster.output_height());
        }

        frame_count += 1;
        let elapsed = get_time() - report_start;
        if elapsed >= 1.0 {
            let (yaw, pitch) = camera.model_angles();
            println!(
                "FPS: {:.2} | yaw {:.2} rad, pitch {:.2} rad",
                frame_count as f64 / elapsed,
                yaw as f64 / 100.0,
                pitch as f64 / 100.0,
            );
            frame_count = 0;
            report_start = get_time();
        }

        next_frame().await;
    }
}

/// Write the resolved frame to capture.png in the working directory.
fn capture_frame(rgba: &[u8], width: usize, height: usize) {
    match image::RgbaImage::from_raw(width as u32, height as u32, rgba.to_vec()) {
        Some(img) => match img.save("capture.png") {
            Ok(()) => println!("Saved capture.png"),
            Err(e) => eprintln!("Capture failed: {}", e),
        },
        None => eprintln!("Capture failed: frame size mismatch"),
    }
}
