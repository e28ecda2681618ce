//! Render a Cornell box to a binary PPM.
//!
//! ```text
//! cargo run --release --example cornell_box -- [output.ppm] [config.json]
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

use anyhow::Context;
use lumen_renderer::{
    render, Camera, Color, Environment, ImageBuffer, Material, Mesh, PathTracedIntegrator,
    RenderConfig, Scene, Vec3,
};

/// Box spans [-1, 1] x [0, 2] x [-1, 1], open towards +z.
fn cornell_box() -> Scene {
    let mut scene = Scene::new("cornell_box");

    let white = scene.add_material(Material::diffuse("white", Color::splat(0.73)));
    let red = scene.add_material(Material::diffuse("red", Color::new(0.65, 0.05, 0.05)));
    let green = scene.add_material(Material::diffuse("green", Color::new(0.12, 0.45, 0.15)));
    let light = scene.add_material(Material::emissive("light", Color::splat(15.0)));
    let metal = scene.add_material(Material::metal("aluminium", Color::new(0.91, 0.92, 0.92), 0.15));

    let mut quad = |name: &str, corners: [Vec3; 4], material: usize| {
        let mesh = scene.add_mesh(Mesh::from_positions(name, &corners, vec![0, 1, 2, 0, 2, 3]));
        scene.add_object(mesh, material);
    };

    let p = Vec3::new;
    quad("floor", [p(-1.0, 0.0, -1.0), p(1.0, 0.0, -1.0), p(1.0, 0.0, 1.0), p(-1.0, 0.0, 1.0)], white);
    quad("ceiling", [p(-1.0, 2.0, -1.0), p(-1.0, 2.0, 1.0), p(1.0, 2.0, 1.0), p(1.0, 2.0, -1.0)], white);
    quad("back", [p(-1.0, 0.0, -1.0), p(-1.0, 2.0, -1.0), p(1.0, 2.0, -1.0), p(1.0, 0.0, -1.0)], white);
    quad("left", [p(-1.0, 0.0, -1.0), p(-1.0, 0.0, 1.0), p(-1.0, 2.0, 1.0), p(-1.0, 2.0, -1.0)], red);
    quad("right", [p(1.0, 0.0, -1.0), p(1.0, 2.0, -1.0), p(1.0, 2.0, 1.0), p(1.0, 0.0, 1.0)], green);
    quad("light", [p(-0.25, 1.99, -0.25), p(0.25, 1.99, -0.25), p(0.25, 1.99, 0.25), p(-0.25, 1.99, 0.25)], light);

    let tall = block("tall_block", Vec3::new(-0.35, 0.0, -0.3), Vec3::new(0.3, 1.2, 0.3));
    let short = block("short_block", Vec3::new(0.35, 0.0, 0.3), Vec3::new(0.3, 0.6, 0.3));
    let tall = scene.add_mesh(tall);
    let short = scene.add_mesh(short);
    scene.add_object(tall, metal);
    scene.add_object(short, white);

    scene
}

/// Axis-aligned box resting on `base` with the given half widths and height.
fn block(name: &str, base: Vec3, size: Vec3) -> Mesh {
    let (lo, hi) = (base - Vec3::new(size.x, 0.0, size.z), base + Vec3::new(size.x, size.y, size.z));
    let corner = |i: usize| {
        Vec3::new(
            if i & 1 == 0 { lo.x } else { hi.x },
            if i & 2 == 0 { lo.y } else { hi.y },
            if i & 4 == 0 { lo.z } else { hi.z },
        )
    };

    // One quad per face, vertices not shared so normals stay flat
    const FACES: [[usize; 4]; 6] = [
        [0, 4, 6, 2],
        [1, 3, 7, 5],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 2, 3, 1],
        [4, 5, 7, 6],
    ];
    let mut positions = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for face in FACES {
        let start = positions.len() as u32;
        positions.extend(face.iter().map(|&i| corner(i)));
        indices.extend([start, start + 1, start + 2, start, start + 2, start + 3]);
    }
    Mesh::from_positions(name, &positions, indices)
}

fn write_ppm(image: &ImageBuffer, path: &str) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {path}"))?;
    let mut out = BufWriter::new(file);
    write!(out, "P6\n{} {}\n255\n", image.width, image.height)?;
    for rgba in image.to_rgba8().chunks_exact(4) {
        out.write_all(&rgba[..3])?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "cornell_box.ppm".to_string());
    let config = match args.next() {
        Some(path) => RenderConfig::load(&path)?,
        None => {
            let mut config = RenderConfig {
                samples_per_pixel: 64,
                ..Default::default()
            };
            // Only the ceiling light illuminates the box
            config.integrator.environment = Environment::Constant(Color::ZERO);
            config
        }
    };

    let scene = Arc::new(cornell_box());
    log::info!(
        "Scene '{}': {} objects, {} triangles",
        scene.name,
        scene.object_count(),
        scene.total_triangle_count()
    );

    let integrator = PathTracedIntegrator::new(config.integrator, scene)?;
    let camera = Camera::look_at(Vec3::new(0.0, 1.0, 3.9), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
        .with_fov(40.0)
        .with_resolution(config.width, config.height);

    let image = render(&config, &camera, &integrator)?;
    write_ppm(&image, &output)?;
    log::info!("Wrote {}", output);

    Ok(())
}
