//! The random "cover" scene: a huge ground sphere and a 22x22 grid of small
//! jittered spheres.

use rand::Rng;
use rtw_core::{Context, MaterialKind, MaterialRegistry, RenderResult, Scene};
use rtw_math::{Color, Triplet};

/// Radius of the small grid spheres.
pub const SMALL_RADIUS: f64 = 0.2;

/// Grid cells closer than this to [`AVOID`] stay empty.
pub const AVOID_DISTANCE: f64 = 0.9;

pub const AVOID: Triplet = Triplet::new(4.0, 0.2, 0.0);

/// Pick a material for one grid cell.
pub fn random_material<R: Rng + ?Sized>(rng: &mut R) -> MaterialKind {
    let choose_mat = rng.gen::<f64>();
    if choose_mat < 0.8 {
        MaterialKind::Lambertian {
            color: random_color(rng, 0.0, 1.0).modulate(random_color(rng, 0.0, 1.0)),
        }
    } else if choose_mat < 0.95 {
        MaterialKind::Metal {
            color: random_color(rng, 0.5, 1.0),
            fuzz: rng.gen_range(0.0..0.5),
        }
    } else {
        MaterialKind::Dielectric { refractive_index: 1.5 }
    }
}

fn random_color<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> Color {
    let mut channel = || min + (max - min) * rng.gen::<f64>();
    Color::new(channel(), channel(), channel())
}

/// Build the scene on `ctx`. Every material is owned by the returned
/// registry.
pub fn build<R: Rng + ?Sized>(ctx: &Context, rng: &mut R) -> RenderResult<(MaterialRegistry, Scene)> {
    let mut materials = ctx.material_registry();
    let mut scene = ctx.create_scene()?;

    let ground = materials.create_lambertian(Color::gray(0.5))?;
    scene.add_sphere(&materials, Triplet::new(0.0, -1000.0, 0.0), 1000.0, ground)?;

    for a in -11..11 {
        for b in -11..11 {
            let kind = random_material(rng);
            let center = Triplet::new(
                a as f64 + 0.9 * rng.gen::<f64>(),
                SMALL_RADIUS,
                b as f64 + 0.9 * rng.gen::<f64>(),
            );
            if center.distance(AVOID) <= AVOID_DISTANCE {
                continue;
            }
            let material = materials.create(kind)?;
            scene.add_sphere(&materials, center, SMALL_RADIUS, material)?;
        }
    }

    log::info!("cover scene: {} spheres, {} materials", scene.len(), materials.len());
    Ok((materials, scene))
}
