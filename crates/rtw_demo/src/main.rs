//! Renders the random cover scene to a PNG, reporting progress in the log.
//!
//! Usage: `rtw_demo [OUTPUT] [--camera FILE.json] [--seed N] [--samples N] [--width N]`

mod cover;

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rtw_core::{Camera, Context, Progress, RenderObserver, RenderSession};
use rtw_math::Triplet;

/// Command line options.
#[derive(Debug, Clone, PartialEq)]
struct Args {
    output: PathBuf,
    camera: Option<PathBuf>,
    seed: Option<u64>,
    samples: Option<u32>,
    width: Option<u32>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output.png"),
            camera: None,
            seed: None,
            samples: None,
            width: None,
        }
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut output_set = false;

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--camera" => parsed.camera = Some(PathBuf::from(value("--camera")?)),
            "--seed" => parsed.seed = Some(value("--seed")?.parse().context("--seed")?),
            "--samples" => parsed.samples = Some(value("--samples")?.parse().context("--samples")?),
            "--width" => parsed.width = Some(value("--width")?.parse().context("--width")?),
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            path if !output_set => {
                parsed.output = PathBuf::from(path);
                output_set = true;
            }
            extra => bail!("unexpected argument {extra}"),
        }
    }

    Ok(parsed)
}

/// The camera used for the cover image.
fn cover_camera() -> Camera {
    Camera::new()
        .with_resolution(500, 16.0 / 9.0)
        .with_quality(10, 20)
        .with_position(
            Triplet::new(13.0, 2.0, 3.0), // look_from
            Triplet::new(0.0, 0.0, 0.0),  // look_at
            Triplet::new(0.0, 1.0, 0.0),  // vup
        )
        .with_lens(20.0, 0.6, 10.0)
}

fn load_camera(args: &Args) -> Result<Camera> {
    let mut camera = match &args.camera {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading camera file {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing camera file {}", path.display()))?
        }
        None => cover_camera(),
    };
    if let Some(samples) = args.samples {
        camera.samples_per_pixel = samples;
    }
    if let Some(width) = args.width {
        camera.image_width = width;
    }
    camera.validate()?;
    Ok(camera)
}

#[cfg(feature = "native")]
fn engine_context() -> Context {
    Context::native()
}

#[cfg(not(feature = "native"))]
fn engine_context() -> Context {
    Context::new(rtw_renderer::SoftwareEngine::new())
}

/// Logs status lines and a coarse progress bar.
#[derive(Debug, Default)]
struct ConsoleObserver {
    last_tenth: Option<u32>,
}

impl RenderObserver for ConsoleObserver {
    fn on_frame(&mut self, progress: &Progress<'_>) {
        let tenth = (progress.fraction() * 10.0) as u32;
        if self.last_tenth != Some(tenth) {
            self.last_tenth = Some(tenth);
            log::info!(
                "[{:<10}] {:>3.0}%",
                "#".repeat(tenth as usize),
                progress.fraction() * 100.0
            );
        }
    }

    fn on_status(&mut self, status: &str) {
        log::info!("{}", status);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(std::env::args().skip(1))?;
    let camera = load_camera(&args)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("seed {seed}");

    let ctx = engine_context();
    log::info!("engine: {}", ctx.engine_name());

    let start = std::time::Instant::now();
    let (mut materials, mut scene) = cover::build(&ctx, &mut StdRng::seed_from_u64(seed))?;
    log::info!("scene built in {:?}", start.elapsed());

    let session = RenderSession::new(camera).save_to(&args.output);
    let outcome = session.run(&ctx, &mut scene, &materials, &mut ConsoleObserver::default());

    let released = materials.dispose_all();
    scene.dispose();
    log::debug!("released {released} materials and the scene");

    let outcome = outcome?;
    match outcome.export {
        Some(Err(err)) => Err(err).context("saving render"),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        assert_eq!(args(&[]).unwrap(), Args::default());
    }

    #[test]
    fn test_all_options() {
        let parsed = args(&["cover.png", "--seed", "7", "--samples", "3", "--width", "64"]).unwrap();

        assert_eq!(parsed.output, PathBuf::from("cover.png"));
        assert_eq!(parsed.seed, Some(7));
        assert_eq!(parsed.samples, Some(3));
        assert_eq!(parsed.width, Some(64));
    }

    #[test]
    fn test_bad_options() {
        assert!(args(&["--seed"]).is_err());
        assert!(args(&["--width", "wide"]).is_err());
        assert!(args(&["--fast"]).is_err());
        assert!(args(&["a.png", "b.png"]).is_err());
    }

    #[test]
    fn test_overrides_apply_to_cover_camera() {
        let parsed = args(&["--samples", "2", "--width", "80"]).unwrap();

        let camera = load_camera(&parsed).unwrap();

        assert_eq!(camera.samples_per_pixel, 2);
        assert_eq!(camera.image_width, 80);
        assert_eq!(camera.image_height().unwrap(), 45);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let parsed = args(&["--samples", "0"]).unwrap();
        assert!(load_camera(&parsed).is_err());
    }
}
