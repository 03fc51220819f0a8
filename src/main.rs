use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use glam::UVec2;
use log::info;

use lumen_realtime::{
    run_window, Engine, FullscreenScene, GpuContext, Renderer, Settings, SettingsHandle,
    WindowInitError, WindowOptions,
};

const USAGE: &str = "Usage: lumen [scene.xml] [--scene <path>] [--param1 <n>] [--param2 <n>] \
[--near <f>] [--far <f>] [--fullscreen <none|forest|water|planet>] [--population-lod] \
[--distance-lod] [--dof] [--motion-blur] [--fog] [--sky <image>] [--size <WxH>] \
[--capture <out.png>] [--summary-only]";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Some(options) = CliOptions::parse(env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };
    let mut engine = Engine::new(SettingsHandle::new(options.settings.clone()));
    println!("{}", engine.summary());

    if options.summary_only {
        return Ok(());
    }
    if let Some(path) = &options.capture {
        return capture_headless(&mut engine, options.size, path.clone());
    }

    let window = WindowOptions {
        size: options.size,
        ..WindowOptions::default()
    };
    match run_window(&mut engine, window) {
        Ok(()) => Ok(()),
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!(
                "{err}. Falling back to --summary-only mode (set DISPLAY or install a Vulkan/GL driver to enable rendering)."
            );
            println!("{}", engine.summary());
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn capture_headless(engine: &mut Engine, size: UVec2, path: PathBuf) -> Result<()> {
    let gpu = GpuContext::headless().context("no GPU adapter available for capture")?;
    let mut renderer = Renderer::new(&gpu, wgpu::TextureFormat::Rgba8Unorm);
    engine.on_viewport_resized(size.x, size.y);
    engine.tick(0.0);
    let image = renderer.capture(&gpu, &engine.frame(), engine.viewport())?;
    image.save_png(&path)?;
    info!("captured frame {}", engine.frame_index());
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
struct CliOptions {
    settings: Settings,
    summary_only: bool,
    capture: Option<PathBuf>,
    size: UVec2,
}

impl CliOptions {
    /// Returns `None` when help was requested.
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<Self>> {
        let mut args = args.into_iter();
        let mut options = Self {
            settings: Settings::default(),
            summary_only: false,
            capture: None,
            size: UVec2::new(1280, 720),
        };
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
            };
            let settings = &mut options.settings;
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "--scene" => settings.scene_path = Some(PathBuf::from(value("--scene")?)),
                "--param1" => {
                    settings.shape_parameter_1 = parse_number("--param1", value("--param1")?)?
                }
                "--param2" => {
                    settings.shape_parameter_2 = parse_number("--param2", value("--param2")?)?
                }
                "--near" => settings.near_plane = parse_number("--near", value("--near")?)?,
                "--far" => settings.far_plane = parse_number("--far", value("--far")?)?,
                "--fullscreen" => {
                    let name = value("--fullscreen")?;
                    settings.fullscreen_scene = FullscreenScene::from_name(&name)
                        .ok_or_else(|| anyhow!("Unknown fullscreen scene: {name}"))?;
                }
                "--population-lod" => settings.population_lod = true,
                "--distance-lod" => settings.distance_lod = true,
                "--dof" => settings.depth_of_field.enabled = true,
                "--motion-blur" => settings.motion_blur = true,
                "--fog" => settings.fog = true,
                "--sky" => settings.sky_texture = Some(PathBuf::from(value("--sky")?)),
                "--size" => options.size = parse_size(&value("--size")?)?,
                "--capture" => options.capture = Some(PathBuf::from(value("--capture")?)),
                "--summary-only" => options.summary_only = true,
                other if other.starts_with('-') => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
                path => settings.scene_path = Some(PathBuf::from(path)),
            }
        }
        if options.settings.near_plane <= 0.0
            || options.settings.far_plane <= options.settings.near_plane
        {
            return Err(anyhow!(
                "clip planes must satisfy 0 < near < far (got {} and {})",
                options.settings.near_plane,
                options.settings.far_plane
            ));
        }
        Ok(Some(options))
    }
}

fn parse_number<T>(flag: &str, value: String) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid value for {flag}: {value}"))
}

fn parse_size(value: &str) -> Result<UVec2> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("--size expects WIDTHxHEIGHT, got {value}"))?;
    let size = UVec2::new(
        parse_number("--size", width.to_string())?,
        parse_number("--size", height.to_string())?,
    );
    if size.min_element() == 0 {
        return Err(anyhow!("--size must be non-zero, got {value}"));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<CliOptions>> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn positional_argument_sets_the_scene() {
        let options = parse(&["scene.xml", "--param1", "12", "--fog"])
            .unwrap()
            .unwrap();
        assert_eq!(options.settings.scene_path, Some(PathBuf::from("scene.xml")));
        assert_eq!(options.settings.shape_parameter_1, 12);
        assert!(options.settings.fog);
        assert!(!options.summary_only);
    }

    #[test]
    fn fullscreen_names_are_checked() {
        let options = parse(&["--fullscreen", "water"]).unwrap().unwrap();
        assert_eq!(options.settings.fullscreen_scene, FullscreenScene::Water);
        assert!(parse(&["--fullscreen", "desert"]).is_err());
    }

    #[test]
    fn size_and_clip_planes_are_validated() {
        let options = parse(&["--size", "320x200"]).unwrap().unwrap();
        assert_eq!(options.size, UVec2::new(320, 200));
        assert!(parse(&["--size", "0x10"]).is_err());
        assert!(parse(&["--size", "wide"]).is_err());
        assert!(parse(&["--near", "5", "--far", "1"]).is_err());
    }

    #[test]
    fn unknown_flags_and_missing_values_fail() {
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["--param2"]).is_err());
        assert!(parse(&["--help"]).unwrap().is_none());
    }
}
