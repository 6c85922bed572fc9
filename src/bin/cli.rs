use anyhow::{anyhow, bail, Context, Result};
use camflow::testing::SyntheticCamera;
use camflow::{CameraSource, CamflowConfig, ColorMode};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    camflow::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: camflow-cli <record|init-config|show-config> [args]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "record" => cmd_record(&args),
        "init-config" => cmd_init_config(&args),
        "show-config" => cmd_show_config(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn config_path(args: &[String]) -> PathBuf {
    args.iter()
        .skip(2)
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(CamflowConfig::default_path)
}

fn cmd_init_config(args: &[String]) -> Result<()> {
    let path = config_path(args);
    if path.exists() && !args.contains(&"--force".to_string()) {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    CamflowConfig::default().save_to_file(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn cmd_show_config(args: &[String]) -> Result<()> {
    let path = config_path(args);
    let config = CamflowConfig::load_from_file(&path)?;
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

fn cmd_record(args: &[String]) -> Result<()> {
    // Parse args: record [--config <path>] [--device <id>] [--seconds <n>] [--out <dir>]
    //   [--name <name>] [--index <n>] [--rate <fps>] [--grayscale] [--synthetic] [--json]
    let mut config_file = None;
    let mut device_id = None;
    let mut seconds = 5.0f64;
    let mut out_dir = None;
    let mut name = None;
    let mut file_index = 0u32;
    let mut trigger_rate = None;
    let mut grayscale = false;
    let mut synthetic = false;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => config_file = Some(PathBuf::from(value(args, &mut i)?)),
            "--device" => device_id = Some(value(args, &mut i)?.to_string()),
            "--seconds" => seconds = value(args, &mut i)?.parse().context("--seconds")?,
            "--out" => out_dir = Some(value(args, &mut i)?.to_string()),
            "--name" => name = Some(value(args, &mut i)?.to_string()),
            "--index" => file_index = value(args, &mut i)?.parse().context("--index")?,
            "--rate" => trigger_rate = Some(value(args, &mut i)?.parse::<f64>().context("--rate")?),
            "--grayscale" => grayscale = true,
            "--synthetic" => synthetic = true,
            "--json" => json = true,
            other => bail!("Unknown argument: {}", other),
        }
        i += 1;
    }

    let mut config = match config_file {
        Some(path) => CamflowConfig::load_from_file(path)?,
        None => CamflowConfig::load_or_default(),
    };
    if let Some(id) = device_id {
        config.camera.device_id = id;
    }
    if let Some(dir) = out_dir {
        config.recording.save_dir = dir;
    }
    if let Some(name) = name {
        config.recording.name = name;
    }
    if grayscale {
        config.camera.color_mode = ColorMode::Grayscale;
    }
    config.validate().map_err(|e| anyhow!(e))?;

    let source = open_source(synthetic)?;
    let mut camera = camflow::Camera::new(config, source)?;
    camera.open()?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    camera.start_capture()?;

    let mut request = camera.session_request(file_index);
    if let Some(rate) = trigger_rate {
        request = request.triggered(rate);
    }
    camera.start_saving(&request)?;
    if !json {
        println!(
            "Recording {} @ {} fps to {} (Ctrl-C to stop)",
            camera.resolution()?,
            camera.rate()?,
            request.save_dir.display()
        );
    }

    let deadline = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    while Instant::now() < deadline && !interrupted.load(Ordering::SeqCst) {
        // Keep the display slot moving the way a viewer would
        let _ = camera.take_display_frame();
        std::thread::sleep(Duration::from_millis(20));
    }

    let report = camera
        .stop_saving()
        .ok_or_else(|| anyhow!("no recording session was active"))?;
    let stats = camera.stop_capture()?;
    camera.close();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "drain": report,
                "capture": stats,
            }))?
        );
    } else {
        println!(
            "{:?}: {} of {} frames written in {:.2?} ({} discarded)",
            report.outcome, report.written, report.expected, report.elapsed, report.discarded
        );
        if let Some(stats) = stats {
            println!(
                "Capture: {} frames, {} dropped, {} substituted",
                stats.iterations, stats.dropped, stats.substituted
            );
        }
    }
    Ok(())
}

fn value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{} needs a value", flag))
}

#[cfg(feature = "device")]
fn open_source(synthetic: bool) -> Result<Box<dyn CameraSource>> {
    if synthetic {
        return Ok(Box::new(SyntheticCamera::new()));
    }
    Ok(Box::new(camflow::DeviceCamera::new()))
}

#[cfg(not(feature = "device"))]
fn open_source(synthetic: bool) -> Result<Box<dyn CameraSource>> {
    if !synthetic {
        log::warn!("Built without the `device` feature; using the synthetic camera");
    }
    Ok(Box::new(SyntheticCamera::new()))
}
