//! webpanim CLI Tool
//!
//! Command-line interface for inspecting animated WebP files and extracting
//! their frames as PNG images.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::{Path, PathBuf};
use webpanim_core::{AnimationInfo, FrameTiming, WebPHeader};
use webpanim_decoder::{ErrorKind, FrameCache, LibWebP, LibraryConfig};

#[derive(Parser)]
#[command(name = "webpanim")]
#[command(about = "Inspect animated WebP files and extract their frames")]
#[command(version)]
struct Cli {
    /// Path to libwebpdemux (defaults to $WEBPANIM_LIBWEBPDEMUX or the system library)
    #[arg(long, global = true)]
    demux_lib: Option<PathBuf>,

    /// Path to libwebp, if WebPMalloc/WebPFree are not reachable through libwebpdemux
    #[arg(long, global = true)]
    webp_lib: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show canvas size, loop count and frame timing
    Info {
        /// Input WebP file path
        input: PathBuf,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a file can be decoded
    Probe {
        /// Input WebP file path
        input: PathBuf,
    },

    /// Decode frames to PNG files
    Decode {
        /// Input WebP file path
        input: PathBuf,

        /// Output directory for frames or single frame file
        #[arg(short, long)]
        output: PathBuf,

        /// Extract a single frame by index
        #[arg(long)]
        frame: Option<usize>,
    },
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let mut config = LibraryConfig::from_env();
    if cli.demux_lib.is_some() {
        config.demux_path = cli.demux_lib;
    }
    if cli.webp_lib.is_some() {
        config.webp_path = cli.webp_lib;
    }

    match cli.command {
        Commands::Info { input, json } => show_info(&config, input, json)?,
        Commands::Probe { input } => probe(&config, input)?,
        Commands::Decode {
            input,
            output,
            frame,
        } => decode_frames(&config, input, output, frame)?,
    }

    Ok(())
}

fn open(config: &LibraryConfig, input: &Path) -> Result<FrameCache<&'static LibWebP>> {
    let bytes = std::fs::read(input).context("Failed to read input file")?;
    debug!("read {} bytes from {}", bytes.len(), input.display());
    let lib = LibWebP::init(config.clone()).context("Failed to load libwebp")?;
    FrameCache::open(lib, &bytes).context("Failed to open WebP input")
}

fn show_info(config: &LibraryConfig, input: PathBuf, json: bool) -> Result<()> {
    let mut cache = open(config, &input)?;
    let info = cache.info().context("Failed to read animation info")?;
    cache
        .frame_count(true)
        .context("Failed to decode frames")?;
    let timings: Vec<FrameTiming> = cache.frames().iter().map(|f| f.timing()).collect();

    if json {
        let report = serde_json::json!({
            "info": info,
            "frames": timings,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_info(&input, &info, &timings);
    }
    Ok(())
}

fn probe(config: &LibraryConfig, input: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&input).context("Failed to read input file")?;
    match WebPHeader::sniff(&bytes) {
        Ok(header) => {
            let available = LibWebP::init(config.clone()).is_ok();
            println!(
                "{}: WebP ({} first chunk), decodable: {}",
                input.display(),
                String::from_utf8_lossy(&header.first_chunk.fourcc()).trim_end(),
                if available { "yes" } else { "no (libwebp not found)" }
            );
        }
        Err(e) => println!("{}: not decodable ({e})", input.display()),
    }
    Ok(())
}

fn decode_frames(
    config: &LibraryConfig,
    input: PathBuf,
    output: PathBuf,
    frame_index: Option<usize>,
) -> Result<()> {
    info!("Decoding WebP file: {}", input.display());
    let mut cache = open(config, &input)?;

    if let Some(index) = frame_index {
        // Extract single frame
        let frame = cache
            .frame(index)
            .with_context(|| format!("Failed to decode frame {index}"))?;
        frame.save(&output).context("Failed to save frame")?;
        info!(
            "Saved frame {} ({} ms) to {}",
            index,
            frame.timestamp_ms(),
            output.display()
        );
        return Ok(());
    }

    // Extract all frames
    std::fs::create_dir_all(&output).context("Failed to create output directory")?;
    let mut index = 0;
    loop {
        let frame = match cache.frame(index) {
            Ok(frame) => frame,
            Err(e) if e.kind() == ErrorKind::IndexOutOfRange => break,
            Err(e) => return Err(e).with_context(|| format!("Failed to decode frame {index}")),
        };
        let frame_path = output.join(format!("frame_{:06}.png", index));
        frame.save(&frame_path).context("Failed to save frame")?;

        index += 1;
        if index % 10 == 0 {
            info!("Extracted {} frames", index);
        }
    }

    info!("Successfully extracted {} frames to {}", index, output.display());
    Ok(())
}

fn print_info(input: &Path, info: &AnimationInfo, timings: &[FrameTiming]) {
    println!("\n=== WebP File Information ===");
    println!("File: {}", input.display());
    println!("Canvas: {}x{}", info.canvas_width, info.canvas_height);
    if info.loops_forever() {
        println!("Loop count: infinite");
    } else {
        println!("Loop count: {}", info.loop_count);
    }
    println!("Background color: {:#010x}", info.background_color);
    println!("Declared frames: {}", info.frame_count);
    println!("Decoded frames: {}", timings.len());
    let duration = timings.last().map(|t| t.timestamp_ms).unwrap_or(0);
    println!(
        "Duration: {} ms ({:.2} seconds)",
        duration,
        duration as f64 / 1000.0
    );

    println!("\n=== Frames (first 10) ===");
    for (i, timing) in timings.iter().take(10).enumerate() {
        println!(
            "  [{}] at {}ms, delay {}ms",
            i, timing.timestamp_ms, timing.delay_ms
        );
    }
    if timings.len() > 10 {
        println!("  ... and {} more frames", timings.len() - 10);
    }
}
