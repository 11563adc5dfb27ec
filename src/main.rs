// Replays a directory of still frames through the vision engine and reports the
// room status of every analysed frame.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;

use occupancy_vision::core_modules::annotate::save_png;
use occupancy_vision::{PipelineConfig, Report, StreamPipeline};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

#[derive(Parser, Debug)]
#[command(
    name = "occupancy_vision",
    about = "Room occupancy and color blob detection over a sequence of frames"
)]
struct Args {
    /// JSON configuration file; built-in defaults are used when absent
    #[arg(short = 'c', long = "conf")]
    conf: Option<PathBuf>,

    /// Directory of frames, replayed in file name order
    input_dir: PathBuf,

    /// Directory to write annotated frames to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the configured working width
    #[arg(long)]
    working_width: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.conf {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(width) = args.working_width {
        config.working_width = width;
    }

    let frames = collect_frames(&args.input_dir)?;
    if frames.is_empty() {
        bail!("no frames found in {}", args.input_dir.display());
    }
    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }
    log::info!("replaying {} frame(s) from {}", frames.len(), args.input_dir.display());

    let stream = StreamPipeline::spawn(config)?;
    let mut occupied = 0usize;
    for path in &frames {
        let frame = match image::open(path) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                log::warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let timed = match stream.process_frame(frame).await {
            Ok(timed) => timed,
            Err(e) => {
                log::warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let Report::Analyzed(analysis) = &timed.report else {
            continue;
        };
        log::info!("{} ({})", analysis.room_status(), path.display());
        log::debug!("frame {} analysed in {:?}", timed.frame_id, timed.latency);
        if analysis.occupancy.is_occupied() {
            occupied += 1;
        }

        if let Some(dir) = &args.output {
            let target = annotated_path(dir, path);
            save_png(&target, &analysis.annotated())
                .with_context(|| format!("failed to write {}", target.display()))?;
        }
    }

    let pipeline = stream.shutdown().await?;
    log::info!(
        "done: {} frame(s) processed, {} occupied",
        pipeline.frames_processed(),
        occupied
    );
    Ok(())
}

fn collect_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read input directory {}", dir.display()))?;
    let mut frames = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if path.is_file() && is_frame {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

fn annotated_path(dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    dir.join(format!("{stem}_annotated.png"))
}
