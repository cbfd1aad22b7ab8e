use camera_motion_detect::synthetic::{SyntheticCamera, rotation_about, translation, zoom_about};
use clap::{Parser, Subcommand, ValueEnum};
use nalgebra as na;
use std::path::Path;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Motion {
    Pan,
    Rotate,
    Zoom,
    Static,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic frame sequence with a known camera motion
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: String,

        #[arg(short, long, value_enum, default_value = "pan")]
        motion: Motion,

        /// Number of frames to generate
        #[arg(short, long, default_value = "20")]
        num_frames: usize,

        /// Motion starts at this frame, earlier frames are identical
        #[arg(long, default_value = "5")]
        start_frame: usize,

        /// Per-frame step: pixels for pan, degrees for rotate, scale delta for zoom
        #[arg(long, default_value = "4.0")]
        step: f64,

        /// Image width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Image height
        #[arg(long, default_value = "480")]
        height: u32,

        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            output,
            motion,
            num_frames,
            start_frame,
            step,
            width,
            height,
            seed,
        } => {
            generate_sequence(
                &output,
                motion,
                num_frames,
                start_frame,
                step,
                width,
                height,
                seed,
            )?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn generate_sequence(
    output_dir: &str,
    motion: Motion,
    num_frames: usize,
    start_frame: usize,
    step: f64,
    width: u32,
    height: u32,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output_dir)?;

    let margin = (width.max(height) / 2).max(64);
    let camera = SyntheticCamera::with_margin(width, height, margin, seed);
    let (cx, cy) = camera.center();

    for frame_idx in 0..num_frames {
        let k = frame_idx.saturating_sub(start_frame) as f64;
        let m: na::Matrix3<f64> = match motion {
            Motion::Pan => translation(step * k, 0.0),
            Motion::Rotate => rotation_about(cx, cy, step * k),
            Motion::Zoom => zoom_about(cx, cy, 1.0 + step * k),
            Motion::Static => na::Matrix3::identity(),
        };
        let img = camera.view(&m).ok_or("singular motion")?;
        img.save(Path::new(output_dir).join(format!("{:06}.png", frame_idx)))?;
    }

    println!("Generated {} frames in {}", num_frames, output_dir);
    Ok(())
}
