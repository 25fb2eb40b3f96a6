use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use joint_tracker_rs::filters::DoubleExponentialSmoother;
use joint_tracker_rs::recording::load_recording;
use joint_tracker_rs::types::{parse_joint, JointSet, KinectJoint};
use joint_tracker_rs::{FloorPlane, FrameOutcome, OrientationPipeline, PipelineConfig};
use serde_json::json;

#[derive(Parser, Debug)]
struct Args {
    /// Path to a recorded session (JSON lines, optionally .gz)
    #[arg(long)]
    recording: PathBuf,

    /// Pipeline configuration JSON (defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable the horizontal mirror
    #[arg(long, default_value_t = false)]
    no_mirror: bool,

    /// Joints to report (repeatable)
    #[arg(long = "joint", default_values = ["Head", "HandLeft", "HandRight"])]
    joints: Vec<String>,

    /// Also run the filter on N threads and compare against the sequential output
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match args.config.as_ref() {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if args.no_mirror {
        config.mirror = false;
    }

    let report_joints = args
        .joints
        .iter()
        .map(|name| parse_joint::<KinectJoint>(name))
        .collect::<Result<Vec<_>, _>>()?;

    let frames = load_recording::<KinectJoint>(&args.recording)?;
    if frames.is_empty() {
        anyhow::bail!("{} contains no frames", args.recording.display());
    }
    log::info!("replaying {} frames from {}", frames.len(), args.recording.display());

    let floor = FloorPlane::default();
    let mut pipeline = OrientationPipeline::new(config, floor.clone())?;
    let mut parallel = (args.workers > 1).then(|| {
        DoubleExponentialSmoother::<KinectJoint>::new(config.smoothing)
            .with_inferred_scale(config.inferred_radius_scale)
    });

    let mut max_deviation: BTreeMap<KinectJoint, f32> = BTreeMap::new();
    let mut mismatches = 0usize;

    for frame in &frames {
        floor.set(frame.floor_clip_plane);
        let outcome = pipeline.process_bodies(&frame.tracked_bodies());
        if outcome == FrameOutcome::Skipped {
            continue;
        }

        for joint in &report_joints {
            if let Some(sample) = pipeline.conditioned().get(joint) {
                let deviation = (pipeline.filtered(*joint).position - sample.position).length();
                let worst = max_deviation.entry(*joint).or_insert(0.0);
                *worst = worst.max(deviation);
            }
        }

        if let Some(smoother) = parallel.as_mut() {
            let outputs = smoother.update_parallel(pipeline.conditioned(), args.workers)?;
            mismatches += outputs
                .iter()
                .filter(|(joint, point)| **point != pipeline.filtered(**joint))
                .count();
        }
    }

    if mismatches > 0 {
        log::warn!("parallel filter diverged from sequential on {mismatches} joint updates");
    }

    let joints: serde_json::Map<String, serde_json::Value> = report_joints
        .iter()
        .map(|joint| {
            (
                joint.name().to_string(),
                json!({
                    "world_position": pipeline.world_position(*joint),
                    "world_rotation": pipeline.world_rotation(*joint),
                    "max_deviation_m": max_deviation.get(joint).copied(),
                }),
            )
        })
        .collect();

    let mut report = json!({
        "recording": args.recording.display().to_string(),
        "frames": frames.len(),
        "frames_processed": pipeline.frames_processed(),
        "frames_skipped": pipeline.frames_skipped(),
        "config": pipeline.config(),
        "joints": joints,
    });
    if parallel.is_some() {
        report["parallel_check"] = json!({
            "workers": args.workers,
            "mismatches": mismatches,
        });
    }

    log::info!(
        "done: {} processed, {} skipped",
        pipeline.frames_processed(),
        pipeline.frames_skipped()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
