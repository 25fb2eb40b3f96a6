//! Recorded sensor sessions
//!
//! One JSON object per line, optionally gzip-compressed (`.gz` suffix):
//! `{"timestamp": 0.033, "floor_clip_plane": [x, y, z, w], "bodies": [...]}`

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use glam::Vec4;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, TrackerError};
use crate::types::{body_from_samples, JointSample, JointSet, KinectJoint, TrackedBody};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedBody<J = KinectJoint> {
    pub tracked: bool,
    pub joints: Vec<JointSample<J>>,
}

/// Everything the sensor reported in one frame
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame<J = KinectJoint> {
    /// Seconds since the start of the session
    pub timestamp: f64,
    pub floor_clip_plane: Vec4,
    pub bodies: Vec<RecordedBody<J>>,
}

impl<J: JointSet> RecordedFrame<J> {
    pub fn tracked_bodies(&self) -> Vec<TrackedBody<J>> {
        self.bodies
            .iter()
            .map(|b| TrackedBody::new(b.tracked, body_from_samples(b.joints.iter().copied())))
            .collect()
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

pub fn load_recording<J>(path: impl AsRef<Path>) -> Result<Vec<RecordedFrame<J>>>
where
    J: JointSet + DeserializeOwned,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = if is_gzip(path) {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    let frames = read_frames(reader)?;
    log::debug!("loaded {} frames from {}", frames.len(), path.display());
    Ok(frames)
}

/// Parse frames from any line-oriented reader
pub fn read_frames<J, R>(reader: R) -> Result<Vec<RecordedFrame<J>>>
where
    J: JointSet + DeserializeOwned,
    R: BufRead,
{
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = serde_json::from_str(&line).map_err(|source| TrackerError::Parse { line: i + 1, source })?;
        frames.push(frame);
    }
    Ok(frames)
}

pub fn write_recording<J>(path: impl AsRef<Path>, frames: &[RecordedFrame<J>]) -> Result<()>
where
    J: JointSet + Serialize,
{
    let path = path.as_ref();
    let file = File::create(path)?;
    if is_gzip(path) {
        write_frames(GzEncoder::new(file, Compression::default()), frames)?.finish()?;
    } else {
        write_frames(BufWriter::new(file), frames)?.flush()?;
    }
    Ok(())
}

fn write_frames<J, W>(mut writer: W, frames: &[RecordedFrame<J>]) -> Result<W>
where
    J: JointSet + Serialize,
    W: Write,
{
    for frame in frames {
        serde_json::to_writer(&mut writer, frame).map_err(io::Error::from)?;
        writer.write_all(b"\n")?;
    }
    Ok(writer)
}
