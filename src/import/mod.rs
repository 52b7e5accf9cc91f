// SPDX-License-Identifier: MIT
pub mod controls;
pub mod dark_reference;
pub mod frame_times;
pub mod spectra;
pub mod timestamp;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use self::controls::{ControlLog, ControlRow, read_controls};
use self::dark_reference::read_dark_reference;
use self::frame_times::read_frame_times;
use self::spectra::read_spectra;
use self::timestamp::TimeOrigin;
use crate::session::{FrameRecord, MetadataEntry, Session, SpectralSample};
use crate::spectrum::DarkReference;
use crate::sync::SyncError;
use crate::video::{VideoInfo, VideoProbe};

pub const VIDEO_FILE: &str = "video.avi";
pub const FRAME_TIMES_FILE: &str = "frame_times.txt";
pub const SPECTRA_FILE: &str = "parsed_data.txt";
pub const CONTROLS_FILE: &str = "control_inputs_log.txt";
pub const DARK_REFERENCE_FILE: &str = "darkreferencelog.txt";

/// Files making up one dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetPaths {
    pub video: PathBuf,
    pub spectra: PathBuf,
    pub frame_times: Option<PathBuf>,
    pub controls: Option<PathBuf>,
    pub dark_reference: Option<PathBuf>,
}

impl DatasetPaths {
    /// Locates the conventional file names inside a dataset directory.
    ///
    /// # Errors
    ///
    /// Returns an error listing every required file that is missing.
    pub fn discover(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!("dataset directory not found: {}", dir.display());
        }

        let video = dir.join(VIDEO_FILE);
        let frame_times = dir.join(FRAME_TIMES_FILE);
        let spectra = dir.join(SPECTRA_FILE);
        let controls = dir.join(CONTROLS_FILE);

        let missing: Vec<&str> = [&video, &frame_times, &spectra, &controls]
            .iter()
            .filter(|p| !p.exists())
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        if !missing.is_empty() {
            bail!(
                "required data files not found in {}: {}",
                dir.display(),
                missing.join(", ")
            );
        }

        let dark = dir.join(DARK_REFERENCE_FILE);
        Ok(Self {
            video,
            spectra,
            frame_times: Some(frame_times),
            controls: Some(controls),
            dark_reference: dark.exists().then_some(dark),
        })
    }

    /// Short name shown in the viewer header.
    #[must_use]
    pub fn name(&self) -> String {
        self.video.file_name().map_or_else(
            || self.video.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImportOptions {
    /// Frame rate used when the video does not report one.
    pub fallback_fps: f64,
}

/// Loads datasets through a fixed video probe. Owned by the application so
/// the viewer can re-import.
pub struct Importer {
    probe: Box<dyn VideoProbe>,
    options: ImportOptions,
}

impl Importer {
    #[must_use]
    pub fn new(probe: Box<dyn VideoProbe>, options: ImportOptions) -> Self {
        Self { probe, options }
    }

    /// # Errors
    ///
    /// See [`load_session`].
    pub fn load(&self, paths: &DatasetPaths) -> Result<Session> {
        load_session(paths, self.probe.as_ref(), self.options)
    }
}

/// Reads every file of a dataset and builds a validated [`Session`]. Nothing
/// is returned unless all files load. Spectral rows are put in time order and
/// control-log rows seed the metadata of the frames they belong to.
///
/// # Errors
///
/// Returns an error if a file is missing or malformed, timestamps cannot be
/// aligned, or frame times are absent and the video cannot be probed.
pub fn load_session(
    paths: &DatasetPaths,
    probe: &dyn VideoProbe,
    options: ImportOptions,
) -> Result<Session> {
    if !paths.video.exists() {
        bail!("video file not found: {}", paths.video.display());
    }

    let probed = probe.probe(&paths.video);
    let (frames, origin) = match &paths.frame_times {
        Some(path) => frames_from_file(path, probed)?,
        None => {
            let info = probed.context("frame times not given and the video could not be probed")?;
            let fps = if info.fps > 0.0 {
                info.fps
            } else {
                warn!(
                    fallback_fps = options.fallback_fps,
                    "video reports no frame rate; using fallback"
                );
                options.fallback_fps
            };
            (frames_from_rate(info.frame_count, fps), TimeOrigin::Seconds)
        }
    };

    let table = read_spectra(&paths.spectra)?;
    let mut spectra = table
        .rows
        .into_iter()
        .enumerate()
        .map(|(row, raw)| {
            let timestamp = origin
                .seconds(&raw.timestamp)
                .with_context(|| format!("spectral row {} ({})", row + 1, raw.label))?;
            Ok(SpectralSample {
                timestamp,
                values: raw.values,
                integration_time: raw.integration_time,
                label: raw.label,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    order_spectra(&mut spectra);

    let controls = match &paths.controls {
        Some(path) => read_controls(path)?,
        None => ControlLog::default(),
    };
    let dark = match &paths.dark_reference {
        Some(path) => read_dark_reference(path)?,
        None => DarkReference::default(),
    };

    let seeded = seed_metadata(controls.rows, &frames, origin);
    let session = Session::new(frames, spectra, table.wavelengths)?
        .with_template(controls.template)
        .with_metadata(seeded)
        .with_dark_reference(dark);

    info!(
        video = %paths.video.display(),
        frames = session.frames().len(),
        spectra = session.spectra().len(),
        wavelengths = session.wavelengths().len(),
        "dataset loaded"
    );
    Ok(session)
}

fn frames_from_file(
    path: &Path,
    probed: Result<VideoInfo>,
) -> Result<(Vec<FrameRecord>, TimeOrigin)> {
    let mut raw = read_frame_times(path)?;

    match probed {
        Ok(info) if info.frame_count < raw.len() => {
            warn!(
                video_frames = info.frame_count,
                frame_times = raw.len(),
                "frame-time file lists more frames than the video; truncating"
            );
            raw.truncate(info.frame_count);
        }
        Ok(_) => {}
        Err(err) => warn!(error = %err, "video probe failed; trusting frame-time file"),
    }

    let Some(first) = raw.first() else {
        return Err(SyncError::Validation("video has no frames".to_string()).into());
    };
    let origin = TimeOrigin::from_first_frame(&first.timestamp);

    let frames = raw
        .into_iter()
        .enumerate()
        .map(|(frame_index, t)| {
            let timestamp = origin
                .seconds(&t.timestamp)
                .with_context(|| format!("frame {frame_index} ({})", t.label))?;
            Ok(FrameRecord {
                frame_index,
                timestamp,
                label: t.label,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((frames, origin))
}

fn frames_from_rate(frame_count: usize, fps: f64) -> Vec<FrameRecord> {
    (0..frame_count)
        .map(|frame_index| {
            #[allow(clippy::cast_precision_loss)]
            let timestamp = frame_index as f64 / fps;
            FrameRecord {
                frame_index,
                timestamp,
                label: format!("{timestamp:.6}"),
            }
        })
        .collect()
}

/// Sorts spectral samples by time, keeping file order among equal
/// timestamps, then drops all but the first sample of each timestamp.
fn order_spectra(spectra: &mut Vec<SpectralSample>) {
    if !spectra.is_sorted_by(|a, b| a.timestamp <= b.timestamp) {
        warn!("spectral rows are out of time order; sorting");
        spectra.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    }

    let before = spectra.len();
    spectra.dedup_by(|later, earlier| later.timestamp.total_cmp(&earlier.timestamp).is_eq());
    if spectra.len() < before {
        warn!(
            dropped = before - spectra.len(),
            "duplicate spectral timestamps; keeping the first row of each"
        );
    }
}

/// Assigns each control-log row to a frame: the frame nearest its timestamp
/// when it has one on the dataset's time origin, otherwise the frame at the
/// row's position. Later rows win when two land on the same frame.
fn seed_metadata(
    rows: Vec<ControlRow>,
    frames: &[FrameRecord],
    origin: TimeOrigin,
) -> BTreeMap<usize, MetadataEntry> {
    let mut seeded = BTreeMap::new();
    let mut dropped = 0_usize;

    for (position, row) in rows.into_iter().enumerate() {
        let frame_index = row
            .timestamp
            .and_then(|raw| origin.seconds(&raw).ok())
            .map_or(position, |seconds| nearest_frame(frames, seconds));
        if frame_index >= frames.len() {
            dropped += 1;
            continue;
        }
        seeded.insert(
            frame_index,
            MetadataEntry {
                frame_index,
                fields: row.fields,
            },
        );
    }

    if dropped > 0 {
        warn!(dropped, "control-log rows past the last frame were ignored");
    }
    seeded
}

/// Index of the frame closest to `seconds`; the earlier frame wins a tie.
fn nearest_frame(frames: &[FrameRecord], seconds: f64) -> usize {
    let idx = frames.partition_point(|f| f.timestamp < seconds);
    if idx == 0 {
        return 0;
    }
    if idx == frames.len() {
        return idx - 1;
    }
    if seconds - frames[idx - 1].timestamp <= frames[idx].timestamp - seconds {
        idx - 1
    } else {
        idx
    }
}

/// Lowercases a column name and drops spaces and underscores.
pub(crate) fn normalized_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;

    use super::*;
    use crate::video::tests::FixedProbe;

    const OPTIONS: ImportOptions = ImportOptions { fallback_fps: 10.0 };

    /// Writes a small wall-clock dataset using the conventional names.
    pub(crate) fn write_dataset(dir: &Path) {
        fs::write(dir.join(VIDEO_FILE), b"not really a video").unwrap();
        fs::write(
            dir.join(FRAME_TIMES_FILE),
            "FILE_START\n\
             20200101_000000.000000\n\
             20200101_000000.033000\n\
             20200101_000000.066000\n",
        )
        .unwrap();
        fs::write(
            dir.join(SPECTRA_FILE),
            "FILE_START\n\
             KecmTimestamp,IntegrationTime,510,500\n\
             20200101_000000.010000,50,2,1\n\
             20200101_000000.050000,50,4,3\n\
             FILE_END\n",
        )
        .unwrap();
        fs::write(dir.join(CONTROLS_FILE), "laser=on,gain=2\n").unwrap();
    }

    #[test]
    fn discover_lists_all_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VIDEO_FILE), b"").unwrap();

        let err = DatasetPaths::discover(dir.path()).unwrap_err().to_string();
        assert!(err.contains(FRAME_TIMES_FILE));
        assert!(err.contains(SPECTRA_FILE));
        assert!(err.contains(CONTROLS_FILE));
        assert!(!err.contains(VIDEO_FILE));
    }

    #[test]
    fn discover_finds_optional_dark_reference() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());

        let paths = DatasetPaths::discover(dir.path()).unwrap();
        assert!(paths.dark_reference.is_none());
        assert_eq!(paths.name(), VIDEO_FILE);

        fs::write(dir.path().join(DARK_REFERENCE_FILE), "IntegrationTime,500\n").unwrap();
        let paths = DatasetPaths::discover(dir.path()).unwrap();
        assert!(paths.dark_reference.is_some());
    }

    #[test]
    fn loads_wall_clock_dataset_on_common_origin() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let paths = DatasetPaths::discover(dir.path()).unwrap();
        let probe = FixedProbe::new(3, 30.0);

        let session = load_session(&paths, &probe, OPTIONS).unwrap();

        assert_eq!(probe.calls.lock().unwrap().as_slice(), [paths.video.clone()]);
        let frame_ts: Vec<f64> = session.frames().iter().map(|f| f.timestamp).collect();
        assert!((frame_ts[0]).abs() < 1e-9);
        assert!((frame_ts[2] - 0.066).abs() < 1e-9);
        assert!((session.spectra()[0].timestamp - 0.01).abs() < 1e-9);
        assert_eq!(session.spectra()[1].values, vec![3.0, 4.0]);
        assert_eq!(session.wavelengths().labels, vec!["500", "510"]);
        assert_eq!(session.template().get("laser").map(String::as_str), Some("on"));
        assert_eq!(session.frames()[1].label, "20200101_000000.033000");
    }

    #[test]
    fn truncates_frame_times_to_video_length() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let paths = DatasetPaths::discover(dir.path()).unwrap();

        let session = load_session(&paths, &FixedProbe::new(2, 30.0), OPTIONS).unwrap();
        assert_eq!(session.frames().len(), 2);
    }

    #[test]
    fn probe_failure_trusts_frame_times() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let paths = DatasetPaths::discover(dir.path()).unwrap();

        let session = load_session(&paths, &FixedProbe::failing(), OPTIONS).unwrap();
        assert_eq!(session.frames().len(), 3);
    }

    #[test]
    fn frame_times_derived_from_rate() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        let spectra = dir.path().join("spectra.csv");
        fs::write(&video, b"").unwrap();
        fs::write(&spectra, "timestamp,500\n0.0,1\n0.25,2\n").unwrap();
        let paths = DatasetPaths {
            video,
            spectra,
            frame_times: None,
            controls: None,
            dark_reference: None,
        };

        let session = load_session(&paths, &FixedProbe::new(5, 4.0), OPTIONS).unwrap();
        assert_eq!(session.frames().len(), 5);
        assert!((session.frames()[4].timestamp - 1.0).abs() < 1e-9);

        let session = load_session(&paths, &FixedProbe::new(3, 0.0), OPTIONS).unwrap();
        assert!((session.frames()[2].timestamp - 0.2).abs() < 1e-9);

        let err = load_session(&paths, &FixedProbe::failing(), OPTIONS).unwrap_err();
        assert!(err.to_string().contains("could not be probed"));
    }

    #[test]
    fn wall_clock_spectra_need_frame_times() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let paths = DatasetPaths {
            frame_times: None,
            ..DatasetPaths::discover(dir.path()).unwrap()
        };

        let err = load_session(&paths, &FixedProbe::new(3, 30.0), OPTIONS).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::Validation(_))
        ));
    }

    #[test]
    fn missing_video_fails_before_probing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths {
            video: dir.path().join(VIDEO_FILE),
            spectra: dir.path().join(SPECTRA_FILE),
            frame_times: None,
            controls: None,
            dark_reference: None,
        };
        let probe = FixedProbe::new(1, 1.0);

        let err = load_session(&paths, &probe, OPTIONS).unwrap_err();
        assert!(err.to_string().contains("video file not found"));
        assert!(probe.calls.lock().unwrap().is_empty());
    }

    fn seconds_dataset(dir: &Path, spectra: &str, controls: &str) -> DatasetPaths {
        let paths = DatasetPaths {
            video: dir.join(VIDEO_FILE),
            spectra: dir.join(SPECTRA_FILE),
            frame_times: Some(dir.join(FRAME_TIMES_FILE)),
            controls: Some(dir.join(CONTROLS_FILE)),
            dark_reference: None,
        };
        fs::write(&paths.video, b"").unwrap();
        fs::write(dir.join(FRAME_TIMES_FILE), "0.0\n0.033\n0.066\n").unwrap();
        fs::write(&paths.spectra, spectra).unwrap();
        fs::write(dir.join(CONTROLS_FILE), controls).unwrap();
        paths
    }

    #[test]
    fn control_rows_seed_nearest_frames() {
        let dir = tempfile::tempdir().unwrap();
        let paths = seconds_dataset(
            dir.path(),
            "timestamp,500\n0.0,1\n",
            "timestamp,laser\n0.0,off\n0.035,on\n0.07,on\n",
        );

        let session = load_session(&paths, &FixedProbe::new(3, 30.0), OPTIONS).unwrap();
        let laser: Vec<(usize, &str)> = session
            .metadata()
            .values()
            .map(|e| (e.frame_index, e.fields["laser"].as_str()))
            .collect();
        assert_eq!(laser, vec![(0, "off"), (1, "on"), (2, "on")]);
        assert_eq!(session.template()["laser"], "off");
    }

    #[test]
    fn untimed_control_rows_seed_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let paths = seconds_dataset(
            dir.path(),
            "timestamp,500\n0.0,1\n",
            "laser,gain\noff,1\non,2\non,3\non,4\n",
        );

        let session = load_session(&paths, &FixedProbe::new(3, 30.0), OPTIONS).unwrap();
        assert_eq!(session.metadata().len(), 3);
        assert_eq!(session.metadata()[&2].fields["gain"], "3");
    }

    #[test]
    fn unordered_spectra_are_sorted_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let paths = seconds_dataset(
            dir.path(),
            "timestamp,500\n0.05,3\n0.01,1\n0.05,4\n0.03,2\n",
            "laser=on\n",
        );

        let session = load_session(&paths, &FixedProbe::new(3, 30.0), OPTIONS).unwrap();
        let values: Vec<f64> = session.spectra().iter().map(|s| s.values[0]).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert!(session.metadata().is_empty());
    }

    #[test]
    fn nearest_frame_prefers_earlier_on_tie() {
        let frames = crate::session::tests::frames_at(&[0.0, 1.0, 2.0]);
        assert_eq!(nearest_frame(&frames, -5.0), 0);
        assert_eq!(nearest_frame(&frames, 0.5), 0);
        assert_eq!(nearest_frame(&frames, 0.6), 1);
        assert_eq!(nearest_frame(&frames, 9.0), 2);
    }

    #[test]
    fn normalizes_column_names() {
        assert_eq!(normalized_name("Integration Time"), "integrationtime");
        assert_eq!(normalized_name("KECM_Timestamp"), "kecmtimestamp");
    }
}
