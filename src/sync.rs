// SPDX-License-Identifier: MIT
use std::collections::BTreeSet;

use thiserror::Error;

use crate::session::{Fields, FrameRecord, MetadataEntry, Session, SpectralSample};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("frame index {index} is out of range (dataset has {count} frames)")]
    FrameOutOfRange { index: usize, count: usize },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// One joined export row: a frame, its nearest spectrum and its metadata
/// with control-log defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow<'a> {
    pub frame_index: usize,
    pub timestamp: f64,
    pub spectrum: &'a SpectralSample,
    pub fields: Fields,
}

/// Query and edit layer over a loaded [`Session`].
///
/// The synchronizer owns the session for its whole lifetime; a re-import
/// builds a new session and replaces the synchronizer wholesale.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    session: Session,
}

impl Synchronizer {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.session.frames().len()
    }

    /// # Errors
    ///
    /// Returns [`SyncError::FrameOutOfRange`] for an unknown frame index.
    pub fn frame(&self, frame_index: usize) -> Result<&FrameRecord, SyncError> {
        self.session
            .frames()
            .get(frame_index)
            .ok_or(SyncError::FrameOutOfRange {
                index: frame_index,
                count: self.frame_count(),
            })
    }

    /// Returns the spectral sample closest in time to the given frame.
    /// Equidistant samples resolve to the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::FrameOutOfRange`] for an unknown frame index.
    pub fn nearest_spectrum(&self, frame_index: usize) -> Result<&SpectralSample, SyncError> {
        let frame = self.frame(frame_index)?;
        Ok(self.nearest_to(frame.timestamp))
    }

    fn nearest_to(&self, timestamp: f64) -> &SpectralSample {
        // Session guarantees a non-empty, strictly increasing sequence.
        let spectra = self.session.spectra();
        let idx = spectra.partition_point(|s| s.timestamp < timestamp);

        if idx == 0 {
            return &spectra[0];
        }
        if idx == spectra.len() {
            return &spectra[idx - 1];
        }

        let before = &spectra[idx - 1];
        let after = &spectra[idx];
        if timestamp - before.timestamp <= after.timestamp - timestamp {
            before
        } else {
            after
        }
    }

    /// Returns the metadata of a frame, or an empty entry when none was set.
    #[must_use]
    pub fn metadata_for(&self, frame_index: usize) -> MetadataEntry {
        self.session
            .metadata()
            .get(&frame_index)
            .cloned()
            .unwrap_or_else(|| MetadataEntry::empty(frame_index))
    }

    /// Control-log template overlaid with the frame's stored fields. This is
    /// what the viewer shows and what an export writes.
    #[must_use]
    pub fn resolved_fields(&self, frame_index: usize) -> Fields {
        let mut fields = self.session.template().clone();
        if let Some(entry) = self.session.metadata().get(&frame_index) {
            fields.extend(entry.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        fields
    }

    /// Inserts or replaces the metadata entry of a frame.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] if the frame index is unknown.
    pub fn set_metadata(&mut self, frame_index: usize, fields: Fields) -> Result<(), SyncError> {
        self.check_writable(frame_index)?;
        self.session.metadata_mut().insert(
            frame_index,
            MetadataEntry {
                frame_index,
                fields,
            },
        );
        Ok(())
    }

    /// Drops the metadata entry of a frame, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] if the frame index is unknown.
    pub fn clear_metadata(&mut self, frame_index: usize) -> Result<(), SyncError> {
        self.check_writable(frame_index)?;
        self.session.metadata_mut().remove(&frame_index);
        Ok(())
    }

    fn check_writable(&self, frame_index: usize) -> Result<(), SyncError> {
        if frame_index >= self.frame_count() {
            return Err(SyncError::Validation(format!(
                "cannot edit metadata of frame {frame_index}: dataset has {} frames",
                self.frame_count()
            )));
        }
        Ok(())
    }

    /// Smallest frame index whose timestamp is at or after the first spectral
    /// sample.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] when spectral data starts after the
    /// last frame.
    pub fn first_spectral_frame(&self) -> Result<usize, SyncError> {
        let first = self.session.spectra()[0].timestamp;
        let frames = self.session.frames();
        let idx = frames.partition_point(|f| f.timestamp < first);

        frames.get(idx).map(|f| f.frame_index).ok_or_else(|| {
            SyncError::NotFound(format!(
                "no frame at or after the first spectral sample ({first:.6}s)"
            ))
        })
    }

    /// Sorted union of every metadata field name in use, including the
    /// control-log template.
    #[must_use]
    pub fn metadata_columns(&self) -> Vec<String> {
        let mut columns: BTreeSet<&str> = self
            .session
            .template()
            .keys()
            .map(String::as_str)
            .collect();
        for entry in self.session.metadata().values() {
            columns.extend(entry.fields.keys().map(String::as_str));
        }
        columns.into_iter().map(str::to_string).collect()
    }

    /// Yields one row per frame in ascending frame order. Every call starts
    /// a fresh pass over the session.
    pub fn export_rows(&self) -> impl Iterator<Item = ExportRow<'_>> + '_ {
        self.session.frames().iter().map(move |frame| ExportRow {
            frame_index: frame.frame_index,
            timestamp: frame.timestamp,
            spectrum: self.nearest_to(frame.timestamp),
            fields: self.resolved_fields(frame.frame_index),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{fields, make_session};

    fn example() -> Synchronizer {
        Synchronizer::new(make_session(&[0.0, 0.033, 0.066], &[0.01, 0.05]))
    }

    #[test]
    fn nearest_spectrum_matches_example() {
        let sync = example();
        assert!((sync.nearest_spectrum(0).unwrap().timestamp - 0.01).abs() < f64::EPSILON);
        assert!((sync.nearest_spectrum(1).unwrap().timestamp - 0.05).abs() < f64::EPSILON);
        assert!((sync.nearest_spectrum(2).unwrap().timestamp - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn nearest_spectrum_prefers_earlier_on_tie() {
        let sync = Synchronizer::new(make_session(&[0.0, 1.0, 2.0], &[0.5, 1.5]));
        assert!((sync.nearest_spectrum(1).unwrap().timestamp - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn nearest_spectrum_exact_hit() {
        let sync = Synchronizer::new(make_session(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0]));
        for i in 0..3 {
            let sample = sync.nearest_spectrum(i).unwrap();
            assert!((sample.timestamp - sync.frame(i).unwrap().timestamp).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn nearest_spectrum_minimizes_distance() {
        let frames: Vec<f64> = (0..50).map(|i| f64::from(i) * 0.037).collect();
        let spectra: Vec<f64> = (0..17).map(|i| 0.011 + f64::from(i) * 0.101).collect();
        let sync = Synchronizer::new(make_session(&frames, &spectra));

        for (i, &t) in frames.iter().enumerate() {
            let chosen = sync.nearest_spectrum(i).unwrap().timestamp;
            let best = spectra
                .iter()
                .map(|s| (s - t).abs())
                .fold(f64::INFINITY, f64::min);
            assert!(((chosen - t).abs() - best).abs() < 1e-12, "frame {i}");
        }
    }

    #[test]
    fn nearest_spectrum_clamps_to_ends() {
        let sync = Synchronizer::new(make_session(&[0.0, 10.0], &[2.0, 3.0]));
        assert!((sync.nearest_spectrum(0).unwrap().timestamp - 2.0).abs() < f64::EPSILON);
        assert!((sync.nearest_spectrum(1).unwrap().timestamp - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_frame_fails() {
        let mut sync = example();
        assert_eq!(
            sync.nearest_spectrum(3).unwrap_err(),
            SyncError::FrameOutOfRange { index: 3, count: 3 }
        );
        assert!(matches!(
            sync.set_metadata(3, Fields::new()),
            Err(SyncError::Validation(_))
        ));
        assert!(matches!(
            sync.clear_metadata(usize::MAX),
            Err(SyncError::Validation(_))
        ));
    }

    #[test]
    fn set_metadata_out_of_range_example() {
        let mut sync = example();
        let err = sync
            .set_metadata(99, fields(&[("note", "flare")]))
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(sync.session().metadata().is_empty());
    }

    #[test]
    fn metadata_round_trip() {
        let mut sync = example();
        sync.set_metadata(1, fields(&[("note", "flare")])).unwrap();

        let entry = sync.metadata_for(1);
        assert_eq!(entry.frame_index, 1);
        assert_eq!(entry.fields, fields(&[("note", "flare")]));

        let empty = sync.metadata_for(0);
        assert_eq!(empty, MetadataEntry::empty(0));
        assert!(sync.metadata_for(1000).is_empty());
    }

    #[test]
    fn set_metadata_replaces_entry() {
        let mut sync = example();
        sync.set_metadata(2, fields(&[("a", "1"), ("b", "2")])).unwrap();
        sync.set_metadata(2, fields(&[("c", "3")])).unwrap();
        assert_eq!(sync.metadata_for(2).fields, fields(&[("c", "3")]));

        sync.clear_metadata(2).unwrap();
        assert!(sync.metadata_for(2).is_empty());
    }

    #[test]
    fn first_spectral_frame_example() {
        assert_eq!(example().first_spectral_frame().unwrap(), 1);
    }

    #[test]
    fn first_spectral_frame_inclusive() {
        let sync = Synchronizer::new(make_session(&[0.0, 0.5, 1.0], &[0.5, 0.9]));
        assert_eq!(sync.first_spectral_frame().unwrap(), 1);

        let sync = Synchronizer::new(make_session(&[0.2, 0.5], &[0.0, 0.9]));
        assert_eq!(sync.first_spectral_frame().unwrap(), 0);
    }

    #[test]
    fn first_spectral_frame_not_found() {
        let sync = Synchronizer::new(make_session(&[0.0, 0.5], &[2.0]));
        assert!(matches!(
            sync.first_spectral_frame(),
            Err(SyncError::NotFound(_))
        ));
    }

    #[test]
    fn export_rows_join_every_frame() {
        let mut sync = example();
        sync.set_metadata(1, fields(&[("note", "flare")])).unwrap();

        let rows: Vec<ExportRow<'_>> = sync.export_rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter().map(|r| r.frame_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!((rows[0].spectrum.timestamp - 0.01).abs() < f64::EPSILON);
        assert!(rows[0].fields.is_empty());
        assert_eq!(rows[1].fields.get("note").map(String::as_str), Some("flare"));
        assert!((rows[2].timestamp - 0.066).abs() < f64::EPSILON);
    }

    #[test]
    fn export_rows_fill_template_defaults() {
        let session = make_session(&[0.0, 0.033, 0.066], &[0.01, 0.05])
            .with_template(fields(&[("gain", "2"), ("laser", "on")]));
        let mut sync = Synchronizer::new(session);
        sync.set_metadata(1, fields(&[("laser", "off"), ("note", "flare")]))
            .unwrap();

        let rows: Vec<ExportRow<'_>> = sync.export_rows().collect();
        assert_eq!(rows[0].fields, fields(&[("gain", "2"), ("laser", "on")]));
        assert_eq!(
            rows[1].fields,
            fields(&[("gain", "2"), ("laser", "off"), ("note", "flare")])
        );
        assert_eq!(rows[2].fields, sync.resolved_fields(2));
        assert!(sync.metadata_for(0).is_empty());
    }

    #[test]
    fn export_rows_restartable() {
        let mut sync = example();
        sync.set_metadata(0, fields(&[("x", "y")])).unwrap();

        let first: Vec<ExportRow<'_>> = sync.export_rows().collect();
        let second: Vec<ExportRow<'_>> = sync.export_rows().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn metadata_columns_union_sorted() {
        let session = make_session(&[0.0, 1.0], &[0.0])
            .with_template(fields(&[("laser", "on"), ("gain", "1")]));
        let mut sync = Synchronizer::new(session);
        sync.set_metadata(0, fields(&[("note", "x"), ("gain", "2")]))
            .unwrap();
        assert_eq!(sync.metadata_columns(), vec!["gain", "laser", "note"]);
    }
}
