// SPDX-License-Identifier: MIT
use std::collections::BTreeMap;

use crate::spectrum::DarkReference;
use crate::sync::SyncError;

/// User-authored metadata fields of one frame, ordered by field name.
pub type Fields = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq)]
pub struct FrameRecord {
    pub frame_index: usize,
    /// Seconds since the first video frame.
    pub timestamp: f64,
    /// Timestamp as it appeared in the source file.
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpectralSample {
    /// Seconds since the first video frame.
    pub timestamp: f64,
    /// Intensities, one per wavelength of the session axis.
    pub values: Vec<f64>,
    pub integration_time: Option<f64>,
    pub label: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataEntry {
    pub frame_index: usize,
    pub fields: Fields,
}

impl MetadataEntry {
    #[must_use]
    pub fn empty(frame_index: usize) -> Self {
        Self {
            frame_index,
            fields: Fields::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Wavelength columns of the spectral file, sorted ascending.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WavelengthAxis {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl WavelengthAxis {
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One imported dataset: frames, spectra and the metadata edited on top of
/// them. All timestamps share the first video frame as their origin.
#[derive(Clone, Debug)]
pub struct Session {
    frames: Vec<FrameRecord>,
    spectra: Vec<SpectralSample>,
    wavelengths: WavelengthAxis,
    metadata: BTreeMap<usize, MetadataEntry>,
    template: Fields,
    dark_reference: DarkReference,
}

impl Session {
    /// Builds a session from already time-aligned frames and spectra.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] if either sequence is empty, frame
    /// indices are not `0..n`, timestamps are not finite and strictly
    /// increasing, or a sample's value count differs from the axis length.
    pub fn new(
        frames: Vec<FrameRecord>,
        spectra: Vec<SpectralSample>,
        wavelengths: WavelengthAxis,
    ) -> Result<Self, SyncError> {
        if frames.is_empty() {
            return Err(SyncError::Validation("dataset has no frames".to_string()));
        }
        if spectra.is_empty() {
            return Err(SyncError::Validation(
                "dataset has no spectral samples".to_string(),
            ));
        }
        if wavelengths.labels.len() != wavelengths.values.len() {
            return Err(SyncError::Validation(format!(
                "wavelength axis has {} labels but {} values",
                wavelengths.labels.len(),
                wavelengths.values.len()
            )));
        }

        for (position, frame) in frames.iter().enumerate() {
            if frame.frame_index != position {
                return Err(SyncError::Validation(format!(
                    "frame at position {position} has index {}",
                    frame.frame_index
                )));
            }
        }
        check_increasing(frames.iter().map(|f| f.timestamp), "frame")?;
        check_increasing(spectra.iter().map(|s| s.timestamp), "spectral")?;

        if let Some((row, sample)) = spectra
            .iter()
            .enumerate()
            .find(|(_, s)| s.values.len() != wavelengths.len())
        {
            return Err(SyncError::Validation(format!(
                "spectral sample {row} has {} values, expected {}",
                sample.values.len(),
                wavelengths.len()
            )));
        }

        Ok(Self {
            frames,
            spectra,
            wavelengths,
            metadata: BTreeMap::new(),
            template: Fields::new(),
            dark_reference: DarkReference::default(),
        })
    }

    /// Field names and defaults offered by the metadata editor.
    #[must_use]
    pub fn with_template(mut self, template: Fields) -> Self {
        self.template = template;
        self
    }

    /// Seeds per-frame metadata, such as control-log rows. Entries for
    /// frames outside the session are dropped.
    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<usize, MetadataEntry>) -> Self {
        let count = self.frames.len();
        self.metadata = metadata
            .into_iter()
            .filter(|(index, entry)| *index < count && entry.frame_index == *index)
            .collect();
        self
    }

    #[must_use]
    pub fn with_dark_reference(mut self, dark_reference: DarkReference) -> Self {
        self.dark_reference = dark_reference;
        self
    }

    #[must_use]
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    #[must_use]
    pub fn spectra(&self) -> &[SpectralSample] {
        &self.spectra
    }

    #[must_use]
    pub fn wavelengths(&self) -> &WavelengthAxis {
        &self.wavelengths
    }

    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<usize, MetadataEntry> {
        &self.metadata
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut BTreeMap<usize, MetadataEntry> {
        &mut self.metadata
    }

    #[must_use]
    pub fn template(&self) -> &Fields {
        &self.template
    }

    #[must_use]
    pub fn dark_reference(&self) -> &DarkReference {
        &self.dark_reference
    }
}

fn check_increasing(timestamps: impl Iterator<Item = f64>, what: &str) -> Result<(), SyncError> {
    let mut previous: Option<f64> = None;
    for (row, ts) in timestamps.enumerate() {
        if !ts.is_finite() {
            return Err(SyncError::Validation(format!(
                "{what} timestamp at row {row} is not finite"
            )));
        }
        if let Some(prev) = previous
            && ts <= prev
        {
            return Err(SyncError::Validation(format!(
                "{what} timestamps must be strictly increasing (row {row}: {ts} after {prev})"
            )));
        }
        previous = Some(ts);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn frames_at(timestamps: &[f64]) -> Vec<FrameRecord> {
        timestamps
            .iter()
            .enumerate()
            .map(|(frame_index, &timestamp)| FrameRecord {
                frame_index,
                timestamp,
                label: format!("{timestamp}"),
            })
            .collect()
    }

    pub(crate) fn spectra_at(timestamps: &[f64]) -> Vec<SpectralSample> {
        timestamps
            .iter()
            .enumerate()
            .map(|(row, &timestamp)| {
                #[allow(clippy::cast_precision_loss)]
                let base = row as f64;
                SpectralSample {
                    timestamp,
                    values: vec![base, base * 10.0],
                    integration_time: None,
                    label: format!("{timestamp}"),
                }
            })
            .collect()
    }

    pub(crate) fn two_band_axis() -> WavelengthAxis {
        WavelengthAxis {
            labels: vec!["500".to_string(), "600".to_string()],
            values: vec![500.0, 600.0],
        }
    }

    pub(crate) fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    pub(crate) fn make_session(frames: &[f64], spectra: &[f64]) -> Session {
        Session::new(frames_at(frames), spectra_at(spectra), two_band_axis()).unwrap()
    }

    fn validation_message(result: Result<Session, SyncError>) -> String {
        match result {
            Err(SyncError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_well_formed_dataset() {
        let session = make_session(&[0.0, 0.033, 0.066], &[0.01, 0.05]);
        assert_eq!(session.frames().len(), 3);
        assert_eq!(session.spectra().len(), 2);
        assert!(session.metadata().is_empty());
        assert!(session.template().is_empty());
    }

    #[test]
    fn seeded_metadata_stays_in_range() {
        let seeded: BTreeMap<usize, MetadataEntry> = [0, 1, 7]
            .into_iter()
            .map(|i| {
                let entry = MetadataEntry {
                    frame_index: i,
                    fields: fields(&[("laser", "on")]),
                };
                (i, entry)
            })
            .collect();

        let session = make_session(&[0.0, 0.5], &[0.0]).with_metadata(seeded);
        assert_eq!(session.metadata().keys().copied().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn rejects_empty_sequences() {
        let msg = validation_message(Session::new(
            Vec::new(),
            spectra_at(&[0.0]),
            two_band_axis(),
        ));
        assert!(msg.contains("no frames"));

        let msg = validation_message(Session::new(
            frames_at(&[0.0]),
            Vec::new(),
            two_band_axis(),
        ));
        assert!(msg.contains("no spectral samples"));
    }

    #[test]
    fn rejects_unsorted_timestamps() {
        let msg = validation_message(Session::new(
            frames_at(&[0.0, 0.5, 0.5]),
            spectra_at(&[0.0]),
            two_band_axis(),
        ));
        assert!(msg.contains("frame timestamps must be strictly increasing"));

        let msg = validation_message(Session::new(
            frames_at(&[0.0]),
            spectra_at(&[1.0, 0.5]),
            two_band_axis(),
        ));
        assert!(msg.contains("spectral timestamps"));
    }

    #[test]
    fn rejects_non_finite_timestamp() {
        let msg = validation_message(Session::new(
            frames_at(&[0.0, f64::NAN]),
            spectra_at(&[0.0]),
            two_band_axis(),
        ));
        assert!(msg.contains("not finite"));
    }

    #[test]
    fn rejects_gapped_frame_indices() {
        let mut frames = frames_at(&[0.0, 1.0]);
        frames[1].frame_index = 5;
        let msg = validation_message(Session::new(frames, spectra_at(&[0.0]), two_band_axis()));
        assert!(msg.contains("position 1 has index 5"));
    }

    #[test]
    fn rejects_value_count_mismatch() {
        let mut spectra = spectra_at(&[0.0, 1.0]);
        spectra[1].values.push(3.0);
        let msg = validation_message(Session::new(frames_at(&[0.0]), spectra, two_band_axis()));
        assert!(msg.contains("sample 1 has 3 values, expected 2"));
    }
}
