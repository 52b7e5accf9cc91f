// SPDX-License-Identifier: MIT
use std::path::PathBuf;
use std::time::Instant;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::{info, warn};

use super::editor::{FieldRow, MetadataEditor, Submission, field_rows};
use super::input::Action;
use super::layout::{PanelKind, PanelState, build_layout};
use super::panels::{frame_info, header, metadata_table, spectrum_plot};
use super::playback_bar::{self, PlaybackControls};
use super::theme::{COLLAPSED_MARKER, SELECTED_MARKER, Theme};
use crate::export::export_to_path;
use crate::import::{DatasetPaths, Importer};
use crate::playback::FramePacer;
use crate::spectrum::{display_values, matching_dark};
use crate::sync::Synchronizer;

const PLAYBACK_BAR_HEIGHT: u16 = 4;

/// Viewer options taken from the configuration and command line.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSettings {
    pub smoothing_taps: usize,
    pub output_path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

pub struct App {
    pub panels: Vec<PanelState>,
    pub selected_panel: usize,
    pub should_quit: bool,
    pub theme: Theme,
    sync: Synchronizer,
    paths: DatasetPaths,
    importer: Importer,
    settings: ViewSettings,
    controls: PlaybackControls,
    pacer: FramePacer,
    editor: MetadataEditor,
    status: Status,
}

fn frame_timestamps(sync: &Synchronizer) -> Vec<f64> {
    sync.session().frames().iter().map(|f| f.timestamp).collect()
}

impl App {
    #[must_use]
    pub fn new(
        sync: Synchronizer,
        paths: DatasetPaths,
        importer: Importer,
        settings: ViewSettings,
    ) -> Self {
        let panels = vec![
            PanelState::new(PanelKind::Frame, "Frame", 8),
            PanelState::new(PanelKind::Spectrum, "Spectrum", 12),
            PanelState::new(PanelKind::Metadata, "Metadata", 6),
        ];

        let status = Status::Info(format!(
            "Loaded {} frames and {} spectra",
            sync.frame_count(),
            sync.session().spectra().len()
        ));

        Self {
            panels,
            selected_panel: 0,
            should_quit: false,
            theme: Theme::default(),
            controls: PlaybackControls::new(sync.frame_count()),
            pacer: FramePacer::new(frame_timestamps(&sync)),
            sync,
            paths,
            importer,
            settings,
            editor: MetadataEditor::new(),
            status,
        }
    }

    #[must_use]
    pub fn current_frame(&self) -> usize {
        self.controls.current_frame
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.editor.is_editing()
    }

    fn set_info(&mut self, message: String) {
        info!("{message}");
        self.status = Status::Info(message);
    }

    fn set_error(&mut self, message: String) {
        warn!("{message}");
        self.status = Status::Error(message);
    }

    /// Metadata rows of the current frame, template defaults included.
    #[must_use]
    pub fn field_rows(&self) -> Vec<FieldRow> {
        let entry = self.sync.metadata_for(self.current_frame());
        field_rows(self.sync.session().template(), &entry.fields)
    }

    /// Brings the pacer in line with the transport controls, then advances
    /// playback if the next frame is due.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        self.pacer.set_speed(self.controls.speed);
        if self.controls.paused != self.pacer.is_paused() {
            self.pacer.toggle_pause();
        }
        if self.controls.current_frame != self.pacer.current_index() {
            self.pacer.seek_to(self.controls.current_frame);
        }

        if let Some(index) = self.pacer.next_frame_at(now) {
            self.controls.update_position(index);
        }
        if !self.controls.paused && self.pacer.is_finished() {
            self.controls.paused = true;
        }
    }

    pub fn handle_action(&mut self, action: &Action) {
        match *action {
            Action::Quit => self.should_quit = true,
            Action::PanelUp => {
                if self.selected_panel > 0 {
                    self.selected_panel -= 1;
                }
            }
            Action::PanelDown => {
                if self.selected_panel + 1 < self.panels.len() {
                    self.selected_panel += 1;
                }
            }
            Action::ToggleCollapse => {
                if let Some(panel) = self.panels.get_mut(self.selected_panel) {
                    panel.collapsed = !panel.collapsed;
                }
            }
            Action::TogglePause => self.controls.toggle_pause(),
            Action::StepForward => {
                self.controls.step_forward();
                self.controls.paused = true;
            }
            Action::StepBackward => {
                self.controls.step_backward();
                self.controls.paused = true;
            }
            Action::SpeedUp => self.controls.speed_up(),
            Action::SpeedDown => self.controls.speed_down(),
            Action::JumpStart => self.controls.jump_start(),
            Action::JumpEnd => self.controls.jump_end(),
            Action::JumpFirstSpectral => self.jump_first_spectral(),
            Action::Export => self.export(),
            Action::Reload => self.reload(),
            Action::NextField => self.editor.select_next(self.field_rows().len()),
            Action::EditField => self.begin_edit(),
            Action::AddField => {
                self.controls.paused = true;
                self.editor.begin_new();
            }
            Action::DeleteField => self.delete_field(),
            Action::Input(c) => self.editor.push(c),
            Action::Backspace => self.editor.backspace(),
            Action::Commit => self.commit_edit(),
            Action::Cancel => {
                self.editor.cancel();
                self.status = Status::Info("Edit cancelled".to_string());
            }
            Action::None => {}
        }
    }

    fn jump_first_spectral(&mut self) {
        match self.sync.first_spectral_frame() {
            Ok(index) => {
                self.controls.jump_to(index);
                self.controls.paused = true;
                self.set_info(format!("Jumped to first spectral frame {index}"));
            }
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn export(&mut self) {
        let path = self.settings.output_path.clone();
        match export_to_path(&self.sync, &path) {
            Ok(rows) => self.set_info(format!("Exported {rows} rows to {}", path.display())),
            Err(err) => self.set_error(format!("{err:#}")),
        }
    }

    /// Re-imports the dataset. On failure the loaded session stays as is.
    fn reload(&mut self) {
        match self.importer.load(&self.paths) {
            Ok(session) => {
                let position = self.controls.current_frame;
                self.sync = Synchronizer::new(session);
                self.controls = PlaybackControls::new(self.sync.frame_count());
                self.controls.jump_to(position);
                self.pacer = FramePacer::new(frame_timestamps(&self.sync));
                self.editor.reset();
                self.set_info(format!("Reloaded {}", self.paths.name()));
            }
            Err(err) => self.set_error(format!("Reload failed: {err:#}")),
        }
    }

    fn begin_edit(&mut self) {
        let rows = self.field_rows();
        match self.editor.selected(rows.len()) {
            Some(i) => {
                self.controls.paused = true;
                self.editor.begin_edit(&rows[i].value);
            }
            None => self.set_error("No fields to edit; press a to add one".to_string()),
        }
    }

    fn commit_edit(&mut self) {
        let frame = self.current_frame();
        let rows = self.field_rows();
        let selected = self.editor.selected(rows.len());

        let (name, value) = match self.editor.submit() {
            Ok(Submission::Value(value)) => match selected {
                Some(i) => (rows[i].name.clone(), value),
                None => return self.set_error("No field selected".to_string()),
            },
            Ok(Submission::NewField { name, value }) => (name, value),
            Err(message) => return self.set_error(message),
        };

        let mut fields = self.sync.metadata_for(frame).fields;
        fields.insert(name.clone(), value);
        match self.sync.set_metadata(frame, fields) {
            Ok(()) => self.set_info(format!("Set {name} on frame {frame}")),
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn delete_field(&mut self) {
        let frame = self.current_frame();
        let rows = self.field_rows();
        let Some(row) = self.editor.selected(rows.len()).map(|i| &rows[i]) else {
            return self.set_error("No field selected".to_string());
        };
        if row.is_default {
            let message = format!("{} is a control-log default and is not stored", row.name);
            return self.set_error(message);
        }

        let name = row.name.clone();
        let mut entry = self.sync.metadata_for(frame);
        entry.fields.remove(&name);
        let result = if entry.is_empty() {
            self.sync.clear_metadata(frame)
        } else {
            self.sync.set_metadata(frame, entry.fields)
        };
        match result {
            Ok(()) => self.set_info(format!("Removed {name} from frame {frame}")),
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn render_panel(&self, frame: &mut ratatui::Frame, kind: PanelKind, area: Rect) {
        let index = self.current_frame();
        let Ok(record) = self.sync.frame(index) else {
            frame.render_widget(Paragraph::new("No frame loaded"), area);
            return;
        };
        let session = self.sync.session();
        let nearest = self.sync.nearest_spectrum(index);

        match kind {
            PanelKind::Frame => {
                let dark_applied = nearest
                    .as_ref()
                    .is_ok_and(|s| matching_dark(s, session.dark_reference()).is_some());
                frame_info::render(
                    frame,
                    area,
                    record,
                    self.sync.frame_count(),
                    &nearest,
                    dark_applied,
                    &self.theme,
                );
            }
            PanelKind::Spectrum => match nearest {
                Ok(sample) => {
                    let values = display_values(
                        sample,
                        session.dark_reference(),
                        self.settings.smoothing_taps,
                    );
                    spectrum_plot::render(frame, area, session.wavelengths(), &values, &self.theme);
                }
                Err(err) => {
                    let line = Line::from(Span::styled(err.to_string(), self.theme.status_error));
                    frame.render_widget(Paragraph::new(line), area);
                }
            },
            PanelKind::Metadata => {
                metadata_table::render(frame, area, &self.field_rows(), &self.editor, &self.theme);
            }
        }
    }

    pub fn render(&self, frame: &mut ratatui::Frame) {
        let outer = frame.area();
        if outer.height < 3 || outer.width < 5 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(PLAYBACK_BAR_HEIGHT),
                Constraint::Length(1),
            ])
            .split(outer);

        let session = self.sync.session();
        let dataset = self.paths.name();
        header::render(
            frame,
            vertical[0],
            &header::HeaderInfo {
                dataset: &dataset,
                current_frame: self.current_frame(),
                total_frames: self.sync.frame_count(),
                spectra: session.spectra().len(),
                dark_corrected: !session.dark_reference().is_empty(),
            },
            &self.theme,
        );

        let frames = session.frames();
        let current_time = frames.get(self.current_frame()).map_or(0.0, |f| f.timestamp);
        let total_time = frames.last().map_or(0.0, |f| f.timestamp);
        playback_bar::render(
            frame,
            vertical[2],
            &self.controls,
            current_time,
            total_time,
            &self.theme,
        );

        let status = match &self.status {
            Status::Info(text) => Span::styled(text.clone(), self.theme.status_info),
            Status::Error(text) => Span::styled(text.clone(), self.theme.status_error),
        };
        frame.render_widget(Paragraph::new(Line::from(status)), vertical[3]);

        let areas = build_layout(&self.panels, vertical[1]);

        for (i, (panel, area)) in self.panels.iter().zip(areas.iter()).enumerate() {
            let is_selected = i == self.selected_panel;

            let sel_mark = if is_selected {
                SELECTED_MARKER[1]
            } else {
                SELECTED_MARKER[0]
            };
            let col_mark = if panel.collapsed {
                COLLAPSED_MARKER[1]
            } else {
                COLLAPSED_MARKER[0]
            };

            let title = format!("{sel_mark} {col_mark} {}", panel.name);

            let border_style = if is_selected {
                self.theme.border_selected
            } else {
                self.theme.border_normal
            };

            let block = Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style)
                .title_style(self.theme.title);

            if panel.collapsed {
                frame.render_widget(block, *area);
            } else {
                let inner = block.inner(*area);
                frame.render_widget(block, *area);

                if inner.width < 2 || inner.height < 1 {
                    continue;
                }
                self.render_panel(frame, panel.kind, inner);
            }
        }
    }
}
