// SPDX-License-Identifier: MIT
use crate::session::Fields;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditMode {
    Browse,
    /// Replacing the value of the selected field.
    EditValue,
    /// Typing `name=value` for a new field.
    NewField,
}

/// One line of the metadata table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRow {
    pub name: String,
    pub value: String,
    /// Shown from the control-log template; not yet stored for this frame.
    pub is_default: bool,
}

/// Merges the template with a frame's stored fields, stored values winning.
#[must_use]
pub fn field_rows(template: &Fields, stored: &Fields) -> Vec<FieldRow> {
    let mut merged: Fields = template.clone();
    merged.extend(stored.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
        .into_iter()
        .map(|(name, value)| FieldRow {
            is_default: !stored.contains_key(&name),
            name,
            value,
        })
        .collect()
}

/// What the user typed when an edit is committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    Value(String),
    NewField { name: String, value: String },
}

pub struct MetadataEditor {
    mode: EditMode,
    selected: usize,
    buffer: String,
}

impl Default for MetadataEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataEditor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: EditMode::Browse,
            selected: 0,
            buffer: String::new(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> EditMode {
        self.mode
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.mode != EditMode::Browse
    }

    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Selected row, clamped to `row_count`.
    #[must_use]
    pub fn selected(&self, row_count: usize) -> Option<usize> {
        (row_count > 0).then(|| self.selected.min(row_count - 1))
    }

    pub fn select_next(&mut self, row_count: usize) {
        self.selected = match self.selected(row_count) {
            Some(i) if i + 1 < row_count => i + 1,
            _ => 0,
        };
    }

    pub fn begin_edit(&mut self, current_value: &str) {
        self.mode = EditMode::EditValue;
        self.buffer = current_value.to_string();
    }

    pub fn begin_new(&mut self) {
        self.mode = EditMode::NewField;
        self.buffer.clear();
    }

    pub fn push(&mut self, c: char) {
        if self.is_editing() {
            self.buffer.push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.buffer.pop();
    }

    pub fn cancel(&mut self) {
        self.mode = EditMode::Browse;
        self.buffer.clear();
    }

    /// Leaves edit mode and returns what was typed.
    ///
    /// # Errors
    ///
    /// Returns a message when nothing is being edited or a new field is not
    /// written as `name=value` with a non-empty name. The editor is back in
    /// browse mode either way.
    pub fn submit(&mut self) -> Result<Submission, String> {
        let mode = self.mode;
        let text = std::mem::take(&mut self.buffer);
        self.mode = EditMode::Browse;

        match mode {
            EditMode::Browse => Err("not editing".to_string()),
            EditMode::EditValue => Ok(Submission::Value(text.trim().to_string())),
            EditMode::NewField => {
                let Some((name, value)) = text.split_once('=') else {
                    return Err(format!("expected name=value, got {text:?}"));
                };
                let name = name.trim();
                if name.is_empty() {
                    return Err("field name must not be empty".to_string());
                }
                Ok(Submission::NewField {
                    name: name.to_string(),
                    value: value.trim().to_string(),
                })
            }
        }
    }

    pub fn reset(&mut self) {
        self.cancel();
        self.selected = 0;
    }
}
