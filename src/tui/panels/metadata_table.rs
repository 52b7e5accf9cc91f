// SPDX-License-Identifier: MIT
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Paragraph, Row, Table};

use crate::tui::editor::{EditMode, FieldRow, MetadataEditor};
use crate::tui::theme::Theme;

fn prompt_line<'a>(editor: &MetadataEditor, rows: &[FieldRow], theme: &Theme) -> Line<'a> {
    match editor.mode() {
        EditMode::Browse => Line::from(vec![
            Span::styled("[Tab]", theme.title),
            Span::raw(" Next  "),
            Span::styled("[e]", theme.title),
            Span::raw(" Edit  "),
            Span::styled("[a]", theme.title),
            Span::raw(" Add  "),
            Span::styled("[d]", theme.title),
            Span::raw(" Delete"),
        ]),
        EditMode::EditValue => {
            let name = editor
                .selected(rows.len())
                .map_or("", |i| rows[i].name.as_str());
            Line::from(Span::styled(
                format!("{name} = {}_", editor.buffer()),
                theme.editing,
            ))
        }
        EditMode::NewField => Line::from(Span::styled(
            format!("new field (name=value): {}_", editor.buffer()),
            theme.editing,
        )),
    }
}

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    rows: &[FieldRow],
    editor: &MetadataEditor,
    theme: &Theme,
) {
    if area.height < 2 || area.width < 10 {
        return;
    }

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    if rows.is_empty() {
        frame.render_widget(Paragraph::new("No metadata fields for this frame"), parts[0]);
    } else {
        let selected = editor.selected(rows.len());
        let table_rows = rows.iter().enumerate().map(|(i, row)| {
            let style = if Some(i) == selected {
                theme.field_selected
            } else if row.is_default {
                theme.field_default
            } else {
                ratatui::style::Style::default()
            };
            Row::new(vec![Cell::from(row.name.clone()), Cell::from(row.value.clone())]).style(style)
        });

        let table = Table::new(
            table_rows,
            [Constraint::Percentage(35), Constraint::Percentage(65)],
        )
        .header(Row::new(vec!["Field", "Value"]).style(theme.title));
        frame.render_widget(table, parts[0]);
    }

    frame.render_widget(Paragraph::new(prompt_line(editor, rows, theme)), parts[1]);
}
