use std::path::Path;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::ui::PathInput;
use crate::ui::constants::{ERROR_WIDTH_PERCENT, MAX_COMPLETIONS_SHOWN, MODAL_WIDTH_PERCENT};
use crate::ui::helpers::{
    centered_rect_by_height, draw_popup_frame, faint_span, key_span, modal_height, truncate_front,
};

pub(crate) fn draw_action_menu(frame: &mut Frame<'_>, hostname: &str, remote_path: &str) {
    let entries = [
        (
            "E",
            "dit the file",
            "The file will be downloaded and opened in an editor. Any changes you save will be automatically sent back to the remote machine",
        ),
        (
            "O",
            "pen the file",
            "The file will be downloaded and opened by the default open program",
        ),
        (
            "S",
            "ave the file",
            "The file will be downloaded to a destination you select",
        ),
    ];
    let mut lines = vec![
        Line::from(vec![
            Span::raw("What would you like to do with the remote file on "),
            Span::styled(
                hostname.to_string(),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(":"),
        ]),
        Line::from(Span::styled(
            remote_path.to_string(),
            Style::default().fg(Color::LightYellow),
        )),
        Line::from(""),
    ];
    for (key, rest, help) in entries {
        lines.push(Line::from(vec![key_span(key), Span::raw(rest)]));
        lines.push(Line::from(faint_span(help)));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(vec![key_span("C"), Span::raw("ancel")]));

    let height = modal_height(lines.len() + 4, 0);
    let area = centered_rect_by_height(MODAL_WIDTH_PERCENT, height, frame.area());
    let inner = draw_popup_frame(frame, area, "Remote file", Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

pub(crate) fn draw_conflict_menu(frame: &mut Frame<'_>, dest: &Path) {
    let lines = vec![
        Line::from(vec![
            Span::raw("The file "),
            Span::styled(dest.display().to_string(), Style::default().fg(Color::Yellow)),
            Span::raw(" already exists. What would you like to do?"),
        ]),
        Line::from(""),
        Line::from(vec![
            key_span("O"),
            Span::raw("verwrite  "),
            key_span("A"),
            Span::raw("bort  Auto "),
            key_span("R"),
            Span::raw("ename  "),
            key_span("N"),
            Span::raw("ew name"),
        ]),
    ];
    let height = modal_height(lines.len() + 2, 0);
    let area = centered_rect_by_height(MODAL_WIDTH_PERCENT, height, frame.area());
    let inner = draw_popup_frame(frame, area, "File exists", Style::default().fg(Color::Yellow));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

pub(crate) fn draw_error(frame: &mut Frame<'_>, message: &str) {
    let message_lines = message.lines().count().max(1);
    let height = modal_height(message_lines + 3, 1);
    let area = centered_rect_by_height(ERROR_WIDTH_PERCENT, height, frame.area());
    let inner = draw_popup_frame(frame, area, "Error", Style::default().fg(Color::Red));

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(2)].as_ref())
        .split(inner);

    let body = Paragraph::new(message)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true });
    frame.render_widget(body, layout[0]);

    let footer = Paragraph::new(Line::from(vec![
        Span::raw("Press "),
        Span::styled("any key", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" to exit..."),
    ]))
    .style(Style::default().fg(Color::Gray))
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, layout[1]);
}

pub(crate) fn draw_destination_prompt(
    frame: &mut Frame<'_>,
    input: &PathInput,
    default: &Path,
    cwd: &Path,
) {
    let area_width = frame.area().width.saturating_mul(MODAL_WIDTH_PERCENT) / 100;
    let text_width = area_width.saturating_sub(4) as usize;
    let shown = input.completions.len().min(MAX_COMPLETIONS_SHOWN);

    let mut lines = vec![
        Line::from("Where do you wish to save the file? Leaving it blank will save it as:"),
        Line::from(Span::styled(
            default.display().to_string(),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(vec![
            Span::raw("Relative paths will be resolved from: "),
            Span::styled(
                cwd.display().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
    ];
    let prompt = "> ";
    let value = truncate_front(&input.value, text_width.saturating_sub(prompt.len() + 1));
    let input_row = lines.len();
    lines.push(Line::from(vec![
        Span::styled(prompt, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(value.clone()),
    ]));
    lines.push(Line::from(""));
    for name in input.completions.iter().take(shown) {
        lines.push(Line::from(faint_span(name)));
    }
    if input.completions.len() > shown {
        lines.push(Line::from(faint_span(&format!(
            "... and {} more",
            input.completions.len() - shown
        ))));
    }
    lines.push(Line::from(vec![
        Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" to complete, "),
        Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" to save, "),
        Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" to cancel"),
    ]));

    let height = modal_height(lines.len(), 0);
    let area = centered_rect_by_height(MODAL_WIDTH_PERCENT, height, frame.area());
    let inner = draw_popup_frame(frame, area, "Save file", Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(lines), inner);

    if (input_row as u16) < inner.height {
        let cursor_x = inner.x + (prompt.len() + value.chars().count()) as u16;
        frame.set_cursor_position((cursor_x.min(inner.right().saturating_sub(1)), inner.y + input_row as u16));
    }
}
