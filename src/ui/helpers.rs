use std::fs;
use std::path::Path;

use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::ssh::expand_user_path;
use crate::ui::constants::{POPUP_MIN_HEIGHT, POPUP_MIN_WIDTH};

/// Highlighted shortcut letter, e.g. the `E` in "Edit".
pub(crate) fn key_span(key: &str) -> Span<'static> {
    Span::styled(
        key.to_string(),
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    )
}

pub(crate) fn faint_span(text: &str) -> Span<'static> {
    Span::styled(text.to_string(), Style::default().add_modifier(Modifier::DIM))
}

/// Keep the end of `value`, which is the interesting part of a path.
pub(crate) fn truncate_front(value: &str, max_width: usize) -> String {
    let count = value.chars().count();
    if count <= max_width {
        return value.to_string();
    }
    if max_width <= 3 {
        return value.chars().skip(count - max_width).collect();
    }
    let kept: String = value.chars().skip(count - (max_width - 3)).collect();
    format!("...{kept}")
}

pub(crate) fn centered_rect_by_height(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = (area.width * percent_x / 100).min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    centered_rect_abs(width, height, area)
}

pub(crate) fn centered_rect_abs(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.max(POPUP_MIN_WIDTH).min(area.width);
    let height = height.max(POPUP_MIN_HEIGHT).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width,
        height,
    }
}

pub(crate) fn padded_rect(area: Rect, pad: u16) -> Rect {
    Rect {
        x: area.x + pad,
        y: area.y + pad,
        width: area.width.saturating_sub(pad * 2),
        height: area.height.saturating_sub(pad * 2),
    }
}

pub(crate) fn modal_height(content_lines: usize, footer_lines: usize) -> u16 {
    let total = content_lines + footer_lines;
    (total as u16).saturating_add(2 + 2)
}

pub(crate) fn draw_popup_frame(frame: &mut Frame<'_>, area: Rect, title: &str, style: Style) -> Rect {
    frame.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).border_style(style);
    frame.render_widget(block, area);
    let inner = padded_rect(area, 1);
    if inner.height < 2 {
        return inner;
    }
    let title_line = Paragraph::new(title)
        .alignment(Alignment::Center)
        .style(style.add_modifier(Modifier::BOLD));
    frame.render_widget(
        title_line,
        Rect {
            x: inner.x,
            y: inner.y,
            width: inner.width,
            height: 1,
        },
    );
    let line = "-".repeat(inner.width as usize);
    let separator = Paragraph::new(line).style(style);
    frame.render_widget(
        separator,
        Rect {
            x: inner.x,
            y: inner.y + 1,
            width: inner.width,
            height: 1,
        },
    );
    Rect {
        x: inner.x,
        y: inner.y + 2,
        width: inner.width,
        height: inner.height.saturating_sub(2),
    }
}

/// Tab completion for the destination prompt. Returns the completed input
/// and the names that matched, directories marked with a trailing `/`.
pub(crate) fn complete_path(input: &str, cwd: &Path) -> (String, Vec<String>) {
    let (dir_part, prefix) = match input.rfind('/') {
        Some(pos) => (&input[..=pos], &input[pos + 1..]),
        None => ("", input),
    };
    let dir = if dir_part.is_empty() {
        cwd.to_path_buf()
    } else {
        let expanded = expand_user_path(dir_part);
        if expanded.is_absolute() {
            expanded
        } else {
            cwd.join(expanded)
        }
    };
    let Ok(entries) = fs::read_dir(&dir) else {
        return (input.to_string(), Vec::new());
    };
    let mut matches: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(prefix) || (prefix.is_empty() && name.starts_with('.')) {
                return None;
            }
            let is_dir = entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false);
            Some(if is_dir { format!("{name}/") } else { name })
        })
        .collect();
    matches.sort_by_key(|name| name.to_lowercase());

    let completed = match matches.as_slice() {
        [] => return (input.to_string(), matches),
        [only] => only.clone(),
        [first, rest @ ..] => rest.iter().fold(first.clone(), |common, name| {
            common
                .chars()
                .zip(name.chars())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect()
        }),
    };
    (format!("{dir_part}{completed}"), matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_front_keeps_tail() {
        assert_eq!(truncate_front("/very/long/path/file.txt", 11), "...file.txt");
        assert_eq!(truncate_front("short", 10), "short");
        assert_eq!(truncate_front("abcdef", 2), "ef");
    }

    #[test]
    fn centered_rect_abs_clamps_to_area() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 10,
            height: 5,
        };
        let rect = centered_rect_abs(100, 100, area);
        assert_eq!(rect.width, 10);
        assert_eq!(rect.height, 5);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 0);
    }

    #[test]
    fn complete_path_extends_unique_match() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("documents")).unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let (completed, matches) = complete_path("doc", dir.path());
        assert_eq!(completed, "documents/");
        assert_eq!(matches, vec!["documents/"]);

        let typed = format!("{}/no", dir.path().display());
        let (completed, _) = complete_path(&typed, Path::new("/"));
        assert_eq!(completed, format!("{}/notes.txt", dir.path().display()));
    }

    #[test]
    fn complete_path_stops_at_common_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("report-2023.txt"), "").unwrap();
        fs::write(dir.path().join("report-2024.txt"), "").unwrap();
        let (completed, matches) = complete_path("rep", dir.path());
        assert_eq!(completed, "report-202");
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn complete_path_without_matches_keeps_input() {
        let dir = tempfile::tempdir().unwrap();
        let (completed, matches) = complete_path("zzz", dir.path());
        assert_eq!(completed, "zzz");
        assert!(matches.is_empty());
        let (completed, _) = complete_path("missing-dir/x", dir.path());
        assert_eq!(completed, "missing-dir/x");
    }
}
