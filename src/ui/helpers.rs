use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Span;

use crate::models::Book;

/// Two-decimal price used everywhere a price is shown.
pub(crate) fn format_price(price: f64) -> String {
    format!("{price:.2}")
}

/// Mean rating as `x.xx/5`, or `N/A` for unrated books.
pub(crate) fn rating_label(book: &Book) -> String {
    match book.average_rating() {
        Some(avg) => format!("{avg:.2}/5"),
        None => "N/A".to_string(),
    }
}

pub(crate) fn stars(score: i64) -> String {
    "*".repeat(score.clamp(0, 5) as usize)
}

/// Colored availability marker for the book table.
pub(crate) fn availability_span(available: bool) -> Span<'static> {
    if available {
        Span::styled("yes", Style::default().fg(Color::Green))
    } else {
        Span::styled("borrowed", Style::default().fg(Color::Red))
    }
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}
