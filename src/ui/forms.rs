use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Book, BookDraft, BookId, SearchField};

/// Input state for the "add book" dialog. Values stay raw text until the
/// catalog validates them.
#[derive(Default, Clone)]
pub(crate) struct BookForm {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) genre: String,
    pub(crate) year: String,
    pub(crate) price: String,
    pub(crate) active: BookField,
    pub(crate) error: Option<String>,
}

/// Fields of the book form, in tab order.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum BookField {
    #[default]
    Title,
    Author,
    Genre,
    Year,
    Price,
}

impl BookField {
    pub(crate) const ALL: [BookField; 5] = [
        BookField::Title,
        BookField::Author,
        BookField::Genre,
        BookField::Year,
        BookField::Price,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            BookField::Title => "Title",
            BookField::Author => "Author",
            BookField::Genre => "Genre",
            BookField::Year => "Year",
            BookField::Price => "Price",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|&f| f == self).unwrap_or(0)
    }
}

impl BookForm {
    fn value(&self, field: BookField) -> &String {
        match field {
            BookField::Title => &self.title,
            BookField::Author => &self.author,
            BookField::Genre => &self.genre,
            BookField::Year => &self.year,
            BookField::Price => &self.price,
        }
    }

    fn value_mut(&mut self, field: BookField) -> &mut String {
        match field {
            BookField::Title => &mut self.title,
            BookField::Author => &mut self.author,
            BookField::Genre => &mut self.genre,
            BookField::Year => &mut self.year,
            BookField::Price => &mut self.price,
        }
    }

    pub(crate) fn next_field(&mut self) {
        let idx = (self.active.index() + 1) % BookField::ALL.len();
        self.active = BookField::ALL[idx];
    }

    pub(crate) fn previous_field(&mut self) {
        let len = BookField::ALL.len();
        let idx = (self.active.index() + len - 1) % len;
        self.active = BookField::ALL[idx];
    }

    /// Append a character to the active field. Year only takes digits and
    /// price only takes characters that can appear in a decimal number.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let accepted = match self.active {
            BookField::Year => ch.is_ascii_digit(),
            BookField::Price => ch.is_ascii_digit() || ch == '.' || ch == '-',
            _ => !ch.is_control(),
        };
        if accepted {
            self.value_mut(self.active).push(ch);
        }
        accepted
    }

    pub(crate) fn backspace(&mut self) {
        self.value_mut(self.active).pop();
    }

    pub(crate) fn to_draft(&self) -> BookDraft {
        BookDraft::new(
            self.title.clone(),
            self.author.clone(),
            self.genre.clone(),
            self.year.clone(),
            self.price.clone(),
        )
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, field: BookField) -> Line<'static> {
        let value = self.value(field);
        let is_active = self.active == field;

        let display = if value.is_empty() {
            "<required>".to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label())),
            Span::styled(display, style),
        ])
    }

    /// Column where the cursor sits for the active field.
    pub(crate) fn cursor_offset(&self) -> (u16, u16) {
        let field = self.active;
        let prefix = field.label().len() + 2;
        let x = prefix + self.value(field).chars().count();
        (x as u16, field.index() as u16)
    }
}

/// What a pending confirmation will do once the user answers.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum PendingAction {
    Delete,
    Borrow,
    Return,
}

impl PendingAction {
    pub(crate) fn title(self) -> &'static str {
        match self {
            PendingAction::Delete => "Confirm Deletion",
            PendingAction::Borrow => "Confirm Borrow",
            PendingAction::Return => "Confirm Return",
        }
    }

    pub(crate) fn verb(self) -> &'static str {
        match self {
            PendingAction::Delete => "Delete",
            PendingAction::Borrow => "Borrow",
            PendingAction::Return => "Return",
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ConfirmAction {
    pub(crate) action: PendingAction,
    pub(crate) id: BookId,
    pub(crate) title: String,
}

impl ConfirmAction {
    pub(crate) fn new(action: PendingAction, book: &Book) -> Self {
        Self {
            action,
            id: book.id,
            title: book.title.clone(),
        }
    }
}

/// Rating prompt. When `completes_return` is set the prompt is the last step
/// of a confirmed return; skipping it returns the book unrated.
#[derive(Clone, Debug)]
pub(crate) struct RatingForm {
    pub(crate) id: BookId,
    pub(crate) title: String,
    pub(crate) input: String,
    pub(crate) completes_return: bool,
    pub(crate) error: Option<String>,
}

impl RatingForm {
    pub(crate) fn new(book: &Book, completes_return: bool) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            input: String::new(),
            completes_return,
            error: None,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_ascii_digit() && self.input.len() < 3 {
            self.input.push(ch);
            true
        } else {
            false
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.input.pop();
    }

    /// Parse the typed score. Range checking is left to the catalog.
    pub(crate) fn score(&self) -> Result<i64> {
        let raw = self.input.trim();
        if raw.is_empty() {
            return Err(anyhow!("Enter a rating between 1 and 5."));
        }
        raw.parse::<i64>()
            .map_err(|_| anyhow!("Rating must be a whole number."))
    }
}

/// Inline search state: which field to look in and the typed text.
#[derive(Default, Clone, Debug)]
pub(crate) struct SearchForm {
    pub(crate) field: SearchField,
    pub(crate) query: String,
}

impl SearchForm {
    pub(crate) fn prompt(&self) -> String {
        format!("Search {}: ", self.field)
    }
}

/// Genre filter prompt.
#[derive(Default, Clone, Debug)]
pub(crate) struct GenreForm {
    pub(crate) genre: String,
}
