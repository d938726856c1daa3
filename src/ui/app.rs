use std::mem;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use crossterm::event::KeyCode;
use open::that as open_path;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;
use tracing::{info, warn};

use crate::models::{BookId, Outcome, ReturnOutcome};
use crate::session::Session;
use crate::transfer::export_csv;

use super::forms::{
    BookField, BookForm, ConfirmAction, GenreForm, PendingAction, RatingForm, SearchForm,
};
use super::helpers::{
    availability_span, centered_rect, format_price, rating_label, stars, surface_error,
};
use super::screens::{BookListScreen, ListFilter, ReportScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows skipped by PageUp/PageDown.
const PAGE_STEP: isize = 10;

/// Which page fills the main area.
enum Screen {
    Books,
    Report(ReportScreen),
}

/// Fine-grained modes layered over the current screen.
enum Mode {
    Normal,
    AddingBook(BookForm),
    Confirming(ConfirmAction),
    Rating(RatingForm),
    Searching(SearchForm),
    FilteringGenre(GenreForm),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Cancelled,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Cancelled => Style::default().fg(Color::Yellow),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    session: Session,
    books: BookListScreen,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
    export_path: PathBuf,
    last_export: Option<PathBuf>,
}

impl App {
    /// `startup_warning` is shown in the footer on the first frame, e.g. when
    /// the store could not be read.
    pub fn new(session: Session, export_path: PathBuf, startup_warning: Option<String>) -> Self {
        let books = BookListScreen::new(session.catalog());
        let status = startup_warning.map(|text| StatusMessage {
            text,
            kind: StatusKind::Error,
        });
        Self {
            session,
            books,
            screen: Screen::Books,
            mode: Mode::Normal,
            status,
            export_path,
            last_export: None,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingBook(form) => self.handle_add_book(code, form),
            Mode::Confirming(confirm) => self.handle_confirm(code, confirm),
            Mode::Rating(form) => self.handle_rating(code, form),
            Mode::Searching(form) => self.handle_search(code, form),
            Mode::FilteringGenre(form) => self.handle_genre(code, form),
        };

        self.mode = mode;
        Ok(exit)
    }

    /// Last save before the terminal is handed back.
    pub fn save_on_exit(&mut self) {
        if let Err(err) = self.session.save() {
            warn!(error = %surface_error(&err), "final save failed");
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        if let Screen::Report(_) = self.screen {
            match code {
                KeyCode::Char('q') => *exit = true,
                KeyCode::Esc | KeyCode::Char('p') | KeyCode::Char('P') => {
                    self.clear_status();
                    self.screen = Screen::Books;
                }
                _ => {}
            }
            return Ok(Mode::Normal);
        }

        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                if self.books.is_filtered() {
                    self.books.set_filter(ListFilter::All, self.session.catalog());
                    self.set_status("Showing all books.", StatusKind::Info);
                }
            }
            KeyCode::Up => self.books.move_selection(-1),
            KeyCode::Down => self.books.move_selection(1),
            KeyCode::PageUp => self.books.move_selection(-PAGE_STEP),
            KeyCode::PageDown => self.books.move_selection(PAGE_STEP),
            KeyCode::Home => self.books.select_first(),
            KeyCode::End => self.books.select_last(),
            KeyCode::Char('a') | KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::AddingBook(BookForm::default()));
            }
            KeyCode::Char('d') | KeyCode::Char('-') => {
                return Ok(self.begin_confirmation(PendingAction::Delete));
            }
            KeyCode::Char('b') => return Ok(self.begin_confirmation(PendingAction::Borrow)),
            KeyCode::Char('r') => return Ok(self.begin_confirmation(PendingAction::Return)),
            KeyCode::Char('t') => {
                if let Some(book) = self.books.current_book() {
                    let form = RatingForm::new(book, false);
                    self.clear_status();
                    return Ok(Mode::Rating(form));
                }
                self.set_status("No book selected to rate.", StatusKind::Error);
            }
            KeyCode::Char('f') | KeyCode::Char('/') => {
                self.clear_status();
                return Ok(Mode::Searching(SearchForm::default()));
            }
            KeyCode::Char('g') => {
                self.clear_status();
                return Ok(Mode::FilteringGenre(GenreForm::default()));
            }
            KeyCode::Char('o') => {
                let key = self.books.cycle_sort(self.session.catalog());
                self.set_status(format!("Sorted by {}.", key.label()), StatusKind::Info);
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.clear_status();
                self.screen = Screen::Report(ReportScreen::new(self.session.catalog()));
            }
            KeyCode::Char('x') => self.export(),
            KeyCode::Char('O') => self.open_last_export(),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    /// Run the decision half of a gated operation. Only a book that passes
    /// the checks gets a confirmation dialog.
    fn begin_confirmation(&mut self, action: PendingAction) -> Mode {
        let Some(id) = self.books.current_book().map(|b| b.id) else {
            self.set_status("No book selected.", StatusKind::Error);
            return Mode::Normal;
        };

        let catalog = self.session.catalog();
        let checked = match action {
            PendingAction::Delete => catalog.check_delete(id),
            PendingAction::Borrow => catalog.check_borrow(id),
            PendingAction::Return => catalog.check_return(id),
        };

        match checked {
            Ok(book) => {
                let confirm = ConfirmAction::new(action, book);
                self.clear_status();
                Mode::Confirming(confirm)
            }
            Err(err) => {
                self.set_status(err.to_string(), StatusKind::Error);
                Mode::Normal
            }
        }
    }

    fn handle_add_book(&mut self, code: KeyCode, mut form: BookForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Add book cancelled.", StatusKind::Cancelled);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => {
                let draft = form.to_draft();
                match self.session.catalog_mut().add_book(&draft) {
                    Ok(id) => {
                        info!(id, title = %draft.title.trim(), "book added");
                        self.after_change(
                            Some(id),
                            format!("Book '{}' added with ID {id}.", draft.title.trim()),
                        );
                        return Mode::Normal;
                    }
                    Err(err) => {
                        let message = err.to_string();
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    }
                }
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::AddingBook(form)
    }

    fn handle_confirm(&mut self, code: KeyCode, confirm: ConfirmAction) -> Mode {
        let confirmed = match code {
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => true,
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => false,
            _ => return Mode::Confirming(confirm),
        };

        // A confirmed return is finished by the rating prompt.
        if confirmed && confirm.action == PendingAction::Return {
            return match self.session.catalog().check_return(confirm.id) {
                Ok(book) => Mode::Rating(RatingForm::new(book, true)),
                Err(err) => {
                    self.set_status(err.to_string(), StatusKind::Error);
                    Mode::Normal
                }
            };
        }

        let catalog = self.session.catalog_mut();
        let result = match confirm.action {
            PendingAction::Delete => catalog.delete_book(confirm.id, confirmed),
            PendingAction::Borrow => catalog.borrow_book(confirm.id, confirmed),
            PendingAction::Return => catalog
                .return_book(confirm.id, false, None)
                .map(|returned| returned.outcome()),
        };

        match result {
            Ok(Outcome::Cancelled) => {
                self.set_status(
                    format!("{} of '{}' cancelled.", confirm.action.verb(), confirm.title),
                    StatusKind::Cancelled,
                );
            }
            Ok(Outcome::Completed) => {
                let message = match confirm.action {
                    PendingAction::Delete => format!("Book ID {} deleted.", confirm.id),
                    _ => format!("'{}' (ID {}) borrowed.", confirm.title, confirm.id),
                };
                info!(id = confirm.id, action = confirm.action.verb(), "book updated");
                self.after_change(Some(confirm.id), message);
            }
            Err(err) => self.set_status(err.to_string(), StatusKind::Error),
        }
        Mode::Normal
    }

    fn handle_rating(&mut self, code: KeyCode, mut form: RatingForm) -> Mode {
        match code {
            // A confirmed return goes through even when the score is skipped.
            KeyCode::Esc if form.completes_return => return self.finish_return(&form, None),
            KeyCode::Esc => {
                self.set_status("Rating cancelled.", StatusKind::Cancelled);
                return Mode::Normal;
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter if form.completes_return && form.input.trim().is_empty() => {
                return self.finish_return(&form, None);
            }
            KeyCode::Enter => {
                let score = match form.score() {
                    Ok(score) => score,
                    Err(err) => {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                        return Mode::Rating(form);
                    }
                };
                return self.submit_rating(&form, score);
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::Rating(form)
    }

    /// One attempt only: an out-of-range score is discarded, never re-asked.
    fn submit_rating(&mut self, form: &RatingForm, score: i64) -> Mode {
        if form.completes_return {
            return self.finish_return(form, Some(score));
        }

        match self.session.catalog_mut().rate_book(form.id, score) {
            Ok(()) => {
                info!(id = form.id, score, "book rated");
                self.after_change(
                    Some(form.id),
                    format!("Book ID {} rated {score}/5 {}.", form.id, stars(score)),
                );
            }
            Err(err) => self.set_status(err.to_string(), StatusKind::Error),
        }
        Mode::Normal
    }

    fn finish_return(&mut self, form: &RatingForm, score: Option<i64>) -> Mode {
        let result = self.session.catalog_mut().return_book(form.id, true, score);
        let book = format!("'{}' (ID {})", form.title, form.id);
        match result {
            Ok(ReturnOutcome::Returned {
                rating: Some(score),
            }) => {
                info!(id = form.id, score, "book returned and rated");
                let score = i64::from(score);
                self.after_change(
                    Some(form.id),
                    format!("{book} returned and rated {score}/5 {}.", stars(score)),
                );
            }
            Ok(ReturnOutcome::RatingDiscarded(err)) => {
                info!(id = form.id, "book returned, rating discarded");
                self.after_change_with(
                    Some(form.id),
                    format!("{book} returned. Rating discarded: {err}"),
                    StatusKind::Error,
                );
            }
            Ok(_) => {
                info!(id = form.id, "book returned");
                self.after_change(Some(form.id), format!("{book} returned without a rating."));
            }
            Err(err) => self.set_status(err.to_string(), StatusKind::Error),
        }
        Mode::Normal
    }

    fn handle_search(&mut self, code: KeyCode, mut form: SearchForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.clear_status();
                return Mode::Normal;
            }
            KeyCode::Tab => form.field = form.field.next(),
            KeyCode::Backspace => {
                form.query.pop();
            }
            KeyCode::Enter => {
                let filter = ListFilter::Search {
                    field: form.field,
                    query: form.query.clone(),
                };
                self.books.set_filter(filter, self.session.catalog());
                if self.books.rows.is_empty() {
                    self.set_status("No book matches the search.", StatusKind::Cancelled);
                } else {
                    let count = self.books.rows.len();
                    self.set_status(format!("{count} book(s) found."), StatusKind::Info);
                }
                return Mode::Normal;
            }
            KeyCode::Char(ch) if !ch.is_control() => form.query.push(ch),
            _ => {}
        }
        Mode::Searching(form)
    }

    fn handle_genre(&mut self, code: KeyCode, mut form: GenreForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.clear_status();
                return Mode::Normal;
            }
            KeyCode::Backspace => {
                form.genre.pop();
            }
            KeyCode::Enter => {
                let genre = form.genre.trim().to_string();
                self.books
                    .set_filter(ListFilter::Genre(genre.clone()), self.session.catalog());
                if self.books.rows.is_empty() {
                    self.set_status(
                        format!("No book found in genre '{genre}'."),
                        StatusKind::Cancelled,
                    );
                } else {
                    self.clear_status();
                }
                return Mode::Normal;
            }
            KeyCode::Char(ch) if !ch.is_control() => form.genre.push(ch),
            _ => {}
        }
        Mode::FilteringGenre(form)
    }

    fn export(&mut self) {
        let path = self.export_path.clone();
        match export_csv(self.session.catalog(), &path) {
            Ok(()) => {
                self.set_status(
                    format!("Catalog exported to {}. Press O to open it.", path.display()),
                    StatusKind::Info,
                );
                self.last_export = Some(path);
            }
            Err(err) => self.set_status(
                format!("Export failed: {}", surface_error(&err)),
                StatusKind::Error,
            ),
        }
    }

    fn open_last_export(&mut self) {
        let result = match &self.last_export {
            Some(path) => open_path(path).map_err(|err| anyhow!(err)),
            None => Err(anyhow!("Nothing exported yet. Press x first.")),
        };
        if let Err(err) = result {
            self.set_status(
                format!("Failed to open export: {}", surface_error(&err)),
                StatusKind::Error,
            );
        }
    }

    /// Persist after a successful mutation and refresh the table. A failed
    /// save is reported but the in-memory change stays.
    fn after_change(&mut self, focus: Option<BookId>, message: String) {
        self.after_change_with(focus, message, StatusKind::Info);
    }

    fn after_change_with(&mut self, focus: Option<BookId>, message: String, kind: StatusKind) {
        self.books.refresh(self.session.catalog());
        if let Some(id) = focus {
            self.books.select_id(id);
        }
        match self.session.save() {
            Ok(()) => self.set_status(message, kind),
            Err(err) => self.set_status(
                format!("{message} Save skipped: {}", surface_error(&err)),
                StatusKind::Error,
            ),
        }
    }

    fn set_status(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Books => self.draw_book_table(frame, content_area),
            Screen::Report(report) => self.draw_report(frame, content_area, report),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingBook(form) => self.draw_book_form(frame, area, form),
            Mode::Confirming(confirm) => self.draw_confirm(frame, area, confirm),
            Mode::Rating(form) => self.draw_rating(frame, area, form),
            Mode::Searching(form) => {
                let prompt = form.prompt();
                self.draw_prompt_bar(frame, area, "Search (Tab: field)", &prompt, &form.query)
            }
            Mode::FilteringGenre(form) => {
                self.draw_prompt_bar(frame, area, "Filter", "Genre: ", &form.genre)
            }
            Mode::Normal => {}
        }
    }

    fn draw_book_table(&self, frame: &mut Frame, area: Rect) {
        let mut title = format!(" Books ({}) - sorted by {} ", self.books.rows.len(), self.books.sort.label());
        if let Some(filter) = self.books.filter_label() {
            title.push_str(&format!("- {filter} "));
        }
        let block = Block::default().title(title).borders(Borders::ALL);

        if self.books.rows.is_empty() {
            let text = if self.books.is_filtered() {
                "No book matches. Press Esc to show every book."
            } else {
                "No books yet. Press 'a' to add one."
            };
            let message = Paragraph::new(text)
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(message, area);
            return;
        }

        let header = Row::new(
            ["ID", "Title", "Author", "Genre", "Year", "Price", "Available", "Rating"]
                .into_iter()
                .map(|h| Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))),
        );

        let rows = self.books.rows.iter().map(|book| {
            Row::new(vec![
                Cell::from(book.id.to_string()),
                Cell::from(book.title.clone()),
                Cell::from(book.author.clone()),
                Cell::from(book.genre.clone()),
                Cell::from(book.year.to_string()),
                Cell::from(format_price(book.price)),
                Cell::from(availability_span(book.available)),
                Cell::from(rating_label(book)),
            ])
        });

        let widths = [
            Constraint::Length(5),
            Constraint::Min(18),
            Constraint::Min(14),
            Constraint::Length(14),
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Length(8),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");

        let mut state = TableState::default();
        state.select(Some(self.books.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_report(&self, frame: &mut Frame, area: Rect, screen: &ReportScreen) {
        let report = &screen.report;
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let row = |label: &str, value: String| {
            Line::from(vec![Span::raw(format!("{label}: ")), Span::styled(value, bold)])
        };

        let lines = vec![
            row("Total books", report.total_count.to_string()),
            row("Available", report.available_count.to_string()),
            row("Borrowed", report.borrowed_count.to_string()),
            row("Total value", format_price(report.total_value)),
            row("Top genre", report.top_genre.clone()),
            row(
                "Most expensive",
                format!(
                    "{} at {}",
                    report.most_expensive.title,
                    format_price(report.most_expensive.price)
                ),
            ),
            row(
                "Cheapest",
                format!("{} at {}", report.cheapest.title, format_price(report.cheapest.price)),
            ),
            row(
                "Best rated",
                format!("{} ({:.2}/5)", report.best_rated.title, report.best_rated.average),
            ),
            row(
                "Worst rated",
                format!("{} ({:.2}/5)", report.worst_rated.title, report.worst_rated.average),
            ),
        ];

        let block = Block::default().title(" Library Report ").borders(Borders::ALL);
        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let keys: &[(&'static str, &'static str)] = match (&self.screen, &self.mode) {
            (_, Mode::AddingBook(_)) => &[
                ("[Tab]", "Next Field"),
                ("[Enter]", "Save"),
                ("[Esc]", "Cancel"),
            ],
            (_, Mode::Confirming(_)) => &[("[y]", "Confirm"), ("[n/Esc]", "Cancel")],
            (_, Mode::Rating(form)) if form.completes_return => &[
                ("[1-5]", "Score"),
                ("[Enter]", "Save"),
                ("[Esc]", "Skip Rating"),
            ],
            (_, Mode::Rating(_)) => &[("[1-5]", "Score"), ("[Enter]", "Save"), ("[Esc]", "Cancel")],
            (_, Mode::Searching(_)) => &[
                ("[Tab]", "Field"),
                ("[Enter]", "Search"),
                ("[Esc]", "Cancel"),
            ],
            (_, Mode::FilteringGenre(_)) => &[("[Enter]", "Filter"), ("[Esc]", "Cancel")],
            (Screen::Report(_), _) => &[("[p/Esc]", "Back"), ("[q]", "Quit")],
            (Screen::Books, _) => &[
                ("[↑↓]", "Select"),
                ("[a]", "Add"),
                ("[d]", "Delete"),
                ("[b]", "Borrow"),
                ("[r]", "Return"),
                ("[t]", "Rate"),
                ("[f]", "Search"),
                ("[g]", "Genre"),
                ("[o]", "Sort"),
                ("[p]", "Report"),
                ("[x]", "Export CSV"),
                ("[q]", "Quit"),
            ],
        };

        let mut spans = Vec::with_capacity(keys.len() * 2);
        for (key, label) in keys {
            spans.push(Span::styled(*key, key_style));
            spans.push(Span::raw(format!(" {label}   ")));
        }
        Line::from(spans)
    }

    fn draw_prompt_bar(&self, frame: &mut Frame, area: Rect, title: &str, prompt: &str, value: &str) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(title.to_string());
        let paragraph = Paragraph::new(Span::raw(format!("{prompt}{value}")))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + prompt.chars().count() as u16 + value.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_book_form(&self, frame: &mut Frame, area: Rect, form: &BookForm) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Add Book").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = BookField::ALL
            .iter()
            .map(|&field| form.build_line(field))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (dx, dy) = form.cursor_offset();
        frame.set_cursor_position((inner.x + dx, inner.y + dy));
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmAction) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(confirm.action.title())
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![Line::from(format!(
            "{} '{}' (ID {})?",
            confirm.action.verb(),
            confirm.title,
            confirm.id
        ))];
        if confirm.action == PendingAction::Return {
            lines.push(Line::from("You will be asked to rate the book."));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Y to confirm or N / Esc to cancel.",
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_rating(&self, frame: &mut Frame, area: Rect, form: &RatingForm) {
        let popup_area = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!("Rate book ID {}", form.id))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let prompt = "Rating (1 to 5): ";
        let mut lines = vec![
            Line::from(format!("What did you think of '{}'?", form.title)),
            Line::from(vec![
                Span::raw(prompt),
                Span::styled(form.input.clone(), Style::default().fg(Color::Yellow)),
            ]),
            Line::from(""),
        ];
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let cursor_x = inner.x + prompt.len() as u16 + form.input.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y + 1));
    }

    #[cfg(test)]
    fn status_text(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with_books(titles: &[&str]) -> App {
        let mut session = Session::in_memory().unwrap();
        for title in titles {
            session
                .catalog_mut()
                .add_book_as_of(
                    &crate::models::BookDraft::new(*title, "Author", "Novel", "1999", "5"),
                    2026,
                )
                .unwrap();
        }
        App::new(session, PathBuf::from("unused.csv"), None)
    }

    fn press(app: &mut App, keys: &str) {
        for ch in keys.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    #[test]
    fn add_book_through_the_form() {
        let mut app = app_with_books(&[]);
        press(&mut app, "a");
        for value in ["Dune", "Herbert", "Sci-Fi", "1965", "9.99"] {
            press(&mut app, value);
            app.handle_key(KeyCode::Tab).unwrap();
        }
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.session.catalog().len(), 1);
        assert_eq!(app.status_text(), Some("Book 'Dune' added with ID 1."));
    }

    #[test]
    fn invalid_form_stays_open_with_error() {
        let mut app = app_with_books(&[]);
        press(&mut app, "aDune");
        app.handle_key(KeyCode::Enter).unwrap();
        match &app.mode {
            Mode::AddingBook(form) => assert_eq!(
                form.error.as_deref(),
                Some("The following fields are missing: author, genre, publication year, price")
            ),
            _ => panic!("form should stay open"),
        }
        assert!(app.session.catalog().is_empty());
    }

    #[test]
    fn borrow_requires_confirmation() {
        let mut app = app_with_books(&["Emma"]);
        press(&mut app, "bn");
        assert!(app.session.catalog().get(1).unwrap().available);
        assert_eq!(app.status_text(), Some("Borrow of 'Emma' cancelled."));

        press(&mut app, "by");
        assert!(!app.session.catalog().get(1).unwrap().available);

        press(&mut app, "b");
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(
            app.status_text(),
            Some("'Emma' (ID 1) is not available for borrowing.")
        );
    }

    #[test]
    fn return_always_asks_for_a_rating() {
        let mut app = app_with_books(&["Emma"]);
        press(&mut app, "by");
        press(&mut app, "ry");
        assert!(matches!(app.mode, Mode::Rating(ref form) if form.completes_return));
        assert!(!app.session.catalog().get(1).unwrap().available);

        press(&mut app, "4");
        app.handle_key(KeyCode::Enter).unwrap();
        let book = app.session.catalog().get(1).unwrap();
        assert!(book.available);
        assert_eq!(book.ratings, vec![4]);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn invalid_return_rating_is_discarded_after_one_attempt() {
        let mut app = app_with_books(&["Emma"]);
        press(&mut app, "by");
        press(&mut app, "ry9");
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.mode, Mode::Normal));
        let book = app.session.catalog().get(1).unwrap();
        assert!(book.available);
        assert!(book.ratings.is_empty());
        assert_eq!(
            app.status_text(),
            Some("'Emma' (ID 1) returned. Rating discarded: Rating must be between 1 and 5 (got 9).")
        );
    }

    #[test]
    fn escape_skips_the_rating_but_keeps_the_return() {
        let mut app = app_with_books(&["Emma"]);
        press(&mut app, "by");
        press(&mut app, "ry");
        app.handle_key(KeyCode::Esc).unwrap();

        assert!(matches!(app.mode, Mode::Normal));
        let book = app.session.catalog().get(1).unwrap();
        assert!(book.available);
        assert!(book.ratings.is_empty());
        assert_eq!(app.status_text(), Some("'Emma' (ID 1) returned without a rating."));
    }

    #[test]
    fn standalone_invalid_rating_is_discarded() {
        let mut app = app_with_books(&["Emma"]);
        press(&mut app, "t7");
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.mode, Mode::Normal));
        assert!(app.session.catalog().get(1).unwrap().ratings.is_empty());
        assert_eq!(app.status_text(), Some("Rating must be between 1 and 5 (got 7)."));
    }

    #[test]
    fn delete_and_search() {
        let mut app = app_with_books(&["Dune", "Emma", "The Dune Chronicles"]);
        press(&mut app, "fdune");
        app.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(app.books.rows.len(), 2);

        press(&mut app, "dy");
        assert!(app.session.catalog().get(1).is_none());
        assert_eq!(app.books.rows.len(), 1);

        app.handle_key(KeyCode::Esc).unwrap();
        assert_eq!(app.books.rows.len(), 2);
    }
}
