use crate::commands;
use crate::datemath::{self, CalendarDate};
use crate::external::{ExternalSource, FileSource};
use crate::model::{Origin, Reminder};
use crate::storage::{self, ChangeOrigin, SaveDebouncer, Settings, StoreLocation};
use crate::store::{ReminderStore, Snapshot};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Alignment, Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, SystemTime};

const SAVE_DELAY: Duration = Duration::from_millis(1000);
const TICK: Duration = Duration::from_millis(250);

pub fn run(store: ReminderStore, location: StoreLocation, settings: Settings) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(store, location, settings);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(out))?)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ViewMode {
    Grid,
    Day,
}

struct App {
    store: ReminderStore,
    location: StoreLocation,
    settings: Settings,
    cursor: CalendarDate,
    view: ViewMode,
    selected_reminder: usize,
    message: Option<String>,
    saver: SaveDebouncer,
    reminders_mtime: Option<SystemTime>,
    /// Mtime observed right after our own last save; an observed change
    /// matching it is a local echo, anything else is a remote edit.
    own_write_mtime: Option<SystemTime>,
    quit: bool,
}

impl App {
    fn new(store: ReminderStore, location: StoreLocation, settings: Settings) -> Self {
        let cursor = store.today();
        let reminders_mtime = storage::modified_time(&location.reminders);
        App {
            store,
            location,
            settings,
            cursor,
            view: ViewMode::Grid,
            selected_reminder: 0,
            message: None,
            saver: SaveDebouncer::new(SAVE_DELAY),
            reminders_mtime,
            own_write_mtime: None,
            quit: false,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        while !self.quit {
            let snapshot = self.store.snapshot();
            terminal.draw(|frame| self.draw(frame, &snapshot))?;

            if event::poll(TICK)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
            self.tick();
        }
        if self.saver.pending() {
            self.saver.cancel();
            self.save_now();
        }
        Ok(())
    }

    fn tick(&mut self) {
        self.store.refresh_date(CalendarDate::today());
        if self.saver.due() {
            self.save_now();
        }
        self.check_storage_change();
    }

    /// Detects writes to the reminder file and tags each change with its
    /// origin: our own saves are local echoes and skip the reload, every
    /// other mtime change is a remote edit. Comparing against the mtime
    /// recorded at save time catches a remote write that lands between
    /// our save and this tick.
    fn check_storage_change(&mut self) {
        let mtime = storage::modified_time(&self.location.reminders);
        if mtime == self.reminders_mtime {
            return;
        }
        self.reminders_mtime = mtime;
        self.apply_storage_change(classify_change(mtime, self.own_write_mtime));
    }

    fn apply_storage_change(&mut self, origin: ChangeOrigin) {
        if origin == ChangeOrigin::Local {
            return;
        }
        match storage::load_reminders(&self.location.reminders) {
            Ok(local) => {
                let external: Vec<Reminder> = self
                    .store
                    .reminders()
                    .iter()
                    .filter(|r| r.origin == Origin::External)
                    .cloned()
                    .collect();
                self.store.load(local, external);
                self.message = Some("Reminders reloaded from storage".into());
            }
            Err(err) => self.message = Some(format!("Reload failed: {}", err)),
        }
    }

    fn save_now(&mut self) {
        match storage::save_reminders(&self.location.reminders, &self.store.local_reminders()) {
            Ok(report) if !report.written => {
                self.message =
                    Some("Storage is full; recent changes were not persisted".into());
            }
            Ok(_) => {
                self.own_write_mtime = storage::modified_time(&self.location.reminders);
            }
            Err(err) => self.message = Some(format!("Save failed: {}", err)),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.message.is_some() && key.code == KeyCode::Esc {
            self.message = None;
            return;
        }
        match self.view {
            ViewMode::Grid => self.handle_grid_key(key),
            ViewMode::Day => self.handle_day_key(key),
        }
    }

    fn handle_grid_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Left => self.move_cursor(-1),
            KeyCode::Right => self.move_cursor(1),
            KeyCode::Up => self.move_cursor(-7),
            KeyCode::Down => self.move_cursor(7),
            KeyCode::Char('h') => self.change_month(-1),
            KeyCode::Char('l') => self.change_month(1),
            KeyCode::Char('H') => self.change_year(-1),
            KeyCode::Char('L') => self.change_year(1),
            KeyCode::Char('t') => {
                self.store.jump_to_today();
                self.cursor = self.store.today();
            }
            KeyCode::Char('w') => self.toggle_first_weekday(),
            KeyCode::Char('r') => self.reload_external(),
            KeyCode::Enter => {
                self.selected_reminder = 0;
                self.view = ViewMode::Day;
            }
            _ => {}
        }
    }

    fn handle_day_key(&mut self, key: KeyEvent) {
        let count = self
            .store
            .day_view(self.cursor)
            .map(|v| v.reminders.len())
            .unwrap_or(0);
        match key.code {
            KeyCode::Esc => self.view = ViewMode::Grid,
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_reminder = self.selected_reminder.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if count > 0 && self.selected_reminder < count - 1 {
                    self.selected_reminder += 1;
                }
            }
            KeyCode::Char('x') => self.remove_selected(),
            KeyCode::Char('c') => self.recolor_selected(),
            _ => {}
        }
    }

    fn move_cursor(&mut self, delta: i64) {
        let (year, month, day_index) = datemath::normalize(
            self.cursor.year,
            self.cursor.month,
            self.cursor.day as i64 - 1 + delta,
        );
        let target = CalendarDate::new(year, month, day_index + 1);
        let (vy, vm) = self.store.visible();
        if (target.year, target.month) != (vy, vm) {
            let direction = if (target.year, target.month) < (vy, vm) {
                -1
            } else {
                1
            };
            self.store.change_month(direction);
        }
        self.cursor = target;
    }

    fn change_month(&mut self, direction: i32) {
        self.store.change_month(direction);
        let (year, month) = self.store.visible();
        let len = datemath::days_in_month(year, month as i64);
        self.cursor = CalendarDate::new(year, month, self.cursor.day.min(len));
    }

    fn change_year(&mut self, direction: i32) {
        self.store.change_year(direction);
        let (year, month) = self.store.visible();
        let len = datemath::days_in_month(year, month as i64);
        self.cursor = CalendarDate::new(year, month, self.cursor.day.min(len));
    }

    fn toggle_first_weekday(&mut self) {
        self.settings.first_weekday = self.settings.first_weekday.toggled();
        self.store.change_first_weekday(self.settings.first_weekday);
        if let Err(err) = storage::save_settings(&self.location.settings, &self.settings) {
            self.message = Some(format!("Settings save failed: {}", err));
        }
    }

    fn reload_external(&mut self) {
        match FileSource::new(self.location.external_feed.clone()).fetch() {
            Ok(feed) => {
                self.store.set_external(feed.reminders);
                self.message = Some("External reminders reloaded".into());
            }
            Err(err) => self.message = Some(err.to_string()),
        }
    }

    fn remove_selected(&mut self) {
        let Some(view) = self.store.day_view(self.cursor) else {
            return;
        };
        let Some(reminder) = view.reminders.get(self.selected_reminder) else {
            return;
        };
        let id = reminder.id.clone();
        if reminder.origin == Origin::External {
            let Some(source_id) = reminder.source_id.clone() else {
                self.message = Some("External reminder has no source".into());
                return;
            };
            let mut source = FileSource::new(self.location.external_feed.clone());
            if let Err(err) = source.remove_event(&source_id, &id) {
                self.message = Some(format!("Unable to delete the event: {}", err));
                return;
            }
        }
        match self.store.remove(&id) {
            Ok(removed) => {
                if removed.origin == Origin::Local {
                    self.save_now();
                }
                self.selected_reminder = self.selected_reminder.saturating_sub(1);
            }
            Err(err) => self.message = Some(err.to_string()),
        }
    }

    /// Random recolor; bursts coalesce into one write via the debouncer.
    fn recolor_selected(&mut self) {
        let Some(view) = self.store.day_view(self.cursor) else {
            return;
        };
        let Some(reminder) = view.reminders.get(self.selected_reminder) else {
            return;
        };
        if reminder.origin == Origin::External {
            self.message = Some("External reminders are read-only".into());
            return;
        }
        let id = reminder.id.clone();
        let color = commands::random_hsl_color();
        if let Err(err) = self.store.update(&id, |r| r.color = color) {
            self.message = Some(err.to_string());
            return;
        }
        self.saver.request();
    }

    fn draw(&self, frame: &mut ratatui::Frame, snapshot: &Snapshot) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(10),
                Constraint::Length(1),
            ])
            .split(frame.size());

        self.draw_header(frame, chunks[0], snapshot);
        match self.view {
            ViewMode::Grid => self.draw_grid(frame, chunks[1], snapshot),
            ViewMode::Day => self.draw_day(frame, chunks[1]),
        }
        self.draw_status(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame, area: Rect, snapshot: &Snapshot) {
        let today = self.store.today();
        let today_text = self
            .store
            .day_view(today)
            .map(|v| format!("{}, {}", v.weekday_name, v.day.date_string))
            .unwrap_or_else(|| today.to_string());
        let header = Line::from(vec![
            Span::styled(
                format!(" {} ", snapshot.window.current.date_string),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("| today: {}", today_text)),
        ]);
        frame.render_widget(Paragraph::new(header), area);
    }

    fn draw_grid(&self, frame: &mut ratatui::Frame, area: Rect, snapshot: &Snapshot) {
        let mut lines = Vec::with_capacity(8);
        let header = self
            .store
            .weekday_header()
            .iter()
            .map(|name| Span::styled(format!("{:>5} ", name), Style::default().fg(Color::Cyan)))
            .collect::<Vec<_>>();
        lines.push(Line::from(header));

        let window = &snapshot.window;
        let mut cells: Vec<Span> = Vec::with_capacity(42);
        for day in &window.previous.days {
            cells.push(Span::styled(
                format!("{:>5} ", day.day),
                Style::default().fg(Color::DarkGray),
            ));
        }
        for day in &window.current.days {
            let mark = if day.reminders.is_empty() { ' ' } else { '•' };
            let mut style = Style::default();
            if day.is_current_day {
                style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
            }
            if day.date() == self.cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            if let Some(color) = day
                .reminders
                .first()
                .and_then(|id| self.store.reminder(id))
                .and_then(|r| parse_hsl(&r.color))
            {
                if !day.is_current_day {
                    style = style.fg(color);
                }
            }
            cells.push(Span::styled(format!("{:>4}{} ", day.day, mark), style));
        }
        for day in &window.next.days {
            cells.push(Span::styled(
                format!("{:>5} ", day.day),
                Style::default().fg(Color::DarkGray),
            ));
        }
        for row in cells.chunks(7) {
            lines.push(Line::from(row.to_vec()));
        }

        let block = Block::default().borders(Borders::ALL).title(" calendar ");
        frame.render_widget(Paragraph::new(lines).block(block).alignment(Alignment::Center), area);
    }

    fn draw_day(&self, frame: &mut ratatui::Frame, area: Rect) {
        let Some(view) = self.store.day_view(self.cursor) else {
            return;
        };
        let items: Vec<ListItem> = view
            .reminders
            .iter()
            .map(|reminder| {
                let mut spans = vec![Span::styled(
                    "● ",
                    Style::default().fg(parse_hsl(&reminder.color).unwrap_or(Color::Gray)),
                )];
                spans.push(Span::raw(reminder.title.clone()));
                if let Some(range) = &reminder.range {
                    spans.push(Span::styled(
                        format!("  {}", range.text()),
                        Style::default().fg(Color::Gray),
                    ));
                }
                if let Some(rule) = &reminder.repeat {
                    spans.push(Span::styled(
                        format!("  ({})", rule.summary()),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                if reminder.origin == Origin::External {
                    spans.push(Span::styled(
                        "  [external]",
                        Style::default().fg(Color::Blue),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();
        let title = format!(" {} ({}) ", view.day.date_string, view.weekday_name);
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default();
        state.select(Some(self.selected_reminder));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_status(&self, frame: &mut ratatui::Frame, area: Rect) {
        let text = match &self.message {
            Some(message) => Line::from(Span::styled(
                format!(" {} (Esc to dismiss)", message),
                Style::default().fg(Color::Red),
            )),
            None => Line::from(Span::styled(
                match self.view {
                    ViewMode::Grid => {
                        " arrows: day  h/l: month  H/L: year  t: today  Enter: day view  w: week start  r: reload feed  q: quit"
                    }
                    ViewMode::Day => " j/k: select  x: delete  c: recolor  Esc: back  q: quit",
                },
                Style::default().fg(Color::DarkGray),
            )),
        };
        frame.render_widget(Paragraph::new(text), area);
    }
}

/// An observed mtime equal to the one our last save produced is a local
/// echo; any other value means someone else wrote the file since.
fn classify_change(
    observed: Option<SystemTime>,
    own_write: Option<SystemTime>,
) -> ChangeOrigin {
    if observed.is_some() && observed == own_write {
        ChangeOrigin::Local
    } else {
        ChangeOrigin::Remote
    }
}

/// Parses "hsl(h, s%, l%)" into a terminal color. Reminder colors are
/// free-form CSS strings; anything unparseable falls back to the caller's
/// default.
fn parse_hsl(input: &str) -> Option<Color> {
    let inner = input
        .trim()
        .strip_prefix("hsl(")?
        .strip_suffix(')')?
        .replace('%', "");
    let mut parts = inner.split(',').map(|p| p.trim().parse::<f64>());
    let h = parts.next()?.ok()?;
    let s = parts.next()?.ok()? / 100.0;
    let l = parts.next()?.ok()? / 100.0;
    let (r, g, b) = hsl_to_rgb(h, s, l);
    Some(Color::Rgb(r, g, b))
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = (h.rem_euclid(360.0)) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    (
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_origin_classification() {
        let saved = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let later = SystemTime::UNIX_EPOCH + Duration::from_secs(2_000);
        // our own write echoes back as local
        assert_eq!(classify_change(Some(saved), Some(saved)), ChangeOrigin::Local);
        // a write landing after our save is remote, even mid-tick
        assert_eq!(classify_change(Some(later), Some(saved)), ChangeOrigin::Remote);
        // never saved: every change is remote
        assert_eq!(classify_change(Some(later), None), ChangeOrigin::Remote);
        // file deleted out from under us counts as remote too
        assert_eq!(classify_change(None, Some(saved)), ChangeOrigin::Remote);
    }

    #[test]
    fn parses_hsl_colors() {
        assert_eq!(parse_hsl("hsl(0, 100%, 50%)"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(
            parse_hsl("hsl(120, 100%, 50%)"),
            Some(Color::Rgb(0, 255, 0))
        );
        assert_eq!(parse_hsl("red"), None);
    }
}
