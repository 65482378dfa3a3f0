use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::Config;
use crate::dog::Roster;
use crate::history::{DogTotals, HistoryDb, SessionRecord};
use crate::metrics::MetricSource;
use crate::notify::{Notification, ToastQueue};
use crate::tracking::{Session, SessionSummary, Status, Stopped};
use crate::util::format_hms;
use crate::widgets::{normalize_layout, WidgetKind};

const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Tracking,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug, Default)]
pub struct HistoryView {
    pub records: Vec<SessionRecord>,
    pub totals: Vec<DogTotals>,
    pub scroll_offset: usize,
}

/// The tracking screen: owns the one live session plus everything around it.
#[derive(Debug)]
pub struct App<M: MetricSource> {
    pub roster: Roster,
    pub session: Session<M>,
    pub toasts: ToastQueue,
    pub screen: Screen,
    pub widgets: Vec<WidgetKind>,
    pub history_view: HistoryView,
    pub last_summary: Option<SessionSummary>,
    history: Option<HistoryDb>,
    save_history: bool,
    cursor: usize,
}

impl<M: MetricSource> App<M> {
    /// Opens the screen with the first dog preselected, if there is one.
    pub fn new(
        source: M,
        config: &Config,
        roster: Roster,
        history: Option<HistoryDb>,
        now: Instant,
    ) -> Self {
        let mut app = Self {
            session: Session::new(source, config.session_config()),
            roster,
            toasts: ToastQueue::default(),
            screen: Screen::Tracking,
            widgets: normalize_layout(&config.widgets),
            history_view: HistoryView::default(),
            last_summary: None,
            history,
            save_history: config.save_history,
            cursor: 0,
        };

        if app.roster.is_empty() {
            log::warn!("no dogs configured; add some with --dog or in the config file");
        } else {
            app.select(0, now);
        }
        app
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Handles one key press. Time that passed before the press is applied first.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Control {
        self.on_tick(now);

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.shutdown(now);
            return Control::Quit;
        }

        match self.screen {
            Screen::Tracking => self.handle_tracking_key(key.code, now),
            Screen::History => {
                self.handle_history_key(key.code);
                Control::Continue
            }
        }
    }

    fn handle_tracking_key(&mut self, code: KeyCode, now: Instant) -> Control {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.shutdown(now);
                return Control::Quit;
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                let notification = self.session.primary_action(now);
                if notification.is_none() && self.session.status() == Status::Idle {
                    self.toasts
                        .push_message("Pick a dog before starting".to_string(), now);
                }
                self.notify(notification, now);
            }
            KeyCode::Char('s') => self.stop(now),
            KeyCode::Up => {
                if self.cursor > 0 {
                    self.select(self.cursor - 1, now);
                }
            }
            KeyCode::Down => self.select(self.cursor + 1, now),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.select(index, now);
            }
            KeyCode::Char('h') => self.open_history(),
            KeyCode::Char('t') => self.share(),
            _ => {}
        }
        Control::Continue
    }

    fn handle_history_key(&mut self, code: KeyCode) {
        let view = &mut self.history_view;
        match code {
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('h') | KeyCode::Backspace => {
                self.screen = Screen::Tracking;
            }
            KeyCode::Up => view.scroll_offset = view.scroll_offset.saturating_sub(1),
            // Upper bound is clamped when rendering
            KeyCode::Down => view.scroll_offset += 1,
            KeyCode::PageUp => view.scroll_offset = view.scroll_offset.saturating_sub(10),
            KeyCode::PageDown => view.scroll_offset += 10,
            KeyCode::Home => view.scroll_offset = 0,
            _ => {}
        }
    }

    /// Advances the session clock and expires toasts. True if a redraw is due.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        let outcome = self.session.poll(now);
        let expired = self.toasts.expire(now);
        outcome.changed() || expired
    }

    /// Earliest instant at which [`App::on_tick`] would change something.
    pub fn next_wakeup(&self) -> Option<Instant> {
        match (self.session.next_deadline(), self.toasts.next_expiry()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Ends any running session so it is not lost on exit.
    pub fn shutdown(&mut self, now: Instant) {
        if self.session.status() != Status::Idle {
            self.stop(now);
        }
    }

    fn select(&mut self, index: usize, now: Instant) {
        if let Some(notification) = self.session.select_dog(index, &self.roster) {
            self.cursor = index;
            self.notify(Some(notification), now);
        }
    }

    fn stop(&mut self, now: Instant) {
        if let Some(Stopped {
            notification,
            summary,
        }) = self.session.stop(now)
        {
            self.notify(Some(notification), now);
            self.save(&summary);
            self.last_summary = Some(summary);
        }
    }

    fn save(&mut self, summary: &SessionSummary) {
        if !self.save_history {
            return;
        }
        if let Some(db) = &self.history {
            match db.record(summary) {
                Ok(id) => log::debug!("saved session {} for {}", id, summary.dog_name),
                Err(e) => log::warn!("could not save session: {}", e),
            }
        }
    }

    fn notify(&mut self, notification: Option<Notification>, now: Instant) {
        if let Some(n) = notification {
            self.toasts.push(&n, now);
        }
    }

    fn open_history(&mut self) {
        let view = &mut self.history_view;
        view.scroll_offset = 0;
        match &self.history {
            Some(db) => {
                view.records = db.recent(HISTORY_LIMIT).unwrap_or_else(|e| {
                    log::warn!("could not read history: {}", e);
                    Vec::new()
                });
                view.totals = db.totals_by_dog().unwrap_or_default();
            }
            None => {
                view.records.clear();
                view.totals.clear();
            }
        }
        self.screen = Screen::History;
    }

    fn share(&self) {
        let Some(url) = self.last_summary.as_ref().map(share_url) else {
            return;
        };
        if webbrowser::Browser::is_available() {
            if let Err(e) = webbrowser::open(&url) {
                log::warn!("could not open browser: {}", e);
            }
        }
    }
}

/// Brag text for a finished session.
pub fn share_text(summary: &SessionSummary) -> String {
    format!(
        "Just covered {:.2} km with {} in {} on Trail Paws!",
        summary.distance_km,
        summary.dog_name,
        format_hms(summary.elapsed_secs)
    )
}

pub fn share_url(summary: &SessionSummary) -> String {
    format!(
        "https://twitter.com/intent/tweet?text={}",
        percent_encode(&share_text(summary))
    )
}

fn percent_encode(text: &str) -> String {
    text.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}
