use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Screen};
use crate::history::started_label;
use crate::metrics::MetricSource;
use crate::tracking::{SessionSnapshot, Status};
use crate::util::format_hms;
use crate::widgets::WidgetKind;

const HORIZONTAL_MARGIN: u16 = 2;
const CARD_HEIGHT: u16 = 5;

impl<M: MetricSource> Widget for &App<M> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Tracking => render_tracking(self, area, buf),
            Screen::History => render_history(self, area, buf),
        }
    }
}

fn status_style(status: Status) -> Style {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    match status {
        Status::Idle => bold.fg(Color::Gray),
        Status::Active => bold.fg(Color::Green),
        Status::Paused => bold.fg(Color::Yellow),
    }
}

fn render_tracking<M: MetricSource>(app: &App<M>, area: Rect, buf: &mut Buffer) {
    let snapshot = app.session.snapshot();
    let toast_lines = app.toasts.iter().count() as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(3),           // Header
            Constraint::Length(3),           // Dog picker
            Constraint::Length(CARD_HEIGHT), // Metric cards
            Constraint::Min(0),
            Constraint::Length(toast_lines), // Toasts
            Constraint::Length(2),           // Help
        ])
        .split(area);

    let title = format!("Trail Paws · {}", status_label(&snapshot));
    Paragraph::new(Span::styled(title, status_style(snapshot.status)))
        .block(Block::default().borders(Borders::ALL).title("Track"))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    render_dog_picker(app, chunks[1], buf);
    render_cards(&app.widgets, &snapshot, chunks[2], buf);

    let toasts: Vec<Line> = app
        .toasts
        .iter()
        .map(|t| {
            Line::from(Span::styled(
                t.message.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ))
        })
        .collect();
    Paragraph::new(toasts)
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

    let primary = match snapshot.status {
        Status::Idle => "start",
        Status::Active => "pause",
        Status::Paused => "resume",
    };
    let help = format!(
        "(space) {} | (s)top | ↑/↓ 1-9 dog | (h)istory | (t) share | (esc)ape",
        primary
    );
    Paragraph::new(help)
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[5], buf);
}

fn status_label(snapshot: &SessionSnapshot) -> String {
    if snapshot.finishing {
        "Finished".to_string()
    } else {
        snapshot.status.to_string()
    }
}

fn render_dog_picker<M: MetricSource>(app: &App<M>, area: Rect, buf: &mut Buffer) {
    let block = Block::default().borders(Borders::ALL).title("Dogs");

    if app.roster.is_empty() {
        Paragraph::new("No dogs yet: run with --dog NAME[:BREED[:ENERGY]] or edit the config file")
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center)
            .block(block)
            .render(area, buf);
        return;
    }

    let locked = app.session.status() != Status::Idle;
    let mut spans = Vec::new();
    for (i, dog) in app.roster.iter().enumerate() {
        let label = if dog.breed.is_empty() {
            format!(" {} {} ({}%) ", i + 1, dog.name, dog.energy)
        } else {
            format!(" {} {} · {} ({}%) ", i + 1, dog.name, dog.breed, dog.energy)
        };
        let style = if i == app.cursor() {
            let highlighted = Style::default().fg(Color::Black).bg(Color::Green);
            if locked {
                highlighted.add_modifier(Modifier::DIM)
            } else {
                highlighted.add_modifier(Modifier::BOLD)
            }
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }

    Paragraph::new(Line::from(spans))
        .block(block)
        .render(area, buf);
}

fn render_cards(widgets: &[WidgetKind], snapshot: &SessionSnapshot, area: Rect, buf: &mut Buffer) {
    if widgets.is_empty() {
        return;
    }

    let constraints: Vec<Constraint> = widgets
        .iter()
        .map(|_| Constraint::Ratio(1, widgets.len() as u32))
        .collect();
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let value_style = status_style(snapshot.status);
    for (kind, cell) in widgets.iter().zip(cells.iter()) {
        let value = kind.value(snapshot);
        let unit = kind.unit();
        let inner_width = cell.width.saturating_sub(2) as usize;
        let value_line = if value.width() > inner_width {
            Line::from(Span::styled("…", value_style))
        } else {
            Line::from(Span::styled(value, value_style))
        };

        Paragraph::new(vec![
            value_line,
            Line::from(Span::styled(unit, Style::default().fg(Color::Gray))),
        ])
        .block(Block::default().borders(Borders::ALL).title(kind.to_string()))
        .alignment(Alignment::Center)
        .render(*cell, buf);
    }
}

fn render_history<M: MetricSource>(app: &App<M>, area: Rect, buf: &mut Buffer) {
    let view = &app.history_view;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(view.totals.len().min(5) as u16 + 3), // Per-dog totals
            Constraint::Min(0),                                       // Sessions
            Constraint::Length(2),                                    // Help
        ])
        .split(area);

    let header_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let totals_rows: Vec<Row> = view
        .totals
        .iter()
        .take(5)
        .map(|t| {
            Row::new(vec![
                Cell::from(t.dog_name.clone()),
                Cell::from(t.sessions.to_string()),
                Cell::from(format!("{:.2}", t.distance_km)),
                Cell::from(format_hms(t.elapsed_secs)),
                Cell::from(t.calories.to_string()),
                Cell::from(format!("{:.2}", t.avg_session_km)),
            ])
        })
        .collect();
    Widget::render(
        Table::new(
            totals_rows,
            [
                Constraint::Length(16),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(8),
                Constraint::Length(12),
            ],
        )
        .header(
            Row::new(vec!["Dog", "Sessions", "Km", "Time", "Kcal", "Avg km"]).style(header_style),
        )
        .block(Block::default().borders(Borders::ALL).title("Totals")),
        chunks[0],
        buf,
    );

    if view.records.is_empty() {
        Paragraph::new("No saved sessions yet.\nFinish an activity to see it here!")
            .block(Block::default().borders(Borders::ALL).title("Sessions"))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    } else {
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let max_scroll = view.records.len().saturating_sub(table_height);
        let offset = view.scroll_offset.min(max_scroll);
        let now = chrono::Local::now();

        let rows: Vec<Row> = view
            .records
            .iter()
            .skip(offset)
            .take(table_height)
            .map(|r| {
                Row::new(vec![
                    Cell::from(started_label(r.started_at, now)),
                    Cell::from(r.dog_name.clone()),
                    Cell::from(format_hms(r.elapsed_secs)),
                    Cell::from(format!("{:.2}", r.distance_km)),
                    Cell::from(
                        r.avg_speed_kmh()
                            .map_or_else(|| "--".to_string(), |s| format!("{:.1}", s)),
                    ),
                    Cell::from(r.calories.to_string()),
                ])
            })
            .collect();

        Widget::render(
            Table::new(
                rows,
                [
                    Constraint::Length(18),
                    Constraint::Length(16),
                    Constraint::Length(10),
                    Constraint::Length(8),
                    Constraint::Length(10),
                    Constraint::Length(8),
                ],
            )
            .header(
                Row::new(vec!["Started", "Dog", "Time", "Km", "Avg km/h", "Kcal"])
                    .style(header_style),
            )
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Sessions ({})", view.records.len())),
            ),
            chunks[1],
            buf,
        );
    }

    Paragraph::new("↑/↓ PgUp/PgDn Home scroll | (b)ack")
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
}
