use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use trailpaws::app::{App, Control, Screen};
use trailpaws::config::Config;
use trailpaws::dog::{Dog, Roster};
use trailpaws::history::HistoryDb;
use trailpaws::metrics::SimulatedMetrics;
use trailpaws::runtime::{EventLoop, TrailEvent};
use trailpaws::tracking::Status;

fn key(c: char) -> TrailEvent {
    TrailEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

// Headless run of the event loop without a TTY. Each wake jumps simulated
// time straight to the deadline the app asked for, so six seconds of
// tracking take a few milliseconds.
#[test]
fn headless_session_flow_records_history() {
    let _ = env_logger::builder().is_test(true).try_init();

    let t0 = Instant::now();
    let db = HistoryDb::open_in_memory().unwrap();
    let config = Config {
        grace_secs: 0,
        ..Config::default()
    };
    let mut app = App::new(
        SimulatedMetrics::seeded(5),
        &config,
        Roster::new(vec![Dog::new("Rex", "Lab", 90)]),
        Some(db),
        t0,
    );

    let (tx, rx) = mpsc::channel();
    let events = EventLoop::with_idle_wait(rx, Duration::from_millis(1));
    tx.send(key(' ')).unwrap();

    let mut now = t0;
    let mut stopped = false;
    for _ in 0..200u32 {
        match events.next_event(now, app.next_wakeup()) {
            TrailEvent::Wake => {
                if let Some(deadline) = app.next_wakeup() {
                    now = now.max(deadline);
                }
                app.on_tick(now);
            }
            TrailEvent::Resize => {}
            TrailEvent::Key(k) => {
                if app.handle_key(k, now) == Control::Quit {
                    break;
                }
            }
        }

        if !stopped && app.session.elapsed_secs() >= 6 {
            tx.send(key('s')).unwrap();
            tx.send(key('h')).unwrap();
            tx.send(TrailEvent::Key(KeyEvent::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL,
            )))
            .unwrap();
            stopped = true;
        }
    }

    assert!(stopped, "session should have reached six ticks");
    assert_eq!(app.session.status(), Status::Idle);

    let summary = app.last_summary.as_ref().expect("summary after stop");
    assert_eq!(summary.elapsed_secs, 6);
    assert_eq!(summary.calories, 2);
    assert_eq!(summary.dog_name, "Rex");

    assert_eq!(app.screen, Screen::History);
    assert_eq!(app.history_view.records.len(), 1);
    assert_eq!(app.history_view.records[0].elapsed_secs, 6);
}

#[test]
fn headless_pause_holds_elapsed_time() {
    let t0 = Instant::now();
    let mut app = App::new(
        SimulatedMetrics::seeded(1),
        &Config::default(),
        Roster::new(vec![Dog::new("Pip", "Terrier", 60)]),
        None,
        t0,
    );

    let space = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
    app.handle_key(space, t0);
    app.on_tick(t0 + Duration::from_secs(3));
    app.handle_key(space, t0 + Duration::from_secs(3));
    assert_eq!(app.session.status(), Status::Paused);

    for s in 4..=13 {
        app.on_tick(t0 + Duration::from_secs(s));
    }
    assert_eq!(app.session.elapsed_secs(), 3);

    app.handle_key(space, t0 + Duration::from_secs(13));
    app.on_tick(t0 + Duration::from_secs(15));
    assert_eq!(app.session.elapsed_secs(), 5);
    assert_eq!(app.session.metrics().calories, 2);
}

#[test]
fn totals_reset_only_after_grace() {
    let t0 = Instant::now();
    let mut app = App::new(
        SimulatedMetrics::seeded(2),
        &Config::default(),
        Roster::new(vec![Dog::new("Rex", "Lab", 90)]),
        None,
        t0,
    );

    let press = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
    app.handle_key(press(' '), t0);
    app.on_tick(t0 + Duration::from_secs(20));
    app.handle_key(press('s'), t0 + Duration::from_secs(20));

    app.on_tick(t0 + Duration::from_secs(22));
    assert_eq!(app.session.metrics().calories, 8);
    assert!(app.session.snapshot().finishing);

    assert!(app.on_tick(t0 + Duration::from_secs(23)));
    assert_eq!(app.session.metrics().calories, 0);
    assert_eq!(app.session.metrics().distance_km(), 0.0);
    assert_eq!(app.session.elapsed_display(), "00:00:00");
}
