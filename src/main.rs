use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    time::Instant,
};

use trailpaws::{
    app::{App, Control},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    dog::Dog,
    history::{started_label, HistoryDb},
    metrics::{MetricSource, SimulatedMetrics},
    tracking::MAX_GRACE,
    runtime::{terminal_input, EventLoop, TrailEvent},
    util::format_hms,
};

const MAX_GRACE_SECS: u64 = MAX_GRACE.as_secs();

/// track runs, hikes and rides with your dog
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal activity tracker for people who run, hike or bike with their dogs. Start, pause and stop a session with one key and watch time, distance, speed, your dog's heart rate and calories."
)]
pub struct Cli {
    /// add a dog to the roster as NAME[:BREED[:ENERGY]] (repeatable)
    #[clap(short = 'd', long = "dog", value_name = "DOG")]
    dogs: Vec<Dog>,

    /// write dogs given with --dog into the config file
    #[clap(long)]
    remember_dogs: bool,

    /// path of the config file to use
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// seed for the metric simulator, for reproducible sessions
    #[clap(long)]
    seed: Option<u64>,

    /// seconds final totals stay on screen after stopping (at most a day)
    #[clap(long, value_parser = clap::value_parser!(u64).range(0..=MAX_GRACE_SECS))]
    grace_secs: Option<u64>,

    /// don't record finished sessions in the history
    #[clap(long)]
    no_save: bool,

    /// print recent sessions and exit
    #[clap(long)]
    history: bool,

    /// export all saved sessions as CSV to this path and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

impl Cli {
    /// Applies command line overrides on top of the stored config.
    fn merge_into(&self, mut config: Config) -> Config {
        for dog in &self.dogs {
            match config.dogs.iter_mut().find(|d| d.id == dog.id) {
                Some(existing) => *existing = dog.clone(),
                None => config.dogs.push(dog.clone()),
            }
        }
        if let Some(grace) = self.grace_secs {
            config.grace_secs = grace;
        }
        if self.no_save {
            config.save_history = false;
        }
        config
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    fn metric_source(&self) -> SimulatedMetrics {
        match self.seed {
            Some(seed) => SimulatedMetrics::seeded(seed),
            None => SimulatedMetrics::new(),
        }
    }
}

/// Logs go to a file: the terminal belongs to the UI. Off unless RUST_LOG is set.
fn init_logging() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("trailpaws: logging disabled, cannot create {}: {}", parent.display(), e);
            return;
        }
    }
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        Err(e) => eprintln!("trailpaws: logging disabled, cannot open {}: {}", path.display(), e),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let store = cli.config_store();
    let stored = store.load();
    let config = cli.merge_into(stored.clone());
    if cli.remember_dogs && config.dogs != stored.dogs {
        store.save(&Config {
            dogs: config.dogs.clone(),
            ..stored
        })?;
        log::info!("saved roster to {}", store.path().display());
    }

    if cli.history || cli.export.is_some() {
        let db = HistoryDb::new()?;
        if let Some(path) = &cli.export {
            let n = db.export_csv(path)?;
            println!("exported {} sessions to {}", n, path.display());
        }
        if cli.history {
            print_history(&db)?;
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let history = match HistoryDb::new() {
        Ok(db) => Some(db),
        Err(e) => {
            log::warn!("history disabled: {}", e);
            None
        }
    };
    let mut app = App::new(
        cli.metric_source(),
        &config,
        config.roster(),
        history,
        Instant::now(),
    );

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Some(summary) = &app.last_summary {
        println!(
            "{}: {:.2} km in {}, {} kcal",
            summary.dog_name,
            summary.distance_km,
            format_hms(summary.elapsed_secs),
            summary.calories
        );
    }

    result
}

fn start_tui<B: Backend, M: MetricSource>(
    terminal: &mut Terminal<B>,
    app: &mut App<M>,
) -> Result<(), Box<dyn Error>> {
    let events = EventLoop::new(terminal_input());

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let redraw = match events.next_event(Instant::now(), app.next_wakeup()) {
            TrailEvent::Wake => app.on_tick(Instant::now()),
            TrailEvent::Resize => true,
            TrailEvent::Key(key) => {
                if app.handle_key(key, Instant::now()) == Control::Quit {
                    break;
                }
                true
            }
        };

        if redraw {
            terminal.draw(|f| f.render_widget(&*app, f.area()))?;
        }
    }

    Ok(())
}

fn print_history(db: &HistoryDb) -> Result<(), Box<dyn Error>> {
    let records = db.recent(20)?;
    if records.is_empty() {
        println!("no saved sessions yet");
        return Ok(());
    }

    let now = chrono::Local::now();
    println!(
        "{:<18} {:<16} {:>9} {:>8} {:>6}",
        "started", "dog", "time", "km", "kcal"
    );
    for r in &records {
        println!(
            "{:<18} {:<16} {:>9} {:>8.2} {:>6}",
            started_label(r.started_at, now),
            r.dog_name,
            format_hms(r.elapsed_secs),
            r.distance_km,
            r.calories
        );
    }

    println!();
    for t in db.totals_by_dog()? {
        println!(
            "{}: {} sessions, {:.2} km, {}",
            t.dog_name,
            t.sessions,
            t.distance_km,
            format_hms(t.elapsed_secs)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("trailpaws").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&[]);
        assert!(cli.dogs.is_empty());
        assert!(!cli.no_save);
        assert!(!cli.history);
        assert_eq!(cli.seed, None);
        assert_eq!(cli.export, None);
    }

    #[test]
    fn test_cli_parses_repeated_dogs() {
        let cli = parse(&["--dog", "Rex:Lab:80", "-d", "Pip"]);
        assert_eq!(cli.dogs.len(), 2);
        assert_eq!(cli.dogs[0].breed, "Lab");
        assert_eq!(cli.dogs[0].energy, 80);
        assert_eq!(cli.dogs[1].name, "Pip");
    }

    #[test]
    fn test_cli_rejects_bad_dog() {
        let result = Cli::try_parse_from(["trailpaws", "--dog", "Rex:Lab:lots"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_overrides_config() {
        let cli = parse(&["--dog", "Rex:Labrador", "--dog", "Pip", "--grace-secs", "7", "--no-save"]);
        let stored = Config {
            dogs: vec![Dog::new("Rex", "Lab", 50)],
            ..Config::default()
        };

        let merged = cli.merge_into(stored);
        assert_eq!(merged.dogs.len(), 2);
        assert_eq!(merged.dogs[0].breed, "Labrador");
        assert_eq!(merged.grace_secs, 7);
        assert!(!merged.save_history);
    }

    #[test]
    fn test_cli_limits_grace_secs() {
        assert_eq!(parse(&["--grace-secs", "86400"]).grace_secs, Some(86_400));
        let result = Cli::try_parse_from(["trailpaws", "--grace-secs", "86401"]);
        assert!(result.is_err());
        let result = Cli::try_parse_from(["trailpaws", "--grace-secs", "18446744073709551615"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_seeded_source_is_reproducible() {
        let cli = parse(&["--seed", "11"]);
        let mut a = cli.metric_source();
        let mut b = cli.metric_source();
        assert_eq!(a.sample(), b.sample());
    }

    #[test]
    fn test_config_path_override() {
        let cli = parse(&["--config", "/tmp/trailpaws-test.json"]);
        assert_eq!(
            cli.config_store().path(),
            std::path::Path::new("/tmp/trailpaws-test.json")
        );
    }
}
