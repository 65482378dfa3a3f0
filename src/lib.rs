// Library surface for headless/integration tests and reuse.
// The binary in main.rs only adds terminal setup and the CLI.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod dog;
pub mod history;
pub mod metrics;
pub mod notify;
pub mod runtime;
pub mod tracking;
pub mod ui;
pub mod util;
pub mod widgets;
