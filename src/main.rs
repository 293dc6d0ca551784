//! src/main.rs
//!
//! Entrypoint delegating to `app::run()`.

mod app;
mod chart;
mod cli;
mod feed;
mod panels;
mod record;
mod ui;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    app::run()
}
