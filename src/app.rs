//! src/app.rs
//!
//! Live differential-pressure chart for a sensor link.
//!
//! # Top-Level Application (`app.rs`)
//!
//! Parses the command line, sets up logging, attaches the sample feed to the
//! live chart, and runs the terminal UI loop.
//!
//! ## Overview
//! The application:
//! - Reads samples from a sensor gateway over TCP (or a serial port, or a
//!   built-in simulator) on a background thread.
//! - Draws them as a scrolling line chart that can be paused, cleared and
//!   saved to a record file.
//! - Browses previously saved records.
//!
//! # Building and Running
//!
//! ```text
//! cargo run --release -- --connect 192.168.3.62:3333
//! cargo run --release -- --serial /dev/ttyACM0 --format i16
//! cargo run --release -- --simulate
//! ```
//!
//! Logs go to `dp-monitor.log` (`--log-file`), filtered by `--log-level` or
//! `RUST_LOG`, since the terminal belongs to the UI.
//!
//! # Keyboard Controls
//!
//! Live chart:
//! - **Space / Enter** — tap: pause a running chart, clear a paused one.
//!   A cleared chart waits for data and ignores taps.
//! - **p** — pause. **c** — clear.
//! - **s** — save: type an optional tag, **Enter** saves, **Esc** cancels.
//! - **r** — reconnect: drop the link, clear the chart and open the source
//!   again (a gateway that was down at start, or dropped the connection).
//! - **b** — browse saved charts. The live chart is paused while browsing;
//!   coming back clears it if it was running when you left.
//! - **q** — quit.
//!
//! Saved charts:
//! - **Up / Down** — select. **r** — reload. **Esc / b** — back. **q** — quit.
//!
//! # Sensor Link
//!
//! The default text format is line based:
//! ```text
//! 0.250000,12.5000     sample: seconds, pascals
//! clock 1500000        device clock tick (us): shifts buffered times
//! scale 120            new pressure scale: rescales buffered values
//! ```
//! `--format i8|i16|i32|f32 [--big-endian]` reads a raw value stream instead,
//! numbering samples from zero after every clear.
//!
//! # Records
//!
//! Saved charts go to `--records-dir` (default `SensorRecords`) as
//! `yyyy.MM.dd HH:mm:ss[ tag].txt`: the chart label on the first line, then
//! one `x,y` pair per line.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{info, warn};
use ratatui::DefaultTerminal;
use ratatui::layout::Constraint;
use ratatui::style::{Color, Style};

use crate::chart::SharedChart;
use crate::chart::live::Suspension;
use crate::cli::Cli;
use crate::feed::{FeedFormat, SampleSource, Subscription};
use crate::panels::{
    ChartPanel, HistoryPanel, LinkView, ParagraphPanel, SavedListPanel, StatusPanel, TitlePanel,
};
use crate::record::{self, RecordError, SavedCharts};
use crate::ui::{Node, column, leaf, row};

const APP_TITLE: &str = "Differential Pressure Monitor";
const MESSAGE_TTL: Duration = Duration::from_secs(4);
const HISTORY_ROWS: usize = 64;

const LIVE_HELP: &str =
    "SPACE=Tap (pause / clear)  P=Pause  C=Clear  S=Save  R=Reconnect  B=Saved charts  Q=Quit";
const SAVED_HELP: &str = "UP/DOWN=Select  R=Reload  ESC/B=Back  Q=Quit";

enum Screen {
    Live,
    Saved {
        saved: SavedCharts,
        selected: usize,
        suspension: Suspension,
    },
}

enum Input {
    Normal,
    /// typing the tag for a save
    Tag(String),
}

/// Builds a fresh source for every (re)connect.
type Connect = Box<dyn Fn() -> Box<dyn SampleSource>>;

struct Message {
    text: String,
    error: bool,
    at: Instant,
}

pub struct App {
    chart: SharedChart,
    records_dir: PathBuf,
    screen: Screen,
    input: Input,
    message: Option<Message>,
    running: bool,
    feed: Option<Subscription>,
    format: FeedFormat,
    connect: Option<Connect>,
}

impl App {
    pub fn new(chart: SharedChart, records_dir: PathBuf) -> Self {
        Self {
            chart,
            records_dir,
            screen: Screen::Live,
            input: Input::Normal,
            message: None,
            running: true,
            feed: None,
            format: FeedFormat::default(),
            connect: None,
        }
    }

    /// Attach the source built by `connect`. Reconnecting calls it again.
    pub fn attach_feed(
        &mut self,
        format: FeedFormat,
        connect: impl Fn() -> Box<dyn SampleSource> + 'static,
    ) -> io::Result<()> {
        self.detach_feed();
        let sub = Subscription::attach(connect(), self.chart.clone(), format)?;
        info!("feed: {}", sub.name());
        self.feed = Some(sub);
        self.format = format;
        self.connect = Some(Box::new(connect));
        Ok(())
    }

    /// Stop the feed and wait for its thread.
    pub fn detach_feed(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.detach();
        }
    }

    /// Drop the link and start over on an empty chart with a fresh source.
    fn reconnect(&mut self) {
        let Some(connect) = &self.connect else {
            self.notify("No feed to reconnect", true);
            return;
        };
        let source = connect();
        self.detach_feed();
        self.chart.clear();
        match Subscription::attach(source, self.chart.clone(), self.format) {
            Ok(sub) => {
                info!("reconnecting: {}", sub.name());
                self.notify(format!("Reconnecting to {}", sub.name()), false);
                self.feed = Some(sub);
            }
            Err(e) => {
                warn!("could not restart the feed: {e}");
                self.notify(format!("Could not start the feed: {e}"), true);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn notify(&mut self, text: impl Into<String>, error: bool) {
        self.message = Some(Message {
            text: text.into(),
            error,
            at: Instant::now(),
        });
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.running = false;
            return;
        }

        if let Input::Tag(tag) = &mut self.input {
            match key.code {
                KeyCode::Char(c) => tag.push(c),
                KeyCode::Backspace => {
                    tag.pop();
                }
                KeyCode::Enter => {
                    let tag = std::mem::take(tag);
                    self.input = Input::Normal;
                    self.save(&tag);
                }
                KeyCode::Esc => self.input = Input::Normal,
                _ => {}
            }
            return;
        }

        match &mut self.screen {
            Screen::Live => match key.code {
                KeyCode::Char(' ') | KeyCode::Enter => self.chart.on_tap(),
                KeyCode::Char('p') => self.chart.pause(),
                KeyCode::Char('c') => self.chart.clear(),
                KeyCode::Char('s') => self.input = Input::Tag(String::new()),
                KeyCode::Char('r') => self.reconnect(),
                KeyCode::Char('b') => self.open_saved(),
                KeyCode::Char('q') => self.running = false,
                _ => {}
            },
            Screen::Saved {
                saved, selected, ..
            } => match key.code {
                KeyCode::Up | KeyCode::Char('k') => *selected = selected.saturating_sub(1),
                KeyCode::Down | KeyCode::Char('j') => {
                    if *selected + 1 < saved.charts.len() {
                        *selected += 1;
                    }
                }
                KeyCode::Char('r') => {
                    *saved = record::load_saved_charts(&self.records_dir);
                    *selected = (*selected).min(saved.charts.len().saturating_sub(1));
                }
                KeyCode::Esc | KeyCode::Char('b') => self.close_saved(),
                KeyCode::Char('q') => self.running = false,
                _ => {}
            },
        }
    }

    /// Save the live chart. The snapshot is taken under the chart lock; the
    /// file is written after it is released.
    fn save(&mut self, tag: &str) {
        let snap = self.chart.snapshot();
        match record::save_chart(&self.records_dir, &snap.label, tag, &snap.samples) {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.notify(format!("Saved {name}"), false);
            }
            Err(RecordError::NoData) => self.notify("No data", true),
            Err(e) => {
                warn!("save failed: {e}");
                self.notify(format!("Could not save the chart: {e}"), true);
            }
        }
    }

    fn open_saved(&mut self) {
        let suspension = self.chart.suspend();
        let saved = record::load_saved_charts(&self.records_dir);
        info!(
            "browsing {} saved charts ({} unreadable)",
            saved.charts.len(),
            saved.failures.len()
        );
        if !saved.failures.is_empty() {
            self.notify(format!("{} record(s) could not be read", saved.failures.len()), true);
        }
        self.screen = Screen::Saved {
            saved,
            selected: 0,
            suspension,
        };
    }

    fn close_saved(&mut self) {
        if let Screen::Saved { suspension, .. } = std::mem::replace(&mut self.screen, Screen::Live) {
            self.chart.resume(suspension);
        }
    }

    fn bottom_panel(&self) -> ParagraphPanel {
        if let Input::Tag(tag) = &self.input {
            return ParagraphPanel::new(&format!("Tag: {tag}_"), "Save chart (Enter=save, Esc=cancel)")
                .styled(Style::default().fg(Color::Yellow));
        }
        match &self.message {
            Some(m) if m.at.elapsed() < MESSAGE_TTL => {
                let color = if m.error { Color::Red } else { Color::Green };
                ParagraphPanel::new(&m.text, "Message").styled(Style::default().fg(color))
            }
            _ => {
                let help = match self.screen {
                    Screen::Live => LIVE_HELP,
                    Screen::Saved { .. } => SAVED_HELP,
                };
                ParagraphPanel::new(help, "Controls")
            }
        }
    }

    /// Build this frame's layout. Everything drawn is copied out of the
    /// shared chart first.
    fn layout(&self) -> Node {
        let (screen_name, body) = match &self.screen {
            Screen::Live => {
                let snap = self.chart.snapshot();
                let status = self.chart.status();
                let link = self
                    .feed
                    .as_ref()
                    .map_or_else(LinkView::detached, LinkView::of);
                let body = row(
                    vec![Constraint::Percentage(70), Constraint::Percentage(30)],
                    vec![
                        leaf(ChartPanel::live(&snap)),
                        column(
                            vec![Constraint::Length(5), Constraint::Min(3)],
                            vec![
                                leaf(StatusPanel::new(status, link)),
                                leaf(HistoryPanel::tail(&snap.samples, HISTORY_ROWS)),
                            ],
                        ),
                    ],
                );
                ("Live", body)
            }
            Screen::Saved {
                saved, selected, ..
            } => {
                let chart = match saved.charts.get(*selected) {
                    Some(c) => leaf(ChartPanel::saved(c)),
                    None => leaf(ParagraphPanel::new("Nothing selected", "Chart")),
                };
                let body = row(
                    vec![Constraint::Percentage(35), Constraint::Percentage(65)],
                    vec![leaf(SavedListPanel::new(saved, *selected)), chart],
                );
                ("Saved charts", body)
            }
        };

        column(
            vec![
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ],
            vec![
                leaf(TitlePanel::new(APP_TITLE, screen_name)),
                body,
                leaf(self.bottom_panel()),
            ],
        )
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cli.log_file)
        .wrap_err_with(|| format!("opening log file {}", cli.log_file.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str()))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Draw, handle input, sleep out the rest of the frame.
fn event_loop(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    frame_time: Duration,
) -> Result<()> {
    while app.is_running() {
        let frame_start = Instant::now();

        let root = app.layout();
        terminal.draw(|f| root.draw(f, f.area()))?;

        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                app.on_key(key);
            }
        }

        let elapsed = frame_start.elapsed();
        if elapsed < frame_time {
            thread::sleep(frame_time - elapsed);
        }
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let chart = SharedChart::new(&cli.chart_config(), Color::Cyan);
    let mut app = App::new(chart, cli.records_dir.clone());
    let source_cli = cli.clone();
    app.attach_feed(cli.feed_format(), move || source_cli.source())
        .wrap_err("starting the sample feed")?;
    info!("records in {}", cli.records_dir.display());

    let frame_time = Duration::from_millis(cli.update_period_ms);

    let mut terminal = ratatui::try_init().wrap_err("initializing the terminal")?;
    let res = event_loop(&mut terminal, &mut app, frame_time);
    ratatui::restore();

    // join the reader thread before exiting
    app.detach_feed();
    res
}
