//! src/feed/subscription.rs
//!
//! Attaching a sample source to a chart.
//!
//! The source runs on its own thread and pushes through a [`FeedSink`], which
//! decodes bytes and applies the resulting events to the chart under one lock
//! per chunk. [`Subscription::detach`] stops and joins that thread; the owner
//! must detach before dropping the chart it feeds.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{error, info};

use super::protocol::{FeedDecoder, FeedEvent, FeedFormat};
use super::source::SampleSource;
use crate::chart::SharedChart;
use crate::chart::live::LiveChart;

/// Link counters shared between the feed thread and the UI.
#[derive(Debug)]
pub struct LinkStats {
    base: Instant,
    connected: AtomicBool,
    /// ms after `base` at which the current connection came up
    since_ms: AtomicU64,
    bytes: AtomicU64,
    /// bytes per second since the connection came up
    bitrate: AtomicU64,
}

impl LinkStats {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            connected: AtomicBool::new(false),
            since_ms: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            bitrate: AtomicU64::new(0),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        if connected {
            self.since_ms
                .store(self.base.elapsed().as_millis() as u64, Ordering::Relaxed);
            self.bytes.store(0, Ordering::Relaxed);
            self.bitrate.store(0, Ordering::Relaxed);
        }
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Count `n` received bytes and refresh the bitrate.
    pub fn record(&self, n: usize) {
        let total = self.bytes.fetch_add(n as u64, Ordering::Relaxed) + n as u64;
        let now_ms = self.base.elapsed().as_millis() as u64;
        let elapsed_ms = now_ms.saturating_sub(self.since_ms.load(Ordering::Relaxed));
        if elapsed_ms > 0 {
            self.bitrate
                .store(total * 1000 / elapsed_ms, Ordering::Relaxed);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn bitrate(&self) -> u64 {
        self.bitrate.load(Ordering::Relaxed)
    }
}

impl Default for LinkStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply one event to the chart it was decoded for.
pub fn route(live: &mut LiveChart, event: FeedEvent) {
    match event {
        FeedEvent::Sample(s) => {
            live.append(s);
        }
        FeedEvent::Clock(tick) => live.sync_clock(tick),
        FeedEvent::Scale(scale) => live.rescale_y(scale),
    }
}

/// Where a source delivers what it reads.
pub struct FeedSink {
    chart: SharedChart,
    decoder: FeedDecoder,
    /// chart epoch the decoder state belongs to
    epoch: u64,
    link: Arc<LinkStats>,
    events: Vec<FeedEvent>,
}

impl FeedSink {
    pub fn new(chart: SharedChart, format: FeedFormat, link: Arc<LinkStats>) -> Self {
        let epoch = chart.epoch();
        Self {
            chart,
            decoder: FeedDecoder::new(format),
            epoch,
            link,
            events: Vec::new(),
        }
    }

    pub fn link(&self) -> &LinkStats {
        &self.link
    }

    /// Raw bytes off the wire.
    ///
    /// The epoch check, decoding and routing all happen under one chart lock,
    /// so a clear can never land between them.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.link.record(bytes.len());

        let Self {
            chart,
            decoder,
            epoch,
            events,
            ..
        } = self;
        chart.with(|c| {
            // a clear starts a new session: restart record numbering
            if c.live.epoch() != *epoch {
                decoder.reset();
                *epoch = c.live.epoch();
            }
            decoder.decode(bytes, events);
            for ev in events.drain(..) {
                route(&mut c.live, ev);
            }
        });
    }

    /// An already decoded event.
    pub fn push_event(&mut self, event: FeedEvent) {
        self.chart.with(|c| route(&mut c.live, event));
    }
}

/// A running source attached to a chart.
pub struct Subscription {
    name: String,
    stop: Arc<AtomicBool>,
    link: Arc<LinkStats>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn the reader thread for `source`, feeding `chart`.
    pub fn attach(
        mut source: Box<dyn SampleSource>,
        chart: SharedChart,
        format: FeedFormat,
    ) -> io::Result<Self> {
        let name = source.describe();
        let stop = Arc::new(AtomicBool::new(false));
        let link = Arc::new(LinkStats::new());
        let mut sink = FeedSink::new(chart, format, link.clone());

        let thread_stop = stop.clone();
        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name("feed".into())
            .spawn(move || {
                info!("feed attached: {}", thread_name);
                if let Err(e) = source.run(&mut sink, &thread_stop) {
                    error!("feed {} failed: {}", thread_name, e);
                }
                sink.link().set_connected(false);
                info!("feed stopped: {}", thread_name);
            })?;

        Ok(Self {
            name,
            stop,
            link,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn link(&self) -> &LinkStats {
        &self.link
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the source and wait for its thread.
    pub fn detach(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("feed thread for {} panicked", self.name);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
