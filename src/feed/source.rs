//! src/feed/source.rs
//!
//! Sample sources: where the bytes come from.

use std::f64::consts::TAU;
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::Rng;

use super::protocol::FeedEvent;
use super::subscription::FeedSink;
use crate::chart::Sample;
use crate::chart::config::DEFAULT_PRESSURE_SCALE;

/// Sensor gateway address used when none is given.
pub const DEFAULT_ADDR: &str = "192.168.3.62:3333";

/// How often a blocked read gives the stop flag a look.
const POLL: Duration = Duration::from_millis(200);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_BUFFER: usize = 5000;

/// Something that produces feed input until told to stop.
pub trait SampleSource: Send {
    /// Human-readable origin, e.g. `tcp 192.168.3.62:3333`.
    fn describe(&self) -> String;

    /// Read until `stop` is set or the link ends.
    fn run(&mut self, sink: &mut FeedSink, stop: &AtomicBool) -> io::Result<()>;
}

/// Copy from `reader` into `sink` until stopped or end of stream.
fn pump<R: Read>(reader: &mut R, sink: &mut FeedSink, stop: &AtomicBool) -> io::Result<()> {
    let mut buf = [0u8; READ_BUFFER];
    while !stop.load(Ordering::Relaxed) {
        match reader.read(&mut buf) {
            Ok(0) => {
                info!("link closed by peer");
                break;
            }
            Ok(n) => sink.push_bytes(&buf[..n]),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// TCP client to the sensor gateway.
pub struct TcpSource {
    addr: String,
}

impl TcpSource {
    pub fn new(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
        }
    }
}

impl SampleSource for TcpSource {
    fn describe(&self) -> String {
        format!("tcp {}", self.addr)
    }

    fn run(&mut self, sink: &mut FeedSink, stop: &AtomicBool) -> io::Result<()> {
        let addr = self.addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("no address for {}", self.addr))
        })?;
        info!("connecting to {}", addr);
        let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        stream.set_read_timeout(Some(POLL))?;
        info!("socket opened to {}", addr);
        sink.link().set_connected(true);

        let res = pump(&mut stream, sink, stop);
        let _ = stream.shutdown(std::net::Shutdown::Both);
        info!("socket closed");
        res
    }
}

/// Serial port, e.g. `/dev/ttyACM0`.
pub struct SerialSource {
    port: String,
    baud: u32,
}

impl SerialSource {
    pub fn new(port: &str, baud: u32) -> Self {
        Self {
            port: port.to_string(),
            baud,
        }
    }
}

impl SampleSource for SerialSource {
    fn describe(&self) -> String {
        format!("serial {} @ {}", self.port, self.baud)
    }

    fn run(&mut self, sink: &mut FeedSink, stop: &AtomicBool) -> io::Result<()> {
        info!("opening serial port {} @ {} baud", self.port, self.baud);
        let mut port = serialport::new(&self.port, self.baud)
            .timeout(POLL)
            .open()
            .map_err(io::Error::from)?;
        sink.link().set_connected(true);
        pump(&mut port, sink, stop)
    }
}

/// Synthetic differential-pressure signal for running without hardware.
///
/// Emits samples at `rate_hz`, a drifting device clock tick every second and
/// a pressure-scale switch every twenty seconds.
pub struct SimulatedSource {
    rate_hz: f64,
}

impl SimulatedSource {
    pub fn new(rate_hz: f64) -> Self {
        Self {
            rate_hz: rate_hz.clamp(1.0, 1000.0),
        }
    }
}

impl SampleSource for SimulatedSource {
    fn describe(&self) -> String {
        format!("simulated {:.0} Hz", self.rate_hz)
    }

    fn run(&mut self, sink: &mut FeedSink, stop: &AtomicBool) -> io::Result<()> {
        let mut rng = rand::rng();
        let period = Duration::from_secs_f64(1.0 / self.rate_hz);
        let start = Instant::now();
        let mut scale = DEFAULT_PRESSURE_SCALE;
        let mut last_tick_s = 0u64;
        // device clock runs 200 ppm fast
        let drift = 200e-6;

        sink.link().set_connected(true);
        while !stop.load(Ordering::Relaxed) {
            let t = start.elapsed().as_secs_f64();
            let whole_s = t as u64;

            if whole_s != last_tick_s {
                last_tick_s = whole_s;
                let tick_us = (t * drift * 1e6) as u64;
                sink.push_event(FeedEvent::Clock(tick_us));

                if whole_s % 20 == 0 {
                    scale = if scale == DEFAULT_PRESSURE_SCALE {
                        2 * DEFAULT_PRESSURE_SCALE
                    } else {
                        DEFAULT_PRESSURE_SCALE
                    };
                    debug!("simulated scale switch to {}", scale);
                    sink.push_event(FeedEvent::Scale(scale));
                }
            }

            let pressure = 25.0 * (TAU * 0.2 * t).sin()
                + 8.0 * (TAU * 1.3 * t).sin()
                + rng.random_range(-1.5..1.5);
            let y = pressure * DEFAULT_PRESSURE_SCALE as f64 / scale as f64;
            sink.push_event(FeedEvent::Sample(Sample::new(t, y)));

            thread::sleep(period);
        }
        Ok(())
    }
}
