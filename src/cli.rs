//! src/cli.rs
//!
//! Command-line options and their mapping onto chart/feed configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::chart::ChartConfig;
use crate::chart::config::{DEFAULT_LABEL, DEFAULT_PRESSURE_SCALE};
use crate::feed::source::DEFAULT_ADDR;
use crate::feed::{Dtype, Endian, FeedFormat, SampleSource, SerialSource, SimulatedSource, TcpSource};
use crate::record::RECORDS_DIR;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// `x,y` samples plus `clock`/`scale` lines
    Text,
    /// raw signed bytes
    I8,
    I16,
    I32,
    F32,
}

/// Live differential-pressure chart for a sensor link.
#[derive(Clone, Debug, Parser)]
#[command(name = "dp-monitor", version, about)]
pub struct Cli {
    /// Sensor gateway to connect to over TCP [default: 192.168.3.62:3333].
    #[arg(long, value_name = "ADDR", conflicts_with_all = ["serial", "simulate"])]
    pub connect: Option<String>,

    /// Read from a serial port instead of TCP.
    #[arg(long, value_name = "PORT", conflicts_with = "simulate")]
    pub serial: Option<String>,

    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,

    /// Generate a synthetic signal instead of reading a device.
    #[arg(long)]
    pub simulate: bool,

    /// Wire format of the sensor link.
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    pub format: FormatArg,

    /// Binary values are big endian (default little).
    #[arg(long)]
    pub big_endian: bool,

    /// Where records are saved and browsed.
    #[arg(long, value_name = "DIR", default_value = RECORDS_DIR)]
    pub records_dir: PathBuf,

    /// Samples kept on the live chart.
    #[arg(long, default_value_t = 2_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub keep_last: u64,

    /// Pressure scale divisor assumed until the sensor reports one.
    #[arg(long, default_value_t = DEFAULT_PRESSURE_SCALE, value_parser = clap::value_parser!(u32).range(1..))]
    pub scale: u32,

    /// Description written as the first line of saved records.
    #[arg(long, default_value = DEFAULT_LABEL)]
    pub label: String,

    /// Screen refresh period.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(10..))]
    pub update_period_ms: u64,

    /// Log file (the terminal belongs to the UI).
    #[arg(long, value_name = "PATH", default_value = "dp-monitor.log")]
    pub log_file: PathBuf,

    /// Log filter, overridden by RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn chart_config(&self) -> ChartConfig {
        ChartConfig::new(self.keep_last as usize, self.scale, &self.label)
    }

    pub fn feed_format(&self) -> FeedFormat {
        let endian = if self.big_endian {
            Endian::Big
        } else {
            Endian::Little
        };
        let dtype = match self.format {
            FormatArg::Text => return FeedFormat::Text,
            FormatArg::I8 => Dtype::I8,
            FormatArg::I16 => Dtype::I16,
            FormatArg::I32 => Dtype::I32,
            FormatArg::F32 => Dtype::F32,
        };
        FeedFormat::Binary { dtype, endian }
    }

    pub fn source(&self) -> Box<dyn SampleSource> {
        if self.simulate {
            Box::new(SimulatedSource::new(50.0))
        } else if let Some(port) = &self.serial {
            Box::new(SerialSource::new(port, self.baud))
        } else {
            Box::new(TcpSource::new(self.connect.as_deref().unwrap_or(DEFAULT_ADDR)))
        }
    }
}
