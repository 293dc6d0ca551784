//! src/feed/protocol.rs
//!
//! Decoding of the sensor link byte stream into feed events.
//!
//! Two framings are supported. The text framing carries one message per line:
//!
//! ```text
//! 0.250000,12.5000     sample: x seconds, y value
//! clock 1500000        device clock tick, microseconds
//! scale 120            new pressure scale divisor
//! # comment
//! ```
//!
//! The binary framing is a bare stream of fixed-size values; each value becomes
//! a sample whose `x` is its running record index.

use log::{debug, warn};

use crate::chart::Sample;
use crate::record::parse_pair;

/// Longest text line kept while waiting for its newline.
const MAX_LINE: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeedEvent {
    Sample(Sample),
    Clock(u64),
    Scale(u32),
}

/// Value type of the binary framing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dtype {
    /// raw signed bytes
    I8,
    I16,
    I32,
    F32,
}

impl Dtype {
    pub fn size(self) -> usize {
        match self {
            Dtype::I8 => 1,
            Dtype::I16 => 2,
            Dtype::I32 => 4,
            Dtype::F32 => 4,
        }
    }

    /// `b` is exactly `self.size()` bytes long.
    fn value(self, b: &[u8], endian: Endian) -> f64 {
        match (self, endian) {
            (Dtype::I8, _) => b[0] as i8 as f64,
            (Dtype::I16, Endian::Little) => i16::from_le_bytes([b[0], b[1]]) as f64,
            (Dtype::I16, Endian::Big) => i16::from_be_bytes([b[0], b[1]]) as f64,
            (Dtype::I32, Endian::Little) => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            (Dtype::I32, Endian::Big) => i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64,
            (Dtype::F32, Endian::Little) => f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            (Dtype::F32, Endian::Big) => f32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeedFormat {
    #[default]
    Text,
    Binary { dtype: Dtype, endian: Endian },
}

/// Parse one text line (already trimmed, not a comment).
pub fn parse_line(line: &str) -> Option<FeedEvent> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.first()?.to_lowercase().as_str() {
        "clock" if parts.len() == 2 => parts[1].parse().ok().map(FeedEvent::Clock),
        "scale" if parts.len() == 2 => parts[1].parse().ok().map(FeedEvent::Scale),
        _ => parse_pair(line).map(|(x, y)| FeedEvent::Sample(Sample::new(x, y))),
    }
}

/// Reassembles chunked bytes into events.
#[derive(Debug)]
pub struct FeedDecoder {
    format: FeedFormat,
    /// bytes of an incomplete line / value carried to the next chunk
    pending: Vec<u8>,
    record_id: u64,
}

impl FeedDecoder {
    pub fn new(format: FeedFormat) -> Self {
        Self {
            format,
            pending: Vec::new(),
            record_id: 0,
        }
    }

    /// Forget partial input and restart the record index.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.record_id = 0;
    }

    /// Decode a chunk, appending complete events to `out`.
    pub fn decode(&mut self, bytes: &[u8], out: &mut Vec<FeedEvent>) {
        self.pending.extend_from_slice(bytes);
        match self.format {
            FeedFormat::Text => self.decode_lines(out),
            FeedFormat::Binary { dtype, endian } => self.decode_values(dtype, endian, out),
        }
    }

    fn decode_lines(&mut self, out: &mut Vec<FeedEvent>) {
        let mut consumed = 0;
        while let Some(nl) = self.pending[consumed..].iter().position(|&b| b == b'\n') {
            let raw = String::from_utf8_lossy(&self.pending[consumed..consumed + nl]);
            let line = raw.trim();
            if !line.is_empty() && !line.starts_with('#') {
                match parse_line(line) {
                    Some(ev) => out.push(ev),
                    None => debug!("unrecognized feed line {:?}", line),
                }
            }
            consumed += nl + 1;
        }
        self.pending.drain(..consumed);

        if self.pending.len() > MAX_LINE {
            warn!("dropping {} bytes without a newline", self.pending.len());
            self.pending.clear();
        }
    }

    fn decode_values(&mut self, dtype: Dtype, endian: Endian, out: &mut Vec<FeedEvent>) {
        let size = dtype.size();
        let whole = self.pending.len() / size * size;
        for chunk in self.pending[..whole].chunks_exact(size) {
            let y = dtype.value(chunk, endian);
            out.push(FeedEvent::Sample(Sample::new(self.record_id as f64, y)));
            self.record_id += 1;
        }
        self.pending.drain(..whole);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut FeedDecoder, chunks: &[&[u8]]) -> Vec<FeedEvent> {
        let mut out = Vec::new();
        for chunk in chunks {
            decoder.decode(chunk, &mut out);
        }
        out
    }

    fn sample(x: f64, y: f64) -> FeedEvent {
        FeedEvent::Sample(Sample::new(x, y))
    }

    #[test]
    fn parses_text_messages() {
        assert_eq!(parse_line("0.5,12.25"), Some(sample(0.5, 12.25)));
        assert_eq!(parse_line("clock 1500000"), Some(FeedEvent::Clock(1_500_000)));
        assert_eq!(parse_line("SCALE 120"), Some(FeedEvent::Scale(120)));
        assert_eq!(parse_line("scale -1"), None);
        assert_eq!(parse_line("clock"), None);
        assert_eq!(parse_line("hello"), None);
    }

    #[test]
    fn text_lines_survive_chunk_boundaries() {
        let mut d = FeedDecoder::new(FeedFormat::Text);
        let events = decode_all(
            &mut d,
            &[
                &b"0.0,1.0\n0.5,"[..],
                &b"2.0\r\nclo"[..],
                &b"ck 10\n# note\n\nbogus\nscale 30\n1.0,3"[..],
            ],
        );
        assert_eq!(
            events,
            vec![
                sample(0.0, 1.0),
                sample(0.5, 2.0),
                FeedEvent::Clock(10),
                FeedEvent::Scale(30),
            ]
        );
        // the unterminated sample is emitted once its newline arrives
        assert_eq!(decode_all(&mut d, &[&b"\n"[..]]), vec![sample(1.0, 3.0)]);
    }

    #[test]
    fn overlong_line_is_dropped() {
        let mut d = FeedDecoder::new(FeedFormat::Text);
        let junk = vec![b'x'; MAX_LINE + 1];
        assert!(decode_all(&mut d, &[junk.as_slice()]).is_empty());
        assert_eq!(decode_all(&mut d, &[&b"1.0,2.0\n"[..]]), vec![sample(1.0, 2.0)]);
    }

    #[test]
    fn raw_bytes_are_signed() {
        let mut d = FeedDecoder::new(FeedFormat::Binary {
            dtype: Dtype::I8,
            endian: Endian::Little,
        });
        let events = decode_all(&mut d, &[&[1u8, 0xff, 0x80][..]]);
        assert_eq!(
            events,
            vec![sample(0.0, 1.0), sample(1.0, -1.0), sample(2.0, -128.0)]
        );
    }

    #[test]
    fn binary_values_split_across_chunks() {
        let mut d = FeedDecoder::new(FeedFormat::Binary {
            dtype: Dtype::I16,
            endian: Endian::Little,
        });
        let bytes: Vec<u8> = [300i16, -2, 7].iter().flat_map(|v| v.to_le_bytes()).collect();
        let events = decode_all(&mut d, &[&bytes[..3], &bytes[3..]]);
        assert_eq!(
            events,
            vec![sample(0.0, 300.0), sample(1.0, -2.0), sample(2.0, 7.0)]
        );
    }

    #[test]
    fn big_endian_floats() {
        let mut d = FeedDecoder::new(FeedFormat::Binary {
            dtype: Dtype::F32,
            endian: Endian::Big,
        });
        let bytes: Vec<u8> = [1.5f32, -0.25].iter().flat_map(|v| v.to_be_bytes()).collect();
        assert_eq!(
            decode_all(&mut d, &[bytes.as_slice()]),
            vec![sample(0.0, 1.5), sample(1.0, -0.25)]
        );
    }

    #[test]
    fn reset_restarts_record_index() {
        let mut d = FeedDecoder::new(FeedFormat::Binary {
            dtype: Dtype::I32,
            endian: Endian::Big,
        });
        let mut bytes = 5i32.to_be_bytes().to_vec();
        bytes.push(0);
        assert_eq!(decode_all(&mut d, &[bytes.as_slice()]), vec![sample(0.0, 5.0)]);
        d.reset();
        assert_eq!(
            decode_all(&mut d, &[&9i32.to_be_bytes()[..]]),
            vec![sample(0.0, 9.0)]
        );
    }
}
