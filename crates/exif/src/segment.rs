//! JPEG segment list.
//!
//! A JPEG file is a sequence of marker segments. `SegmentList::parse` keeps
//! the exact bytes of each one (including the entropy-coded data that
//! follows SOS) so that serializing an untouched list reproduces the input.

use crate::error::ParseError;
use std::io::{self, Write};
use std::ops::Range;

/// Start of image
pub const SOI: u8 = 0xD8;
/// End of image
pub const EOI: u8 = 0xD9;
/// Start of scan
pub const SOS: u8 = 0xDA;
/// APP1 (EXIF / XMP)
pub const APP1: u8 = 0xE1;
/// Temporary private use, no length field
const TEM: u8 = 0x01;

/// Identifier at the start of an EXIF APP1 payload.
pub const EXIF_IDENTIFIER: &[u8; 6] = b"Exif\0\0";

/// One marker segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Marker byte following 0xFF
    pub marker: u8,
    /// Offset of the segment's first byte in the parsed data
    pub offset: usize,
    raw: Vec<u8>,
    payload: Range<usize>,
}

impl Segment {
    /// Exact bytes as they appeared in the file.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Bytes after the marker and length field, up to the declared length.
    pub fn payload(&self) -> &[u8] {
        &self.raw[self.payload.clone()]
    }

    /// Entropy-coded data following an SOS header (empty for other markers).
    pub fn scan_data(&self) -> &[u8] {
        &self.raw[self.payload.end..]
    }

    /// Whether this is an APP1 segment carrying EXIF.
    pub fn is_exif(&self) -> bool {
        self.marker == APP1 && self.payload().starts_with(EXIF_IDENTIFIER)
    }

    /// Conventional marker name (`SOI`, `APP1`, `DQT`, ...).
    pub fn name(&self) -> String {
        marker_name(self.marker)
    }
}

/// Ordered segments of a JPEG plus any bytes trailing EOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentList {
    segments: Vec<Segment>,
    trailer: Vec<u8>,
}

impl SegmentList {
    /// Split `data` into segments.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < 2 || data[0] != 0xFF || data[1] != SOI {
            return Err(ParseError::NotJpeg);
        }

        let mut segments = vec![Segment {
            marker: SOI,
            offset: 0,
            raw: data[..2].to_vec(),
            payload: 2..2,
        }];
        let mut pos = 2;

        loop {
            let start = pos;

            if pos >= data.len() {
                return Err(ParseError::MissingEoi);
            }
            if data[pos] != 0xFF {
                return Err(ParseError::UnexpectedByte { offset: pos, byte: data[pos] });
            }

            // Fill bytes: any number of 0xFF before the marker byte
            while pos < data.len() && data[pos] == 0xFF {
                pos += 1;
            }
            if pos >= data.len() {
                return Err(ParseError::Truncated { offset: pos });
            }

            let marker = data[pos];
            pos += 1;

            if marker == EOI {
                segments.push(Segment {
                    marker,
                    offset: start,
                    raw: data[start..pos].to_vec(),
                    payload: (pos - start)..(pos - start),
                });
                return Ok(Self {
                    segments,
                    trailer: data[pos..].to_vec(),
                });
            }

            if is_standalone(marker) {
                segments.push(Segment {
                    marker,
                    offset: start,
                    raw: data[start..pos].to_vec(),
                    payload: (pos - start)..(pos - start),
                });
                continue;
            }

            if pos + 2 > data.len() {
                return Err(ParseError::Truncated { offset: pos });
            }
            let length = usize::from(u16::from_be_bytes([data[pos], data[pos + 1]]));
            if length < 2 || pos + length > data.len() {
                return Err(ParseError::InvalidSegmentLength {
                    marker,
                    offset: start,
                    length,
                });
            }

            let payload_start = pos + 2 - start;
            pos += length;
            let payload_end = pos - start;

            if marker == SOS {
                pos = scan_end(data, pos);
            }

            segments.push(Segment {
                marker,
                offset: start,
                raw: data[start..pos].to_vec(),
                payload: payload_start..payload_end,
            });
        }
    }

    /// Segments in file order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Bytes after EOI.
    pub fn trailer(&self) -> &[u8] {
        &self.trailer
    }

    /// Index and TIFF data (after `Exif\0\0`) of the first EXIF segment.
    pub fn exif(&self) -> Option<(usize, &[u8])> {
        self.segments
            .iter()
            .enumerate()
            .find(|(_, s)| s.is_exif())
            .map(|(i, s)| (i, &s.payload()[EXIF_IDENTIFIER.len()..]))
    }

    /// Remove every EXIF segment; returns how many were removed.
    pub fn drop_exif(&mut self) -> usize {
        let before = self.segments.len();
        self.segments.retain(|s| !s.is_exif());
        before - self.segments.len()
    }

    /// Serialize to a writer.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        for segment in &self.segments {
            w.write_all(&segment.raw)?;
        }
        w.write_all(&self.trailer)
    }

    /// Serialize to a new buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.segments.iter().map(|s| s.raw.len()).sum::<usize>() + self.trailer.len();
        let mut out = Vec::with_capacity(len);
        for segment in &self.segments {
            out.extend_from_slice(&segment.raw);
        }
        out.extend_from_slice(&self.trailer);
        out
    }
}

/// Markers that carry no length field.
fn is_standalone(marker: u8) -> bool {
    marker == SOI || marker == TEM || (0xD0..=0xD7).contains(&marker)
}

/// End of the entropy-coded data starting at `pos`.
///
/// Stops at the first 0xFF that begins a real marker: stuffed zeros,
/// restart markers and fill bytes belong to the scan.
fn scan_end(data: &[u8], mut pos: usize) -> usize {
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let mut next = pos + 1;
        while next < data.len() && data[next] == 0xFF {
            next += 1;
        }
        if next >= data.len() {
            return data.len();
        }

        let byte = data[next];
        if byte == 0x00 || (0xD0..=0xD7).contains(&byte) {
            pos = next + 1;
        } else {
            return pos;
        }
    }
    data.len()
}

/// Conventional name of a JPEG marker.
pub fn marker_name(marker: u8) -> String {
    match marker {
        SOI => "SOI".into(),
        EOI => "EOI".into(),
        SOS => "SOS".into(),
        0xC4 => "DHT".into(),
        0xCC => "DAC".into(),
        0xDB => "DQT".into(),
        0xDD => "DRI".into(),
        0xFE => "COM".into(),
        TEM => "TEM".into(),
        0xC0..=0xCF => format!("SOF{}", marker - 0xC0),
        0xD0..=0xD7 => format!("RST{}", marker - 0xD0),
        0xE0..=0xEF => format!("APP{}", marker - 0xE0),
        other => format!("0x{:02X}", other),
    }
}
