//! Compact binary encoding for events.
//!
//! # Wire Format
//!
//! Fields are written in order, integers as varints (LEB128, 7 bits per
//! byte, high bit = continuation; signed values are zig-zag mapped first):
//!
//! ```text
//! uvarint  id
//! uvarint  timeline
//! varint   timestamp seconds (Unix)
//! varint   timestamp nanoseconds
//! varint   receive_time seconds (Unix)
//! varint   receive_time nanoseconds
//! varint   len(kind)   + kind bytes (UTF-8)
//! varint   len(data)   + data bytes
//! ```
//!
//! Length prefixes are bounds-checked against the remaining buffer before
//! any payload byte is read.

use super::{Event, Timestamp};
use crate::error::{EventError, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Appends `value` as an unsigned varint.
pub fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push(value as u8 | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Appends `value` as a zig-zag signed varint.
pub fn put_varint(buf: &mut Vec<u8>, value: i64) {
    put_uvarint(buf, zigzag(value));
}

/// Returns the number of bytes `value` occupies as an unsigned varint.
pub fn uvarint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Returns the number of bytes `value` occupies as a signed varint.
pub fn varint_len(value: i64) -> usize {
    uvarint_len(zigzag(value))
}

fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Borrowed view of a decoded event.
///
/// `kind` and `data` point into the decoded buffer. Use
/// [`EventView::to_event`] for an independent copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventView<'a> {
    /// Event id.
    pub id: u64,
    /// Owning timeline id.
    pub timeline: u64,
    /// Event time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Admission time (UTC).
    pub receive_time: DateTime<Utc>,
    /// Kind label, borrowed from the input.
    pub kind: &'a str,
    /// Payload, borrowed from the input.
    pub data: &'a [u8],
}

impl<'a> EventView<'a> {
    /// Decodes one event from `bytes`.
    ///
    /// Trailing bytes after the event are ignored; use
    /// [`EventView::decode_prefix`] to learn where the event ends.
    pub fn decode(bytes: &'a [u8]) -> Result<Self> {
        Self::decode_prefix(bytes).map(|(view, _)| view)
    }

    /// Decodes one event from the front of `bytes`.
    ///
    /// Returns the view and the number of bytes consumed, so concatenated
    /// events can be decoded one after another.
    pub fn decode_prefix(bytes: &'a [u8]) -> Result<(Self, usize)> {
        let mut reader = Reader::new(bytes);
        let decoded = reader.event();
        match decoded {
            Ok(view) => Ok((view, reader.pos)),
            Err(err) => {
                debug!("Failed to decode event at offset {}: {}", reader.pos, err);
                Err(err)
            }
        }
    }

    /// Copies the view into an owned [`Event`].
    pub fn to_event(&self) -> Event {
        Event::new(
            self.id,
            self.timeline,
            self.kind,
            self.timestamp,
            self.receive_time,
            self.data,
        )
    }
}

impl Event {
    /// Encodes the event into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns `EventError::NonUtcTimestamp` if `timestamp` or
    /// `receive_time` is not in UTC, and `EventError::LeapSecond` if either
    /// falls on a leap second (decoding would fold it into the next second).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Appends the encoded event to `buf`.
    ///
    /// `buf` is left untouched when an error is returned.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<()> {
        check_encodable("timestamp", &self.timestamp)?;
        check_encodable("receive_time", &self.receive_time)?;

        put_uvarint(buf, self.id);
        put_uvarint(buf, self.timeline);
        put_varint(buf, self.timestamp.timestamp());
        put_varint(buf, i64::from(self.timestamp.timestamp_subsec_nanos()));
        put_varint(buf, self.receive_time.timestamp());
        put_varint(buf, i64::from(self.receive_time.timestamp_subsec_nanos()));

        put_varint(buf, self.kind.len() as i64);
        buf.extend_from_slice(self.kind.as_bytes());

        put_varint(buf, self.data.len() as i64);
        buf.extend_from_slice(&self.data);
        Ok(())
    }

    /// Returns the exact number of bytes [`Event::encode`] produces.
    pub fn encoded_len(&self) -> usize {
        uvarint_len(self.id)
            + uvarint_len(self.timeline)
            + varint_len(self.timestamp.timestamp())
            + varint_len(i64::from(self.timestamp.timestamp_subsec_nanos()))
            + varint_len(self.receive_time.timestamp())
            + varint_len(i64::from(self.receive_time.timestamp_subsec_nanos()))
            + varint_len(self.kind.len() as i64)
            + self.kind.len()
            + varint_len(self.data.len() as i64)
            + self.data.len()
    }

    /// Decodes an owned event, copying `kind` and `data` out of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        EventView::decode(bytes).map(|view| view.to_event())
    }
}

fn check_encodable(field: &'static str, ts: &Timestamp) -> Result<()> {
    let offset_secs = ts.offset().local_minus_utc();
    if offset_secs != 0 {
        return Err(EventError::NonUtcTimestamp { field, offset_secs });
    }
    // chrono marks a leap second with subsec nanos >= 1e9.
    if i64::from(ts.timestamp_subsec_nanos()) >= NANOS_PER_SEC {
        return Err(EventError::LeapSecond { field });
    }
    Ok(())
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn event(&mut self) -> Result<EventView<'a>> {
        let id = self.uvarint("id")?;
        let timeline = self.uvarint("timeline")?;
        let timestamp = self.timestamp("timestamp")?;
        let receive_time = self.timestamp("receive_time")?;
        let kind = std::str::from_utf8(self.bytes("kind")?)?;
        let data = self.bytes("data")?;

        Ok(EventView {
            id,
            timeline,
            timestamp,
            receive_time,
            kind,
            data,
        })
    }

    fn uvarint(&mut self, field: &'static str) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        let buf = self.buf;
        for (i, &byte) in buf[self.pos..].iter().enumerate() {
            if i == MAX_VARINT_LEN {
                return Err(EventError::VarintOverflow { field });
            }
            if byte < 0x80 {
                if i == MAX_VARINT_LEN - 1 && byte > 1 {
                    return Err(EventError::VarintOverflow { field });
                }
                self.pos += i + 1;
                return Ok(value | u64::from(byte) << shift);
            }
            value |= u64::from(byte & 0x7f) << shift;
            shift += 7;
        }
        Err(EventError::Truncated { field })
    }

    fn varint(&mut self, field: &'static str) -> Result<i64> {
        self.uvarint(field).map(unzigzag)
    }

    fn bytes(&mut self, field: &'static str) -> Result<&'a [u8]> {
        let declared = self.varint(field)?;
        let remaining = self.buf.len() - self.pos;
        if declared < 0 || declared as u64 > remaining as u64 {
            return Err(EventError::MalformedLength {
                field,
                declared,
                remaining,
            });
        }

        let start = self.pos;
        self.pos += declared as usize;
        Ok(&self.buf[start..self.pos])
    }

    /// Reads seconds + nanoseconds, normalizing nanoseconds into `[0, 1e9)`.
    fn timestamp(&mut self, field: &'static str) -> Result<DateTime<Utc>> {
        let seconds = self.varint(field)?;
        let nanos = self.varint(field)?;
        let out_of_range = EventError::TimestampOutOfRange {
            field,
            seconds,
            nanos,
        };

        let secs = seconds
            .checked_add(nanos.div_euclid(NANOS_PER_SEC))
            .ok_or_else(|| out_of_range.clone())?;
        let subsec = nanos.rem_euclid(NANOS_PER_SEC) as u32;
        DateTime::from_timestamp(secs, subsec).ok_or(out_of_range)
    }
}
