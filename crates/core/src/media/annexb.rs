//! H.264 Annex B byte streams (ITU-T H.264 Annex B).
//!
//! NAL units are delimited by 3-byte (`00 00 01`) or 4-byte
//! (`00 00 00 01`) start codes. [`AnnexBSource`] turns a whole stream into
//! one [`Frame`] per NAL unit, with the start code removed, which is the
//! single-NAL-unit payload format (RFC 6184 §5.6).

use super::{Frame, FrameSource};

/// RTP clock rate for video.
pub const CLOCK_RATE: u64 = 90_000;

pub const NAL_SLICE: u8 = 1;
pub const NAL_IDR: u8 = 5;
pub const NAL_SPS: u8 = 7;

/// Split an Annex B byte stream into NAL units, without start codes.
pub fn split_nal_units(data: &[u8]) -> Vec<&[u8]> {
    let mut nal_units = Vec::new();
    let mut i = 0usize;

    // (nal_data_start_index, start_code_length)
    let mut start_entries: Vec<(usize, usize)> = Vec::new();

    while i < data.len() {
        if i + 3 < data.len() && data[i..i + 4] == [0, 0, 0, 1] {
            start_entries.push((i + 4, 4));
            i += 4;
        } else if i + 2 < data.len() && data[i..i + 3] == [0, 0, 1] {
            start_entries.push((i + 3, 3));
            i += 3;
        } else {
            i += 1;
        }
    }

    for (idx, &(start, _)) in start_entries.iter().enumerate() {
        let end = match start_entries.get(idx + 1) {
            Some(&(next_start, next_sc_len)) => next_start - next_sc_len,
            None => data.len(),
        };
        if start < end {
            nal_units.push(&data[start..end]);
        }
    }

    nal_units
}

/// `nal_unit_type` from the first header byte.
pub fn nal_type(nal: &[u8]) -> Option<u8> {
    nal.first().map(|b| b & 0x1F)
}

/// Frames from an in-memory Annex B stream.
///
/// Timestamps are in 90 kHz units and advance by one frame interval after
/// each coded slice (types 1..=5), so parameter sets share the timestamp of
/// the picture that follows them. SPS and IDR units are flagged as
/// keyframes.
#[derive(Debug)]
pub struct AnnexBSource {
    nal_units: Vec<Vec<u8>>,
    position: usize,
    timestamp: u64,
    ticks_per_frame: u64,
    looping: bool,
}

impl AnnexBSource {
    pub fn new(data: &[u8], fps: u32, looping: bool) -> Self {
        Self {
            nal_units: split_nal_units(data).into_iter().map(<[u8]>::to_vec).collect(),
            position: 0,
            timestamp: 0,
            ticks_per_frame: CLOCK_RATE / u64::from(fps.max(1)),
            looping,
        }
    }

    pub fn len(&self) -> usize {
        self.nal_units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nal_units.is_empty()
    }

    /// Move back to the first SPS or IDR unit so the next frame starts a
    /// decodable sequence. The timestamp keeps running.
    pub fn rewind_to_keyframe(&mut self) {
        self.position = self
            .nal_units
            .iter()
            .position(|nal| is_keyframe(nal))
            .unwrap_or(0);
    }
}

fn is_keyframe(nal: &[u8]) -> bool {
    matches!(nal_type(nal), Some(NAL_IDR | NAL_SPS))
}

impl FrameSource for AnnexBSource {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.position >= self.nal_units.len() {
            if !self.looping || self.nal_units.is_empty() {
                return None;
            }
            self.position = 0;
        }

        let nal = &self.nal_units[self.position];
        self.position += 1;

        let frame = Frame::new(self.timestamp, is_keyframe(nal), nal.clone());
        if matches!(nal_type(nal), Some(NAL_SLICE..=NAL_IDR)) {
            self.timestamp += self.ticks_per_frame;
        }
        Some(frame)
    }
}
