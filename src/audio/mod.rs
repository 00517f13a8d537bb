//! Audio staging between the streaming service and the output device
//!
//! Decoded audio arrives on a service thread that must never block. It is
//! cut into fixed-size frames and offered to a small bounded queue
//! ([`bridge`]); a dedicated writer thread ([`writer`]) drains the queue at the
//! device's pace and hands converted blocks to the [`device`].
//!
//! - `bridge`: the bounded frame queue (drop-on-full producer, blocking consumer)
//! - `writer`: the consumer thread and byte-to-sample conversion
//! - `device`: output device seam and its cpal implementation
//! - `sink`: librespot sink producing frames for the bridge

pub mod bridge;
pub mod device;
pub mod sink;
pub mod writer;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub use bridge::{audio_queue, FrameConsumer, FrameProducer};
pub use device::{CpalDevice, OutputDevice};
pub use sink::BridgeSink;
pub use writer::{decode_block, AudioOutput};

pub const CHANNELS: u16 = 2;
pub const SAMPLE_RATE: u32 = 44_100;
pub const BITS_PER_SAMPLE: u16 = 16;
/// Frames per channel handed to the device in one write
pub const BLOCK_FRAMES: usize = 2048;

/// Layout of the samples carried by a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self {
            channels: CHANNELS,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: BITS_PER_SAMPLE,
        }
    }
}

/// One unit of decoded audio: interleaved s16le samples plus their format
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFrame {
    pub format: FrameFormat,
    payload: Vec<u8>,
}

impl AudioFrame {
    pub fn new(format: FrameFormat, payload: Vec<u8>) -> Self {
        Self { format, payload }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// The fixed configuration the output device is opened with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: FrameFormat,
    pub block_frames: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: FrameFormat::default(),
            block_frames: BLOCK_FRAMES,
        }
    }
}

impl OutputConfig {
    /// Interleaved samples per block
    pub fn block_samples(&self) -> usize {
        self.block_frames * usize::from(self.format.channels)
    }

    pub fn block_bytes(&self) -> usize {
        self.block_samples() * usize::from(self.format.bits_per_sample / 8)
    }

    /// Wall time one block takes to play
    pub fn block_period(&self) -> Duration {
        Duration::from_secs_f64(self.block_frames as f64 / f64::from(self.format.sample_rate))
    }
}

/// Counters shared by the producer and consumer sides of the bridge
#[derive(Debug, Default)]
pub struct AudioStats {
    written: AtomicU64,
    discarded: AtomicU64,
    refused: AtomicU64,
    dropped: AtomicU64,
}

impl AudioStats {
    /// Blocks accepted by the output device
    pub fn frames_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Frames thrown away by the writer because their length did not match a block
    pub fn frames_discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Offers refused because the queue was full. A frame that is offered
    /// again later counts once per refused attempt.
    pub fn offer_refusals(&self) -> u64 {
        self.refused.load(Ordering::Relaxed)
    }

    /// Frames the producer gave up on; they never reached the queue
    pub fn frames_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self) -> u64 {
        self.discarded.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_refused(&self) {
        self.refused.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_block_geometry() {
        let config = OutputConfig::default();
        assert_eq!(config.block_samples(), 4096);
        assert_eq!(config.block_bytes(), 8192);
        let period = config.block_period().as_secs_f64();
        assert!((period - 0.046_44).abs() < 0.000_1);
    }
}
