//! librespot sink feeding decoded audio into the frame queue

use std::thread;
use std::time::Duration;

use librespot::playback::audio_backend::{Sink, SinkError, SinkResult};
use librespot::playback::convert::Converter;
use librespot::playback::decoder::AudioPacket;

use super::bridge::FrameProducer;
use super::{AudioFrame, OutputConfig};

/// Cuts the player's s16le output into block-sized frames and offers them to
/// the queue. A frame the queue refuses is offered again after half a block
/// period, until the writer side has gone away.
pub struct BridgeSink {
    producer: FrameProducer,
    config: OutputConfig,
    pending: Vec<u8>,
    retry_after: Duration,
}

impl BridgeSink {
    pub fn new(producer: FrameProducer, config: OutputConfig) -> Self {
        Self {
            producer,
            config,
            pending: Vec::with_capacity(config.block_bytes() * 2),
            retry_after: config.block_period() / 2,
        }
    }

    /// Append samples, delivering every completed block
    fn push_samples(&mut self, samples: &[i16]) {
        for sample in samples {
            self.pending.extend_from_slice(&sample.to_le_bytes());
        }

        let block_bytes = self.config.block_bytes();
        while self.pending.len() >= block_bytes {
            let payload: Vec<u8> = self.pending.drain(..block_bytes).collect();
            self.deliver(AudioFrame::new(self.config.format, payload));
        }
    }

    /// Hand over whatever is left as a short frame
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let payload = std::mem::take(&mut self.pending);
        self.deliver(AudioFrame::new(self.config.format, payload));
    }

    fn deliver(&self, frame: AudioFrame) {
        loop {
            if self.producer.offer(frame.clone()) > 0 {
                return;
            }
            if self.producer.is_closed() {
                self.producer.drop_frame(frame);
                return;
            }
            thread::sleep(self.retry_after);
        }
    }
}

impl Sink for BridgeSink {
    fn start(&mut self) -> SinkResult<()> {
        self.pending.clear();
        Ok(())
    }

    fn stop(&mut self) -> SinkResult<()> {
        self.flush();
        Ok(())
    }

    fn write(&mut self, packet: AudioPacket, converter: &mut Converter) -> SinkResult<()> {
        let samples = packet
            .samples()
            .map_err(|e| SinkError::OnWrite(e.to_string()))?;
        let samples = converter.f64_to_s16(samples);
        self.push_samples(&samples);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::bridge::audio_queue;
    use crate::audio::{AudioStats, FrameFormat};
    use std::sync::Arc;

    fn tiny_config() -> OutputConfig {
        OutputConfig {
            format: FrameFormat::default(),
            block_frames: 2,
        }
    }

    #[test]
    fn samples_are_cut_into_exact_blocks() {
        let (producer, mut consumer) = audio_queue(8, Arc::default());
        let mut sink = BridgeSink::new(producer, tiny_config());

        sink.push_samples(&[1, 2, 3]);
        sink.push_samples(&[4, 5, 6, 7, 8, 9]);
        sink.flush();
        drop(sink);

        let frames: Vec<AudioFrame> = std::iter::from_fn(|| consumer.take()).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload(), [1, 0, 2, 0, 3, 0, 4, 0]);
        assert_eq!(frames[1].payload(), [5, 0, 6, 0, 7, 0, 8, 0]);
        // Tail of the track comes through as a short frame.
        assert_eq!(frames[2].payload(), [9, 0]);
    }

    #[test]
    fn refused_frame_is_redelivered_once_a_slot_frees_up() {
        let (producer, mut consumer) = audio_queue(1, Arc::default());
        let mut sink = BridgeSink::new(producer, tiny_config());

        let writer = thread::spawn(move || {
            sink.push_samples(&[1, 1, 1, 1, 2, 2, 2, 2]);
        });

        let first = consumer.take().unwrap();
        let second = consumer.take().unwrap();
        writer.join().unwrap();

        assert_eq!(first.payload()[0], 1);
        assert_eq!(second.payload()[0], 2);
    }

    #[test]
    fn slow_consumer_causes_refusals_but_no_drops() {
        let stats = Arc::new(AudioStats::default());
        let (producer, mut consumer) = audio_queue(1, stats.clone());
        let mut sink = BridgeSink::new(producer, tiny_config());

        let writer = thread::spawn(move || {
            sink.push_samples(&[1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
        });

        let mut tags = Vec::new();
        for _ in 0..3 {
            thread::sleep(Duration::from_millis(50));
            tags.push(consumer.take().unwrap().payload()[0]);
        }
        writer.join().unwrap();

        assert_eq!(tags, [1, 2, 3]);
        assert!(stats.offer_refusals() > 0);
        assert_eq!(stats.frames_dropped(), 0);
    }

    #[test]
    fn delivery_gives_up_when_writer_is_gone() {
        let stats = Arc::new(AudioStats::default());
        let (producer, consumer) = audio_queue(1, stats.clone());
        drop(consumer);
        let mut sink = BridgeSink::new(producer, tiny_config());
        sink.push_samples(&[1, 2, 3, 4, 5, 6, 7, 8]);

        assert!(sink.pending.is_empty());
        assert_eq!(stats.frames_dropped(), 2);
    }
}
