//! Bounded frame queue between the audio producer and the writer thread
//!
//! The producer side never blocks: a frame offered while every slot is taken
//! is refused and `offer` returns 0. The consumer side blocks until a frame
//! arrives or the queue is closed. Accepted frames come out in offer order.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::{AudioFrame, AudioStats};

enum Slot {
    Frame(AudioFrame),
    Close,
}

/// Create a queue with `capacity` frame slots.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn audio_queue(capacity: usize, stats: Arc<AudioStats>) -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = mpsc::channel(capacity);
    (FrameProducer { tx, stats }, FrameConsumer { rx })
}

#[derive(Clone)]
pub struct FrameProducer {
    tx: mpsc::Sender<Slot>,
    stats: Arc<AudioStats>,
}

impl FrameProducer {
    /// Enqueue `frame` if a slot is free. Returns the number of bytes accepted:
    /// the frame's length, or 0 when the frame was empty or refused.
    pub fn offer(&self, frame: AudioFrame) -> usize {
        let len = frame.len();
        if len == 0 {
            return 0;
        }

        match self.tx.try_send(Slot::Frame(frame)) {
            Ok(()) => {
                tracing::trace!(bytes = len, "Frame queued");
                len
            }
            Err(TrySendError::Full(_)) => {
                self.stats.record_refused();
                tracing::trace!(bytes = len, "Audio queue full, frame refused");
                0
            }
            Err(TrySendError::Closed(_)) => 0,
        }
    }

    /// Frames currently waiting for the consumer
    pub fn occupancy(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// True once the consumer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Count `frame` as lost for good
    pub(crate) fn drop_frame(&self, frame: AudioFrame) {
        self.stats.record_dropped();
        tracing::trace!(bytes = frame.len(), "Audio queue closed, frame dropped");
    }

    /// Ask a consumer blocked in `take` to return. Takes a slot; refused when full.
    pub(crate) fn close(&self) -> bool {
        self.tx.try_send(Slot::Close).is_ok()
    }
}

pub struct FrameConsumer {
    rx: mpsc::Receiver<Slot>,
}

impl FrameConsumer {
    /// Block until the next frame is available.
    ///
    /// Returns `None` once the queue is closed or every producer is gone.
    /// Must be called from a plain thread, never from inside the async runtime.
    pub fn take(&mut self) -> Option<AudioFrame> {
        match self.rx.blocking_recv()? {
            Slot::Frame(frame) => Some(frame),
            Slot::Close => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FrameFormat;

    fn frame(tag: u8, len: usize) -> AudioFrame {
        AudioFrame::new(FrameFormat::default(), vec![tag; len])
    }

    #[test]
    fn offer_accepts_until_full_then_refuses() {
        let stats = Arc::new(AudioStats::default());
        let (producer, _consumer) = audio_queue(8, stats.clone());

        for i in 0..8 {
            assert_eq!(producer.offer(frame(i, 16)), 16);
            assert_eq!(producer.occupancy(), usize::from(i) + 1);
        }

        assert_eq!(producer.offer(frame(9, 16)), 0);
        assert_eq!(producer.occupancy(), 8);
        assert_eq!(stats.offer_refusals(), 1);
        assert_eq!(stats.frames_dropped(), 0);
    }

    #[test]
    fn empty_frames_are_never_queued() {
        let (producer, _consumer) = audio_queue(2, Arc::default());
        assert_eq!(producer.offer(frame(0, 0)), 0);
        assert_eq!(producer.occupancy(), 0);
    }

    #[test]
    fn consumer_sees_accepted_frames_in_offer_order() {
        let (producer, mut consumer) = audio_queue(3, Arc::default());
        let accepted: Vec<u8> = (0..5u8)
            .filter(|tag| producer.offer(frame(*tag, 4)) > 0)
            .collect();
        assert_eq!(accepted, [0, 1, 2]);
        drop(producer);

        let taken: Vec<u8> = std::iter::from_fn(|| consumer.take())
            .map(|f| f.payload()[0])
            .collect();
        assert_eq!(taken, accepted);
    }

    #[test]
    fn take_blocks_until_a_frame_arrives() {
        let (producer, mut consumer) = audio_queue(1, Arc::default());
        let handle = std::thread::spawn(move || consumer.take().map(|f| f.len()));

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(producer.offer(frame(1, 12)), 12);
        assert_eq!(handle.join().unwrap(), Some(12));
    }

    #[test]
    fn close_releases_a_waiting_consumer() {
        let (producer, mut consumer) = audio_queue(1, Arc::default());
        let keep_alive = producer.clone();
        let handle = std::thread::spawn(move || consumer.take());

        assert!(producer.close());
        assert!(handle.join().unwrap().is_none());
        assert!(keep_alive.is_closed());
    }
}
