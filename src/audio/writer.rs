//! Writer thread draining the frame queue into the output device

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::oneshot;

use super::bridge::{FrameConsumer, FrameProducer};
use super::device::OutputDevice;
use super::{AudioStats, OutputConfig};
use crate::error::DeviceError;

/// Convert an s16le payload into `out`, pairing consecutive bytes into one sample.
///
/// Returns false, leaving `out` untouched, unless the payload is exactly one
/// block long (`2 * out.len()` bytes).
pub fn decode_block(payload: &[u8], out: &mut [i16]) -> bool {
    if payload.len() != out.len() * 2 {
        return false;
    }

    for (sample, bytes) in out.iter_mut().zip(payload.chunks_exact(2)) {
        *sample = i16::from_le_bytes([bytes[0], bytes[1]]);
    }
    true
}

/// Handle to the running writer thread
pub struct AudioOutput {
    running: Arc<AtomicBool>,
    wake: FrameProducer,
    stats: Arc<AudioStats>,
    thread: Option<JoinHandle<()>>,
}

impl AudioOutput {
    /// Spawn the writer thread and open the device on it.
    ///
    /// The device is opened on the writer thread because some device handles
    /// cannot move between threads. Resolves once the device is open.
    pub async fn start<D, F>(
        frames: FrameConsumer,
        wake: FrameProducer,
        stats: Arc<AudioStats>,
        config: OutputConfig,
        open: F,
    ) -> Result<Self, DeviceError>
    where
        D: OutputDevice,
        F: FnOnce(&OutputConfig) -> Result<D, DeviceError> + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let (opened_tx, opened_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name("audio-writer".to_string())
            .spawn({
                let running = running.clone();
                let stats = stats.clone();
                move || {
                    let device = match open(&config) {
                        Ok(device) => {
                            let _ = opened_tx.send(Ok(()));
                            device
                        }
                        Err(e) => {
                            let _ = opened_tx.send(Err(e));
                            return;
                        }
                    };

                    DeviceWriter {
                        frames,
                        device,
                        block: vec![0; config.block_samples()],
                        stats,
                        running,
                    }
                    .run();
                }
            })
            .map_err(|e| DeviceError::Open(e.to_string()))?;

        let opened = opened_rx
            .await
            .unwrap_or_else(|_| Err(DeviceError::Open("audio writer thread exited".to_string())));

        let mut output = Self {
            running,
            wake,
            stats,
            thread: Some(thread),
        };

        match opened {
            Ok(()) => {
                tracing::info!(
                    channels = config.format.channels,
                    sample_rate = config.format.sample_rate,
                    block_frames = config.block_frames,
                    "Audio output started"
                );
                Ok(output)
            }
            Err(e) => {
                output.stop();
                Err(e)
            }
        }
    }

    /// Stop the device stream and wait for the writer thread to exit.
    ///
    /// Blocks for at most one in-flight device write.
    pub fn shutdown(mut self) {
        self.stop();
        tracing::info!(
            written = self.stats.frames_written(),
            discarded = self.stats.frames_discarded(),
            refused = self.stats.offer_refusals(),
            dropped = self.stats.frames_dropped(),
            "Audio output stopped"
        );
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.wake.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Audio writer thread panicked");
            }
        }
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

struct DeviceWriter<D> {
    frames: FrameConsumer,
    device: D,
    block: Vec<i16>,
    stats: Arc<AudioStats>,
    running: Arc<AtomicBool>,
}

impl<D: OutputDevice> DeviceWriter<D> {
    fn run(mut self) {
        if let Err(e) = self.device.start() {
            tracing::error!(error = %e, "Could not start output stream");
            return;
        }

        while self.running.load(Ordering::Acquire) {
            let Some(frame) = self.frames.take() else {
                break;
            };

            // Short frames show up at every track boundary.
            if !decode_block(frame.payload(), &mut self.block) {
                let discarded = self.stats.record_discarded();
                tracing::debug!(
                    bytes = frame.len(),
                    expected = self.block.len() * 2,
                    discarded,
                    "Discarding frame with unexpected length"
                );
                continue;
            }

            if let Err(e) = self.device.write(&self.block) {
                tracing::warn!(error = %e, "Output device rejected block, stopping writer");
                break;
            }
            self.stats.record_written();
        }

        if let Err(e) = self.device.stop() {
            tracing::warn!(error = %e, "Could not stop output stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::bridge::audio_queue;
    use crate::audio::device::MockOutputDevice;
    use crate::audio::{AudioFrame, FrameFormat};
    use std::sync::mpsc;
    use std::time::Duration;

    fn small_config() -> OutputConfig {
        OutputConfig {
            format: FrameFormat::default(),
            block_frames: 2,
        }
    }

    #[test]
    fn decode_pairs_bytes_little_endian() {
        let payload = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0x34, 0x12];
        let mut out = [0i16; 4];
        assert!(decode_block(&payload, &mut out));
        assert_eq!(out, [1, -1, i16::MIN, 0x1234]);
    }

    #[test]
    fn decode_rejects_any_other_length() {
        let mut out = [7i16; 4];
        assert!(!decode_block(&[0u8; 7], &mut out));
        assert!(!decode_block(&[0u8; 10], &mut out));
        assert!(!decode_block(&[], &mut out));
        assert_eq!(out, [7; 4]);
    }

    #[test]
    fn full_reference_block_decodes_to_block_samples() {
        let config = OutputConfig::default();
        let payload: Vec<u8> = (0..config.block_samples() as u16)
            .flat_map(|i| i.to_le_bytes())
            .collect();
        let mut out = vec![0i16; config.block_samples()];
        assert!(decode_block(&payload, &mut out));
        assert_eq!(out[4095], 4095);
    }

    #[tokio::test]
    async fn writer_plays_blocks_in_order_and_skips_short_frames() {
        let stats = Arc::new(AudioStats::default());
        let (producer, consumer) = audio_queue(8, stats.clone());
        let (blocks_tx, blocks_rx) = mpsc::channel::<Vec<i16>>();

        let mut device = MockOutputDevice::new();
        device.expect_start().times(1).returning(|| Ok(()));
        device.expect_write().returning(move |block| {
            blocks_tx.send(block.to_vec()).unwrap();
            Ok(())
        });
        device.expect_stop().times(1).returning(|| Ok(()));

        let output = AudioOutput::start(
            consumer,
            producer.clone(),
            stats.clone(),
            small_config(),
            move |_| Ok(device),
        )
        .await
        .unwrap();

        let format = FrameFormat::default();
        producer.offer(AudioFrame::new(format, vec![1, 0, 2, 0, 3, 0, 4, 0]));
        producer.offer(AudioFrame::new(format, vec![9, 9, 9]));
        producer.offer(AudioFrame::new(format, vec![5, 0, 6, 0, 7, 0, 8, 0]));

        let first = blocks_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = blocks_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, [1, 2, 3, 4]);
        assert_eq!(second, [5, 6, 7, 8]);

        output.shutdown();
        assert_eq!(stats.frames_written(), 2);
        assert_eq!(stats.frames_discarded(), 1);
    }

    #[tokio::test]
    async fn open_failure_is_reported() {
        let stats = Arc::new(AudioStats::default());
        let (producer, consumer) = audio_queue(2, stats.clone());

        let result = AudioOutput::start(consumer, producer, stats, small_config(), |_| {
            Err::<MockOutputDevice, _>(DeviceError::NoDevice)
        })
        .await;

        assert!(matches!(result, Err(DeviceError::NoDevice)));
    }

    #[tokio::test]
    async fn device_failure_ends_the_writer() {
        let stats = Arc::new(AudioStats::default());
        let (producer, consumer) = audio_queue(2, stats.clone());

        let (failed_tx, failed_rx) = mpsc::channel::<()>();

        let mut device = MockOutputDevice::new();
        device.expect_start().returning(|| Ok(()));
        device.expect_write().times(1).returning(move |_| {
            failed_tx.send(()).unwrap();
            Err(DeviceError::Stalled)
        });
        device.expect_stop().times(1).returning(|| Ok(()));

        let output = AudioOutput::start(consumer, producer.clone(), stats.clone(), small_config(), |_| {
            Ok(device)
        })
        .await
        .unwrap();

        producer.offer(AudioFrame::new(FrameFormat::default(), vec![0; 8]));
        failed_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        output.shutdown();
        assert_eq!(stats.frames_written(), 0);
    }
}
