//! Output device seam and its cpal implementation

use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use super::OutputConfig;
use crate::error::DeviceError;

/// A real-time audio sink consuming fixed-size blocks of interleaved samples
#[cfg_attr(test, mockall::automock)]
pub trait OutputDevice {
    fn start(&mut self) -> Result<(), DeviceError>;

    fn stop(&mut self) -> Result<(), DeviceError>;

    /// Hand one block to the device, blocking until it has been accepted
    fn write(&mut self, block: &[i16]) -> Result<(), DeviceError>;
}

/// Blocks of headroom between `write` and the device callback
const RING_BLOCKS: usize = 2;
const POLL_INTERVAL: Duration = Duration::from_millis(2);
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Default output device driven through cpal.
///
/// The stream handle is not `Send`; open it on the thread that writes to it.
pub struct CpalDevice {
    stream: Stream,
    producer: HeapProd<i16>,
}

impl CpalDevice {
    pub fn open(config: &OutputConfig) -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(DeviceError::NoDevice)?;

        tracing::info!(
            device_name = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            "Selected audio device"
        );

        let default_config = device
            .default_output_config()
            .map_err(|e| DeviceError::Open(e.to_string()))?;

        let stream_config = StreamConfig {
            channels: config.format.channels,
            sample_rate: cpal::SampleRate(config.format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let ring = HeapRb::<i16>::new(config.block_samples() * RING_BLOCKS);
        let (producer, consumer) = ring.split();

        let stream = match default_config.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, consumer)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, consumer)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, consumer)?,
            format => {
                return Err(DeviceError::Open(format!(
                    "unsupported sample format: {:?}",
                    format
                )));
            }
        };

        Ok(Self { stream, producer })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<i16>,
) -> Result<Stream, DeviceError>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // Underruns play silence.
                for sample in data.iter_mut() {
                    *sample = T::from_sample(consumer.try_pop().unwrap_or(0));
                }
            },
            |err| tracing::error!(error = %err, "Audio stream error"),
            None,
        )
        .map_err(|e| DeviceError::Open(e.to_string()))
}

impl OutputDevice for CpalDevice {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.stream
            .play()
            .map_err(|e| DeviceError::Stream(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.stream
            .pause()
            .map_err(|e| DeviceError::Stream(e.to_string()))
    }

    fn write(&mut self, block: &[i16]) -> Result<(), DeviceError> {
        push_block(&mut self.producer, block, STALL_TIMEOUT)
    }
}

/// Push all of `block` into the ring, waiting for the callback to make room.
///
/// Fails with `Stalled` once `stall_timeout` passes without a single sample
/// being accepted.
fn push_block(
    producer: &mut HeapProd<i16>,
    block: &[i16],
    stall_timeout: Duration,
) -> Result<(), DeviceError> {
    let mut remaining = block;
    let mut last_progress = Instant::now();

    while !remaining.is_empty() {
        let written = producer.push_slice(remaining);
        if written > 0 {
            remaining = &remaining[written..];
            last_progress = Instant::now();
        } else if last_progress.elapsed() > stall_timeout {
            return Err(DeviceError::Stalled);
        } else {
            thread::sleep(POLL_INTERVAL);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pop `count` samples, pausing `pace` whenever the ring runs dry
    fn drain(mut consumer: HeapCons<i16>, count: usize, pace: Duration) -> thread::JoinHandle<Vec<i16>> {
        thread::spawn(move || {
            let mut out = Vec::with_capacity(count);
            while out.len() < count {
                match consumer.try_pop() {
                    Some(sample) => out.push(sample),
                    None => thread::sleep(pace),
                }
            }
            out
        })
    }

    #[test]
    fn write_waits_for_a_slow_callback() {
        let (mut producer, consumer) = HeapRb::<i16>::new(8).split();
        assert_eq!(producer.push_slice(&[-1; 6]), 6);
        let reader = drain(consumer, 14, Duration::from_millis(5));

        let block: Vec<i16> = (0..8).collect();
        push_block(&mut producer, &block, STALL_TIMEOUT).unwrap();

        let samples = reader.join().unwrap();
        assert_eq!(samples[..6], [-1; 6]);
        assert_eq!(samples[6..], block[..]);
    }

    #[test]
    fn write_reports_a_stalled_callback() {
        let (mut producer, _consumer) = HeapRb::<i16>::new(4).split();
        let started = Instant::now();

        let result = push_block(&mut producer, &[1; 8], Duration::from_millis(50));

        assert!(matches!(result, Err(DeviceError::Stalled)));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn block_larger_than_the_ring_goes_through_in_pieces() {
        let (mut producer, consumer) = HeapRb::<i16>::new(4).split();
        let reader = drain(consumer, 64, Duration::from_millis(1));

        let block: Vec<i16> = (0..64).collect();
        push_block(&mut producer, &block, STALL_TIMEOUT).unwrap();

        assert_eq!(reader.join().unwrap(), block);
    }
}
