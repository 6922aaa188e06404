//! Audio Decoding Abstraction
//!
//! The loader core never decodes audio itself; it hands encoded bytes to an
//! [`AudioDecoder`] and caches the resulting [`AudioBuffer`].

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Decoded PCM audio, planar `f32` samples.
///
/// Buffers are immutable once produced: the loader shares them behind `Arc`
/// and never touches the sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a buffer from per-channel sample planes.
    ///
    /// All planes must have the same length; a buffer may have zero
    /// channels (an empty decode result) but never ragged planes.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "channel planes must share one length"
        );
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels (1 = mono, 2 = stereo, ...).
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Samples for one channel.
    pub fn channel_data(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(Vec::as_slice)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Async audio decoding service.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode a complete encoded payload into PCM.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is not a recognizable or
    /// well-formed audio format.
    async fn decode(&self, data: Bytes) -> Result<AudioBuffer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_accessors() {
        let buffer = AudioBuffer::new(44100, vec![vec![0.0; 22050], vec![0.0; 22050]]);

        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 22050);
        assert!((buffer.duration_secs() - 0.5).abs() < 1e-9);
        assert!(buffer.channel_data(1).is_some());
        assert!(buffer.channel_data(2).is_none());
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = AudioBuffer::new(48000, Vec::new());
        assert_eq!(buffer.frames(), 0);
        assert_eq!(buffer.duration_secs(), 0.0);
    }
}
