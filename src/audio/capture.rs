//! Synthetic multi-mic capture source.
//!
//! Produces an endless interleaved little-endian i16 sine, one phase offset
//! per microphone, so the pipeline can be driven without capture hardware.

use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian};

pub struct ToneCapture {
    channels: usize,
    sample_rate: u32,
    frequency: f32,
    amplitude: f32,
    sample_index: u64,
}

impl ToneCapture {
    pub fn new(channels: usize, sample_rate: u32, frequency: f32) -> Self {
        Self {
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
            frequency,
            amplitude: 0.5,
            sample_index: 0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    fn next_sample(&mut self) -> i16 {
        let channel = (self.sample_index % self.channels as u64) as f32;
        let frame = self.sample_index / self.channels as u64;
        self.sample_index += 1;

        let t = frame as f32 / self.sample_rate as f32;
        let phase = channel * std::f32::consts::PI / self.channels as f32;
        let value = (2.0 * std::f32::consts::PI * self.frequency * t + phase).sin();
        (value * self.amplitude * i16::MAX as f32) as i16
    }
}

impl Read for ToneCapture {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let samples = buf.len() / 2;
        for chunk in buf[..samples * 2].chunks_exact_mut(2) {
            let sample = self.next_sample();
            LittleEndian::write_i16(chunk, sample);
        }
        Ok(samples * 2)
    }
}
