// Copyright 2025 Tyler Neely (tylerneely@gmail.com).
// Copyright 2021 Emilie Gillet (emilie.o.gillet@gmail.com)
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.
//
// See http://creativecommons.org/licenses/MIT/ for more information.

//! Low-frequency oscillator driving pitch and amplitude modulation.
//!
//! Six waveforms (triangle, two ramps, square, sine, sample & hold) plus
//! a delay ramp that fades modulation depth in after note-on.

use super::dx_units::{lfo_delay, lfo_frequency, pitch_mod_sensitivity};
use super::patch::ModulationParameters;
use crate::stmlib::dsp::sine;
use crate::stmlib::random::Random;

/// LFO waveform shapes, indexed the same way as the DX7 patch byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// Rises then falls linearly, peaking at phase 0.5.
    Triangle,
    /// Falls linearly from 1 to 0 across the cycle.
    RampDown,
    /// Rises linearly from 0 to 1 across the cycle.
    RampUp,
    /// Low for the first half of the cycle, high for the second.
    Square,
    /// Raised sine, offset by half a cycle.
    Sine,
    /// Holds a fresh uniform random value each cycle.
    SampleAndHold,
}

impl From<u8> for Waveform {
    fn from(value: u8) -> Self {
        match value {
            0 => Waveform::Triangle,
            1 => Waveform::RampDown,
            2 => Waveform::RampUp,
            3 => Waveform::Square,
            4 => Waveform::Sine,
            _ => Waveform::SampleAndHold,
        }
    }
}

/// Low-frequency oscillator with delay ramp, used to modulate pitch and
/// amplitude of a [`Voice`](super::voice::Voice).
#[derive(Clone)]
pub struct Lfo {
    sample_rate: f32,
    frequency: f32,
    phase: f32,
    value: f32,
    waveform: Waveform,
    delay_inc: [f32; 2],
    delay_phase: f32,
    pitch_mod_depth: f32,
    amp_mod_depth: f32,
    last_cycle: i64,
}

impl Lfo {
    /// Creates an LFO in its power-on state (triangle wave, no modulation).
    pub fn new() -> Self {
        Self {
            sample_rate: 1.0,
            frequency: 0.0,
            phase: 0.0,
            value: Self::wave(Waveform::Triangle, 0.0),
            waveform: Waveform::Triangle,
            delay_inc: [0.0, 0.0],
            delay_phase: 0.0,
            pitch_mod_depth: 0.0,
            amp_mod_depth: 0.0,
            last_cycle: 0,
        }
    }

    /// Caches the sample rate used to convert patch units (Hz, cycles) into
    /// per-sample increments.
    pub fn init(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Configures rate, delay, depth and waveform from patch data.
    pub fn set(&mut self, modulations: &ModulationParameters) {
        self.frequency = lfo_frequency(modulations.rate as i32) / self.sample_rate;
        let delay = lfo_delay(modulations.delay as i32);
        self.delay_inc = [delay[0] / self.sample_rate, delay[1] / self.sample_rate];
        self.amp_mod_depth = modulations.amp_mod_depth as f32 * 0.01;
        self.pitch_mod_depth = modulations.pitch_mod_depth as f32
            * 0.01
            * pitch_mod_sensitivity(modulations.pitch_mod_sensitivity as i32);
        self.waveform = Waveform::from(modulations.waveform);
    }

    /// Resets phase and delay ramp for a fresh note.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.delay_phase = 0.0;
        self.last_cycle = 0;
        self.value = Self::wave(self.waveform, self.phase);
    }

    /// Advances the LFO by `scale` samples (a block size) and latches a new
    /// waveform value and delay ramp position.
    pub fn step(&mut self, scale: f32) {
        self.phase += scale * self.frequency;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
            if self.waveform == Waveform::SampleAndHold {
                self.value = Random::get_float();
            }
        }
        if self.waveform != Waveform::SampleAndHold {
            self.value = Self::wave(self.waveform, self.phase);
        }

        let inc = if self.delay_phase < 0.5 {
            self.delay_inc[0]
        } else {
            self.delay_inc[1]
        };
        self.delay_phase = (self.delay_phase + scale * inc).min(1.0);
    }

    /// Recomputes phase directly from an absolute sample index, for
    /// envelope/LFO "scrubbing" during sustain-scan rendering.
    pub fn scrub(&mut self, sample: f32) {
        let total_cycles = sample * self.frequency;
        let cycle = total_cycles.floor() as i64;
        self.phase = total_cycles - total_cycles.floor();

        if self.waveform == Waveform::SampleAndHold {
            if cycle != self.last_cycle {
                self.value = Random::get_float();
                self.last_cycle = cycle;
            }
        } else {
            self.value = Self::wave(self.waveform, self.phase);
        }

        let half_point = if self.delay_inc[0] > 0.0 {
            0.5 / self.delay_inc[0]
        } else {
            f32::INFINITY
        };
        self.delay_phase = if sample <= half_point {
            (sample * self.delay_inc[0]).min(1.0)
        } else {
            (0.5 + (sample - half_point) * self.delay_inc[1]).min(1.0)
        };
    }

    /// Pitch modulation output, scaled by the delay ramp and patch depth.
    pub fn pitch_mod(&self) -> f32 {
        (self.value - 0.5) * self.delay_ramp() * self.pitch_mod_depth
    }

    /// Amplitude modulation output, scaled by the delay ramp and patch depth.
    pub fn amp_mod(&self) -> f32 {
        (1.0 - self.value) * self.delay_ramp() * self.amp_mod_depth
    }

    #[inline]
    fn delay_ramp(&self) -> f32 {
        if self.delay_phase < 0.5 {
            0.0
        } else {
            (self.delay_phase - 0.5) * 2.0
        }
    }

    #[inline]
    fn wave(waveform: Waveform, phase: f32) -> f32 {
        match waveform {
            Waveform::Triangle => {
                if phase < 0.5 {
                    2.0 * (0.5 - phase)
                } else {
                    2.0 * (phase - 0.5)
                }
            }
            Waveform::RampDown => 1.0 - phase,
            Waveform::RampUp => phase,
            Waveform::Square => {
                if phase < 0.5 {
                    0.0
                } else {
                    1.0
                }
            }
            Waveform::Sine => 0.5 + 0.5 * sine(phase + 0.5),
            Waveform::SampleAndHold => Random::get_float(),
        }
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(rate: u8, delay: u8, pmd: u8, amd: u8, waveform: u8) -> ModulationParameters {
        ModulationParameters {
            rate,
            delay,
            pitch_mod_depth: pmd,
            amp_mod_depth: amd,
            reset_phase: 0,
            waveform,
            pitch_mod_sensitivity: 3,
        }
    }

    #[test]
    fn triangle_peaks_at_half_cycle() {
        let mut lfo = Lfo::new();
        lfo.init(1000.0);
        lfo.set(&params(50, 99, 50, 50, 0));
        lfo.reset();
        assert!((lfo.value - 1.0).abs() < 1e-6);
        let half_cycle_samples = (0.5 / lfo.frequency).round();
        for _ in 0..half_cycle_samples as usize {
            lfo.step(1.0);
        }
        assert!(lfo.value < 0.05, "expected near zero at half cycle, got {}", lfo.value);
    }

    #[test]
    fn zero_delay_ramps_immediately() {
        let mut lfo = Lfo::new();
        lfo.init(1000.0);
        lfo.set(&params(50, 99, 50, 50, 0));
        lfo.reset();
        for _ in 0..5 {
            lfo.step(1.0);
        }
        assert!(lfo.delay_ramp() > 0.0);
    }

    #[test]
    fn full_delay_suppresses_modulation_at_note_on() {
        let mut lfo = Lfo::new();
        lfo.init(1000.0);
        lfo.set(&params(50, 0, 50, 50, 0));
        lfo.reset();
        assert_eq!(lfo.pitch_mod(), 0.0);
        assert_eq!(lfo.amp_mod(), 0.0);
    }

    #[test]
    fn square_wave_is_bimodal() {
        let mut lfo = Lfo::new();
        lfo.init(1000.0);
        lfo.set(&params(50, 99, 99, 0, 3));
        lfo.reset();
        let mut seen_low = false;
        let mut seen_high = false;
        for _ in 0..2000 {
            lfo.step(1.0);
            if lfo.value == 0.0 {
                seen_low = true;
            } else if lfo.value == 1.0 {
                seen_high = true;
            }
        }
        assert!(seen_low && seen_high);
    }

    #[test]
    fn sample_and_hold_changes_once_per_cycle() {
        let mut lfo = Lfo::new();
        lfo.init(1000.0);
        lfo.set(&params(80, 99, 99, 0, 5));
        lfo.reset();
        let mut distinct = std::collections::HashSet::new();
        for _ in 0..500 {
            lfo.step(1.0);
            distinct.insert(lfo.value.to_bits());
        }
        assert!(distinct.len() > 1, "S&H should vary across many cycles");
    }

    #[test]
    fn scrub_matches_step_accumulated_phase_for_deterministic_waveforms() {
        let mut stepped = Lfo::new();
        stepped.init(1000.0);
        stepped.set(&params(50, 99, 50, 50, 4));
        stepped.reset();
        for _ in 0..137 {
            stepped.step(1.0);
        }

        let mut scrubbed = Lfo::new();
        scrubbed.init(1000.0);
        scrubbed.set(&params(50, 99, 50, 50, 4));
        scrubbed.reset();
        scrubbed.scrub(137.0);

        assert!((stepped.value - scrubbed.value).abs() < 1e-4);
    }
}
