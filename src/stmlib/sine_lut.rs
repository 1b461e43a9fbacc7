// Copyright 2012 Emilie Gillet.
// Rust port by Tyler Neely.
//
// Author: Emilie Gillet (emilie.o.gillet@gmail.com)
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

//! One-cycle sine lookup table shared by the oscillator primitives.

use std::sync::OnceLock;

const SIZE: usize = 512;

/// Entries per cycle plus one wraparound duplicate at index 512.
pub const LUT_SINE_SIZE: usize = SIZE + 1;

/// Returns the lazily-computed 513-entry sine table (one full cycle, plus
/// the first sample duplicated at the end so wrapping interpolation never
/// needs to special-case the last segment).
pub fn lut_sine() -> &'static [f32; LUT_SINE_SIZE] {
    static TABLE: OnceLock<[f32; LUT_SINE_SIZE]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0f32; LUT_SINE_SIZE];
        for (i, entry) in table.iter_mut().take(SIZE).enumerate() {
            let phase = i as f32 / SIZE as f32 * std::f32::consts::TAU;
            *entry = phase.sin();
        }
        // sin(TAU) is not exactly sin(0.0) in floating point; copy the first
        // sample instead of recomputing it so interpolate_wrap's wraparound
        // segment is exact.
        table[SIZE] = table[0];
        table
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_to_the_same_value() {
        let table = lut_sine();
        assert_eq!(table[0], table[SIZE]);
    }

    #[test]
    fn quarter_cycle_peaks_at_one() {
        let table = lut_sine();
        assert!((table[SIZE / 4] - 1.0).abs() < 1e-6);
    }
}
