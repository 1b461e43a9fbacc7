// Copyright 2025 Tyler Neely (tylerneely@gmail.com).
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

//! Structural decode errors for SysEx patch and bank data.

use std::fmt;

/// Errors returned while decoding DX7 SysEx bank or voice data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankError {
    /// Bank data was not exactly [`crate::fm::patch::BULK_FULL_SYSEX_SIZE`] bytes.
    BadBankLength {
        /// Number of bytes actually supplied.
        got: usize,
        /// Number of bytes required.
        expected: usize,
    },
    /// The 6-byte bank header did not match `F0 43 00 09 20 00`.
    BadBankHeader,
    /// Voice data was not exactly [`crate::fm::patch::SYX_SIZE`] bytes.
    BadVoiceLength {
        /// Number of bytes actually supplied.
        got: usize,
        /// Number of bytes required.
        expected: usize,
    },
    /// An operator index outside the valid 1..=6 range was requested.
    BadOperatorIndex {
        /// The index that was requested.
        index: usize,
    },
}

impl fmt::Display for BankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankError::BadBankLength { got, expected } => write!(
                f,
                "bank data must be exactly {expected} bytes, got {got}"
            ),
            BankError::BadBankHeader => {
                write!(f, "bank data does not start with the expected sysex header")
            }
            BankError::BadVoiceLength { got, expected } => write!(
                f,
                "voice data must be exactly {expected} bytes, got {got}"
            ),
            BankError::BadOperatorIndex { index } => {
                write!(f, "operator index {index} is out of range (expected 1..=6)")
            }
        }
    }
}

impl std::error::Error for BankError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_mention_the_offending_values() {
        let err = BankError::BadBankLength {
            got: 10,
            expected: 4104,
        };
        assert!(err.to_string().contains("4104"));
        assert!(err.to_string().contains("10"));
    }
}
