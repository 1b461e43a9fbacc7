//! Decodes banks and single voices through the public API and checks the
//! fields land within the ranges the format documents.

use dx7voice::fm::patch::{Patch, PatchBank, BULK_FULL_SYSEX_SIZE, SYX_SIZE};
use dx7voice::BankError;

fn packed_voice(algorithm: u8, feedback: u8) -> [u8; SYX_SIZE] {
    let mut voice = [0u8; SYX_SIZE];
    // Six operators, 17 bytes each (102 bytes), leave envelope/scaling bytes
    // at zero so every field clamps to its minimum.
    voice[102 + 8] = algorithm; // byte 110: algorithm number
    voice[102 + 9] = feedback; // byte 111: feedback (low 3 bits) | reset phase bit
    voice
}

fn bank_bytes() -> Vec<u8> {
    let mut data = vec![0u8; BULK_FULL_SYSEX_SIZE];
    data[0..6].copy_from_slice(&[0xF0, 0x43, 0x00, 0x09, 0x20, 0x00]);
    for i in 0..32 {
        let voice = packed_voice((i % 32) as u8, 0);
        data[6 + i * SYX_SIZE..6 + (i + 1) * SYX_SIZE].copy_from_slice(&voice);
    }
    data
}

#[test]
fn decodes_a_full_bank_into_thirty_two_in_range_patches() {
    let data = bank_bytes();
    let bank = PatchBank::from_bytes(&data).expect("well-formed bank decodes");

    for index in 0..32 {
        let patch = bank.patch(index).expect("index within bank");
        assert!(patch.algorithm < 32);
        assert!(patch.feedback < 8);
        assert!(patch.transpose <= 48);
        for op_index in 1..=6 {
            assert!(patch.operator(op_index).is_ok());
        }
    }
    assert!(bank.patch(32).is_none());
}

#[test]
fn mutating_the_header_byte_is_rejected() {
    let mut data = bank_bytes();
    data[0] = 0x00;
    let err = PatchBank::from_bytes(&data).unwrap_err();
    assert_eq!(err, BankError::BadBankHeader);
}

#[test]
fn wrong_length_bank_is_rejected() {
    let data = vec![0u8; BULK_FULL_SYSEX_SIZE - 1];
    let err = PatchBank::from_bytes(&data).unwrap_err();
    assert_eq!(
        err,
        BankError::BadBankLength {
            got: BULK_FULL_SYSEX_SIZE - 1,
            expected: BULK_FULL_SYSEX_SIZE,
        }
    );
}

#[test]
fn single_voice_decode_rejects_wrong_length() {
    let data = vec![0u8; SYX_SIZE - 1];
    let err = Patch::from_bytes(&data).unwrap_err();
    assert_eq!(
        err,
        BankError::BadVoiceLength {
            got: SYX_SIZE - 1,
            expected: SYX_SIZE,
        }
    );
}

#[test]
fn operator_accessor_rejects_out_of_range_index() {
    let patch = Patch::default();
    assert_eq!(
        patch.operator(0).unwrap_err(),
        BankError::BadOperatorIndex { index: 0 }
    );
    assert_eq!(
        patch.operator(7).unwrap_err(),
        BankError::BadOperatorIndex { index: 7 }
    );
}
