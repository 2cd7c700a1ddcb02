use std::sync::Arc;

use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use czip_asm::flags::*;
use czip_asm::{flags_matching, AllowOpcodes, Method};
use czip_compressor::{Buffer, EncodeError, EncodeType, Indexes};

fn buffer() -> Buffer {
    Buffer::new(Method::DecodeAny, None, None, false)
}

fn storage_buffer(indexes: Indexes) -> Buffer {
    Buffer::new(Method::DecodeAny, Some(Arc::new(indexes)), None, true)
}

/// A 32-byte value that matches none of the arithmetic strategies: the low
/// byte keeps it indivisible by ten and the bit pattern is neither a power
/// of two nor all ones.
fn opaque_word(fill: u8) -> [u8; 32] {
    assert!(fill % 2 == 1 && fill % 5 != 0 && fill != 0xff);
    [fill; 32]
}

fn left_pad_32(b: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[32 - b.len()..].copy_from_slice(b);
    out
}

#[test]
fn literals_cover_zero_to_max() {
    let mut buf = buffer();
    buf.write_word(&[0u8; 32], false).unwrap();
    assert_eq!(buf.data(), &[Method::DecodeAny as u8, LITERAL_ZERO]);

    let mut buf = buffer();
    buf.write_word(&[0x07], false).unwrap();
    assert_eq!(buf.data()[1..], [LITERAL_ZERO + 0x07]);

    let mut buf = buffer();
    buf.write_word(&[MAX_LITERAL], false).unwrap();
    assert_eq!(buf.data()[1..], [LITERAL_ZERO + MAX_LITERAL]);

    // One past the literal range: a single raw byte.
    let mut buf = buffer();
    buf.write_word(&[MAX_LITERAL + 1], false).unwrap();
    assert_eq!(buf.data()[1..], [FLAG_READ_BYTES32_1_BYTES, MAX_LITERAL + 1]);
}

#[test]
fn powers_of_two() {
    let mut buf = buffer();
    buf.write_word(&[0x01, 0x00], false).unwrap();
    assert_eq!(buf.data()[1..], [FLAG_READ_POWER_OF_2, 8]);

    let mut word = [0u8; 32];
    word[0] = 0x80;
    let mut buf = buffer();
    buf.write_word(&word, false).unwrap();
    assert_eq!(buf.data()[1..], [FLAG_READ_POWER_OF_2, 255]);
}

#[test]
fn powers_of_ten() {
    let value = 1_000_000_000_000_000_000u64; // 10^18
    let mut buf = buffer();
    buf.write_word(&value.to_be_bytes(), false).unwrap();
    assert_eq!(buf.data()[1..], [FLAG_POW_10, 18]);
}

#[test]
fn all_ones_beats_the_two_byte_form() {
    let mut buf = buffer();
    buf.write_word(&[0xff, 0xff], false).unwrap();
    assert_eq!(buf.data()[1..], [FLAG_POW_2_MINUS_1, 15]);
}

#[test]
fn short_raw_words() {
    let mut buf = buffer();
    buf.write_word(&[0x01, 0x23], false).unwrap();
    assert_eq!(buf.data()[1..], [FLAG_READ_BYTES32_1_BYTES + 1, 0x01, 0x23]);

    let mut buf = buffer();
    buf.write_word(&[0xab, 0xcd, 0xef], false).unwrap();
    assert_eq!(
        buf.data()[1..],
        [FLAG_READ_BYTES32_1_BYTES + 2, 0xab, 0xcd, 0xef]
    );
}

#[test]
fn pow10_mantissa_short_packs_exponent_and_mantissa() {
    // 1_230_000 = 10^3 * 1230.
    let mut buf = buffer();
    buf.write_word(&1_230_000u64.to_be_bytes(), false).unwrap();
    assert_eq!(
        buf.data()[1..],
        [FLAG_READ_POW_10_MANTISSA_S, (3 << 3) | 0x04, 0xce]
    );
}

#[test]
fn pow10_mantissa_long_handles_wider_mantissas() {
    // 345_600_000 = 10^5 * 3456; 3456 exceeds the short form's 11 bits.
    let mut buf = buffer();
    buf.write_word(&345_600_000u64.to_be_bytes(), false).unwrap();
    assert_eq!(
        buf.data()[1..],
        [FLAG_READ_POW_10_MANTISSA, (5 << 2), 0x0d, 0x80]
    );
}

#[test]
fn repeated_words_mirror_the_first_flag() {
    let word = opaque_word(0x99);

    let mut buf = buffer();
    buf.write_word(&word, false).unwrap();
    assert_eq!(buf.data()[1], FLAG_READ_BYTES32_1_BYTES + 31);
    assert_eq!(buf.len(), 34);

    let t = buf.write_word(&word, false).unwrap();
    assert_eq!(t, EncodeType::Mirror);
    // The mirror points at the first flag's committed offset.
    assert_eq!(buf.data()[34..], [FLAG_MIRROR_FLAG, 0x00, 0x01]);
}

#[test]
fn mirrors_hit_regardless_of_original_trimming() {
    // The reference key is the padded word, so a short spelling of the same
    // value still mirrors.
    let value = [0x0a, 0xbc, 0xde, 0x01];

    let mut buf = buffer();
    buf.write_word(&left_pad_32(&value), false).unwrap();
    let offset = buf.len();
    let t = buf.write_word(&value, false).unwrap();
    assert_eq!(t, EncodeType::Mirror);
    assert_eq!(buf.data()[offset], FLAG_MIRROR_FLAG);
}

#[test]
fn saved_addresses_are_read_back_from_the_store() {
    let address = [0x99u8; 20];

    let mut buf = storage_buffer(Indexes::default());
    let t = buf.write_word(&address, true).unwrap();
    assert_eq!(t, EncodeType::WriteStorage);
    assert_eq!(buf.data()[1], FLAG_SAVE_ADDRESS);
    assert_eq!(&buf.data()[2..22], &address);

    // The second occurrence re-reads the slot the save flag wrote.
    let t = buf.write_word(&address, true).unwrap();
    assert_eq!(t, EncodeType::Mirror);
    assert_eq!(buf.data()[22..], [FLAG_READ_STORE_FLAG, 0x00, 0x01]);
}

#[test]
fn save_bytes32_requires_a_wide_value() {
    let mut buf = storage_buffer(Indexes::default());
    let t = buf.write_word(&opaque_word(0x99), true).unwrap();
    assert_eq!(t, EncodeType::WriteStorage);
    assert_eq!(buf.data()[1], FLAG_SAVE_BYTES32);

    // 24 bytes: too wide for an address slot, too narrow for a bytes32
    // slot, so it ships raw even with save-word set.
    let mut buf = storage_buffer(Indexes::default());
    let t = buf.write_word(&[0x99u8; 24], true).unwrap();
    assert_eq!(t, EncodeType::Stateless);
    assert_eq!(buf.data()[1], FLAG_READ_BYTES32_1_BYTES + 23);
}

#[test]
fn stored_indexes_pick_the_narrowest_read_flag() {
    let address = [0x99u8; 20];
    let padded = left_pad_32(&address);

    for (index, flag, payload) in [
        (5u32, FLAG_READ_ADDRESS_2, vec![0x00, 0x05]),
        (0x1_0000, FLAG_READ_ADDRESS_3, vec![0x01, 0x00, 0x00]),
        (0x100_0000, FLAG_READ_ADDRESS_4, vec![0x01, 0x00, 0x00, 0x00]),
    ] {
        let mut indexes = Indexes::default();
        indexes.address_indexes.insert(padded.to_vec(), index);

        let mut buf = storage_buffer(indexes);
        let t = buf.write_word(&address, true).unwrap();
        assert_eq!(t, EncodeType::ReadStorage);
        assert_eq!(buf.data()[1], flag);
        assert_eq!(&buf.data()[2..], payload.as_slice());
    }
}

#[test]
fn stored_reads_do_not_register_mirrors() {
    let word = opaque_word(0x99);

    let mut indexes = Indexes::default();
    indexes.bytes32_indexes.insert(word.to_vec(), 9);

    let mut buf = storage_buffer(indexes);
    let t = buf.write_word(&word, true).unwrap();
    assert_eq!(t, EncodeType::ReadStorage);
    assert_eq!(buf.data()[1..], [FLAG_READ_BYTES32_2, 0x00, 0x09]);

    // A ReadStorage flag leaves no back-reference: the value reads from
    // storage again instead of mirroring.
    let t = buf.write_word(&word, true).unwrap();
    assert_eq!(t, EncodeType::ReadStorage);
    assert_eq!(buf.data()[4..], [FLAG_READ_BYTES32_2, 0x00, 0x09]);
}

#[test]
fn words_already_in_calldata_are_copied() {
    let mut buf = buffer();

    // A raw blob whose middle 32 bytes look like a word value.
    let mut blob = [0u8; 34];
    for (i, b) in blob.iter_mut().enumerate() {
        *b = 0x40 + i as u8;
    }
    buf.write_bytes(&blob, false).unwrap();

    let word: [u8; 32] = blob[1..33].try_into().unwrap();
    let offset = buf.find_past_data(&word).unwrap();
    assert_eq!(offset, 5);

    let before = buf.len();
    buf.write_word(&word, false).unwrap();
    assert_eq!(
        buf.data()[before..],
        [FLAG_COPY_CALLDATA, 0x00, offset as u8, 0x20]
    );
}

#[test]
fn denied_opcodes_fall_through_to_the_next_rule() {
    // With the raw bytes32 family denied, a single byte that happens to be
    // a power of two takes the arithmetic route instead.
    let allow = Arc::new(AllowOpcodes::denying(flags_matching("bytes32")));
    let mut buf = Buffer::new(Method::DecodeAny, None, Some(allow), false);
    buf.write_word(&[0x20], false).unwrap();
    assert_eq!(buf.data()[1..], [FLAG_READ_POWER_OF_2, 5]);
}

#[test]
fn no_legal_strategy_is_an_error() {
    let allow = Arc::new(AllowOpcodes::denying(flags_matching("bytes32")));
    let mut buf = Buffer::new(Method::DecodeAny, None, Some(allow), false);
    assert_eq!(
        buf.write_word(&[0xab, 0xcd, 0xef], false),
        Err(EncodeError::NotAllowed("bytes32"))
    );

    // Zero with literals denied has nowhere to go either.
    let allow = Arc::new(AllowOpcodes::denying(flags_matching("literal")));
    let mut buf = Buffer::new(Method::DecodeAny, None, Some(allow), false);
    assert_eq!(
        buf.write_word(&[0u8; 32], false),
        Err(EncodeError::EmptyWord)
    );
}

#[test]
fn oversized_words_are_rejected() {
    let mut buf = buffer();
    assert_eq!(
        buf.write_word(&[0x01; 33], false),
        Err(EncodeError::WordTooLong)
    );
}

#[test]
fn random_words_mirror_on_their_second_occurrence() {
    let rng = &mut StdRng::seed_from_u64(2322);

    for _ in 0..64 {
        let word: [u8; 32] = rng.gen();

        let mut a = buffer();
        let mut b = buffer();
        a.write_word(&word, false).unwrap();
        b.write_word(&word, false).unwrap();
        assert_eq!(a.data(), b.data());

        let before = a.len();
        let t = a.write_word(&word, false).unwrap();
        assert_eq!(t, EncodeType::Mirror);
        assert_eq!(a.len(), before + 3);
    }
}

#[quickcheck]
fn encoding_is_deterministic_and_never_worse_than_raw(data: Vec<u8>) -> TestResult {
    let mut data = data;
    data.truncate(32);

    let mut a = buffer();
    let mut b = buffer();
    a.write_word(&data, false).unwrap();
    b.write_word(&data, false).unwrap();

    if a.data() != b.data() {
        return TestResult::failed();
    }

    // Method byte plus at worst the raw fallback (flag + payload).
    TestResult::from_bool(a.len() <= 2 + data.len())
}
