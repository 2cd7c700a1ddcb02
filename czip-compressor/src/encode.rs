//! Word and byte-stream encoders.
//!
//! Both encoders walk a fixed list of candidate representations and take
//! the first one that is allowed by the opcode policy and matches the
//! value. The list is ordered so that earlier matches are never longer
//! than later ones, which keeps the selection greedy and deterministic.

use czip_asm::flags::*;
use czip_types::bytes::{left_pad, min_bytes_to_represent, trim_leading_zeros};
use czip_types::{num, WORD_SIZE};

use crate::buffer::{Buffer, EncodeType};
use crate::error::EncodeError;

impl Buffer {
    /// Picks the shortest legal encoding for a word of up to 32 bytes.
    fn encode_word(
        &self,
        word: &[u8],
        save_word: bool,
    ) -> Result<(Vec<u8>, EncodeType), EncodeError> {
        if word.len() > 32 {
            return Err(EncodeError::WordTooLong);
        }

        let trimmed = trim_leading_zeros(word);

        // Zero and small integers fit entirely in the flag byte.
        if self.allows(LITERAL_ZERO) && trimmed.is_empty() {
            return Ok((vec![LITERAL_ZERO], EncodeType::Stateless));
        }

        if self.allows(LITERAL_ZERO) && trimmed.len() == 1 && trimmed[0] <= MAX_LITERAL {
            return Ok((vec![LITERAL_ZERO + trimmed[0]], EncodeType::Stateless));
        }

        // A single raw byte; every strategy below costs two bytes anyway.
        if self.allows(FLAG_READ_BYTES32_1_BYTES) && trimmed.len() == 1 {
            return self.encode_word_bytes32(trimmed);
        }

        if self.allows(FLAG_READ_POWER_OF_2) {
            if let Some(k) = num::is_pow2(trimmed) {
                return Ok((vec![FLAG_READ_POWER_OF_2, k as u8], EncodeType::Stateless));
            }
        }

        if self.allows(FLAG_POW_10) {
            if let Some(k) = num::is_pow10(trimmed) {
                if (1..=77).contains(&k) {
                    return Ok((vec![FLAG_POW_10, k as u8], EncodeType::Stateless));
                }
            }
        }

        // The decompressor adds one to the exponent, hence k - 1. Tried
        // before the two-byte raw form so that 0xffff lands here.
        if self.allows(FLAG_POW_2_MINUS_1) {
            if let Some(k) = num::is_pow2_minus_1(trimmed) {
                return Ok((vec![FLAG_POW_2_MINUS_1, (k - 1) as u8], EncodeType::Stateless));
            }
        }

        if self.allows(FLAG_READ_BYTES32_1_BYTES) && trimmed.len() <= 2 {
            return self.encode_word_bytes32(trimmed);
        }

        // 10^n * m with 5 exponent bits and 11 mantissa bits.
        if self.allows(FLAG_READ_POW_10_MANTISSA_S) {
            if let Some((n, m)) = num::is_pow10_mantissa(trimmed, 32, 2047) {
                return Ok((
                    vec![
                        FLAG_READ_POW_10_MANTISSA_S,
                        ((n as u8) << 3) | (m >> 8) as u8,
                        m as u8,
                    ],
                    EncodeType::Stateless,
                ));
            }
        }

        // Mirrors point at earlier flags by committed offset. The lookup
        // key is the padded form: the decompressor always materializes a
        // full word, however the value was trimmed at its first use.
        let padded32: [u8; 32] = left_pad(trimmed).ok_or(EncodeError::PadOverflow)?;

        if self.allows(FLAG_MIRROR_FLAG) {
            let used = self.used_flag(&padded32);
            if used != 0 {
                let used = used - 1;
                // 16-bit pointer, and never a pointer to the flag itself.
                if used <= 0xffff && used != self.len() {
                    return Ok((
                        vec![FLAG_MIRROR_FLAG, (used >> 8) as u8, used as u8],
                        EncodeType::Mirror,
                    ));
                }
            }
        }

        // Save flags can be mirrored too, through an opcode that re-reads
        // the stored slot instead of storing the value a second time.
        if self.allows(FLAG_READ_STORE_FLAG) {
            let used = self.used_storage_flag(&padded32);
            if used != 0 {
                let used = used - 1;
                if used <= 0xffff {
                    return Ok((
                        vec![FLAG_READ_STORE_FLAG, (used >> 8) as u8, used as u8],
                        EncodeType::Mirror,
                    ));
                }
            }
        }

        if self.allows(FLAG_READ_BYTES32_1_BYTES) && trimmed.len() <= 3 {
            return self.encode_word_bytes32(trimmed);
        }

        // 10^n * m again, now with 6 exponent bits and 18 mantissa bits.
        if self.allows(FLAG_READ_POW_10_MANTISSA) {
            if let Some((n, m)) = num::is_pow10_mantissa(trimmed, 63, 262143) {
                return Ok((
                    vec![
                        FLAG_READ_POW_10_MANTISSA,
                        ((n as u8) << 2) | (m >> 16) as u8,
                        (m >> 8) as u8,
                        m as u8,
                    ],
                    EncodeType::Stateless,
                ));
            }
        }

        // The padded word may already sit somewhere in the stream.
        if self.allows(FLAG_COPY_CALLDATA) {
            if let Some(index) = self.find_past_data(&padded32) {
                if index <= 0xffff {
                    return Ok((
                        vec![FLAG_COPY_CALLDATA, (index >> 8) as u8, index as u8, 0x20],
                        EncodeType::Stateless,
                    ));
                }
            }
        }

        // Storage-backed strategies only pay off on networks where reading
        // contract state is cheaper than shipping calldata.
        if self.use_contract_storage() {
            let address_index = self
                .indexes()
                .address_indexes
                .get(padded32.as_slice())
                .copied()
                .unwrap_or(0);
            if address_index != 0 {
                if let Some(encoded) = self.encode_stored_index(address_index, FLAG_READ_ADDRESS_2)
                {
                    return Ok((encoded, EncodeType::ReadStorage));
                }
            }

            let bytes32_index = self
                .indexes()
                .bytes32_indexes
                .get(padded32.as_slice())
                .copied()
                .unwrap_or(0);
            if bytes32_index != 0 {
                if let Some(encoded) = self.encode_stored_index(bytes32_index, FLAG_READ_BYTES32_2)
                {
                    return Ok((encoded, EncodeType::ReadStorage));
                }
            }

            if save_word {
                // Saved values are padded to 20 or 32 bytes on-chain; values
                // much shorter than the slot are cheaper inline.
                if self.allows(FLAG_SAVE_ADDRESS) && (15..=20).contains(&trimmed.len()) {
                    let padded20: [u8; 20] = left_pad(trimmed).ok_or(EncodeError::PadOverflow)?;
                    let mut encoded = Vec::with_capacity(21);
                    encoded.push(FLAG_SAVE_ADDRESS);
                    encoded.extend_from_slice(&padded20);
                    return Ok((encoded, EncodeType::WriteStorage));
                }

                if self.allows(FLAG_SAVE_BYTES32) && trimmed.len() >= 27 {
                    let mut encoded = Vec::with_capacity(33);
                    encoded.push(FLAG_SAVE_BYTES32);
                    encoded.extend_from_slice(&padded32);
                    return Ok((encoded, EncodeType::WriteStorage));
                }
            }
        }

        // Out of tricks: ship the trimmed value as-is.
        self.encode_word_bytes32(trimmed)
    }

    /// Raw fallback: the value's byte count selects one of the 32 read
    /// flags and the bytes follow literally.
    fn encode_word_bytes32(&self, word: &[u8]) -> Result<(Vec<u8>, EncodeType), EncodeError> {
        if word.len() > 32 {
            return Err(EncodeError::WordTooLong);
        }

        if word.is_empty() {
            return Err(EncodeError::EmptyWord);
        }

        if !self.allows(FLAG_READ_BYTES32_1_BYTES) {
            return Err(EncodeError::NotAllowed("bytes32"));
        }

        let mut encoded = Vec::with_capacity(1 + word.len());
        encoded.push(FLAG_READ_BYTES32_1_BYTES + (word.len() - 1) as u8);
        encoded.extend_from_slice(word);
        Ok((encoded, EncodeType::Stateless))
    }

    /// Index read against one of the stored tables; the three read flags
    /// for each table are consecutive, ordered by index byte width.
    fn encode_stored_index(&self, index: u32, base_flag: u8) -> Option<Vec<u8>> {
        let width = min_bytes_to_represent(u64::from(index)).max(2);
        let flag = base_flag + (width - 2) as u8;
        if !self.allows(flag) {
            return None;
        }

        let mut encoded = Vec::with_capacity(1 + width);
        encoded.push(flag);
        encoded.extend_from_slice(&index.to_be_bytes()[4 - width..]);
        Some(encoded)
    }

    /// Encodes a word and commits it, registering the padded value so a
    /// later occurrence can mirror this flag.
    pub fn write_word(&mut self, word: &[u8], save_word: bool) -> Result<EncodeType, EncodeError> {
        let (encoded, t) = self.encode_word(word, save_word)?;
        let padded: [u8; 32] = left_pad(word).ok_or(EncodeError::WordTooLong)?;

        self.commit_bytes(&encoded);
        self.end(&padded, t);
        Ok(t)
    }

    /// Writes a 32-byte-aligned run of words behind a nesting header.
    pub fn write_n_words(&mut self, words: &[u8]) -> Result<EncodeType, EncodeError> {
        if words.len() % WORD_SIZE != 0 {
            return Err(EncodeError::UnalignedWords);
        }

        let count = words.len() / WORD_SIZE;
        if count == 0 {
            return Err(EncodeError::EmptyWords);
        }

        if count <= 255 {
            self.commit_byte(FLAG_NESTED_N_FLAGS_S);
            self.commit_byte(count as u8);
        } else if count <= 65535 {
            self.commit_byte(FLAG_NESTED_N_FLAGS_L);
            self.commit_bytes(&(count as u16).to_be_bytes());
        } else {
            return Err(EncodeError::TooManyWords);
        }
        self.end(&[], EncodeType::Stateless);

        let use_storage = self.use_contract_storage();
        let mut encode_type = EncodeType::Stateless;
        for word in words.chunks_exact(WORD_SIZE) {
            encode_type = encode_type.max(self.write_word(word, use_storage)?);
        }

        Ok(encode_type)
    }

    /// Length-prefixed raw blob; the length itself is written as a word.
    pub fn write_n_bytes_raw(&mut self, bytes: &[u8]) -> Result<EncodeType, EncodeError> {
        if !self.allows(FLAG_READ_N_BYTES) {
            return Err(EncodeError::NotAllowed("n bytes"));
        }

        self.commit_byte(FLAG_READ_N_BYTES);
        self.end(bytes, EncodeType::Stateless);

        let t = self.write_word(&(bytes.len() as u64).to_be_bytes(), false)?;

        self.commit_bytes(bytes);
        // A data blob, not a flag: no pointer is registered for it.
        self.end(&[], t);

        Ok(t)
    }

    /// A known selector compresses to its one-byte table index; unknown
    /// selectors ride inline behind a zero marker.
    fn encode_4bytes(&self, selector: &[u8]) -> Vec<u8> {
        match self.indexes().bytes4_indexes.get(selector) {
            Some(&index) if index != 0 => vec![index],
            _ => {
                let mut encoded = vec![0x00];
                encoded.extend_from_slice(selector);
                encoded
            }
        }
    }

    /// Encodes an arbitrary byte string, trying every structural shape the
    /// decompressor understands before falling back to a raw blob.
    pub fn write_bytes(&mut self, bytes: &[u8], save_word: bool) -> Result<EncodeType, EncodeError> {
        if self.allows(FLAG_NO_OP) && bytes.is_empty() {
            self.commit_byte(FLAG_NO_OP);
            self.end(bytes, EncodeType::Stateless);
            return Ok(EncodeType::Stateless);
        }

        // Exactly one word: the word encoder has its own strategies.
        if bytes.len() == 32 {
            return self.write_word(bytes, save_word);
        }

        // Mirror on the exact bytes, unpadded.
        if self.allows(FLAG_MIRROR_FLAG) {
            let used = self.used_flag(bytes);
            if used != 0 {
                let used = used - 1;
                if used <= 0xffff {
                    self.commit_byte(FLAG_MIRROR_FLAG);
                    self.commit_bytes(&[(used >> 8) as u8, used as u8]);
                    // End without a key: a pointer to a pointer helps no one.
                    self.end(&[], EncodeType::Mirror);
                    return Ok(EncodeType::Mirror);
                }
            }
        }

        // The copy length rides in a single byte.
        if self.allows(FLAG_COPY_CALLDATA) && bytes.len() <= 255 {
            if let Some(index) = self.find_past_data(bytes) {
                if index <= 0xffff {
                    self.commit_byte(FLAG_COPY_CALLDATA);
                    self.commit_bytes(&[(index >> 8) as u8, index as u8, bytes.len() as u8]);
                    self.end(&[], EncodeType::Stateless);
                    return Ok(EncodeType::Mirror);
                }
            }
        }

        if self.allows(FLAG_NODE) && bytes.len() == 33 && bytes[0] == 0x03 {
            self.commit_byte(FLAG_NODE);
            self.end(bytes, EncodeType::Stateless);
            return self.write_word(&bytes[1..], save_word);
        }

        if self.allows(FLAG_SUBDIGEST) && bytes.len() == 33 && bytes[0] == 0x05 {
            self.commit_byte(FLAG_SUBDIGEST);
            self.end(bytes, EncodeType::Stateless);
            return self.write_word(&bytes[1..], save_word);
        }

        // An address-with-weight leaf; weights 1..=4 have dedicated flags.
        if self.allows(FLAG_ADDRESS_W0) && bytes.len() == 22 && bytes[0] == 0x01 {
            if (1..=4).contains(&bytes[1]) {
                self.commit_byte(FLAG_ADDRESS_W0 + bytes[1]);
            } else {
                self.commit_byte(FLAG_ADDRESS_W0);
                self.commit_byte(bytes[1]);
            }
            self.end(bytes, EncodeType::Stateless);
            return self.write_word(&bytes[2..], save_word);
        }

        // An EOA-signature-with-weight leaf; the 66 signature bytes are
        // high-entropy and ride raw.
        if self.allows(FLAG_SIGNATURE_W0) && bytes.len() == 68 && bytes[0] == 0x00 {
            if (1..=4).contains(&bytes[1]) {
                self.commit_byte(FLAG_SIGNATURE_W0 + bytes[1]);
            } else {
                self.commit_byte(FLAG_SIGNATURE_W0);
                self.commit_byte(bytes[1]);
            }
            self.commit_bytes(&bytes[2..]);
            self.end(bytes, EncodeType::Stateless);
            return Ok(EncodeType::Stateless);
        }

        // The input may be a whole wallet signature. Attempt it against a
        // snapshot and keep the result only when it beats the plain
        // representation; `may_use_bytes` stays off so the attempt cannot
        // recurse back here. Calldata-only networks never profit from
        // this, so the attempt is gated on contract storage.
        if self.use_contract_storage() {
            let snapshot = self.snapshot();
            let before = self.len();
            match self.write_sequence_signature(bytes, false) {
                Ok(t) if self.len() < before + bytes.len() + 3 => {
                    tracing::debug!(
                        input = bytes.len(),
                        encoded = self.len() - before,
                        "bytes encoded as wallet signature"
                    );
                    return Ok(t);
                }
                _ => self.restore(snapshot),
            }
        }

        // Selector plus up to six words: dedicated compact ABI flags.
        if self.allows(FLAG_ABI_0_PARAM)
            && bytes.len() >= 4
            && bytes.len() <= 6 * 32 + 4
            && (bytes.len() - 4) % 32 == 0
        {
            let params = (bytes.len() - 4) / 32;
            self.commit_byte(FLAG_ABI_0_PARAM + params as u8);
            let selector = self.encode_4bytes(&bytes[..4]);
            self.commit_bytes(&selector);
            self.end(bytes, EncodeType::Stateless);

            let mut encode_type = EncodeType::Stateless;
            for word in bytes[4..].chunks_exact(32) {
                encode_type = encode_type.max(self.write_word(word, save_word)?);
            }
            return Ok(encode_type);
        }

        // Same shape with a one-byte parameter count.
        if self.allows(FLAG_READ_DYNAMIC_ABI)
            && bytes.len() >= 4
            && bytes.len() <= 255 * 32 + 4
            && (bytes.len() - 4) % 32 == 0
        {
            let params = (bytes.len() - 4) / 32;
            self.commit_byte(FLAG_READ_DYNAMIC_ABI);
            let selector = self.encode_4bytes(&bytes[..4]);
            self.commit_bytes(&selector);
            self.commit_byte(params as u8);
            // Zero dynamic-size mask: every argument stays a full word.
            self.commit_byte(0x00);
            self.end(bytes, EncodeType::Stateless);

            let mut encode_type = EncodeType::Stateless;
            for word in bytes[4..].chunks_exact(32) {
                encode_type = encode_type.max(self.write_word(word, save_word)?);
            }
            return Ok(encode_type);
        }

        self.write_n_bytes_raw(bytes)
    }

    /// A call: payload bytes followed by the target word, both save-worthy.
    pub fn write_call(&mut self, to: &[u8], data: &[u8]) -> Result<EncodeType, EncodeError> {
        let t = self.write_bytes(data, true)?;
        let tt = self.write_word(to, true)?;
        Ok(t.max(tt))
    }

    /// A batch of calls behind a one-byte count.
    pub fn write_calls(&mut self, tos: &[&[u8]], datas: &[&[u8]]) -> Result<EncodeType, EncodeError> {
        if tos.is_empty() {
            return Err(EncodeError::EmptyCalls);
        }

        if tos.len() > 255 {
            return Err(EncodeError::TooManyCalls);
        }

        if tos.len() != datas.len() {
            return Err(EncodeError::CallsMismatch);
        }

        self.commit_byte(tos.len() as u8);
        self.end(&[], EncodeType::Stateless);

        let mut encode_type = EncodeType::Stateless;
        for (to, data) in tos.iter().zip(datas) {
            encode_type = encode_type.max(self.write_call(to, data)?);
        }

        Ok(encode_type)
    }
}
