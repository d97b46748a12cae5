// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Base45 transcoding (RFC 9285).
//!
//! QR alphanumeric mode can carry only a 45-character alphabet, so the
//! compressed COSE bytes are transported as Base45 text. Two bytes map to
//! three characters, a trailing single byte maps to two characters.

/// The fixed Base45 alphabet, indexed by digit value.
pub const ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

const REVERSE: [i8; 256] = build_reverse_table();

const fn build_reverse_table() -> [i8; 256] {
    let mut table = [-1i8; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as i8;
        i += 1;
    }
    table
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Base45DecodeError {
    #[error("character {character:?} at position {position} is not in the Base45 alphabet")]
    InvalidCharacter { character: char, position: usize },

    #[error("input length {length} leaves a dangling single character")]
    InvalidLength { length: usize },

    #[error("chunk at position {position} decodes to a value outside the byte range")]
    InvalidChunk { position: usize },
}

/// Encode bytes as Base45 text.
pub fn encode(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len() / 2 * 3 + 3);

    let mut chunks = input.chunks_exact(2);
    for pair in &mut chunks {
        let v = u32::from(pair[0]) * 256 + u32::from(pair[1]);
        out.push(ALPHABET[(v % 45) as usize] as char);
        out.push(ALPHABET[(v / 45 % 45) as usize] as char);
        out.push(ALPHABET[(v / 2025) as usize] as char);
    }

    if let [b] = chunks.remainder() {
        out.push(ALPHABET[(*b % 45) as usize] as char);
        out.push(ALPHABET[(*b / 45) as usize] as char);
    }

    out
}

/// Decode Base45 text back into bytes.
///
/// Fails on characters outside the alphabet, on a dangling single trailing
/// character, and on chunks whose value exceeds what their byte width can
/// hold (45^3 > 2^16 and 45^2 > 2^8, so both chunk forms have dead ranges).
pub fn decode(input: &str) -> Result<Vec<u8>, Base45DecodeError> {
    let bytes = input.as_bytes();
    if bytes.len() % 3 == 1 {
        return Err(Base45DecodeError::InvalidLength {
            length: bytes.len(),
        });
    }

    let mut digits = Vec::with_capacity(bytes.len());
    for (position, &b) in bytes.iter().enumerate() {
        let digit = REVERSE[b as usize];
        if digit < 0 {
            return Err(Base45DecodeError::InvalidCharacter {
                character: b as char,
                position,
            });
        }
        digits.push(digit as u32);
    }

    let mut out = Vec::with_capacity(digits.len() / 3 * 2 + 1);

    let mut chunks = digits.chunks_exact(3);
    for (i, chunk) in (&mut chunks).enumerate() {
        let v = chunk[0] + chunk[1] * 45 + chunk[2] * 2025;
        if v > u32::from(u16::MAX) {
            return Err(Base45DecodeError::InvalidChunk { position: i * 3 });
        }
        out.push((v / 256) as u8);
        out.push((v % 256) as u8);
    }

    if let [c0, c1] = chunks.remainder() {
        let v = c0 + c1 * 45;
        if v > u32::from(u8::MAX) {
            return Err(Base45DecodeError::InvalidChunk {
                position: digits.len() - 2,
            });
        }
        out.push(v as u8);
    }

    Ok(out)
}
