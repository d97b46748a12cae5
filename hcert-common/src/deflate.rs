// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! zlib compression adapter.
//!
//! The transport always compresses the COSE bytes with a zlib stream.
//! Decompression loops over a bounded buffer until the inflater reports
//! stream end; corrupt or truncated streams error out rather than
//! returning partial data.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

const BUF_STEP: usize = 4 * 1024;

/// Hard cap on decompressed output. Certificate payloads are a few hundred
/// bytes; anything approaching this limit is a decompression bomb.
const MAX_DECOMPRESSED: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompressionError {
    #[error("corrupt deflate stream: {0}")]
    Corrupt(String),

    #[error("truncated deflate stream after {consumed} input bytes")]
    Truncated { consumed: usize },

    #[error("decompressed output exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Compress bytes into a zlib stream.
pub fn compress(input: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut deflater = Compress::new(Compression::default(), true);
    let mut out = Vec::with_capacity(input.len() / 2 + 64);

    loop {
        let consumed = deflater.total_in() as usize;
        let status = deflater
            .compress_vec(&input[consumed..], &mut out, FlushCompress::Finish)
            .map_err(|e| CompressionError::Corrupt(e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => out.reserve(BUF_STEP),
        }
    }
}

/// Decompress a zlib stream.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(BUF_STEP);

    loop {
        let consumed = inflater.total_in() as usize;
        let status = inflater
            .decompress_vec(&input[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| CompressionError::Corrupt(e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                if out.len() > MAX_DECOMPRESSED {
                    return Err(CompressionError::TooLarge {
                        limit: MAX_DECOMPRESSED,
                    });
                }
                // All input consumed with room to spare in the output buffer
                // means the stream ended without a trailer.
                if inflater.total_in() as usize == input.len() && out.len() < out.capacity() {
                    return Err(CompressionError::Truncated {
                        consumed: input.len(),
                    });
                }
                out.reserve(BUF_STEP);
            }
        }
    }
}
