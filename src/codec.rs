//! Chunk codec
//!
//! A chunk is a little-endian `i32` record count followed by that many
//! fixed-width records. Decoding is all-or-nothing: a chunk whose bytes cannot
//! hold the declared count is rejected as [`ReplayError::CorruptChunk`].

use std::io::Read;

use crate::error::{ReplayError, Result};
use crate::types::Record;

/// Size of the count header in bytes
pub const HEADER_LEN: usize = 4;

/// Encode records into a chunk
pub fn encode<R: Record>(records: &[R]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + records.len() * R::ENCODED_LEN);
    out.extend_from_slice(&(records.len() as i32).to_le_bytes());
    for record in records {
        record.encode_into(&mut out);
    }
    out
}

/// Decode a chunk into records
pub fn decode<R: Record>(bytes: &[u8]) -> Result<Vec<R>> {
    let count = parse_count(bytes)?;
    let body = &bytes[HEADER_LEN..];
    let needed = count * R::ENCODED_LEN;
    if body.len() < needed {
        return Err(ReplayError::CorruptChunk {
            declared: count as i64,
            needed,
            available: body.len(),
        });
    }

    Ok(body[..needed]
        .chunks_exact(R::ENCODED_LEN)
        .map(R::decode_from)
        .collect())
}

/// Read only the record count from the start of a chunk
pub fn read_count<Rd: Read>(reader: &mut Rd) -> Result<usize> {
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        match reader.read(&mut header[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    parse_count(&header[..filled])
}

fn parse_count(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < HEADER_LEN {
        return Err(ReplayError::CorruptChunk {
            declared: 0,
            needed: HEADER_LEN,
            available: bytes.len(),
        });
    }

    let mut raw = [0u8; HEADER_LEN];
    raw.copy_from_slice(&bytes[..HEADER_LEN]);
    let count = i32::from_le_bytes(raw);
    if count < 0 {
        return Err(ReplayError::CorruptChunk {
            declared: count as i64,
            needed: 0,
            available: bytes.len() - HEADER_LEN,
        });
    }
    Ok(count as usize)
}
