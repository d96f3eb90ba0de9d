//! Packed binary form of fingerprint records and union keys.
//!
//! Both shapes share one little-endian layout, so an index page can hold
//! either: a size prefix, then `cprint_len`, three header words, the two
//! fixed vectors, and the codeword stream. For a record the header words
//! are `songlen` / `bit_rate` / `num_errors`; for a union key they are
//! `min_songlen` / `bit_rate` / `max_songlen`.

use fprint_core::merge::FPrintUnion;
use fprint_core::record::{FPrint, CORRUPT_CPRINT_LEN, DOM_SIZE, R_SIZE};
use thiserror::Error;

/// Header words after the size prefix: `cprint_len` plus three fields.
pub const PACKED_HEADER_SIZE: usize = 16;
/// Fixed payload bytes before the codeword stream.
pub const PACKED_FIXED_SIZE: usize = PACKED_HEADER_SIZE + R_SIZE + DOM_SIZE;
/// Size-prefix width.
pub const PACKED_PREFIX_SIZE: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("packed fingerprint truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("cprint length {0} marks the record as corrupt")]
    CorruptLen(usize),
    #[error("declared payload of {declared} bytes does not fit {cprint_len} codewords")]
    SizeMismatch { declared: usize, cprint_len: usize },
    #[error("packed fingerprint has no codewords")]
    EmptyCprint,
}

/// Total encoded size (prefix included) for a stream of `cprint_len`
/// codewords.
pub fn packed_size(cprint_len: usize) -> usize {
    PACKED_PREFIX_SIZE + PACKED_FIXED_SIZE + 4 * cprint_len
}

/// Read the codeword count out of a packed buffer without decoding it.
pub fn peek_cprint_len(buf: &[u8]) -> Option<usize> {
    let b = buf.get(PACKED_PREFIX_SIZE..PACKED_PREFIX_SIZE + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
}

pub fn record_to_bytes(fp: &FPrint) -> Vec<u8> {
    encode(
        fp.songlen,
        fp.bit_rate,
        fp.num_errors as u32,
        &fp.r,
        &fp.dom,
        fp.cprint(),
    )
}

pub fn record_from_bytes(buf: &[u8]) -> Result<FPrint, CodecError> {
    let parts = decode(buf)?;
    Ok(FPrint::new(
        parts.w1,
        parts.w2,
        parts.w3 as i32,
        parts.r,
        parts.dom,
        parts.cprint,
    ))
}

pub fn union_to_bytes(u: &FPrintUnion) -> Vec<u8> {
    encode(u.min_songlen, u.bit_rate, u.max_songlen, &u.r, &u.dom, u.cprint())
}

pub fn union_from_bytes(buf: &[u8]) -> Result<FPrintUnion, CodecError> {
    let parts = decode(buf)?;
    Ok(FPrintUnion::new(
        parts.w1, parts.w2, parts.w3, parts.r, parts.dom, parts.cprint,
    ))
}

struct RawParts {
    w1: u32,
    w2: i32,
    w3: u32,
    r: [u8; R_SIZE],
    dom: [u8; DOM_SIZE],
    cprint: Vec<i32>,
}

fn encode(w1: u32, w2: i32, w3: u32, r: &[u8; R_SIZE], dom: &[u8; DOM_SIZE], cprint: &[i32]) -> Vec<u8> {
    let payload = PACKED_FIXED_SIZE + 4 * cprint.len();
    let mut out = Vec::with_capacity(PACKED_PREFIX_SIZE + payload);
    out.extend_from_slice(&(payload as u32).to_le_bytes());
    out.extend_from_slice(&(cprint.len() as u32).to_le_bytes());
    out.extend_from_slice(&w1.to_le_bytes());
    out.extend_from_slice(&w2.to_le_bytes());
    out.extend_from_slice(&w3.to_le_bytes());
    out.extend_from_slice(r);
    out.extend_from_slice(dom);
    for c in cprint {
        out.extend_from_slice(&c.to_le_bytes());
    }
    out
}

fn read_u32(buf: &[u8], ix: usize) -> u32 {
    u32::from_le_bytes([buf[ix], buf[ix + 1], buf[ix + 2], buf[ix + 3]])
}

fn decode(buf: &[u8]) -> Result<RawParts, CodecError> {
    if buf.len() < PACKED_PREFIX_SIZE {
        return Err(CodecError::Truncated {
            need: PACKED_PREFIX_SIZE,
            have: buf.len(),
        });
    }
    let declared = read_u32(buf, 0) as usize;
    let total = PACKED_PREFIX_SIZE + declared;
    if buf.len() < total {
        return Err(CodecError::Truncated {
            need: total,
            have: buf.len(),
        });
    }
    if declared < PACKED_FIXED_SIZE {
        return Err(CodecError::Truncated {
            need: PACKED_PREFIX_SIZE + PACKED_FIXED_SIZE,
            have: total,
        });
    }

    let payload = &buf[PACKED_PREFIX_SIZE..total];
    let cprint_len = read_u32(payload, 0) as usize;
    if cprint_len >= CORRUPT_CPRINT_LEN {
        return Err(CodecError::CorruptLen(cprint_len));
    }
    if cprint_len == 0 {
        return Err(CodecError::EmptyCprint);
    }
    if declared != PACKED_FIXED_SIZE + 4 * cprint_len {
        return Err(CodecError::SizeMismatch {
            declared,
            cprint_len,
        });
    }

    let w1 = read_u32(payload, 4);
    let w2 = read_u32(payload, 8) as i32;
    let w3 = read_u32(payload, 12);

    let mut r = [0u8; R_SIZE];
    r.copy_from_slice(&payload[PACKED_HEADER_SIZE..PACKED_HEADER_SIZE + R_SIZE]);
    let mut dom = [0u8; DOM_SIZE];
    let dom_off = PACKED_HEADER_SIZE + R_SIZE;
    dom.copy_from_slice(&payload[dom_off..dom_off + DOM_SIZE]);

    let cp_off = dom_off + DOM_SIZE;
    let cprint: Vec<i32> = (0..cprint_len)
        .map(|k| read_u32(payload, cp_off + 4 * k) as i32)
        .collect();

    Ok(RawParts {
        w1,
        w2,
        w3,
        r,
        dom,
        cprint,
    })
}
