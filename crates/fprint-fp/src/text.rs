//! Canonical text form of a fingerprint record.
//!
//! `"(songlen,bit_rate,num_errors,RRRR…,DDDD…,c0 c1 … cN)"` — the fixed
//! vectors as uppercase hex nibbles, the codewords as space-separated
//! decimal integers. Parsing accepts either hex case; formatting always
//! emits the canonical uppercase, single-space encoding.

use fprint_core::record::{FPrint, DOM_SIZE, KNOWN_CPRINT_LEN, R_SIZE};
use std::fmt::Write as _;
use thiserror::Error;

/// Shortest well-formed encoding: `"(0,0,0,"` + both hex blocks + `",,0)"`.
pub const MIN_TEXT_LEN: usize = 11 + 2 * R_SIZE + 2 * DOM_SIZE;

/// Widest accepted codeword token, including an optional sign.
const MAX_CODEWORD_WIDTH: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid string length: {0}")]
    TooShort(usize),
    #[error("string must begin with three header fields")]
    BadHeader,
    #[error("invalid format for r block at character {0}")]
    BadRBlock(usize),
    #[error("invalid format for dom block at character {0}")]
    BadDomBlock(usize),
    #[error("missing ',' after {0} block")]
    MissingComma(&'static str),
    #[error("integer ending at position {0} is too wide")]
    CodewordTooWide(usize),
    #[error("invalid character '{0}' at position {1}")]
    InvalidChar(char, usize),
    #[error("missing terminating ')'")]
    Unterminated,
}

/// Render a record in canonical text form.
pub fn fprint_to_string(fp: &FPrint) -> String {
    let mut out =
        String::with_capacity(24 + 2 * R_SIZE + 2 * DOM_SIZE + 12 * fp.cprint_len() + 2);
    let _ = write!(out, "({},{},{},", fp.songlen, fp.bit_rate, fp.num_errors);
    for byte in fp.r.iter() {
        let _ = write!(out, "{:02X}", byte);
    }
    out.push(',');
    for byte in fp.dom.iter() {
        let _ = write!(out, "{:02X}", byte);
    }
    out.push(',');
    for (i, c) in fp.cprint().iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}", c);
    }
    out.push(')');
    out
}

/// Parse the text form back into a record.
pub fn fprint_from_string(s: &str) -> Result<FPrint, ParseError> {
    let b = s.as_bytes();
    if b.len() < MIN_TEXT_LEN {
        return Err(ParseError::TooShort(b.len()));
    }

    let mut ix = 0usize;
    if b[ix] != b'(' {
        return Err(ParseError::BadHeader);
    }
    ix += 1;

    let songlen = parse_header_u32(b, &mut ix)?;
    expect_byte(b, &mut ix, b',').map_err(|_| ParseError::BadHeader)?;
    let bit_rate = parse_header_i32(b, &mut ix)?;
    expect_byte(b, &mut ix, b',').map_err(|_| ParseError::BadHeader)?;
    let num_errors = parse_header_i32(b, &mut ix)?;
    expect_byte(b, &mut ix, b',').map_err(|_| ParseError::BadHeader)?;

    let mut r = [0u8; R_SIZE];
    for slot in r.iter_mut() {
        *slot = parse_hex_byte(b, &mut ix).ok_or(ParseError::BadRBlock(ix))?;
    }
    expect_byte(b, &mut ix, b',').map_err(|_| ParseError::MissingComma("r"))?;

    let mut dom = [0u8; DOM_SIZE];
    for slot in dom.iter_mut() {
        *slot = parse_hex_byte(b, &mut ix).ok_or(ParseError::BadDomBlock(ix))?;
    }
    expect_byte(b, &mut ix, b',').map_err(|_| ParseError::MissingComma("dom"))?;

    let mut cprint: Vec<i32> = Vec::with_capacity(KNOWN_CPRINT_LEN);
    let mut token = [0u8; MAX_CODEWORD_WIDTH];
    let mut toklen = 0usize;
    let mut terminated = false;
    while ix < b.len() {
        let c = b[ix];
        if toklen >= MAX_CODEWORD_WIDTH {
            return Err(ParseError::CodewordTooWide(ix));
        }
        if c == b' ' || c == b')' {
            cprint.push(parse_codeword(&token[..toklen]));
            toklen = 0;
            if c == b')' {
                terminated = true;
                break;
            }
            ix += 1;
        } else if c.is_ascii_digit() || (toklen == 0 && c == b'-') {
            token[toklen] = c;
            toklen += 1;
            ix += 1;
        } else {
            return Err(ParseError::InvalidChar(c as char, ix));
        }
    }
    if !terminated {
        return Err(ParseError::Unterminated);
    }

    Ok(FPrint::new(songlen, bit_rate, num_errors, r, dom, cprint))
}

fn expect_byte(b: &[u8], ix: &mut usize, want: u8) -> Result<(), ()> {
    if b.get(*ix) == Some(&want) {
        *ix += 1;
        Ok(())
    } else {
        Err(())
    }
}

fn parse_digits(b: &[u8], ix: &mut usize) -> Result<u64, ParseError> {
    let mut val: u64 = 0;
    let mut ndigits = 0usize;
    while let Some(&c) = b.get(*ix) {
        if !c.is_ascii_digit() {
            break;
        }
        // ten digits already cover the 32-bit range
        if ndigits >= 10 {
            return Err(ParseError::BadHeader);
        }
        val = val * 10 + u64::from(c - b'0');
        ndigits += 1;
        *ix += 1;
    }
    if ndigits == 0 {
        return Err(ParseError::BadHeader);
    }
    Ok(val)
}

fn parse_header_u32(b: &[u8], ix: &mut usize) -> Result<u32, ParseError> {
    let val = parse_digits(b, ix)?;
    u32::try_from(val).map_err(|_| ParseError::BadHeader)
}

fn parse_header_i32(b: &[u8], ix: &mut usize) -> Result<i32, ParseError> {
    let neg = b.get(*ix) == Some(&b'-');
    if neg {
        *ix += 1;
    }
    let val = parse_digits(b, ix)? as i64;
    let val = if neg { -val } else { val };
    i32::try_from(val).map_err(|_| ParseError::BadHeader)
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

fn parse_hex_byte(b: &[u8], ix: &mut usize) -> Option<u8> {
    let hi = hex_val(*b.get(*ix)?)?;
    let lo = hex_val(*b.get(*ix + 1)?)?;
    *ix += 2;
    Some((hi << 4) | lo)
}

/// Decode one accumulated codeword token. An empty token decodes to
/// zero; a value outside the 32-bit range wraps.
fn parse_codeword(token: &[u8]) -> i32 {
    let mut val: i64 = 0;
    let mut neg = false;
    for (i, &c) in token.iter().enumerate() {
        if i == 0 && c == b'-' {
            neg = true;
            continue;
        }
        val = val * 10 + i64::from(c - b'0');
    }
    if neg {
        val = -val;
    }
    val as i32
}
