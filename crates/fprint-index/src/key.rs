//! Key slicing: what the index actually stores for each entry.
//!
//! A full chroma stream does not fit on a host page, so indexed entries
//! keep at most [`MAX_KEY_CP_LEN`] codewords cut from a mid-song window
//! (empirically around seconds 30–60, the most stable stretch). The same
//! rule runs again on every read, so a page written by an older build or
//! damaged on disk can never hand an oversized stream to the kernels.

use crate::IndexError;
use fprint_core::merge::FPrintUnion;
use fprint_core::record::FPrint;
use fprint_fp::bytes;

/// Codeword ceiling for stored keys; keeps an entry within one host page.
pub const MAX_KEY_CP_LEN: usize = 240;
/// Mid-song window used when the stream reaches 704 codewords.
pub const KEY_CP_START_IX1: usize = 464;
pub const KEY_CP_END_IX1: usize = 704;
/// Later window used when the stream reaches 944 codewords.
pub const KEY_CP_START_IX2: usize = 704;
pub const KEY_CP_END_IX2: usize = 944;

/// The stored slice for a stream of `cprint_len` codewords, as
/// `(start, len)`. Deterministic in `cprint_len` alone.
pub fn slice_window(cprint_len: usize) -> (usize, usize) {
    let len = MAX_KEY_CP_LEN.min(cprint_len);
    let start = if cprint_len >= KEY_CP_END_IX2 {
        KEY_CP_START_IX2
    } else if cprint_len >= KEY_CP_END_IX1 {
        KEY_CP_START_IX1
    } else {
        0
    };
    (start, len)
}

/// A copy of `fp` reduced to its stored slice.
pub fn compress_record(fp: &FPrint) -> FPrint {
    let (start, len) = slice_window(fp.cprint_len());
    fp.with_cprint_window(start, len)
}

/// Slice a full-record blob for installation as a leaf key.
pub fn compress(blob: &[u8]) -> Result<Vec<u8>, IndexError> {
    let fp = decode_record(blob)?;
    Ok(bytes::record_to_bytes(&compress_record(&fp)))
}

/// Stored entries are returned as-is; the backing buffer stays with the
/// caller. Readers re-slice through [`deserialize_record`] /
/// [`deserialize_key`] instead of trusting the stored form.
pub fn decompress(blob: &[u8]) -> &[u8] {
    blob
}

/// Decode a blob as a record and re-apply the slicing rule.
pub fn deserialize_record(blob: &[u8]) -> Result<FPrint, IndexError> {
    let fp = decode_record(blob)?;
    Ok(compress_record(&fp))
}

/// Decode a blob as a union key and re-apply the slicing rule.
pub fn deserialize_key(blob: &[u8]) -> Result<FPrintUnion, IndexError> {
    if blob.is_empty() {
        return Err(IndexError::EmptyEntry);
    }
    let u = bytes::union_from_bytes(blob)?;
    let (start, len) = slice_window(u.cprint_len());
    Ok(FPrintUnion::new(
        u.min_songlen,
        u.bit_rate,
        u.max_songlen,
        u.r,
        u.dom,
        u.cprint()[start..start + len].to_vec(),
    ))
}

fn decode_record(blob: &[u8]) -> Result<FPrint, IndexError> {
    if blob.is_empty() {
        return Err(IndexError::EmptyEntry);
    }
    Ok(bytes::record_from_bytes(blob)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fprint_core::record::{DOM_SIZE, R_SIZE};

    fn fp_with_len(n: usize) -> FPrint {
        FPrint::new(
            200,
            192,
            0,
            [1u8; R_SIZE],
            [2u8; DOM_SIZE],
            (0..n as i32).collect(),
        )
    }

    #[test]
    fn test_slice_window_rule() {
        // long streams use the later window
        assert_eq!(slice_window(948), (704, 240));
        assert_eq!(slice_window(944), (704, 240));
        // medium streams the earlier one
        assert_eq!(slice_window(800), (464, 240));
        assert_eq!(slice_window(704), (464, 240));
        // short streams keep a bounded prefix
        assert_eq!(slice_window(500), (0, 240));
        assert_eq!(slice_window(240), (0, 240));
        assert_eq!(slice_window(100), (0, 100));
        assert_eq!(slice_window(1), (0, 1));
    }

    #[test]
    fn test_slice_is_deterministic() {
        for len in [1usize, 100, 240, 500, 704, 800, 944, 948, 2000] {
            assert_eq!(slice_window(len), slice_window(len));
        }
    }

    #[test]
    fn test_compress_record_takes_window() {
        let fp = fp_with_len(948);
        let key = compress_record(&fp);
        assert_eq!(key.cprint_len(), 240);
        assert_eq!(key.cprint()[0], 704);
        assert_eq!(key.cprint()[239], 943);
        assert_eq!(key.songlen, fp.songlen);
    }

    #[test]
    fn test_compress_blob_roundtrip() {
        let fp = fp_with_len(800);
        let blob = bytes::record_to_bytes(&fp);
        let key_blob = compress(&blob).unwrap();
        let key = deserialize_record(&key_blob).unwrap();
        assert_eq!(key.cprint_len(), 240);
        assert_eq!(key.cprint()[0], 464);
        // compressing twice changes nothing
        assert_eq!(compress(&key_blob).unwrap(), key_blob);
    }

    #[test]
    fn test_deserialize_rejects_corrupt_and_empty() {
        assert!(matches!(
            deserialize_record(&[]),
            Err(IndexError::EmptyEntry)
        ));

        let fp = fp_with_len(10);
        let mut blob = bytes::record_to_bytes(&fp);
        blob[4..8].copy_from_slice(&200_000u32.to_le_bytes());
        assert!(matches!(
            deserialize_record(&blob),
            Err(IndexError::Codec(_))
        ));
    }

    #[test]
    fn test_deserialize_key_preserves_envelope() {
        let fp = fp_with_len(100);
        let u = FPrintUnion::from_record(&fp);
        let blob = bytes::union_to_bytes(&u);
        let back = deserialize_key(&blob).unwrap();
        assert_eq!(back.min_songlen, 200);
        assert_eq!(back.max_songlen, 200);
        assert_eq!(back.cprint_len(), 100);
    }
}
