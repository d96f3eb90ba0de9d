//! Fingerprint collection reader.

use crate::bytes::{self, PACKED_PREFIX_SIZE};
use crate::text;
use anyhow::{Context, Result};
use fprint_core::record::FPrint;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

pub struct FpReader;

impl FpReader {
    /// Read a text collection: one canonical fingerprint per line.
    /// Blank lines and `#` comments are skipped.
    pub fn read_text(path: &Path) -> Result<Vec<FPrint>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open fingerprint file: {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fp = text::fprint_from_string(trimmed).with_context(|| {
                format!("{}:{}: invalid fingerprint", path.display(), lineno + 1)
            })?;
            records.push(fp);
        }

        log::info!("Read {} fingerprints from {}", records.len(), path.display());
        Ok(records)
    }

    /// Read a packed binary collection: consecutive size-prefixed blobs.
    pub fn read_packed(path: &Path) -> Result<Vec<FPrint>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open fingerprint file: {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let mut records = Vec::new();
        let mut off = 0usize;
        while off < buf.len() {
            if buf.len() - off < PACKED_PREFIX_SIZE {
                anyhow::bail!(
                    "{}: trailing {} bytes at offset {}",
                    path.display(),
                    buf.len() - off,
                    off
                );
            }
            let fp = bytes::record_from_bytes(&buf[off..])
                .with_context(|| format!("{}: record at offset {}", path.display(), off))?;
            off += bytes::packed_size(fp.cprint_len());
            records.push(fp);
        }

        log::info!("Read {} fingerprints from {}", records.len(), path.display());
        Ok(records)
    }
}
