//! Fingerprint collection writer.

use crate::bytes;
use crate::text;
use anyhow::{Context, Result};
use fprint_core::record::FPrint;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct FpWriter;

impl FpWriter {
    /// Write a text collection: one canonical fingerprint per line.
    pub fn write_text(path: &Path, records: &[FPrint]) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create fingerprint file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        for fp in records {
            writer.write_all(text::fprint_to_string(fp).as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Write a packed binary collection: consecutive size-prefixed blobs.
    pub fn write_packed(path: &Path, records: &[FPrint]) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create fingerprint file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        for fp in records {
            writer.write_all(&bytes::record_to_bytes(fp))?;
        }
        writer.flush()?;

        Ok(())
    }
}
