//! fprint-fp — wire and file forms of fingerprint records.
//!
//! The canonical text codec, the packed binary codec shared by records
//! and index keys, and collection readers/writers built on both.

pub mod bytes;
pub mod reader;
pub mod text;
pub mod writer;

pub use bytes::{
    packed_size, peek_cprint_len, record_from_bytes, record_to_bytes, union_from_bytes,
    union_to_bytes, CodecError,
};
pub use reader::FpReader;
pub use text::{fprint_from_string, fprint_to_string, ParseError};
pub use writer::FpWriter;
