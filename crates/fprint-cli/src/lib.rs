//! fprint-cli — command-line front ends for the fingerprint library.

pub mod output;
