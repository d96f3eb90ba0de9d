//! JSON output formatting

use serde::Serialize;

/// Pairwise comparison of two fingerprint files
#[derive(Serialize)]
pub struct MatchReport {
    pub file_a: String,
    pub file_b: String,
    /// Composite score in [0,1]
    pub score: f64,
    /// Fixed-vector sub-score
    pub fooid: f64,
    /// Chroma sub-score
    pub chroma: f64,
    pub equal: bool,
    pub matched: bool,
}

/// One search hit
#[derive(Serialize)]
pub struct QueryHit {
    pub songlen: u32,
    pub bit_rate: i32,
    pub num_errors: i32,
    /// Composite score of the stored slice against the query slice
    pub score: f64,
}

/// Result of an index query
#[derive(Serialize)]
pub struct QueryReport {
    pub collection: String,
    pub strategy: String,
    pub indexed: usize,
    pub detections: usize,
    pub results: Vec<QueryHit>,
}

/// Print any report as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing result: {}", e),
    }
}
