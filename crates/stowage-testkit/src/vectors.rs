//! Golden stored-name vectors.
//!
//! Stored names are persistent identifiers: changing fingerprinting or
//! suffix derivation orphans every previously stored file. These vectors
//! pin the derivation down.

use stowage::core::ExtraParams;
use stowage::ContentDescriptor;

/// BLAKE3 of the empty input.
pub const EMPTY_DIGEST: &str = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";
/// BLAKE3 of `b"abc"`.
pub const ABC_DIGEST: &str = "6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85";

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub original_name: &'static str,
    pub payload: &'static [u8],
    pub expected_stored_name: String,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty payload keeps extension",
            original_name: "empty.txt",
            payload: b"",
            expected_stored_name: format!("{EMPTY_DIGEST}.txt"),
        },
        GoldenVector {
            name: "only the last extension counts",
            original_name: "abc.tar.gz",
            payload: b"abc",
            expected_stored_name: format!("{ABC_DIGEST}.gz"),
        },
        GoldenVector {
            name: "no extension",
            original_name: "README",
            payload: b"abc",
            expected_stored_name: ABC_DIGEST.to_string(),
        },
        GoldenVector {
            name: "dotfile has no extension",
            original_name: ".bashrc",
            payload: b"abc",
            expected_stored_name: ABC_DIGEST.to_string(),
        },
        GoldenVector {
            name: "dot in a directory is ignored",
            original_name: "dir.d/notes",
            payload: b"abc",
            expected_stored_name: ABC_DIGEST.to_string(),
        },
        GoldenVector {
            name: "extension case preserved",
            original_name: "photo.JPG",
            payload: b"abc",
            expected_stored_name: format!("{ABC_DIGEST}.JPG"),
        },
    ]
}

/// The stored name this implementation derives for a vector.
pub fn stored_name_for(vector: &GoldenVector) -> String {
    ContentDescriptor::hashed(vector.original_name, vector.payload, ExtraParams::new())
        .stored_name()
        .to_string()
}

/// Check every vector, reporting `(name, matches, derived)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let derived = stored_name_for(v);
            (v.name.to_string(), derived == v.expected_stored_name, derived)
        })
        .collect()
}
