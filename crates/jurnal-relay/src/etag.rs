//! ETag computation for stored snapshots.

use sha2::{Digest, Sha256};

/// Quoted SHA-256 hex digest of the stored snapshot text.
pub fn compute_etag(body: &str) -> String {
  let hash = Sha256::digest(body.as_bytes());
  format!("\"{}\"", hex::encode(hash))
}
