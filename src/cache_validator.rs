use sha2::{Digest, Sha256};

/// Integrity checking for cached analysis payloads.
///
/// Credit analyses are cached as serialized JSON. Each entry carries a
/// SHA-256 digest computed at insert time; a mismatch on read means the
/// entry is corrupt and the analysis is recomputed from the store.

/// A cached payload together with its digest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CachedPayload {
    payload: String,
    digest: String,
}

impl CachedPayload {
    fn digest_of(payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Wraps a payload with its digest and serializes it for the cache.
    pub fn seal(payload: String) -> String {
        let entry = CachedPayload {
            digest: Self::digest_of(&payload),
            payload,
        };
        serde_json::to_string(&entry).unwrap_or_default()
    }

    /// Deserializes a cache entry and returns the payload only if the
    /// digest still matches. `None` means corrupt or unparseable.
    pub fn open(serialized: &str) -> Option<String> {
        let entry: CachedPayload = serde_json::from_str(serialized).ok()?;

        if CachedPayload::digest_of(&entry.payload) == entry.digest {
            Some(entry.payload)
        } else {
            tracing::warn!(
                "Discarding cache entry with digest mismatch ({} bytes)",
                entry.payload.len()
            );
            None
        }
    }
}
