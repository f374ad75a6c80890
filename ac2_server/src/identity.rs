//! Invite lists and committer identities are kept only as keyed digests.

use zeroize::Zeroize;

const IDENTITY_CONTEXT: &str = "ac2 2025-01-01 invited identity digest";

pub struct NameHasher {
    key: [u8; 32],
}

impl NameHasher {
    /// The key is bound to one objective, so digests do not link a person
    /// across objectives.
    pub fn for_objective(seed: &[u8; 32]) -> Self {
        Self {
            key: blake3::derive_key(IDENTITY_CONTEXT, seed),
        }
    }

    pub fn digest(&self, name: &str) -> String {
        blake3::keyed_hash(&self.key, normalize(name).as_bytes())
            .to_hex()
            .to_string()
    }
}

impl Drop for NameHasher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

pub fn normalize(name: &str) -> &str {
    name.trim()
}

#[cfg(test)]
mod test {
    use super::NameHasher;

    #[test]
    fn digests() {
        let a = NameHasher::for_objective(&[1u8; 32]);
        let b = NameHasher::for_objective(&[2u8; 32]);

        assert_eq!(a.digest("Ada"), a.digest("  Ada\n"));
        assert_ne!(a.digest("Ada"), a.digest("ada"));
        assert_ne!(a.digest("Ada"), b.digest("Ada"));
        assert_eq!(a.digest("Ada").len(), 64);
    }
}
