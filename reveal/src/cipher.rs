//! Seals a committer's name under a secret-space coefficient.
//!
//! Layout: `nonce (16) || name XOR keystream || tag (32)`. The keystream is
//! the BLAKE3 XOF keyed by a key derived from the coefficient, the tag is a
//! keyed BLAKE3 hash over nonce and body.

use blake3::Hasher;
use curve25519_dalek::Scalar;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

pub const NONCE_LEN: usize = 16;
pub const TAG_LEN: usize = blake3::OUT_LEN;

const STREAM_CONTEXT: &str = "ac2 2025-01-01 commitment identity keystream";
const TAG_CONTEXT: &str = "ac2 2025-01-01 commitment identity tag";

fn derive(context: &str, key: &Scalar) -> [u8; 32] {
    blake3::derive_key(context, key.as_bytes())
}

fn apply_keystream(key: &Scalar, nonce: &[u8], buf: &mut [u8]) {
    let mut stream_key = derive(STREAM_CONTEXT, key);
    let mut hasher = Hasher::new_keyed(&stream_key);
    hasher.update(nonce);

    let mut keystream = vec![0u8; buf.len()];
    hasher.finalize_xof().fill(&mut keystream);

    buf.iter_mut()
        .zip(keystream.iter())
        .for_each(|(b, k)| *b ^= k);

    keystream.zeroize();
    stream_key.zeroize();
}

fn tag(key: &Scalar, nonce: &[u8], body: &[u8]) -> blake3::Hash {
    let mut tag_key = derive(TAG_CONTEXT, key);
    let mut hasher = Hasher::new_keyed(&tag_key);
    hasher.update(nonce);
    hasher.update(body);
    tag_key.zeroize();
    hasher.finalize()
}

pub fn seal<R>(rng: &mut R, key: &Scalar, name: &str) -> Vec<u8>
where
    R: CryptoRng + RngCore,
{
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let mut body = name.as_bytes().to_vec();
    apply_keystream(key, &nonce, &mut body);
    let tag = tag(key, &nonce, &body);

    let mut sealed = Vec::with_capacity(NONCE_LEN + body.len() + TAG_LEN);
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&body);
    sealed.extend_from_slice(tag.as_bytes());
    sealed
}

/// `None` unless `ciphertext` was sealed under `key`.
pub fn open(key: &Scalar, ciphertext: &[u8]) -> Option<String> {
    if ciphertext.len() < NONCE_LEN + TAG_LEN {
        return None;
    }

    let (nonce, rest) = ciphertext.split_at(NONCE_LEN);
    let (body, received) = rest.split_at(rest.len() - TAG_LEN);

    let mut received_tag = [0u8; TAG_LEN];
    received_tag.copy_from_slice(received);

    // constant time
    if tag(key, nonce, body) != received_tag {
        return None;
    }

    let mut plaintext = body.to_vec();
    apply_keystream(key, nonce, &mut plaintext);
    String::from_utf8(plaintext).ok()
}

// same length as a sealed `name_len` byte name, but keyed by nothing
pub fn decoy<R>(rng: &mut R, name_len: usize) -> Vec<u8>
where
    R: CryptoRng + RngCore,
{
    let mut bytes = vec![0u8; NONCE_LEN + name_len + TAG_LEN];
    rng.fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod test {
    use common::random::random_scalar;

    use super::{NONCE_LEN, TAG_LEN, decoy, open, seal};

    #[test]
    fn seal_open() {
        let mut rng = rand::rng();
        let key = random_scalar(&mut rng);

        let sealed = seal(&mut rng, &key, "Ada Lovelace");
        assert_eq!(sealed.len(), NONCE_LEN + "Ada Lovelace".len() + TAG_LEN);
        assert_eq!(open(&key, &sealed).as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn fresh_nonce_per_seal() {
        let mut rng = rand::rng();
        let key = random_scalar(&mut rng);
        assert_ne!(seal(&mut rng, &key, "Bob"), seal(&mut rng, &key, "Bob"));
    }

    #[test]
    fn wrong_key_or_tamper() {
        let mut rng = rand::rng();
        let key = random_scalar(&mut rng);
        let other = random_scalar(&mut rng);

        let mut sealed = seal(&mut rng, &key, "Charlie");
        assert_eq!(open(&other, &sealed), None);

        sealed[NONCE_LEN] ^= 1;
        assert_eq!(open(&key, &sealed), None);

        assert_eq!(open(&key, &sealed[..NONCE_LEN + TAG_LEN - 1]), None);
        assert_eq!(open(&key, &decoy(&mut rng, 7)), None);
    }

    #[test]
    fn empty_name() {
        let mut rng = rand::rng();
        let key = random_scalar(&mut rng);
        let sealed = seal(&mut rng, &key, "");
        assert_eq!(open(&key, &sealed).as_deref(), Some(""));
    }
}
