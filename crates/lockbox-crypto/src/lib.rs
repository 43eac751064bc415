//! Authenticated envelope encryption for secret payloads.
//!
//! Stateless: key material is passed per call and never cached here. Key
//! lifecycle (derivation, rotation) belongs to the caller.

use chacha20poly1305::{aead::Aead, KeyInit};
use rand_core::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

/// Poly1305 tag length in bytes.
pub const TAG_LEN: usize = 16;

/// XChaCha20 nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Per-organization symmetric encryption key (32 bytes).
#[derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct SecretKey(Zeroizing<[u8; 32]>);

impl SecretKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        SecretKey(Zeroizing::new(*bytes))
    }
}

/// Generate a new random key.
pub fn generate_key() -> SecretKey {
    let mut key = Zeroizing::new([0u8; 32]);
    rand_core::OsRng.fill_bytes(key.as_mut());
    SecretKey(key)
}

/// 24-byte XChaCha20 nonce, fresh per encryption call.
pub struct Nonce(pub [u8; NONCE_LEN]);

/// AEAD ciphertext without the trailing tag.
pub struct Ciphertext(pub Vec<u8>);

/// 16-byte Poly1305 authentication tag, carried separately from the
/// ciphertext so storage rows keep the three columns distinct.
pub struct Tag(pub [u8; TAG_LEN]);

#[derive(Debug, Error)]
pub enum EncryptError {
    #[error("AEAD encryption failed")]
    AeadFailed(chacha20poly1305::aead::Error),
}

/// AEAD encrypt. The nonce is drawn from the OS RNG on every call; 192 bits
/// of randomness make reuse under one key a non-event.
pub fn encrypt(
    plaintext: &[u8],
    key: &SecretKey,
    aad: &[u8],
) -> Result<(Nonce, Ciphertext, Tag), EncryptError> {
    let key = chacha20poly1305::Key::from(*key.as_bytes());
    let cipher = chacha20poly1305::XChaCha20Poly1305::new(&key);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand_core::OsRng.fill_bytes(&mut nonce_bytes);

    let nonce = chacha20poly1305::XNonce::from(nonce_bytes);
    let mut sealed = cipher
        .encrypt(
            &nonce,
            chacha20poly1305::aead::Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(EncryptError::AeadFailed)?;

    // The aead crate appends the tag to the ciphertext; split it off.
    let split_at = sealed.len() - TAG_LEN;
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&sealed[split_at..]);
    sealed.truncate(split_at);

    Ok((Nonce(nonce_bytes), Ciphertext(sealed), Tag(tag)))
}

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("AEAD authentication failed")]
    Authentication,
}

/// AEAD decrypt. Any mismatch of ciphertext, nonce, tag, or AAD fails with
/// `Authentication`; no partially-decrypted bytes are ever returned.
pub fn decrypt(
    ciphertext: &[u8],
    nonce: &Nonce,
    tag: &Tag,
    key: &SecretKey,
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
    let key = chacha20poly1305::Key::from(*key.as_bytes());
    let cipher = chacha20poly1305::XChaCha20Poly1305::new(&key);

    let nonce = chacha20poly1305::XNonce::from(nonce.0);

    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(&tag.0);

    let pt = cipher
        .decrypt(
            &nonce,
            chacha20poly1305::aead::Payload {
                msg: &sealed,
                aad,
            },
        )
        .map_err(|_| DecryptError::Authentication)?;

    Ok(Zeroizing::new(pt))
}
