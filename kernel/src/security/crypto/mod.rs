//! Cryptography Boundary
//!
//! The security core owns no cipher code. Algorithms, keys and TPM access
//! live behind a [`CryptoService`] supplied by the platform; the core only
//! tracks which context owns which session.

pub mod session;

pub use session::{CryptoSession, SessionTable};

use super::tpm::{PcrBank, PcrIndex, TpmError};
use alloc::vec::Vec;
use core::fmt;

/// Session algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Aes256Gcm,
    ChaCha20Poly1305,
    Sha256,
    Sha512,
    Blake3,
    HmacSha256,
    EcdsaP256,
    Rsa2048,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
            Self::HmacSha256 => "hmac-sha256",
            Self::EcdsaP256 => "ecdsa-p256",
            Self::Rsa2048 => "rsa-2048",
        }
    }
}

/// Opaque provider-issued session handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionHandle(pub u64);

/// Crypto boundary errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// No crypto service installed
    NoProvider,
    /// Crypto disabled by configuration
    Disabled,
    /// Handle not owned by the calling context
    UnknownSession,
    /// Provider cannot run this algorithm
    UnsupportedAlgorithm(Algorithm),
    /// Provider-specific failure code
    Provider(u32),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProvider => write!(f, "no crypto service installed"),
            Self::Disabled => write!(f, "crypto disabled"),
            Self::UnknownSession => write!(f, "unknown crypto session"),
            Self::UnsupportedAlgorithm(alg) => write!(f, "unsupported algorithm {}", alg.name()),
            Self::Provider(code) => write!(f, "crypto provider error {:#x}", code),
        }
    }
}

/// External crypto/TPM provider
///
/// Implementations must be callable from any CPU; the manager never holds a
/// context lock across the provider call that creates a session.
pub trait CryptoService: Send + Sync {
    fn create_session(&self, alg: Algorithm, tpm_backed: bool) -> Result<SessionHandle, CryptoError>;

    fn encrypt(&self, handle: SessionHandle, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(&self, handle: SessionHandle, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn close_session(&self, handle: SessionHandle);

    fn tpm_available(&self) -> bool;

    /// PCR[index] = H(PCR[index] || digest)
    fn pcr_extend(&self, index: PcrIndex, bank: PcrBank, digest: &[u8]) -> Result<(), TpmError>;
}
