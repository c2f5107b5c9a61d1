//! Trusted Platform Module (TPM) Support
//!
//! The core never talks to TPM hardware. It validates PCR requests and
//! forwards them to the installed [`CryptoService`](super::crypto::CryptoService).

pub mod pcr;

pub use pcr::{PcrBank, PcrIndex, PCR_COUNT};

use core::fmt;

/// TPM Error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpmError {
    /// No TPM behind the crypto service
    NotAvailable,
    /// PCR index outside 0..24
    InvalidPcr(u8),
    /// Digest length does not match the PCR bank
    DigestSize { expected: usize, actual: usize },
    /// Device-level failure reported by the provider
    CommandFailed(u32),
}

impl fmt::Display for TpmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAvailable => write!(f, "TPM not available"),
            Self::InvalidPcr(index) => write!(f, "invalid PCR index {}", index),
            Self::DigestSize { expected, actual } => {
                write!(f, "digest is {} bytes, bank expects {}", actual, expected)
            }
            Self::CommandFailed(rc) => write!(f, "TPM command failed (rc={:#x})", rc),
        }
    }
}
