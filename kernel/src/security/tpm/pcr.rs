//! TPM Platform Configuration Registers (PCR)
//!
//! PCRs are used for system measurement and attestation.
//! TPM 2.0 has 24 PCRs per bank.

use super::TpmError;

/// Number of PCRs per bank
pub const PCR_COUNT: u8 = 24;

/// PCR index (0-23 for TPM 2.0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PcrIndex(pub u8);

impl PcrIndex {
    pub const BIOS: Self = Self(0);
    pub const UEFI_CONFIG: Self = Self(1);
    pub const BOOT_LOADER: Self = Self(4);
    pub const KERNEL: Self = Self(8);
    pub const IMA: Self = Self(10);

    pub fn validate(self) -> Result<Self, TpmError> {
        if self.0 < PCR_COUNT {
            Ok(self)
        } else {
            Err(TpmError::InvalidPcr(self.0))
        }
    }
}

/// PCR bank (hash algorithm)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum PcrBank {
    SHA1,
    SHA256,
    SHA384,
    SHA512,
    SM3_256,
}

impl PcrBank {
    pub fn digest_size(&self) -> usize {
        match self {
            Self::SHA1 => 20,
            Self::SHA256 => 32,
            Self::SHA384 => 48,
            Self::SHA512 => 64,
            Self::SM3_256 => 32,
        }
    }

    pub fn tpm_alg_id(&self) -> u16 {
        match self {
            Self::SHA1 => 0x0004,
            Self::SHA256 => 0x000B,
            Self::SHA384 => 0x000C,
            Self::SHA512 => 0x000D,
            Self::SM3_256 => 0x0012,
        }
    }

    /// Reject digests whose length does not match this bank
    pub fn check_digest(&self, digest: &[u8]) -> Result<(), TpmError> {
        let expected = self.digest_size();
        if digest.len() != expected {
            return Err(TpmError::DigestSize {
                expected,
                actual: digest.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcr_index_range() {
        assert_eq!(PcrIndex::KERNEL.validate(), Ok(PcrIndex(8)));
        assert_eq!(PcrIndex(23).validate(), Ok(PcrIndex(23)));
        assert_eq!(PcrIndex(24).validate(), Err(TpmError::InvalidPcr(24)));
    }

    #[test]
    fn test_digest_size_per_bank() {
        assert!(PcrBank::SHA256.check_digest(&[0u8; 32]).is_ok());
        assert!(PcrBank::SHA384.check_digest(&[0u8; 48]).is_ok());
        assert_eq!(
            PcrBank::SHA1.check_digest(&[0u8; 32]),
            Err(TpmError::DigestSize {
                expected: 20,
                actual: 32
            })
        );
    }
}
