//! Security error taxonomy
//!
//! Every failure is a local, terminal result handed back to the caller.
//! Nothing in this subsystem retries internally.

use core::fmt;

use super::crypto::CryptoError;
use super::isolation::{FilterError, NamespaceError};
use super::mac::{PolicyError, SidError};
use super::tpm::TpmError;

/// Result type for the public security API
pub type SecurityResult<T> = core::result::Result<T, SecurityError>;

/// Security subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityError {
    /// Unknown context id, or the context has been destroyed
    InvalidContext,
    /// Capability gate or MAC policy denied the operation
    PermissionDenied,
    /// SID table capacity exhausted
    SidTableFull,
    /// Label is reserved and cannot be interned
    ReservedLabel,
    /// Policy rule table capacity exhausted
    PolicyFull,
    /// Policy rule index out of range
    NoSuchRule,
    /// Context arena capacity exhausted
    ContextTableFull,
    /// Seccomp program rejected at attach time
    FilterInvalid(FilterError),
    /// Namespace operation failed
    Namespace(NamespaceError),
    /// Crypto session boundary failure
    Crypto(CryptoError),
    /// TPM boundary failure
    Tpm(TpmError),
    /// Bootstrap configuration rejected
    Config(ConfigError),
}

impl SecurityError {
    /// Resource exhaustion cannot be cured by retrying the same call
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            Self::SidTableFull | Self::PolicyFull | Self::ContextTableFull
        )
    }
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidContext => write!(f, "invalid or inactive security context"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::SidTableFull => write!(f, "SID table full"),
            Self::ReservedLabel => write!(f, "reserved security label"),
            Self::PolicyFull => write!(f, "policy rule table full"),
            Self::NoSuchRule => write!(f, "no such policy rule"),
            Self::ContextTableFull => write!(f, "context table full"),
            Self::FilterInvalid(e) => write!(f, "invalid seccomp filter: {}", e),
            Self::Namespace(e) => write!(f, "namespace error: {}", e),
            Self::Crypto(e) => write!(f, "crypto error: {}", e),
            Self::Tpm(e) => write!(f, "tpm error: {}", e),
            Self::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl From<SidError> for SecurityError {
    fn from(e: SidError) -> Self {
        match e {
            SidError::Full => Self::SidTableFull,
            SidError::ReservedLabel => Self::ReservedLabel,
        }
    }
}

impl From<PolicyError> for SecurityError {
    fn from(e: PolicyError) -> Self {
        match e {
            PolicyError::Full => Self::PolicyFull,
            PolicyError::NoSuchRule => Self::NoSuchRule,
        }
    }
}

impl From<FilterError> for SecurityError {
    fn from(e: FilterError) -> Self {
        Self::FilterInvalid(e)
    }
}

impl From<NamespaceError> for SecurityError {
    fn from(e: NamespaceError) -> Self {
        Self::Namespace(e)
    }
}

impl From<CryptoError> for SecurityError {
    fn from(e: CryptoError) -> Self {
        Self::Crypto(e)
    }
}

impl From<TpmError> for SecurityError {
    fn from(e: TpmError) -> Self {
        Self::Tpm(e)
    }
}

impl From<ConfigError> for SecurityError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Named capacity is zero
    ZeroCapacity(&'static str),
    /// SID table cannot hold the reserved labels
    SidCapacityTooSmall,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity(field) => write!(f, "{} must be non-zero", field),
            Self::SidCapacityTooSmall => write!(f, "sid_capacity must hold the reserved SIDs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_exhaustion_classification() {
        assert!(SecurityError::SidTableFull.is_exhaustion());
        assert!(SecurityError::ContextTableFull.is_exhaustion());
        assert!(!SecurityError::PermissionDenied.is_exhaustion());
    }

    #[test]
    fn test_display_nests_inner_error() {
        let err: SecurityError = FilterError::NoTerminator.into();
        assert_eq!(
            err.to_string(),
            "invalid seccomp filter: program does not end in a return"
        );
    }
}
