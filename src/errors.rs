use std::fmt;

use thiserror::Error;

use crate::vault::CredentialKind;

// ---------------------------------------------------------------------------
// Native status codes
// ---------------------------------------------------------------------------

const ERROR_NOT_FOUND: u32 = 1168;
const ERROR_NO_SUCH_LOGON_SESSION: u32 = 1312;
const ERROR_INVALID_PARAMETER: u32 = 87;
const ERROR_INVALID_FLAGS: u32 = 1004;
const ERROR_BAD_USERNAME: u32 = 2202;
const SCARD_E_NO_READERS_AVAILABLE: u32 = 0x8010_002E;
const SCARD_E_NO_SMARTCARD: u32 = 0x8010_000C;
const SCARD_W_REMOVED_CARD: u32 = 0x8010_0069;
const SCARD_W_WRONG_CHV: u32 = 0x8010_006B;

/// Classification of a status code reported by the credential vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeErrorKind {
    NotFound,
    InvalidParameter,
    InvalidFlags,
    BadIdentity,
    NoSuchSession,
    SmartcardUnavailable,
    SmartcardMissing,
    SmartcardRemoved,
    SmartcardWrongPin,
    Unknown(u32),
}

impl NativeErrorKind {
    /// Map a raw vault status code onto the error taxonomy.
    pub fn from_code(code: u32) -> Self {
        match code {
            ERROR_NOT_FOUND => Self::NotFound,
            ERROR_INVALID_PARAMETER => Self::InvalidParameter,
            ERROR_INVALID_FLAGS => Self::InvalidFlags,
            ERROR_BAD_USERNAME => Self::BadIdentity,
            ERROR_NO_SUCH_LOGON_SESSION => Self::NoSuchSession,
            SCARD_E_NO_READERS_AVAILABLE => Self::SmartcardUnavailable,
            SCARD_E_NO_SMARTCARD => Self::SmartcardMissing,
            SCARD_W_REMOVED_CARD => Self::SmartcardRemoved,
            SCARD_W_WRONG_CHV => Self::SmartcardWrongPin,
            other => Self::Unknown(other),
        }
    }

    /// The status code this kind was translated from.
    pub fn code(self) -> u32 {
        match self {
            Self::NotFound => ERROR_NOT_FOUND,
            Self::InvalidParameter => ERROR_INVALID_PARAMETER,
            Self::InvalidFlags => ERROR_INVALID_FLAGS,
            Self::BadIdentity => ERROR_BAD_USERNAME,
            Self::NoSuchSession => ERROR_NO_SUCH_LOGON_SESSION,
            Self::SmartcardUnavailable => SCARD_E_NO_READERS_AVAILABLE,
            Self::SmartcardMissing => SCARD_E_NO_SMARTCARD,
            Self::SmartcardRemoved => SCARD_W_REMOVED_CARD,
            Self::SmartcardWrongPin => SCARD_W_WRONG_CHV,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for NativeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotFound => "element not found",
            Self::InvalidParameter => "invalid parameter",
            Self::InvalidFlags => "invalid flags",
            Self::BadIdentity => "the user name is not valid for this credential",
            Self::NoSuchSession => "no logon session is available",
            Self::SmartcardUnavailable => "no smart card reader is available",
            Self::SmartcardMissing => "no smart card is inserted",
            Self::SmartcardRemoved => "the smart card was removed",
            Self::SmartcardWrongPin => "the smart card PIN is incorrect",
            Self::Unknown(_) => "unrecognized vault status",
        };
        f.write_str(text)
    }
}

// ---------------------------------------------------------------------------
// Crate error
// ---------------------------------------------------------------------------

/// All errors that can occur in CredVault.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Validation errors (raised before any vault call) ---
    #[error("Secret cannot be more than {max_units} characters (was {units})")]
    SecretTooLong { units: usize, max_units: usize },

    #[error("Target name is too long for a {kind} credential (max {max} characters, was {length})")]
    TargetTooLong {
        kind: CredentialKind,
        length: usize,
        max: usize,
    },

    #[error("Target name cannot be empty")]
    EmptyTarget,

    // --- Vault errors ---
    #[error("Credential vault error: {kind} (code {code:#x})")]
    Native { kind: NativeErrorKind, code: u32 },

    #[error("Credential not saved")]
    NotSaved,

    #[error("Invalid credential record: {0}")]
    InvalidRecord(String),

    #[error("The platform credential vault is not available on this system")]
    Unsupported,

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl CredVaultError {
    /// Translate a raw vault status code into an error.
    pub fn from_native(code: u32) -> Self {
        Self::Native {
            kind: NativeErrorKind::from_code(code),
            code,
        }
    }

    /// The native error kind, if this error came from the vault.
    pub fn native_kind(&self) -> Option<NativeErrorKind> {
        match self {
            Self::Native { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether this is a validation failure raised before touching the vault.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::SecretTooLong { .. } | Self::TargetTooLong { .. } | Self::EmptyTarget
        )
    }
}

/// Convenience type alias for CredVault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;
