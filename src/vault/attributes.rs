//! Credential metadata: kind, persistence class, and the attribute bag.
//!
//! The recognized attributes map one-to-one onto fields of the native
//! record. Anything else a caller attaches lives in `AttributeBag::extra`;
//! those entries survive in memory but are never written to the vault,
//! because the native record has nowhere to put them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CredVaultError, Result};

/// The vault bucket a credential is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialKind {
    #[default]
    Generic,
    DomainPassword,
    DomainCertificate,
    DomainVisiblePassword,
    GenericCertificate,
    DomainExtended,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 6] = [
        Self::Generic,
        Self::DomainPassword,
        Self::DomainCertificate,
        Self::DomainVisiblePassword,
        Self::GenericCertificate,
        Self::DomainExtended,
    ];

    /// Native `CRED_TYPE` value.
    pub fn code(self) -> u32 {
        match self {
            Self::Generic => 1,
            Self::DomainPassword => 2,
            Self::DomainCertificate => 3,
            Self::DomainVisiblePassword => 4,
            Self::GenericCertificate => 5,
            Self::DomainExtended => 6,
        }
    }

    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.code() == code)
            .ok_or_else(|| CredVaultError::InvalidRecord(format!("unknown credential type {code}")))
    }

    /// Longest target name the vault stores for this kind, in UTF-16 units.
    ///
    /// Generic entries use the large string region; every other kind is
    /// kept in a smaller fixed-size slot.
    pub fn max_target_len(self) -> usize {
        match self {
            Self::Generic => 32_767,
            _ => 337,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::DomainPassword => "domainPassword",
            Self::DomainCertificate => "domainCertificate",
            Self::DomainVisiblePassword => "domainVisiblePassword",
            Self::GenericCertificate => "genericCertificate",
            Self::DomainExtended => "domainExtended",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CredentialKind {
    type Err = CredVaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                CredVaultError::CommandFailed(format!(
                    "unknown credential kind '{s}' — expected one of: generic, domainPassword, \
                     domainCertificate, domainVisiblePassword, genericCertificate, domainExtended"
                ))
            })
    }
}

/// How long the vault keeps an entry. Passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersistenceClass {
    Session,
    LocalMachine,
    #[default]
    Enterprise,
}

impl PersistenceClass {
    /// Native `CRED_PERSIST` value.
    pub fn code(self) -> u32 {
        match self {
            Self::Session => 1,
            Self::LocalMachine => 2,
            Self::Enterprise => 3,
        }
    }

    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            1 => Ok(Self::Session),
            2 => Ok(Self::LocalMachine),
            3 => Ok(Self::Enterprise),
            other => Err(CredVaultError::InvalidRecord(format!(
                "unknown persistence class {other}"
            ))),
        }
    }
}

impl fmt::Display for PersistenceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Session => "session",
            Self::LocalMachine => "localMachine",
            Self::Enterprise => "enterprise",
        })
    }
}

impl FromStr for PersistenceClass {
    type Err = CredVaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "localmachine" | "local" => Ok(Self::LocalMachine),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(CredVaultError::CommandFailed(format!(
                "unknown persistence class '{s}' — expected session, localMachine or enterprise"
            ))),
        }
    }
}

/// Named metadata attached to a credential record.
///
/// `last_write_time` is assigned by the vault and ignored on write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeBag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CredentialKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceClass>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_write_time: Option<DateTime<Utc>>,

    /// Caller-defined attributes. Kept in memory only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl AttributeBag {
    /// Kind to write, falling back to `generic`.
    pub fn effective_kind(&self) -> CredentialKind {
        self.kind.unwrap_or_default()
    }

    /// Persistence to write, falling back to `enterprise`.
    pub fn effective_persistence(&self) -> PersistenceClass {
        self.persistence.unwrap_or_default()
    }

    /// Look up an attribute by its name, recognized or not.
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            "alias" => self.alias.clone(),
            "kind" => self.kind.map(|k| k.to_string()),
            "persistence" => self.persistence.map(|p| p.to_string()),
            "description" => self.description.clone(),
            "lastWriteTime" => self.last_write_time.map(|t| t.to_rfc3339()),
            other => self.extra.get(other).cloned(),
        }
    }
}
