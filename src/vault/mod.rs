//! Vault module — the credential vault adapter.
//!
//! This module provides:
//! - Target normalization into the CredVault namespace (`target`)
//! - Zero-on-drop secret buffers and their native blob form (`secret`)
//! - Credential kind, persistence and the attribute bag (`attributes`)
//! - The `CredentialRecord` data model (`record`)
//! - The fixed native record layout and its codec (`format`)
//! - The native API seam and buffer release guard (`native`)
//! - High-level `CredentialStore` operations (`store`)
//! - Backends: Windows Credential Manager (`windows`) and in-process (`memory`)

pub mod attributes;
pub mod format;
pub mod memory;
pub mod native;
pub mod record;
pub mod secret;
pub mod store;
pub mod target;

#[cfg(windows)]
pub mod windows;

// Re-export the most commonly used items.
pub use attributes::{AttributeBag, CredentialKind, PersistenceClass};
pub use memory::{MemoryEntry, MemoryVault};
pub use native::CredentialApi;
pub use record::{CredentialInfo, CredentialRecord, MISSING_IDENTITY};
pub use secret::{SecureBuffer, MAX_SECRET_BYTES, MAX_SECRET_UNITS};
pub use store::CredentialStore;
pub use target::{TargetResolver, DEFAULT_NAMESPACE};

#[cfg(windows)]
pub use windows::WindowsCredentialApi;

/// The store backed by the platform vault.
#[cfg(windows)]
pub fn platform_store(
    resolver: TargetResolver,
) -> crate::errors::Result<CredentialStore<WindowsCredentialApi>> {
    Ok(CredentialStore::new(WindowsCredentialApi, resolver))
}

/// There is no platform vault binding here; always `Unsupported`.
#[cfg(not(windows))]
pub fn platform_store(
    _resolver: TargetResolver,
) -> crate::errors::Result<CredentialStore<MemoryVault>> {
    Err(crate::errors::CredVaultError::Unsupported)
}
