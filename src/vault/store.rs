//! High-level credential operations.
//!
//! `CredentialStore` is the public face of the adapter: it normalizes
//! targets, validates records before writing, marshals through the record
//! codec, and turns native status codes into `CredVaultError`s.
//!
//! Read-style calls (`find`, `load`, `get`, `exists`) report a missing
//! entry as an empty result. `delete` reports it as an error, so callers
//! know whether anything was removed.

use tracing::{debug, warn};

use super::attributes::CredentialKind;
use super::format::{self, RawCredential, WideString};
use super::native::{CredentialApi, NativeBuffer, NativeStatus, CRED_ENUMERATE_ALL_CREDENTIALS};
use super::record::CredentialRecord;
use super::secret::MAX_SECRET_UNITS;
use super::target::TargetResolver;
use crate::errors::{CredVaultError, NativeErrorKind, Result};

/// Status some vault calls leave behind when they fail without a reason.
const NO_ERROR: NativeStatus = 0;

/// Stateless adapter over a native credential vault.
pub struct CredentialStore<A> {
    api: A,
    resolver: TargetResolver,
}

impl<A: CredentialApi> CredentialStore<A> {
    pub fn new(api: A, resolver: TargetResolver) -> Self {
        Self { api, resolver }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// List credentials matching `filter`, or every credential when
    /// `filter` is empty.
    pub fn find(&self, filter: &str) -> Result<Vec<CredentialRecord>> {
        let filter = (!filter.is_empty()).then(|| self.resolver.normalize(filter));
        self.find_matching(filter.as_deref())
    }

    /// Like `find`, but the filter is passed to the vault as given.
    pub fn find_raw(&self, filter: &str) -> Result<Vec<CredentialRecord>> {
        self.find_matching((!filter.is_empty()).then_some(filter))
    }

    /// Whether any credential matches `filter`.
    pub fn exists(&self, filter: &str) -> Result<bool> {
        let filter = (!filter.is_empty()).then(|| self.resolver.normalize(filter));
        Ok(self
            .enumerate(filter.as_deref())?
            .is_some_and(|(count, _buffer)| count > 0))
    }

    /// Exact-match lookup. `Ok(None)` when no such entry exists.
    pub fn load(&self, target: &str, kind: CredentialKind) -> Result<Option<CredentialRecord>> {
        self.read_target(&self.resolve(target)?, kind)
    }

    /// Exact-match lookup of a target that is not normalized first, for
    /// entries other programs wrote (`TERMSRV/host`, `git:...`).
    pub fn load_raw(&self, target: &str, kind: CredentialKind) -> Result<Option<CredentialRecord>> {
        self.read_target(verbatim(target)?, kind)
    }

    /// Best-match lookup among generic credentials. `Ok(None)` when
    /// nothing matches.
    pub fn get(&self, target: &str) -> Result<Option<CredentialRecord>> {
        self.best_target(&self.resolve(target)?)
    }

    /// Best-match lookup without normalizing `target`.
    pub fn get_raw(&self, target: &str) -> Result<Option<CredentialRecord>> {
        self.best_target(verbatim(target)?)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Create or replace the vault entry for `record`.
    ///
    /// The record is validated first; an oversize secret or target fails
    /// without touching the vault. Attributes in `AttributeBag::extra`
    /// are not stored.
    pub fn save(&self, record: &CredentialRecord) -> Result<()> {
        let target = self.resolve(record.raw_target())?;
        validate(record, &target)?;
        debug!(vault_target = %target, kind = %record.kind(), "writing credential");

        let encoded = format::encode(record, &target);
        // SAFETY: `encoded` owns every buffer its raw record points to.
        let result = unsafe { self.api.write(encoded.as_raw(), 0) };
        drop(encoded);

        match result {
            Ok(()) => Ok(()),
            Err(NO_ERROR) => Err(CredVaultError::NotSaved),
            Err(code) => Err(CredVaultError::from_native(code)),
        }
    }

    /// Remove the exact-match entry. Missing entries are an error.
    pub fn delete(&self, target: &str, kind: CredentialKind) -> Result<()> {
        self.delete_target(&self.resolve(target)?, kind)
    }

    /// Remove the exact-match entry without normalizing `target`.
    pub fn delete_raw(&self, target: &str, kind: CredentialKind) -> Result<()> {
        self.delete_target(verbatim(target)?, kind)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn resolve(&self, raw: &str) -> Result<String> {
        if raw.is_empty() {
            return Err(CredVaultError::EmptyTarget);
        }
        Ok(self.resolver.normalize(raw))
    }

    fn find_matching(&self, filter: Option<&str>) -> Result<Vec<CredentialRecord>> {
        let Some((count, buffer)) = self.enumerate(filter)? else {
            return Ok(Vec::new());
        };

        let array = buffer.as_ptr().cast::<*mut RawCredential>();
        // SAFETY: the API guarantees `count` record pointers at `array`,
        // valid until `buffer` is dropped.
        let entries = unsafe { std::slice::from_raw_parts(array, count as usize) };

        let mut records = Vec::with_capacity(entries.len());
        for &entry in entries {
            // SAFETY: each entry is a valid record owned by `buffer`.
            match unsafe { format::decode(entry) } {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(error = %e, "failed to decode enumerated credential");
                    return Err(e);
                }
            }
        }

        debug!(filter, count = records.len(), "enumerated credentials");
        Ok(records)
    }

    fn read_target(&self, target: &str, kind: CredentialKind) -> Result<Option<CredentialRecord>> {
        debug!(vault_target = %target, %kind, "reading credential");
        let result = self.api.read(&WideString::new(target), kind.code());
        self.decode_single(result)
    }

    fn best_target(&self, target: &str) -> Result<Option<CredentialRecord>> {
        debug!(vault_target = %target, "finding best credential");
        let result = self
            .api
            .find_best(&WideString::new(target), CredentialKind::Generic.code());
        self.decode_single(result)
    }

    fn delete_target(&self, target: &str, kind: CredentialKind) -> Result<()> {
        debug!(vault_target = %target, %kind, "deleting credential");
        self.api
            .delete(&WideString::new(target), kind.code())
            .map_err(CredVaultError::from_native)
    }

    /// Run an enumeration; `filter` is already in vault form. `None` when
    /// the vault has nothing to report.
    fn enumerate(&self, filter: Option<&str>) -> Result<Option<(u32, NativeBuffer<'_, A>)>> {
        let result = match filter {
            None => self.api.enumerate(None, CRED_ENUMERATE_ALL_CREDENTIALS),
            Some(filter) => self.api.enumerate(Some(&WideString::new(filter)), 0),
        };

        match result {
            Ok((count, array)) => {
                // SAFETY: `array` was just returned by this API.
                let buffer = unsafe { NativeBuffer::new(&self.api, array.cast()) };
                Ok(buffer.map(|b| (count, b)))
            }
            Err(code) if is_not_found(code) => Ok(None),
            Err(code) => Err(CredVaultError::from_native(code)),
        }
    }

    fn decode_single(
        &self,
        result: std::result::Result<*mut RawCredential, NativeStatus>,
    ) -> Result<Option<CredentialRecord>> {
        let ptr = match result {
            Ok(ptr) => ptr,
            Err(code) if is_not_found(code) => return Ok(None),
            Err(code) => return Err(CredVaultError::from_native(code)),
        };

        // SAFETY: `ptr` was just returned by this API.
        let Some(buffer) = (unsafe { NativeBuffer::new(&self.api, ptr.cast()) }) else {
            return Err(CredVaultError::InvalidRecord(
                "vault reported success but returned no record".into(),
            ));
        };

        // SAFETY: the record stays valid until `buffer` is dropped, after
        // decode has copied everything out.
        let record = unsafe { format::decode(buffer.as_ptr().cast()) }?;
        Ok(Some(record))
    }
}

/// A target passed through unchanged; only emptiness is checked.
fn verbatim(target: &str) -> Result<&str> {
    if target.is_empty() {
        return Err(CredVaultError::EmptyTarget);
    }
    Ok(target)
}

fn is_not_found(code: NativeStatus) -> bool {
    NativeErrorKind::from_code(code) == NativeErrorKind::NotFound
}

/// Check vault size limits before any native call.
fn validate(record: &CredentialRecord, target: &str) -> Result<()> {
    let units = record.secret().utf16_len();
    if units > MAX_SECRET_UNITS {
        return Err(CredVaultError::SecretTooLong {
            units,
            max_units: MAX_SECRET_UNITS,
        });
    }

    let kind = record.kind();
    let length = target.encode_utf16().count();
    let max = kind.max_target_len();
    if length > max {
        return Err(CredVaultError::TargetTooLong { kind, length, max });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::memory::MemoryVault;
    use crate::vault::PersistenceClass;

    fn store() -> CredentialStore<MemoryVault> {
        CredentialStore::new(MemoryVault::new(), TargetResolver::new("ns"))
    }

    #[test]
    fn save_then_load_uses_namespaced_target() {
        let store = store();
        let record = CredentialRecord::new("alice", "hunter2").with_target("myapp");
        store.save(&record).unwrap();

        let loaded = store.load("myapp", CredentialKind::Generic).unwrap().unwrap();
        assert_eq!(loaded.target(), "ns:user=myapp");
        assert_eq!(loaded.identity(), "alice");
        assert_eq!(loaded.secret().expose(), "hunter2");
        assert!(loaded.attributes().last_write_time.is_some());
    }

    #[test]
    fn save_without_target_uses_identity() {
        let store = store();
        store.save(&CredentialRecord::new("bob", "pw")).unwrap();
        let loaded = store.load("ns:user=bob", CredentialKind::Generic).unwrap();
        assert!(loaded.is_some());
    }

    #[test]
    fn load_missing_is_none() {
        let store = store();
        assert!(store.load("ghost", CredentialKind::Generic).unwrap().is_none());
        assert!(store.get("ghost").unwrap().is_none());
        assert_eq!(store.api().outstanding(), 0);
    }

    #[test]
    fn load_respects_kind() {
        let store = store();
        let record = CredentialRecord::new("svc", "pw")
            .with_target("svc")
            .with_kind(CredentialKind::DomainPassword)
            .with_persistence(PersistenceClass::LocalMachine);
        store.save(&record).unwrap();

        assert!(store.load("svc", CredentialKind::Generic).unwrap().is_none());
        let loaded = store
            .load("svc", CredentialKind::DomainPassword)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.persistence(), PersistenceClass::LocalMachine);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let store = store();
        let err = store.delete("ghost", CredentialKind::Generic).unwrap_err();
        assert_eq!(err.native_kind(), Some(NativeErrorKind::NotFound));
    }

    #[test]
    fn delete_removes_entry() {
        let store = store();
        store.save(&CredentialRecord::new("alice", "pw")).unwrap();
        store.delete("alice", CredentialKind::Generic).unwrap();
        assert!(store.load("alice", CredentialKind::Generic).unwrap().is_none());
    }

    #[test]
    fn empty_target_is_rejected_locally() {
        let store = store();
        assert!(matches!(
            store.save(&CredentialRecord::new("", "pw")),
            Err(CredVaultError::EmptyTarget)
        ));
        assert!(matches!(
            store.load("", CredentialKind::Generic),
            Err(CredVaultError::EmptyTarget)
        ));
        assert_eq!(store.api().write_calls(), 0);
    }

    #[test]
    fn ambiguous_write_failure_is_not_saved() {
        let store = store();
        store.api().fail_next(0);
        let err = store.save(&CredentialRecord::new("alice", "pw")).unwrap_err();
        assert!(matches!(err, CredVaultError::NotSaved));
    }

    #[test]
    fn exists_reports_matches() {
        let store = store();
        assert!(!store.exists("alice").unwrap());
        store.save(&CredentialRecord::new("alice", "pw")).unwrap();
        assert!(store.exists("alice").unwrap());
        assert!(store.exists("ns:*").unwrap());
        assert_eq!(store.api().outstanding(), 0);
    }
}
