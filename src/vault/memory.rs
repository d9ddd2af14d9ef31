//! In-process credential vault.
//!
//! `MemoryVault` implements `CredentialApi` with the same observable rules
//! as the Windows Credential Manager: targets compare case-insensitively,
//! an enumeration filter ending in `*` matches by prefix, best-match lookup
//! falls back to stored wildcard targets, and the vault stamps each write
//! with the current time.
//!
//! Every buffer it hands out is a real heap allocation laid out like the
//! native one and tracked until freed, so tests can assert that callers
//! release each buffer exactly once.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use zeroize::Zeroizing;

use super::format::{read_wide, to_wide, FileTime, RawCredential, WideString};
use super::native::{CredentialApi, NativeResult, CRED_ENUMERATE_ALL_CREDENTIALS};
use super::secret::MAX_SECRET_BYTES;

const ERROR_NOT_FOUND: u32 = 1168;
const ERROR_INVALID_PARAMETER: u32 = 87;
const ERROR_INVALID_FLAGS: u32 = 1004;

/// `CredWrite` flag: keep the existing blob.
const CRED_PRESERVE_CREDENTIAL_BLOB: u32 = 0x1;

/// One stored credential, in native terms.
#[derive(Clone)]
pub struct MemoryEntry {
    pub target: String,
    pub kind: u32,
    pub persist: u32,
    pub user_name: Option<String>,
    pub comment: Option<String>,
    pub target_alias: Option<String>,
    pub blob: Zeroizing<Vec<u8>>,
    pub last_written: FileTime,
}

impl MemoryEntry {
    /// A generic, enterprise-persisted entry with a UTF-16LE secret.
    pub fn new(target: &str, user_name: &str, secret: &str) -> Self {
        let blob: Vec<u8> = secret.encode_utf16().flat_map(u16::to_le_bytes).collect();
        Self {
            target: target.to_string(),
            kind: 1,
            persist: 3,
            user_name: Some(user_name.to_string()),
            comment: None,
            target_alias: None,
            blob: Zeroizing::new(blob),
            last_written: FileTime::from_datetime(Utc::now()),
        }
    }

    fn matches(&self, target: &str, kind: u32) -> bool {
        self.kind == kind && self.target.eq_ignore_ascii_case(target)
    }
}

// ---------------------------------------------------------------------------
// Allocations handed out to callers
// ---------------------------------------------------------------------------

/// A native record plus the storage its pointers refer to. `raw` comes
/// first so a pointer to this struct is a pointer to the record.
#[repr(C)]
struct OwnedRecord {
    raw: RawCredential,
    _target_name: Vec<u16>,
    _comment: Option<Vec<u16>>,
    _target_alias: Option<Vec<u16>>,
    _user_name: Option<Vec<u16>>,
    _blob: Zeroizing<Vec<u8>>,
}

impl OwnedRecord {
    fn new(entry: &MemoryEntry) -> Self {
        let mut target_name = to_wide(&entry.target);
        let mut comment = entry.comment.as_deref().map(to_wide);
        let mut target_alias = entry.target_alias.as_deref().map(to_wide);
        let mut user_name = entry.user_name.as_deref().map(to_wide);
        let mut blob = entry.blob.clone();

        let raw = RawCredential {
            flags: 0,
            kind: entry.kind,
            target_name: target_name.as_mut_ptr(),
            comment: opt_ptr(&mut comment),
            last_written: entry.last_written,
            credential_blob_size: blob.len() as u32,
            credential_blob: if blob.is_empty() {
                std::ptr::null_mut()
            } else {
                blob.as_mut_ptr()
            },
            persist: entry.persist,
            attribute_count: 0,
            attributes: std::ptr::null_mut(),
            target_alias: opt_ptr(&mut target_alias),
            user_name: opt_ptr(&mut user_name),
        };

        Self {
            raw,
            _target_name: target_name,
            _comment: comment,
            _target_alias: target_alias,
            _user_name: user_name,
            _blob: blob,
        }
    }
}

fn opt_ptr(buf: &mut Option<Vec<u16>>) -> *mut u16 {
    buf.as_mut().map_or(std::ptr::null_mut(), |b| b.as_mut_ptr())
}

struct OwnedArray {
    pointers: Vec<*mut RawCredential>,
    _records: Vec<OwnedRecord>,
}

enum Allocation {
    Record(*mut OwnedRecord),
    Array(*mut OwnedArray),
}

// SAFETY: the pointers are uniquely owned boxes, only touched under the
// vault's allocation lock.
unsafe impl Send for Allocation {}

impl Drop for Allocation {
    fn drop(&mut self) {
        // SAFETY: both variants hold pointers from `Box::into_raw` that are
        // reclaimed exactly once, here.
        unsafe {
            match *self {
                Allocation::Record(ptr) => drop(Box::from_raw(ptr)),
                Allocation::Array(ptr) => drop(Box::from_raw(ptr)),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryVault
// ---------------------------------------------------------------------------

/// In-process `CredentialApi` with allocation accounting.
#[derive(Default)]
pub struct MemoryVault {
    entries: Mutex<Vec<MemoryEntry>>,
    live: Mutex<HashMap<usize, Allocation>>,
    next_failure: Mutex<Option<u32>>,
    allocations: AtomicUsize,
    frees: AtomicUsize,
    invalid_frees: AtomicUsize,
    write_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry directly, bypassing write validation.
    pub fn insert(&self, entry: MemoryEntry) {
        let mut entries = lock(&self.entries);
        entries.retain(|e| !e.matches(&entry.target, entry.kind));
        entries.push(entry);
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next API call fail with `code`.
    pub fn fail_next(&self, code: u32) {
        *lock(&self.next_failure) = Some(code);
    }

    /// Buffers handed out so far.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    /// Buffers released so far.
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    /// Buffers handed out and not yet released.
    pub fn outstanding(&self) -> usize {
        lock(&self.live).len()
    }

    /// `free` calls with a pointer that was not live (double or foreign free).
    pub fn invalid_frees(&self) -> usize {
        self.invalid_frees.load(Ordering::SeqCst)
    }

    /// Number of `write` calls that reached the vault.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> NativeResult<()> {
        match lock(&self.next_failure).take() {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    fn track(&self, key: usize, allocation: Allocation) {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        lock(&self.live).insert(key, allocation);
    }

    fn hand_out(&self, entry: &MemoryEntry) -> *mut RawCredential {
        let ptr = Box::into_raw(Box::new(OwnedRecord::new(entry)));
        self.track(ptr as usize, Allocation::Record(ptr));
        ptr.cast()
    }
}

unsafe impl CredentialApi for MemoryVault {
    fn read(&self, target: &WideString, kind: u32) -> NativeResult<*mut RawCredential> {
        self.take_failure()?;
        let target = target.to_string_lossy();
        let entries = lock(&self.entries);
        let entry = entries
            .iter()
            .find(|e| e.matches(&target, kind))
            .ok_or(ERROR_NOT_FOUND)?;
        Ok(self.hand_out(entry))
    }

    fn find_best(&self, target: &WideString, kind: u32) -> NativeResult<*mut RawCredential> {
        self.take_failure()?;
        let target = target.to_string_lossy().to_ascii_lowercase();
        let entries = lock(&self.entries);

        let exact = entries.iter().find(|e| e.matches(&target, kind));
        let best = exact.or_else(|| {
            entries
                .iter()
                .filter(|e| e.kind == kind)
                .filter_map(|e| {
                    let prefix = e.target.strip_suffix('*')?.to_ascii_lowercase();
                    target.starts_with(&prefix).then_some((prefix.len(), e))
                })
                .max_by_key(|(len, _)| *len)
                .map(|(_, e)| e)
        });

        Ok(self.hand_out(best.ok_or(ERROR_NOT_FOUND)?))
    }

    fn enumerate(
        &self,
        filter: Option<&WideString>,
        flags: u32,
    ) -> NativeResult<(u32, *mut *mut RawCredential)> {
        self.take_failure()?;
        let all = flags & CRED_ENUMERATE_ALL_CREDENTIALS != 0;
        if all && filter.is_some() {
            return Err(ERROR_INVALID_FLAGS);
        }

        let filter = filter.map(|f| f.to_string_lossy().to_ascii_lowercase());
        let entries = lock(&self.entries);
        let mut records: Vec<OwnedRecord> = entries
            .iter()
            .filter(|e| match filter.as_deref() {
                None => true,
                Some(f) => {
                    let target = e.target.to_ascii_lowercase();
                    match f.strip_suffix('*') {
                        Some(prefix) => target.starts_with(prefix),
                        None => target == f,
                    }
                }
            })
            .map(OwnedRecord::new)
            .collect();

        if records.is_empty() {
            return Err(ERROR_NOT_FOUND);
        }

        let pointers = records
            .iter_mut()
            .map(|r| &mut r.raw as *mut RawCredential)
            .collect();
        let count = records.len() as u32;
        let array = Box::into_raw(Box::new(OwnedArray {
            pointers,
            _records: records,
        }));

        // SAFETY: `array` is a live box we just created.
        let head = unsafe { (*array).pointers.as_mut_ptr() };
        self.track(head as usize, Allocation::Array(array));
        Ok((count, head))
    }

    unsafe fn write(&self, credential: &RawCredential, flags: u32) -> NativeResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        if flags & !CRED_PRESERVE_CREDENTIAL_BLOB != 0 {
            return Err(ERROR_INVALID_FLAGS);
        }
        if !(1..=6).contains(&credential.kind) || !(1..=3).contains(&credential.persist) {
            return Err(ERROR_INVALID_PARAMETER);
        }
        if credential.credential_blob_size as usize > MAX_SECRET_BYTES {
            return Err(ERROR_INVALID_PARAMETER);
        }
        let target = read_wide(credential.target_name)
            .filter(|t| !t.is_empty())
            .ok_or(ERROR_INVALID_PARAMETER)?;

        let blob = if credential.credential_blob.is_null() {
            Vec::new()
        } else {
            std::slice::from_raw_parts(
                credential.credential_blob,
                credential.credential_blob_size as usize,
            )
            .to_vec()
        };

        let mut entries = lock(&self.entries);
        let existing = entries
            .iter()
            .position(|e| e.matches(&target, credential.kind));
        let blob = match existing {
            Some(i) if flags & CRED_PRESERVE_CREDENTIAL_BLOB != 0 => entries[i].blob.clone(),
            _ => Zeroizing::new(blob),
        };
        if let Some(i) = existing {
            entries.remove(i);
        }

        entries.push(MemoryEntry {
            target,
            kind: credential.kind,
            persist: credential.persist,
            user_name: read_wide(credential.user_name),
            comment: read_wide(credential.comment),
            target_alias: read_wide(credential.target_alias),
            blob,
            last_written: FileTime::from_datetime(Utc::now()),
        });
        Ok(())
    }

    fn delete(&self, target: &WideString, kind: u32) -> NativeResult<()> {
        self.take_failure()?;
        let target = target.to_string_lossy();
        let mut entries = lock(&self.entries);
        let index = entries
            .iter()
            .position(|e| e.matches(&target, kind))
            .ok_or(ERROR_NOT_FOUND)?;
        entries.remove(index);
        Ok(())
    }

    unsafe fn free(&self, buffer: *mut c_void) {
        match lock(&self.live).remove(&(buffer as usize)) {
            Some(allocation) => {
                drop(allocation);
                self.frees.fetch_add(1, Ordering::SeqCst);
            }
            None => {
                self.invalid_frees.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
