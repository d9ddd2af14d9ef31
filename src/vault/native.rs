//! The native credential vault entry points.
//!
//! `CredentialApi` is the seam between the adapter and whatever actually
//! stores credentials: the Windows Credential Manager in production, or
//! the in-process `MemoryVault`. Failures are raw status codes; turning
//! them into errors is the store's job.
//!
//! Every buffer a read-style call hands out is wrapped in a `NativeBuffer`
//! as soon as it is received, so it is freed exactly once on every path.

use std::ffi::c_void;
use std::ptr::NonNull;

use super::format::{RawCredential, WideString};

/// `CredEnumerate` flag: list every credential, ignoring the filter.
pub const CRED_ENUMERATE_ALL_CREDENTIALS: u32 = 0x1;

/// Raw status code reported by the vault on failure.
pub type NativeStatus = u32;

pub type NativeResult<T> = std::result::Result<T, NativeStatus>;

/// Native credential vault operations.
///
/// # Safety
///
/// Implementors must return, from `read`, `find_best` and `enumerate`,
/// pointers that are valid (including every string and blob pointer inside
/// the records) until they are passed to `free`. `enumerate` must return an
/// array of exactly `count` record pointers.
pub unsafe trait CredentialApi {
    /// Exact-match lookup (`CredRead`).
    fn read(&self, target: &WideString, kind: u32) -> NativeResult<*mut RawCredential>;

    /// Best-match lookup (`CredFindBestCredential`).
    fn find_best(&self, target: &WideString, kind: u32) -> NativeResult<*mut RawCredential>;

    /// Enumerate credentials (`CredEnumerate`). Returns the count and the
    /// array of record pointers, freed as a single buffer.
    fn enumerate(
        &self,
        filter: Option<&WideString>,
        flags: u32,
    ) -> NativeResult<(u32, *mut *mut RawCredential)>;

    /// Create or replace a credential (`CredWrite`). An `Err(0)` means the
    /// vault reported failure without a status.
    ///
    /// # Safety
    ///
    /// Every pointer in `credential` must be null or valid for reads, with
    /// strings NUL-terminated and the blob `credential_blob_size` bytes long.
    unsafe fn write(&self, credential: &RawCredential, flags: u32) -> NativeResult<()>;

    /// Remove a credential (`CredDelete`).
    fn delete(&self, target: &WideString, kind: u32) -> NativeResult<()>;

    /// Release a buffer returned by this API (`CredFree`).
    ///
    /// # Safety
    ///
    /// `buffer` must have come from this API and not been freed yet.
    unsafe fn free(&self, buffer: *mut c_void);
}

/// A vault-owned buffer released through its API when dropped.
pub struct NativeBuffer<'a, A: CredentialApi + ?Sized> {
    api: &'a A,
    ptr: NonNull<c_void>,
}

impl<'a, A: CredentialApi + ?Sized> NativeBuffer<'a, A> {
    /// Take ownership of `ptr`. Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live buffer returned by `api`, and nothing
    /// else may free it.
    pub unsafe fn new(api: &'a A, ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { api, ptr })
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr.as_ptr()
    }
}

impl<A: CredentialApi + ?Sized> Drop for NativeBuffer<'_, A> {
    fn drop(&mut self) {
        // SAFETY: `new` requires a live buffer from `api` that only this
        // guard frees, and drop runs once.
        unsafe { self.api.free(self.ptr.as_ptr()) }
    }
}
