//! Windows Credential Manager binding.

use std::ffi::c_void;
use std::mem::size_of;

use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::Security::Credentials::{
    CredDeleteW, CredEnumerateW, CredFindBestCredentialW, CredFree, CredReadW, CredWriteW,
    CREDENTIALW,
};

use super::format::{RawCredential, WideString};
use super::native::{CredentialApi, NativeResult};

// `RawCredential` is read and written in place of `CREDENTIALW`.
const _: () = assert!(size_of::<CREDENTIALW>() == size_of::<RawCredential>());

/// The current user's credential set in the Windows Credential Manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsCredentialApi;

fn last_error() -> u32 {
    // SAFETY: reads thread-local state only.
    unsafe { GetLastError() }
}

unsafe impl CredentialApi for WindowsCredentialApi {
    fn read(&self, target: &WideString, kind: u32) -> NativeResult<*mut RawCredential> {
        let mut out: *mut CREDENTIALW = std::ptr::null_mut();
        // SAFETY: `target` is NUL-terminated and `out` is a valid out-pointer.
        let ok = unsafe { CredReadW(target.as_ptr(), kind, 0, &mut out) };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(out.cast())
    }

    fn find_best(&self, target: &WideString, kind: u32) -> NativeResult<*mut RawCredential> {
        let mut out: *mut CREDENTIALW = std::ptr::null_mut();
        // SAFETY: as for `read`.
        let ok = unsafe { CredFindBestCredentialW(target.as_ptr(), kind, 0, &mut out) };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(out.cast())
    }

    fn enumerate(
        &self,
        filter: Option<&WideString>,
        flags: u32,
    ) -> NativeResult<(u32, *mut *mut RawCredential)> {
        let mut count = 0u32;
        let mut out: *mut *mut CREDENTIALW = std::ptr::null_mut();
        let filter = filter.map_or(std::ptr::null(), WideString::as_ptr);
        // SAFETY: `filter` is null or NUL-terminated; out-pointers are valid.
        let ok = unsafe { CredEnumerateW(filter, flags, &mut count, &mut out) };
        if ok == 0 {
            return Err(last_error());
        }
        Ok((count, out.cast()))
    }

    unsafe fn write(&self, credential: &RawCredential, flags: u32) -> NativeResult<()> {
        let ptr = (credential as *const RawCredential).cast::<CREDENTIALW>();
        if CredWriteW(ptr, flags) == 0 {
            return Err(last_error());
        }
        Ok(())
    }

    fn delete(&self, target: &WideString, kind: u32) -> NativeResult<()> {
        // SAFETY: `target` is NUL-terminated.
        let ok = unsafe { CredDeleteW(target.as_ptr(), kind, 0) };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(())
    }

    unsafe fn free(&self, buffer: *mut c_void) {
        CredFree(buffer);
    }
}
