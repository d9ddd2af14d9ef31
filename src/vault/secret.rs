//! Secret buffers and their native representation.
//!
//! `SecureBuffer` is the caller-facing holder of a secret. `NativeSecret`
//! is the UTF-16LE blob handed to the vault on write. Both wipe their
//! memory when dropped, so plaintext never outlives the value holding it.

use std::fmt;

use zeroize::{Zeroize, Zeroizing};

/// Largest secret blob the vault accepts, in bytes (5 * 512).
pub const MAX_SECRET_BYTES: usize = 2560;

/// Largest secret the vault accepts, in UTF-16 code units.
pub const MAX_SECRET_UNITS: usize = MAX_SECRET_BYTES / 2;

/// An immutable, zero-on-drop secret value.
///
/// `Debug` never prints the contents. There is no `Clone`: copies of the
/// plaintext are only made by the native conversion paths in this module.
pub struct SecureBuffer {
    value: Zeroizing<String>,
}

impl SecureBuffer {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Zeroizing::new(value.into()),
        }
    }

    pub fn empty() -> Self {
        Self::new(String::new())
    }

    /// Borrow the plaintext.
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Length in UTF-16 code units, which is how the vault counts characters.
    pub fn utf16_len(&self) -> usize {
        self.value.encode_utf16().count()
    }

    /// Size of the native blob this secret encodes to.
    pub fn byte_len(&self) -> usize {
        self.utf16_len() * 2
    }

    /// Decode a UTF-16LE blob. A trailing odd byte is ignored and unpaired
    /// surrogates become U+FFFD.
    pub fn from_utf16le(bytes: &[u8]) -> Self {
        let units = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));

        // Reserve the worst case up front so the string never reallocates
        // and leaves a stale copy behind.
        let mut value = Zeroizing::new(String::with_capacity(bytes.len() / 2 * 3));
        for ch in char::decode_utf16(units) {
            value.push(ch.unwrap_or(char::REPLACEMENT_CHARACTER));
        }
        Self { value }
    }

    /// Copy `byte_len` bytes out of a vault-owned blob.
    ///
    /// Ownership of `ptr` stays with the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid for reads of `byte_len` bytes.
    pub unsafe fn from_native(ptr: *const u8, byte_len: u32) -> Self {
        if ptr.is_null() || byte_len == 0 {
            return Self::empty();
        }
        let bytes = std::slice::from_raw_parts(ptr, byte_len as usize);
        Self::from_utf16le(bytes)
    }
}

impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureBuffer([REDACTED])")
    }
}

impl From<&str> for SecureBuffer {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecureBuffer {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A secret encoded for the vault: UTF-16LE bytes in memory we own.
///
/// An empty secret maps to a null pointer and no allocation. The bytes are
/// zeroed before the allocation is returned, whichever way the owning scope
/// exits.
pub struct NativeSecret {
    bytes: Option<Box<[u8]>>,
}

impl NativeSecret {
    pub fn to_native(secret: &SecureBuffer) -> Self {
        if secret.is_empty() {
            return Self { bytes: None };
        }

        let mut bytes = vec![0u8; secret.byte_len()].into_boxed_slice();
        for (slot, unit) in bytes
            .chunks_exact_mut(2)
            .zip(secret.expose().encode_utf16())
        {
            slot.copy_from_slice(&unit.to_le_bytes());
        }
        Self { bytes: Some(bytes) }
    }

    /// Pointer to the blob, or null for an empty secret.
    ///
    /// Valid for as long as `self` is alive.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        match self.bytes.as_mut() {
            Some(bytes) => bytes.as_mut_ptr(),
            None => std::ptr::null_mut(),
        }
    }

    pub fn byte_len(&self) -> u32 {
        // Bounded by MAX_SECRET_BYTES once validated; saturate otherwise.
        self.bytes
            .as_ref()
            .map_or(0, |b| u32::try_from(b.len()).unwrap_or(u32::MAX))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or(&[])
    }
}

impl Drop for NativeSecret {
    fn drop(&mut self) {
        if let Some(bytes) = self.bytes.as_mut() {
            bytes.zeroize();
        }
    }
}

impl fmt::Debug for NativeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeSecret")
            .field("byte_len", &self.byte_len())
            .finish_non_exhaustive()
    }
}
