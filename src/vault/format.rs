//! Native credential record layout and the record codec.
//!
//! The vault exchanges credentials as a fixed-layout C struct. Field order
//! (pointer-width fields shown as `ptr`):
//!
//! ```text
//! flags: u32 | kind: u32 | target_name: ptr | comment: ptr
//! last_written: { low: u32, high: u32 } | blob_size: u32 | blob: ptr
//! persist: u32 | attribute_count: u32 | attributes: ptr
//! target_alias: ptr | user_name: ptr
//! ```
//!
//! Strings are NUL-terminated UTF-16. `attributes` is always null here;
//! `last_written` is a FILETIME (100ns ticks since 1601-01-01 UTC).
//!
//! `encode` builds an owned `EncodedCredential` whose `RawCredential`
//! points into buffers the encoded value owns. `decode` copies everything
//! out of a vault-owned record, so the caller may free it right after.

use std::ffi::c_void;

use chrono::{DateTime, Utc};

use super::attributes::{AttributeBag, CredentialKind, PersistenceClass};
use super::record::{CredentialRecord, MISSING_IDENTITY};
use super::secret::{NativeSecret, SecureBuffer};
use crate::errors::{CredVaultError, Result};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Two-word timestamp, low word first.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTime {
    pub low: u32,
    pub high: u32,
}

/// 100ns ticks per second.
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

impl FileTime {
    pub fn from_ticks(ticks: u64) -> Self {
        Self {
            low: (ticks & 0xFFFF_FFFF) as u32,
            high: (ticks >> 32) as u32,
        }
    }

    pub fn ticks(self) -> u64 {
        (u64::from(self.high) << 32) | u64::from(self.low)
    }

    /// Convert to a UTC instant. `None` if the tick count is out of range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let ticks = i64::try_from(self.ticks()).ok()?;
        let secs = ticks.div_euclid(TICKS_PER_SECOND) - FILETIME_UNIX_OFFSET_SECS;
        let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        DateTime::from_timestamp(secs, nanos)
    }

    /// Convert from a UTC instant, clamping anything before 1601 to zero.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let secs = at.timestamp() + FILETIME_UNIX_OFFSET_SECS;
        if secs < 0 {
            return Self::default();
        }
        let ticks = secs
            .saturating_mul(TICKS_PER_SECOND)
            .saturating_add(i64::from(at.timestamp_subsec_nanos() / 100));
        Self::from_ticks(ticks as u64)
    }
}

/// The vault's native credential record, field for field.
#[repr(C)]
#[derive(Debug)]
pub struct RawCredential {
    pub flags: u32,
    pub kind: u32,
    pub target_name: *mut u16,
    pub comment: *mut u16,
    pub last_written: FileTime,
    pub credential_blob_size: u32,
    pub credential_blob: *mut u8,
    pub persist: u32,
    pub attribute_count: u32,
    pub attributes: *mut c_void,
    pub target_alias: *mut u16,
    pub user_name: *mut u16,
}

#[cfg(target_pointer_width = "64")]
const _: () = {
    use std::mem::{offset_of, size_of};
    assert!(size_of::<RawCredential>() == 80);
    assert!(offset_of!(RawCredential, target_name) == 8);
    assert!(offset_of!(RawCredential, last_written) == 24);
    assert!(offset_of!(RawCredential, credential_blob_size) == 32);
    assert!(offset_of!(RawCredential, credential_blob) == 40);
    assert!(offset_of!(RawCredential, persist) == 48);
    assert!(offset_of!(RawCredential, attributes) == 56);
    assert!(offset_of!(RawCredential, user_name) == 72);
};

#[cfg(target_pointer_width = "32")]
const _: () = {
    assert!(std::mem::size_of::<RawCredential>() == 52);
};

// ---------------------------------------------------------------------------
// Wide strings
// ---------------------------------------------------------------------------

/// Encode `s` as NUL-terminated UTF-16.
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Read a NUL-terminated UTF-16 string. `None` for a null pointer.
///
/// # Safety
///
/// `ptr` must be null or point to a readable, NUL-terminated UTF-16 string.
pub unsafe fn read_wide(ptr: *const u16) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let units = std::slice::from_raw_parts(ptr, len);
    Some(String::from_utf16_lossy(units))
}

/// An owned, NUL-terminated UTF-16 string for passing names to the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideString(Vec<u16>);

impl WideString {
    pub fn new(s: &str) -> Self {
        Self(to_wide(s))
    }

    pub fn as_ptr(&self) -> *const u16 {
        self.0.as_ptr()
    }

    /// Code units up to (not including) the first NUL.
    pub fn units(&self) -> &[u16] {
        let end = self.0.iter().position(|&u| u == 0).unwrap_or(self.0.len());
        &self.0[..end]
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.units())
    }
}

fn optional_wide(value: Option<&str>) -> Option<Vec<u16>> {
    value.filter(|s| !s.is_empty()).map(to_wide)
}

fn wide_ptr(buf: &mut Option<Vec<u16>>) -> *mut u16 {
    buf.as_mut().map_or(std::ptr::null_mut(), |b| b.as_mut_ptr())
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// A native record together with the buffers its pointers refer to.
///
/// The secret blob is zeroed when this value is dropped.
pub struct EncodedCredential {
    raw: RawCredential,
    // The fields below back the pointers in `raw` and must outlive it.
    _target_name: Vec<u16>,
    _comment: Option<Vec<u16>>,
    _target_alias: Option<Vec<u16>>,
    _user_name: Option<Vec<u16>>,
    _secret: NativeSecret,
}

impl EncodedCredential {
    pub fn as_raw(&self) -> &RawCredential {
        &self.raw
    }
}

/// Marshal `record` into a native record stored under `target`.
///
/// `target` must already be normalized. Recognized attributes map onto
/// their native fields; `last_write_time` and any extra attributes are
/// not written.
pub fn encode(record: &CredentialRecord, target: &str) -> EncodedCredential {
    let attrs = record.attributes();

    let mut target_name = to_wide(target);
    let mut comment = optional_wide(attrs.description.as_deref());
    let mut target_alias = optional_wide(attrs.alias.as_deref());
    let mut user_name = optional_wide(Some(record.identity()));
    let mut secret = NativeSecret::to_native(record.secret());

    let raw = RawCredential {
        flags: 0,
        kind: attrs.effective_kind().code(),
        target_name: target_name.as_mut_ptr(),
        comment: wide_ptr(&mut comment),
        last_written: FileTime::default(),
        credential_blob_size: secret.byte_len(),
        credential_blob: secret.as_mut_ptr(),
        persist: attrs.effective_persistence().code(),
        attribute_count: 0,
        attributes: std::ptr::null_mut(),
        target_alias: wide_ptr(&mut target_alias),
        user_name: wide_ptr(&mut user_name),
    };

    // Moving the Vecs and the boxed blob does not move their heap storage,
    // so the pointers in `raw` stay valid.
    EncodedCredential {
        raw,
        _target_name: target_name,
        _comment: comment,
        _target_alias: target_alias,
        _user_name: user_name,
        _secret: secret,
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Copy a native record into a `CredentialRecord`.
///
/// Does not take ownership of `raw`; the caller frees it.
///
/// # Safety
///
/// `raw` must be null or point to a valid `RawCredential` whose string and
/// blob pointers are themselves valid.
pub unsafe fn decode(raw: *const RawCredential) -> Result<CredentialRecord> {
    let raw = raw
        .as_ref()
        .ok_or_else(|| CredVaultError::InvalidRecord("null credential pointer".into()))?;

    let kind = CredentialKind::from_code(raw.kind)?;
    let persistence = PersistenceClass::from_code(raw.persist)?;

    let target = read_wide(raw.target_name)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CredVaultError::InvalidRecord("credential has no target name".into()))?;

    let identity = read_wide(raw.user_name)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| MISSING_IDENTITY.to_string());

    let attributes = AttributeBag {
        alias: read_wide(raw.target_alias).filter(|s| !s.is_empty()),
        kind: Some(kind),
        persistence: Some(persistence),
        description: read_wide(raw.comment).filter(|s| !s.is_empty()),
        last_write_time: raw.last_written.to_datetime(),
        extra: Default::default(),
    };

    let secret = SecureBuffer::from_native(raw.credential_blob, raw.credential_blob_size);

    Ok(CredentialRecord::from_parts(identity, secret, target, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filetime_reassembles_high_and_low_words() {
        let ft = FileTime {
            low: 0x89AB_CDEF,
            high: 0x0123_4567,
        };
        assert_eq!(ft.ticks(), 0x0123_4567_89AB_CDEF);
        assert_eq!(FileTime::from_ticks(ft.ticks()), ft);
    }

    #[test]
    fn filetime_unix_epoch() {
        let ft = FileTime::from_ticks(116_444_736_000_000_000);
        let at = ft.to_datetime().unwrap();
        assert_eq!(at.timestamp(), 0);
    }

    #[test]
    fn filetime_converts_both_ways() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();
        assert_eq!(FileTime::from_datetime(at).to_datetime(), Some(at));
    }

    #[test]
    fn filetime_zero_is_1601() {
        let at = FileTime::default().to_datetime().unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn wide_string_roundtrip() {
        let mut wide = to_wide("ns:user=ä");
        assert_eq!(wide.last(), Some(&0));
        let back = unsafe { read_wide(wide.as_mut_ptr()) };
        assert_eq!(back.as_deref(), Some("ns:user=ä"));
        assert_eq!(unsafe { read_wide(std::ptr::null()) }, None);
    }

    #[test]
    fn wide_string_stops_at_interior_nul() {
        let wide = WideString::new("ab\0cd");
        assert_eq!(wide.units().len(), 2);
        assert_eq!(wide.to_string_lossy(), "ab");
    }

    #[test]
    fn encode_fills_native_fields() {
        let record = CredentialRecord::new("alice", "hunter2")
            .with_kind(CredentialKind::DomainPassword)
            .with_persistence(PersistenceClass::LocalMachine)
            .with_alias("db")
            .with_description("primary");
        let encoded = encode(&record, "ns:user=alice");
        let raw = encoded.as_raw();

        assert_eq!(raw.flags, 0);
        assert_eq!(raw.kind, 2);
        assert_eq!(raw.persist, 2);
        assert_eq!(raw.credential_blob_size, 14);
        assert_eq!(raw.attribute_count, 0);
        assert!(raw.attributes.is_null());
        assert_eq!(raw.last_written, FileTime::default());
        unsafe {
            assert_eq!(read_wide(raw.target_name).as_deref(), Some("ns:user=alice"));
            assert_eq!(read_wide(raw.user_name).as_deref(), Some("alice"));
            assert_eq!(read_wide(raw.target_alias).as_deref(), Some("db"));
            assert_eq!(read_wide(raw.comment).as_deref(), Some("primary"));
        }
    }

    #[test]
    fn encode_uses_defaults_and_nulls() {
        let record = CredentialRecord::new("", "");
        let encoded = encode(&record, "ns:user=");
        let raw = encoded.as_raw();

        assert_eq!(raw.kind, CredentialKind::Generic.code());
        assert_eq!(raw.persist, PersistenceClass::Enterprise.code());
        assert!(raw.user_name.is_null());
        assert!(raw.comment.is_null());
        assert!(raw.target_alias.is_null());
        assert!(raw.credential_blob.is_null());
        assert_eq!(raw.credential_blob_size, 0);
    }

    #[test]
    fn extra_and_last_write_are_not_encoded() {
        let record = CredentialRecord::new("bob", "pw")
            .with_extra("owner", "ops")
            .with_attributes(AttributeBag {
                last_write_time: Some(Utc::now()),
                ..AttributeBag::default()
            });
        let encoded = encode(&record, "ns:user=bob");
        assert_eq!(encoded.as_raw().last_written, FileTime::default());

        let decoded = unsafe { decode(encoded.as_raw()) }.unwrap();
        assert!(decoded.attributes().extra.is_empty());
    }

    #[test]
    fn decode_reproduces_encoded_record() {
        let record = CredentialRecord::new("alice", "s3cr\u{e9}t")
            .with_kind(CredentialKind::GenericCertificate)
            .with_persistence(PersistenceClass::Session)
            .with_alias("alias")
            .with_description("desc");
        let encoded = encode(&record, "ns:user=alice");
        let decoded = unsafe { decode(encoded.as_raw()) }.unwrap();

        assert_eq!(decoded.identity(), "alice");
        assert_eq!(decoded.secret().expose(), "s3cr\u{e9}t");
        assert_eq!(decoded.target(), "ns:user=alice");
        assert_eq!(decoded.kind(), CredentialKind::GenericCertificate);
        assert_eq!(decoded.persistence(), PersistenceClass::Session);
        assert_eq!(decoded.attributes().alias.as_deref(), Some("alias"));
        assert_eq!(decoded.attributes().description.as_deref(), Some("desc"));
    }

    #[test]
    fn decode_missing_user_name_uses_sentinel() {
        let record = CredentialRecord::new("", "pw");
        let encoded = encode(&record, "other:thing");
        let decoded = unsafe { decode(encoded.as_raw()) }.unwrap();
        assert_eq!(decoded.identity(), MISSING_IDENTITY);
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let record = CredentialRecord::new("alice", "pw");
        let encoded = encode(&record, "ns:user=alice");
        let mut raw = RawCredential { kind: 42, ..copy_raw(encoded.as_raw()) };
        let err = unsafe { decode(&mut raw) }.unwrap_err();
        assert!(matches!(err, CredVaultError::InvalidRecord(_)));
    }

    #[test]
    fn decode_rejects_null() {
        assert!(unsafe { decode(std::ptr::null()) }.is_err());
    }

    fn copy_raw(raw: &RawCredential) -> RawCredential {
        RawCredential {
            flags: raw.flags,
            kind: raw.kind,
            target_name: raw.target_name,
            comment: raw.comment,
            last_written: raw.last_written,
            credential_blob_size: raw.credential_blob_size,
            credential_blob: raw.credential_blob,
            persist: raw.persist,
            attribute_count: raw.attribute_count,
            attributes: raw.attributes,
            target_alias: raw.target_alias,
            user_name: raw.user_name,
        }
    }
}
