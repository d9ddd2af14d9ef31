//! Record codec tests against the public native seam.

use chrono::{TimeZone, Utc};
use credvault::vault::format::{self, FileTime, WideString};
use credvault::vault::{
    CredentialApi, CredentialKind, CredentialRecord, MemoryEntry, MemoryVault, PersistenceClass,
};

#[test]
fn filetime_matches_known_instant() {
    // 2020-01-01T00:00:00Z
    let ft = FileTime::from_ticks(132_223_104_000_000_000);
    let expected = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(ft.to_datetime(), Some(expected));
    assert_eq!(FileTime::from_datetime(expected), ft);
}

#[test]
fn encoded_record_is_accepted_by_vault_and_decodes_back() {
    let vault = MemoryVault::new();
    let record = CredentialRecord::new("j\u{00f6}rg", "p\u{00e4}ss \u{1F511}")
        .with_kind(CredentialKind::DomainVisiblePassword)
        .with_persistence(PersistenceClass::Session)
        .with_alias("build")
        .with_description("nightly \u{2713}");

    let encoded = format::encode(&record, "corp:host=build01");
    unsafe { vault.write(encoded.as_raw(), 0) }.unwrap();
    drop(encoded);

    let target = WideString::new("CORP:HOST=BUILD01");
    let ptr = vault
        .read(&target, CredentialKind::DomainVisiblePassword.code())
        .unwrap();
    let decoded = unsafe { format::decode(ptr) };
    unsafe { vault.free(ptr.cast()) };
    let decoded = decoded.unwrap();

    assert_eq!(decoded.target(), "corp:host=build01");
    assert_eq!(decoded.identity(), "j\u{00f6}rg");
    assert_eq!(decoded.secret().expose(), "p\u{00e4}ss \u{1F511}");
    assert_eq!(decoded.kind(), CredentialKind::DomainVisiblePassword);
    assert_eq!(decoded.persistence(), PersistenceClass::Session);
    assert_eq!(decoded.attributes().alias.as_deref(), Some("build"));
    assert_eq!(
        decoded.attributes().description.as_deref(),
        Some("nightly \u{2713}")
    );
    assert_eq!(vault.outstanding(), 0);
}

#[test]
fn empty_secret_decodes_as_empty() {
    let vault = MemoryVault::new();
    vault.insert(MemoryEntry::new("ns:user=blank", "blank", ""));

    let ptr = vault
        .read(&WideString::new("ns:user=blank"), CredentialKind::Generic.code())
        .unwrap();
    let decoded = unsafe { format::decode(ptr) };
    unsafe { vault.free(ptr.cast()) };

    let decoded = decoded.unwrap();
    assert!(decoded.secret().is_empty());
    assert_eq!(vault.frees(), 1);
}
