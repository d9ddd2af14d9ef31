//! `credvault set` — add or replace a credential in the vault.

use crate::cli::commands::log_audit;
use crate::cli::{output, read_secret, Context};
use crate::errors::Result;
use crate::vault::{
    CredentialApi, CredentialKind, CredentialRecord, CredentialStore, PersistenceClass,
    SecureBuffer,
};

/// Flags accepted by `set`.
pub struct SetOptions<'a> {
    pub user: Option<&'a str>,
    pub kind: CredentialKind,
    pub persistence: PersistenceClass,
    pub alias: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// Execute the `set` command.
pub fn execute<A: CredentialApi>(
    ctx: &Context,
    store: &CredentialStore<A>,
    target: &str,
    opts: SetOptions<'_>,
) -> Result<()> {
    let secret = read_secret(target)?;
    let record = build_record(target, SecureBuffer::new(secret.as_str()), &opts);
    drop(secret);

    store.save(&record)?;

    let resolved = store.resolver().normalize(target);
    log_audit(ctx, "set", &resolved, &opts.kind.to_string(), None);

    output::success(&format!(
        "Saved credential '{resolved}' for user '{}'",
        record.identity()
    ));
    output::tip(&format!("Read it back: credvault show {target}"));

    Ok(())
}

/// Assemble the record to save. The user defaults to the target name.
fn build_record(target: &str, secret: SecureBuffer, opts: &SetOptions<'_>) -> CredentialRecord {
    let mut record = CredentialRecord::new(opts.user.unwrap_or(target), secret)
        .with_target(target)
        .with_kind(opts.kind)
        .with_persistence(opts.persistence);

    if let Some(alias) = opts.alias {
        record = record.with_alias(alias);
    }
    if let Some(description) = opts.description {
        record = record.with_description(description);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts<'a>() -> SetOptions<'a> {
        SetOptions {
            user: None,
            kind: CredentialKind::Generic,
            persistence: PersistenceClass::Enterprise,
            alias: None,
            description: None,
        }
    }

    #[test]
    fn user_defaults_to_target() {
        let record = build_record("deploy", SecureBuffer::new("pw"), &opts());
        assert_eq!(record.identity(), "deploy");
        assert_eq!(record.target(), "deploy");
    }

    #[test]
    fn options_become_attributes() {
        let o = SetOptions {
            user: Some("svc"),
            kind: CredentialKind::DomainPassword,
            persistence: PersistenceClass::Session,
            alias: Some("db"),
            description: Some("nightly"),
        };
        let record = build_record("host=db01", SecureBuffer::new("pw"), &o);
        assert_eq!(record.identity(), "svc");
        assert_eq!(record.kind(), CredentialKind::DomainPassword);
        assert_eq!(record.persistence(), PersistenceClass::Session);
        assert_eq!(record.attributes().alias.as_deref(), Some("db"));
        assert_eq!(record.attributes().description.as_deref(), Some("nightly"));
    }
}
