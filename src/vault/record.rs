//! The credential record exchanged with callers.

use serde::Serialize;

use super::attributes::{AttributeBag, CredentialKind, PersistenceClass};
use super::secret::SecureBuffer;

/// Identity reported for vault entries that carry no user name.
pub const MISSING_IDENTITY: &str = "-";

/// Identity, secret, target and metadata of one vault entry.
///
/// Records are built once and not mutated afterwards; the `with_*`
/// methods consume the record and return a new one.
#[derive(Debug)]
pub struct CredentialRecord {
    identity: String,
    secret: SecureBuffer,
    target: String,
    attributes: AttributeBag,
}

impl CredentialRecord {
    /// A record with no explicit target. On save the identity is used as
    /// the target name.
    pub fn new(identity: impl Into<String>, secret: impl Into<SecureBuffer>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
            target: String::new(),
            attributes: AttributeBag::default(),
        }
    }

    pub(crate) fn from_parts(
        identity: String,
        secret: SecureBuffer,
        target: String,
        attributes: AttributeBag,
    ) -> Self {
        Self {
            identity,
            secret,
            target,
            attributes,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.attributes.alias = Some(alias.into());
        self
    }

    pub fn with_kind(mut self, kind: CredentialKind) -> Self {
        self.attributes.kind = Some(kind);
        self
    }

    pub fn with_persistence(mut self, persistence: PersistenceClass) -> Self {
        self.attributes.persistence = Some(persistence);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.attributes.description = Some(description.into());
        self
    }

    /// Attach a caller-defined attribute.
    ///
    /// These are not written to the vault: a record loaded back will not
    /// carry them.
    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.extra.insert(name.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeBag) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn secret(&self) -> &SecureBuffer {
        &self.secret
    }

    /// The target as stored: canonical for decoded records, as given by the
    /// caller otherwise.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The name to normalize on save: the explicit target, else the identity.
    pub fn raw_target(&self) -> &str {
        if self.target.is_empty() {
            &self.identity
        } else {
            &self.target
        }
    }

    pub fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    pub fn kind(&self) -> CredentialKind {
        self.attributes.effective_kind()
    }

    pub fn persistence(&self) -> PersistenceClass {
        self.attributes.effective_persistence()
    }

    /// Serializable view without the secret.
    pub fn info(&self) -> CredentialInfo<'_> {
        CredentialInfo {
            identity: &self.identity,
            target: &self.target,
            attributes: &self.attributes,
        }
    }
}

/// Secret-free projection of a record, used for listings and JSON output.
#[derive(Debug, Serialize)]
pub struct CredentialInfo<'a> {
    pub identity: &'a str,
    pub target: &'a str,
    #[serde(flatten)]
    pub attributes: &'a AttributeBag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_target_falls_back_to_identity() {
        let rec = CredentialRecord::new("alice", "pw");
        assert_eq!(rec.raw_target(), "alice");

        let rec = rec.with_target("myapp");
        assert_eq!(rec.raw_target(), "myapp");
        assert_eq!(rec.identity(), "alice");
    }

    #[test]
    fn builders_fill_attributes() {
        let rec = CredentialRecord::new("svc", "pw")
            .with_alias("build")
            .with_kind(CredentialKind::DomainPassword)
            .with_persistence(PersistenceClass::Session)
            .with_description("ci runner")
            .with_extra("owner", "ops");

        assert_eq!(rec.kind(), CredentialKind::DomainPassword);
        assert_eq!(rec.persistence(), PersistenceClass::Session);
        assert_eq!(rec.attributes().alias.as_deref(), Some("build"));
        assert_eq!(rec.attributes().description.as_deref(), Some("ci runner"));
        assert_eq!(rec.attributes().extra.get("owner").map(String::as_str), Some("ops"));
    }

    #[test]
    fn info_excludes_secret() {
        let rec = CredentialRecord::new("alice", "hunter2").with_target("ns:user=alice");
        let json = serde_json::to_string(&rec.info()).unwrap();
        assert!(json.contains("\"identity\":\"alice\""));
        assert!(json.contains("\"target\":\"ns:user=alice\""));
        assert!(!json.contains("hunter2"));
    }
}
