//! Target-name normalization.
//!
//! Entries written by CredVault live under a namespace prefix so they can
//! be told apart from entries other programs keep in the same vault:
//!
//! ```text
//! "alice"            -> "<namespace>:user=alice"
//! "host=db01"        -> "<namespace>:host=db01"
//! "git:https://x.io" -> "git:https://x.io"   (already qualified)
//! ```

/// Default namespace, shared with the PowerShell credential tooling that
/// writes into the same vault.
pub const DEFAULT_NAMESPACE: &str = "MicrosoftPowerShell";

/// Turns caller-supplied names into canonical vault target strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResolver {
    namespace: String,
}

impl TargetResolver {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Normalize `raw` into a namespaced target.
    ///
    /// Anything containing `:` is treated as fully qualified and returned
    /// unchanged. A `key=value` pair gets the namespace prefix; a bare name
    /// is taken to be a user name.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.contains(':') {
            raw.to_string()
        } else if raw.contains('=') {
            format!("{}:{raw}", self.namespace)
        } else {
            format!("{}:user={raw}", self.namespace)
        }
    }

    /// Enumeration filter matching every entry in this namespace.
    pub fn namespace_filter(&self) -> String {
        format!("{}:*", self.namespace)
    }
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}
