//! `credvault list` — enumerate stored credentials.

use crate::cli::output;
use crate::errors::{CredVaultError, Result};
use crate::vault::{CredentialApi, CredentialStore};

/// Execute the `list` command. With `raw`, the filter reaches the vault
/// without namespacing.
pub fn execute<A: CredentialApi>(
    store: &CredentialStore<A>,
    filter: &str,
    raw: bool,
    json: bool,
) -> Result<()> {
    let records = if raw {
        store.find_raw(filter)?
    } else {
        store.find(filter)?
    };

    if json {
        let infos: Vec<_> = records.iter().map(|r| r.info()).collect();
        let text = serde_json::to_string_pretty(&infos)
            .map_err(|e| CredVaultError::SerializationError(format!("credential list: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    let scope = match (filter.is_empty(), raw) {
        (true, _) => "all targets".to_string(),
        (false, true) => format!("'{filter}'"),
        (false, false) => format!("'{}'", store.resolver().normalize(filter)),
    };
    output::info(&format!("{} credential(s) matching {scope}", records.len()));
    output::print_credentials_table(&records);

    Ok(())
}
