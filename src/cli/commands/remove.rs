//! `credvault remove` — delete a credential from the vault.

use dialoguer::Confirm;

use crate::cli::commands::log_audit;
use crate::cli::{output, Context};
use crate::errors::{CredVaultError, Result};
use crate::vault::{CredentialApi, CredentialKind, CredentialStore};

/// Execute the `remove` command. With `raw`, `target` is removed exactly
/// as given.
pub fn execute<A: CredentialApi>(
    ctx: &Context,
    store: &CredentialStore<A>,
    target: &str,
    kind: CredentialKind,
    raw: bool,
    force: bool,
) -> Result<()> {
    let resolved = if raw {
        target.to_string()
    } else {
        store.resolver().normalize(target)
    };

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove credential '{resolved}' ({kind})?"))
            .default(false)
            .interact()
            .map_err(|e| CredVaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    if raw {
        store.delete_raw(target, kind)?;
    } else {
        store.delete(target, kind)?;
    }

    log_audit(ctx, "remove", &resolved, &kind.to_string(), None);
    output::success(&format!("Removed credential '{resolved}'"));

    Ok(())
}
