//! `credvault show` — display a single credential.

use serde::Serialize;
use zeroize::Zeroizing;

use crate::cli::output;
use crate::errors::{CredVaultError, Result};
use crate::vault::{CredentialApi, CredentialInfo, CredentialKind, CredentialStore};

/// Flags accepted by `show`.
pub struct ShowOptions {
    pub kind: CredentialKind,
    pub best: bool,
    pub raw: bool,
    pub reveal: bool,
    pub json: bool,
}

/// JSON view that includes the secret.
#[derive(Serialize)]
struct Revealed<'a> {
    #[serde(flatten)]
    info: CredentialInfo<'a>,
    secret: &'a str,
}

/// Execute the `show` command.
pub fn execute<A: CredentialApi>(
    store: &CredentialStore<A>,
    target: &str,
    opts: ShowOptions,
) -> Result<()> {
    let found = match (opts.best, opts.raw) {
        (true, true) => store.get_raw(target)?,
        (true, false) => store.get(target)?,
        (false, true) => store.load_raw(target, opts.kind)?,
        (false, false) => store.load(target, opts.kind)?,
    };

    let Some(record) = found else {
        let shown = if opts.raw {
            target.to_string()
        } else {
            store.resolver().normalize(target)
        };
        return Err(CredVaultError::CommandFailed(format!(
            "no credential found for '{shown}'"
        )));
    };

    if opts.reveal {
        output::warning("Printing the secret in plain text");
    }

    if opts.json {
        let json = if opts.reveal {
            serde_json::to_string_pretty(&Revealed {
                info: record.info(),
                secret: record.secret().expose(),
            })
        } else {
            serde_json::to_string_pretty(&record.info())
        };
        let text = Zeroizing::new(
            json.map_err(|e| CredVaultError::SerializationError(format!("credential: {e}")))?,
        );
        println!("{}", text.as_str());
        return Ok(());
    }

    output::print_credential(&record, opts.reveal);
    Ok(())
}
