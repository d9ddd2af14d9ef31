//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::CredentialRecord;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

fn last_written(record: &CredentialRecord) -> String {
    record
        .attributes()
        .last_write_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Print a table of credentials (Target, User, Kind, Persistence, Written).
pub fn print_credentials_table(records: &[CredentialRecord]) {
    if records.is_empty() {
        info("No matching credentials.");
        tip("Run `credvault set <TARGET>` to store one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Target", "User", "Kind", "Persistence", "Written"]);

    for r in records {
        table.add_row(vec![
            r.target().to_string(),
            r.identity().to_string(),
            r.kind().to_string(),
            r.persistence().to_string(),
            last_written(r),
        ]);
    }

    println!("{table}");
}

/// Print every field of one credential. The secret is printed below the
/// table, and only when `reveal` is set.
pub fn print_credential(record: &CredentialRecord, reveal: bool) {
    let attrs = record.attributes();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let rows = [
        ("Target", record.target().to_string()),
        ("User", record.identity().to_string()),
        ("Kind", record.kind().to_string()),
        ("Persistence", record.persistence().to_string()),
        ("Alias", attrs.alias.clone().unwrap_or_default()),
        ("Description", attrs.description.clone().unwrap_or_default()),
        ("Written", last_written(record)),
    ];
    for (label, value) in rows {
        table.add_row(vec![label.to_string(), value]);
    }

    println!("{table}");

    // Written straight from the secret buffer so no unzeroed copy is made.
    if reveal {
        println!("{} {}", style("Secret:").bold(), record.secret().expose());
    }
}
