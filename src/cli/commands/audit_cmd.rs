//! `credvault audit` — display the audit log of vault changes.
//!
//! Usage:
//!   credvault audit               # last 50 entries
//!   credvault audit --last 20
//!   credvault audit --since 7d

use chrono::{DateTime, Duration, Utc};

use crate::cli::Context;
use crate::errors::{CredVaultError, Result};

/// Execute the `audit` command.
#[cfg(feature = "audit-log")]
pub fn execute(ctx: &Context, last: usize, since: Option<&str>) -> Result<()> {
    use crate::audit::AuditLog;
    use crate::cli::output;

    let state_dir = ctx.state_dir();
    if !AuditLog::db_path(&state_dir).exists() {
        output::info("No audit entries found.");
        return Ok(());
    }

    let audit = AuditLog::open(&state_dir)
        .ok_or_else(|| CredVaultError::AuditError("failed to open audit database".into()))?;

    let since_dt = since.map(parse_since).transpose()?;
    let entries = audit.query(last, since_dt)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

#[cfg(not(feature = "audit-log"))]
pub fn execute(ctx: &Context, last: usize, since: Option<&str>) -> Result<()> {
    let _ = (ctx, last);
    since.map(parse_since).transpose()?;
    Err(CredVaultError::AuditError(
        "this build was compiled without the audit-log feature".into(),
    ))
}

/// Turn "7d", "24h" or "30m" into the instant that long ago.
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        CredVaultError::CommandFailed(format!(
            "invalid duration '{input}': use a form like 7d, 24h or 30m"
        ))
    };

    let split = input.len().checked_sub(1).ok_or_else(invalid)?;
    if !input.is_char_boundary(split) {
        return Err(invalid());
    }
    let (num_str, unit) = input.split_at(split);
    let num: i64 = num_str.parse().map_err(|_| invalid())?;

    let span = match unit {
        "d" => Duration::days(num),
        "h" => Duration::hours(num),
        "m" => Duration::minutes(num),
        _ => return Err(invalid()),
    };

    Ok(Utc::now() - span)
}

#[cfg(feature = "audit-log")]
fn print_audit_table(entries: &[crate::audit::AuditEntry]) {
    use comfy_table::{ContentArrangement, Table};
    use console::style;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Target", "Kind", "Details"]);

    for entry in entries {
        let op = match entry.operation.as_str() {
            "set" => style(&entry.operation).blue().to_string(),
            "remove" => style(&entry.operation).red().to_string(),
            other => other.to_string(),
        };
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            op,
            entry.target.clone(),
            entry.kind.clone(),
            entry.details.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }

    println!("{}", style(format!("{} audit entries:", entries.len())).bold());
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_since_units() {
        let days = Utc::now() - parse_since("7d").unwrap();
        assert!((days.num_days() - 7).abs() <= 1);

        let hours = Utc::now() - parse_since("24h").unwrap();
        assert!((hours.num_hours() - 24).abs() <= 1);

        let minutes = Utc::now() - parse_since(" 30m ").unwrap();
        assert!((minutes.num_minutes() - 30).abs() <= 1);
    }

    #[test]
    fn parse_since_rejects_garbage() {
        for bad in ["", "d", "abc", "7x", "7", "1é"] {
            assert!(parse_since(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
