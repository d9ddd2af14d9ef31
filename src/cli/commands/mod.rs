//! Command implementations, one module per subcommand.

pub mod audit_cmd;
pub mod completions;
pub mod list;
pub mod remove;
pub mod set;
pub mod show;

use crate::cli::Context;

/// Record a vault change in the audit log.
///
/// Never fails the calling command; without the `audit-log` feature this
/// does nothing.
pub fn log_audit(ctx: &Context, op: &str, target: &str, kind: &str, details: Option<&str>) {
    #[cfg(feature = "audit-log")]
    if let Some(audit) = crate::audit::AuditLog::open(&ctx.state_dir()) {
        audit.log(op, target, kind, details);
    }

    #[cfg(not(feature = "audit-log"))]
    let _ = (ctx, op, target, kind, details);
}
