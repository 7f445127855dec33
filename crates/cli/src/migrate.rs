//! Subcommands driving the migrator.
//!
//! Each command makes at most one routine call; the version printed is
//! the one recorded in the store afterwards.

use std::future::Future;
use std::process;

use serde_json::json;
use singpath_migrate::{MigrationError, MigrationStatus, Migrator};
use singpath_store::RemoteClient;
use tokio::runtime::Runtime;

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_version<C: RemoteClient>(
    rt: &Runtime,
    migrator: &Migrator<C>,
    output: OutputFormat,
    quiet: bool,
) {
    let version = block_on(rt, migrator.version(), output, quiet);
    print_version("current", version, output);
}

pub(crate) fn cmd_list<C: RemoteClient>(
    rt: &Runtime,
    migrator: &Migrator<C>,
    output: OutputFormat,
    quiet: bool,
) {
    let status = block_on(rt, migrator.status(), output, quiet);
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&status)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => print_status(&status),
    }
}

pub(crate) fn cmd_next<C: RemoteClient>(
    rt: &Runtime,
    migrator: &Migrator<C>,
    output: OutputFormat,
    quiet: bool,
) {
    let before = block_on(rt, migrator.version(), output, quiet);
    let after = block_on(rt, migrator.next(), output, quiet);
    print_version(step_action(before, after, "upgraded"), after, output);
}

pub(crate) fn cmd_revert<C: RemoteClient>(
    rt: &Runtime,
    migrator: &Migrator<C>,
    output: OutputFormat,
    quiet: bool,
) {
    let before = block_on(rt, migrator.version(), output, quiet);
    let after = block_on(rt, migrator.revert(), output, quiet);
    print_version(step_action(before, after, "reverted"), after, output);
}

/// Label for a `next`/`revert` outcome; an unchanged version means no
/// routine ran.
fn step_action(before: u32, after: u32, moved: &'static str) -> &'static str {
    if before == after {
        "up to date"
    } else {
        moved
    }
}

fn block_on<T>(
    rt: &Runtime,
    call: impl Future<Output = Result<T, MigrationError>>,
    output: OutputFormat,
    quiet: bool,
) -> T {
    match rt.block_on(call) {
        Ok(value) => value,
        Err(e) => {
            report_error(&format!("migration error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn print_version(action: &str, version: u32, output: OutputFormat) {
    match output {
        OutputFormat::Json => println!("{}", json!({ "version": version })),
        OutputFormat::Text => println!("{}: schema version {}", action, version),
    }
}

fn print_status(status: &MigrationStatus) {
    println!(
        "schema version {} (latest {})",
        status.current, status.latest
    );
    for routine in &status.applied {
        println!("  [x] {:>3}  {}", routine.version, routine.description);
    }
    for routine in &status.pending {
        println!("  [ ] {:>3}  {}", routine.version, routine.description);
    }
}
