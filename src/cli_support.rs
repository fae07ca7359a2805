//! Shared glue for the six thin front-end binaries (`flexdsk`, `flexadd`,
//! `flextract`, `flexdir`, `flexsort`, `flexdump`). Argument parsing and
//! process exit codes are explicitly out of scope for the *engine* per
//! spec.md §1, but the binaries still need one small, common place for the
//! bits every front end repeats: numeric address parsing (§6: decimal or
//! `0x`-prefixed hex) and mapping an [`crate::error::Error`] to an exit
//! code, mirroring how `a2kit::main` funnels every subcommand's `Result`
//! through one `Display`-based error path.

use crate::error::Error;

/// Parses a CLI-supplied address/offset as decimal or `0x`/`0X`-prefixed
/// hexadecimal, per spec.md §6.
pub fn parse_number(s: &str) -> std::result::Result<u64, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex number {:?}: {}", s, e))
    } else {
        trimmed
            .parse::<u64>()
            .map_err(|e| format!("invalid number {:?}: {}", s, e))
    }
}

/// Maps an engine error to the process exit code a front end should
/// return: every kind is a distinct non-zero code, success is always 0.
pub fn exit_code(e: &Error) -> i32 {
    match e {
        Error::BadAddress(_) => 2,
        Error::BadGeometry => 3,
        Error::CorruptChain(_) => 4,
        Error::OutOfSpace => 5,
        Error::DirectoryFull => 6,
        Error::NotFound => 7,
        Error::DateOutOfRange(_) => 8,
        Error::IoError(_) => 9,
    }
}

/// Runs `body`, printing any error to stderr and returning the matching
/// exit code; the engine itself never aborts the process (§7), so the
/// decision to call `std::process::exit` belongs entirely to these bins.
pub fn run_and_report(body: impl FnOnce() -> crate::error::Result<()>) -> i32 {
    match body() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {}", e);
            exit_code(&e)
        }
    }
}
