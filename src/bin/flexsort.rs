//! Repacks a FLEX disk image's directory, optionally sorting entries.

use clap::{arg, crate_version, ArgAction, Command};
use flexkit::cli_support::run_and_report;
use flexkit::engine::{FlexDisk, SortOrder};
use std::process::ExitCode;

fn build_cli() -> Command {
    Command::new("flexsort")
        .version(crate_version!())
        .about("Repacks (and optionally sorts) a FLEX disk image's directory")
        .arg(arg!(-d --dimg <PATH> "path to the FLEX disk image").required(true))
        .arg(arg!(-u --unsorted "repack without sorting, preserving directory-walk order").action(ArgAction::SetTrue))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = build_cli().get_matches();

    let code = run_and_report(|| {
        let dimg_path = matches.get_one::<String>("dimg").unwrap();
        let order = if matches.get_flag("unsorted") {
            SortOrder::Unsorted
        } else {
            SortOrder::Lexicographic
        };

        let bytes = std::fs::read(dimg_path)?;
        let mut disk = FlexDisk::open(bytes)?;
        disk.sort(order)?;
        std::fs::write(dimg_path, disk.to_bytes())?;
        log::info!("repacked directory on {}", dimg_path);
        Ok(())
    });
    ExitCode::from(code as u8)
}
