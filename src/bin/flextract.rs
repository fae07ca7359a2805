//! Extracts a file from a FLEX disk image to a host path (or stdout).

use clap::{arg, crate_version, ArgAction, Command};
use flexkit::cli_support::run_and_report;
use flexkit::engine::FlexDisk;
use flexkit::fileio::TextMode;
use std::io::Write;
use std::process::ExitCode;

fn build_cli() -> Command {
    Command::new("flextract")
        .version(crate_version!())
        .about("Extracts a file from a FLEX disk image")
        .arg(arg!(-d --dimg <PATH> "path to the FLEX disk image").required(true))
        .arg(arg!(-n --name <NAME> "FLEX name of the file to extract").required(true))
        .arg(arg!(-o --output <PATH> "host path to write to (defaults to stdout)").required(false))
        .arg(arg!(-t --text "extract in text mode (CR/LF decoding, space-run expansion)").action(ArgAction::SetTrue))
        .arg(arg!(--"no-check" "skip logical-record-number sequence checking").action(ArgAction::SetTrue))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = build_cli().get_matches();

    let code = run_and_report(|| {
        let dimg_path = matches.get_one::<String>("dimg").unwrap();
        let name = matches.get_one::<String>("name").unwrap();
        let text = matches.get_flag("text");
        let check_sequence = !matches.get_flag("no-check");

        let bytes = std::fs::read(dimg_path)?;
        let disk = FlexDisk::open(bytes)?;
        let mode = if text { TextMode::Text } else { TextMode::Binary };
        let contents = disk.extract_file(name, mode, check_sequence)?;

        match matches.get_one::<String>("output") {
            Some(path) => std::fs::write(path, &contents)?,
            None => std::io::stdout().write_all(&contents)?,
        }
        log::info!("extracted {} ({} bytes)", name, contents.len());
        Ok(())
    });
    ExitCode::from(code as u8)
}
