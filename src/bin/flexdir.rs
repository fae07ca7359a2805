//! Lists the active directory entries of a FLEX disk image.

use clap::{arg, crate_version, Command};
use colored::Colorize;
use flexkit::cli_support::run_and_report;
use flexkit::engine::FlexDisk;
use std::process::ExitCode;

fn build_cli() -> Command {
    Command::new("flexdir")
        .version(crate_version!())
        .about("Lists the directory of a FLEX disk image")
        .arg(arg!(-d --dimg <PATH> "path to the FLEX disk image").required(true))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = build_cli().get_matches();

    let code = run_and_report(|| {
        let dimg_path = matches.get_one::<String>("dimg").unwrap();
        let bytes = std::fs::read(dimg_path)?;
        let disk = FlexDisk::open(bytes)?;
        let stats = disk.stat()?;

        println!(
            "{} (vol {}) — {} tracks x {} sectors, {} free",
            stats.label, stats.vol_number, stats.tracks, stats.sectors_per_track, stats.free_sectors
        );
        for row in disk.list()? {
            let kind = if row.is_text { "txt".green() } else { "bin".yellow() };
            println!(
                "{:<12} {:>5} sec  {:02}/{:02}-{:02}/{:02}  {:02}/{:02}/{:02}  [{}]",
                row.name,
                row.total_sectors,
                row.start.track,
                row.start.sector,
                row.end.track,
                row.end.sector,
                row.month,
                row.day,
                row.year,
                kind
            );
        }
        Ok(())
    });
    ExitCode::from(code as u8)
}
