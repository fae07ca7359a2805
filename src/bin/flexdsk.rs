//! Creates a new FLEX disk image. A thin wrapper over
//! [`flexkit::engine::FlexDisk::create`]: parse args, build the image in
//! memory, write it to the output path.

use clap::{arg, crate_version, Command};
use flexkit::cli_support::run_and_report;
use flexkit::engine::FlexDisk;
use flexkit::geometry::Geometry;
use std::process::ExitCode;

fn build_cli() -> Command {
    Command::new("flexdsk")
        .version(crate_version!())
        .about("Creates a new FLEX disk image")
        .arg(arg!(-o --output <PATH> "path to write the new image to").required(true))
        .arg(arg!(-t --tracks <N> "number of tracks").required(false).default_value("35"))
        .arg(arg!(-s --sectors <N> "sectors per track").required(false).default_value("18"))
        .arg(arg!(-l --label <LABEL> "volume label, up to 11 characters").required(false).default_value(""))
        .arg(arg!(-v --volume <N> "volume number").required(false).default_value("1"))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = build_cli().get_matches();

    let code = run_and_report(|| {
        let tracks: u16 = matches
            .get_one::<String>("tracks")
            .unwrap()
            .parse()
            .map_err(|_| flexkit::Error::BadGeometry)?;
        let sectors: u8 = matches
            .get_one::<String>("sectors")
            .unwrap()
            .parse()
            .map_err(|_| flexkit::Error::BadGeometry)?;
        let label = matches.get_one::<String>("label").unwrap();
        let volume: u16 = matches
            .get_one::<String>("volume")
            .unwrap()
            .parse()
            .map_err(|_| flexkit::Error::BadGeometry)?;
        let output = matches.get_one::<String>("output").unwrap();

        let geometry = Geometry { tracks, sectors_per_track: sectors };
        let disk = FlexDisk::create(geometry, label, volume, None, None)?;
        std::fs::write(output, disk.to_bytes())?;
        log::info!("wrote {} bytes to {}", disk.to_bytes().len(), output);
        Ok(())
    });
    ExitCode::from(code as u8)
}
