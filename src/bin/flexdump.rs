//! Hex-dumps one sector of a FLEX disk image, addressed either as
//! `--track`/`--sector` or as a byte `--offset` rounded down to the sector
//! boundary (§4.6). Addresses accept decimal or `0x`-prefixed hex (§6).

use clap::{arg, crate_version, ArgGroup, Command};
use flexkit::cli_support::{parse_number, run_and_report};
use flexkit::engine::FlexDisk;
use flexkit::geometry::TrackSector;
use std::process::ExitCode;

fn build_cli() -> Command {
    Command::new("flexdump")
        .version(crate_version!())
        .about("Hex-dumps one sector of a FLEX disk image")
        .arg(arg!(-d --dimg <PATH> "path to the FLEX disk image").required(true))
        .arg(arg!(-t --track <N> "track number").required(false))
        .arg(arg!(-s --sector <N> "sector number").required(false))
        .arg(arg!(-o --offset <N> "byte offset, rounded down to the sector boundary").required(false))
        .group(
            ArgGroup::new("address")
                .args(["track", "offset"])
                .required(true),
        )
}

fn render_sector(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        out.push_str(&format!("{:04X}  ", row * 16));
        for b in chunk {
            out.push_str(&hex::encode_upper([*b]));
            out.push(' ');
        }
        for _ in chunk.len()..16 {
            out.push_str("   ");
        }
        out.push_str(" |");
        for &b in chunk {
            let c = if (0x20..=0x7E).contains(&b) { b as char } else { '.' };
            out.push(c);
        }
        out.push_str("|\n");
    }
    out
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = build_cli().get_matches();

    let code = run_and_report(|| {
        let dimg_path = matches.get_one::<String>("dimg").unwrap();
        let bytes = std::fs::read(dimg_path)?;
        let disk = FlexDisk::open(bytes)?;

        let ts = if let Some(offset_arg) = matches.get_one::<String>("offset") {
            let offset = parse_number(offset_arg).map_err(|_| flexkit::Error::BadAddress(flexkit::error::Addr(0, 0)))?;
            disk.sector_for_offset(offset as usize)?
        } else {
            let track = parse_number(matches.get_one::<String>("track").unwrap())
                .map_err(|_| flexkit::Error::BadAddress(flexkit::error::Addr(0, 0)))? as u8;
            let sector = matches
                .get_one::<String>("sector")
                .map(|s| parse_number(s))
                .transpose()
                .map_err(|_| flexkit::Error::BadAddress(flexkit::error::Addr(track, 0)))?
                .unwrap_or(1) as u8;
            TrackSector::new(track, sector)
        };

        let sector = disk.dump_sector(ts)?;
        println!("track {} sector {}:", ts.track, ts.sector);
        print!("{}", render_sector(&sector));
        Ok(())
    });
    ExitCode::from(code as u8)
}
