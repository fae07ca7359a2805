//! Adds a host file to a FLEX disk image.

use clap::{arg, crate_version, ArgAction, Command};
use flexkit::cli_support::run_and_report;
use flexkit::engine::FlexDisk;
use flexkit::fileio::TextMode;
use std::process::ExitCode;

fn build_cli() -> Command {
    Command::new("flexadd")
        .version(crate_version!())
        .about("Adds a host file to a FLEX disk image")
        .arg(arg!(-d --dimg <PATH> "path to the FLEX disk image").required(true))
        .arg(arg!(-f --file <PATH> "host file to add").required(true))
        .arg(arg!(-n --name <NAME> "FLEX name to store the file under (defaults to the host file's name)").required(false))
        .arg(arg!(-t --text "import in text mode (LF to CR translation)").action(ArgAction::SetTrue))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = build_cli().get_matches();

    let code = run_and_report(|| {
        let dimg_path = matches.get_one::<String>("dimg").unwrap();
        let file_path = matches.get_one::<String>("file").unwrap();
        let text = matches.get_flag("text");

        let bytes = std::fs::read(dimg_path)?;
        let mut disk = FlexDisk::open(bytes)?;

        let contents = std::fs::read(file_path)?;
        let default_name = std::path::Path::new(file_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.clone());
        let name = matches.get_one::<String>("name").cloned().unwrap_or(default_name);
        let mode = if text { TextMode::Text } else { TextMode::Binary };

        disk.add_file(&name, &contents, mode, None)?;
        std::fs::write(dimg_path, disk.to_bytes())?;
        log::info!("added {} to {}", name, dimg_path);
        Ok(())
    });
    ExitCode::from(code as u8)
}
