//! Exercises the front-end binaries end to end, the way
//! `a2kit/tests/cli_test_mkdsk.rs` drives `a2kit mkdsk` through
//! `assert_cmd`.

use assert_cmd::Command;
use predicates::prelude::*;

type StdResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn create_add_list_and_extract_round_trip() -> StdResult {
    let dir = tempfile::tempdir()?;
    let dimg = dir.path().join("test.flex");
    let host_file = dir.path().join("hello.bin");
    std::fs::write(&host_file, (0u8..10).collect::<Vec<u8>>())?;

    Command::cargo_bin("flexdsk")?
        .args(["-o"])
        .arg(&dimg)
        .args(["-t", "35", "-s", "18", "-l", "TESTVOL", "-v", "1"])
        .assert()
        .success();

    Command::cargo_bin("flexadd")?
        .arg("-d")
        .arg(&dimg)
        .arg("-f")
        .arg(&host_file)
        .assert()
        .success();

    Command::cargo_bin("flexdir")?
        .arg("-d")
        .arg(&dimg)
        .assert()
        .success()
        .stdout(predicate::str::contains("HELLO.BIN"));

    let extract_out = dir.path().join("extracted.bin");
    Command::cargo_bin("flextract")?
        .arg("-d")
        .arg(&dimg)
        .arg("-n")
        .arg("HELLO.BIN")
        .arg("-o")
        .arg(&extract_out)
        .assert()
        .success();

    let extracted = std::fs::read(&extract_out)?;
    assert_eq!(extracted, (0u8..10).collect::<Vec<u8>>());
    Ok(())
}

#[test]
fn extract_missing_file_fails_with_not_found() -> StdResult {
    let dir = tempfile::tempdir()?;
    let dimg = dir.path().join("empty.flex");

    Command::cargo_bin("flexdsk")?
        .arg("-o")
        .arg(&dimg)
        .assert()
        .success();

    Command::cargo_bin("flextract")?
        .arg("-d")
        .arg(&dimg)
        .arg("-n")
        .arg("NOPE.BIN")
        .assert()
        .failure();
    Ok(())
}

#[test]
fn sort_reorders_directory_on_disk() -> StdResult {
    let dir = tempfile::tempdir()?;
    let dimg = dir.path().join("sorted.flex");
    Command::cargo_bin("flexdsk")?.arg("-o").arg(&dimg).assert().success();

    for name in ["zulu.txt", "alpha.txt"] {
        let host_file = dir.path().join(name);
        std::fs::write(&host_file, b"hi")?;
        Command::cargo_bin("flexadd")?
            .arg("-d")
            .arg(&dimg)
            .arg("-f")
            .arg(&host_file)
            .arg("-t")
            .assert()
            .success();
    }

    Command::cargo_bin("flexsort")?.arg("-d").arg(&dimg).assert().success();

    let out = Command::cargo_bin("flexdir")?.arg("-d").arg(&dimg).output()?;
    let stdout = String::from_utf8(out.stdout)?;
    let alpha_pos = stdout.find("ALPHA.TXT").expect("alpha listed");
    let zulu_pos = stdout.find("ZULU.TXT").expect("zulu listed");
    assert!(alpha_pos < zulu_pos);
    Ok(())
}

#[test]
fn dump_reports_a_sector_by_track_and_sector() -> StdResult {
    let dir = tempfile::tempdir()?;
    let dimg = dir.path().join("dump.flex");
    Command::cargo_bin("flexdsk")?.arg("-o").arg(&dimg).assert().success();

    Command::cargo_bin("flexdump")?
        .arg("-d")
        .arg(&dimg)
        .arg("-t")
        .arg("0")
        .arg("-s")
        .arg("3")
        .assert()
        .success()
        .stdout(predicate::str::contains("track 0 sector 3"));
    Ok(())
}
