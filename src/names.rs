//! ## Host ⇄ FLEX filename conversion
//!
//! §6: split on the last `.`, uppercase and NUL-pad each half into FLEX's
//! 8-byte base / 3-byte extension fields. Grounded on the teacher's small
//! `file_name_to_string`/`string_to_file_name` helper pairs in
//! `fs::dos3x::mod.rs`, adapted to FLEX's base+extension split rather than
//! DOS 3.x's flat 30-byte name.

/// Splits a host filename into FLEX's `(base[8], ext[3])` fields: the
/// portion before the last `.` becomes the base, the portion after becomes
/// the extension (empty if there is no `.`), each uppercased, truncated,
/// and NUL-padded.
pub fn host_name_to_flex(host_name: &str) -> ([u8; 8], [u8; 3]) {
    let (base, ext) = match host_name.rsplit_once('.') {
        Some((b, e)) => (b, e),
        None => (host_name, ""),
    };
    (pad_upper::<8>(base), pad_upper::<3>(ext))
}

fn pad_upper<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [0u8; N];
    for (i, b) in s.to_ascii_uppercase().as_bytes().iter().take(N).enumerate() {
        out[i] = *b;
    }
    out
}

/// Renders a FLEX `(base, ext)` pair back into a `BASE.EXT` display string,
/// trimming NUL and space padding. The extension is omitted (no dot) when
/// empty.
pub fn flex_name_to_display(base: &[u8], ext: &[u8]) -> String {
    let base = String::from_utf8_lossy(base).trim_end_matches(['\0', ' ']).to_string();
    let ext = String::from_utf8_lossy(ext).trim_end_matches(['\0', ' ']).to_string();
    if ext.is_empty() {
        base
    } else {
        format!("{}.{}", base, ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_base_and_extension() {
        let (base, ext) = host_name_to_flex("hello.bin");
        assert_eq!(&base, b"HELLO\0\0\0");
        assert_eq!(&ext, b"BIN");
    }

    #[test]
    fn absent_dot_yields_empty_extension() {
        let (base, ext) = host_name_to_flex("readme");
        assert_eq!(&base, b"README\0\0");
        assert_eq!(&ext, b"\0\0\0");
    }

    #[test]
    fn truncates_long_components() {
        let (base, ext) = host_name_to_flex("verylongname.longext");
        assert_eq!(&base, b"VERYLONG");
        assert_eq!(&ext, b"LON");
    }

    #[test]
    fn display_round_trips_from_stored_fields() {
        let (base, ext) = host_name_to_flex("hello.bin");
        assert_eq!(flex_name_to_display(&base, &ext), "HELLO.BIN");
        let (base2, ext2) = host_name_to_flex("readme");
        assert_eq!(flex_name_to_display(&base2, &ext2), "README");
    }
}
