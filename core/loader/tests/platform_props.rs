//! Property tests for platform classification and extraction.

use std::io::Cursor;

use proptest::prelude::*;
use virgilcrypto_loader::{extract_to_temp, ExtractOptions, HostInfo, OsFamily};

fn random_case(s: &str, mask: &[bool]) -> String {
    s.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    #[test]
    fn prop_classification_ignores_case(
        family in prop::sample::select(vec![OsFamily::Linux, OsFamily::Windows, OsFamily::MacOs]),
        mask in prop::collection::vec(any::<bool>(), 1..8),
        tail in "[ a-zA-Z0-9._-]{0,12}",
    ) {
        let os_name = format!("{}{}", random_case(family.as_str(), &mask), tail);
        prop_assert_eq!(OsFamily::classify(&os_name), family);
    }

    #[test]
    fn prop_classification_matches_priority(os_name in ".{0,24}") {
        let lowered = os_name.to_lowercase();
        let expected = if lowered.starts_with("linux") {
            OsFamily::Linux
        } else if lowered.starts_with("windows") {
            OsFamily::Windows
        } else if lowered.starts_with("mac os") {
            OsFamily::MacOs
        } else {
            OsFamily::Unknown
        };
        prop_assert_eq!(OsFamily::classify(&os_name), expected);
    }

    #[test]
    fn prop_windows_directory_folds_arch(
        version in "[ 0-9A-Za-z]{0,10}",
        arch in "[A-Za-z0-9_]{1,10}",
    ) {
        let host = HostInfo::new(format!("Windows{}", version), &arch);
        prop_assert_eq!(host.resource_directory(), format!("windows/{}", arch.to_lowercase()));
    }

    #[test]
    fn prop_unix_directory_ignores_arch(arch in "[A-Za-z0-9_]{1,10}") {
        prop_assert_eq!(HostInfo::new("Linux", &arch).resource_directory(), "linux");
        prop_assert_eq!(HostInfo::new("Mac OS X", &arch).resource_directory(), "mac os");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_extraction_is_byte_identical(
        data in prop::collection::vec(any::<u8>(), 0..20_000),
        chunk_size in 1usize..4096,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let options = ExtractOptions::new("prop", ".so")
            .with_chunk_size(chunk_size)
            .in_dir(dir.path());
        let extracted = extract_to_temp(Cursor::new(data.clone()), &options).unwrap();
        prop_assert_eq!(std::fs::read(extracted.path()).unwrap(), data);
    }
}
