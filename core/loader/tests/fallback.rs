//! Load fallback behavior with a recording opener.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use virgilcrypto_common::{Error, LibraryName, Result};
use virgilcrypto_loader::{
    DirectoryResources, EmbeddedResources, LibraryHandle, LibraryOpener, LoadOrigin,
    LoaderConfig, NativeLoader, TempCleanup,
};

/// Opener that never touches the OS loader.
#[derive(Clone, Default)]
struct RecordingOpener {
    on_search_path: bool,
    reject_files: bool,
    opened: Arc<Mutex<Vec<(PathBuf, Vec<u8>)>>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl LibraryOpener for RecordingOpener {
    fn open_by_name(&self, name: &LibraryName) -> Result<LibraryHandle> {
        self.lookups.lock().unwrap().push(name.to_string());
        if self.on_search_path {
            Ok(LibraryHandle::unbacked(name.as_str()))
        } else {
            Err(Error::DirectLoad {
                name: name.to_string(),
                reason: "not on search path".to_string(),
            })
        }
    }

    fn open_path(&self, path: &Path) -> Result<LibraryHandle> {
        let data = std::fs::read(path)?;
        self.opened.lock().unwrap().push((path.to_path_buf(), data));
        if self.reject_files {
            return Err(Error::Load {
                path: path.display().to_string(),
                reason: "bad image".to_string(),
            });
        }
        Ok(LibraryHandle::unbacked(path.display().to_string()))
    }
}

fn config_for(os_name: &str, arch: &str, extract_dir: &Path) -> LoaderConfig {
    LoaderConfig {
        os_name: Some(os_name.to_string()),
        arch: Some(arch.to_string()),
        extract_dir: Some(extract_dir.to_path_buf()),
        ..LoaderConfig::default()
    }
}

#[test]
fn test_search_path_hit_skips_resources() {
    let temp = tempfile::tempdir().unwrap();
    let opener = RecordingOpener {
        on_search_path: true,
        ..Default::default()
    };

    let outcome = NativeLoader::new(config_for("Linux", "amd64", temp.path()))
        .with_opener(opener.clone())
        .ensure_loaded();

    let library = outcome.library().unwrap();
    assert_eq!(library.origin(), &LoadOrigin::SearchPath);
    assert_eq!(library.name().as_str(), "virgil_crypto_java");
    assert!(opener.opened.lock().unwrap().is_empty());
}

#[test]
fn test_mac_resource_missing_names_path() {
    let temp = tempfile::tempdir().unwrap();
    let outcome = NativeLoader::new(config_for("Mac OS X", "x86_64", temp.path()))
        .with_opener(RecordingOpener::default())
        .ensure_loaded();

    let failure = outcome.failure().unwrap();
    match failure.reason() {
        Error::ResourceNotFound(path) => assert_eq!(path, "mac os/virgil_crypto_java"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(failure.direct_error().unwrap().is_recoverable());
}

#[test]
fn test_windows_extraction_from_directory() {
    let resources = tempfile::tempdir().unwrap();
    let extract = tempfile::tempdir().unwrap();
    let binary: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();

    let dir = resources.path().join("windows").join("amd64");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("virgil_crypto_java"), &binary).unwrap();

    let opener = RecordingOpener::default();
    let mut config = config_for("Windows 10", "AMD64", extract.path());
    config.resource_dir = Some(resources.path().to_path_buf());

    let outcome = NativeLoader::new(config)
        .with_opener(opener.clone())
        .ensure_loaded();

    let library = outcome.library().unwrap();
    match library.origin() {
        LoadOrigin::Extracted {
            resource_path,
            temp_path,
        } => {
            assert_eq!(resource_path.to_string_path(), "windows/amd64/virgil_crypto_java");
            let file_name = temp_path.file_name().unwrap().to_string_lossy().to_string();
            assert!(file_name.starts_with("virgil_crypto_java"));
            assert!(file_name.ends_with(".dll"));
            assert!(temp_path.is_absolute());
        }
        other => panic!("unexpected origin: {other:?}"),
    }

    let opened = opener.opened.lock().unwrap();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].1, binary);
}

#[test]
fn test_delete_after_load_removes_temp_file() {
    let extract = tempfile::tempdir().unwrap();
    let resources = EmbeddedResources::new().with("linux/virgil_crypto_java", &b"so bytes"[..]);

    let outcome = NativeLoader::new(config_for("Linux", "amd64", extract.path()))
        .with_resources(resources)
        .with_opener(RecordingOpener::default())
        .ensure_loaded();

    assert!(outcome.is_loaded());
    assert_eq!(std::fs::read_dir(extract.path()).unwrap().count(), 0);
}

#[test]
fn test_keep_leaves_temp_file() {
    let extract = tempfile::tempdir().unwrap();
    let resources = EmbeddedResources::new().with("linux/virgil_crypto_java", &b"so bytes"[..]);
    let mut config = config_for("Linux", "amd64", extract.path());
    config.temp_cleanup = TempCleanup::Keep;

    let outcome = NativeLoader::new(config)
        .with_resources(resources)
        .with_opener(RecordingOpener::default())
        .ensure_loaded();

    let temp_path = match outcome.library().unwrap().origin() {
        LoadOrigin::Extracted { temp_path, .. } => temp_path.clone(),
        other => panic!("unexpected origin: {other:?}"),
    };
    drop(outcome);
    assert_eq!(std::fs::read(temp_path).unwrap(), b"so bytes");
}

#[test]
fn test_load_failure_removes_temp_file() {
    let extract = tempfile::tempdir().unwrap();
    let resources = EmbeddedResources::new().with("mac os/virgil_crypto_java", &b"dylib"[..]);
    let opener = RecordingOpener {
        reject_files: true,
        ..Default::default()
    };

    let outcome = NativeLoader::new(config_for("Mac OS X", "aarch64", extract.path()))
        .with_resources(resources)
        .with_opener(opener.clone())
        .ensure_loaded();

    assert!(matches!(outcome.failure().unwrap().reason(), Error::Load { .. }));
    assert_eq!(opener.opened.lock().unwrap().len(), 1);
    assert_eq!(std::fs::read_dir(extract.path()).unwrap().count(), 0);
}

#[test]
fn test_unknown_platform_fails_loudly() {
    let resources = tempfile::tempdir().unwrap();
    let extract = tempfile::tempdir().unwrap();
    // A file at the root must not satisfy a lookup with an empty directory.
    std::fs::write(resources.path().join("virgil_crypto_java"), b"x").unwrap();

    let mut config = config_for("SunOS", "sparc", extract.path());
    config.resource_dir = Some(resources.path().to_path_buf());

    let outcome = NativeLoader::new(config)
        .with_opener(RecordingOpener::default())
        .ensure_loaded();

    match outcome.failure().unwrap().reason() {
        Error::ResourceNotFound(path) => assert_eq!(path, "/virgil_crypto_java"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_skip_search_path() {
    let extract = tempfile::tempdir().unwrap();
    let opener = RecordingOpener {
        on_search_path: true,
        ..Default::default()
    };
    let mut config = config_for("Linux", "amd64", extract.path());
    config.skip_search_path = true;

    let outcome = NativeLoader::new(config)
        .with_resources(EmbeddedResources::new().with("linux/virgil_crypto_java", vec![1u8, 2, 3]))
        .with_opener(opener.clone())
        .ensure_loaded();

    assert!(opener.lookups.lock().unwrap().is_empty());
    assert!(matches!(
        outcome.library().unwrap().origin(),
        LoadOrigin::Extracted { .. }
    ));
    assert!(outcome.failure().is_none());
}

#[test]
fn test_each_attempt_reclassifies() {
    let extract = tempfile::tempdir().unwrap();
    let loader = NativeLoader::new(config_for("Linux", "amd64", extract.path()))
        .with_resources(DirectoryResources::new(extract.path().join("missing")))
        .with_opener(RecordingOpener::default());

    let first = loader.ensure_loaded();
    let second = loader.ensure_loaded();
    assert!(!first.is_loaded());
    assert!(!second.is_loaded());
    assert_eq!(
        second.into_result().unwrap_err().to_string(),
        "Resource 'linux/virgil_crypto_java' not found"
    );
}

#[test]
fn test_real_opener_falls_back_to_resources() {
    let extract = tempfile::tempdir().unwrap();
    let mut config = config_for("Linux", "amd64", extract.path());
    config.library_name = LibraryName::new("virgil_crypto_missing_for_tests").unwrap();

    let outcome = NativeLoader::new(config).ensure_loaded();

    let failure = outcome.failure().unwrap();
    assert!(matches!(failure.direct_error(), Some(Error::DirectLoad { .. })));
    assert!(matches!(failure.reason(), Error::ResourceNotFound(_)));
}
