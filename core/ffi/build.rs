//! Build script generating the C header with cbindgen.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");
    println!("cargo:rerun-if-changed=cbindgen.toml");

    let Ok(crate_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:warning=CARGO_MANIFEST_DIR is not set, skipping header");
        return;
    };
    let crate_dir = PathBuf::from(crate_dir);
    let output_file = target_dir(&crate_dir).join("include").join("virgil_native.h");

    if let Some(parent) = output_file.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let config = cbindgen::Config::from_file(crate_dir.join("cbindgen.toml")).unwrap_or_default();

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(&output_file);
        }
        Err(e) => {
            println!("cargo:warning=Unable to generate C bindings: {}", e);
        }
    }
}

/// Workspace target directory, honouring CARGO_TARGET_DIR.
fn target_dir(crate_dir: &std::path::Path) -> PathBuf {
    match env::var("CARGO_TARGET_DIR") {
        Ok(target) => PathBuf::from(target),
        Err(_) => crate_dir
            .ancestors()
            .nth(2)
            .unwrap_or(crate_dir)
            .join("target"),
    }
}
