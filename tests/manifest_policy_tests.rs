#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Manifest policy tests for the Lichess board client.
//!
//! These tests verify that Cargo.toml keeps the panic-free lint set, the
//! default transport feature and the declared demos. If any test fails, the
//! manifest has drifted from the agreed-upon standards.
//!
//! All checks are synchronous filesystem reads; no network access or async
//! runtime needed.

use std::path::PathBuf;

/// Returns the project root directory (where Cargo.toml lives).
fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Reads a file relative to the project root and returns its contents.
fn read_project_file(relative_path: &str) -> String {
    let path = project_root().join(relative_path);
    std::fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!(
            "Failed to read '{}': {}. This file is required by project policy.",
            path.display(),
            e
        )
    })
}

fn manifest() -> toml::Table {
    read_project_file("Cargo.toml")
        .parse::<toml::Table>()
        .expect("Cargo.toml must be valid TOML")
}

// ─────────────────────────────────────────────────────────────────────────────
// Module: lints
// ─────────────────────────────────────────────────────────────────────────────

mod lints {
    use super::*;

    const PANIC_FREE_LINTS: &[&str] = &[
        "unwrap_used",
        "expect_used",
        "panic",
        "todo",
        "unimplemented",
        "indexing_slicing",
    ];

    #[test]
    fn cargo_toml_has_all_panic_free_lints() {
        let manifest = manifest();
        let clippy = manifest["lints"]["clippy"]
            .as_table()
            .expect("Cargo.toml must have a [lints.clippy] section");

        for lint in PANIC_FREE_LINTS {
            assert_eq!(
                clippy.get(*lint).and_then(toml::Value::as_str),
                Some("deny"),
                "Cargo.toml must set `{lint} = \"deny\"` in [lints.clippy]. \
                 Library code propagates errors instead of panicking."
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Module: features
// ─────────────────────────────────────────────────────────────────────────────

mod features {
    use super::*;

    #[test]
    fn http_transport_is_a_default_feature() {
        let manifest = manifest();
        let default = manifest["features"]["default"].as_array().unwrap();
        assert!(
            default.iter().any(|f| f.as_str() == Some("transport-reqwest")),
            "The reqwest transport must stay enabled by default."
        );
    }

    #[test]
    fn reqwest_is_optional() {
        let manifest = manifest();
        let reqwest = manifest["dependencies"]["reqwest"].as_table().unwrap();
        assert_eq!(reqwest["optional"].as_bool(), Some(true));
        assert_eq!(
            manifest["features"]["transport-reqwest"].as_array().unwrap()[0].as_str(),
            Some("dep:reqwest")
        );
    }

    #[test]
    fn msrv_is_declared() {
        let manifest = manifest();
        let version = manifest["package"]["rust-version"]
            .as_str()
            .expect("Cargo.toml must declare a rust-version");
        assert!(
            version.split('.').count() == 3,
            "rust-version must be a full semver triple, got '{version}'"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Module: demos
// ─────────────────────────────────────────────────────────────────────────────

mod demos {
    use super::*;

    #[test]
    fn every_declared_demo_exists() {
        let manifest = manifest();
        let examples = manifest["example"].as_array().unwrap();
        assert!(!examples.is_empty());

        for example in examples {
            let path = example["path"].as_str().unwrap();
            assert!(
                project_root().join(path).is_file(),
                "Demo '{path}' is declared in Cargo.toml but missing on disk."
            );
        }
    }
}
