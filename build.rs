// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

extern crate env_logger;
extern crate log;

/// Directory holding the engine library.
const ENV_LIB_DIR: &str = "AWG_ENGINE_LIB_DIR";

/// Name of the engine library, without `lib` prefix nor extension.
const ENV_LIB_NAME: &str = "AWG_ENGINE_LIB_NAME";

/// Library name used when [`ENV_LIB_NAME`] is unset.
const DEFAULT_LIB_NAME: &str = "wg-go";

/// Reports an error to cargo, then fails the build.
fn report_error(e: impl std::fmt::Display) -> ! {
    println!("cargo:warning=ERROR: {e}");
    panic!("an error occured");
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed={ENV_LIB_DIR}");
    println!("cargo:rerun-if-env-changed={ENV_LIB_NAME}");

    if std::env::var_os("CARGO_FEATURE_LIBWG").is_none() {
        log::info!("feature `libwg` disabled, not linking the engine");
        return;
    }

    let Some(dir) = std::env::var_os(ENV_LIB_DIR) else {
        report_error(format!("feature `libwg` requires ${ENV_LIB_DIR}"));
    };
    let dir = std::path::PathBuf::from(dir);
    if !dir.is_dir() {
        report_error(format!("{}: not a directory", dir.display()));
    }
    let name = std::env::var(ENV_LIB_NAME).unwrap_or_else(|_| DEFAULT_LIB_NAME.into());

    log::info!("linking against {name} from {}", dir.display());
    println!("cargo:rustc-link-search={}", dir.display());
    println!("cargo:rustc-link-lib={name}");
}
