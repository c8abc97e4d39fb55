// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The build driver binary. Run from the repository root; it keeps itself up
//! to date against its own sources before doing anything else, then brings
//! the shader cache and the engine binary up to date.

use std::{env, ffi::OsString, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use host_abstraction_layer::Host;
use host_native::NativeHost;
use tracing::error;

use builder::{
    cli,
    command::CommandLine,
    driver::{self, BuildContext, BuildLayout, BuildMode},
    rebuild::{self, Outcome, SelfRebuild},
};

/// Everything the driver binary is built from. Any of these being newer than
/// the binary itself triggers a self-rebuild on startup.
const BOOTSTRAP_SOURCES: &[&str] = &[
    "Cargo.toml",
    "builder/Cargo.toml",
    "builder/src/arena.rs",
    "builder/src/batch.rs",
    "builder/src/cli.rs",
    "builder/src/command.rs",
    "builder/src/driver.rs",
    "builder/src/fsops.rs",
    "builder/src/lib.rs",
    "builder/src/main.rs",
    "builder/src/rebuild.rs",
    "builder/src/test_host.rs",
    "builder/src/text.rs",
    "host-abstraction-layer/Cargo.toml",
    "host-abstraction-layer/src/fs.rs",
    "host-abstraction-layer/src/lib.rs",
    "host-abstraction-layer/src/process.rs",
    "host-native/Cargo.toml",
    "host-native/src/lib.rs",
];

fn main() -> ExitCode {
    let options = cli::options().run();
    tracing_subscriber::fmt()
        .with_max_level(options.verbosity_level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();

    let host = NativeHost::new();
    match run(&host, &options) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(host: &dyn Host, options: &cli::Options) -> Result<ExitCode> {
    let mut args = env::args_os();
    let arg0 = args.next().context("argv[0] is missing")?;
    let tail: Vec<OsString> = args.collect();

    let rebuild = SelfRebuild {
        binary: rebuild::binary_path_from_arg0(&arg0),
        sources: BOOTSTRAP_SOURCES.iter().map(PathBuf::from).collect(),
        compile: self_compile_command(),
        artifact: self_artifact_path(),
    };
    if let Outcome::Ran(code) = rebuild::ensure_fresh(host, rebuild, &tail)? {
        // The rebuilt driver already did the work; mirror its exit code.
        return Ok(u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from));
    }

    let mode = if options.release {
        BuildMode::Release
    } else {
        BuildMode::Debug
    };
    let mut ctx = BuildContext::new(host);
    driver::run_build(&mut ctx, &BuildLayout::default(), mode)?;
    Ok(ExitCode::SUCCESS)
}

/// The compile invocation [`rebuild::ensure_fresh`] rebuilds the driver with.
/// The profile matches the running binary's, so the artifact lands where
/// [`self_artifact_path`] expects it.
fn self_compile_command() -> CommandLine {
    let mut compile = CommandLine::new();
    compile.args(["cargo", "build", "--bin", "builder"]);
    if !cfg!(debug_assertions) {
        compile.arg("--release");
    }
    compile
}

fn self_artifact_path() -> PathBuf {
    let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
    let name = if cfg!(windows) { "builder.exe" } else { "builder" };
    ["target", profile, name].iter().collect()
}
