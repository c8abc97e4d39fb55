// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The self-rebuild bootstrapper: the driver compares its own binary against
//! its declared sources on every start, and if any source is newer it
//! recompiles itself, swaps the fresh binary into place, re-runs it with the
//! original arguments, and exits. The driver therefore never runs stale.

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use host_abstraction_layer::{ExitVerdict, Host};
use tracing::{error, info, warn};

use crate::{
    command::CommandLine,
    fsops::{self, Freshness},
};

/// How the driver rebuilds itself.
pub struct SelfRebuild {
    /// The running binary, resolved from argv[0].
    pub binary: PathBuf,
    /// The source files the binary is built from; any of them being newer
    /// than `binary` triggers the rebuild.
    pub sources: Vec<PathBuf>,
    /// The compiler invocation that produces `artifact` from `sources`.
    pub compile: CommandLine,
    /// Where `compile` leaves the fresh binary. Renamed over `binary` when
    /// the two differ (a cargo-built driver cannot compile to an arbitrary
    /// path).
    pub artifact: PathBuf,
}

/// What [`ensure_fresh`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The binary is up to date; proceed with normal operation.
    Fresh,
    /// The binary was stale: it was rebuilt and re-run with the original
    /// arguments, and this is the replacement's exit code. The caller must
    /// terminate with it without doing any further work.
    Ran(i32),
}

/// Applies the host's executable-suffix rules to the path the process was
/// invoked as: on Windows a missing `.exe` is appended, elsewhere argv[0] is
/// taken as is.
pub fn binary_path_from_arg0(arg0: &OsStr) -> PathBuf {
    let path = PathBuf::from(arg0);
    if cfg!(windows) && path.extension().map_or(true, |ext| ext != "exe") {
        let mut with_suffix = path.into_os_string();
        with_suffix.push(".exe");
        return PathBuf::from(with_suffix);
    }
    path
}

/// Runs the bootstrap state machine, strictly before any other work. `args`
/// is the original argument tail (everything after argv[0]), re-applied
/// verbatim when the rebuilt binary is re-run.
///
/// A failed recompile renames the previous binary back into place before
/// failing: the expected path never ends up holding a broken or missing
/// binary after a failed self-update.
pub fn ensure_fresh(host: &dyn Host, mut rebuild: SelfRebuild, args: &[OsString]) -> Result<Outcome> {
    let inputs: Vec<&Path> = rebuild.sources.iter().map(PathBuf::as_path).collect();
    let freshness = fsops::needs_rebuild(host, &rebuild.binary, &inputs)
        .context("could not determine whether the build driver itself is stale")?;
    match freshness {
        Freshness::UpToDate => return Ok(Outcome::Fresh),
        Freshness::Stale => {}
    }
    info!("build driver is stale, rebuilding itself");

    let old_binary = {
        let mut path = rebuild.binary.clone().into_os_string();
        path.push(".old");
        PathBuf::from(path)
    };

    fsops::rename(host, &rebuild.binary, &old_binary)?;

    if let Err(err) = rebuild.compile.run_sync(host) {
        if let Err(restore_err) = fsops::rename(host, &old_binary, &rebuild.binary) {
            error!("could not restore the previous binary: {restore_err:#}");
        }
        return Err(err.context("rebuilding the build driver failed"));
    }

    if rebuild.artifact != rebuild.binary {
        if let Err(err) = fsops::rename(host, &rebuild.artifact, &rebuild.binary) {
            if let Err(restore_err) = fsops::rename(host, &old_binary, &rebuild.binary) {
                error!("could not restore the previous binary: {restore_err:#}");
            }
            return Err(err.context("could not move the fresh binary into place"));
        }
    }

    // Windows refuses to delete a binary that is mapped into a running
    // process, so the stale copy is left behind there.
    if !cfg!(windows) {
        if let Err(err) = fsops::delete_file(host, &old_binary) {
            warn!("could not clean up the stale binary: {err:#}");
        }
    }

    let mut rerun = CommandLine::new();
    rerun.arg(&rebuild.binary).args(args.iter().cloned());
    let handle = rerun.run_async(host)?;
    let verdict = host
        .wait(handle)
        .context("could not wait on the rebuilt driver")?;
    match verdict {
        ExitVerdict::Exited(code) => Ok(Outcome::Ran(code)),
        ExitVerdict::Signaled(signal) => {
            error!("rebuilt driver was terminated by signal {signal}");
            Ok(Outcome::Ran(1))
        }
    }
}
