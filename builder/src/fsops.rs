// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! File-system composites written once against [`Host`]: idempotent
//! directory creation, the freshness predicate, recursive copying, and
//! logged whole-file helpers.

use std::{io, path::Path};

use anyhow::{bail, Context, Result};
use host_abstraction_layer::{FileKind, Host};
use tracing::{debug, info, warn};

use crate::arena::ScratchArena;

/// The outcome of a [`needs_rebuild`] check on an artifact that could be
/// determined at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The output exists and is at least as new as every input.
    UpToDate,
    /// The output is missing, or some input is strictly newer.
    Stale,
}

/// Creates the directory at `path` if it is not already there. Success both
/// when created and when already present.
pub fn mkdir_if_not_exists(host: &dyn Host, path: &Path) -> Result<()> {
    match host.create_dir(path) {
        Ok(()) => {
            info!("created directory `{}`", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            debug!("directory `{}` already exists", path.display());
            Ok(())
        }
        Err(err) => {
            Err(err).with_context(|| format!("could not create directory `{}`", path.display()))
        }
    }
}

/// The central freshness predicate: pure in file-system metadata, never in
/// content. A missing output is always stale; a missing *input* is always an
/// error, never a silent "rebuild" — an input absent at check time cannot
/// have produced a valid prior build, so the build graph itself is broken.
pub fn needs_rebuild(host: &dyn Host, output: &Path, inputs: &[&Path]) -> Result<Freshness> {
    let output_mtime = match host.mtime(output) {
        Ok(mtime) => mtime,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Freshness::Stale),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("could not stat build output `{}`", output.display()))
        }
    };

    for input in inputs {
        let input_mtime = host
            .mtime(input)
            .with_context(|| format!("could not stat build input `{}`", input.display()))?;
        // A single input fresher than the output already decides it.
        if input_mtime > output_mtime {
            return Ok(Freshness::Stale);
        }
    }

    Ok(Freshness::UpToDate)
}

/// [`needs_rebuild`] for the common one-input case.
pub fn needs_rebuild1(host: &dyn Host, output: &Path, input: &Path) -> Result<Freshness> {
    needs_rebuild(host, output, &[input])
}

/// Copies the tree at `src` to `dst` depth-first: directories are created
/// and recursed into, regular files copied, symbolic links skipped with a
/// warning (copying them is explicitly unsupported), and any other kind of
/// file fails the whole copy.
///
/// Child paths live in `arena`; the caller picks the rewind point, typically
/// right after the copy returns.
pub fn copy_directory_recursively(
    host: &dyn Host,
    arena: &ScratchArena,
    src: &Path,
    dst: &Path,
) -> Result<()> {
    let kind = host
        .file_kind(src)
        .with_context(|| format!("could not determine type of `{}`", src.display()))?;

    match kind {
        FileKind::Directory => {
            mkdir_if_not_exists(host, dst)?;
            let children = host
                .read_dir(src)
                .with_context(|| format!("could not enumerate directory `{}`", src.display()))?;
            for child in children {
                let child_src = arena.format(format_args!("{}/{}", src.display(), child));
                let child_dst = arena.format(format_args!("{}/{}", dst.display(), child));
                copy_directory_recursively(host, arena, Path::new(child_src), Path::new(child_dst))?;
            }
        }
        FileKind::Regular => {
            info!("copying {} -> {}", src.display(), dst.display());
            host.copy_file(src, dst).with_context(|| {
                format!("could not copy `{}` to `{}`", src.display(), dst.display())
            })?;
        }
        FileKind::Symlink => {
            warn!("skipping symlink `{}`: copying symlinks is not supported", src.display());
        }
        FileKind::Other => {
            bail!("unsupported type of file `{}`", src.display());
        }
    }

    Ok(())
}

/// Reads the whole file at `path`, appending to `into`.
pub fn read_entire_file(host: &dyn Host, path: &Path, into: &mut Vec<u8>) -> Result<()> {
    host.read_file(path, into)
        .with_context(|| format!("could not read file `{}`", path.display()))
}

/// Creates or replaces the file at `path` with `data`.
pub fn write_entire_file(host: &dyn Host, path: &Path, data: &[u8]) -> Result<()> {
    host.write_file(path, data)
        .with_context(|| format!("could not write file `{}`", path.display()))
}

/// Moves `from` to `to`, replacing `to` if present.
pub fn rename(host: &dyn Host, from: &Path, to: &Path) -> Result<()> {
    info!("renaming {} -> {}", from.display(), to.display());
    host.rename(from, to).with_context(|| {
        format!("could not rename `{}` to `{}`", from.display(), to.display())
    })
}

/// Deletes the file at `path`.
pub fn delete_file(host: &dyn Host, path: &Path) -> Result<()> {
    info!("deleting {}", path.display());
    host.delete_file(path)
        .with_context(|| format!("could not delete file `{}`", path.display()))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use host_abstraction_layer::Host;

    use super::{
        copy_directory_recursively, mkdir_if_not_exists, needs_rebuild, needs_rebuild1,
        read_entire_file, write_entire_file, Freshness,
    };
    use crate::{arena::ScratchArena, test_host::TestHost};

    #[test]
    fn missing_output_is_stale() {
        let host = TestHost::new();
        host.add_file("in.slang", 100);
        let freshness = needs_rebuild1(&host, Path::new("out.spv"), Path::new("in.slang"));
        assert_eq!(freshness.unwrap(), Freshness::Stale);
    }

    #[test]
    fn output_at_least_as_new_as_every_input_is_up_to_date() {
        let host = TestHost::new();
        host.add_file("a.c", 100);
        host.add_file("b.c", 200);
        host.add_file("prog", 200);
        let freshness = needs_rebuild(&host, Path::new("prog"), &[Path::new("a.c"), Path::new("b.c")]);
        assert_eq!(freshness.unwrap(), Freshness::UpToDate);
    }

    #[test]
    fn any_newer_input_is_stale() {
        let host = TestHost::new();
        host.add_file("a.c", 100);
        host.add_file("b.c", 300);
        host.add_file("prog", 200);
        let freshness = needs_rebuild(&host, Path::new("prog"), &[Path::new("a.c"), Path::new("b.c")]);
        assert_eq!(freshness.unwrap(), Freshness::Stale);
    }

    #[test]
    fn missing_input_is_an_error_even_with_a_present_output() {
        let host = TestHost::new();
        host.add_file("prog", 200);
        assert!(needs_rebuild1(&host, Path::new("prog"), Path::new("gone.c")).is_err());
    }

    #[test]
    fn mkdir_is_idempotent() {
        let host = TestHost::new();
        mkdir_if_not_exists(&host, Path::new("out")).unwrap();
        mkdir_if_not_exists(&host, Path::new("out")).unwrap();
        assert!(host.file_exists(Path::new("out")).unwrap());
    }

    #[test]
    fn copy_round_trips_files_and_skips_symlinks() {
        let host = TestHost::new();
        host.add_dir("a");
        host.add_file_with_data("a/f1", 100, b"hello");
        host.add_dir("a/sub");
        host.add_file_with_data("a/sub/f2", 100, b"world");
        host.add_symlink("a/link");

        let mut arena = ScratchArena::with_capacity(64 * 1024);
        let checkpoint = arena.save();
        copy_directory_recursively(&host, &arena, Path::new("a"), Path::new("b")).unwrap();
        arena.rewind(checkpoint);

        assert_eq!(host.file_data(Path::new("b/f1")).unwrap(), b"hello");
        assert_eq!(host.file_data(Path::new("b/sub/f2")).unwrap(), b"world");
        assert!(!host.file_exists(Path::new("b/link")).unwrap());
    }

    #[test]
    fn read_appends_to_the_buffer() {
        let host = TestHost::new();
        host.add_file_with_data("notes.txt", 100, b"world");

        let mut buf = b"hello ".to_vec();
        read_entire_file(&host, Path::new("notes.txt"), &mut buf).unwrap();
        assert_eq!(buf, b"hello world");
        assert!(read_entire_file(&host, Path::new("gone.txt"), &mut buf).is_err());
    }

    #[test]
    fn write_replaces_previous_contents() {
        let host = TestHost::new();
        write_entire_file(&host, Path::new("cfg.txt"), b"first version, longer").unwrap();
        write_entire_file(&host, Path::new("cfg.txt"), b"second").unwrap();
        assert_eq!(host.file_data(Path::new("cfg.txt")).unwrap(), b"second");
    }

    #[test]
    fn copy_fails_on_unsupported_file_kinds() {
        let host = TestHost::new();
        host.add_dir("a");
        host.add_other("a/device");

        let arena = ScratchArena::with_capacity(64 * 1024);
        let result = copy_directory_recursively(&host, &arena, Path::new("a"), Path::new("b"));
        assert!(result.is_err());
    }
}
