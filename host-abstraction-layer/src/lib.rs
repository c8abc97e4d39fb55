// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

mod fs;
mod process;

use std::{ffi::OsString, io, path::Path};

pub use fs::{FileKind, Mtime};
pub use process::{ExitVerdict, ProcessHandle, Redirects};

/// "Host abstraction layer": a trait for the operating-system facilities the
/// build driver needs (file metadata, directory traversal, whole-file I/O,
/// child-process lifecycles) without depending on any of them directly. The
/// build logic is written once against `&dyn Host`; concrete implementations
/// back it with the real OS or with an in-memory stand-in for tests.
///
/// All the functions take a `&self` parameter, so that implementations can
/// keep (possibly internally mutable) state, while the host object stays as
/// widely usable as possible. None of these functions are hot, and this trait
/// is object safe, so using `&dyn Host` is fine performance-wise and keeps
/// the driver free of generics.
///
/// Fallible operations return [`io::Result`] rather than a richer error type
/// on purpose: callers need the underlying [`io::ErrorKind`] to tell a normal
/// "not found" apart from a real I/O error. The facade itself never logs;
/// diagnostics are the caller's concern.
pub trait Host {
    /// Returns whether a file-system entry exists at `path`. `Ok(false)` is
    /// the normal "not found" outcome; `Err` means the existence could not be
    /// determined at all.
    fn file_exists(&self, path: &Path) -> io::Result<bool>;

    /// Returns the kind of the entry at `path`, without following symbolic
    /// links (otherwise [`FileKind::Symlink`] could never be observed).
    fn file_kind(&self, path: &Path) -> io::Result<FileKind>;

    /// Returns the modification time of the entry at `path`. Only ordering
    /// comparisons between two [`Mtime`]s are meaningful.
    fn mtime(&self, path: &Path) -> io::Result<Mtime>;

    /// Creates the directory at `path`. Fails with
    /// [`io::ErrorKind::AlreadyExists`] if there is already an entry there;
    /// idempotent creation is a composite built on top of this.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Moves the entry at `from` to `to`, replacing any existing entry at
    /// `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Deletes the file at `path`. Directories are not deleted through this.
    fn delete_file(&self, path: &Path) -> io::Result<()>;

    /// Returns the names (not paths) of the entries in the directory at
    /// `path`, in no particular order. The `.`/`..` pseudo-entries are never
    /// reported. Names that are not valid Unicode are an error.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Reads the entire file at `path`, appending its bytes to `into`.
    fn read_file(&self, path: &Path, into: &mut Vec<u8>) -> io::Result<()>;

    /// Creates or truncates the file at `path` and writes `data` into it,
    /// failing on any short write.
    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Copies the regular file at `src` to `dst` byte-exactly, streaming in
    /// fixed-size chunks rather than loading whole files, and preserving the
    /// source permissions where the host supports it.
    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Returns the value of the environment variable `name`, if set.
    fn env_var(&self, name: &str) -> Option<OsString>;

    /// Spawns a child process executing `argv` (element 0 is the executable,
    /// resolved via the host's process-launch search rules) and returns
    /// without waiting for it. Redirect handles present in `redirects` are
    /// attached to the child's standard streams and closed immediately after
    /// the launch; absent entries inherit the parent's streams.
    fn spawn(&self, argv: &[OsString], redirects: Redirects) -> io::Result<ProcessHandle>;

    /// Blocks until the process behind `handle` terminates and returns its
    /// verdict. There is no timeout. The handle is invalid afterwards; waiting
    /// on it again is an error.
    fn wait(&self, handle: ProcessHandle) -> io::Result<ExitVerdict>;
}
