// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    ffi::OsString,
    fs::{self, File},
    io::{self, Read, Write},
    path::Path,
    process::{Child, Command, Stdio},
};

use host_abstraction_layer::{ExitVerdict, FileKind, Host, Mtime, ProcessHandle, Redirects};

/// Size of the streaming buffer used by [`Host::copy_file`]. Files are never
/// loaded whole.
const COPY_CHUNK_SIZE: usize = 32 * 1024;

/// The production [`Host`], backed by `std::fs` and `std::process`. `std`
/// already carries both operating-system back ends; the handful of places
/// where Unix and Windows genuinely diverge (signal reporting on wait) are
/// `cfg` points inside this crate.
///
/// Spawned children are kept in an internal table keyed by their
/// [`ProcessHandle`], so the trait methods can stay `&self` like every other
/// host operation. The driver is single-threaded; the table is never touched
/// concurrently.
#[derive(Default)]
pub struct NativeHost {
    children: RefCell<HashMap<u64, Child>>,
    next_handle: Cell<u64>,
}

impl NativeHost {
    pub fn new() -> NativeHost {
        NativeHost::default()
    }
}

impl Host for NativeHost {
    fn file_exists(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn file_kind(&self, path: &Path) -> io::Result<FileKind> {
        let file_type = fs::symlink_metadata(path)?.file_type();
        Ok(if file_type.is_file() {
            FileKind::Regular
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Other
        })
    }

    fn mtime(&self, path: &Path) -> io::Result<Mtime> {
        fs::metadata(path)?.modified().map(Mtime::new)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let name = entry?.file_name();
            let name = name.into_string().map_err(|name| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("directory entry {name:?} is not valid Unicode"),
                )
            })?;
            names.push(name);
        }
        Ok(names)
    }

    fn read_file(&self, path: &Path, into: &mut Vec<u8>) -> io::Result<()> {
        File::open(path)?.read_to_end(into)?;
        Ok(())
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        // fs::write creates/truncates and retries short writes internally.
        fs::write(path, data)
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let mut src_file = File::open(src)?;
        let permissions = src_file.metadata()?.permissions();
        let mut dst_file = File::create(dst)?;
        let mut buf = vec![0u8; COPY_CHUNK_SIZE];
        loop {
            let n = match src_file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            dst_file.write_all(&buf[..n])?;
        }
        dst_file.set_permissions(permissions)?;
        Ok(())
    }

    fn env_var(&self, name: &str) -> Option<OsString> {
        std::env::var_os(name)
    }

    fn spawn(&self, argv: &[OsString], redirects: Redirects) -> io::Result<ProcessHandle> {
        let Some((program, args)) = argv.split_first() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot spawn an empty command",
            ));
        };

        let mut command = Command::new(program);
        command.args(args);
        if let Some(stdin) = redirects.stdin {
            command.stdin(Stdio::from(stdin));
        }
        if let Some(stdout) = redirects.stdout {
            command.stdout(Stdio::from(stdout));
        }
        if let Some(stderr) = redirects.stderr {
            command.stderr(Stdio::from(stderr));
        }

        // The redirect handles were moved into `command`, which goes out of
        // scope right after the spawn: parent-side copies are closed here no
        // matter how the launch went.
        let child = command.spawn()?;

        let id = self.next_handle.get();
        self.next_handle.set(id + 1);
        self.children.borrow_mut().insert(id, child);
        Ok(ProcessHandle::new(id))
    }

    fn wait(&self, handle: ProcessHandle) -> io::Result<ExitVerdict> {
        let child = self.children.borrow_mut().remove(&handle.inner());
        let Some(mut child) = child else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unknown or already-completed process handle",
            ));
        };

        let status = child.wait()?;
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Ok(ExitVerdict::Signaled(signal));
            }
        }
        // With signal death handled above, every remaining status carries an
        // exit code on the platforms we run on.
        Ok(ExitVerdict::Exited(status.code().unwrap_or(-1)))
    }
}
