// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The kind of a file-system entry, as reported without following symbolic
/// links. Drives the recursive-copy dispatch: directories recurse, regular
/// files are copied, symlinks are skipped, anything else fails the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    /// Sockets, FIFOs, device nodes and whatever else the host may invent.
    Other,
}

/// An opaque file modification time. Freshness decisions only ever ask "is
/// this later than that", so the absolute value is deliberately inaccessible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Mtime(SystemTime);

impl Mtime {
    pub fn new(time: SystemTime) -> Mtime {
        Mtime(time)
    }

    /// Fabricates a modification time from whole seconds since the Unix
    /// epoch. Intended for host implementations that make up their own
    /// timestamps (the in-memory test host); real hosts wrap what the file
    /// system reports.
    pub fn from_unix_seconds(seconds: u64) -> Mtime {
        Mtime(UNIX_EPOCH + Duration::from_secs(seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::Mtime;

    #[test]
    fn mtime_orders_by_time() {
        let earlier = Mtime::from_unix_seconds(100);
        let later = Mtime::from_unix_seconds(101);
        assert!(earlier < later);
        assert_eq!(earlier, Mtime::from_unix_seconds(100));
    }
}
