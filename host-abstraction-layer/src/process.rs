// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs::File;

#[allow(unused_imports)] // used in docs
use crate::Host;

/// Host-specific handle to a spawned child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle(u64);

impl ProcessHandle {
    /// Creates a new [`ProcessHandle`]. Should only be created in the host
    /// implementation, which also knows how the inner value is going to be
    /// used.
    pub fn new(id: u64) -> ProcessHandle {
        ProcessHandle(id)
    }

    pub fn inner(self) -> u64 {
        self.0
    }
}

/// How a child process ended. [`Host::wait`] produces exactly one of these
/// per spawned process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitVerdict {
    /// The process exited on its own with the given status code.
    Exited(i32),
    /// The process was terminated by the given signal. Hosts that have no
    /// notion of signals never produce this.
    Signaled(i32),
}

impl ExitVerdict {
    /// The only successful way out of a child process: a voluntary exit with
    /// status 0. Nonzero exits and signal deaths are both failures.
    pub fn success(self) -> bool {
        matches!(self, ExitVerdict::Exited(0))
    }
}

/// Optional substitutions for a child's standard streams. Each present handle
/// is moved into [`Host::spawn`] and closed as soon as the child is launched,
/// so a `Redirects` value cannot outlive the one launch it was built for;
/// absent entries leave the child inheriting the parent's stream.
#[derive(Default)]
pub struct Redirects {
    pub stdin: Option<File>,
    pub stdout: Option<File>,
    pub stderr: Option<File>,
}

impl Redirects {
    /// No redirections: the child inherits all three parent streams.
    pub fn none() -> Redirects {
        Redirects::default()
    }
}
