// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::ffi::OsString;

use anyhow::{ensure, Context, Result};
use host_abstraction_layer::{Host, ProcessHandle, Redirects};
use tracing::info;

use crate::batch::wait_process;

/// An argv-style command for one external tool invocation: element 0 is the
/// executable, resolved via the host's search rules.
///
/// A command is a transient, single-use value: built by successive appends,
/// consumed by exactly one `run_*` call, which resets the argument count to
/// zero while keeping the backing storage for the next invocation.
#[derive(Default)]
pub struct CommandLine {
    args: Vec<OsString>,
}

impl CommandLine {
    pub fn new() -> CommandLine {
        CommandLine::default()
    }

    /// Appends one argument.
    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut CommandLine {
        self.args.push(arg.into());
        self
    }

    /// Appends every argument in `args`.
    pub fn args<I, S>(&mut self, args: I) -> &mut CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        for arg in args {
            self.args.push(arg.into());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Drops the arguments but keeps the backing storage. The `run_*` methods
    /// do this themselves; this is only needed to abandon a half-built
    /// command.
    pub fn reset(&mut self) {
        self.args.clear();
    }

    /// Renders the command the way it is logged: arguments separated by
    /// spaces, arguments containing spaces wrapped in single quotes.
    pub fn render(&self) -> String {
        let mut render = String::new();
        for (i, arg) in self.args.iter().enumerate() {
            let arg = arg.to_string_lossy();
            if i > 0 {
                render.push(' ');
            }
            if arg.contains(' ') {
                render.push('\'');
                render.push_str(&arg);
                render.push('\'');
            } else {
                render.push_str(&arg);
            }
        }
        render
    }

    /// Launches the command without waiting for it and resets the arguments.
    pub fn run_async(&mut self, host: &dyn Host) -> Result<ProcessHandle> {
        self.run_async_redirect(host, Redirects::none())
    }

    /// Like [`CommandLine::run_async`], with the child's standard streams
    /// substituted by the handles present in `redirects`. The handles are
    /// closed as part of the launch.
    pub fn run_async_redirect(
        &mut self,
        host: &dyn Host,
        redirects: Redirects,
    ) -> Result<ProcessHandle> {
        ensure!(!self.args.is_empty(), "could not run empty command");
        info!("CMD: {}", self.render());
        let program = self.args[0].to_string_lossy().into_owned();
        let spawned = host.spawn(&self.args, redirects);
        self.args.clear();
        spawned.with_context(|| format!("could not start `{program}`"))
    }

    /// Launches the command, waits for it, and fails unless it exited with
    /// status 0. Resets the arguments.
    pub fn run_sync(&mut self, host: &dyn Host) -> Result<()> {
        let handle = self.run_async(host)?;
        wait_process(host, handle)
    }

    /// [`CommandLine::run_sync`] with stream redirection.
    pub fn run_sync_redirect(&mut self, host: &dyn Host, redirects: Redirects) -> Result<()> {
        let handle = self.run_async_redirect(host, redirects)?;
        wait_process(host, handle)
    }
}

#[cfg(test)]
mod tests {
    use host_abstraction_layer::Host;

    use super::CommandLine;
    use crate::test_host::{PlannedExit, TestHost};

    #[test]
    fn render_quotes_arguments_with_spaces() {
        let mut cmd = CommandLine::new();
        cmd.arg("cc").args(["-o", "out/my binary", "main.c"]);
        assert_eq!(cmd.render(), "cc -o 'out/my binary' main.c");
    }

    #[test]
    fn running_resets_the_arguments() {
        let host = TestHost::new();
        let mut cmd = CommandLine::new();
        cmd.arg("slangc").arg("a.slang");
        let handle = cmd.run_async(&host).unwrap();
        assert!(cmd.is_empty());
        host.wait(handle).unwrap();

        // The same value is reusable for the next invocation.
        cmd.arg("gcc");
        assert_eq!(cmd.len(), 1);
        assert_eq!(host.spawned_commands(), ["slangc a.slang"]);
    }

    #[test]
    fn empty_commands_are_refused() {
        let host = TestHost::new();
        assert!(CommandLine::new().run_async(&host).is_err());
        assert_eq!(host.spawned_commands().len(), 0);
    }

    #[test]
    fn run_sync_fails_on_nonzero_exit() {
        let host = TestHost::new();
        host.plan_process(PlannedExit::exit(1));
        let mut cmd = CommandLine::new();
        assert!(cmd.arg("false").run_sync(&host).is_err());
        assert_eq!(host.running_count(), 0);

        host.plan_process(PlannedExit::exit(0));
        cmd.arg("true").run_sync(&host).unwrap();
    }
}
