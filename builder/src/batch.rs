// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{bail, Context, Result};
use host_abstraction_layer::{ExitVerdict, Host, ProcessHandle};
use tracing::error;

/// Waits for one child process and fails unless it exited with status 0. The
/// error message carries the exit code or signal number.
pub fn wait_process(host: &dyn Host, handle: ProcessHandle) -> Result<()> {
    let verdict = host.wait(handle).context("could not wait on child process")?;
    match verdict {
        ExitVerdict::Exited(0) => Ok(()),
        ExitVerdict::Exited(code) => bail!("command exited with exit code {code}"),
        ExitVerdict::Signaled(signal) => bail!("command process was terminated by signal {signal}"),
    }
}

/// An ordered batch of in-flight child processes. The driver launches a whole
/// phase's worth of work, then waits on the batch once: within the phase the
/// children overlap freely, and the phase barrier is the wait.
#[derive(Default)]
pub struct ProcessBatch {
    handles: Vec<ProcessHandle>,
}

impl ProcessBatch {
    pub fn new() -> ProcessBatch {
        ProcessBatch::default()
    }

    pub fn push(&mut self, handle: ProcessHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits on every handle in insertion order and empties the batch
    /// (storage retained). Each failure is logged as it is reaped; a single
    /// failure fails the whole wait, but every handle is still waited on
    /// first, so no child is ever leaked or orphaned by an early abort.
    pub fn wait_all_and_reset(&mut self, host: &dyn Host) -> Result<()> {
        let mut failures = 0usize;
        for handle in self.handles.drain(..) {
            if let Err(err) = wait_process(host, handle) {
                error!("{err:#}");
                failures += 1;
            }
        }
        if failures > 0 {
            bail!("{failures} command(s) in the batch failed");
        }
        Ok(())
    }

    /// Appends `handle`, and if the batch has reached `max_in_flight`
    /// processes, waits on all of them. Bounds process-table pressure when a
    /// phase has a lot of independent launches.
    pub fn push_with_flush(
        &mut self,
        host: &dyn Host,
        handle: ProcessHandle,
        max_in_flight: usize,
    ) -> Result<()> {
        self.push(handle);
        if self.handles.len() >= max_in_flight {
            self.wait_all_and_reset(host)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessBatch;
    use crate::{
        command::CommandLine,
        test_host::{PlannedExit, TestHost},
    };

    #[test]
    fn one_failure_fails_the_batch_but_everything_is_reaped() {
        let host = TestHost::new();
        host.plan_process(PlannedExit::exit(0));
        host.plan_process(PlannedExit::exit(2));

        let mut cmd = CommandLine::new();
        let mut batch = ProcessBatch::new();
        batch.push(cmd.arg("true").run_async(&host).unwrap());
        batch.push(cmd.arg("false").run_async(&host).unwrap());

        assert!(batch.wait_all_and_reset(&host).is_err());
        assert!(batch.is_empty());
        // Both children were waited on; no handles leaked.
        assert_eq!(host.running_count(), 0);
    }

    #[test]
    fn signal_death_is_a_failure() {
        let host = TestHost::new();
        host.plan_process(PlannedExit::signal(9));

        let mut cmd = CommandLine::new();
        let mut batch = ProcessBatch::new();
        batch.push(cmd.arg("sleepy").run_async(&host).unwrap());
        assert!(batch.wait_all_and_reset(&host).is_err());
        assert_eq!(host.running_count(), 0);
    }

    #[test]
    fn push_with_flush_drains_at_the_threshold() {
        let host = TestHost::new();
        let mut cmd = CommandLine::new();
        let mut batch = ProcessBatch::new();

        let mut lengths = Vec::new();
        for _ in 0..3 {
            let handle = cmd.arg("work").run_async(&host).unwrap();
            batch.push_with_flush(&host, handle, 2).unwrap();
            lengths.push(batch.len());
        }
        // The second push hit the threshold and drained the batch.
        assert_eq!(lengths, [1, 0, 1]);
        batch.wait_all_and_reset(&host).unwrap();
        assert_eq!(host.running_count(), 0);
    }
}
