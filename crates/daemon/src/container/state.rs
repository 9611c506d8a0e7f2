//! Container runtime state
//!
//! [`State`] carries the mutable half of a container record: the run flags,
//! the process id, the last exit status, and the start/finish timestamps.
//! Transitions go through [`State::set_running`] and [`State::set_stopped`]
//! so the flag combinations stay consistent.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Exit status reported when a container's process terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExitStatus {
    /// Process exit code.
    pub exit_code: i64,
    /// Whether the kernel OOM killer ended the process.
    pub oom_killed: bool,
}

/// Current run state of a container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct State {
    /// The container process is alive.
    pub running: bool,
    /// The process is alive but frozen.
    pub paused: bool,
    /// The daemon is restarting the process.
    pub restarting: bool,
    /// The last stop was caused by the OOM killer.
    pub oom_killed: bool,
    /// The container is beyond recovery and awaits removal.
    pub dead: bool,
    /// Pid of the container process while running, zero otherwise.
    pub pid: u32,
    /// Exit code of the last terminated process.
    pub exit_code: i64,
    /// Last error encountered while starting the container.
    pub error_msg: String,
    /// When the process last started.
    pub started_at: Option<SystemTime>,
    /// When the process last terminated.
    pub finished_at: Option<SystemTime>,
}

impl State {
    /// Mark the container as running under `pid`.
    pub fn set_running(&mut self, pid: u32) {
        self.running = true;
        self.paused = false;
        self.restarting = false;
        self.exit_code = 0;
        self.error_msg.clear();
        self.pid = pid;
        self.started_at = Some(SystemTime::now());
    }

    /// Mark the container as stopped with the given exit status.
    pub fn set_stopped(&mut self, exit: &ExitStatus) {
        self.running = false;
        self.paused = false;
        self.restarting = false;
        self.pid = 0;
        self.exit_code = exit.exit_code;
        self.oom_killed = exit.oom_killed;
        self.finished_at = Some(SystemTime::now());
    }

    /// Whether the container process is alive.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Single-word state description, matching the daemon's status filter
    /// vocabulary.
    pub fn state_string(&self) -> &'static str {
        if self.running {
            if self.paused {
                return "paused";
            }
            if self.restarting {
                return "restarting";
            }
            return "running";
        }
        if self.dead {
            return "dead";
        }
        if self.started_at.is_none() {
            return "created";
        }
        "exited"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_created() {
        let state = State::default();
        assert!(!state.is_running());
        assert_eq!(state.state_string(), "created");
    }

    #[test]
    fn test_set_running() {
        let mut state = State::default();
        state.set_running(42);
        assert!(state.is_running());
        assert_eq!(state.pid, 42);
        assert_eq!(state.exit_code, 0);
        assert!(state.started_at.is_some());
        assert_eq!(state.state_string(), "running");
    }

    #[test]
    fn test_set_stopped_records_exit() {
        let mut state = State::default();
        state.set_running(42);
        state.set_stopped(&ExitStatus {
            exit_code: 137,
            oom_killed: true,
        });
        assert!(!state.is_running());
        assert_eq!(state.pid, 0);
        assert_eq!(state.exit_code, 137);
        assert!(state.oom_killed);
        assert!(state.finished_at.is_some());
        assert_eq!(state.state_string(), "exited");
    }

    #[test]
    fn test_state_string_precedence() {
        let mut state = State::default();
        state.set_running(1);
        state.paused = true;
        assert_eq!(state.state_string(), "paused");
        state.paused = false;
        state.restarting = true;
        assert_eq!(state.state_string(), "restarting");

        let mut dead = State::default();
        dead.dead = true;
        assert_eq!(dead.state_string(), "dead");
    }
}
