//! The exec record
//!
//! An [`ExecConfig`] describes one exec session inside a container. The
//! daemon keeps both running and finished execs so they can be inspected
//! during and after completion. Exec rows elect out of optimistic version
//! checks; the record reports version zero regardless of update count.

use serde::{Deserialize, Serialize};

/// Configuration and state of one exec session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Stable identifier, unique across the exec table.
    pub id: String,
    /// Container this exec runs in.
    pub container_id: String,
    /// Whether the exec process is alive.
    pub running: bool,
    /// Exit code once the process terminated.
    pub exit_code: Option<i64>,
    /// Binary to invoke.
    pub entrypoint: String,
    /// Arguments passed to the entrypoint.
    pub args: Vec<String>,
    /// Environment of the exec process.
    pub env: Vec<String>,
    /// User the process runs as.
    pub user: String,
    /// Whether a TTY is allocated.
    pub tty: bool,
    /// Whether the process runs privileged.
    pub privileged: bool,
    /// Whether stdin is attached.
    pub open_stdin: bool,
    /// Whether stdout is attached.
    pub open_stdout: bool,
    /// Whether stderr is attached.
    pub open_stderr: bool,
    /// Whether the finished exec may be garbage-collected.
    pub can_remove: bool,
    /// Key sequence detaching an attached session.
    pub detach_keys: Vec<u8>,
}

impl ExecConfig {
    /// Create an exec record bound to a container.
    pub fn new(id: impl Into<String>, container_id: impl Into<String>) -> Self {
        ExecConfig {
            id: id.into(),
            container_id: container_id.into(),
            ..ExecConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_binds_container() {
        let exec = ExecConfig::new("e1", "c1");
        assert_eq!(exec.id, "e1");
        assert_eq!(exec.container_id, "c1");
        assert!(!exec.running);
        assert!(exec.exit_code.is_none());
    }

    #[test]
    fn test_clone_is_a_deep_copy() {
        let mut original = ExecConfig::new("e1", "c1");
        original.args = vec!["-c".to_string(), "true".to_string()];
        let mut copy = original.clone();
        copy.args.push("extra".to_string());
        assert_eq!(original.args.len(), 2);
        assert_eq!(copy.args.len(), 3);
    }
}
