//! Error types for the RunLoop module.

use std::thread::ThreadId;

use thiserror::Error;

/// Errors that can occur in the RunLoop.
#[derive(Debug, Error)]
pub enum RunLoopError {
    /// `run` was called from a thread that does not own the loop.
    #[error("RunLoop {name} is owned by thread {owner:?}, not {caller:?}")]
    NotOwnerThread {
        name: String,
        owner: ThreadId,
        caller: ThreadId,
    },

    /// The entity is already registered with a different RunLoop.
    #[error("{kind} {id} is already scheduled on another RunLoop")]
    AlreadyScheduled { kind: &'static str, id: String },
}

/// Result type for RunLoop operations.
pub type RunLoopResult<T> = Result<T, RunLoopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_scheduled_display() {
        let err = RunLoopError::AlreadyScheduled {
            kind: "timer",
            id: "heartbeat".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("timer"));
        assert!(display.contains("heartbeat"));
    }

    #[test]
    fn test_not_owner_display() {
        let owner = std::thread::current().id();
        let caller = std::thread::spawn(|| std::thread::current().id())
            .join()
            .unwrap();
        let err = RunLoopError::NotOwnerThread {
            name: "main".to_string(),
            owner,
            caller,
        };
        assert!(err.to_string().contains("main"));
    }
}
