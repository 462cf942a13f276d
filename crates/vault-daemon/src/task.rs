//! The task rendezvous: a one-shot completion signal shared by exactly one
//! session worker (the waiter) and exactly one file worker (the signaller).

use std::sync::{Arc, Condvar, Mutex};

/// Which filesystem operation a task carries out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// Pre-checks an upload target and reserves nothing itself (quota is
    /// reserved by the session worker after this task completes).
    Upload,
    /// Resolves the size of an existing file.
    Download,
    /// Removes a file and releases its quota.
    Delete,
    /// Produces a directory listing.
    List,
}

/// The immutable request a session worker hands to a file worker.
#[derive(Clone, Debug)]
pub struct TaskRequest {
    /// Which operation to run.
    pub kind: CommandKind,
    /// The authenticated account the operation runs against.
    pub account_id: u64,
    /// The username, used to resolve the per-user storage directory.
    pub username: String,
    /// The target filename for file commands; unused for `LIST`.
    pub filename: Option<String>,
}

/// The result a file worker produces for a task.
#[derive(Clone, Debug)]
pub struct TaskResult {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// The reply text, already framed with its leading keyword (e.g.
    /// `"READY: ..."`, `"ERROR: ..."`, `"SIZE: 11"`), but without a
    /// trailing newline.
    pub message: String,
    /// For a successful `DOWNLOAD`, the exact byte count the session
    /// worker must then stream from disk.
    pub size: Option<u64>,
}

impl TaskResult {
    /// Builds a successful result with no associated byte count.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            size: None,
        }
    }

    /// Builds a successful `DOWNLOAD` result carrying the file's size.
    #[must_use]
    pub fn ok_with_size(message: impl Into<String>, size: u64) -> Self {
        Self {
            ok: true,
            message: message.into(),
            size: Some(size),
        }
    }

    /// Builds a failed result.
    #[must_use]
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            size: None,
        }
    }
}

struct TaskState {
    completed: bool,
    result: Option<TaskResult>,
}

/// A single unit of work submitted by a session worker and answered by
/// exactly one file worker.
///
/// Submission: the session worker builds a `Task`, pushes it onto the task
/// queue, then calls [`Task::wait`], which blocks until the file worker
/// calls [`Task::complete`]. Only the submitting session worker ever waits
/// on a given task, so [`Condvar::notify_one`] is sufficient — no broadcast
/// is needed.
pub struct Task {
    /// The request this task carries.
    pub request: TaskRequest,
    state: Mutex<TaskState>,
    condvar: Condvar,
}

impl Task {
    /// Creates a new, not-yet-completed task wrapping `request`.
    #[must_use]
    pub fn new(request: TaskRequest) -> Arc<Self> {
        Arc::new(Self {
            request,
            state: Mutex::new(TaskState {
                completed: false,
                result: None,
            }),
        })
    }

    /// Records `result` and wakes the waiting session worker. Called
    /// exactly once, by the file worker that popped this task.
    pub fn complete(&self, result: TaskResult) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.result = Some(result);
        state.completed = true;
        self.condvar.notify_one();
    }

    /// Blocks until [`Task::complete`] has been called, then returns the
    /// result.
    ///
    /// # Panics
    ///
    /// Panics if called more than once on the same task, or if no file
    /// worker ever completes it — both indicate a defect elsewhere in the
    /// pipeline, not a condition sessions need to recover from.
    #[must_use]
    pub fn wait(&self) -> TaskResult {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while !state.completed {
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
        state
            .result
            .take()
            .expect("completed task always carries a result")
    }
}
