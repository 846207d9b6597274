//! Protocol between the prompt loop, the signal relay and the worker.

/// Requests into the worker thread.
#[derive(Debug)]
pub enum WorkerMsg {
    /// A signal number delivered by the relay thread.
    Signal(i32),
    /// One raw command line from the prompt.
    Cmd(String),
    /// End of input; the worker acknowledges with [`ShellMsg::Quit`].
    Shutdown,
}

/// Replies to the prompt thread.
#[derive(Debug)]
pub enum ShellMsg {
    /// The submitted line is finished with; the prompt may reappear.
    /// Carries the last exit status the worker observed.
    Continue(i32),
    /// Shut the prompt loop down with the given exit status.
    Quit(i32),
}
