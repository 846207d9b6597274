//! tinysh: a tiny job-control shell.
//!
//! The shell launches child processes in their own process groups,
//! tracks their foreground/background/stopped status in a bounded job
//! table, and relays terminal-generated signals (SIGINT, SIGTSTP) to
//! the foreground group. Three threads cooperate: the prompt loop, a
//! signal relay, and a worker that owns the job table and all process
//! control.

pub mod helper;
pub mod shell;
