//! Draining child status changes.
//!
//! Runs on the worker thread whenever the relay reports SIGCHLD. One
//! SIGCHLD may stand for any number of state changes, so the loop
//! polls until the kernel has nothing left to say.

use super::job::JobState;
use super::Worker;
use crate::helper::syscall;
use crate::shell::message::ShellMsg;

use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::process::exit;
use std::sync::mpsc::SyncSender;
use tracing::debug;

pub fn wait_child(worker: &mut Worker, shell_tx: &SyncSender<ShellMsg>) {
    let flag = Some(WaitPidFlag::WUNTRACED | WaitPidFlag::WNOHANG | WaitPidFlag::WCONTINUED);

    loop {
        match syscall(|| waitpid(Pid::from_raw(-1), flag)) {
            Ok(WaitStatus::Exited(pid, status)) => {
                worker.exit_val = status;
                reap(worker, pid, None, shell_tx);
            }
            Ok(WaitStatus::Signaled(pid, sig, _core)) => {
                worker.exit_val = 128 + sig as i32;
                reap(worker, pid, Some(sig), shell_tx);
            }
            Ok(WaitStatus::Stopped(pid, sig)) => mark_stopped(worker, pid, sig, shell_tx),
            Ok(WaitStatus::Continued(pid)) => mark_continued(worker, pid),
            Ok(WaitStatus::StillAlive) => return,
            Err(nix::Error::ECHILD) => return,
            Err(e) => {
                // our view of the process table has diverged from the kernel's
                eprintln!("tinysh: failed to wait on children: {e}");
                exit(1);
            }
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Ok(WaitStatus::PtraceEvent(pid, sig, _)) => mark_stopped(worker, pid, sig, shell_tx),
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Ok(WaitStatus::PtraceSyscall(pid)) => {
                mark_stopped(worker, pid, Signal::SIGTRAP, shell_tx)
            }
        }
    }
}

/// A child is gone. Jobs are single-process groups, so the child pid
/// is the group id; anything the table does not know was left
/// untracked on purpose and is ignored.
fn reap(worker: &mut Worker, pid: Pid, fatal_signal: Option<Signal>, shell_tx: &SyncSender<ShellMsg>) {
    let Some(job) = worker.jobs.find_by_pgid(pid) else {
        return;
    };
    let (jid, state) = (job.jid, job.state);
    if let Some(sig) = fatal_signal {
        println!("Job [{jid}] ({pid}) terminated by signal {}", sig as i32);
    }
    worker.jobs.remove(pid);
    debug!(%pid, jid, "reaped child");
    if state == JobState::Foreground {
        release_prompt(worker, shell_tx);
    }
}

fn mark_stopped(worker: &mut Worker, pid: Pid, sig: Signal, shell_tx: &SyncSender<ShellMsg>) {
    let Some(job) = worker.jobs.find_by_pgid(pid) else {
        return;
    };
    let (jid, state) = (job.jid, job.state);
    if state == JobState::Foreground {
        println!("Job [{jid}] ({pid}) stopped by signal {}", sig as i32);
    }
    worker.jobs.set_state(pid, JobState::Stopped);
    if state == JobState::Foreground {
        release_prompt(worker, shell_tx);
    }
}

fn mark_continued(worker: &mut Worker, pid: Pid) {
    if worker
        .jobs
        .find_by_pgid(pid)
        .is_some_and(|j| j.state == JobState::Stopped)
    {
        worker.jobs.set_state(pid, JobState::Background);
    }
}

/// The foreground job is done or halted; let the prompt reappear.
fn release_prompt(worker: &Worker, shell_tx: &SyncSender<ShellMsg>) {
    shell_tx.send(ShellMsg::Continue(worker.exit_val)).unwrap();
}
