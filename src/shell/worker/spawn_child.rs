//! Launching external commands.
//!
//! The child is placed in its own process group before exec so that
//! keyboard signals forwarded by the relay reach the whole job and
//! never the shell. The fork-and-register window runs under a scoped
//! signal mask; the child clears the inherited mask and restores
//! default dispositions before replacing its image.

use super::job::JobState;
use super::parse::CommandLine;
use super::Worker;
use crate::helper::{syscall, DynError};
use crate::shell::message::ShellMsg;

use nix::libc;
use nix::sys::signal::{signal, SigHandler, SigSet, SigmaskHow, Signal};
use nix::unistd::{self, dup2, execvp, fork, setpgid, ForkResult, Pid};
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::process::exit;
use std::sync::mpsc::SyncSender;
use tracing::debug;

/// Scoped block of the three job-control signals on the calling
/// thread. Dropping it restores the previous mask on every exit path.
struct SignalMask {
    prev: SigSet,
}

impl SignalMask {
    fn block() -> nix::Result<Self> {
        let mut set = SigSet::empty();
        set.add(Signal::SIGCHLD);
        set.add(Signal::SIGINT);
        set.add(Signal::SIGTSTP);
        let prev = set.thread_swap_mask(SigmaskHow::SIG_BLOCK)?;
        Ok(SignalMask { prev })
    }
}

impl Drop for SignalMask {
    fn drop(&mut self) {
        let _ = self.prev.thread_set_mask();
    }
}

pub fn spawn_child(
    worker: &mut Worker,
    line: &str,
    cmd: &CommandLine,
    shell_tx: &SyncSender<ShellMsg>,
) {
    let mask = match SignalMask::block() {
        Ok(mask) => mask,
        Err(e) => {
            eprintln!("tinysh: failed to block signals: {e}");
            exit(1);
        }
    };

    let child = match fork_exec(cmd) {
        Ok(child) => child,
        Err(e) => {
            // a shell that cannot fork is of no further use
            eprintln!("tinysh: failed to start a process: {e}");
            exit(1);
        }
    };

    let state = if cmd.background {
        JobState::Background
    } else {
        JobState::Foreground
    };

    match worker.jobs.add(child, state, line) {
        Ok(jid) => {
            drop(mask);
            debug!(%child, jid, background = cmd.background, "registered job");
            if cmd.background {
                println!("[{jid}] ({child}) {line}");
                shell_tx.send(ShellMsg::Continue(worker.exit_val)).unwrap();
            }
            // foreground: the prompt stays withheld until the reaper
            // sees this job finish or stop
        }
        Err(e) => {
            drop(mask);
            eprintln!("tinysh: {e}; process ({child}) left untracked");
            shell_tx.send(ShellMsg::Continue(worker.exit_val)).unwrap();
        }
    }
}

fn fork_exec(cmd: &CommandLine) -> Result<Pid, DynError> {
    let filename = CString::new(cmd.argv[0].as_str())?;
    let args: Vec<CString> = cmd
        .argv
        .iter()
        .map(|s| CString::new(s.as_str()))
        .collect::<Result<_, _>>()?;

    match syscall(|| unsafe { fork() })? {
        ForkResult::Parent { child, .. } => {
            // both sides set the group so the forwarding path is valid
            // no matter which of them the scheduler runs first
            let _ = setpgid(child, child);
            Ok(child)
        }
        ForkResult::Child => {
            let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));

            for sig in [Signal::SIGINT, Signal::SIGTSTP, Signal::SIGCHLD, Signal::SIGQUIT] {
                unsafe {
                    let _ = signal(sig, SigHandler::SigDfl);
                }
            }

            if let Err(e) = wire_redirections(cmd) {
                let msg = format!("tinysh: {e}\n");
                let _ = unistd::write(io::stderr().as_raw_fd(), msg.as_bytes());
                exit(1);
            }

            let _ = SigSet::empty().thread_set_mask();

            // the relay's self-pipe descriptors must not leak into the job
            for fd in 3..=6 {
                let _ = unistd::close(fd);
            }

            match execvp(&filename, &args) {
                Err(_) => {
                    let msg = format!("{}: command not found\n", cmd.argv[0]);
                    let _ = unistd::write(io::stderr().as_raw_fd(), msg.as_bytes());
                    exit(1);
                }
                Ok(_) => unreachable!(),
            }
        }
    }
}

/// Swaps stdin/stdout for the redirection targets before exec. The
/// descriptors are private to this child; the shell's own table is
/// untouched.
fn wire_redirections(cmd: &CommandLine) -> Result<(), DynError> {
    if let Some(path) = &cmd.infile {
        let file = File::open(path)?;
        syscall(|| dup2(file.as_raw_fd(), libc::STDIN_FILENO))?;
    }
    if let Some(path) = &cmd.outfile {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        syscall(|| dup2(file.as_raw_fd(), libc::STDOUT_FILENO))?;
    }
    Ok(())
}
