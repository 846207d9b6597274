//! Builtin commands: `quit`, `jobs`, `fg`, `bg`.

use super::job::{JobId, JobState};
use super::parse::{Builtin, CommandLine};
use super::Worker;
use crate::shell::message::ShellMsg;

use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::fs::OpenOptions;
use std::io;
use std::sync::mpsc::SyncSender;

/// Runs `cmd` if its first token is a builtin. Returns false when the
/// line names an external program instead.
pub fn built_in_cmd(worker: &mut Worker, cmd: &CommandLine, shell_tx: &SyncSender<ShellMsg>) -> bool {
    match cmd.builtin {
        Builtin::None => false,
        Builtin::Quit => run_quit(),
        Builtin::Jobs => run_jobs(worker, cmd, shell_tx),
        Builtin::Fg => run_fg(worker, cmd, shell_tx),
        Builtin::Bg => run_bg(worker, cmd, shell_tx),
    }
}

/// SIGKILL to our own process group. Nothing survives to clean up.
fn run_quit() -> bool {
    let _ = kill(Pid::from_raw(0), Signal::SIGKILL);
    unreachable!("survived SIGKILL to own process group");
}

fn run_jobs(worker: &mut Worker, cmd: &CommandLine, shell_tx: &SyncSender<ShellMsg>) -> bool {
    let listed = match &cmd.outfile {
        Some(path) => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .and_then(|mut file| worker.jobs.list(&mut file)),
        None => worker.jobs.list(&mut io::stdout()),
    };

    worker.exit_val = match listed {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("tinysh: jobs: {e}");
            1
        }
    };
    shell_tx.send(ShellMsg::Continue(worker.exit_val)).unwrap();
    true
}

/// Moves a stopped or background job into the foreground and resumes
/// it. The prompt stays withheld, exactly as for a freshly forked
/// foreground job, until the reaper sees the job finish or stop.
fn run_fg(worker: &mut Worker, cmd: &CommandLine, shell_tx: &SyncSender<ShellMsg>) -> bool {
    let Some(pgid) = resolve_target(worker, cmd, shell_tx) else {
        return true;
    };

    worker.jobs.set_state(pgid, JobState::Foreground);
    if let Err(e) = killpg(pgid, Signal::SIGCONT) {
        // the group is already dead; the pending SIGCHLD will reap it
        // and release the prompt
        eprintln!("tinysh: failed to continue ({pgid}): {e}");
    }
    true
}

/// Resumes a stopped job in the background and reports it, since no
/// one will be waiting on it.
fn run_bg(worker: &mut Worker, cmd: &CommandLine, shell_tx: &SyncSender<ShellMsg>) -> bool {
    let Some(pgid) = resolve_target(worker, cmd, shell_tx) else {
        return true;
    };

    worker.jobs.set_state(pgid, JobState::Background);
    if let Err(e) = killpg(pgid, Signal::SIGCONT) {
        eprintln!("tinysh: failed to continue ({pgid}): {e}");
    }
    let job = worker.jobs.find_by_pgid(pgid).unwrap();
    println!("[{}] ({}) {}", job.jid, job.pgid, job.cmdline);

    worker.exit_val = 0;
    shell_tx.send(ShellMsg::Continue(worker.exit_val)).unwrap();
    true
}

/// Resolves `fg`/`bg`'s target argument (`%jobid` or pid) to a live
/// process group. On failure reports the reason, releases the prompt
/// and returns None; the command is discarded, not the shell.
fn resolve_target(
    worker: &mut Worker,
    cmd: &CommandLine,
    shell_tx: &SyncSender<ShellMsg>,
) -> Option<Pid> {
    let name = &cmd.argv[0];
    let pgid = match cmd.argv.get(1) {
        None => {
            eprintln!("{name} command requires PID or %jobid argument");
            None
        }
        Some(arg) => match arg.strip_prefix('%') {
            Some(jid_str) => match jid_str.parse::<JobId>() {
                Ok(jid) => match worker.jobs.find_by_jid(jid) {
                    Some(job) => Some(job.pgid),
                    None => {
                        eprintln!("%{jid}: No such job");
                        None
                    }
                },
                Err(_) => {
                    eprintln!("{name}: argument must be a PID or %jobid");
                    None
                }
            },
            None => match arg.parse::<i32>() {
                Ok(raw) if raw > 0 => {
                    let pgid = Pid::from_raw(raw);
                    if worker.jobs.find_by_pgid(pgid).is_some() {
                        Some(pgid)
                    } else {
                        eprintln!("({raw}): No such process");
                        None
                    }
                }
                _ => {
                    eprintln!("{name}: argument must be a PID or %jobid");
                    None
                }
            },
        },
    };

    if pgid.is_none() {
        worker.exit_val = 1;
        shell_tx.send(ShellMsg::Continue(worker.exit_val)).unwrap();
    }
    pgid
}
