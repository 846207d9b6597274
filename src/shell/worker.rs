//! The worker thread: sole owner of the job table and of all process
//! control. Commands from the prompt and notifications from the
//! signal relay arrive on one channel and are applied strictly in
//! order, which is what keeps the table consistent without a lock.

mod built_in_cmd;
pub mod job;
pub mod parse;
mod spawn_child;
mod wait_child;

use built_in_cmd::built_in_cmd;
use job::JobTable;
use parse::{parse_line, CommandLine};
use spawn_child::spawn_child;
use wait_child::wait_child;

use crate::shell::message::{ShellMsg, WorkerMsg};

use nix::sys::signal::{killpg, Signal};
use signal_hook::consts::{SIGCHLD, SIGINT, SIGTSTP};
use std::sync::mpsc::{Receiver, SyncSender};
use std::thread;
use tracing::debug;

#[derive(Debug)]
pub struct Worker {
    exit_val: i32,
    jobs: JobTable,
}

impl Worker {
    pub fn new(verbose: bool) -> Self {
        Worker {
            exit_val: 0,
            jobs: JobTable::new(verbose),
        }
    }

    pub fn spawn(mut self, worker_rx: Receiver<WorkerMsg>, shell_tx: SyncSender<ShellMsg>) {
        thread::spawn(move || {
            for msg in worker_rx.iter() {
                self.process_msg(msg, &shell_tx);
            }
        });
    }

    fn process_msg(&mut self, msg: WorkerMsg, shell_tx: &SyncSender<ShellMsg>) {
        match msg {
            WorkerMsg::Cmd(line) => self.process_line(&line, shell_tx),
            WorkerMsg::Signal(SIGCHLD) => wait_child(self, shell_tx),
            WorkerMsg::Signal(SIGINT) => self.forward_to_foreground(Signal::SIGINT),
            WorkerMsg::Signal(SIGTSTP) => self.forward_to_foreground(Signal::SIGTSTP),
            WorkerMsg::Signal(_) => unreachable!(),
            WorkerMsg::Shutdown => shell_tx.send(ShellMsg::Quit(0)).unwrap(),
        }
    }

    fn process_line(&mut self, line: &str, shell_tx: &SyncSender<ShellMsg>) {
        match parse_line(line) {
            Ok(Some(cmd)) => self.run_cmd(line, &cmd, shell_tx),
            Ok(None) => shell_tx.send(ShellMsg::Continue(self.exit_val)).unwrap(),
            Err(e) => {
                eprintln!("tinysh: {e}");
                self.exit_val = 1;
                shell_tx.send(ShellMsg::Continue(self.exit_val)).unwrap();
            }
        }
    }

    fn run_cmd(&mut self, line: &str, cmd: &CommandLine, shell_tx: &SyncSender<ShellMsg>) {
        if built_in_cmd(self, cmd, shell_tx) {
            return;
        }
        spawn_child(self, line, cmd, shell_tx);
    }

    /// Relays a keyboard signal to the entire foreground process
    /// group, never to the shell itself. Table cleanup happens later,
    /// through the SIGCHLD path, once the group actually reacts.
    fn forward_to_foreground(&self, sig: Signal) {
        let Some(pgid) = self.jobs.foreground_pgid() else {
            return;
        };
        debug!(%pgid, ?sig, "forwarding keyboard signal");
        if let Err(e) = killpg(pgid, sig) {
            eprintln!("tinysh: failed to signal ({pgid}): {e}");
        }
    }
}
