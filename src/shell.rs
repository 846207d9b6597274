//! The interactive shell: prompt loop plus the threads behind it.

pub mod message;
mod spawn_sig_handler;
pub mod worker;

use message::{ShellMsg, WorkerMsg};
use spawn_sig_handler::spawn_sig_handler;
use worker::Worker;

use crate::helper::DynError;

use nix::sys::signal::{signal, SigHandler, Signal};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::path::PathBuf;
use std::process::exit;
use std::sync::mpsc::{channel, sync_channel};
use tracing::debug;

#[derive(Debug)]
pub struct Shell {
    emit_prompt: bool,
    verbose: bool,
    history: Option<PathBuf>,
}

impl Shell {
    pub fn new(emit_prompt: bool, verbose: bool) -> Self {
        Shell {
            emit_prompt,
            verbose,
            history: dirs::home_dir().map(|home| home.join(".tinysh_history")),
        }
    }

    /// Runs the read-eval loop on the calling thread until end of
    /// input or `quit`.
    ///
    /// Each submitted line is handed to the worker, and the loop then
    /// blocks on the reply channel. For a foreground job that reply
    /// only arrives once the signal relay has driven the job to
    /// completion or a stop, so signal delivery is the sole source of
    /// progress while a foreground job runs.
    pub fn run(&self) -> Result<(), DynError> {
        // the shell writes to the terminal from a non-foreground
        // group and must not be stopped for it
        unsafe {
            signal(Signal::SIGTTIN, SigHandler::SigIgn)?;
            signal(Signal::SIGTTOU, SigHandler::SigIgn)?;
        }

        let mut rl = Editor::<(), DefaultHistory>::new()?;
        if let Some(path) = &self.history {
            // absent on first run
            let _ = rl.load_history(path);
        }

        let (worker_tx, worker_rx) = channel();
        let (shell_tx, shell_rx) = sync_channel(0);
        spawn_sig_handler(worker_tx.clone())?;
        Worker::new(self.verbose).spawn(worker_rx, shell_tx);

        let prompt = if self.emit_prompt { "tinysh> " } else { "" };
        let exit_val;
        loop {
            match rl.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = rl.add_history_entry(line.trim());
                    }
                    worker_tx.send(WorkerMsg::Cmd(line)).unwrap();
                    match shell_rx.recv().unwrap() {
                        ShellMsg::Continue(status) => debug!(status, "prompt released"),
                        ShellMsg::Quit(status) => {
                            exit_val = status;
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    // drain the worker before leaving so a final
                    // status report is not lost
                    worker_tx.send(WorkerMsg::Shutdown).unwrap();
                    match shell_rx.recv().unwrap() {
                        ShellMsg::Quit(status) => {
                            exit_val = status;
                            break;
                        }
                        ShellMsg::Continue(_) => unreachable!("shutdown answered with Continue"),
                    }
                }
                Err(e) => {
                    eprintln!("tinysh: failed to read input: {e}");
                    exit_val = 1;
                    break;
                }
            }
        }

        if let Some(path) = &self.history {
            if let Err(e) = rl.save_history(path) {
                eprintln!("tinysh: failed to write the history file: {e}");
            }
        }
        exit(exit_val);
    }
}
