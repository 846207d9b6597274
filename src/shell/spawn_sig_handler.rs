//! The signal relay thread.
//!
//! `signal_hook` confines the OS-level handler to a self-pipe write;
//! this thread turns each delivery into a worker message. SIGQUIT is
//! the one signal acted on here: it is how a supervising process
//! tears the shell down.

use crate::helper::DynError;
use crate::shell::message::WorkerMsg;

use signal_hook::consts::{SIGCHLD, SIGINT, SIGQUIT, SIGTSTP};
use signal_hook::iterator::Signals;
use std::process::exit;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

pub fn spawn_sig_handler(tx: Sender<WorkerMsg>) -> Result<(), DynError> {
    let mut signals = Signals::new([SIGINT, SIGTSTP, SIGCHLD, SIGQUIT])?;
    thread::spawn(move || {
        for sig in signals.forever() {
            if sig == SIGQUIT {
                println!("Terminating after receipt of SIGQUIT signal");
                exit(1);
            }
            debug!(sig, "relaying signal");
            tx.send(WorkerMsg::Signal(sig)).unwrap();
        }
    });
    Ok(())
}
