//! tinysh entry point.
//!
//! Usage: `tinysh [-hvp]`. Reads commands from standard input one
//! line at a time; end of input exits cleanly.

use std::env;
use std::io;
use std::os::fd::AsRawFd;
use std::process::exit;

use anyhow::{Context, Result};
use nix::unistd::dup2;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tinysh::shell::Shell;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let mut emit_prompt = true;
    let mut verbose = false;
    for arg in env::args().skip(1) {
        let Some(flags) = arg.strip_prefix('-') else {
            usage();
        };
        for flag in flags.chars() {
            match flag {
                'v' => verbose = true,
                'p' => emit_prompt = false,
                _ => usage(),
            }
        }
    }

    // one output stream, so a testing driver sees everything in order
    dup2(io::stdout().as_raw_fd(), io::stderr().as_raw_fd())
        .context("failed to merge stderr into stdout")?;

    Shell::new(emit_prompt, verbose)
        .run()
        .map_err(|e| anyhow::anyhow!(e))
}

fn usage() -> ! {
    println!("Usage: tinysh [-hvp]");
    println!("   -h   print this message");
    println!("   -v   print additional diagnostic information");
    println!("   -p   do not emit a command prompt");
    exit(1);
}
