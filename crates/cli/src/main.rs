//! # CLI - interactive shell over the LSM write path
//!
//! Reads commands from stdin, runs them against an [`LsmStorageState`], and
//! prints results to stdout. Works interactively or with commands piped in.
//!
//! ## Commands
//!
//! ```text
//! SET key value      Insert or update a key-value pair
//! GET key            Look up a key (prints value, "(nil)" or "(deleted)")
//! DEL key            Delete a key (writes a tombstone)
//! FREEZE             Freeze the current memtable
//! DUMP               Write the oldest frozen memtable to an SSTable
//! STATS              Print state debug info
//! EXIT / QUIT        Shut down
//! ```
//!
//! ## Configuration
//!
//! ```text
//! MINILSM_MEMTABLE_KB  Memtable size limit in KiB  (default: 65536 = 64 MiB)
//! MINILSM_BLOCK_SIZE   Target block size in bytes  (default: 4096)
//! MINILSM_SST_DIR      SSTable directory           (default: "data/sst")
//! RUST_LOG             Log filter, logs go to stderr (default: "warn")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! minilsm started (memtable=65536KiB, block=4096, sst_dir=data/sst)
//! > SET name Alice
//! OK
//! > GET name
//! Alice
//! > FREEZE
//! OK (immutable=1)
//! > DUMP
//! OK data/sst/00000.sst (1 blocks)
//! > EXIT
//! bye
//! ```

mod shell;

use anyhow::Result;
use config::LsmOptions;
use engine::LsmStorageState;
use shell::{Outcome, Shell};
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let options = LsmOptions::from_env()?;
    println!(
        "minilsm started (memtable={}KiB, block={}, sst_dir={})",
        options.memtable_size_limit / 1024,
        options.block_size,
        options.sst_dir.display()
    );
    println!("Commands: SET key value | GET key | DEL key");
    println!("          FREEZE | DUMP | STATS | EXIT");

    let mut shell = Shell::new(LsmStorageState::new(options));

    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match shell.execute(&line) {
            Outcome::Reply(text) => println!("{}", text),
            Outcome::Silent => {}
            Outcome::Exit => {
                println!("bye");
                break;
            }
        }
        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
