use anyhow::{Context, Result};
use engine::LsmStorageState;
use sstable::write_from_memtable;
use std::fs;
use std::path::PathBuf;

/// What the REPL should do after a command line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    /// Blank line.
    Silent,
    Exit,
}

pub struct Shell {
    state: LsmStorageState,
}

impl Shell {
    pub fn new(state: LsmStorageState) -> Self {
        Self { state }
    }

    /// Parses and runs one command line.
    pub fn execute(&mut self, line: &str) -> Outcome {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Outcome::Silent;
        };

        let reply = match cmd.to_uppercase().as_str() {
            "SET" => match parts.next() {
                Some(k) => {
                    let v = parts.collect::<Vec<&str>>().join(" ");
                    if v.is_empty() {
                        "ERR usage: SET key value".to_string()
                    } else {
                        match self.state.put(k.as_bytes(), v.as_bytes()) {
                            Ok(()) => "OK".to_string(),
                            Err(e) => format!("ERR set failed: {}", e),
                        }
                    }
                }
                None => "ERR usage: SET key value".to_string(),
            },
            "GET" => match parts.next() {
                Some(k) => match self.state.get(k.as_bytes()) {
                    Some(v) if v.is_empty() => "(deleted)".to_string(),
                    Some(v) => String::from_utf8_lossy(&v).into_owned(),
                    None => "(nil)".to_string(),
                },
                None => "ERR usage: GET key".to_string(),
            },
            "DEL" => match parts.next() {
                Some(k) => match self.state.delete(k.as_bytes()) {
                    Ok(()) => "OK".to_string(),
                    Err(e) => format!("ERR del failed: {}", e),
                },
                None => "ERR usage: DEL key".to_string(),
            },
            "FREEZE" => {
                self.state.freeze_current_memtable();
                format!("OK (immutable={})", self.state.immutable_count())
            }
            "DUMP" => match self.dump_oldest() {
                Ok(Some((path, blocks))) => {
                    format!("OK {} ({} blocks)", path.display(), blocks)
                }
                Ok(None) => "ERR nothing to dump (no frozen memtables)".to_string(),
                Err(e) => format!("ERR dump failed: {:#}", e),
            },
            "STATS" => format!("{:?}", self.state),
            "EXIT" | "QUIT" => return Outcome::Exit,
            other => format!("unknown command: {}", other),
        };

        Outcome::Reply(reply)
    }

    /// Writes the oldest frozen memtable to `<sst_dir>/<id>.sst`.
    ///
    /// The memtable stays in the state: nothing consumes the table yet.
    fn dump_oldest(&self) -> Result<Option<(PathBuf, usize)>> {
        let Some(oldest) = self.state.immutable_memtables().into_iter().next() else {
            return Ok(None);
        };

        let dir = &self.state.options().sst_dir;
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create sst dir {}", dir.display()))?;
        let path = dir.join(format!("{:05}.sst", oldest.id()));

        let table = write_from_memtable(&path, &oldest, self.state.options().block_size)?;
        tracing::info!(
            memtable_id = oldest.id(),
            path = %path.display(),
            blocks = table.num_blocks(),
            "memtable dumped"
        );
        Ok(Some((path, table.num_blocks())))
    }
}
