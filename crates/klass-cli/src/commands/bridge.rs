//! `klass bridge`: turn a stream of status envelopes into output and an
//! exit code.

use anyhow::Context;
use klass_test::BridgeConsole;
use log::warn;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Read until the summary arrives. Exits 1 when the input ends without one.
pub fn execute(file: Option<&Path>) -> anyhow::Result<i32> {
    let reader: Box<dyn BufRead> = match file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let mut console = BridgeConsole::new(io::stdout().lock());
    for line in reader.lines() {
        console.log(&line?)?;
        if console.is_finished() {
            break;
        }
    }

    Ok(console.exit_status().unwrap_or_else(|| {
        warn!("input ended before a summary was received");
        1
    }))
}
