use serde_json::Value;
use std::io::{self, Write};

/// Pretty-print the full envelope (result, methodology, assumptions and
/// warnings) to stdout. A closed pipe ends output quietly.
pub fn print_json(value: &Value) {
    let stdout = io::stdout();
    match write_json(&mut stdout.lock(), value) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
        Err(e) => eprintln!("Failed to write JSON output: {e}"),
    }
}

fn write_json<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()
}
