//! Subcommand implementations.

pub mod migrate;
pub mod products;
pub mod qr;

/// Write `bytes` to `out`, or to stdout when no path is given.
pub fn write_output(out: Option<&std::path::Path>, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    match out {
        Some(path) => std::fs::write(path, bytes),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()
        }
    }
}
