pub mod process;
pub mod read;
pub mod read_async;

use std::{io::Write, time::Duration};

use anyhow::Error;

/// Print file content followed by a read summary line.
fn print_content(content: &[u8], elapsed: Duration) -> Result<(), Error> {
    let mut stdout = std::io::stdout().lock();

    writeln!(stdout)?;
    stdout.write_all(content)?;
    writeln!(stdout)?;
    writeln!(
        stdout,
        "Read {} bytes in {} ms.",
        content.len(),
        elapsed.as_millis()
    )?;

    Ok(())
}
