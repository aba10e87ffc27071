use std::future::Future;
use std::io;
use std::str::FromStr;

use log::warn;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::preferences::Field;

/// An operator command, one per line:
///
/// ```text
/// refresh
/// font 7.5
/// calendar 40
/// reset
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    /// Refresh the weather now, unless a refresh is already running.
    Refresh,
    /// Set a layout value for the running device class.
    Adjust(Field, f64),
    /// Restore the running device class's default layout.
    Reset,
}

impl FromStr for Command {
    type Err = &'static str;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = match words.next() {
            Some("refresh") => Self::Refresh,
            Some("reset") => Self::Reset,
            Some(name) => {
                let field = name.parse::<Field>()?;
                let value = words
                    .next()
                    .and_then(|value| value.parse::<f64>().ok())
                    .filter(|value| value.is_finite())
                    .ok_or("Missing or invalid value.")?;
                Self::Adjust(field, value)
            }
            None => return Err("Empty command."),
        };

        if words.next().is_some() {
            return Err("Unexpected trailing input.");
        }
        Ok(command)
    }
}

/// Feed every well-formed line of `reader` to `handle` until end of input.
/// Malformed lines are logged and skipped.
pub async fn read_commands<R, F, Fut>(reader: R, mut handle: F) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(Command) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(command) => handle(command).await,
            Err(err) => warn!("Ignoring command {:?}: {}", line, err),
        }
    }

    Ok(())
}
