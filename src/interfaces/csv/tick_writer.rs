use crate::application::watch::Tick;
use crate::domain::settlement::SettlementState;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct TickRow {
    attempt: u32,
    state: SettlementState,
}

/// Streams watch ticks as CSV (`attempt,state`), flushing after every row so
/// a reader sees progress while the watch is still running.
pub struct TickWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TickWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_tick(&mut self, tick: Tick) -> Result<()> {
        self.writer.serialize(TickRow {
            attempt: tick.attempt,
            state: tick.state,
        })?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_header_once() {
        let mut writer = TickWriter::new(Vec::new());
        writer
            .write_tick(Tick {
                attempt: 1,
                state: SettlementState::Pending,
            })
            .unwrap();
        writer
            .write_tick(Tick {
                attempt: 2,
                state: SettlementState::Succeeded,
            })
            .unwrap();

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(output, "attempt,state\n1,pending\n2,succeeded\n");
    }
}
