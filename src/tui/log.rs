//! Routes `tracing` output into the dashboard's log panel.

use crossbeam_channel::Sender;
use std::io;
use tracing_subscriber::fmt::MakeWriter;

/// `MakeWriter` that sends each formatted event as one line over a channel.
#[derive(Clone)]
pub struct LogChannel {
    tx: Sender<String>,
}

impl LogChannel {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

pub struct LogLineWriter {
    tx: Sender<String>,
}

impl io::Write for LogLineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for line in text.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
            // Receiver gone means the dashboard has shut down.
            let _ = self.tx.send(line.to_string());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogChannel {
    type Writer = LogLineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogLineWriter {
            tx: self.tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_events_reach_the_channel() {
        let (tx, rx) = unbounded();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(LogChannel::new(tx))
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("error walking data folder: permission denied");
            tracing::debug!("filtered out at the default level");
        });

        let lines: Vec<String> = rx.try_iter().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("WARN"));
        assert!(lines[0].contains("error walking data folder: permission denied"));
    }
}
