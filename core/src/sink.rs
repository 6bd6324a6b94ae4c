//! Console delivery of a streamed answer.

use crate::client::EventStream;
use crate::client::StreamEvent;
use crate::error::DiagnosticError;
use crate::error::Result;
use std::io;
use std::io::Write;

/// Writes each token as it arrives
#[derive(Debug)]
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Print the stream until its terminal event.
    ///
    /// An `Error` event, or a stream that closes without `Done`, is returned
    /// as an error after whatever text arrived has been written.
    pub async fn drain(&mut self, mut stream: EventStream) -> Result<()> {
        while let Some(event) = stream.recv().await {
            match event {
                StreamEvent::Data(text) => {
                    self.out.write_all(text.as_bytes())?;
                    self.out.flush()?;
                }
                StreamEvent::Done => {
                    writeln!(self.out)?;
                    self.out.flush()?;
                    return Ok(());
                }
                StreamEvent::Error(message) => return Err(DiagnosticError::Transport(message)),
            }
        }
        Err(DiagnosticError::Protocol)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
