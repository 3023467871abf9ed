//! # Frame Synchronizer
//!
//! Splits the raw receiver byte stream into [`Frame`]s.
//!
//! The stream carries no alignment guarantees: the receiver may have been
//! mid-frame when the port was opened, and radio noise can land anywhere.
//! Every byte is pushed through a two-byte window until the window equals
//! the magic marker; everything before it is discarded.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tracing::{debug, trace};

use super::protocol::*;
use crate::error::{ReceiverError, Result};

/// Reads frames from any async byte source (serial port, file, socket)
pub struct FrameSynchronizer<R> {
    reader: BufReader<R>,
    discarded: u64,
}

impl<R: AsyncRead + Unpin> FrameSynchronizer<R> {
    /// Wrap a byte source
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
            discarded: 0,
        }
    }

    /// Total bytes discarded while hunting for the magic marker
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Wait for and return the next frame
    ///
    /// # Returns
    ///
    /// * `Frame::Comment` - `# ` comment line, trimmed
    /// * `Frame::Packet` - exactly `len - 4` payload bytes
    ///
    /// # Errors
    ///
    /// - `Transport`: the source reached EOF or failed mid-read
    /// - `MalformedPacket`: the length field is smaller than the frame header;
    ///   the stream stays usable and the next call resynchronizes
    pub async fn next_frame(&mut self) -> Result<Frame> {
        self.seek_magic().await?;

        let mut length_bytes = [0u8; 2];
        self.read_exact(&mut length_bytes).await?;

        if length_bytes == COMMENT_MARKER {
            let mut line = Vec::new();
            self.reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(transport)?;
            if line.is_empty() {
                return Err(ReceiverError::Transport(
                    "Stream closed inside comment".to_string(),
                ));
            }
            let text = String::from_utf8_lossy(&line).trim_end().to_string();
            return Ok(Frame::Comment(text));
        }

        let length = u16::from_le_bytes(length_bytes) as usize;
        if length < FRAME_HEADER_SIZE {
            return Err(ReceiverError::MalformedPacket(format!(
                "Frame length {} shorter than {}-byte header",
                length, FRAME_HEADER_SIZE
            )));
        }

        let mut payload = vec![0u8; length - FRAME_HEADER_SIZE];
        self.read_exact(&mut payload).await?;
        debug!("Framed {} byte payload", payload.len());

        Ok(Frame::Packet(payload))
    }

    /// Consume bytes up to and including the next magic marker
    async fn seek_magic(&mut self) -> Result<()> {
        let mut window = [0u8; 2];
        let mut seen: u64 = 0;

        loop {
            window[0] = window[1];
            window[1] = self.reader.read_u8().await.map_err(transport)?;
            seen += 1;

            if seen >= 2 && window == FRAME_MAGIC {
                let skipped = seen - 2;
                if skipped > 0 {
                    trace!("Discarded {} bytes before frame marker", skipped);
                    self.discarded += skipped;
                }
                return Ok(());
            }
        }
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).await.map_err(transport)?;
        Ok(())
    }
}

fn transport(e: std::io::Error) -> ReceiverError {
    ReceiverError::Transport(e.to_string())
}
