use std::io::{self, Seek, SeekFrom, Write};

use crate::error::ChannelError;
use crate::events::EventSet;
use crate::region::SharedRegion;

/// Write side of one in-flight message, handed to the sender's callback.
///
/// Bytes handed to `write` are staged into the shared window at an internal
/// cursor and only handed off to the receiver once the window is completely
/// full; `write` may be called any number of times with any split of the
/// payload and the receiver only observes chunk boundaries at full-window
/// granularity, plus one final, possibly short or empty, chunk.
pub struct SendStream<'a> {
    region: &'a SharedRegion,
    events: &'a EventSet,
    pos: usize,
}

impl<'a> SendStream<'a> {
    pub(crate) fn new(region: &'a SharedRegion, events: &'a EventSet) -> Self {
        Self { region, events, pos: 0 }
    }

    /// Publishes the window as a non-final chunk and waits for the receiver
    /// to free it before the next chunk can be staged.
    fn emit_full_chunk(&mut self) -> Result<(), ChannelError> {
        self.region.publish(self.pos as u32, false, false);
        self.events.bytes_written.signal()?;
        self.events.bytes_read.wait()?;
        self.pos = 0;
        Ok(())
    }

    /// Publishes the final chunk and waits for the receiver's
    /// acknowledgement that the whole message has been consumed.
    ///
    /// On the normal path this is whatever remains staged at the cursor,
    /// possibly zero bytes. On the aborted path (the callback failed) this
    /// is always the cancellation encoding — `bytes_written = 0` regardless
    /// of anything already staged — so the receiver observes an empty
    /// message rather than a truncated one.
    pub(crate) fn finish(&mut self, aborted: bool) -> Result<(), ChannelError> {
        let bytes_written = if aborted { 0 } else { self.pos as u32 };
        self.region.publish(bytes_written, true, aborted);
        self.events.bytes_written.signal()?;
        self.pos = 0;
        self.events.message_read.wait()
    }
}

impl Write for SendStream<'_> {
    fn write(&mut self, mut buf: &[u8]) -> io::Result<usize> {
        let total = buf.len();
        let window_len = self.region.window_len();

        while !buf.is_empty() {
            let space = window_len - self.pos;
            let n = buf.len().min(space);
            self.region.write_window_at(self.pos, &buf[..n]);
            self.pos += n;
            buf = &buf[n..];

            if self.pos == window_len {
                self.emit_full_chunk().map_err(io::Error::from)?;
            }
        }

        Ok(total)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for SendStream<'_> {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(ChannelError::OperationNotSupported.into())
    }
}
