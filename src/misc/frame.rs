//! Whole-frame buffered writer.
//! Queued escape sequences build up here and hit the terminal in one write
//! on `flush`, which keeps half-drawn frames off the screen.

use std::io::Write;

pub struct FrameWriter<T: Write> {
    inner: T,
    buf: Vec<u8>,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(4096),
        }
    }
}

impl<T: Write> Write for FrameWriter<T> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.write_all(&self.buf)?;
        self.buf.clear();
        self.inner.flush()
    }
}
