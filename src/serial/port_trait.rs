//! Trait abstraction for opening the serial link to enable testing

use tokio::io::AsyncRead;

use crate::error::Result;

/// Readable byte stream delivered by the serial link
pub trait ByteStream: AsyncRead + Send + Unpin {}

impl<T: AsyncRead + Send + Unpin> ByteStream for T {}

/// Opens the serial link on demand
pub trait PortOpener: Send {
    /// Open the link and hand over its read half
    fn open(&self) -> Result<Box<dyn ByteStream>>;

    /// Human-readable description of the link (e.g. the device path)
    fn describe(&self) -> String;
}
