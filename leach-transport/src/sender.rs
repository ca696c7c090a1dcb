//! Destinations for serialized frames. Every sender writes one frame per line.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use log::info;
use thiserror::Error;

use crate::serializer::SerializationError;

/// Error types that can occur during data transport (sending).
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Transport settings that cannot be turned into a sender.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

/// Base trait for sending serialized data.
pub trait Sender: Send + Sync {
    fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Flushes any internal buffers. May be a no-op.
    fn flush(&self) -> Result<(), TransportError>;
}

/// Writes frames to standard output.
#[derive(Default)]
pub struct StdioSender;

impl Sender for StdioSender {
    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(data)?;
        stdout.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        io::stdout().flush()?;
        Ok(())
    }
}

/// Appends frames to a file, created or truncated on construction.
pub struct FileSender {
    file: Mutex<BufWriter<File>>,
}

impl FileSender {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        info!("writing simulation frames to {}", path.display());
        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl Sender for FileSender {
    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut file = self.file.lock().map_err(|_| TransportError::Poisoned("file sender"))?;
        file.write_all(data)?;
        file.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        let mut file = self.file.lock().map_err(|_| TransportError::Poisoned("file sender"))?;
        file.flush()?;
        Ok(())
    }
}

/// Discards everything. Used when the feed is disabled.
#[derive(Default)]
pub struct NullSender;

impl Sender for NullSender {
    fn send(&self, _data: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
