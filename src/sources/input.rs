//! Shared file-or-reader input handling for the format loaders.

use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::Result;

/// A rewindable byte stream.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Where a format loader reads its text from.
///
/// Reader inputs are rewound to the start on every read so a loader can be
/// re-loaded (reload loops call `load` repeatedly on the same instance).
pub(crate) enum Input {
    Path(PathBuf),
    Reader(Mutex<Box<dyn ReadSeek>>),
}

impl Input {
    pub(crate) fn path(path: impl Into<PathBuf>) -> Self {
        Input::Path(path.into())
    }

    pub(crate) fn reader(reader: impl ReadSeek + 'static) -> Self {
        Input::Reader(Mutex::new(Box::new(reader)))
    }

    /// Read the whole input as text.
    pub(crate) fn read_to_string(&self) -> Result<String> {
        match self {
            Input::Path(path) => Ok(std::fs::read_to_string(path)?),
            Input::Reader(reader) => {
                let mut reader = reader.lock().unwrap();
                reader.seek(SeekFrom::Start(0))?;
                let mut text = String::new();
                reader.read_to_string(&mut text)?;
                Ok(text)
            }
        }
    }
}
