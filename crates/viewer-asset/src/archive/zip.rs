use std::{
    borrow::Cow,
    error::Error,
    fmt::{self, Display, Formatter},
    io::{self, Cursor, Read, Seek},
};

use zip::{read::ZipFile, ZipArchive};

use super::{Archive, Entry};

#[derive(Debug)]
pub enum ZipError {
    Zip(zip::result::ZipError),
    FileTooLarge(u64),
}

impl Display for ZipError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ZipError::Zip(error) => Display::fmt(error, f),
            ZipError::FileTooLarge(size) => write!(f, "File size {} is too large", size),
        }
    }
}

impl Error for ZipError {}

impl From<zip::result::ZipError> for ZipError {
    fn from(value: zip::result::ZipError) -> Self {
        Self::Zip(value)
    }
}

impl From<io::Error> for ZipError {
    fn from(value: io::Error) -> Self {
        Self::Zip(zip::result::ZipError::Io(value))
    }
}

impl<'a> Entry<'a> for ZipFile<'a> {
    type Error = ZipError;

    fn name(&self) -> Result<Cow<'_, str>, Self::Error> {
        Ok(self.name().into())
    }

    fn unpack(&mut self) -> Result<Vec<u8>, Self::Error> {
        let file_size = self.size();
        let file_size: usize = file_size
            .try_into()
            .map_err(|_| ZipError::FileTooLarge(file_size))?;
        let buffer = Vec::with_capacity(file_size);
        let mut cursor = Cursor::new(buffer);
        io::copy(self, &mut cursor)?;
        Ok(cursor.into_inner())
    }
}

impl<T: Read + Seek> Archive<T> for ZipArchive<T> {
    type Error = ZipError;

    type Entry<'a> = ZipFile<'a>
    where
        Self: 'a;

    fn new(stream: T) -> Result<Self, Self::Error> {
        Ok(ZipArchive::new(stream)?)
    }

    fn entry_names(&mut self) -> Result<Vec<String>, Self::Error> {
        // file_names() iterates in map order; go by index to keep the
        // archive's own entry order.
        let mut names = Vec::with_capacity(self.len());
        for index in 0..self.len() {
            let entry = self.by_index_raw(index)?;
            names.push(entry.name().to_string());
        }
        Ok(names)
    }

    fn entry(&mut self, name: &str) -> Result<Option<Self::Entry<'_>>, Self::Error> {
        match self.by_name(name) {
            Ok(entry) => Ok(Some(entry)),
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }
}
