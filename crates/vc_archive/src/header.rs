use crate::error::ArchiveError;
use crate::stream::{ArchiveReader, ArchiveWriter};

/// First string of every archive written with a header.
pub const ARCHIVE_SIGNATURE: &str = "vc_archive";

/// Library version written by this build.
///
/// Fill code can branch on [`InputArchive::library_version`](crate::InputArchive::library_version)
/// when the encoding of a built-in type changes.
pub const LIBRARY_VERSION: u16 = 1;

pub(crate) fn write_header(writer: &mut dyn ArchiveWriter) -> Result<(), ArchiveError> {
    writer.write_str(ARCHIVE_SIGNATURE)?;
    writer.write_u16(LIBRARY_VERSION)
}

/// Returns the library version of the stream.
pub(crate) fn read_header(reader: &mut dyn ArchiveReader) -> Result<u16, ArchiveError> {
    let signature = reader
        .read_string()
        .map_err(|_| ArchiveError::InvalidSignature)?;
    if signature != ARCHIVE_SIGNATURE {
        return Err(ArchiveError::InvalidSignature);
    }
    let version = reader.read_u16()?;
    if version > LIBRARY_VERSION {
        return Err(ArchiveError::UnsupportedVersion(version));
    }
    Ok(version)
}
