//! Binary serialization of backup envelopes
//!
//! The fixed-size header carries every length up front, so the reader
//! allocates exact buffers and never grows them. Any short read fails the
//! whole decode; nothing partial is ever returned.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{VaultError, VaultResult};
use crate::store::file_io::write_atomic;

use super::{Envelope, FORMAT_VERSION};

/// File type tag
pub const MAGIC: &[u8; 4] = b"AABK";

/// Magic + version + created_at + four lengths
pub const HEADER_LEN: usize = 4 + 4 + 8 + 4 * 4;

/// Header fields after the magic tag
struct Header {
    version: i32,
    created_at: i64,
    salt_len: usize,
    iv_len: usize,
    checksum_len: usize,
    cipher_len: usize,
}

impl Header {
    fn body_len(&self) -> u64 {
        (self.salt_len + self.iv_len + self.checksum_len) as u64 + self.cipher_len as u64
    }
}

/// Serialize an envelope to a writer
pub fn write_to<W: Write>(writer: W, envelope: &Envelope) -> VaultResult<()> {
    let mut out = BufWriter::new(writer);

    out.write_all(MAGIC)?;
    out.write_all(&envelope.version().to_be_bytes())?;
    out.write_all(&envelope.created_at().to_be_bytes())?;
    out.write_all(&encode_len(envelope.salt().len(), "salt")?)?;
    out.write_all(&encode_len(envelope.iv().len(), "iv")?)?;
    out.write_all(&encode_len(envelope.checksum().len(), "checksum")?)?;
    out.write_all(&encode_len(envelope.ciphertext().len(), "ciphertext")?)?;
    out.write_all(envelope.salt())?;
    out.write_all(envelope.iv())?;
    out.write_all(envelope.checksum())?;
    out.write_all(envelope.ciphertext())?;

    out.flush()?;
    Ok(())
}

/// Deserialize an envelope from a reader
pub fn read_from<R: Read>(reader: R) -> VaultResult<Envelope> {
    let mut input = BufReader::new(reader);
    let header = read_header(&mut input)?;
    read_body(&mut input, header)
}

/// Write an envelope to `path` atomically (temp file, then rename)
pub fn write_file(path: &Path, envelope: &Envelope) -> VaultResult<()> {
    write_atomic(path, |file| write_to(file, envelope))
}

/// Read an envelope from `path`
///
/// Declared lengths are checked against the file size before any field
/// buffer is allocated.
pub fn read_file(path: &Path) -> VaultResult<Envelope> {
    let file = File::open(path).map_err(|e| {
        VaultError::Io(format!("Failed to open backup {}: {}", path.display(), e))
    })?;
    let file_len = file.metadata()?.len();

    let mut input = BufReader::new(file);
    let header = read_header(&mut input)?;

    let available = file_len.saturating_sub(HEADER_LEN as u64);
    if header.body_len() > available {
        return Err(VaultError::validation(format!(
            "Truncated backup: header declares {} bytes, file holds {}",
            header.body_len(),
            available
        )));
    }

    read_body(&mut input, header)
}

fn read_header<R: Read>(input: &mut R) -> VaultResult<Header> {
    let mut magic = [0u8; 4];
    read_exact_or_truncated(input, &mut magic, "magic")?;
    if &magic != MAGIC {
        return Err(VaultError::validation("Invalid backup file"));
    }

    let version = read_i32(input, "version")?;
    if version != FORMAT_VERSION {
        return Err(VaultError::validation(format!(
            "Unsupported backup format version: {}",
            version
        )));
    }

    let mut created_at = [0u8; 8];
    read_exact_or_truncated(input, &mut created_at, "created_at")?;

    Ok(Header {
        version,
        created_at: i64::from_be_bytes(created_at),
        salt_len: read_len(input, "salt")?,
        iv_len: read_len(input, "iv")?,
        checksum_len: read_len(input, "checksum")?,
        cipher_len: read_len(input, "ciphertext")?,
    })
}

fn read_body<R: Read>(input: &mut R, header: Header) -> VaultResult<Envelope> {
    let salt = read_field(input, header.salt_len, "salt")?;
    let iv = read_field(input, header.iv_len, "iv")?;
    let checksum = read_field(input, header.checksum_len, "checksum")?;
    let ciphertext = read_field(input, header.cipher_len, "ciphertext")?;

    Ok(Envelope::new(
        header.version,
        header.created_at,
        salt,
        iv,
        checksum,
        ciphertext,
    ))
}

fn encode_len(len: usize, field: &str) -> VaultResult<[u8; 4]> {
    i32::try_from(len)
        .map(i32::to_be_bytes)
        .map_err(|_| VaultError::validation(format!("{} too large to encode ({} bytes)", field, len)))
}

fn read_i32<R: Read>(input: &mut R, field: &str) -> VaultResult<i32> {
    let mut buf = [0u8; 4];
    read_exact_or_truncated(input, &mut buf, field)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_len<R: Read>(input: &mut R, field: &str) -> VaultResult<usize> {
    let len = read_i32(input, field)?;
    usize::try_from(len)
        .map_err(|_| VaultError::validation(format!("Negative {} length: {}", field, len)))
}

fn read_field<R: Read>(input: &mut R, len: usize, field: &str) -> VaultResult<Vec<u8>> {
    let mut buf = vec![0u8; len];
    read_exact_or_truncated(input, &mut buf, field)?;
    Ok(buf)
}

fn read_exact_or_truncated<R: Read>(input: &mut R, buf: &mut [u8], field: &str) -> VaultResult<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            VaultError::validation(format!("Truncated backup: incomplete {}", field))
        }
        _ => VaultError::Io(format!("Failed to read {}: {}", field, e)),
    })
}
