//! On-disk framing for the record log.

use crate::error::{EngineError, EngineResult, ErrorCode};

/// Computes the CRC32 used by every checksum in the log.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// The fixed header at offset zero of every log.
///
/// ```text
/// | magic "DBML" (4) | version (2) | reserved (2) | block_size (4) | crc32 (4) |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Block size the database was created with.
    pub block_size: u32,
}

impl FileHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 16;
    /// Leading magic bytes.
    pub const MAGIC: [u8; 4] = *b"DBML";
    /// Current format version.
    pub const VERSION: u16 = 1;

    /// Encodes the header.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&Self::MAGIC);
        buf[4..6].copy_from_slice(&Self::VERSION.to_le_bytes());
        buf[8..12].copy_from_slice(&self.block_size.to_le_bytes());
        let crc = compute_crc32(&buf[..12]);
        buf[12..16].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Decodes and validates a header.
    ///
    /// # Errors
    ///
    /// `BadMagicNumber` for anything that is not a header of this format.
    pub fn decode(data: &[u8]) -> EngineResult<Self> {
        if data.len() < Self::SIZE || data[0..4] != Self::MAGIC {
            return Err(EngineError::new(ErrorCode::BadMagicNumber));
        }

        let stored = read_u32(data, 12);
        if stored != compute_crc32(&data[..12]) {
            return Err(EngineError::with_detail(
                ErrorCode::BadMagicNumber,
                "header checksum mismatch",
            ));
        }

        let version = u16::from_le_bytes([data[4], data[5]]);
        if version != Self::VERSION {
            return Err(EngineError::with_detail(
                ErrorCode::BadMagicNumber,
                format!("unsupported format version {version}"),
            ));
        }

        Ok(Self {
            block_size: read_u32(data, 8),
        })
    }
}

/// What a record does to its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    /// Sets the key to the record's value.
    Put = 1,
    /// Removes the key.
    Delete = 2,
}

impl TryFrom<u8> for RecordKind {
    type Error = EngineError;

    fn try_from(byte: u8) -> EngineResult<Self> {
        match byte {
            1 => Ok(Self::Put),
            2 => Ok(Self::Delete),
            other => Err(EngineError::with_detail(
                ErrorCode::MalformedRecord,
                format!("unknown record kind {other}"),
            )),
        }
    }
}

/// One entry of the log.
///
/// ```text
/// | len (4) | kind (1) | key_len (4) | prefix_crc (4) | key | value | crc32 (4) |
/// ```
///
/// `len` counts the whole record including itself and the checksum.
/// `prefix_crc` covers the nine bytes before it, so a damaged length is told
/// apart from a record that was cut short at the end of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Put or delete.
    pub kind: RecordKind,
    /// Key bytes.
    pub key: Vec<u8>,
    /// Value bytes; empty for deletes.
    pub value: Vec<u8>,
}

impl LogRecord {
    /// Bytes of the self-checking frame prefix.
    pub const PREFIX_SIZE: usize = 13;
    /// Bytes of framing around key and value.
    pub const OVERHEAD: usize = Self::PREFIX_SIZE + 4;
    /// Bytes of the prefix covered by its checksum.
    const PREFIX_FIELDS: usize = 9;

    /// Creates a put record.
    #[must_use]
    pub fn put(key: &[u8], value: &[u8]) -> Self {
        Self {
            kind: RecordKind::Put,
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    /// Creates a delete record.
    #[must_use]
    pub fn delete(key: &[u8]) -> Self {
        Self {
            kind: RecordKind::Delete,
            key: key.to_vec(),
            value: Vec::new(),
        }
    }

    /// Returns the encoded size of this record.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        Self::OVERHEAD + self.key.len() + self.value.len()
    }

    /// Returns the frame length of a record with the given key and value sizes.
    ///
    /// # Errors
    ///
    /// `IllegalData` if the record does not fit the 32-bit length field.
    pub fn frame_size(key_len: usize, value_len: usize) -> EngineResult<u32> {
        key_len
            .checked_add(value_len)
            .and_then(|body| body.checked_add(Self::OVERHEAD))
            .and_then(|len| u32::try_from(len).ok())
            .ok_or_else(|| {
                EngineError::with_detail(
                    ErrorCode::IllegalData,
                    format!("key of {key_len} and value of {value_len} bytes exceed one record"),
                )
            })
    }

    /// Encodes the record.
    ///
    /// # Errors
    ///
    /// `IllegalData` if key and value are too large for one record.
    pub fn encode(&self) -> EngineResult<Vec<u8>> {
        let len = Self::frame_size(self.key.len(), self.value.len())?;
        let key_len = self.key.len() as u32;

        let mut buf = Vec::with_capacity(len as usize);
        buf.extend_from_slice(&len.to_le_bytes());
        buf.push(self.kind as u8);
        buf.extend_from_slice(&key_len.to_le_bytes());
        let prefix_crc = compute_crc32(&buf);
        buf.extend_from_slice(&prefix_crc.to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);
        let crc = compute_crc32(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Validates the frame prefix at the start of `data` and returns the
    /// length of the whole record.
    ///
    /// # Errors
    ///
    /// `ChecksumMismatch` if the prefix checksum is wrong, `MalformedRecord`
    /// if `data` is shorter than a prefix or its fields disagree.
    pub fn frame_len(data: &[u8]) -> EngineResult<usize> {
        if data.len() < Self::PREFIX_SIZE {
            return Err(EngineError::with_detail(
                ErrorCode::MalformedRecord,
                "record prefix too short",
            ));
        }

        let stored = read_u32(data, Self::PREFIX_FIELDS);
        let computed = compute_crc32(&data[..Self::PREFIX_FIELDS]);
        if stored != computed {
            return Err(EngineError::with_detail(
                ErrorCode::ChecksumMismatch,
                format!("record prefix: expected {stored:#010x}, found {computed:#010x}"),
            ));
        }

        let len = read_u32(data, 0) as usize;
        if len < Self::OVERHEAD {
            return Err(EngineError::with_detail(
                ErrorCode::MalformedRecord,
                format!("record length {len} below minimum"),
            ));
        }

        RecordKind::try_from(data[4])?;
        let key_len = read_u32(data, 5) as usize;
        let body = len - Self::OVERHEAD;
        if key_len > body {
            return Err(EngineError::with_detail(
                ErrorCode::MalformedRecord,
                format!("key length {key_len} exceeds record body {body}"),
            ));
        }

        Ok(len)
    }

    /// Decodes exactly one record from `data`.
    ///
    /// # Errors
    ///
    /// `ChecksumMismatch` if either checksum is wrong, `MalformedRecord` if
    /// the framing is inconsistent.
    pub fn decode(data: &[u8]) -> EngineResult<Self> {
        let len = Self::frame_len(data)?;
        if len != data.len() {
            return Err(EngineError::with_detail(
                ErrorCode::MalformedRecord,
                format!("record length {len} does not match {} bytes read", data.len()),
            ));
        }

        let stored = read_u32(data, len - 4);
        let computed = compute_crc32(&data[..len - 4]);
        if stored != computed {
            return Err(EngineError::with_detail(
                ErrorCode::ChecksumMismatch,
                format!("expected {stored:#010x}, found {computed:#010x}"),
            ));
        }

        let kind = RecordKind::try_from(data[4])?;
        let key_end = Self::PREFIX_SIZE + read_u32(data, 5) as usize;
        Ok(Self {
            kind,
            key: data[Self::PREFIX_SIZE..key_end].to_vec(),
            value: data[key_end..len - 4].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn header_validates_magic_and_crc() {
        let header = FileHeader { block_size: 2048 };
        let mut bytes = header.encode();
        assert_eq!(FileHeader::decode(&bytes).unwrap(), header);

        bytes[9] ^= 0xFF;
        let err = FileHeader::decode(&bytes).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadMagicNumber);

        let err = FileHeader::decode(b"GDBM not really a header").unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadMagicNumber);
    }

    /// Rewrites both checksums after a test has edited the prefix fields.
    fn reseal(bytes: &mut [u8]) {
        let prefix_crc = compute_crc32(&bytes[..9]);
        bytes[9..13].copy_from_slice(&prefix_crc.to_le_bytes());
        let len = bytes.len();
        let crc = compute_crc32(&bytes[..len - 4]);
        bytes[len - 4..].copy_from_slice(&crc.to_le_bytes());
    }

    #[test]
    fn put_record_keeps_nul_bytes() {
        let record = LogRecord::put(b"k\0ey", b"\0value\0");
        let bytes = record.encode().unwrap();
        assert_eq!(bytes.len(), record.encoded_size());
        assert_eq!(LogRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn delete_record_has_empty_value() {
        let bytes = LogRecord::delete(b"gone").encode().unwrap();
        let decoded = LogRecord::decode(&bytes).unwrap();
        assert_eq!(decoded.kind, RecordKind::Delete);
        assert!(decoded.value.is_empty());
    }

    #[test]
    fn flipped_byte_is_checksum_mismatch() {
        let mut bytes = LogRecord::put(b"key", b"value").encode().unwrap();
        bytes[14] ^= 0x01;
        let err = LogRecord::decode(&bytes).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChecksumMismatch);
    }

    #[test]
    fn inconsistent_key_length_is_malformed() {
        let mut bytes = LogRecord::put(b"key", b"v").encode().unwrap();
        bytes[5..9].copy_from_slice(&100u32.to_le_bytes());
        reseal(&mut bytes);

        let err = LogRecord::decode(&bytes).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedRecord);
    }

    #[test]
    fn short_length_prefix_is_malformed() {
        let mut bytes = LogRecord::put(b"", b"").encode().unwrap();
        assert_eq!(LogRecord::frame_len(&bytes).unwrap(), LogRecord::OVERHEAD);

        bytes[0..4].copy_from_slice(&4u32.to_le_bytes());
        reseal(&mut bytes);
        assert_eq!(
            LogRecord::frame_len(&bytes).unwrap_err().code(),
            ErrorCode::MalformedRecord
        );
        assert_eq!(
            LogRecord::frame_len(&bytes[..5]).unwrap_err().code(),
            ErrorCode::MalformedRecord
        );
    }

    #[test]
    fn damaged_length_fails_the_prefix_checksum() {
        let mut bytes = LogRecord::put(b"key", b"value").encode().unwrap();
        bytes[3] ^= 0x40;
        assert_eq!(
            LogRecord::frame_len(&bytes).unwrap_err().code(),
            ErrorCode::ChecksumMismatch
        );
    }

    #[test]
    fn prefix_alone_gives_the_frame_length() {
        let bytes = LogRecord::put(b"key", b"value").encode().unwrap();
        let len = LogRecord::frame_len(&bytes[..LogRecord::PREFIX_SIZE]).unwrap();
        assert_eq!(len, bytes.len());
    }

    #[test]
    fn oversized_record_is_illegal_data() {
        assert_eq!(LogRecord::frame_size(3, 5).unwrap(), 25);

        let err = LogRecord::frame_size(u32::MAX as usize, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IllegalData);
        let err = LogRecord::frame_size(usize::MAX, 1).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IllegalData);
    }

    proptest! {
        #[test]
        fn any_single_bit_flip_is_rejected(
            key in prop::collection::vec(any::<u8>(), 0..64),
            value in prop::collection::vec(any::<u8>(), 0..256),
            pos in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut bytes = LogRecord::put(&key, &value).encode().unwrap();
            let i = pos.index(bytes.len());
            bytes[i] ^= 1 << bit;
            prop_assert!(LogRecord::decode(&bytes).is_err());
        }
    }
}
