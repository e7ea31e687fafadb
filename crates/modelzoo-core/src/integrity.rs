//! Checking bytes against a file record
//!
//! A record's size and digest must describe exactly the bytes served from
//! its source. These checks take bytes the caller already holds; nothing
//! here touches the network or the filesystem.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::checksum::Sha256Digest;
use crate::descriptor::FileRecord;
use crate::error::IntegrityError;

impl FileRecord {
    /// Check a complete buffer against this record
    pub fn verify(&self, data: &[u8]) -> Result<(), IntegrityError> {
        let mut check = IntegrityCheck::new(self);
        check.update(data)?;
        check.finish()
    }
}

/// Incremental check for data arriving in chunks
pub struct IntegrityCheck<'a> {
    record: &'a FileRecord,
    hasher: Sha256,
    seen: u64,
}

impl<'a> IntegrityCheck<'a> {
    pub fn new(record: &'a FileRecord) -> Self {
        Self {
            record,
            hasher: Sha256::new(),
            seen: 0,
        }
    }

    /// Feed the next chunk
    ///
    /// Fails as soon as more bytes have arrived than the record declares.
    pub fn update(&mut self, chunk: &[u8]) -> Result<(), IntegrityError> {
        self.seen = self.seen.saturating_add(chunk.len() as u64);
        if self.seen > self.record.size {
            return Err(self.size_mismatch());
        }

        self.hasher.update(chunk);
        Ok(())
    }

    /// Bytes fed so far
    pub fn bytes_seen(&self) -> u64 {
        self.seen
    }

    /// Finish the check
    pub fn finish(self) -> Result<(), IntegrityError> {
        if self.seen != self.record.size {
            return Err(self.size_mismatch());
        }

        let actual = Sha256Digest::from_bytes(self.hasher.finalize().into());
        if actual != self.record.sha256 {
            return Err(IntegrityError::ChecksumMismatch {
                file: self.record.name.clone(),
                expected: self.record.sha256,
                actual,
            });
        }

        debug!("{} matches its record", self.record.name);
        Ok(())
    }

    fn size_mismatch(&self) -> IntegrityError {
        IntegrityError::SizeMismatch {
            file: self.record.name.clone(),
            expected: self.record.size,
            actual: self.seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FileSource;

    fn record_for(data: &[u8]) -> FileRecord {
        FileRecord {
            name: "FP32/model.bin".to_string(),
            size: data.len() as u64,
            sha256: Sha256Digest::of(data),
            source: FileSource::Url("https://example.org/model.bin".parse().unwrap()),
        }
    }

    #[test]
    fn test_verify_matching_bytes() {
        let record = record_for(b"hello world");
        assert!(record.verify(b"hello world").is_ok());
    }

    #[test]
    fn test_size_checked_before_digest() {
        let record = record_for(b"hello world");

        assert_eq!(
            record.verify(b"hello"),
            Err(IntegrityError::SizeMismatch {
                file: "FP32/model.bin".to_string(),
                expected: 11,
                actual: 5,
            })
        );
    }

    #[test]
    fn test_digest_mismatch() {
        let record = record_for(b"hello world");

        match record.verify(b"HELLO WORLD") {
            Err(IntegrityError::ChecksumMismatch { expected, actual, .. }) => {
                assert_eq!(expected, record.sha256);
                assert_eq!(actual, Sha256Digest::of(b"HELLO WORLD"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_chunked_check() {
        let record = record_for(b"hello world");
        let mut check = IntegrityCheck::new(&record);

        for chunk in [&b"hello"[..], b" ", b"world"] {
            check.update(chunk).unwrap();
        }
        assert_eq!(check.bytes_seen(), 11);
        assert!(check.finish().is_ok());
    }

    #[test]
    fn test_oversize_stream_fails_early() {
        let record = record_for(b"hello");
        let mut check = IntegrityCheck::new(&record);

        check.update(b"hel").unwrap();
        assert!(matches!(
            check.update(b"lo!"),
            Err(IntegrityError::SizeMismatch { actual: 6, .. })
        ));
    }
}
