// src/packages/archive.rs

//! Package archive scanner
//!
//! Streams a (possibly compressed) tar archive and pulls out the single
//! root-level `.PKGINFO` entry, rejecting archives with unsafe paths,
//! shadow metadata entries or oversized metadata along the way. Payload
//! entries are never buffered.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tar::{Archive, EntryType};
use tracing::debug;
use xz2::read::XzDecoder;

/// Upper bound on the size of `.PKGINFO` content
pub const MAX_PKGINFO_SIZE: usize = 64 * 1024;

/// Upper bound on the length of a single `.PKGINFO` line, excluding `\n`
pub const MAX_PKGINFO_LINE: usize = 4096;

const READ_CHUNK_SIZE: usize = 8192;

const PKGINFO: &[u8] = b".PKGINFO";

/// Compression filter wrapped around the tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompressionFormat {
    None,
    Gzip,
    Xz,
    Zstd,
}

impl CompressionFormat {
    /// Detect the filter from the first bytes of the file
    fn detect(magic: &[u8]) -> Self {
        if magic.starts_with(&[0x1F, 0x8B]) {
            CompressionFormat::Gzip
        } else if magic.starts_with(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]) {
            CompressionFormat::Xz
        } else if magic.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
            CompressionFormat::Zstd
        } else {
            CompressionFormat::None
        }
    }
}

/// What an entry path means for metadata extraction
#[derive(Debug, PartialEq, Eq)]
enum EntryKind {
    /// The root-level `.PKGINFO`
    Metadata,
    /// Anything else, skipped unread
    Other,
}

/// Open the file and negotiate the compression filter
fn open_archive(path: &Path) -> Result<Archive<Box<dyn Read>>> {
    let open_failed = |source: io::Error| Error::ArchiveOpenFailed {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(open_failed)?;
    let mut reader = BufReader::new(file);
    let compression = CompressionFormat::detect(reader.fill_buf().map_err(open_failed)?);
    debug!("Detected {:?} compression for {}", compression, path.display());

    let reader: Box<dyn Read> = match compression {
        CompressionFormat::None => Box::new(reader),
        CompressionFormat::Gzip => Box::new(GzDecoder::new(reader)),
        CompressionFormat::Xz => Box::new(XzDecoder::new(reader)),
        CompressionFormat::Zstd => Box::new(zstd::Decoder::new(reader).map_err(open_failed)?),
    };

    // A stream that decodes to nothing never produced a tar header
    let mut decoded = BufReader::new(reader);
    if decoded.fill_buf().map_err(open_failed)?.is_empty() {
        return Err(open_failed(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "archive stream is empty",
        )));
    }

    Ok(Archive::new(Box::new(decoded)))
}

/// Apply the path rules to one entry name
fn classify(name: &[u8]) -> Result<EntryKind> {
    if name.is_empty() {
        return Err(Error::EntryNameMissing);
    }

    if name[0] == b'/' {
        return Err(Error::UnsafePath(String::from_utf8_lossy(name).into_owned()));
    }

    if name.windows(2).any(|pair| pair == b"..") {
        return Err(Error::UnsafePath(String::from_utf8_lossy(name).into_owned()));
    }

    if name == PKGINFO {
        return Ok(EntryKind::Metadata);
    }

    if name.windows(PKGINFO.len()).any(|window| window == PKGINFO) {
        return Err(Error::MetadataMisplaced(String::from_utf8_lossy(name).into_owned()));
    }

    Ok(EntryKind::Other)
}

/// Read `.PKGINFO` content in chunks, enforcing the size ceiling as it grows
fn read_pkginfo<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::MetadataReadError(e)),
        };

        if buffer.len() + n > MAX_PKGINFO_SIZE {
            return Err(Error::MetadataTooLarge {
                limit: MAX_PKGINFO_SIZE,
            });
        }

        buffer.extend_from_slice(&chunk[..n]);
    }

    if buffer.is_empty() {
        return Err(Error::MetadataEmpty);
    }

    Ok(buffer)
}

/// Reject content with any line longer than [`MAX_PKGINFO_LINE`]
fn check_line_lengths(content: &[u8]) -> Result<()> {
    for (idx, line) in content.split(|&b| b == b'\n').enumerate() {
        if line.len() > MAX_PKGINFO_LINE {
            return Err(Error::LineTooLong {
                line: idx + 1,
                length: line.len(),
                limit: MAX_PKGINFO_LINE,
            });
        }
    }

    Ok(())
}

/// Extract the raw `.PKGINFO` bytes from a package archive
///
/// The archive must contain exactly one regular-file entry named `.PKGINFO`
/// at its root, no other entry whose path mentions `.PKGINFO`, and no
/// absolute or `..` entry paths. The returned bytes have passed the size and
/// line-length limits but are not yet parsed.
pub fn extract_metadata(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    debug!("Scanning package archive: {}", path.display());

    let mut archive = open_archive(path)?;
    let mut entries = archive.entries().map_err(|source| Error::ArchiveOpenFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let mut pkginfo: Option<Vec<u8>> = None;
    let mut seen = 0usize;

    loop {
        let mut entry = match entries.next() {
            None => break,
            Some(Ok(entry)) => entry,
            // A broken first header means the stream never decoded as tar
            Some(Err(source)) if seen == 0 => {
                return Err(Error::ArchiveOpenFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Some(Err(e)) => return Err(Error::ArchiveStreamError(e)),
        };
        seen += 1;

        if classify(&entry.path_bytes())? == EntryKind::Other {
            continue;
        }

        if !matches!(entry.header().entry_type(), EntryType::Regular | EntryType::Continuous) {
            return Err(Error::MetadataNotRegularFile);
        }

        if pkginfo.is_some() {
            return Err(Error::DuplicateMetadata);
        }

        let content = read_pkginfo(&mut entry)?;
        debug!("Read {} bytes of .PKGINFO", content.len());
        pkginfo = Some(content);
    }

    let content = pkginfo.ok_or(Error::MetadataMissing)?;
    check_line_lengths(&content)?;

    debug!("Scanned {} archive entries in {}", seen, path.display());
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_detection() {
        assert_eq!(CompressionFormat::detect(&[0x1F, 0x8B, 0x08, 0x00]), CompressionFormat::Gzip);
        assert_eq!(
            CompressionFormat::detect(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00]),
            CompressionFormat::Xz
        );
        assert_eq!(CompressionFormat::detect(&[0x28, 0xB5, 0x2F, 0xFD, 0x00]), CompressionFormat::Zstd);
        assert_eq!(CompressionFormat::detect(b".PKGINFO\0\0"), CompressionFormat::None);
        assert_eq!(CompressionFormat::detect(&[]), CompressionFormat::None);
    }

    #[test]
    fn test_classify_paths() {
        assert_eq!(classify(b".PKGINFO").unwrap(), EntryKind::Metadata);
        assert_eq!(classify(b"usr/bin/ls").unwrap(), EntryKind::Other);
        assert_eq!(classify(b".MTREE").unwrap(), EntryKind::Other);
        assert_eq!(classify(b"usr/share/doc/a.b").unwrap(), EntryKind::Other);

        assert!(matches!(classify(b""), Err(Error::EntryNameMissing)));
        assert!(matches!(classify(b"/etc/passwd"), Err(Error::UnsafePath(_))));
        assert!(matches!(classify(b"../evil"), Err(Error::UnsafePath(_))));
        assert!(matches!(classify(b"usr/../../evil"), Err(Error::UnsafePath(_))));
        assert!(matches!(classify(b"usr/.."), Err(Error::UnsafePath(_))));
        assert!(matches!(classify(b"/.PKGINFO"), Err(Error::UnsafePath(_))));
        assert!(matches!(classify(b"usr/share/doc/a..b"), Err(Error::UnsafePath(_))));
        assert!(matches!(classify(b"..."), Err(Error::UnsafePath(_))));
    }

    #[test]
    fn test_classify_shadow_metadata() {
        for name in [&b"./.PKGINFO"[..], b"sub/.PKGINFO", b".PKGINFO.bak", b".PKGINFO/"] {
            assert!(
                matches!(classify(name), Err(Error::MetadataMisplaced(_))),
                "{:?} should be misplaced",
                String::from_utf8_lossy(name)
            );
        }
    }

    #[test]
    fn test_read_pkginfo_limits() {
        let exact = vec![b'a'; MAX_PKGINFO_SIZE];
        assert_eq!(read_pkginfo(&mut exact.as_slice()).unwrap().len(), MAX_PKGINFO_SIZE);

        let over = vec![b'a'; MAX_PKGINFO_SIZE + 1];
        assert!(matches!(
            read_pkginfo(&mut over.as_slice()),
            Err(Error::MetadataTooLarge { limit: MAX_PKGINFO_SIZE })
        ));

        assert!(matches!(read_pkginfo(&mut io::empty()), Err(Error::MetadataEmpty)));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt stream"))
        }
    }

    #[test]
    fn test_read_pkginfo_error() {
        let mut reader = (&b"pkgname=a\n"[..]).chain(FailingReader);
        assert!(matches!(read_pkginfo(&mut reader), Err(Error::MetadataReadError(_))));
    }

    #[test]
    fn test_line_lengths() {
        let ok = [vec![b'a'; MAX_PKGINFO_LINE], b"\n".to_vec(), vec![b'b'; 10]].concat();
        assert!(check_line_lengths(&ok).is_ok());

        let long_last = [b"a=b\n".to_vec(), vec![b'c'; MAX_PKGINFO_LINE + 1]].concat();
        assert!(matches!(
            check_line_lengths(&long_last),
            Err(Error::LineTooLong { line: 2, length, .. }) if length == MAX_PKGINFO_LINE + 1
        ));
    }

    #[test]
    fn test_empty_stream_fails_to_open() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            extract_metadata(file.path()),
            Err(Error::ArchiveOpenFailed { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = extract_metadata("/nonexistent/package.pkg.tar.zst");
        assert!(matches!(result, Err(Error::ArchiveOpenFailed { .. })));
    }
}
