// src/packages/pkginfo.rs

//! .PKGINFO metadata parser
//!
//! Parses the line-oriented `key = value` format into a [`PackageRecord`].
//! Single-value keys (`pkgname`, `pkgver`, `arch`, `pkgdesc`, `size`) may
//! appear at most once; list keys (`depend`, `conflict`, `provide`) append
//! in source order.

use crate::error::{Error, Result};
use crate::packages::ReadOptions;
use crate::packages::record::PackageRecord;
use tracing::{debug, info};

/// How to treat keys the parser does not recognize
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKeyPolicy {
    /// Log the key and carry on
    #[default]
    Ignore,
    /// Fail with [`Error::UnknownKey`]
    Reject,
}

/// Parse `.PKGINFO` content with default options
pub fn parse(content: &[u8]) -> Result<PackageRecord> {
    parse_with(content, &ReadOptions::default())
}

/// Parse `.PKGINFO` content
///
/// The input is not modified. Any error aborts the whole parse; no partial
/// record is returned. Lines are split and trimmed as bytes; only values of
/// recognized keys have to be UTF-8.
pub fn parse_with(content: &[u8], options: &ReadOptions) -> Result<PackageRecord> {
    let mut builder = PkgInfoBuilder::default();

    for (idx, raw) in content.split(|&b| b == b'\n').enumerate() {
        let line_no = idx + 1;
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

        let line = trim(raw);
        if line.is_empty() {
            continue;
        }

        let eq = line.iter().position(|&b| b == b'=').ok_or_else(|| Error::MalformedLine {
            line: line_no,
            content: String::from_utf8_lossy(line).into_owned(),
        })?;

        let key = trim(&line[..eq]);
        let value = trim(&line[eq + 1..]);
        if key.is_empty() {
            return Err(Error::EmptyKey { line: line_no });
        }

        builder.apply(key, value, line_no, options)?;
    }

    builder.build()
}

/// Trim the C-locale whitespace set (space, \t, \n, \v, \f, \r)
fn trim(bytes: &[u8]) -> &[u8] {
    let is_space = |b: &u8| matches!(*b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r');
    let start = bytes.iter().position(|b| !is_space(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_space(b)).map_or(start, |last| last + 1);
    &bytes[start..end]
}

/// Decode the value of a recognized key
fn text(value: &[u8], line: usize) -> Result<&str> {
    std::str::from_utf8(value).map_err(|_| Error::InvalidUtf8 { line })
}

/// Strict base-10 parse: digits only, no sign, no surrounding garbage
fn parse_size(value: &str) -> Result<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidSize {
            value: value.to_string(),
        });
    }

    value.parse().map_err(|_| Error::InvalidSize {
        value: value.to_string(),
    })
}

/// Staging area for a record under construction
#[derive(Default)]
struct PkgInfoBuilder {
    name: Option<String>,
    version: Option<String>,
    arch: Option<String>,
    description: Option<String>,
    size: Option<u64>,
    depends: Vec<String>,
    conflicts: Vec<String>,
    provides: Vec<String>,
}

impl PkgInfoBuilder {
    fn apply(&mut self, key: &[u8], value: &[u8], line: usize, options: &ReadOptions) -> Result<()> {
        match key {
            b"pkgname" => set_once(&mut self.name, "pkgname", value, line),
            b"pkgver" => set_once(&mut self.version, "pkgver", value, line),
            b"arch" => set_once(&mut self.arch, "arch", value, line),
            b"pkgdesc" => set_once(&mut self.description, "pkgdesc", value, line),
            b"size" => {
                if self.size.is_some() {
                    return Err(Error::DuplicateField { field: "size", line });
                }
                self.size = Some(parse_size(text(value, line)?)?);
                Ok(())
            }
            b"depend" => {
                self.depends.push(text(value, line)?.to_string());
                Ok(())
            }
            b"conflict" => {
                self.conflicts.push(text(value, line)?.to_string());
                Ok(())
            }
            b"provide" => {
                self.provides.push(text(value, line)?.to_string());
                Ok(())
            }
            // Unknown values are never decoded
            _ => match options.unknown_keys {
                UnknownKeyPolicy::Ignore => {
                    info!("Unknown PKGINFO key: {}", String::from_utf8_lossy(key));
                    Ok(())
                }
                UnknownKeyPolicy::Reject => Err(Error::UnknownKey {
                    key: String::from_utf8_lossy(key).into_owned(),
                    line,
                }),
            },
        }
    }

    fn build(self) -> Result<PackageRecord> {
        let (name, version, arch) = match (self.name, self.version, self.arch) {
            (Some(name), Some(version), Some(arch)) => (name, version, arch),
            (name, version, arch) => {
                let missing = [
                    ("pkgname", name.is_none()),
                    ("pkgver", version.is_none()),
                    ("arch", arch.is_none()),
                ]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
                return Err(Error::MissingRequiredFields { missing });
            }
        };

        debug!(
            "Parsed PKGINFO: {} {} [{}] ({} depends, {} conflicts, {} provides)",
            name,
            version,
            arch,
            self.depends.len(),
            self.conflicts.len(),
            self.provides.len()
        );

        Ok(PackageRecord::new(
            name,
            version,
            arch,
            self.description,
            self.depends,
            self.conflicts,
            self.provides,
            self.size.unwrap_or(0),
        ))
    }
}

fn set_once(slot: &mut Option<String>, field: &'static str, value: &[u8], line: usize) -> Result<()> {
    if slot.is_some() {
        return Err(Error::DuplicateField { field, line });
    }
    *slot = Some(text(value, line)?.to_string());
    Ok(())
}
