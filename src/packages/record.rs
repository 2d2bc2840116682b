// src/packages/record.rs

//! Validated package metadata

use serde::Serialize;
use std::fmt;

/// Metadata of one package, as read from its `.PKGINFO`
///
/// A record only exists once `pkgname`, `pkgver` and `arch` have all been
/// seen, so the required fields are plain `String`s rather than options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    name: String,
    version: String,
    arch: String,
    description: Option<String>,
    depends: Vec<String>,
    conflicts: Vec<String>,
    provides: Vec<String>,
    size: u64,
}

impl PackageRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        version: String,
        arch: String,
        description: Option<String>,
        depends: Vec<String>,
        conflicts: Vec<String>,
        provides: Vec<String>,
        size: u64,
    ) -> Self {
        Self {
            name,
            version,
            arch,
            description,
            depends,
            conflicts,
            provides,
            size,
        }
    }

    /// Get the package name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the package version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get the target architecture tag (e.g., "x86_64", "any")
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Get the package description, if `pkgdesc` was given
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Packages this package requires, in source order
    pub fn depends(&self) -> &[String] {
        &self.depends
    }

    /// Packages that cannot be installed alongside this one
    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    /// Virtual capabilities this package provides
    pub fn provides(&self) -> &[String] {
        &self.provides
    }

    /// Declared size in bytes, zero when `size` was not given
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Arch: {}", self.arch)?;
        if let Some(desc) = &self.description {
            writeln!(f, "Description: {}", desc)?;
        }
        writeln!(f, "Size: {}", self.size)?;

        for (label, items) in [
            ("Depends", &self.depends),
            ("Conflicts", &self.conflicts),
            ("Provides", &self.provides),
        ] {
            if items.is_empty() {
                continue;
            }
            writeln!(f, "{}:", label)?;
            for item in items {
                writeln!(f, "  - {}", item)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> PackageRecord {
        PackageRecord::new(
            "zlib".to_string(),
            "1.3.1-1".to_string(),
            "x86_64".to_string(),
            None,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            0,
        )
    }

    #[test]
    fn test_display_minimal_record() {
        let text = minimal().to_string();
        assert_eq!(text, "Name: zlib\nVersion: 1.3.1-1\nArch: x86_64\nSize: 0\n");
    }

    #[test]
    fn test_display_lists_and_description() {
        let record = PackageRecord::new(
            "bash".to_string(),
            "5.2.037-1".to_string(),
            "x86_64".to_string(),
            Some("The GNU Bourne Again shell".to_string()),
            vec!["glibc".to_string(), "readline".to_string()],
            Vec::new(),
            vec!["sh".to_string()],
            9_437_184,
        );

        let text = record.to_string();
        assert!(text.contains("Description: The GNU Bourne Again shell\n"));
        assert!(text.contains("Size: 9437184\n"));
        assert!(text.contains("Depends:\n  - glibc\n  - readline\n"));
        assert!(!text.contains("Conflicts:"));
        assert!(text.ends_with("Provides:\n  - sh\n"));
    }

    #[test]
    fn test_serializes_all_fields() {
        let json = serde_json::to_value(minimal()).unwrap();
        assert_eq!(json["name"], "zlib");
        assert_eq!(json["description"], serde_json::Value::Null);
        assert_eq!(json["depends"], serde_json::json!([]));
        assert_eq!(json["size"], 0);
    }
}
