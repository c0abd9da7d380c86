//! ` (n)` suffixes for names that repeat within one run

use std::collections::HashSet;

/// File names handed out so far.
///
/// Comparison ignores case, so two names that would land on the same file
/// on a case-insensitive filesystem still get distinct suffixes.
#[derive(Debug, Clone, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`, or the first free `stem (n).ext` variant of it
    pub fn claim(&mut self, name: &str) -> String {
        if self.taken.insert(name.to_lowercase()) {
            return name.to_string();
        }

        let (stem, ext) = split_extension(name);
        let mut counter = 1u32;
        loop {
            let candidate = ext.map_or_else(
                || format!("{stem} ({counter})"),
                |ext| format!("{stem} ({counter}).{ext}"),
            );
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// `report.tar.gz` splits as `report.tar` + `gz`; dotfiles have no extension
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_suffixes_repeats() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim("notes.txt"), "notes.txt");
        assert_eq!(names.claim("notes.txt"), "notes (1).txt");
        assert_eq!(names.claim("NOTES.TXT"), "NOTES (2).TXT");
        assert_eq!(names.claim("notes (1).txt"), "notes (1) (1).txt");
    }

    #[test]
    fn test_claim_without_extension() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim("README"), "README");
        assert_eq!(names.claim("README"), "README (1)");
        assert_eq!(names.claim(".env"), ".env");
        assert_eq!(names.claim(".env"), ".env (1)");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", Some("gz")));
        assert_eq!(split_extension(".bashrc"), (".bashrc", None));
        assert_eq!(split_extension("plain"), ("plain", None));
    }
}
