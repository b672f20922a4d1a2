//! Segment file naming.
//!
//! Writers targeting the same tablet directory never coordinate, so names
//! are random v4 UUIDs. Uniqueness is probabilistic.

use uuid::Uuid;

pub const SEGMENT_SUFFIX: &str = ".dat";

/// Generate a fresh `<uuid-v4>.dat` segment name.
pub fn random_segment_filename() -> String {
    format!("{}{}", Uuid::new_v4().hyphenated(), SEGMENT_SUFFIX)
}

/// Whether `name` looks like a name produced by [`random_segment_filename`].
pub fn is_segment_filename(name: &str) -> bool {
    name.strip_suffix(SEGMENT_SUFFIX)
        .filter(|stem| stem.len() == 36)
        .and_then(|stem| Uuid::parse_str(stem).ok())
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_format() {
        let name = random_segment_filename();
        assert_eq!(name.len(), 36 + SEGMENT_SUFFIX.len());
        assert!(is_segment_filename(&name), "{name}");
        let stem = name.strip_suffix(SEGMENT_SUFFIX).unwrap();
        assert_eq!(Uuid::parse_str(stem).unwrap().get_version_num(), 4);
    }

    #[test]
    fn test_names_do_not_repeat() {
        let names: HashSet<String> = (0..10_000).map(|_| random_segment_filename()).collect();
        assert_eq!(names.len(), 10_000);
    }

    #[test]
    fn test_rejects_foreign_names() {
        assert!(!is_segment_filename("00000000.seg"));
        assert!(!is_segment_filename("table.json"));
        assert!(!is_segment_filename("zzzzzzzz-0000-4000-8000-000000000000.dat"));
        // simple form without hyphens
        assert!(!is_segment_filename("67e5504410b1426f9247bb680e5fe0c8.dat"));
    }
}
