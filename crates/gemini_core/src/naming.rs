use std::collections::HashSet;

use thiserror::Error;

/// Longest slug derived from a title, before any numeric suffix.
pub const MAX_NAME_LENGTH: usize = 100;
/// Highest numeric suffix tried before giving up.
pub const MAX_SUFFIX: u32 = 100;
/// How many prefix matches the bulk lookup asks the store for.
pub const PREFIX_LOOKUP_LIMIT: usize = 100;

/// Read access to the record names that are already taken.
pub trait NameLookup {
    fn name_exists(&self, name: &str) -> bool;

    /// Existing names starting with `prefix`, at most `limit` of them.
    fn names_with_prefix(&self, prefix: &str, limit: usize) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameAllocationError {
    #[error("no usable name characters in {candidate:?}")]
    Empty { candidate: String },
    #[error("names {slug}, {slug}1 .. {slug}{max} are all taken", max = MAX_SUFFIX)]
    Exhausted { slug: String },
}

/// Normalize free text into a record name.
///
/// ASCII letters and digits are kept (lowercased); every other run of
/// characters collapses into a single `-`. Leading and trailing separators are
/// dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if slug.len() > MAX_NAME_LENGTH {
        slug.truncate(MAX_NAME_LENGTH);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

/// Derive a name from `candidate` that no existing record uses.
pub fn allocate_name<L: NameLookup + ?Sized>(
    candidate: &str,
    lookup: &L,
) -> Result<String, NameAllocationError> {
    let slug = slugify(candidate);
    if slug.is_empty() {
        return Err(NameAllocationError::Empty {
            candidate: candidate.to_string(),
        });
    }
    if !lookup.name_exists(&slug) {
        return Ok(slug);
    }

    let taken: HashSet<String> = lookup
        .names_with_prefix(&slug, PREFIX_LOOKUP_LIMIT)
        .into_iter()
        .collect();
    for counter in 1..=MAX_SUFFIX {
        let name = format!("{slug}{counter}");
        // The lookup is capped, so a miss still needs confirming.
        if !taken.contains(&name) && !lookup.name_exists(&name) {
            return Ok(name);
        }
    }
    Err(NameAllocationError::Exhausted { slug })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Names(Vec<String>);

    impl NameLookup for Names {
        fn name_exists(&self, name: &str) -> bool {
            self.0.iter().any(|n| n == name)
        }

        fn names_with_prefix(&self, prefix: &str, limit: usize) -> Vec<String> {
            let mut found: Vec<String> = self
                .0
                .iter()
                .filter(|n| n.starts_with(prefix))
                .cloned()
                .collect();
            found.sort();
            found.truncate(limit);
            found
        }
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Council Owned  Litter--Bins"), "council-owned-litter-bins");
        assert_eq!(slugify("  (Roads) & Paths_2020! "), "roads-paths-2020");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slugify_truncates_long_titles() {
        let title = format!("{} tail", "a".repeat(99));
        let slug = slugify(&title);
        assert_eq!(slug, "a".repeat(99));
    }

    #[test]
    fn unused_slug_is_returned_unchanged() {
        let names = Names(vec!["other".to_string()]);
        assert_eq!(allocate_name("Litter Bins", &names).unwrap(), "litter-bins");
    }

    #[test]
    fn first_free_suffix_is_used() {
        let names = Names(vec![
            "litter-bins".to_string(),
            "litter-bins1".to_string(),
            "litter-bins3".to_string(),
        ]);
        assert_eq!(allocate_name("Litter Bins", &names).unwrap(), "litter-bins2");
    }

    #[test]
    fn truncated_prefix_lookup_is_confirmed_per_candidate() {
        let mut taken = vec!["bins".to_string()];
        taken.extend((1..=60).map(|n| format!("bins{n}")));
        // Sorts ahead of the numbered names and fills the lookup window.
        taken.extend((0..100).map(|n| format!("bins-aaa{n:03}")));
        let names = Names(taken);
        assert_eq!(allocate_name("Bins", &names).unwrap(), "bins61");
    }

    #[test]
    fn exhausted_suffixes_fail() {
        let mut taken = vec!["bins".to_string()];
        taken.extend((1..=MAX_SUFFIX).map(|n| format!("bins{n}")));
        let names = Names(taken);
        assert_eq!(
            allocate_name("Bins", &names),
            Err(NameAllocationError::Exhausted {
                slug: "bins".to_string()
            })
        );
    }

    #[test]
    fn empty_slug_fails() {
        let names = Names(Vec::new());
        assert!(matches!(
            allocate_name("???", &names),
            Err(NameAllocationError::Empty { .. })
        ));
    }
}
