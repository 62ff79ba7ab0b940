//! Public-link slugs.

use sha2::{Digest, Sha256};

/// Length of a slug in hex characters.
pub const SLUG_LEN: usize = 20;

/// Retry bound before giving up on a slug.
const MAX_ATTEMPTS: usize = 64;

fn digest(input: &str) -> String {
    let mut hex = hex::encode(Sha256::digest(input.as_bytes()));
    hex.truncate(SLUG_LEN);
    hex
}

/// Generate a slug for `name` + `id` that `taken` rejects no more.
///
/// The first candidate hashes `name` followed by `id`. Each retry appends
/// the previous candidate to that input. Returns None when every attempt
/// collided.
pub fn generate(name: &str, id: i64, taken: impl Fn(&str) -> bool) -> Option<String> {
    let seed = format!("{name}{id}");
    let mut slug = digest(&seed);
    for _ in 0..MAX_ATTEMPTS {
        if !taken(&slug) {
            return Some(slug);
        }
        slug = digest(&format!("{seed}{slug}"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_is_truncated_sha256() {
        let slug = generate("Reports", 7, |_| false).unwrap();
        assert_eq!(slug.len(), SLUG_LEN);
        assert!(slug.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(slug, digest("Reports7"));
    }

    #[test]
    fn test_collision_appends_previous_slug() {
        let first = digest("Reports7");
        let slug = generate("Reports", 7, |s| s == first).unwrap();
        assert_eq!(slug, digest(&format!("Reports7{first}")));
    }

    #[test]
    fn test_gives_up_when_everything_collides() {
        assert!(generate("x", 1, |_| true).is_none());
    }
}
