// Public slug generation
// Every owner gets a short random handle for their public page URL; a
// display-name prefix keeps the link readable when one is available.

use rand::Rng;

const SLUG_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SLUG_RANDOM_LEN: usize = 6;

/// Lowercase `s` and collapse anything that is not a letter or digit into
/// single hyphens.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_hyphen = false;

    for c in s.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    out
}

/// One slug candidate: 6 random lowercase-alphanumeric characters,
/// prefixed with the slugified base when one is given.
pub fn generate_slug(base: Option<&str>) -> String {
    let mut rng = rand::thread_rng();
    let rand: String = (0..SLUG_RANDOM_LEN)
        .map(|_| SLUG_CHARS[rng.gen_range(0..SLUG_CHARS.len())] as char)
        .collect();

    match base.map(slugify).filter(|b| !b.is_empty()) {
        Some(b) => format!("{}-{}", b, rand),
        None => rand,
    }
}

/// Generate slugs until `taken` reports a free one.
///
/// The storage layer supplies the probe; errors from it propagate
/// unchanged.
pub fn unique_slug<E>(
    base: Option<&str>,
    mut taken: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    let mut slug = generate_slug(base);
    while taken(&slug)? {
        slug = generate_slug(base);
    }
    Ok(slug)
}
