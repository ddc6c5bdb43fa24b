/// URL-safe slug: lowercase ASCII letters and digits, runs of anything else
/// collapsed to a single `-`, no leading or trailing `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Slug to try first for a problem.
pub fn base_slug(title: &str, polygon_id: i64) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        format!("problem-{polygon_id}")
    } else {
        slug
    }
}

/// The `attempt`-th slug to try on collision.
///
/// `base`, then `base-{polygon_id}`, then `base-{polygon_id}-2`, `-3`, ...
pub fn slug_candidate(base: &str, polygon_id: i64, attempt: u64) -> String {
    match attempt {
        0 => base.to_string(),
        1 => format!("{base}-{polygon_id}"),
        n => format!("{base}-{polygon_id}-{n}"),
    }
}
