/// Derive a URL slug: lowercase, runs of non-alphanumeric characters become
/// a single hyphen, leading/trailing hyphens are trimmed.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Rust Meetup 2025"), "rust-meetup-2025");
    }

    #[test]
    fn collapses_symbol_runs_into_one_hyphen() {
        assert_eq!(slugify("Jazz -- & Blues night!"), "jazz-blues-night");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(slugify("  --Open Mic--  "), "open-mic");
    }

    #[test]
    fn empty_and_symbol_only_titles_produce_empty_slugs() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn non_ascii_characters_are_treated_as_separators() {
        assert_eq!(slugify("Café Crawl"), "caf-crawl");
    }
}
