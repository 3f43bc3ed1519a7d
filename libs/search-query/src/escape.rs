//! Phrase escaping for the engine's boolean query syntax.
//!
//! Quoted spans are passed through verbatim. Outside quotes every reserved
//! operator character is escaped with `\`. Terms carrying a wildcard (`*` or
//! `?`) are lower-cased because the engine does not analyse wildcard terms;
//! all other terms keep their case.

/// Characters with operator meaning outside of quoted spans.
const RESERVED: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '~', ':', '\\', '/',
];

pub fn escape_phrase(input: &str) -> String {
    let mut phrase = input.trim().to_string();
    if phrase.matches('"').count() % 2 == 1 {
        phrase.push('"');
    }

    let mut out = String::with_capacity(phrase.len() * 2);
    let mut term = String::new();
    let mut in_quotes = false;

    for c in phrase.chars() {
        if in_quotes {
            out.push(c);
            if c == '"' {
                in_quotes = false;
            }
            continue;
        }
        match c {
            '"' => {
                flush_term(&mut term, &mut out);
                in_quotes = true;
                out.push(c);
            }
            c if c.is_whitespace() => {
                flush_term(&mut term, &mut out);
                out.push(c);
            }
            c => term.push(c),
        }
    }
    flush_term(&mut term, &mut out);

    out
}

fn flush_term(term: &mut String, out: &mut String) {
    if term.is_empty() {
        return;
    }
    let wildcard = term.contains(['*', '?']);
    for c in term.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        if wildcard {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    term.clear();
}

/// Number of `"` not preceded by a backslash.
#[cfg(test)]
pub(crate) fn unescaped_quotes(input: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in input.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => count += 1,
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_terms_unchanged() {
        assert_eq!(escape_phrase("  Digital Library "), "Digital Library");
    }

    #[test]
    fn escapes_reserved_outside_quotes() {
        assert_eq!(escape_phrase("title:x"), "title\\:x");
        assert_eq!(escape_phrase("a+b (c)"), "a\\+b \\(c\\)");
        assert_eq!(escape_phrase("10.1000/xyz"), "10.1000\\/xyz");
        assert_eq!(escape_phrase("C:\\dir"), "C\\:\\\\dir");
    }

    #[test]
    fn quoted_spans_are_verbatim() {
        assert_eq!(escape_phrase("\"a:b (c)\" d:e"), "\"a:b (c)\" d\\:e");
    }

    #[test]
    fn odd_quote_count_gets_closed() {
        let escaped = escape_phrase("open \"phrase");
        assert_eq!(escaped, "open \"phrase\"");
        assert_eq!(unescaped_quotes(&escaped) % 2, 0);

        let escaped = escape_phrase("\"one\" \"two");
        assert_eq!(unescaped_quotes(&escaped) % 2, 0);
    }

    #[test]
    fn wildcard_terms_are_lowercased() {
        assert_eq!(escape_phrase("Müller* Schmidt"), "müller* Schmidt");
        assert_eq!(escape_phrase("Te?t"), "te?t");
        assert_eq!(escape_phrase("\"Müller*\""), "\"Müller*\"");
    }

    #[test]
    fn wildcard_with_reserved_character() {
        assert_eq!(escape_phrase("Foo-Bar*"), "foo\\-bar*");
    }
}
