//! Line/field splitting with exact-size output.
//!
//! [`split`] makes two passes over the input: the first counts the non-empty
//! segments, the second fills a vector allocated for exactly that many.

/// Split `text` at every literal occurrence of `delimiter`, dropping empty
/// segments.
///
/// A run of delimiters collapses into one boundary, and leading or trailing
/// delimiters never yield an empty field. An empty `delimiter` means "no
/// boundaries": the whole text is returned as one field (or none if empty).
pub fn split<'a>(text: &'a str, delimiter: &str) -> Vec<&'a str> {
    let count = segments(text, delimiter).count();
    let mut fields = Vec::with_capacity(count);
    fields.extend(segments(text, delimiter));
    fields
}

/// Split into lines on `"\n"`, stripping a trailing `"\r"` from each line.
/// Lines left empty after stripping are dropped.
pub fn split_lines(text: &str) -> Vec<&str> {
    let count = segments(text, "\n")
        .filter(|line| !strip_cr(line).is_empty())
        .count();
    let mut lines = Vec::with_capacity(count);
    lines.extend(
        segments(text, "\n")
            .map(strip_cr)
            .filter(|line| !line.is_empty()),
    );
    lines
}

/// Split one line into space-delimited fields.
pub fn split_fields(line: &str) -> Vec<&str> {
    split(line, " ")
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Iterator over the non-empty segments of `text`.
fn segments<'t, 'd>(text: &'t str, delimiter: &'d str) -> Segments<'t, 'd> {
    Segments {
        rest: text,
        delimiter,
    }
}

struct Segments<'t, 'd> {
    rest: &'t str,
    delimiter: &'d str,
}

impl<'t> Iterator for Segments<'t, '_> {
    type Item = &'t str;

    fn next(&mut self) -> Option<&'t str> {
        if self.delimiter.is_empty() {
            let whole = std::mem::take(&mut self.rest);
            return (!whole.is_empty()).then_some(whole);
        }
        loop {
            if self.rest.is_empty() {
                return None;
            }
            let (segment, rest) = match self.rest.find(self.delimiter) {
                Some(at) => (&self.rest[..at], &self.rest[at + self.delimiter.len()..]),
                None => (self.rest, ""),
            };
            self.rest = rest;
            if !segment.is_empty() {
                return Some(segment);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_fields() {
        assert!(split("", " ").is_empty());
        assert!(split("   ", " ").is_empty());
    }

    #[test]
    fn delimiter_runs_collapse() {
        assert_eq!(split("  v 1.0   2.0 3.0 ", " "), ["v", "1.0", "2.0", "3.0"]);
    }

    #[test]
    fn result_is_exactly_sized() {
        let fields = split("a,b,,c,", ",");
        assert_eq!(fields, ["a", "b", "c"]);
        assert_eq!(fields.capacity(), 3);
    }

    #[test]
    fn multi_char_delimiter_is_literal() {
        // "ab" is a sequence, not a character class.
        assert_eq!(split("xabyaz", "ab"), ["x", "yaz"]);
        assert_eq!(split("aab", "ab"), ["a"]);
        assert_eq!(split("ababx", "ab"), ["x"]);
    }

    #[test]
    fn empty_delimiter_keeps_text_whole() {
        assert_eq!(split("abc", ""), ["abc"]);
        assert!(split("", "").is_empty());
    }

    #[test]
    fn lines_drop_blank_and_crlf() {
        let text = "v 1 2 3\r\n\r\n\nvn 0 0 1\n";
        assert_eq!(split_lines(text), ["v 1 2 3", "vn 0 0 1"]);
    }

    #[test]
    fn joining_fields_reconstructs_text_without_empty_lines() {
        let text = "\n\nv 1 2 3\n\nf 1/1/1 2/2/2 3/3/3\n\n";
        let rebuilt = split(text, "\n").join("\n");
        assert_eq!(rebuilt, "v 1 2 3\nf 1/1/1 2/2/2 3/3/3");
    }

    #[test]
    fn no_field_is_ever_empty() {
        for text in ["", "/", "//", "1//3", "/1/2/", "a/b/c"] {
            assert!(split(text, "/").iter().all(|f| !f.is_empty()), "{text:?}");
        }
    }
}
