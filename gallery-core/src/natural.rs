//! Natural ordering for filenames mixing text and numbers.
//!
//! Names are split into alternating runs of non-digits and digits. Digit runs
//! compare by integer value (`image2` < `image10`), text runs compare
//! case-insensitively, and a name whose runs are a strict prefix of another's
//! sorts first.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    Text(&'a str),
    Number(&'a str),
}

fn runs(s: &str) -> Vec<Run<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;
    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                out.push(make_run(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }
    if let Some(digit) = in_digits {
        out.push(make_run(&s[start..], digit));
    }
    out
}

fn make_run(s: &str, digit: bool) -> Run<'_> {
    if digit {
        Run::Number(s)
    } else {
        Run::Text(s)
    }
}

/// Compare two digit strings by value without parsing, so runs of any length
/// are supported.
fn cmp_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    let a = a.chars().flat_map(char::to_lowercase);
    let b = b.chars().flat_map(char::to_lowercase);
    a.cmp(b)
}

/// Natural-order comparison of two names.
///
/// This is a strict weak ordering: distinct names such as `image2` and
/// `Image02` compare equal. Use [`natural_cmp_total`] when a total order is
/// needed.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ra = runs(a);
    let rb = runs(b);
    for (x, y) in ra.iter().zip(rb.iter()) {
        let ord = match (x, y) {
            (Run::Number(x), Run::Number(y)) => cmp_numeric(x, y),
            (Run::Text(x), Run::Text(y)) => cmp_text(x, y),
            // A digit run sorts before a text run at the same position.
            (Run::Number(_), Run::Text(_)) => Ordering::Less,
            (Run::Text(_), Run::Number(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ra.len().cmp(&rb.len())
}

/// [`natural_cmp`] with ties broken by raw byte order.
pub fn natural_cmp_total(a: &str, b: &str) -> Ordering {
    natural_cmp(a, b).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("image2", "image10", Ordering::Less)]
    #[case("image10", "image2", Ordering::Greater)]
    #[case("image2", "Image2", Ordering::Equal)]
    #[case("image00003.jpg", "image00010.jpg", Ordering::Less)]
    #[case("image", "image1", Ordering::Less)]
    #[case("a", "B", Ordering::Less)]
    #[case("img2.png", "img2.jpg", Ordering::Greater)]
    #[case("007", "7", Ordering::Equal)]
    #[case("1a", "a1", Ordering::Less)]
    #[case("", "a", Ordering::Less)]
    #[case("x99999999999999999999999", "x100000000000000000000000", Ordering::Less)]
    fn compares_naturally(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(natural_cmp(a, b), expected);
    }

    #[test]
    fn total_order_breaks_ties_deterministically() {
        assert_eq!(natural_cmp_total("Image2", "image2"), Ordering::Less);
        assert_eq!(natural_cmp_total("image2", "image2"), Ordering::Equal);
    }

    #[test]
    fn sorting_uses_numeric_value() {
        let mut names = vec!["image10.jpg", "image2.jpg", "image1.jpg", "Image3.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, ["image1.jpg", "image2.jpg", "Image3.jpg", "image10.jpg"]);
    }
}
