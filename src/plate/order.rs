//! Natural ordering of well identifiers

use std::cmp::Ordering;

enum Token<'a> {
    Text(&'a str),
    Digits(&'a str),
}

/// Alternating runs starting with a (possibly empty) non-digit run
fn tokens(s: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut digits = false;
    for (i, ch) in s.char_indices() {
        if ch.is_ascii_digit() != digits {
            out.push(if digits {
                Token::Digits(&s[start..i])
            } else {
                Token::Text(&s[start..i])
            });
            start = i;
            digits = !digits;
        }
    }
    out.push(if digits {
        Token::Digits(&s[start..])
    } else {
        Token::Text(&s[start..])
    });
    out
}

/// Numeric comparison of two digit runs of any length
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Compare well identifiers so that "A2" < "A10" < "B1"
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ta = tokens(a);
    let tb = tokens(b);
    for (x, y) in ta.iter().zip(tb.iter()) {
        let ord = match (x, y) {
            (Token::Text(x), Token::Text(y)) => x.cmp(y),
            (Token::Digits(x), Token::Digits(y)) => cmp_digits(x, y),
            // runs alternate from the same starting kind, so kinds always line up
            _ => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ta.len().cmp(&tb.len())
}

/// Wells sorted as they appear on the plate
pub fn order_wells<I, S>(wells: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut wells: Vec<String> = wells.into_iter().map(Into::into).collect();
    wells.sort_by(|a, b| natural_cmp(a, b));
    wells
}
