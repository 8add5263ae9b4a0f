//! Text normalization.
//!
//! Service notices arrive dressed in client formatting and mixed case;
//! pattern matching wants neither. Stripping happens before classification,
//! casefolding before any identifier is stored or compared.

/// Strip mIRC formatting control codes from a message.
///
/// Removes bold, italic, underline, strikethrough, monospace, reverse and
/// reset bytes, plus both color forms: `\x03` with optional `fg[,bg]`
/// decimal digits and `\x04` with hex digits.
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{02}' | '\u{1d}' | '\u{1f}' | '\u{1e}' | '\u{11}' | '\u{16}' | '\u{0f}' => {}
            '\u{03}' => consume_color(&mut chars, 2, |d| d.is_ascii_digit()),
            '\u{04}' => consume_color(&mut chars, 6, |d| d.is_ascii_hexdigit()),
            _ => out.push(c),
        }
    }
    out
}

/// Consume a `fg[,bg]` color argument after a color introducer.
///
/// The comma is only part of the code when digits follow it.
fn consume_color<I, F>(chars: &mut std::iter::Peekable<I>, max_digits: usize, is_digit: F)
where
    I: Iterator<Item = char> + Clone,
    F: Fn(char) -> bool,
{
    for _ in 0..max_digits {
        if chars.peek().copied().is_some_and(&is_digit) {
            chars.next();
        } else {
            break;
        }
    }
    if chars.peek() == Some(&',') {
        let mut ahead = chars.clone();
        ahead.next();
        if ahead.peek().copied().is_some_and(&is_digit) {
            chars.next();
            for _ in 0..max_digits {
                if chars.peek().copied().is_some_and(&is_digit) {
                    chars.next();
                } else {
                    break;
                }
            }
        }
    }
}

/// RFC 1459 case normalization: ASCII lowercase plus the bracket set
/// (`[` `]` `\` `~` fold to `{` `}` `|` `^`).
pub fn casefold(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '[' => '{',
            ']' => '}',
            '\\' => '|',
            '~' => '^',
            _ => c.to_ascii_lowercase(),
        })
        .collect()
}
