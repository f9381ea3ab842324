//! Frequently used patterns and match callbacks.

use itertools::Itertools;

use super::char_class::{CharClass, CharSet};
use super::{Pattern, any, choice, class, lit, repeat, set};
use crate::capture::Capture;
use crate::debug::DebugOptions;
use crate::match_result::MatchResult;

/// An ASCII letter.
pub fn alpha() -> Pattern {
    class(CharSet::from_classes(vec![
        CharClass::Range('A', 'Z'),
        CharClass::Range('a', 'z'),
    ]))
}

/// An ASCII digit.
pub fn digit() -> Pattern {
    class(CharSet::from_classes(vec![CharClass::Range('0', '9')]))
}

/// A single or double quote.
pub fn quote() -> Pattern {
    set("\"'")
}

/// A space or tab.
pub fn whitespace() -> Pattern {
    set(" \t")
}

pub fn whitespace0() -> Pattern {
    repeat(whitespace(), 0)
}

pub fn whitespace1() -> Pattern {
    repeat(whitespace(), 1)
}

/// One line terminator: `\r\n`, `\r` or `\n`.
pub fn newline() -> Pattern {
    choice([lit("\r\n"), lit("\r"), lit("\n")])
}

/// Everything up to the first place `pattern` matches, followed by `pattern`
/// itself when `match_after` is set. The scan loop is hidden from debug
/// output.
pub fn match_until(pattern: Pattern, match_after: bool) -> Pattern {
    let before = repeat(
        any(1).except(pattern.clone()).debug(DebugOptions::hide()),
        0,
    );
    if match_after {
        before.then(pattern)
    } else {
        before
    }
}

/// A wrap callback replacing the captures of a match with a single text
/// capture: their text joined by `separator`.
pub fn join(separator: &str) -> impl Fn(MatchResult) -> Option<MatchResult> + Send + Sync + 'static {
    let separator = separator.to_string();
    move |mut m: MatchResult| {
        let joined = m.captures.iter().join(&separator);
        m.captures = vec![Capture::Text(joined)];
        Some(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{capture, seq};

    fn value(p: &Pattern, text: &str) -> Option<String> {
        p.matches(text).unwrap().map(|m| m.value().to_string())
    }

    #[test]
    fn character_helpers() {
        assert_eq!(value(&alpha(), "Q").as_deref(), Some("Q"));
        assert_eq!(value(&alpha(), "1"), None);
        assert_eq!(value(&digit(), "7").as_deref(), Some("7"));
        assert_eq!(value(&quote(), "'x").as_deref(), Some("'"));
        assert_eq!(value(&whitespace1(), " \t x").as_deref(), Some(" \t "));
        assert_eq!(value(&whitespace0(), "x").as_deref(), Some(""));
        assert_eq!(value(&whitespace1(), "x"), None);
    }

    #[test]
    fn newline_prefers_crlf() {
        assert_eq!(value(&newline(), "\r\nx").as_deref(), Some("\r\n"));
        assert_eq!(value(&newline(), "\rx").as_deref(), Some("\r"));
        assert_eq!(value(&newline(), "\n").as_deref(), Some("\n"));
        assert_eq!(value(&newline(), "x"), None);
    }

    #[test]
    fn match_until_stops_before_pattern() {
        let p = match_until(lit("-->"), false);
        assert_eq!(value(&p, "abc --> def").as_deref(), Some("abc "));
        let p = match_until(lit("-->"), true);
        assert_eq!(value(&p, "abc --> def").as_deref(), Some("abc -->"));
        assert_eq!(value(&p, "abc"), None);
    }

    #[test]
    fn join_captures() {
        let p = repeat(capture(any(1)), 1).wrap(join(","));
        let m = p.matches("123").unwrap().unwrap();
        assert_eq!(m.captures, [Capture::from("1,2,3")]);
        let p = seq([capture(lit("a")), capture(lit("b"))]).wrap(join(""));
        assert_eq!(p.matches("ab").unwrap().unwrap().captures, [Capture::from("ab")]);
    }
}
