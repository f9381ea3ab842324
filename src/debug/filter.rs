//! Debug filters and their specification-string parser.
//!
//! A filter specification names registered filters and combines them with
//! `&` and `|`, grouped by parentheses: `"named & show_only_success"`,
//! `"(named | show_only_success) & show"`. The operators have equal
//! precedence and group to the right.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::Arc;

use phf::{Map, phf_map};

use super::{MatchEvent, Phase};
use crate::error::PatternError;

pub type FilterFn = Arc<dyn Fn(&MatchEvent<'_>) -> bool + Send + Sync>;

/// Decides whether a match event is reported.
#[derive(Clone)]
pub enum DebugFilter {
    Hide,
    Show,
    /// Only patterns that carry a name.
    Named,
    /// Every event before a match, and only successes after one.
    OnlySuccess,
    And(Box<DebugFilter>, Box<DebugFilter>),
    Or(Box<DebugFilter>, Box<DebugFilter>),
    Custom(FilterFn),
}

#[derive(Clone, Copy)]
enum BaseFilter {
    Hide,
    Show,
    Named,
    OnlySuccess,
}

/// Filter names accepted in a specification string.
const FILTER_NAME_MAP: Map<&'static str, BaseFilter> = phf_map! {
    "false" => BaseFilter::Hide,
    "hide" => BaseFilter::Hide,
    "named" => BaseFilter::Named,
    "off" => BaseFilter::Hide,
    "on" => BaseFilter::Show,
    "show" => BaseFilter::Show,
    "show_only_success" => BaseFilter::OnlySuccess,
    "true" => BaseFilter::Show,
};

impl DebugFilter {
    /// Parse a filter specification string.
    pub fn parse(spec: &str) -> Result<Self, PatternError> {
        let mut parser = Parser {
            spec,
            chars: spec.char_indices().peekable(),
        };
        let filter = parser.parse_expr()?;
        parser.skip_space();
        match parser.chars.peek() {
            None => Ok(filter),
            Some(&(pos, _)) => Err(parser.error_at(pos)),
        }
    }

    pub fn custom(f: impl Fn(&MatchEvent<'_>) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn and(self, other: DebugFilter) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: DebugFilter) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    pub fn allows(&self, event: &MatchEvent<'_>) -> bool {
        match self {
            Self::Hide => false,
            Self::Show => true,
            Self::Named => event.pattern.name().is_some(),
            Self::OnlySuccess => match event.phase {
                Phase::Before => true,
                Phase::After(result) => result.is_some(),
            },
            Self::And(a, b) => a.allows(event) && b.allows(event),
            Self::Or(a, b) => a.allows(event) || b.allows(event),
            Self::Custom(f) => f(event),
        }
    }
}

impl From<bool> for DebugFilter {
    fn from(show: bool) -> Self {
        if show { Self::Show } else { Self::Hide }
    }
}

impl BaseFilter {
    fn into_filter(self) -> DebugFilter {
        match self {
            Self::Hide => DebugFilter::Hide,
            Self::Show => DebugFilter::Show,
            Self::Named => DebugFilter::Named,
            Self::OnlySuccess => DebugFilter::OnlySuccess,
        }
    }
}

impl fmt::Display for DebugFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operand = |f: &mut fmt::Formatter<'_>, filter: &DebugFilter| match filter {
            Self::And(..) | Self::Or(..) => write!(f, "({filter})"),
            _ => write!(f, "{filter}"),
        };
        match self {
            Self::Hide => f.write_str("hide"),
            Self::Show => f.write_str("show"),
            Self::Named => f.write_str("named"),
            Self::OnlySuccess => f.write_str("show_only_success"),
            Self::And(a, b) => {
                operand(f, a)?;
                f.write_str(" & ")?;
                operand(f, b)
            }
            Self::Or(a, b) => {
                operand(f, a)?;
                f.write_str(" | ")?;
                operand(f, b)
            }
            Self::Custom(_) => f.write_str("<custom>"),
        }
    }
}

impl fmt::Debug for DebugFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DebugFilter({self})")
    }
}

struct Parser<'a> {
    spec: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    /// `expr := term [('&' | '|') expr]`
    fn parse_expr(&mut self) -> Result<DebugFilter, PatternError> {
        let left = self.parse_term()?;
        self.skip_space();
        match self.chars.peek() {
            Some(&(_, '&')) => {
                self.chars.next();
                Ok(left.and(self.parse_expr()?))
            }
            Some(&(_, '|')) => {
                self.chars.next();
                Ok(left.or(self.parse_expr()?))
            }
            _ => Ok(left),
        }
    }

    /// `term := '(' expr ')' | name`
    fn parse_term(&mut self) -> Result<DebugFilter, PatternError> {
        self.skip_space();
        match self.chars.peek() {
            Some(&(_, '(')) => {
                self.chars.next();
                let inner = self.parse_expr()?;
                self.skip_space();
                match self.chars.next() {
                    Some((_, ')')) => Ok(inner),
                    Some((pos, _)) => Err(self.error_at(pos)),
                    None => Err(self.error_at(self.spec.len())),
                }
            }
            Some(&(_, c)) if c.is_alphabetic() || c == '_' => {
                let name = self.parse_name();
                FILTER_NAME_MAP
                    .get(name.as_str())
                    .map(|base| base.into_filter())
                    .ok_or(PatternError::UnknownDebugFilter(name))
            }
            Some(&(pos, _)) => Err(self.error_at(pos)),
            None => Err(self.error_at(self.spec.len())),
        }
    }

    fn parse_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        name
    }

    fn skip_space(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn error_at(&self, position: usize) -> PatternError {
        PatternError::InvalidDebugFilter {
            spec: self.spec.to_string(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(s: &str) -> String {
        DebugFilter::parse(s).expect("parse should succeed").to_string()
    }
    fn parse_err(s: &str) -> PatternError {
        DebugFilter::parse(s).expect_err("parse should fail")
    }

    #[test]
    fn single_names_and_aliases() {
        assert_eq!(parse_ok("show"), "show");
        assert_eq!(parse_ok("on"), "show");
        assert_eq!(parse_ok("true"), "show");
        assert_eq!(parse_ok("off"), "hide");
        assert_eq!(parse_ok("false"), "hide");
        assert_eq!(parse_ok(" named "), "named");
        assert_eq!(parse_ok("show_only_success"), "show_only_success");
    }

    #[test]
    fn operators_group_to_the_right() {
        assert_eq!(
            parse_ok("named & show | hide"),
            "named & (show | hide)"
        );
        assert_eq!(
            parse_ok("(named & show) | hide"),
            "(named & show) | hide"
        );
        assert_eq!(parse_ok("((named))"), "named");
    }

    #[test]
    fn unknown_name() {
        assert_eq!(
            parse_err("named & loud"),
            PatternError::UnknownDebugFilter("loud".to_string())
        );
    }

    #[test]
    fn malformed_specs() {
        assert_eq!(
            parse_err("named &"),
            PatternError::InvalidDebugFilter {
                spec: "named &".to_string(),
                position: 7
            }
        );
        assert!(matches!(
            parse_err("(named"),
            PatternError::InvalidDebugFilter { position: 6, .. }
        ));
        assert!(matches!(
            parse_err("named show"),
            PatternError::InvalidDebugFilter { position: 6, .. }
        ));
        assert!(matches!(
            parse_err(""),
            PatternError::InvalidDebugFilter { position: 0, .. }
        ));
    }
}
