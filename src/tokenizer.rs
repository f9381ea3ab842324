//! Breaking text into named tokens with a stack of grammars.
//!
//! A [`Grammar`] is an ordered list of [`Rule`]s. At each position the
//! active grammar's rules are tried in order and the first match wins.
//! A switch rule pushes another grammar, which stays active until its end
//! pattern matches; the end pattern is always tried before the grammar's
//! own rules.

use std::collections::HashMap;
use std::iter::FusedIterator;

use log::debug;

use crate::context::{Context, MatchConfig};
use crate::debug::DebugOptions;
use crate::error::{MatchError, PatternError};
use crate::match_result::MatchResult;
use crate::matchable::MatchableString;
use crate::pattern::Pattern;

#[derive(Debug, Clone)]
enum RuleKind {
    Token,
    Skip,
    Switch { grammar: String, end: Pattern },
}

/// One entry of a grammar.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Pattern,
    kind: RuleKind,
}

impl Rule {
    /// A rule whose matches are yielded under the pattern's name.
    pub fn token(pattern: Pattern) -> Self {
        Self {
            pattern,
            kind: RuleKind::Token,
        }
    }

    /// A rule whose matches are consumed without yielding a token.
    pub fn skip(pattern: Pattern) -> Self {
        Self {
            pattern,
            kind: RuleKind::Skip,
        }
    }

    /// A token rule that also makes `grammar` active until `end` matches.
    /// The end match is yielded as a token too.
    pub fn switch(pattern: Pattern, grammar: impl Into<String>, end: Pattern) -> Self {
        Self {
            pattern,
            kind: RuleKind::Switch {
                grammar: grammar.into(),
                end,
            },
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The grammar this rule switches to, if any.
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::Switch { grammar, .. } => Some(grammar),
            _ => None,
        }
    }
}

/// A named, ordered set of rules.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    rules: Vec<Rule>,
}

impl Grammar {
    /// Token and switch rules must be named, as must switch end patterns.
    pub fn new(
        name: impl Into<String>,
        rules: impl IntoIterator<Item = Rule>,
    ) -> Result<Self, PatternError> {
        let name = name.into();
        let rules: Vec<Rule> = rules.into_iter().collect();
        for rule in &rules {
            match &rule.kind {
                RuleKind::Skip => {}
                RuleKind::Token | RuleKind::Switch { .. } if rule.pattern.name().is_none() => {
                    return Err(PatternError::UnnamedToken { grammar: name });
                }
                RuleKind::Switch { end, .. } if end.name().is_none() => {
                    return Err(PatternError::UnnamedEndPattern { grammar: name });
                }
                _ => {}
            }
        }
        Ok(Self { name, rules })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Attach debug options to the rule named `token`, or to every rule
    /// when `token` is `None`.
    pub fn debug(&mut self, options: impl Into<DebugOptions>, token: Option<&str>) {
        let options = options.into();
        for rule in &mut self.rules {
            if token.is_some() && rule.pattern.name() != token {
                continue;
            }
            rule.pattern = rule.pattern.clone().debug(options.clone());
        }
    }
}

/// A set of grammars and the one tokenizing starts in.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    grammars: HashMap<String, Grammar>,
    initial: String,
    end: Option<Pattern>,
    config: MatchConfig,
}

impl Tokenizer {
    /// Every switch rule must name one of `grammars`, and `initial` must be
    /// one of them too.
    pub fn new(
        initial: impl Into<String>,
        grammars: impl IntoIterator<Item = Grammar>,
    ) -> Result<Self, PatternError> {
        let initial = initial.into();
        let mut table = HashMap::new();
        for grammar in grammars {
            if table.contains_key(grammar.name()) {
                return Err(PatternError::DuplicateGrammar(grammar.name));
            }
            table.insert(grammar.name.clone(), grammar);
        }
        if !table.contains_key(&initial) {
            return Err(PatternError::UnknownGrammar(initial));
        }
        for grammar in table.values() {
            if let Some(target) = grammar
                .rules
                .iter()
                .filter_map(Rule::target)
                .find(|target| !table.contains_key(*target))
            {
                return Err(PatternError::UnknownGrammar(target.to_string()));
            }
        }
        Ok(Self {
            grammars: table,
            initial,
            end: None,
            config: MatchConfig::default(),
        })
    }

    /// Stop tokenizing, after yielding it, when `end` matches in the
    /// initial grammar.
    pub fn with_end(mut self, end: Pattern) -> Result<Self, PatternError> {
        if end.name().is_none() {
            return Err(PatternError::UnnamedEndPattern {
                grammar: self.initial,
            });
        }
        self.end = Some(end);
        Ok(self)
    }

    /// Settings applied to every token match.
    pub fn with_config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn grammar(&self, name: &str) -> Option<&Grammar> {
        self.grammars.get(name)
    }

    pub fn grammar_mut(&mut self, name: &str) -> Option<&mut Grammar> {
        self.grammars.get_mut(name)
    }

    pub fn initial(&self) -> &str {
        &self.initial
    }

    /// Tokenize `text` from `index`; a negative index counts from the end.
    pub fn tokens(&self, text: &str, index: isize) -> Result<Tokens<'_>, MatchError> {
        let input = MatchableString::new(text);
        let index = input.normalize_index(index)?;
        let mut active = Vec::new();
        if let Some(grammar) = self.grammars.get(&self.initial) {
            debug!("Entering grammar '{}' at {index}", grammar.name);
            active.push(Active {
                grammar,
                end: self.end.clone(),
                opened_empty_at: None,
            });
        }
        Ok(Tokens {
            tokenizer: self,
            input,
            index,
            active,
            done: false,
        })
    }
}

/// A named match produced by the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub name: String,
    pub result: MatchResult,
}

impl Token {
    fn new(pattern: &Pattern, result: MatchResult) -> Self {
        Self {
            name: pattern.name().unwrap_or_default().to_string(),
            result,
        }
    }

    pub fn value(&self) -> &str {
        self.result.value()
    }
}

struct Active<'a> {
    grammar: &'a Grammar,
    end: Option<Pattern>,
    /// Where a zero-width switch token entered this grammar.
    opened_empty_at: Option<usize>,
}

/// The token stream of one [`Tokenizer::tokens`] call.
///
/// The stream ends when no rule of the active grammar matches, when a
/// token makes no progress, or when the initial grammar's end pattern
/// matches. A match error is yielded once and ends the stream.
pub struct Tokens<'a> {
    tokenizer: &'a Tokenizer,
    input: MatchableString,
    index: usize,
    active: Vec<Active<'a>>,
    done: bool,
}

impl<'a> Tokens<'a> {
    /// Name of the grammar the next token will be read with.
    pub fn current_grammar_name(&self) -> Option<&'a str> {
        self.active.last().map(|active| active.grammar.name())
    }

    /// Position the next token will be read from.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn input(&self) -> &MatchableString {
        &self.input
    }

    /// True once the whole input has been consumed.
    pub fn at_end(&self) -> bool {
        self.index >= self.input.len()
    }

    fn try_match(&mut self, pattern: &Pattern) -> Result<Option<MatchResult>, MatchError> {
        self.input.restore_back_captures(0)?;
        let mut ctx = Context::new(&self.tokenizer.config);
        pattern.match_in(&mut self.input, self.index, &mut ctx)
    }

    fn step(&mut self) -> Result<Option<Token>, MatchError> {
        loop {
            let Some(active) = self.active.last() else {
                return Ok(None);
            };
            let grammar = active.grammar;

            let opened_empty_at = active.opened_empty_at;
            if let Some(end) = active.end.clone()
                && let Some(result) = self.try_match(&end)?
            {
                // Entered and left without consuming anything: the same
                // switch would open again at this position.
                let stalled = result.end == self.index && opened_empty_at == Some(self.index);
                self.index = result.end;
                self.active.pop();
                debug!("Leaving grammar '{}' at {}", grammar.name, self.index);
                if self.active.is_empty() || stalled {
                    self.done = true;
                }
                return Ok(Some(Token::new(&end, result)));
            }

            let mut found = None;
            for rule in &grammar.rules {
                if let Some(result) = self.try_match(&rule.pattern)? {
                    found = Some((rule, result));
                    break;
                }
            }
            let Some((rule, result)) = found else {
                return Ok(None);
            };

            let progressed = result.end > self.index;
            self.index = result.end;
            match &rule.kind {
                RuleKind::Skip if progressed => continue,
                RuleKind::Skip => return Ok(None),
                RuleKind::Token => {
                    if !progressed {
                        self.done = true;
                    }
                }
                RuleKind::Switch { grammar: name, end } => {
                    // Targets are checked when the tokenizer is built.
                    let tokenizer = self.tokenizer;
                    let Some(next) = tokenizer.grammar(name) else {
                        return Ok(None);
                    };
                    debug!("Entering grammar '{name}' at {}", self.index);
                    self.active.push(Active {
                        grammar: next,
                        end: Some(end.clone()),
                        opened_empty_at: (!progressed).then_some(self.index),
                    });
                }
            }
            return Ok(Some(Token::new(&rule.pattern, result)));
        }
    }
}

impl Iterator for Tokens<'_> {
    type Item = Result<Token, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for Tokens<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::common::{alpha, digit, whitespace1};
    use crate::pattern::*;

    fn words_and_numbers() -> Tokenizer {
        let words = Grammar::new(
            "Words",
            [
                Rule::skip(whitespace1()),
                Rule::token(repeat(alpha(), 1).named("word")),
                Rule::switch(lit("(").named("open"), "Numbers", lit(")").named("close")),
            ],
        )
        .unwrap();
        let numbers = Grammar::new(
            "Numbers",
            [
                Rule::skip(whitespace1()),
                Rule::token(repeat(digit(), 1).named("number")),
            ],
        )
        .unwrap();
        Tokenizer::new("Words", [words, numbers]).unwrap()
    }

    fn names_and_values(tokens: Tokens<'_>) -> Vec<(String, String)> {
        tokens
            .map(|t| {
                let t = t.unwrap();
                let value = t.value().to_string();
                (t.name, value)
            })
            .collect()
    }

    #[test]
    fn grammar_switch_round_trip() {
        let tokenizer = words_and_numbers();
        let mut tokens = tokenizer.tokens("cat rat (11 12 13) bat", 0).unwrap();
        let mut seen = Vec::new();
        while let Some(token) = tokens.next() {
            let token = token.unwrap();
            seen.push((
                token.name.clone(),
                token.value().to_string(),
                tokens.current_grammar_name().unwrap_or_default().to_string(),
            ));
        }
        let expected = [
            ("word", "cat", "Words"),
            ("word", "rat", "Words"),
            ("open", "(", "Numbers"),
            ("number", "11", "Numbers"),
            ("number", "12", "Numbers"),
            ("number", "13", "Numbers"),
            ("close", ")", "Words"),
            ("word", "bat", "Words"),
        ];
        let seen: Vec<(&str, &str, &str)> = seen
            .iter()
            .map(|(a, b, c)| (a.as_str(), b.as_str(), c.as_str()))
            .collect();
        assert_eq!(seen, expected);
        assert!(tokens.at_end());
    }

    #[test]
    fn stops_when_nothing_matches() {
        let tokenizer = words_and_numbers();
        let mut tokens = tokenizer.tokens("cat 12", 0).unwrap();
        assert_eq!(tokens.next().unwrap().unwrap().value(), "cat");
        assert!(tokens.next().is_none());
        assert!(tokens.next().is_none());
        assert_eq!(tokens.position(), 4);
        assert!(!tokens.at_end());
    }

    #[test]
    fn zero_width_token_ends_stream() {
        let g = Grammar::new(
            "root",
            [
                Rule::token(lit("a").named("a")),
                Rule::token(always().named("empty")),
            ],
        )
        .unwrap();
        let tokenizer = Tokenizer::new("root", [g]).unwrap();
        let seen = names_and_values(tokenizer.tokens("aab", 0).unwrap());
        assert_eq!(
            seen,
            [
                ("a".to_string(), "a".to_string()),
                ("a".to_string(), "a".to_string()),
                ("empty".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn zero_width_skip_ends_stream() {
        let g = Grammar::new("root", [Rule::skip(repeat(lit(" "), 0))]).unwrap();
        let tokenizer = Tokenizer::new("root", [g]).unwrap();
        assert_eq!(tokenizer.tokens("x", 0).unwrap().count(), 0);
    }

    #[test]
    fn zero_width_switch_and_end_end_stream() {
        let outer = Grammar::new(
            "outer",
            [Rule::switch(always().named("open"), "inner", always().named("close"))],
        )
        .unwrap();
        let inner = Grammar::new("inner", [Rule::token(lit("x").named("x"))]).unwrap();
        let tokenizer = Tokenizer::new("outer", [outer, inner]).unwrap();
        let tokens = tokenizer.tokens("b", 0).unwrap();
        let names: Vec<String> = tokens.take(100).map(|t| t.unwrap().name).collect();
        assert_eq!(names, ["open", "close"]);
    }

    #[test]
    fn zero_width_switch_may_consume_inside() {
        let outer = Grammar::new(
            "outer",
            [
                Rule::token(lit("b").named("b")),
                Rule::switch(lookahead(lit("(")).named("open"), "inner", lit(")").named("close")),
            ],
        )
        .unwrap();
        let inner = Grammar::new("inner", [Rule::token(lit("(").named("paren"))]).unwrap();
        let tokenizer = Tokenizer::new("outer", [outer, inner]).unwrap();
        let seen = names_and_values(tokenizer.tokens("(()b", 0).unwrap());
        let names: Vec<&str> = seen.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["open", "paren", "paren", "close", "b"]);
    }

    #[test]
    fn root_end_pattern_stops_tokenizing() {
        let g = Grammar::new("root", [Rule::token(any(1).named("char"))]).unwrap();
        let tokenizer = Tokenizer::new("root", [g])
            .unwrap()
            .with_end(lit(";").named("stop"))
            .unwrap();
        let seen = names_and_values(tokenizer.tokens("ab;cd", 0).unwrap());
        let names: Vec<&str> = seen.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["char", "char", "stop"]);
    }

    #[test]
    fn starts_at_offset() {
        let tokenizer = words_and_numbers();
        let seen = names_and_values(tokenizer.tokens("cat rat", -3).unwrap());
        assert_eq!(seen, [("word".to_string(), "rat".to_string())]);
        assert!(tokenizer.tokens("cat", 4).is_err());
    }

    #[test]
    fn back_captures_do_not_leak_between_tokens() {
        let quoted = seq([
            back_capture("q", set("'\"")),
            repeat(any(1).except(back_ref("q")), 0),
            back_ref("q"),
        ])
        .named("string");
        let g = Grammar::new(
            "root",
            [Rule::token(quoted), Rule::skip(whitespace1())],
        )
        .unwrap();
        let tokenizer = Tokenizer::new("root", [g]).unwrap();
        let seen = names_and_values(tokenizer.tokens(r#"'a"b' "c'd""#, 0).unwrap());
        let values: Vec<&str> = seen.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(values, [r#"'a"b'"#, r#""c'd""#]);
    }

    #[test]
    fn construction_errors() {
        assert_eq!(
            Grammar::new("g", [Rule::token(lit("a"))]).err(),
            Some(PatternError::UnnamedToken {
                grammar: "g".to_string()
            })
        );
        assert_eq!(
            Grammar::new("g", [Rule::switch(lit("(").named("open"), "h", lit(")"))]).err(),
            Some(PatternError::UnnamedEndPattern {
                grammar: "g".to_string()
            })
        );
        assert!(Grammar::new("g", [Rule::skip(lit(" "))]).is_ok());

        let g = || Grammar::new("g", [Rule::token(lit("a").named("a"))]).unwrap();
        assert_eq!(
            Tokenizer::new("g", [g(), g()]).err(),
            Some(PatternError::DuplicateGrammar("g".to_string()))
        );
        assert_eq!(
            Tokenizer::new("root", [g()]).err(),
            Some(PatternError::UnknownGrammar("root".to_string()))
        );
        let switching = Grammar::new(
            "s",
            [Rule::switch(lit("(").named("open"), "missing", lit(")").named("close"))],
        )
        .unwrap();
        assert_eq!(
            Tokenizer::new("s", [switching]).err(),
            Some(PatternError::UnknownGrammar("missing".to_string()))
        );
        assert!(
            Tokenizer::new("g", [g()])
                .unwrap()
                .with_end(lit("."))
                .is_err()
        );
    }

    #[test]
    fn grammar_debug_targets_one_token() {
        let mut tokenizer = words_and_numbers();
        let words = tokenizer.grammar_mut("Words").unwrap();
        words.debug(DebugOptions::show(), Some("word"));
        let rules = tokenizer.grammar("Words").unwrap().rules();
        assert!(rules[0].pattern().debug_options().is_none());
        assert!(rules[1].pattern().debug_options().is_some());
        assert_eq!(rules[1].pattern().name(), Some("word"));
        assert!(rules[2].pattern().debug_options().is_none());

        let numbers = tokenizer.grammar_mut("Numbers").unwrap();
        numbers.debug(DebugOptions::hide(), None);
        assert!(
            numbers
                .rules()
                .iter()
                .all(|r| r.pattern().debug_options().is_some())
        );
    }

    #[test]
    fn recursion_limit_is_reported() {
        let nest = choice([seq([lit("("), reference("nest"), lit(")")]), lit("")]).named("nest");
        nest.bind([nest.clone()]).unwrap();
        let g = Grammar::new("root", [Rule::token(nest)]).unwrap();
        let tokenizer = Tokenizer::new("root", [g])
            .unwrap()
            .with_config(MatchConfig::default().with_max_depth(8));
        let text = "(".repeat(20);
        let mut tokens = tokenizer.tokens(&text, 0).unwrap();
        assert!(matches!(
            tokens.next(),
            Some(Err(MatchError::RecursionLimit { limit: 8, .. }))
        ));
        assert!(tokens.next().is_none());
    }
}
