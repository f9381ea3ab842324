use anyhow::{Context as _, Result, anyhow, bail};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use pegmatch::pattern::common::{alpha, digit, match_until, newline, quote, whitespace1};
use pegmatch::{
    DEFAULT_MAX_DEPTH, DebugOptions, Grammar, MatchConfig, Pattern, PatternError, Rule, Tokenizer,
    any, back_capture, back_ref, capture, choice, lit, repeat, seq, set,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Dump the tokens of a source file", long_about = None)]
struct Args {
    /// File to tokenize; standard input when omitted
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Trace pattern matches, e.g. "named & show_only_success"
    #[arg(short, long, value_name = "FILTER")]
    debug: Option<String>,

    /// Character offset to start from; negative counts from the end
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    offset: isize,

    /// Deepest allowed pattern nesting
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Log grammar transitions
    #[arg(short, long)]
    verbose: bool,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

// ─── Lexer grammar ──────────────────────────────────────────────────────────

/// Opening token, closing token and the grammar active between them.
const BRACKETS: [(&str, &str, &str); 3] = [
    ("(", ")", "paren"),
    ("[", "]", "bracket"),
    ("{", "}", "brace"),
];

fn ident() -> Pattern {
    let start = alpha().or(lit("_"));
    seq([start.clone(), repeat(start.or(digit()), 0)])
}

fn number() -> Pattern {
    let digits = repeat(digit(), 1);
    seq([digits.clone(), repeat(lit(".").then(digits), -1)])
}

/// A string closed by the quote that opened it; the body is captured.
fn string() -> Pattern {
    let escaped = lit("\\").then(any(1));
    let plain = any(1).except(choice([back_ref("q"), lit("\\"), newline()]));
    seq([
        back_capture("q", quote()),
        capture(repeat(escaped.or(plain), 0)),
        back_ref("q"),
    ])
}

fn comment() -> Pattern {
    choice([lit("#"), lit("//")]).then(match_until(newline(), false))
}

fn rules() -> Vec<Rule> {
    let mut rules = vec![
        Rule::skip(whitespace1()),
        Rule::token(newline().named("newline")),
        Rule::token(comment().named("comment")),
        Rule::token(string().named("string")),
        Rule::token(number().named("number")),
        Rule::token(ident().named("ident")),
    ];
    for (open, close, grammar) in BRACKETS {
        rules.push(Rule::switch(
            lit(open).named("open"),
            grammar,
            lit(close).named("close"),
        ));
    }
    rules.push(Rule::token(set("+-*/%=<>!&|^~.,;:?@$").named("punct")));
    rules
}

fn lexer() -> Result<Tokenizer, PatternError> {
    let mut grammars = vec![Grammar::new("code", rules())?];
    for (_, _, name) in BRACKETS {
        grammars.push(Grammar::new(name, rules())?);
    }
    Tokenizer::new("code", grammars)
}

fn main() -> Result<()> {
    let args = Args::parse();

    log::set_logger(&LOGGER).map_err(|err| anyhow!("Failed to install logger: {err}"))?;
    log::set_max_level(if args.verbose || args.debug.is_some() {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });

    let text = match &args.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };

    let mut config = MatchConfig::default().with_max_depth(args.max_depth);
    if let Some(spec) = &args.debug {
        config = config.with_debug(DebugOptions::parse(spec)?);
    }
    let tokenizer = lexer()?.with_config(config);

    let mut tokens = tokenizer.tokens(&text, args.offset)?;
    while let Some(token) = tokens.next() {
        let token = token?;
        let start = token.result.start;
        let input = tokens.input();
        print!(
            "{}:{} {} {:?}",
            input.line_number(start),
            input.column_number(start),
            token.name,
            token.value()
        );
        if token.result.has_captures() {
            print!(" [{}]", token.result.captures.iter().join(", "));
        }
        println!();
    }

    if !tokens.at_end() {
        let input = tokens.input();
        let position = tokens.position();
        bail!(
            "No token matches at {}:{} in grammar '{}'",
            input.line_number(position),
            input.column_number(position),
            tokens.current_grammar_name().unwrap_or("<none>")
        );
    }
    Ok(())
}
