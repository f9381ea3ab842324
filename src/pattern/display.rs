//! PEG-style rendering of pattern trees.
//!
//! A named sub-pattern renders as `<name>` rather than its body, which also
//! keeps recursive grammars finite.

use std::fmt;
use std::mem::discriminant;

use super::Pattern;
use super::ast::{Kind, RepeatCount};

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.node().kind;
        let child = |f: &mut fmt::Formatter<'_>, p: &Pattern| write_child(f, kind, p);
        match kind {
            Kind::Literal { text, .. } => write!(f, "{text:?}"),
            Kind::Class(set) => write!(f, "{set}"),
            Kind::ExactCount(1) => f.write_str("."),
            Kind::ExactCount(n) => write!(f, ".{{{n}}}"),
            Kind::AtMostEndCount(n) => write!(f, "P(-{n})"),
            Kind::Boolean(b) => write!(f, "{b}"),
            Kind::Function(_) => f.write_str("P(<fn>)"),
            Kind::StartOfLine => f.write_str("SOL()"),
            Kind::EndOfLine => f.write_str("EOL()"),

            Kind::Capture(p) => call(f, "C", &[], Some(p)),
            Kind::Constant(value) => write!(f, "Cc({value})"),
            Kind::Group { pattern, .. } => call(f, "Cg", &[], Some(pattern)),
            Kind::Position => f.write_str("Cp()"),
            Kind::Line => f.write_str("Cl()"),
            Kind::Column => f.write_str("Col()"),
            Kind::BackCapture {
                name,
                pattern,
                capture_index,
            } => {
                let index = capture_index.map(|i| i.to_string());
                let mut args = vec![name.as_str()];
                args.extend(index.as_deref());
                call(f, "Cb", &args, pattern.as_ref())
            }

            Kind::StackCapture { stack, pattern } => call(f, "Sc", &[stack.as_str()], Some(pattern)),
            Kind::StackPop { stack, count } => write!(f, "Sp({stack}, {count})"),
            Kind::StackMatch {
                stack,
                index,
                expected: None,
            } => write!(f, "Sm({stack}, {index})"),
            Kind::StackMatch {
                stack,
                index,
                expected: Some(expected),
            } => write!(f, "Sm({stack}, {index}, {expected})"),
            Kind::StackSize {
                stack,
                expected: None,
            } => write!(f, "Ssz({stack})"),
            Kind::StackSize {
                stack,
                expected: Some(n),
            } => write!(f, "Ssz({stack}, {n})"),

            Kind::Sequence(items) => separated(f, items, " ", child),
            Kind::Choice(items) => separated(f, items, " / ", child),
            Kind::Not(p) => {
                f.write_str("!")?;
                child(f, p)
            }
            Kind::LookAhead(p) => {
                f.write_str("&")?;
                child(f, p)
            }
            Kind::Repeat { pattern, count } => {
                child(f, pattern)?;
                match *count {
                    RepeatCount::AtLeast(0) => f.write_str("*"),
                    RepeatCount::AtLeast(1) => f.write_str("+"),
                    RepeatCount::AtMost(1) => f.write_str("?"),
                    RepeatCount::AtLeast(n) => write!(f, "{{{n},}}"),
                    RepeatCount::AtMost(n) => write!(f, "{{,{n}}}"),
                    RepeatCount::Exactly(n) => write!(f, "{{{n}}}"),
                }
            }
            Kind::Reference(reference) => write!(f, "<{}>", reference.name),
            Kind::Select {
                pattern,
                index,
                default: None,
            } => write!(f, "({pattern})/{index}"),
            Kind::Select {
                pattern,
                index,
                default: Some(default),
            } => write!(f, "({pattern})/({index}, {default})"),
            Kind::Wrap { pattern, .. } => write!(f, "({pattern})/<fn>"),
        }
    }
}

/// Render a sub-pattern of `parent`, parenthesized when it binds more
/// loosely, or equally loosely with a different operator.
fn write_child(f: &mut fmt::Formatter<'_>, parent: &Kind, p: &Pattern) -> fmt::Result {
    if let Some(name) = p.name() {
        return write!(f, "<{name}>");
    }
    let kind = &p.node().kind;
    let needs_parens = kind.precedence() > parent.precedence()
        || (kind.precedence() == parent.precedence()
            && kind.precedence() > 1
            && discriminant(kind) != discriminant(parent));
    if needs_parens {
        write!(f, "({p})")
    } else {
        write!(f, "{p}")
    }
}

fn separated(
    f: &mut fmt::Formatter<'_>,
    items: &[Pattern],
    separator: &str,
    child: impl Fn(&mut fmt::Formatter<'_>, &Pattern) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        child(f, item)?;
    }
    Ok(())
}

/// Call-style rendering: `C(a)`, `Cb(name, a)`.
fn call(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    args: &[&str],
    pattern: Option<&Pattern>,
) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(arg)?;
    }
    if let Some(p) = pattern {
        if !args.is_empty() {
            f.write_str(", ")?;
        }
        match p.name() {
            Some(name) => write!(f, "<{name}>")?,
            None => write!(f, "{p}")?,
        }
    }
    f.write_str(")")
}

#[cfg(test)]
mod tests {
    use crate::pattern::*;

    fn show(p: &Pattern) -> String {
        p.to_string()
    }

    #[test]
    fn primitives() {
        assert_eq!(show(&lit("a\"b")), r#""a\"b""#);
        assert_eq!(show(&set("abc")), "[abc]");
        assert_eq!(show(&range(&[('0', '9')]).unwrap()), "[0-9]");
        assert_eq!(show(&any(1)), ".");
        assert_eq!(show(&any(3)), ".{3}");
        assert_eq!(show(&count(-2)), "P(-2)");
        assert_eq!(show(&always()), "true");
        assert_eq!(show(&sol()), "SOL()");
    }

    #[test]
    fn precedence_adds_parentheses() {
        let p = seq([lit("a"), choice([lit("b"), lit("c")])]);
        assert_eq!(show(&p), r#""a" ("b" / "c")"#);
        let p = choice([seq([lit("a"), lit("b")]), lit("c")]);
        assert_eq!(show(&p), r#""a" "b" / "c""#);
        let p = repeat(seq([lit("a"), lit("b")]), 0);
        assert_eq!(show(&p), r#"("a" "b")*"#);
        let p = not(repeat(lit("a"), 1));
        assert_eq!(show(&p), r#"!"a"+"#);
    }

    #[test]
    fn repeat_forms() {
        assert_eq!(show(&repeat(lit("a"), -1)), r#""a"?"#);
        assert_eq!(show(&repeat(lit("a"), 2)), r#""a"{2,}"#);
        assert_eq!(show(&repeat(lit("a"), -3)), r#""a"{,3}"#);
        assert_eq!(show(&repeat(lit("a"), [4])), r#""a"{4}"#);
    }

    #[test]
    fn named_children_render_by_name() {
        let word = repeat(set("ab"), 1).named("word");
        let p = seq([word.clone(), lit(" "), word]);
        assert_eq!(show(&p), r#"<word> " " <word>"#);
        assert_eq!(show(&reference("expr")), "<expr>");
    }

    #[test]
    fn calls() {
        assert_eq!(show(&capture(lit("a"))), r#"C("a")"#);
        assert_eq!(show(&back_ref("q")), "Cb(q)");
        assert_eq!(show(&back_capture("q", set("'\""))), r#"Cb(q, ['"])"#);
        assert_eq!(show(&back_capture_at("q", lit("a"), 0)), r#"Cb(q, 0, "a")"#);
        assert_eq!(show(&stack_capture("s", capture(any(1)))), "Sc(s, C(.))");
        assert_eq!(show(&stack_size("s")), "Ssz(s)");
        assert_eq!(show(&stack_pop("s", 2)), "Sp(s, 2)");
        assert_eq!(show(&lit("a").select(-1)), r#"("a")/-1"#);
    }

    #[test]
    fn except_renders_as_assertion() {
        assert_eq!(show(&any(1).except(lit(";"))), r#"!";" ."#);
    }
}
