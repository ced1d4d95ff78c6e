//! Flat tag dialect compiler.
//!
//! Authors write sequences as concatenated bracket tags:
//!
//! ```text
//! [set_data name=f.hp value="f.hp - 10"][state_transition to=dead]
//! ```
//!
//! - `[` and `]` delimit one step; whitespace between tags is ignored
//! - the first word is the action name
//! - `key=value` pairs follow; quoted values may contain spaces and `]`
//! - unquoted `true`/`false` and numbers are typed, quoted values are text
//! - a bare `key` is shorthand for `key=true`
//! - `&{dotted.path}` is kept verbatim here and substituted by the
//!   interpreter right before the step runs
//!
//! The output is a linear [`ActionSequence`] with `branching == false`: flat
//! sequences never follow pins.

use crate::script::error::ScriptError;
use crate::script::sequence::{ActionSequence, ActionStep};
use crate::script::value::Value;

/// Compile flat tag text into a linear sequence.
pub fn compile(text: &str) -> Result<ActionSequence, ScriptError> {
    let mut steps = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c != '[' {
            return Err(ScriptError::ExpectedTagOpen { offset, found: c });
        }
        chars.next();

        // Collect the body of the tag up to the closing bracket, honouring quotes.
        let mut body = String::new();
        let mut in_quote = false;
        let mut escaped = false;
        let mut end = None;
        for (i, ch) in chars.by_ref() {
            if in_quote {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    in_quote = false;
                }
                body.push(ch);
                continue;
            }
            match ch {
                '"' => {
                    in_quote = true;
                    body.push(ch);
                }
                ']' => {
                    end = Some(i);
                    break;
                }
                _ => body.push(ch),
            }
        }
        if in_quote {
            return Err(ScriptError::UnterminatedQuote { offset });
        }
        let Some(end) = end else {
            return Err(ScriptError::UnterminatedTag { offset });
        };

        let source = &text[offset..=end];
        steps.push(parse_tag_body(&body, offset, source)?);
    }

    Ok(ActionSequence::linear(steps))
}

fn parse_tag_body(body: &str, offset: usize, source: &str) -> Result<ActionStep, ScriptError> {
    let tokens = tokenize(body, offset)?;
    let mut iter = tokens.into_iter();
    let name = match iter.next() {
        Some(Token::Bare(name)) if !name.contains('=') => name,
        _ => return Err(ScriptError::MissingActionName { offset }),
    };

    let mut step = ActionStep::new(name, source);
    for token in iter {
        match token {
            Token::Bare(word) => match word.split_once('=') {
                Some((key, raw)) if !key.is_empty() => {
                    step.params.insert(key.to_string(), Value::infer(raw));
                }
                Some(_) => {
                    return Err(ScriptError::MalformedParam { offset, token: word });
                }
                None => {
                    step.params.insert(word, Value::Bool(true));
                }
            },
            Token::Quoted { key, value } => {
                if key.is_empty() {
                    return Err(ScriptError::MalformedParam {
                        offset,
                        token: format!("=\"{}\"", value),
                    });
                }
                step.params.insert(key, Value::Text(value));
            }
        }
    }
    Ok(step)
}

enum Token {
    /// `word` or `key=value` with an unquoted value.
    Bare(String),
    /// `key="quoted value"`.
    Quoted { key: String, value: String },
}

fn tokenize(body: &str, offset: usize) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut word = String::new();
        let mut quoted = None;
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            if c == '"' && word.ends_with('=') {
                let mut value = String::new();
                let mut closed = false;
                while let Some(q) = chars.next() {
                    match q {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        _ => value.push(q),
                    }
                }
                if !closed {
                    return Err(ScriptError::UnterminatedQuote { offset });
                }
                quoted = Some(value);
                break;
            }
            word.push(c);
        }

        match quoted {
            Some(value) => {
                word.pop(); // trailing '='
                tokens.push(Token::Quoted { key: word, value });
            }
            None => tokens.push(Token::Bare(word)),
        }
    }
    Ok(tokens)
}
