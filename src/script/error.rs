use thiserror::Error;

/// Errors produced while compiling authored sequences.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("unexpected character '{found}' at offset {offset}, expected '['")]
    ExpectedTagOpen { offset: usize, found: char },

    #[error("unterminated tag starting at offset {offset}")]
    UnterminatedTag { offset: usize },

    #[error("unterminated quoted value in tag at offset {offset}")]
    UnterminatedQuote { offset: usize },

    #[error("tag at offset {offset} has no action name")]
    MissingActionName { offset: usize },

    #[error("malformed parameter '{token}' in tag at offset {offset}")]
    MalformedParam { offset: usize, token: String },

    #[error("graph has no entry node (every node has an incoming connection)")]
    NoEntryNode,

    #[error("graph has {count} entry nodes: {ids:?}")]
    AmbiguousEntry { count: usize, ids: Vec<String> },

    #[error("connection references unknown node '{0}'")]
    UnknownNode(String),

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("node '{node}' has more than one connection on pin '{pin}'")]
    DuplicatePin { node: String, pin: String },
}

/// Errors produced while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{0}' in expression")]
    UnexpectedChar(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,
}
