use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end of input while reading {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("line {line}: expected an integer count for {expected}, found {found:?}")]
    BadCount {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: load vector is not a bracketed list of floats: {found:?}")]
    BadLoadVector { line: usize, found: String },
}
