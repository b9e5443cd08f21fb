use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("lexer error at line {line}: {message}")]
    Lexical { message: String, line: usize },
    #[error("parser error at line {line}: {message}")]
    Syntax { message: String, line: usize },
    #[error("name error: {message}")]
    Name { message: String },
    #[error("type error: {message}")]
    Type { message: String },
    #[error("arity error: {name}() takes {expected} arguments ({given} given)")]
    Arity {
        name: String,
        expected: usize,
        given: usize,
    },
    #[error("invalid assignment target")]
    AssignmentTarget,
    #[error("no module named '{name}' (available modules: {})", .available.join(", "))]
    ModuleNotFound {
        name: String,
        available: Vec<&'static str>,
    },
    #[error("return outside of a function")]
    TopLevelReturn,
    #[error("runtime error: {message}")]
    Runtime { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of `runtime::run`: the error together with whatever the program
/// printed before failing.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct RunFailure {
    pub output: String,
    pub error: Error,
}

pub fn lexical_error<T>(message: impl Into<String>, line: usize) -> Result<T> {
    Err(Error::Lexical {
        message: message.into(),
        line,
    })
}

pub fn syntax_error<T>(message: impl Into<String>, line: usize) -> Result<T> {
    Err(Error::Syntax {
        message: message.into(),
        line,
    })
}

pub fn name_error<T>(message: impl Into<String>) -> Result<T> {
    Err(Error::Name {
        message: message.into(),
    })
}

pub fn type_error<T>(message: impl Into<String>) -> Result<T> {
    Err(Error::Type {
        message: message.into(),
    })
}

pub fn runtime_error<T>(message: impl Into<String>) -> Result<T> {
    Err(Error::Runtime {
        message: message.into(),
    })
}
