// The interpreter error unit. One non-trappable kind per failure class; the
// statement boundary is the single place where a pending error is reported.
// The trappable status lives on the interpreter itself and is reachable from
// BASIC through @S.

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error {
    Unknown,
    Number,
    Divide,
    Line,
    Return,
    Next,
    Gosub,
    For,
    OutOfMemory,
    Stack,
    Dim,
    Range,
    String,
    Variable,
    File,
    Function,
    Args,
    Eeprom,
    SdCard,
}

impl Error {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Syntax",
            Self::Number => "Number",
            Self::Divide => "Div by 0",
            Self::Line => "Unknown Line",
            Self::Return => "Return",
            Self::Next => "Next",
            Self::Gosub => "GOSUB",
            Self::For => "FOR",
            Self::OutOfMemory => "Memory",
            Self::Stack => "Stack",
            Self::Dim => "DIM",
            Self::Range => "Range",
            Self::String => "String",
            Self::Variable => "Variable",
            Self::File => "File",
            Self::Function => "Function",
            Self::Args => "Args",
            Self::Eeprom => "EEPROM",
            Self::SdCard => "SD card",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
