//! The single error type of the checker. Every static error carries the location of the node that
//! raised it; an error raised while loading an import wraps the underlying error instead of
//! replacing it.

use core::fmt;
use std::fmt::Display;

use kestrel_location::{ByteRange, Point, Range};

#[derive(Debug, Clone)]
pub enum ErrorKind {
    Static(String),
    Loading { url: String, cause: Box<Error> },
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(s) => write!(f, "{}", s),
            Self::Loading { url, cause } => {
                write!(f, "error encountered while loading {url}\n{}", cause.message)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    message: ErrorKind,
    location: ByteRange,
}

impl Error {
    pub fn new(message: impl Into<String>, location: ByteRange) -> Self {
        Self {
            message: ErrorKind::Static(message.into()),
            location,
        }
    }

    /// Wraps an error that happened while building the unit at `url`.
    pub fn loading(url: impl Into<String>, cause: Self, location: ByteRange) -> Self {
        Self {
            message: ErrorKind::Loading {
                url: url.into(),
                cause: Box::new(cause),
            },
            location,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.message
    }

    pub fn location(&self) -> ByteRange {
        self.location
    }

    /// The innermost error, skipping every loading notice.
    pub fn root_cause(&self) -> &Self {
        match &self.message {
            ErrorKind::Static(_) => self,
            ErrorKind::Loading { cause, .. } => cause.root_cause(),
        }
    }

    pub fn with_code<'a>(self, code: &'a str, file_name: &'a str) -> ErrorWithCode<'a> {
        ErrorWithCode {
            err: self,
            code,
            file_name,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

pub struct ErrorWithCode<'a> {
    err: Error,
    code: &'a str,
    file_name: &'a str,
}

impl<'a> Display for ErrorWithCode<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            err: Error { message, location },
            code,
            file_name,
        } = self;

        // The location of a loading error points at the import, which lives in this file. The
        // cause belongs to another unit and is printed without source context.
        let Range(start @ Point { line, column }, end) = location.locate(code);
        const PAD: usize = 3;

        writeln!(f, "\n[error]: {message}\n")?;
        writeln!(f, "{:>PAD$} ┌─> {file_name}:{start}", "")?;
        writeln!(f, "{:>PAD$} │", "")?;

        for (line, line_number) in code.lines().skip(line).zip(line..=end.line) {
            writeln!(f, "{:>PAD$} │ {}", line_number + 1, line)?;
        }

        if line == end.line && end.column > column {
            let size = end.column - column;
            writeln!(f, "{:>PAD$} │ {:>column$}{:^>size$}", "", "", "")?;
        }

        writeln!(f, "{:>PAD$} │", "")
    }
}
