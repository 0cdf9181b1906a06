use std::fmt;

#[derive(Debug)]
pub enum IoError {
    /// File could not be opened or is not a recognized workbook.
    Open { path: String, message: String },
    /// Requested sheet is not in the workbook.
    SheetNotFound {
        path: String,
        sheet: String,
        available: Vec<String>,
    },
    /// Sheet or file contents could not be read.
    Read { path: String, message: String },
    /// Output could not be written.
    Write { path: String, message: String },
    /// Path or operation not supported for this file type.
    Unsupported(String),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { path, message } => write!(f, "cannot open {path}: {message}"),
            Self::SheetNotFound {
                path,
                sheet,
                available,
            } => {
                write!(f, "{path}: no sheet named '{sheet}'")?;
                if !available.is_empty() {
                    write!(f, " (available: {})", available.join(", "))?;
                }
                Ok(())
            }
            Self::Read { path, message } => write!(f, "cannot read {path}: {message}"),
            Self::Write { path, message } => write!(f, "cannot write {path}: {message}"),
            Self::Unsupported(msg) => write!(f, "unsupported: {msg}"),
        }
    }
}

impl std::error::Error for IoError {}
