use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

// The final set of errors and warnings emitted while analysing routines
#[derive(Debug, Default)]
pub struct AnalysisMessages {
    pub errors: Vec<AnalysisError>,
    pub warnings: Vec<String>,
}

impl AnalysisMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_error(error: AnalysisError) -> Self {
        Self {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum ErrorMetaDataKey {
    AnalysisStage,
    Region,
    Node,
    Instruction,
    Variable,

    // Optional suggestions
    PrimarySuggestion,
    AlternativeSuggestion,
}

/// Where an error was raised: which routine (and optionally which file) it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLocation {
    pub file: Option<PathBuf>,
    pub routine: String,
}

impl ErrorLocation {
    pub fn new(routine: impl Into<String>) -> Self {
        Self {
            file: None,
            routine: routine.into(),
        }
    }

    pub fn with_file(mut self, file: PathBuf) -> Self {
        self.file = Some(file);
        self
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) if self.routine.is_empty() => write!(f, "{}", file.display()),
            Some(file) => write!(f, "{} ({})", file.display(), self.routine),
            None => write!(f, "{}", self.routine),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisError {
    pub msg: String,
    pub location: ErrorLocation,
    pub error_type: ErrorType,

    // Structured context for tools that read errors programmatically
    pub metadata: HashMap<ErrorMetaDataKey, &'static str>,
}

impl AnalysisError {
    pub fn new(msg: impl Into<String>, location: ErrorLocation, error_type: ErrorType) -> Self {
        AnalysisError {
            msg: msg.into(),
            location,
            error_type,
            metadata: HashMap::new(),
        }
    }

    /// A caller broke an engine precondition. Results built past this point would be unsound.
    pub fn contract(msg: impl Into<String>, location: ErrorLocation) -> Self {
        Self::new(msg, location, ErrorType::Contract)
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(msg, ErrorLocation::default(), ErrorType::Config)
    }

    pub fn file_error(path: &std::path::Path, msg: impl Into<String>) -> Self {
        Self::new(
            msg,
            ErrorLocation::default().with_file(path.to_path_buf()),
            ErrorType::File,
        )
    }

    pub fn description_error(msg: impl Into<String>, location: ErrorLocation) -> Self {
        Self::new(msg, location, ErrorType::Description)
    }

    pub fn with_file_path(mut self, file: PathBuf) -> Self {
        self.location.file = Some(file);
        self
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: &'static str) {
        self.metadata.insert(key, value);
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}]",
            error_type_to_str(&self.error_type),
            self.msg,
            self.location
        )
    }
}

impl std::error::Error for AnalysisError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Contract,
    Config,
    File,
    Description,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::Contract => "Analysis Contract Violation",
        ErrorType::Config => "Malformed Config",
        ErrorType::File => "File Error",
        ErrorType::Description => "Malformed Routine Description",
    }
}

/// Returns a new AnalysisError for a broken engine precondition.
///
/// Contract errors mean the caller handed the engine something malformed (a dangling region
/// reference, a query for a node that was never solved). The analysis stops immediately.
///
/// Usage:
/// `return_contract_error!(format!("region {} has no parent", id), location, {
///     AnalysisStage => "Region Validation",
/// })`;
#[macro_export]
macro_rules! return_contract_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::analysis_messages::analysis_errors::AnalysisError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::analysis_messages::analysis_errors::ErrorType::Contract,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::analysis_messages::analysis_errors::ErrorMetaDataKey::$key, $value); )*
                map
            },
        })
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::analysis_messages::analysis_errors::AnalysisError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::analysis_messages::analysis_errors::ErrorType::Contract,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new AnalysisError for a routine description that can't be turned into a region tree.
///
/// Usage:
/// `return_description_error!(format!("unknown variable '{}'", name), location, {
///     Variable => "x",
///     PrimarySuggestion => "Declare the variable in a [[routine.variable]] table",
/// })`;
#[macro_export]
macro_rules! return_description_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::analysis_messages::analysis_errors::AnalysisError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::analysis_messages::analysis_errors::ErrorType::Description,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::analysis_messages::analysis_errors::ErrorMetaDataKey::$key, $value); )*
                map
            },
        })
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::analysis_messages::analysis_errors::AnalysisError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::analysis_messages::analysis_errors::ErrorType::Description,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new AnalysisError for an unreadable or malformed config file.
///
/// Usage: `return_config_error!("unknown key 'foo'")`;
#[macro_export]
macro_rules! return_config_error {
    ($msg:expr) => {
        return Err($crate::analysis_messages::analysis_errors::AnalysisError::config_error($msg))
    };
}
