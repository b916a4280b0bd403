use crate::analysis_messages::analysis_errors::{
    AnalysisError, AnalysisMessages, ErrorMetaDataKey, ErrorType,
};
use saying::say;

pub fn print_analysis_messages(messages: AnalysisMessages) {
    for err in messages.errors {
        print_formatted_error(err);
    }

    for warning in messages.warnings {
        say!(Yellow "Warning: ", warning);
    }
}

pub fn print_formatted_error(e: AnalysisError) {
    let location = e.location.to_string();

    match e.error_type {
        ErrorType::Contract => {
            say!("\nヽ༼☉ ‿ ⚆༽ﾉ  🔥🔥 ", Dark Magenta location, " 🔥🔥  ╰(° _ o╰) ");
            say!(Yellow "ANALYSIS CONTRACT VIOLATION - ");
            say!(Dark Yellow "the caller handed the engine a malformed routine");
        }
        ErrorType::Config => {
            say!("\n (-_-)  🔥 ", Dark Magenta location, " 🔥  <(^~^)/ ");
            say!(Yellow "CONFIG FILE ISSUE - ");
        }
        ErrorType::File => {
            say!(Yellow "🏚 Can't find/read file or directory: ", location);
        }
        ErrorType::Description => {
            say!("\n(ಠ_ಠ) ", Dark Magenta location);
            say!(Red "Routine description");
        }
    }

    say!(Red e.msg);

    let mut metadata = e.metadata.into_iter().collect::<Vec<_>>();
    metadata.sort_by_key(|(key, _)| *key);
    for (key, value) in metadata {
        let label = metadata_label(key);
        say!(Bright Black label, ": ", value);
    }
}

fn metadata_label(key: ErrorMetaDataKey) -> &'static str {
    match key {
        ErrorMetaDataKey::AnalysisStage => "stage",
        ErrorMetaDataKey::Region => "region",
        ErrorMetaDataKey::Node => "node",
        ErrorMetaDataKey::Instruction => "instruction",
        ErrorMetaDataKey::Variable => "variable",
        ErrorMetaDataKey::PrimarySuggestion => "suggestion",
        ErrorMetaDataKey::AlternativeSuggestion => "alternative",
    }
}
