pub mod analysis_dev_logging;
pub mod analysis_errors;
pub mod display_messages;
