/// Reading reaction tasks from JSON files
pub mod load_from_file;
/// Terminal and file logging set up from the settings
pub mod logger;
