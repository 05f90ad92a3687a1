pub mod transcript_log;
pub mod url;
