use crate::core::strings::first_quoted;
use crate::types::database::Database;

/// `VERSION "<text>"`
pub(crate) fn decode(db: &mut Database, line: &str) {
    if let Some(version) = first_quoted(line) {
        db.version = version;
    }
}
