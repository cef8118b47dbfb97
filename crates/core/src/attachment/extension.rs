//! File extension allow-list.
//!
//! Only the extension of the client-supplied file name is ever used, and the
//! value kept is the allow-list's own `'static` entry, never client text.

/// Extensions accepted for upload. Matching is case-sensitive.
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// Form field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// Field error for a disallowed extension.
pub const PROHIBITED_FILE_TYPE: &str = "This file type is prohibited";

/// Field error for a missing file part.
pub const FILE_REQUIRED: &str = "A file is required";

/// Extension of the last segment of `path`, including the dot.
///
/// Empty when the segment has no dot or ends with one. Both `/` and `\` count
/// as separators, so directory parts of a client-supplied name are ignored.
/// Only surrounding double quotes are stripped; whitespace is kept.
#[must_use]
pub fn extension_of(path: &str) -> &str {
    let trimmed = path.trim_matches('"');
    let name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => &name[dot..],
        _ => "",
    }
}

/// The allow-listed extension of `file_name`, if any.
#[must_use]
pub fn allowed_extension(file_name: &str) -> Option<&'static str> {
    let extension = extension_of(file_name);
    ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|allowed| *allowed == extension)
}
