//! Property-based tests for upload file name handling.
//!
//! - The stored extension is always an allow-list entry or nothing
//! - Directory components of the client file name never reach the result

use proptest::prelude::*;

use super::extension::{ALLOWED_EXTENSIONS, allowed_extension, extension_of};

/// Strategy for arbitrary client-style file names, separators included.
fn client_file_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ._/\\\\\"-]{0,40}"
}

/// Strategy for one of the allowed extensions.
fn allowed() -> impl Strategy<Value = &'static str> {
    prop::sample::select(ALLOWED_EXTENSIONS.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Whatever the client sends, the accepted extension is one of ours.
    #[test]
    fn prop_accepted_extension_is_allow_listed(name in client_file_name()) {
        if let Some(extension) = allowed_extension(&name) {
            prop_assert!(ALLOWED_EXTENSIONS.contains(&extension));
        }
    }

    /// The extension never contains a path separator.
    #[test]
    fn prop_extension_has_no_separator(name in client_file_name()) {
        let extension = extension_of(&name);
        prop_assert!(!extension.contains('/'));
        prop_assert!(!extension.contains('\\'));
        prop_assert!(extension.is_empty() || extension.starts_with('.'));
    }

    /// Any directory prefix is ignored when the last segment carries an allowed extension.
    #[test]
    fn prop_directories_do_not_affect_extension(
        dirs in prop::collection::vec("[a-z.]{1,8}", 0..4),
        stem in "[a-z0-9]{1,12}",
        extension in allowed(),
        backslash in any::<bool>(),
    ) {
        let separator = if backslash { "\\" } else { "/" };
        let mut name = dirs.join(separator);
        if !name.is_empty() {
            name.push_str(separator);
        }
        name.push_str(&stem);
        name.push_str(extension);

        prop_assert_eq!(allowed_extension(&name), Some(extension));
    }

    /// Trailing whitespace is part of the extension, so it never matches.
    #[test]
    fn prop_trailing_whitespace_is_rejected(
        stem in "[a-z0-9]{1,12}",
        extension in allowed(),
        padding in "[ \t]{1,3}",
    ) {
        let name = format!("{stem}{extension}{padding}");
        prop_assert_eq!(allowed_extension(&name), None);
    }

    /// Upper-casing an allowed extension makes it unacceptable.
    #[test]
    fn prop_matching_is_case_sensitive(stem in "[a-z0-9]{1,12}", extension in allowed()) {
        let name = format!("{stem}{}", extension.to_uppercase());
        prop_assert_eq!(allowed_extension(&name), None);
    }
}
