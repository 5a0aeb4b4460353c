//! Display formatting for field values

use std::borrow::Cow;

/// Shows all-caps values in Title Case, everything else unchanged
///
/// Words are split on single spaces so runs of spaces survive.
pub fn display_value(value: &str) -> Cow<'_, str> {
    if value.is_empty() || value.to_uppercase() != value {
        return Cow::Borrowed(value);
    }
    Cow::Owned(value.split(' ').map(capitalize).collect::<Vec<_>>().join(" "))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
