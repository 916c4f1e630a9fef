//! Toolkit membership.

use toolgate_mcp::{PluginKey, PLUGIN_KEY_DELIMITER};

/// Part of a serialized key before the first delimiter, or the whole key.
pub fn strip_delimiter(key: &str) -> &str {
    key.split_once(PLUGIN_KEY_DELIMITER)
        .map_or(key, |(base, _)| base)
}

/// True if some defined key, with its provider suffix stripped, equals `toolkit_key`.
pub fn has_member<'a>(
    toolkit_key: &str,
    defined_keys: impl IntoIterator<Item = &'a PluginKey>,
) -> bool {
    defined_keys
        .into_iter()
        .any(|key| key.base() == toolkit_key)
}
