//! Tool descriptor types.
//!
//! Built-in and provider-sourced tools share one descriptor shape and are told apart
//! by their [`PluginKey`]: provider tools carry the server they came from.

pub mod types;

pub use types::{
    AuthRequirement, PluginKey, ToolDescriptor, AUTH_FIELD_SEPARATOR, PLUGIN_KEY_DELIMITER,
    USER_PROVIDED,
};
