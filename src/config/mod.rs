//! Configuration for the exporter and CLI.
//!
//! Settings come from a YAML or TOML file; paths in the file may use `~` or
//! be relative to the file itself.

mod loader;
mod path;
mod schema;

pub use loader::{
    default_config_path, load_config, load_config_from_str, load_effective, ConfigFormat,
};
pub use path::{home_dir, resolve_path};
pub use schema::ExporterConfig;
