//! authkeys-core
//!
//! Key-line parsing/templating and the TOML configuration model.

mod codec;
mod config;

pub use codec::{Template, parse, render};
pub use config::{
    CONFIG_ENV, CacheSettings, Config, EXAMPLE_CONFIG, Scope, ScopedConfig, default_config_path,
    load_config_from_file, parse_config, write_default_config_file,
};
