// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use aegis_config::load_config;

use crate::cli::{Cli, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command.
///
/// Loads the configuration (which includes structural validation), then runs
/// every enabled module's own side-effect-free `validate_config`, so
/// resource-specific mistakes surface here instead of at startup.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config = load_config(&cli.config)?;

    for name in config
        .enabled_modules
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        let module = crate::runtime::module_instance(name)?;
        let module_config = config.module_config(name)?;
        module.validate_config(&module_config)?;
        println!("  module {}: ok", name);
    }

    if args.show_config {
        let rendered = serde_yaml::to_string(&config)
            .map_err(|err| BinError::runtime(format!("failed to render config: {}", err)))?;
        println!("\n{}", rendered);
    }

    println!("Configuration is valid: {}", cli.config.display());
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli_for(path: &std::path::Path) -> Cli {
        use clap::Parser;
        Cli::parse_from(["aegis", "-c", path.to_str().unwrap()])
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
enabled_modules: "mysql"
modules:
  - module: mysql
    host: db.internal
    port: 3306
    user: aegis
    password: secret
"#
        )
        .unwrap();

        validate(&cli_for(file.path()), ValidateArgs::default()).unwrap();
    }

    #[test]
    fn test_validate_rejects_missing_module_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "enabled_modules: \"mysql\"\n").unwrap();

        let err = validate(&cli_for(file.path()), ValidateArgs::default()).unwrap_err();
        assert!(matches!(err, BinError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_unparseable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "enabled_modules: [unclosed").unwrap();

        let err = validate(&cli_for(file.path()), ValidateArgs::default()).unwrap_err();
        assert!(matches!(err, BinError::Config(_)));
    }
}
