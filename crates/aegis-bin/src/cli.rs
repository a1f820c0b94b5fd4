// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! The binary runs either half of the system:
//!
//! - `server`: the control plane (API, lifecycle manager, sweep) — default
//! - `operator`: a distributed execution agent
//! - `validate`: validate a configuration file without starting anything
//! - `version`: show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// AEGIS - temporary privilege escalation for databases and clusters.
#[derive(Parser, Debug)]
#[command(
    name = "aegis",
    author = "Sylvex <contact@sylvex.io>",
    version = aegis_core::VERSION,
    about = "Temporary privilege escalation control plane and operator",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "aegis.yaml",
        env = "AEGIS_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "info",
        env = "AEGIS_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "AEGIS_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the AEGIS CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the control plane server
    ///
    /// This is the default command when no subcommand is specified. It runs
    /// the HTTP API, the privilege lifecycle manager, and the expiry sweep.
    Server(ServerArgs),

    /// Start an operator agent
    ///
    /// Runs the job poll loop, heartbeats, and the local health/privilege
    /// server for the modules enabled in configuration.
    Operator(OperatorArgs),

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration, including each enabled
    /// module's own settings, without starting anything.
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `server` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ServerArgs {
    /// Override the configured API port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Disable the expiry sweep (grants then only expire via explicit revoke)
    #[arg(long)]
    pub no_sweep: bool,
}

/// Arguments for the `operator` command.
#[derive(Args, Debug, Default, Clone)]
pub struct OperatorArgs {
    /// Override the configured operator id
    #[arg(long, env = "AEGIS_OPERATOR_ID")]
    pub id: Option<String>,

    /// Override the configured control plane URL
    #[arg(long, env = "AEGIS_CONTROL_PLANE_URL")]
    pub control_plane_url: Option<String>,

    /// Override the configured local server port
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Server` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Server(ServerArgs::default()))
    }

    /// Get the effective log level based on flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_server() {
        let cli = Cli::parse_from(["aegis"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Server(_)));
    }

    #[test]
    fn test_operator_command_with_overrides() {
        let cli = Cli::parse_from([
            "aegis",
            "operator",
            "--id",
            "operator-7",
            "--control-plane-url",
            "http://aegis:9090",
        ]);

        if let Some(Commands::Operator(args)) = cli.command {
            assert_eq!(args.id.as_deref(), Some("operator-7"));
            assert_eq!(args.control_plane_url.as_deref(), Some("http://aegis:9090"));
        } else {
            panic!("Expected Operator command");
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["aegis", "validate", "--show-config"]);
        if let Some(Commands::Validate(args)) = cli.command {
            assert!(args.show_config);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["aegis", "-c", "/etc/aegis/config.yaml"]);
        assert_eq!(cli.config, PathBuf::from("/etc/aegis/config.yaml"));
    }

    #[test]
    fn test_quiet_and_verbose_levels() {
        assert_eq!(Cli::parse_from(["aegis", "-q"]).effective_log_level(), "warn");
        assert_eq!(Cli::parse_from(["aegis", "-v"]).effective_log_level(), "debug");
        assert_eq!(
            Cli::parse_from(["aegis", "-l", "trace"]).effective_log_level(),
            "trace"
        );
    }

    #[test]
    fn test_server_port_override() {
        let cli = Cli::parse_from(["aegis", "server", "-p", "9090"]);
        if let Some(Commands::Server(args)) = cli.command {
            assert_eq!(args.port, Some(9090));
        } else {
            panic!("Expected Server command");
        }
    }
}
