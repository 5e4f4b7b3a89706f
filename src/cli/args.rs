// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kubextract")]
#[command(
    author,
    version,
    about = "Export canonical Kubernetes manifests and user-defined RBAC to a directory tree"
)]
pub struct Args {
    /// Directory to write the exported files into [default: default]
    #[arg(short, long = "outdir", value_name = "DIR")]
    pub outdir: Option<PathBuf>,

    /// Substring identifying user-defined binding subjects, e.g. OPSH or RES-DEV [default: OPSH]
    #[arg(short, long = "rolestring", value_name = "PATTERN")]
    pub rolestring: Option<String>,

    /// Path to the kubeconfig file (defaults to $KUBECONFIG or ~/.kube/config)
    #[arg(long, value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubernetes context to use (defaults to the kubeconfig current context)
    #[arg(short, long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Document format of exported files
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub format: OutputFormat,

    /// Read settings from this file instead of ~/.kubextract/config.json
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Store --outdir, --rolestring and --context in the config file, then exit
    #[arg(long)]
    pub save_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["kubextract"]);
        assert!(args.outdir.is_none());
        assert!(args.rolestring.is_none());
        assert_eq!(args.format, OutputFormat::Yaml);
        assert!(!args.verbose);
    }

    #[test]
    fn test_long_flags() {
        let args = Args::parse_from([
            "kubextract",
            "--outdir",
            "/tmp/export",
            "--rolestring",
            "RES-DEV",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--format",
            "json",
        ]);
        assert_eq!(args.outdir, Some(PathBuf::from("/tmp/export")));
        assert_eq!(args.rolestring.as_deref(), Some("RES-DEV"));
        assert_eq!(args.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_short_flags() {
        let args = Args::parse_from(["kubextract", "-o", "out", "-r", "OPSH", "-c", "prod", "-v"]);
        assert_eq!(args.outdir, Some(PathBuf::from("out")));
        assert_eq!(args.context.as_deref(), Some("prod"));
        assert!(args.verbose);
    }
}
