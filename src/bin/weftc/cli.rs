//! # Cli
//!
//! This module contains everything needed for parsing the CLI arguments
//! for weftc.

use clap::{Args, Parser, Subcommand, ValueEnum};

use weft_lang::context::DebugCategory;

/// Struct containing the CLI configuration for weftc.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Specify the log level of the compiler.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of weftc.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors will be logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// Also log warnings.
    #[value(alias("1"))]
    Warn,

    /// Also log information about the general state of the compiler,
    /// e.g., which packages are compiled.
    #[value(alias("2"))]
    Info,

    /// Log everything which happens internally in the compiler.
    #[value(alias("3"))]
    Debug,

    /// Log extra information. This output can be quite clunky.
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compile a Weft package to a WebAssembly text module.
    Build(BuildArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// The path to the root Weft source file.
    #[arg(index = 1)]
    pub file: std::path::PathBuf,

    /// Override the root package name (defaults to the file stem).
    #[arg(long)]
    pub package_name: Option<String>,

    /// The path of the emitted WebAssembly text file.
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,

    /// Compile without writing the output file.
    #[arg(long)]
    pub no_output: bool,

    /// Do not make the embedded standard library loadable.
    #[arg(long)]
    pub no_std: bool,

    /// Dump intermediate state (may be given multiple times).
    #[arg(long, value_enum)]
    pub debug: Vec<DebugFlag>,
}

/// Debug dump categories accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugFlag {
    Tokens,
    Ast,
    Resolved,
    Typecked,
    Wat,
    WasmValidate,
}

impl From<DebugFlag> for DebugCategory {
    fn from(value: DebugFlag) -> Self {
        match value {
            DebugFlag::Tokens => DebugCategory::Tokens,
            DebugFlag::Ast => DebugCategory::Ast,
            DebugFlag::Resolved => DebugCategory::Resolved,
            DebugFlag::Typecked => DebugCategory::Typecked,
            DebugFlag::Wat => DebugCategory::Wat,
            DebugFlag::WasmValidate => DebugCategory::WasmValidate,
        }
    }
}
