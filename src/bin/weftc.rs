extern crate weft_lang;

#[path = "weftc/cli.rs"]
mod cli;

use std::process::Command;

use anyhow::Context;
use log::{error, info};

use weft_lang::{
    codegen,
    context::{DebugCategory, GlobalCx, Options},
};

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::init();
    simple_logger::init_with_level((&cli.verbosity).into()).unwrap();

    let result = match cli.command {
        Commands::Build(args) => build(args),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn build(args: cli::BuildArgs) -> anyhow::Result<()> {
    let options = Options {
        package_name: args.package_name.clone(),
        output: args.output.clone(),
        no_output: args.no_output,
        no_std: args.no_std,
        debug: args.debug.iter().map(|flag| (*flag).into()).collect(),
    };

    let mut cx = GlobalCx::new(options);
    let pkg = cx.load_root(&args.file);

    if cx.sink.has_errors() {
        for diagnostic in cx.sink.errors() {
            eprintln!("{diagnostic}\n");
        }
        anyhow::bail!(
            "{count} error(s) in package '{name}'",
            count = cx.sink.error_count(),
            name = pkg.name
        );
    }

    let wat = codegen::generate(&cx, &pkg);
    if cx.options.dumps(DebugCategory::Wat) {
        println!("{wat}");
    }

    if cx.options.no_output {
        return Ok(());
    }

    let output = cx
        .options
        .output
        .clone()
        .unwrap_or_else(|| "out.wat".into());
    std::fs::write(&output, &wat)
        .with_context(|| format!("could not write '{}'", output.display()))?;
    info!("wrote '{}'", output.display());

    if cx.options.dumps(DebugCategory::WasmValidate) {
        validate_wat(&output)?;
    }

    Ok(())
}

/// Run `wasm-tools validate` over the emitted module.
fn validate_wat(path: &std::path::Path) -> anyhow::Result<()> {
    info!("validating '{}'...", path.display());

    let output = Command::new("wasm-tools")
        .arg("validate")
        .arg(path)
        .output()
        .context("could not run wasm-tools")?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        error!("{stderr}");
    }
    anyhow::ensure!(output.status.success(), "wasm-tools validate failed");

    Ok(())
}
