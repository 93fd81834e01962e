//! Build automation tasks for MemcLoad
//!
//! - Generating the CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for MemcLoad", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    // Generate markdown from clap definitions
    let markdown = clap_markdown::help_markdown::<memc_load::Cli>();

    let content = format!(
        r#"# memc-load CLI Reference

Generated from the CLI source code. Last updated: {}.

## Overview

`memc-load` reads gzip-compressed installed-apps logs (one record per line,
five tab-separated fields) and stores every record in the memcached instance
configured for its device type. Loaded files are renamed with a leading `.`
so the next run skips them.

```bash
# Check the value encoding
memc-load --test

# Load everything under ./data, logging intended writes only
memc-load --dry --pattern './data/*.tsv.gz'

# Load for real, logging to a file
memc-load -l /var/log/memc-load.log --pattern '/data/appsinstalled/*.tsv.gz'
```

## Options

{}

## Environment Variables

Every option above can also be set through its `MEMC_LOAD_*` variable, and a
`.env` file in the working directory is read at startup.

- `LOG_LEVEL` - trace, debug, info, warn, error
- `LOG_OUTPUT` - console, file, both
- `LOG_FORMAT` - text, json
- `LOG_FILE` - log file path when output includes file
- `LOG_FILTER` - extra filter directives, e.g. `memc_load::writer=trace`
- `RUST_LOG` - standard `tracing` filter

## Exit Status

- `0` - every matched file was loaded and renamed (files over the error
  threshold are logged as failed loads but still renamed)
- `1` - no file matched, a file could not be opened or decompressed, or a
  rename failed
- `2` - invalid logging setup

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
