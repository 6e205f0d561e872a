// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! `lsview` loads a file into a [`Document`] backed by a (deliberately small) block pool,
//! and prints a range of its lines. Blocks are evicted and reloaded from the file as the
//! range is walked, which makes this a handy way to watch the engine work:
//!
//! ```text
//! lsview Cargo.toml --from 10 --count 5 --block-capacity 64 --max-blocks 2 -l
//! tail -f line_store_log.txt
//! ```

use std::io::Write;

use clap::Parser;
use miette::IntoDiagnostic;
use r3bl_line_store::{Document, PoolConfig, TracingConfig, load_document_from_path,
                      new_shared_block_pool, ok};
use tracing_core::LevelFilter;

use crate::clap_config::CLIArg;

fn main() -> miette::Result<()> {
    let cli_arg = CLIArg::parse();

    if cli_arg.global_options.enable_logging {
        TracingConfig::new_file(None)
            .with_level_filter(LevelFilter::DEBUG)
            .install_global()?;
    }
    tracing::debug!(message = "🚀 lsview started", ?cli_arg);

    let config = PoolConfig::default()
        .with_block_capacity(cli_arg.pool_options.block_capacity as usize)
        .with_max_slots(cli_arg.pool_options.max_blocks as usize)
        .with_activation_step(cli_arg.pool_options.max_blocks as usize);
    let pool = new_shared_block_pool(config);
    let mut document = Document::new(pool.clone());
    load_document_from_path(&cli_arg.file_path, &mut document)?;

    let line_count = document.line_count();
    let from = cli_arg.from.min(line_count);
    let to = cli_arg
        .count
        .map_or(line_count, |it| from.saturating_add(it).min(line_count));
    let number_width = to.to_string().len();

    let mut stdout = std::io::stdout().lock();
    for index in from..to {
        let line = document.get_str(index)?;
        write!(stdout, "{:>number_width$} │ ", index + 1).into_diagnostic()?;
        stdout.write_all(line).into_diagnostic()?;
        stdout.write_all(b"\n").into_diagnostic()?;
    }
    stdout.flush().into_diagnostic()?;

    if cli_arg.global_options.show_stats {
        let pool = pool.borrow();
        eprintln!(
            "📊 lines: {line_count}, blocks: {}, activated slots: {}/{}, pinned: {}",
            document.block_count(),
            pool.activated_count(),
            pool.max_slots(),
            pool.checked_out_count(),
        );
    }

    ok!()
}

mod clap_config {
    use clap::{Args, Parser};
    use r3bl_line_store::{DEFAULT_BLOCK_CAPACITY, DEFAULT_MAX_SLOTS};

    /// More info: <https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_2/index.html>
    #[derive(Debug, Parser)]
    #[command(bin_name = "lsview")]
    #[command(about = "🧱 View a file through a paged, pooled line store")]
    #[command(version)]
    #[command(next_line_help = true)]
    #[command(arg_required_else_help(true))]
    pub struct CLIArg {
        #[arg(name = "file path")]
        pub file_path: String,

        #[arg(long, default_value_t = 0, help = "First line to print (0 based)")]
        pub from: usize,

        #[arg(long, help = "Number of lines to print, defaults to the rest of the file")]
        pub count: Option<usize>,

        #[command(flatten)]
        pub pool_options: PoolOption,

        #[command(flatten)]
        pub global_options: GlobalOption,
    }

    #[derive(Debug, Args)]
    pub struct PoolOption {
        #[arg(
            long,
            default_value_t = DEFAULT_BLOCK_CAPACITY as u32,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Capacity of each block in bytes, this is also the longest line allowed"
        )]
        pub block_capacity: u32,

        #[arg(
            long,
            default_value_t = DEFAULT_MAX_SLOTS as u32,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Max number of blocks the pool holds at a time"
        )]
        pub max_blocks: u32,
    }

    #[derive(Debug, Args)]
    pub struct GlobalOption {
        #[arg(
            global = true,
            long,
            short = 'l',
            help = "Log app output to a file named `line_store_log.txt` for debugging."
        )]
        pub enable_logging: bool,

        #[arg(
            global = true,
            long,
            short = 's',
            help = "Print block and pool usage to stderr when done."
        )]
        pub show_stats: bool,
    }
}
