use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;
use minidb::{Layout, PAGE_SIZE, PrepareError, RowLayout, Statement, TABLE_MAX_PAGES, Table};

/// Interactive shell over a single-table database file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database file, created if missing
    filename: PathBuf,

    /// Page size in bytes
    #[arg(long, default_value_t = PAGE_SIZE)]
    page_size: usize,

    /// Maximum number of pages in the table
    #[arg(long, default_value_t = TABLE_MAX_PAGES)]
    max_pages: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

struct InputBuffer {
    buffer: String,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Returns false once stdin is exhausted.
    fn read_input(&mut self) -> Result<bool> {
        self.buffer.clear();
        let read = io::stdin()
            .read_line(&mut self.buffer)
            .context("Failed to read line")?;
        self.buffer = self.buffer.trim().to_string();
        Ok(read > 0)
    }
}

// Non-SQL statements like .exit are called “meta-commands”.
enum MetaCommands {
    Exit,
    Unrecognized,
}

impl MetaCommands {
    fn parse(input: &str) -> Option<MetaCommands> {
        match input {
            ".exit" => Some(MetaCommands::Exit),
            _ => {
                if input.starts_with('.') {
                    Some(MetaCommands::Unrecognized)
                } else {
                    None
                }
            }
        }
    }
}

fn print_prompt() -> Result<()> {
    print!("db > ");
    io::stdout().flush()?;
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let layout = Layout::new(RowLayout::default(), args.page_size, args.max_pages)?;
    let mut table = Table::open(&args.filename, layout)
        .with_context(|| format!("Unable to open file {}", args.filename.display()))?;
    let mut input_buffer = InputBuffer::new();
    let mut stdout = io::stdout();

    loop {
        print_prompt()?;
        if !input_buffer.read_input()? {
            break;
        }
        let input = input_buffer.buffer.as_str();

        match MetaCommands::parse(input) {
            Some(MetaCommands::Exit) => break,
            Some(MetaCommands::Unrecognized) => {
                println!("Unrecognized meta-command: {}", input);
                continue;
            }
            None => {}
        }

        match Statement::prepare(input, table.layout().row()) {
            Ok(statement) => statement
                .execute(&mut table, &mut stdout)
                .context("Failed to execute statement")?,
            Err(PrepareError::NegativeId) => println!("ID must be positive."),
            Err(PrepareError::StringTooLong) => println!("String is too long."),
            Err(PrepareError::SyntaxError) => {
                println!("Syntax error. Could not parse statement.")
            }
            Err(PrepareError::Unrecognized) => println!("Unrecognized command: {}", input),
        }
    }

    table.close().context("Failed to close database")
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
