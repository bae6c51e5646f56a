// tabgrid CLI - headless operations on grid descriptor files

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use tabgrid_cli::commands::{self, Target};
use tabgrid_cli::exit_codes::EXIT_SUCCESS;
use tabgrid_cli::render::render_table;
use tabgrid_cli::CliError;
use tabgrid_config::Settings;
use tabgrid_engine::{Grid, RowKind};

#[derive(Parser)]
#[command(name = "tgrid")]
#[command(about = "Inspect and rearrange table grid descriptors")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Settings file (default: the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Title,
    Body,
    Footer,
}

impl From<Kind> for RowKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Title => RowKind::Title,
            Kind::Body => RowKind::Body,
            Kind::Footer => RowKind::Footer,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize columns, row sections and content
    Inspect {
        /// Descriptor JSON file (omit or "-" to read stdin)
        input: Option<PathBuf>,

        /// Emit the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a descriptor and write it back out in canonical form
    #[command(after_help = "\
Examples:
  tgrid roundtrip table.json
  tgrid roundtrip table.json --no-content -o skeleton.json")]
    Roundtrip {
        input: Option<PathBuf>,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Emit structure only: ids, flags and section counts
        #[arg(long)]
        no_content: bool,
    },

    /// Apply a partial ordering to rows and/or columns
    #[command(after_help = "\
Examples:
  tgrid reorder table.json --rows r3,r1
  tgrid reorder table.json --columns total --rows r2")]
    Reorder {
        input: Option<PathBuf>,

        /// Row ids in the wanted order; unlisted rows follow
        #[arg(long, value_delimiter = ',')]
        rows: Vec<String>,

        /// Column ids in the wanted order; unlisted columns follow
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Sort each row section by one column's content
    Sort {
        input: Option<PathBuf>,

        /// Column to sort by
        #[arg(long)]
        by: String,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Move one row (within its section) or one column
    #[command(after_help = "\
Examples:
  tgrid move table.json --row r1 --to bottom
  tgrid move table.json --column qty --to 0
  tgrid move table.json --row r4 --to up --anchor r2")]
    Move {
        input: Option<PathBuf>,

        #[arg(long, conflicts_with = "column", required_unless_present = "column")]
        row: Option<String>,

        #[arg(long)]
        column: Option<String>,

        /// first, last, an index, or up/down/+n/-n with --anchor
        #[arg(long)]
        to: String,

        /// Entity the relative position refers to
        #[arg(long)]
        anchor: Option<String>,

        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Add a row
    #[command(after_help = "\
Examples:
  tgrid add-row table.json --id r9 --cell name=Plums --cell qty=4
  tgrid add-row table.json --kind footer --cell name=Total")]
    AddRow {
        input: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "body")]
        kind: Kind,

        /// Row id (generated when omitted)
        #[arg(long)]
        id: Option<String>,

        /// COLUMN=TEXT content. Repeatable.
        #[arg(long = "cell", value_name = "COLUMN=TEXT")]
        cells: Vec<String>,

        /// Position inside the row's section
        #[arg(long)]
        at: Option<String>,

        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Add a column
    #[command(after_help = "\
Examples:
  tgrid add-column table.json --id price --default body=0 --default title=Price
  tgrid add-column table.json --cell r1=red --at first")]
    AddColumn {
        input: Option<PathBuf>,

        #[arg(long)]
        id: Option<String>,

        /// ROW=TEXT content. Repeatable.
        #[arg(long = "cell", value_name = "ROW=TEXT")]
        cells: Vec<String>,

        /// KIND=TEXT default for rows of that kind. Repeatable.
        #[arg(long = "default", value_name = "KIND=TEXT")]
        defaults: Vec<String>,

        #[arg(long)]
        at: Option<String>,

        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print the grid as a text table
    Render {
        input: Option<PathBuf>,

        /// Prefix each line with the row id
        #[arg(long)]
        row_ids: bool,
    },

    /// Print the settings in effect and where they are read from
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_settings(cli.config.as_deref()).and_then(|settings| match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: tgrid <command> [options]");
            eprintln!("       tgrid --help for more information");
            Ok(())
        }
        Some(command) => run(command, &settings),
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    // A logger can only be installed once; a second attempt is not an error for us.
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    match path {
        Some(path) => Ok(Settings::load_from(path)?),
        None => Ok(Settings::load()),
    }
}

fn run(command: Commands, settings: &Settings) -> Result<(), CliError> {
    match command {
        Commands::Inspect { input, json } => {
            let grid = read_grid(input.as_deref(), settings)?;
            let report = commands::inspect(&grid);
            if json {
                let text = serde_json::to_string_pretty(&report).map_err(|e| CliError::io(e.to_string()))?;
                write_output(None, &format!("{}\n", text))
            } else {
                write_output(None, &report.to_text())
            }
        }
        Commands::Roundtrip { input, output, no_content } => {
            let grid = read_grid(input.as_deref(), settings)?;
            emit(&grid, !no_content, output.as_deref())
        }
        Commands::Reorder { input, rows, columns, output } => {
            if rows.is_empty() && columns.is_empty() {
                return Err(CliError::args("nothing to reorder").with_hint("pass --rows and/or --columns"));
            }
            let mut grid = read_grid(input.as_deref(), settings)?;
            commands::reorder(&mut grid, &rows, &columns)?;
            emit(&grid, true, output.as_deref())
        }
        Commands::Sort { input, by, desc, output } => {
            let mut grid = read_grid(input.as_deref(), settings)?;
            commands::sort(&mut grid, &by, desc)?;
            emit(&grid, true, output.as_deref())
        }
        Commands::Move { input, row, column, to, anchor, output } => {
            let target = match (row, column) {
                (Some(row), None) => Target::Row(row),
                (None, Some(column)) => Target::Column(column),
                _ => return Err(CliError::args("pass exactly one of --row or --column")),
            };
            let position = commands::parse_position(&to, anchor.as_deref())?;
            let mut grid = read_grid(input.as_deref(), settings)?;
            let index = commands::move_entity(&mut grid, &target, position)?;
            log::info!("{:?} now at index {}", target, index);
            emit(&grid, true, output.as_deref())
        }
        Commands::AddRow { input, kind, id, cells, at, output } => {
            let cells = cells
                .iter()
                .map(|c| commands::parse_assignment(c))
                .collect::<Result<Vec<_>, _>>()?;
            let at = at.map(|a| commands::parse_position(&a, None)).transpose()?;
            let mut grid = read_grid(input.as_deref(), settings)?;
            let id = commands::add_row(&mut grid, kind.into(), id.as_deref(), &cells, at, settings)?;
            log::info!("added row {}", id);
            emit(&grid, true, output.as_deref())
        }
        Commands::AddColumn { input, id, cells, defaults, at, output } => {
            let cells = cells
                .iter()
                .map(|c| commands::parse_assignment(c))
                .collect::<Result<Vec<_>, _>>()?;
            let defaults = defaults
                .iter()
                .map(|d| {
                    let (kind, text) = commands::parse_assignment(d)?;
                    Ok((commands::parse_kind(&kind)?, text))
                })
                .collect::<Result<Vec<_>, CliError>>()?;
            let at = at.map(|a| commands::parse_position(&a, None)).transpose()?;
            let mut grid = read_grid(input.as_deref(), settings)?;
            let id = commands::add_column(&mut grid, id.as_deref(), &cells, &defaults, at, settings)?;
            log::info!("added column {}", id);
            emit(&grid, true, output.as_deref())
        }
        Commands::Render { input, row_ids } => {
            let mut grid = read_grid(input.as_deref(), settings)?;
            let table = render_table(&mut grid, row_ids)?;
            write_output(None, &table)
        }
        Commands::Config => {
            eprintln!("# {}", Settings::config_path_display());
            write_output(None, &settings.to_toml_string()?)
        }
    }
}

/// Read descriptor JSON from a file, or stdin when the path is absent or "-".
fn read_grid(input: Option<&Path>, settings: &Settings) -> Result<Grid, CliError> {
    let text = match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?,
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| CliError::io(e.to_string()))?;
            if buf.trim().is_empty() {
                return Err(CliError::args("no input received on stdin")
                    .with_hint("pass a descriptor file or pipe JSON into tgrid"));
            }
            buf
        }
    };
    commands::load(&text, settings)
}

fn emit(grid: &Grid, include_content: bool, output: Option<&Path>) -> Result<(), CliError> {
    let mut json = commands::to_output(grid, include_content)?;
    json.push('\n');
    write_output(output, &json)
}

fn write_output(output: Option<&Path>, text: &str) -> Result<(), CliError> {
    match output {
        Some(path) if path != Path::new("-") => {
            std::fs::write(path, text).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
        }
        _ => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .map_err(|e| CliError::io(e.to_string()))
        }
    }
}
