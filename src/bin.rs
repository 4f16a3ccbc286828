use clap::Parser;
use gridfill_core::arc_consistency::PropagationMode;
use gridfill_core::backtracking_search::{find_fill, FillFailure, FillOptions};
use gridfill_core::grid_config::{render_grid, GridConfig, GridError, GridStructure};
use gridfill_core::word_list::{WordList, WordListError, WordListSource};
use log::LevelFilter;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::time::Duration;
use thiserror::Error;

/// gridfill: Fill a crossword-style grid from a word list
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the structure file, with # representing blocks and _ (or .) representing open cells
    structure: String,

    /// Path to the word list, one word per line
    words: String,

    /// Path to also write the filled grid to
    output: Option<String>,

    /// Revise each arc once instead of propagating to a fixed point
    #[arg(long)]
    single_pass: bool,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Give up after visiting this many search states
    #[arg(long)]
    max_states: Option<usize>,

    /// Log progress details (RUST_LOG overrides this)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Error)]
enum Error {
    #[error("Couldn't read file '{0}'")]
    Read(String),

    #[error("Couldn't write file '{0}'")]
    Write(String),

    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("{0}")]
    WordList(#[from] WordListError),

    #[error("Fill stopped before finishing: {0:?}")]
    Interrupted(FillFailure),
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}") // Print error unquoted
    }
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let raw_structure = fs::read_to_string(&args.structure)
        .map_err(|_| Error::Read(args.structure.clone()))?;
    let structure = GridStructure::from_template_string(&raw_structure)?;

    let word_list = WordList::from_source(&WordListSource::File {
        path: args.words.clone().into(),
    })?;

    let config = GridConfig::new(word_list, structure)?;

    let options = FillOptions {
        propagation_mode: if args.single_pass {
            PropagationMode::SinglePass
        } else {
            PropagationMode::Worklist
        },
        timeout: args.timeout.map(Duration::from_secs),
        max_states: args.max_states,
        abort: None,
    };

    let result = match find_fill(&config, &options) {
        Ok(result) => result,
        Err(FillFailure::HardFailure) => {
            println!("No solution.");
            return Ok(());
        }
        Err(failure) => return Err(Error::Interrupted(failure)),
    };

    let rendered = render_grid(&config, &result.choices);
    println!("{rendered}");

    if let Some(output) = args.output {
        fs::write(&output, format!("{rendered}\n")).map_err(|_| Error::Write(output.clone()))?;
    }

    Ok(())
}
