use bnf_gen::{CompiledGrammar, DEFAULT_REPEAT_MAX, Generator, GrammarConfig, START_RULE};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

/// Generate random sentences from a BNF grammar
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the BNF grammar file
    #[arg(short, long)]
    grammar: PathBuf,

    /// Number of sentences to generate
    #[arg(short, long, default_value_t = 1)]
    number: usize,

    /// Maximum number of '*' and '+' expansions
    #[arg(short, long, default_value_t = DEFAULT_REPEAT_MAX)]
    repeat_max: u32,

    /// Rule to start generating from
    #[arg(short, long, default_value = START_RULE)]
    start: String,

    /// Separator between generated tokens
    #[arg(short, long, default_value = " ")]
    delimiter: String,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Print the compiled expansion tree of every rule instead of generating
    #[arg(long, conflicts_with = "json")]
    tree: bool,

    /// Print the compiled grammar as JSON instead of generating
    #[arg(long)]
    json: bool,

    /// Report progress on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = GrammarConfig {
        repeat_max: cli.repeat_max,
        start_rule: cli.start.clone(),
        delimiter: cli.delimiter.clone(),
    };

    if cli.verbose {
        eprintln!("Loading grammar from {}...", cli.grammar.display());
    }
    let grammar = CompiledGrammar::from_file(&cli.grammar, &config)?;
    if cli.verbose {
        eprintln!("Compiled {} rules.", grammar.len());
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if cli.json {
        serde_json::to_writer_pretty(&mut out, &grammar)?;
        writeln!(out)?;
        out.flush()?;
        return Ok(());
    }

    if cli.tree {
        for name in grammar.rule_names() {
            if let Some(tree) = grammar.display_rule(name) {
                write!(out, "{}", tree)?;
            }
        }
        out.flush()?;
        return Ok(());
    }

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if cli.verbose {
        eprintln!("Generating {} sentences:", cli.number);
    }
    let generator = Generator::with_config(&grammar, &config);
    for _ in 0..cli.number {
        writeln!(out, "{}", generator.generate(&mut rng))?;
    }
    out.flush()?;

    Ok(())
}
