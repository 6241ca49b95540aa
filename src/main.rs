use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use turtle::ast_printer::AstPrinter;
use turtle::parser::Parser;
use turtle::scanner::scan;
use turtle::session::{Session, EX_DATAERR, EX_IOERR, EX_SOFTWARE, EX_USAGE};

#[derive(ClapParser, Debug)]
#[command(
    version,
    about = "Turtle language interpreter",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Script to run; starts an interactive prompt when omitted
    script: Option<PathBuf>,

    /// Enable logging to turtle.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a program from a file and prints its syntax tree
    Parse { filename: PathBuf },
}

/// Reads the contents of a file as UTF‑8 text
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("turtle.log").context("Failed to create turtle.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("turtle::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to turtle.log");
    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<u8> {
    info!("Running Tokenize subcommand");
    let source = read_file(filename)?;
    let (tokens, errors) = scan(&source);

    for e in &errors {
        debug!("Tokenization debug: {}", e);
        eprintln!("{}", e);
    }

    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &tokens).context("Failed to write tokens")?;
        writeln!(stdout)?;
    } else {
        for token in &tokens {
            writeln!(stdout, "{}", token)?;
        }
    }

    if !errors.is_empty() {
        debug!("Tokenization failed, exiting with code {}", EX_DATAERR);
        return Ok(EX_DATAERR as u8);
    }

    info!("Tokenization completed successfully");
    Ok(0)
}

fn parse(filename: &Path) -> Result<u8> {
    info!("Running Parse subcommand");
    let source = read_file(filename)?;
    let (tokens, mut errors) = scan(&source);
    let (statements, parse_errors) = Parser::new(tokens).parse();
    errors.extend(parse_errors);

    if !errors.is_empty() {
        for e in &errors {
            debug!("Parse debug: {}", e);
            eprintln!("{}", e);
        }
        return Ok(EX_DATAERR as u8);
    }

    let tree = AstPrinter::print_program(&statements);
    debug!("AST:\n{}", tree);
    println!("{}", tree);

    info!("Parse subcommand completed");
    Ok(0)
}

fn run_file(script: &Path) -> Result<u8> {
    info!("Running script {:?}", script);
    let source = read_file(script)?;

    let mut session = Session::new();
    let outcome = session.run(&source);
    info!("Script finished: {:?}", outcome);

    let code = if session.had_error() {
        EX_DATAERR
    } else if session.had_runtime_error() {
        EX_SOFTWARE
    } else {
        0
    };
    Ok(code as u8)
}

fn run_prompt() -> Result<u8> {
    let mut session = Session::new();
    let stdin = io::stdin();

    session
        .run_prompt(stdin.lock(), &mut io::stdout())
        .context("Interactive prompt failed")?;

    Ok(0)
}

fn main() -> ExitCode {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::from(EX_USAGE as u8);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    if args.log {
        if let Err(e) = init_logger() {
            eprintln!("{:#}", e);
            return ExitCode::from(EX_IOERR as u8);
        }
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let result = match (&args.command, &args.script) {
        (Some(Commands::Tokenize { filename, json }), _) => tokenize(filename, *json),
        (Some(Commands::Parse { filename }), _) => parse(filename),
        (None, Some(script)) => run_file(script),
        (None, None) => run_prompt(),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            debug!("I/O failure: {:#}", e);
            eprintln!("{:#}", e);
            ExitCode::from(EX_IOERR as u8)
        }
    }
}
