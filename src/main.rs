//! Wirecall CLI: inspect saved command streams.

use std::env;
use std::process;

use colored::Colorize;

use wirecall::stream::MessageStream;
use wirecall::WirecallError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command to execute.
enum CliCommand {
    /// Decode a saved stream and print every message
    Dump { file: String },
    /// Print summary statistics for a saved stream
    Info { file: String },
    /// Show usage
    Help,
    /// Show the version
    Version,
}

fn parse_args(args: &[String]) -> Result<CliCommand, String> {
    match args.first().map(String::as_str) {
        None | Some("help") | Some("--help") | Some("-h") => Ok(CliCommand::Help),
        Some("version") | Some("--version") | Some("-V") => Ok(CliCommand::Version),
        Some("dump") => match args.get(1) {
            Some(file) => Ok(CliCommand::Dump { file: file.clone() }),
            None => Err("dump requires a file argument".to_string()),
        },
        Some("info") => match args.get(1) {
            Some(file) => Ok(CliCommand::Info { file: file.clone() }),
            None => Err("info requires a file argument".to_string()),
        },
        Some(other) => Err(format!("unknown command '{}'", other)),
    }
}

fn print_usage() {
    println!("wirecall {} - command-stream inspector", VERSION);
    println!();
    println!("Usage:");
    println!("  wirecall dump <file>   Decode a saved stream and print every message");
    println!("  wirecall info <file>   Print summary statistics for a saved stream");
    println!("  wirecall help          Show this help");
    println!("  wirecall version       Show the version");
}

fn cmd_dump(file: &str) -> Result<(), WirecallError> {
    print!("{}", wirecall::dump_file(file)?);
    Ok(())
}

fn cmd_info(file: &str) -> Result<(), WirecallError> {
    let stream = MessageStream::load(file)?;
    println!("{} {}", "stream:".bold(), file);
    println!("  messages: {}", stream.message_count());

    let mut tallies: Vec<(&'static str, usize)> = Vec::new();
    for message in stream.messages() {
        let name = message.command.name();
        match tallies.iter_mut().find(|(tally_name, _)| *tally_name == name) {
            Some((_, count)) => *count += 1,
            None => tallies.push((name, 1)),
        }
    }
    for (name, count) in tallies {
        println!("  {:8} {}", name, count);
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{} {}", "error:".red().bold(), message);
            eprintln!("Run 'wirecall help' for usage.");
            process::exit(1);
        }
    };

    let outcome = match command {
        CliCommand::Dump { file } => cmd_dump(&file),
        CliCommand::Info { file } => cmd_info(&file),
        CliCommand::Help => {
            print_usage();
            Ok(())
        }
        CliCommand::Version => {
            println!("wirecall {}", VERSION);
            Ok(())
        }
    };

    if let Err(err) = outcome {
        eprintln!("{} {}", "error:".red().bold(), err);
        process::exit(1);
    }
}
