//! otx template engine CLI

use std::io::{self, IsTerminal, Write};

use otxc::commands::{check_file, dump_file, render_file, CliError};
use otxc::IoSink;

fn main() {
    otxc::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    let result = match command.as_str() {
        "render" => {
            if args.len() < 4 {
                eprintln!("Usage: otx render <file> <template> [name=value ...]");
                eprintln!();
                eprintln!("Values are typed: 42, 2.5, true, false, null, \"quoted text\";");
                eprintln!("anything else is passed as a string.");
                std::process::exit(1);
            }
            let stdout = io::stdout();
            let mut sink = IoSink::new(stdout.lock());
            match render_file(&args[2], &args[3], &args[4..], &mut sink) {
                Err(CliError::Run(otxc::RunError::Output(_))) => {
                    let error = sink
                        .take_error()
                        .unwrap_or_else(|| io::Error::other("output sink failed"));
                    Err(CliError::Write(error))
                }
                Ok(()) => sink.flush().map_err(CliError::Write),
                Err(e) => Err(e),
            }
        }
        "check" => {
            if args.len() < 3 {
                eprintln!("Usage: otx check <file>");
                std::process::exit(1);
            }
            check_file(&args[2]).map(|count| println!("ok: {count} templates"))
        }
        "dump" => {
            if args.len() < 3 {
                eprintln!("Usage: otx dump <file> [template]");
                std::process::exit(1);
            }
            dump_file(&args[2], args.get(3).map(String::as_str)).map(|listing| print!("{listing}"))
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" => {
            println!("otx {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        let color = io::stderr().is_terminal();
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(e.report(color).as_bytes());
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("otx - template compiler and interpreter");
    println!();
    println!("Usage: otx <command> [options]");
    println!();
    println!("Commands:");
    println!("  render <file> <template> [name=value ...]");
    println!("                         Render one template to stdout");
    println!("  check <file>           Compile every template in a file");
    println!("  dump <file> [template] Print instruction listings");
    println!("  help                   Show this message");
    println!();
    println!("Set RUST_LOG (e.g. RUST_LOG=otx_eval=debug) for tracing output.");
}
