use cellscheme::evaluator::BindingMode;
use cellscheme::reader::ParseConfig;
use cellscheme::session::{DEFAULT_ARENA_CELLS, Session, SessionConfig};
use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;
use tracing_subscriber::EnvFilter;

/// Interactive read-eval-print loop over a fixed-size cell arena
#[derive(Parser, Debug)]
#[command(name = "repl", version)]
struct Args {
    /// Total arena cells; allocation fails once they are used up
    #[arg(long, default_value_t = DEFAULT_ARENA_CELLS)]
    cells: usize,

    /// Bind the evaluated right-hand side in define/set! instead of the text as read
    #[arg(long)]
    evaluate_bindings: bool,

    /// Read #t and #f as booleans
    #[arg(long)]
    booleans: bool,

    /// Log every read-eval-print cycle
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            arena_cells: self.cells,
            parse: ParseConfig {
                boolean_literals: self.booleans,
            },
            binding_mode: if self.evaluate_bindings {
                BindingMode::Evaluated
            } else {
                BindingMode::Literal
            },
        }
    }
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("cellscheme=debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = panic::catch_unwind(|| run_repl(&args));

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
        Err(panic_info) => {
            eprintln!("The REPL encountered an unexpected error and must exit.");

            if let Some(msg) = panic_info.downcast_ref::<&str>() {
                eprintln!("Error: {msg}");
            } else if let Some(msg) = panic_info.downcast_ref::<String>() {
                eprintln!("Error: {msg}");
            } else {
                eprintln!("Error: Unknown panic occurred");
            }

            process::exit(1);
        }
    }
}

fn run_repl(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new(args.session_config())?;
    let mut rl = DefaultEditor::new()?;

    println!("cellscheme: symbolic expressions in a {}-cell arena", args.cells);
    println!("Special forms: (define name value), (set! name value), (quote value)");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    loop {
        match rl.readline(&session.prompt()) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                // Add the line to history
                let _ = rl.add_history_entry(line.as_str());

                // Handle special commands
                match line.trim() {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&session);
                        continue;
                    }
                    ":cells" => {
                        print_cells(&session);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                for outcome in session.process_line(&line) {
                    println!("{outcome}");
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :cells     - Show arena usage");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Values:");
    println!("  Integers: 42, -5 (32-bit)");
    println!("  Strings: \"raw text, no escapes\"");
    println!("  Symbols: foo, set!, +, ...");
    println!("  Lists: (), (a b c), (a . b); (a) is the same as a");
    println!("  Booleans: #t, #f (with --booleans)");
    println!();
    println!("Examples:");
    println!("  (define x 5)");
    println!("  x");
    println!("  (set! x (quote (1 2)))");
    println!();
}

fn print_environment(session: &Session) {
    let bindings = session.bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    for (name, value) in bindings {
        println!("  {name} = {value}");
    }
}

fn print_cells(session: &Session) {
    let arena = session.arena();
    println!(
        "{} of {} cells used, {} free",
        session.cells_used(),
        arena.capacity() - 1,
        arena.available()
    );
}
