use clap::{Parser as ClapParser, Subcommand};
use stree_tui::session::{RecordingHooks, ScriptLine, SessionOutput, SessionParser, replay};
use stree_tui::trace::StackTree;
use stree_tui::tui::{self, TuiHooks};

#[derive(ClapParser)]
#[command(name = "stree-tui")]
#[command(about = "Replay debugger sessions through a stack trace view", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a session script and print the final tree and hook calls as JSON
    Dump {
        /// Session script
        #[arg(value_name = "SESSION")]
        input: String,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<String>,

        /// Pretty print JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Replay a session script and browse the result interactively
    View {
        /// Session script
        #[arg(value_name = "SESSION")]
        input: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            input,
            output,
            pretty,
        } => {
            env_logger::Builder::from_default_env()
                .target(env_logger::Target::Stderr)
                .init();
            dump_session(&input, output, pretty);
        }
        Commands::View { input } => view_session(input),
    }
}

fn load_script(input: &str) -> (SessionParser, Vec<ScriptLine>) {
    let mut parser = SessionParser::new();
    match parser.parse_file(input) {
        Ok(script) => (parser, script),
        Err(err) => {
            eprintln!("Error reading session: {}", err);
            std::process::exit(1);
        }
    }
}

fn dump_session(input: &str, output_file: Option<String>, pretty: bool) {
    let (parser, script) = load_script(input);

    let mut stack = StackTree::init(RecordingHooks::default());
    if let Err(err) = replay(&script, &mut stack) {
        eprintln!("Error replaying {}: {}", input, err);
        std::process::exit(1);
    }

    let tree = stack.tree().snapshot();
    let hooks = stack.destroy();
    let output = SessionOutput {
        tree,
        calls: hooks.calls,
        errors: parser.error_info(),
    };

    // Serialize to JSON
    let json = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    };

    let json = match json {
        Ok(j) => j,
        Err(err) => {
            eprintln!("Error serializing to JSON: {}", err);
            std::process::exit(1);
        }
    };

    // Write output
    if let Some(output_path) = output_file {
        if let Err(err) = std::fs::write(&output_path, json) {
            eprintln!("Error writing to {}: {}", output_path, err);
            std::process::exit(1);
        }
        eprintln!("Output written to {}", output_path);
    } else {
        println!("{}", json);
    }
}

fn view_session(input: String) {
    let (parser, script) = load_script(&input);

    if !parser.errors.is_empty() {
        eprintln!(
            "Warning: skipped {} unparsable lines in {}",
            parser.errors.len(),
            input
        );
    }

    let mut stack = StackTree::init(TuiHooks::default());
    if let Err(err) = replay(&script, &mut stack) {
        eprintln!("Error replaying {}: {}", input, err);
        std::process::exit(1);
    }

    if let Err(e) = tui::run_tui(stack, Some(input)) {
        eprintln!("Error running TUI: {}", e);
        std::process::exit(1);
    }
}
