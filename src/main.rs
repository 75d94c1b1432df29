use clap::{Parser, ValueEnum};
use similar::{ChangeTag, TextDiff};
use std::io::Read;
use bash_cst::{parse, FormatMode, TokenBuffer};

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Simple,
    Verbose,
}

impl From<Mode> for FormatMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Simple => FormatMode::Simple,
            Mode::Verbose => FormatMode::Verbose,
        }
    }
}

#[derive(Parser)]
#[command(name = "bash-cst")]
#[command(about = "Parse and reformat bash scripts")]
#[command(version)]
struct Cli {
    /// Read the script from the command line argument
    #[arg(short = 'c')]
    script: Option<String>,

    /// Output layout
    #[arg(long = "mode", value_enum, default_value = "verbose")]
    mode: Mode,

    /// Print the token buffer as JSON instead of formatting
    #[arg(long = "tokens")]
    tokens: bool,

    /// Print a unified diff between the input and its verbose rendering
    #[arg(long = "diff")]
    diff: bool,

    /// Exit with status 1 when the input is not already verbose-formatted
    #[arg(long = "check")]
    check: bool,

    /// Script file to read
    #[arg()]
    script_file: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    // Determine script source: -c, file, or stdin
    let script = if let Some(s) = cli.script.clone() {
        s
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error: Cannot read script file: {}: {}", file, e);
                std::process::exit(2);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("Error: No script provided. Use -c 'script', provide a script file, or pipe via stdin.");
            std::process::exit(2);
        }
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("Error: Cannot read stdin: {}", e);
            std::process::exit(2);
        }
        buf
    };

    if cli.tokens {
        match TokenBuffer::new(&script) {
            Ok(buffer) => match serde_json::to_string_pretty(buffer.tokens()) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(2);
                }
            },
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let parsed = match parse(&script) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if cli.check || cli.diff {
        let formatted = parsed.format(FormatMode::Verbose);
        if cli.diff {
            print!("{}", unified_diff(&script, &formatted));
        }
        if formatted != script {
            std::process::exit(1);
        }
        return;
    }

    print!("{}", parsed.format(cli.mode.into()));
}

/// Unified diff with 3 context lines
fn unified_diff(original: &str, formatted: &str) -> String {
    let diff = TextDiff::from_lines(original, formatted);
    let mut output = String::new();
    output.push_str("--- original\n+++ formatted\n");
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        output.push_str(&format!("{}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => '+',
                ChangeTag::Equal => ' ',
            };
            output.push(sign);
            output.push_str(change.value());
            if change.missing_newline() {
                output.push('\n');
            }
        }
    }
    output
}
