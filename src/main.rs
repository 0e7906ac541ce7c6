use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use miette::IntoDiagnostic;
use miette::WrapErr;
use numlang::lex::BangError;
use numlang::lex::SingleTokenError;
use numlang::{Environment, Lexer, RuntimeError, StatementTree, format_number};

#[derive(Parser, Debug)]
#[command(version, about = "Line-oriented interpreter for a tiny numeric language")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the token stream of a file
    Tokenize { filename: PathBuf },
    /// Print the syntax tree of every line of a file
    Parse { filename: PathBuf },
    /// Evaluate a file line by line in one session
    Run { filename: PathBuf },
    /// Read lines from stdin interactively (the default)
    Repl {
        #[arg(long, default_value = ">>> ")]
        prompt: String,
    },
}

fn main() -> miette::Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Some(Commands::Tokenize { filename }) => {
            let file_contents = read(&filename)?;

            for token in Lexer::new(filename.to_str(), &file_contents) {
                let token = match token {
                    Ok(token) => token,
                    Err(e) => {
                        if let Some(single_token_error) = e.downcast_ref::<SingleTokenError>() {
                            eprintln!(
                                "[line {}] Error: Unexpected character: {}",
                                single_token_error.line(),
                                single_token_error.token
                            );
                        } else if let Some(bang_error) = e.downcast_ref::<BangError>() {
                            eprintln!("[line {}] Error: Unexpected '!'", bang_error.line());
                        }
                        eprintln!("{e:?}");
                        std::process::exit(65);
                    }
                };
                println!("{token}");
            }
            println!("EOF  null");
        }
        Some(Commands::Parse { filename }) => {
            let file_contents = read(&filename)?;

            for (index, line) in file_contents.lines().enumerate() {
                let program = match numlang::parse(line) {
                    Ok(program) => program,
                    Err(e) => {
                        eprintln!("[line {}] {e}", index + 1);
                        eprintln!("{e:?}");
                        std::process::exit(65);
                    }
                };
                if let StatementTree::Block(statements) = program {
                    for statement in statements {
                        println!("{statement}");
                    }
                }
            }
        }
        Some(Commands::Run { filename }) => {
            let file_contents = read(&filename)?;
            let mut environment = Environment::new();
            let mut stdout = io::stdout().lock();

            for (index, line) in file_contents.lines().enumerate() {
                let program = match numlang::parse(line) {
                    Ok(program) => program,
                    Err(e) => {
                        eprintln!("[line {}] {e}", index + 1);
                        eprintln!("{e:?}");
                        std::process::exit(65);
                    }
                };
                if let Err(e) = numlang::evaluate(&program, &mut environment, &mut stdout) {
                    if matches!(e.downcast_ref::<RuntimeError>(), Some(RuntimeError::Output(_))) {
                        return Err(e);
                    }
                    eprintln!("[line {}] {e}", index + 1);
                    std::process::exit(70);
                }
            }
        }
        Some(Commands::Repl { prompt }) => repl(&prompt)?,
        None => repl(">>> ")?,
    }
    Ok(())
}

fn read(filename: &PathBuf) -> miette::Result<String> {
    fs::read_to_string(filename)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading `{}` failed", filename.display()))
}

fn repl(prompt: &str) -> miette::Result<()> {
    let mut environment = Environment::new();
    let mut stdin = io::stdin().lock();
    let mut line = String::new();

    loop {
        print!("{prompt}");
        io::stdout().flush().into_diagnostic()?;

        line.clear();
        if stdin.read_line(&mut line).into_diagnostic()? == 0 {
            break;
        }
        let source = line.trim_end_matches(['\r', '\n']);
        if source.trim() == "exit" {
            break;
        }

        let result = numlang::parse(source)
            .and_then(|program| numlang::evaluate(&program, &mut environment, &mut io::stdout()));
        match result {
            Ok(value) => println!("{}", format_number(value)),
            Err(e) => {
                println!("Error: {e}");
                log::debug!("{e:?}");
            }
        }
    }
    Ok(())
}
