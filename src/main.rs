use clap::Parser;
use dirs::home_dir;
use log::{debug, info};
use nu_ansi_term::{Color, Style};
use reedline::{DefaultHinter, FileBackedHistory, Reedline, Signal};
use rnova::{
    cli::{Args, Commands},
    error::Result,
    parser::parse,
    repl::{REPLPrompt, REPLValidator, SyntaxHighlighter},
    runtime::{Executor, Value},
    stdlib::StandardResolver,
    tokenizer::tokenize,
};
use std::{fs, io, path::Path, thread, time::Duration};

fn execute_file(file: &Path) -> Result<()> {
    let source = fs::read_to_string(file)?;

    let tokens = tokenize(&source)?;
    let statements = parse(&tokens)?;

    let mut executor = Executor::new(Box::new(StandardResolver), io::stdout());
    executor.execute(&statements)?;

    Ok(())
}

fn check_file(file: &Path) -> Result<()> {
    let source = fs::read_to_string(file)?;

    let tokens = tokenize(&source)?;
    debug!("{} tokens", tokens.len());

    let statements = parse(&tokens)?;
    println!(
        "{}: {} statements, syntax OK",
        file.display(),
        statements.len()
    );

    Ok(())
}

fn watch_file(file: &Path) -> Result<()> {
    let mut last_modified = fs::metadata(file)?.modified()?;
    println!("Watching {} for changes... (Ctrl+C to stop)", file.display());

    if let Err(err) = execute_file(file) {
        eprintln!("{}", err);
    }

    loop {
        thread::sleep(Duration::from_millis(500));

        let modified = match fs::metadata(file).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(err) => {
                eprintln!("{}: {}", file.display(), err);
                break Ok(());
            }
        };

        if modified != last_modified {
            last_modified = modified;
            println!("File changed, re-running...");
            if let Err(err) = execute_file(file) {
                eprintln!("{}", err);
            }
        }
    }
}

fn run_repl() -> Result<()> {
    let mut line_editor = Reedline::create()
        .with_hinter(Box::new(
            DefaultHinter::default().with_style(Style::new().italic().fg(Color::LightGray)),
        ))
        .with_highlighter(Box::new(SyntaxHighlighter))
        .with_validator(Box::new(REPLValidator));

    // Add file-backed history if possible
    if let Some(history) = home_dir()
        .map(|home| home.join(".rnova_history"))
        .and_then(|path| FileBackedHistory::with_file(20, path).ok())
        .map(Box::new)
    {
        line_editor = line_editor.with_history(history);
    } else {
        eprintln!("NOTE: Failed to load history. Persistence is now disabled.")
    }

    let prompt = REPLPrompt;
    // One executor for the whole session, so bindings persist across lines.
    let mut executor = Executor::new(Box::new(StandardResolver), io::stdout());

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) => {
                let result = tokenize(&buffer)
                    .and_then(|tokens| parse(&tokens))
                    .and_then(|statements| executor.execute(&statements));
                match result {
                    Ok(Value::Null) => {}
                    Ok(value) => println!("{}", value),
                    Err(err) => eprintln!("{}", err),
                }
            }
            Signal::CtrlD | Signal::CtrlC => {
                break Ok(());
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Run { file } => {
            info!("FILE MODE");
            debug!("file: {:?}", file);

            execute_file(&file)
                .inspect_err(|err| {
                    eprintln!("{}", err);
                })
                .ok();
        }
        Commands::Check { file } => {
            info!("CHECK MODE");
            debug!("file: {:?}", file);

            check_file(&file)
                .inspect_err(|err| {
                    eprintln!("{}", err);
                })
                .ok();
        }
        Commands::Watch { file } => {
            info!("WATCH MODE");
            debug!("file: {:?}", file);

            watch_file(&file)
                .inspect_err(|err| {
                    eprintln!("{}", err);
                })
                .ok();
        }
        Commands::Repl => {
            info!("REPL MODE");

            run_repl()
                .inspect_err(|err| {
                    eprintln!("{}", err);
                })
                .ok();
        }
    }
    Ok(())
}
