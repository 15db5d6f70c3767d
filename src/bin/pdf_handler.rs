//! Command-line front end for the file-path API.
//!
//! Usage:
//!   pdf_handler metadata <input.pdf>
//!   pdf_handler write-metadata <input.pdf> --output <name.pdf> [--title T] [--author A]
//!               [--subject S] [--creator C] [--producer P]
//!   pdf_handler merge <input.pdf> <other.pdf>... [--output merged.pdf]
//!   pdf_handler split <input.pdf> [--prefix split_page]
//!   pdf_handler text <input.pdf> [page...]
//!   pdf_handler encrypt <input.pdf> <password> [--output encrypted.pdf]
//!   pdf_handler decrypt <input.pdf> <password> [--output decrypted.pdf]
//!   pdf_handler add-password <input.pdf> <password> [--output protected.pdf]
//!   pdf_handler remove-password <input.pdf> <password> [--output unprotected.pdf]
//!
//! Common options: `--log-file <path>` (default `logfile.log`), `-v` for
//! debug logging. `RUST_LOG` overrides the level.
//!
//! Pages for `text` are 0-based; without pages every page is printed.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use pdf_handler::api::PdfHandler;
use pdf_handler::operations::DocumentInfo;

struct CliConfig {
    command: String,
    positional: Vec<String>,
    output: Option<String>,
    prefix: Option<String>,
    log_file: PathBuf,
    verbose: bool,
    info: DocumentInfo,
}

impl CliConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut command = None;
        let mut positional = Vec::new();
        let mut output = None;
        let mut prefix = None;
        let mut log_file = PathBuf::from("logfile.log");
        let mut verbose = false;
        let mut info = DocumentInfo::default();

        let mut i = 1;
        while i < args.len() {
            let arg = args[i].as_str();
            let mut value = || {
                i += 1;
                args.get(i).cloned().ok_or_else(|| format!("{} needs a value", arg))
            };
            match arg {
                "--output" | "-o" => output = Some(value()?),
                "--prefix" => prefix = Some(value()?),
                "--log-file" => log_file = PathBuf::from(value()?),
                "--title" => info.title = Some(value()?),
                "--author" => info.author = Some(value()?),
                "--subject" => info.subject = Some(value()?),
                "--creator" => info.creator = Some(value()?),
                "--producer" => info.producer = Some(value()?),
                "--verbose" | "-v" => verbose = true,
                "--help" | "-h" => return Err(usage()),
                _ if arg.starts_with("--") => return Err(format!("unknown option {}\n{}", arg, usage())),
                _ if command.is_none() => command = Some(arg.to_string()),
                _ => positional.push(arg.to_string()),
            }
            i += 1;
        }

        Ok(Self {
            command: command.ok_or_else(usage)?,
            positional,
            output,
            prefix,
            log_file,
            verbose,
            info,
        })
    }

    fn input(&self) -> Result<&str, String> {
        self.positional
            .first()
            .map(String::as_str)
            .ok_or_else(|| format!("{}: missing input file", self.command))
    }

    fn password(&self) -> Result<&str, String> {
        self.positional
            .get(1)
            .map(String::as_str)
            .ok_or_else(|| format!("{}: missing password", self.command))
    }
}

fn usage() -> String {
    "usage: pdf_handler <metadata|write-metadata|merge|split|text|encrypt|decrypt|add-password|remove-password> \
     <input.pdf> [args] [--output FILE] [--log-file FILE] [-v]"
        .to_string()
}

/// `<timestamp> - <LEVEL>: <message>` lines appended to `path`.
fn init_logging(config: &CliConfig) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(&config.log_file)?;
    let level = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn run(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let handler = PdfHandler::new(config.input()?)?;
    let output = config.output.as_deref();

    match config.command.as_str() {
        "metadata" => {
            let metadata = handler.read_metadata()?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        },
        "write-metadata" => {
            let name = output.ok_or("write-metadata: --output is required")?;
            let path = handler.write_metadata(name, &config.info)?;
            println!("{}", path.display());
        },
        "merge" => {
            let path = handler.merge(&config.positional[1..], output)?;
            println!("{}", path.display());
        },
        "split" => {
            let mut failed = 0;
            for output in handler.split(config.prefix.as_deref())? {
                match output {
                    Ok(path) => println!("{}", path.display()),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        failed += 1;
                    },
                }
            }
            if failed > 0 {
                return Err(format!("{} page(s) could not be split", failed).into());
            }
        },
        "text" => {
            let pages: Vec<usize> = if config.positional.len() > 1 {
                config.positional[1..]
                    .iter()
                    .map(|p| p.parse::<usize>().map_err(|e| format!("bad page number {}: {}", p, e)))
                    .collect::<Result<_, _>>()?
            } else {
                (0..handler.read_metadata()?.page_count).collect()
            };
            for (number, text) in handler.extract_text(&pages)? {
                println!("--- Text from page {} ---", number);
                match text {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("[Error: {}]", e),
                }
            }
        },
        "encrypt" => println!("{}", handler.encrypt(config.password()?, output)?.display()),
        "add-password" => println!("{}", handler.add_password(config.password()?, output)?.display()),
        "decrypt" | "remove-password" => {
            let password = config.password()?;
            let written = if config.command == "decrypt" {
                handler.decrypt(password, output)?
            } else {
                handler.remove_password(password, output)?
            };
            match written {
                Some(path) => println!("{}", path.display()),
                None => println!("The PDF is not encrypted."),
            }
        },
        other => return Err(format!("unknown command {}\n{}", other, usage()).into()),
    }
    Ok(())
}

fn main() -> ExitCode {
    let config = match CliConfig::from_args() {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        },
    };
    if let Err(e) = init_logging(&config) {
        eprintln!("Cannot open log file {}: {}", config.log_file.display(), e);
        return ExitCode::from(2);
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("An error occurred: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
