use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rawrecords::{ConfigBuilder, RawSession, Reader, Record, DEFAULT_EXTENSION, DEFAULT_VERSION};
use std::path::PathBuf;

/// Export power flow case state to Modelica records.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the case files found at the input path
    List(CaseArgs),

    /// Write voltage, machine, load and transformer records
    Export(ExportArgs),
}

#[derive(Args)]
struct CaseArgs {
    /// A case file, or a directory of case files
    #[arg(required = true)]
    input: PathBuf,

    /// Case file extension.
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    extension: String,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    case: CaseArgs,

    /// Output directory, must exist.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// RAW format version requested from the engine.
    #[arg(long, default_value = DEFAULT_VERSION)]
    raw_version: String,
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_level(false)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match execute(&cli) {
        Ok(_) => {
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let (case, output, version) = match &cli.command {
        Commands::List(args) => (args, PathBuf::from("."), DEFAULT_VERSION.to_string()),
        Commands::Export(args) => (&args.case, args.output.clone(), args.raw_version.clone()),
    };

    let config = ConfigBuilder::default()
        .workdir(output)
        .raw_path(case.input.clone())
        .extension(case.extension.clone())
        .version(version)
        .build()?;

    let mut reader = Reader::new(config, RawSession::new())?;
    let raw_files = reader.list_raw_files()?;

    if let Commands::List(_) = &cli.command {
        for path in &raw_files {
            println!("{}", path.display());
        }
        return Ok(());
    }

    for path in &raw_files {
        reader.open_raw(path)?;
        let case = reader.read_raw()?;

        let record = Record::new(&reader.config().workdir, &case)?;
        record.write_voltages()?;
        record.write_machines()?;
        record.write_loads()?;
        record.write_trafos()?;
    }
    reader.close();

    Ok(())
}
