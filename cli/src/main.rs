use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use shapecheck_catalog::{EngineConfig, SchemaCatalog, read_document};
use shapecheck_core::{DateFormat, SchemaNode, Value, normalize};
use shapecheck_engine::{Parser as ValueParser, Structure, Validator};

/// CLI-specific date format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliDateFormat {
    Iso,
    #[value(name = "yyyy-mm-dd")]
    YearMonthDay,
}

impl From<CliDateFormat> for DateFormat {
    fn from(fmt: CliDateFormat) -> Self {
        match fmt {
            CliDateFormat::Iso => Self::Iso,
            CliDateFormat::YearMonthDay => Self::YearMonthDay,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "shapecheck", version)]
#[command(about = "Validate and parse JSON/YAML documents against declarative schemas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate documents against a schema.
    Validate(ValidateArgs),
    /// Coerce a string-encoded document into native values.
    Parse(ParseArgs),
    /// Print a schema with references expanded and extends merged.
    Normalize(NormalizeArgs),
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Schema file (JSON or YAML), or the name of a schema in the catalog.
    #[arg(long)]
    schema: String,
    /// Directory of named schemas, one per file (repeatable).
    #[arg(long = "schemas", value_name = "DIR")]
    schema_dirs: Vec<PathBuf>,
    /// Engine configuration file (JSON or YAML).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Report every problem instead of the first one.
    #[arg(long)]
    all_errors: bool,
    /// Accept empty strings for optional string fields.
    #[arg(long)]
    allow_empty_strings: bool,
    /// Accept empty arrays unless an entry says `nonEmpty: true`.
    #[arg(long)]
    allow_empty_arrays: bool,
    /// Accept date strings for `date` fields.
    #[arg(long)]
    date_strings: bool,
    /// Date string format.
    #[arg(long)]
    date_format: Option<CliDateFormat>,
    /// Number of parallel validation jobs (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    /// Documents to validate (JSON or YAML).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Treat the input as a flat map of strings (query parameters, CSV rows).
    #[arg(long)]
    flat: bool,
    /// Date string format.
    #[arg(long)]
    date_format: Option<CliDateFormat>,
    /// Only convert date strings; leave other values untouched.
    #[arg(long)]
    dates_only: bool,
    /// Document to parse; `-` reads JSON from stdin.
    input: PathBuf,
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Parse(args) => run_parse(args),
        Command::Normalize(args) => run_normalize(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Schema, catalog and configuration resolved from [`SchemaArgs`].
struct Loaded {
    schema: SchemaNode,
    catalog: SchemaCatalog,
    config: EngineConfig,
}

fn load(args: &SchemaArgs) -> Result<Loaded, String> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => EngineConfig::default(),
    };
    let base_dir = args
        .config
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));
    let mut catalog = config.catalog(base_dir).map_err(|e| e.to_string())?;
    for dir in &args.schema_dirs {
        let loaded = SchemaCatalog::from_dir(dir).map_err(|e| format!("{}: {e}", dir.display()))?;
        catalog.merge(loaded);
    }

    let schema_path = Path::new(&args.schema);
    let schema = if schema_path.is_file() {
        let raw: serde_json::Value =
            read_document(schema_path).map_err(|e| format!("{}: {e}", args.schema))?;
        SchemaNode::from_json(raw).map_err(|e| format!("{}: {e}", args.schema))?
    } else if let Some(named) = catalog.get(&args.schema) {
        named.clone()
    } else {
        return Err(format!(
            "schema \"{}\" is neither a file nor a catalog schema",
            args.schema
        ));
    };

    Ok(Loaded {
        schema,
        catalog,
        config,
    })
}

fn read_input(path: &Path) -> Result<Value, String> {
    let raw: serde_json::Value = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("stdin: {e}"))?;
        serde_json::from_str(&text).map_err(|e| format!("stdin: {e}"))?
    } else {
        read_document(path).map_err(|e| format!("{}: {e}", path.display()))?
    };
    Ok(Value::from(raw))
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let loaded = load(&args.schema)?;
    let mut options = loaded.config.validator_options(&loaded.catalog);
    options.return_all_errors |= args.all_errors;
    options.allow_empty_strings |= args.allow_empty_strings;
    options.allow_empty_arrays |= args.allow_empty_arrays;
    options.date_strings |= args.date_strings;
    if let Some(format) = args.date_format {
        options.date_format = format.into();
    }
    let validator = Validator::new(&loaded.schema, options).map_err(|e| e.to_string())?;

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = args.jobs {
        pool = pool.num_threads(jobs);
    }
    let pool = pool
        .build()
        .map_err(|e| format!("Failed to create thread pool: {e}"))?;

    let outcomes: Vec<(PathBuf, Result<(), Vec<String>>)> = pool.install(|| {
        args.inputs
            .par_iter()
            .map(|path| {
                let outcome = read_input(path)
                    .map_err(|e| vec![e])
                    .and_then(|value| {
                        validator.validate(value).map(|_| ()).map_err(|err| {
                            err.errors
                                .iter()
                                .map(|issue| format!("{} [{}]", issue.message, issue.kind))
                                .collect()
                        })
                    });
                (path.clone(), outcome)
            })
            .collect()
    });

    let mut failed = 0;
    for (path, outcome) in &outcomes {
        match outcome {
            Ok(()) => println!("{}: ok", path.display()),
            Err(messages) => {
                failed += 1;
                println!("{}: failed", path.display());
                for message in messages {
                    println!("  - {message}");
                }
            }
        }
    }
    println!(
        "Validated {} document(s), {failed} failed.",
        outcomes.len()
    );

    if failed > 0 {
        return Err(format!("{failed} document(s) failed validation"));
    }
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let loaded = load(&args.schema)?;
    let mut options = loaded.config.parser_options(&loaded.catalog);
    if args.flat {
        options.structure = Structure::Flat;
    }
    if let Some(format) = args.date_format {
        options.date_format = format.into();
    }
    options.parse_dates_only |= args.dates_only;
    let parser = ValueParser::new(&loaded.schema, options).map_err(|e| e.to_string())?;

    let input = read_input(&args.input)?;
    let parsed = parser
        .parse(input)
        .map_err(|err| format!("{} [{}]", err.message, err.kind))?;
    let json = serde_json::to_string_pretty(&serde_json::Value::from(parsed))
        .map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn run_normalize(args: NormalizeArgs) -> Result<(), String> {
    let loaded = load(&args.schema)?;
    let normalized = normalize(&loaded.schema, loaded.catalog.named()).map_err(|e| e.to_string())?;
    let raw = normalized.to_json();
    let text = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&raw).map_err(|e| e.to_string())?,
        CliOutputFormat::Yaml => serde_yaml::to_string(&raw).map_err(|e| e.to_string())?,
    };
    println!("{}", text.trim_end());
    Ok(())
}
