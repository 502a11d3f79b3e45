use clap::{Args, Parser as ClapParser, Subcommand};
use custom_expr::cli::{self, CheckOptions, CheckResult, CliError};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(ClapParser)]
#[command(name = "cexpr")]
#[command(about = "Check and compile custom expressions into query clauses")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose an expression
    Check(ExpressionArgs),

    /// Compile an expression to its JSON clause form
    Compile {
        #[command(flatten)]
        args: ExpressionArgs,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// List available functions
    Functions,

    /// Show details for one function
    Function {
        /// Function name, e.g. CountIf
        name: String,
    },
}

#[derive(Args)]
struct ExpressionArgs {
    /// The expression (reads from stdin if not provided)
    expression: Option<String>,

    /// expression, aggregation or boolean
    #[arg(short, long, default_value = "expression")]
    mode: String,

    /// Schema metadata JSON file
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Query stage the expression belongs to
    #[arg(long, default_value_t = 0)]
    stage: usize,

    /// Name of the custom column being edited
    #[arg(long)]
    name: Option<String>,

    /// Index of the expression within its stage
    #[arg(long)]
    index: Option<usize>,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Compile { args, pretty } => run_compile(args, pretty),
        Commands::Functions => {
            print!("{}", cli::functions_overview());
            Ok(())
        }
        Commands::Function { name } => cli::function_reference(&name).map(|content| {
            print!("{}", content);
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn check_options(args: ExpressionArgs, pretty: bool) -> Result<CheckOptions, CliError> {
    let expression = match args.expression {
        Some(s) => s,
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        None => return Err(CliError::NoInput),
    };

    Ok(CheckOptions {
        expression,
        mode: args.mode,
        metadata: args.metadata,
        stage_index: args.stage,
        name: args.name,
        expression_index: args.index,
        pretty,
    })
}

fn run_check(args: ExpressionArgs) -> Result<(), CliError> {
    let options = check_options(args, false)?;

    match cli::execute_check(&options)? {
        CheckResult::Valid => println!("Expression is valid"),
        CheckResult::Invalid(diagnostic) => {
            match diagnostic.span {
                Some(span) => eprintln!("{} (at {}..{})", diagnostic.message, span.start, span.end),
                None => eprintln!("{}", diagnostic.message),
            }
            std::process::exit(1);
        }
    }
    Ok(())
}

fn run_compile(args: ExpressionArgs, pretty: bool) -> Result<(), CliError> {
    let options = check_options(args, pretty)?;
    println!("{}", cli::execute_compile(&options)?);
    Ok(())
}
