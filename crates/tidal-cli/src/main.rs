use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tidal_ast::{Arg, Expr, Value};
use tidal_cli::{init_tracing, read_source, session_env, table_from_json, table_to_json};
use tidal_eval::{DataFrame, Runtime};
use tidal_parse::{parse_arg, parse_expr, parse_program};

#[derive(Parser, Debug)]
#[command(name = "tidal")]
#[command(about = "tidal: deferred evaluation and data-masked table verbs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Bindings shared by every evaluating subcommand.
#[derive(clap::Args, Debug)]
struct Scope {
    /// Define `name=expr` in the top environment (repeatable)
    #[arg(long = "let", value_name = "NAME=EXPR")]
    lets: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a source file and dump the expressions
    Parse {
        /// Path to source file (`-` for stdin)
        file: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },

    /// Evaluate a single expression and print its value
    Eval {
        expr: String,

        #[command(flatten)]
        scope: Scope,
    },

    /// Run a script and print the value of its last expression
    Run {
        /// Path to source file (`-` for stdin)
        file: String,

        #[command(flatten)]
        scope: Scope,
    },

    /// Keep the rows for which every predicate is TRUE
    Filter {
        /// Path to a JSON table (`-` for stdin)
        table: String,

        #[arg(required = true)]
        predicates: Vec<String>,

        #[command(flatten)]
        scope: Scope,
    },

    /// Sort rows by one or more keys; wrap a key in desc() to reverse it
    Arrange {
        table: String,

        #[arg(required = true)]
        keys: Vec<String>,

        #[command(flatten)]
        scope: Scope,
    },

    /// Add or replace columns, each seeing the ones before it
    Mutate {
        table: String,

        /// `name = expr` column definitions
        #[arg(required = true)]
        columns: Vec<String>,

        #[command(flatten)]
        scope: Scope,
    },

    /// Add or replace columns computed from the original table only
    Transform {
        table: String,

        #[arg(required = true)]
        columns: Vec<String>,

        #[command(flatten)]
        scope: Scope,
    },

    /// Reduce the table to one row, or one row per group
    Summarise {
        table: String,

        #[arg(required = true)]
        columns: Vec<String>,

        /// Group by this column (repeatable)
        #[arg(long = "by", value_name = "COLUMN")]
        by: Vec<String>,

        #[command(flatten)]
        scope: Scope,
    },
}

#[derive(ValueEnum, Clone, Debug)]
enum Format {
    Pretty,
    Json,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file, format } => cmd_parse(&file, format),
        Commands::Eval { expr, scope } => cmd_eval(&expr, &scope),
        Commands::Run { file, scope } => cmd_run(&file, &scope),
        Commands::Filter {
            table,
            predicates,
            scope,
        } => {
            let exprs = parse_exprs(&predicates)?;
            with_table(&table, &scope, |rt, df, env| rt.filter(df, &exprs, env))
        }
        Commands::Arrange { table, keys, scope } => {
            let exprs = parse_exprs(&keys)?;
            with_table(&table, &scope, |rt, df, env| rt.arrange(df, &exprs, env))
        }
        Commands::Mutate {
            table,
            columns,
            scope,
        } => {
            let args = parse_args(&columns)?;
            with_table(&table, &scope, |rt, df, env| rt.mutate(df, &args, env))
        }
        Commands::Transform {
            table,
            columns,
            scope,
        } => {
            let args = parse_args(&columns)?;
            with_table(&table, &scope, |rt, df, env| rt.transform(df, &args, env))
        }
        Commands::Summarise {
            table,
            columns,
            by,
            scope,
        } => {
            let args = parse_args(&columns)?;
            with_table(&table, &scope, |rt, df, env| {
                if by.is_empty() {
                    rt.summarise(df, &args, env)
                } else {
                    rt.summarise_by(df, &by, &args, env)
                }
            })
        }
    }
}

fn parse_exprs(srcs: &[String]) -> Result<Vec<Expr>> {
    srcs.iter().map(|s| parse_expr(s)).collect()
}

fn parse_args(srcs: &[String]) -> Result<Vec<Arg>> {
    srcs.iter().map(|s| parse_arg(s)).collect()
}

fn with_table<F>(path: &str, scope: &Scope, verb: F) -> Result<()>
where
    F: FnOnce(&mut Runtime, &DataFrame, tidal_ast::EnvId) -> tidal_eval::Result<DataFrame>,
{
    let df = table_from_json(&read_source(path)?)?;
    let mut rt = Runtime::new();
    let env = session_env(&mut rt, &scope.lets)?;
    let out = verb(&mut rt, &df, env)?;
    println!("{}", serde_json::to_string_pretty(&table_to_json(&out))?);
    Ok(())
}

fn cmd_parse(file: &str, format: Format) -> Result<()> {
    let src = read_source(file)?;
    let exprs = parse_program(file, &src)?;
    match format {
        Format::Pretty => {
            for e in &exprs {
                println!("{}", e);
            }
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(&exprs)?),
    }
    Ok(())
}

fn cmd_eval(src: &str, scope: &Scope) -> Result<()> {
    let expr = parse_expr(src)?;
    let mut rt = Runtime::new();
    let env = session_env(&mut rt, &scope.lets)?;
    let value = rt.eval_in(&expr, env)?;
    println!("{}", value);
    Ok(())
}

fn cmd_run(file: &str, scope: &Scope) -> Result<()> {
    let src = read_source(file)?;
    let program = parse_program(file, &src)?;
    let mut rt = Runtime::new();
    let env = session_env(&mut rt, &scope.lets)?;
    let mut last = Value::Null;
    for expr in &program {
        last = rt.eval_in(expr, env)?;
    }
    println!("{}", last);
    Ok(())
}
