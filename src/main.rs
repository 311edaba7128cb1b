use anyhow::bail;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pgfission::plan::{PlanOptions, SequencePolicy};
use pgfission::{db, partition, plan, runner};

#[derive(Parser)]
#[command(name = "pgfission")]
#[command(
    about = "Split a PostgreSQL table and its related data into one schema per partition value",
    long_about = None
)]
struct Cli {
    /// Database connection URL, e.g. postgres://localhost/mydb
    #[arg(long, short = 'd')]
    dbname: String,

    /// Root table whose rows define the partitions
    #[arg(long, short = 't')]
    table: String,

    /// Column of the root table whose values name the generated schemas
    #[arg(long, short = 's')]
    schema_column: String,

    /// Print the statements instead of executing them
    #[arg(long)]
    print: bool,

    /// Print the plan as structured JSON instead of executing it
    #[arg(long)]
    json: bool,

    /// Drop and rebuild target schemas that already exist
    #[arg(long)]
    force: bool,

    /// Where cloned sequences start: "resume" continues past the copied ids,
    /// "fresh" leaves them at their default starting value
    #[arg(long, default_value = "resume")]
    sequence_policy: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pgfission=info".parse()?))
        .init();

    let cli = Cli::parse();

    let sequence_policy = match cli.sequence_policy.as_str() {
        "resume" => SequencePolicy::Resume,
        "fresh" => SequencePolicy::Fresh,
        other => bail!("unknown sequence policy '{other}' (expected 'resume' or 'fresh')"),
    };

    let pool = db::connect(&cli.dbname).await?;
    let catalog = db::read_catalog(&pool).await?;
    let values =
        db::read_partition_values(&pool, &catalog, &cli.table, &cli.schema_column).await?;
    let partitions = partition::enumerate(&cli.schema_column, values)?;

    let plan = plan::plan(
        &catalog,
        &cli.table,
        &cli.schema_column,
        &partitions,
        &PlanOptions { sequence_policy },
    )?;

    let mut stdout = std::io::stdout();
    if cli.json {
        runner::print_plan_json(&plan, &mut stdout)?;
    } else if cli.print {
        runner::print_plan(&plan, &mut stdout)?;
    } else {
        runner::execute_plan(&pool, &plan, cli.force).await?;
    }

    Ok(())
}
