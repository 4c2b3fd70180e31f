//! DynamoDB table, item and stream commands.

mod error;

pub use error::{DynamodbError, Result};

use std::path::PathBuf;

use cloudkit_aws::dynamodb::{client, deploy, Client};
use cloudkit_aws::SdkConfig;
use cloudkit_aws::{DynamoMachines, DynamoMovies, StreamReader, StreamStart};
use cloudkit_core::dynamo::{
    calculate_deploy_plan, calculate_destroy_plan, format_image, generate_machine_id, movies_table_config, parse_movie_seeds,
    streams_table_config, temperature_index, upsert_reading, DeployPlan, DestroyPlan,
    MachineReading, MachineRepository, Movie, MovieRepository, TableConfig, MOVIES_TABLE,
    STREAMS_TABLE,
};

use crate::prelude::*;

/// DynamoDB commands.
#[derive(Debug, clap::Parser)]
pub struct DynamodbCommand {
    #[command(subcommand)]
    pub action: DynamodbAction,
}

/// Available DynamoDB actions.
#[derive(Debug, clap::Subcommand)]
pub enum DynamodbAction {
    /// Deploy or destroy one of the example tables.
    Deploy(DeployCommand),

    /// Load the movie seed file into the movies table.
    LoadMovies(LoadMoviesCommand),

    /// Add a movie unless one with the same key exists.
    PutMovie(MovieCommand),

    /// Create or replace a movie.
    SaveMovie(MovieCommand),

    /// Get a movie by year and title.
    GetMovie(MovieKeyCommand),

    /// Get several movies in one batch.
    BatchGet(BatchGetCommand),

    /// List the movies of one year.
    ByYear(ByYearCommand),

    /// Find a movie through the title index.
    ByTitle(ByTitleCommand),

    /// Get a machine reading by its key.
    GetMachine(MachineKeyCommand),

    /// Find a machine through the machine name index.
    FindMachine(FindMachineCommand),

    /// List machines reporting a temperature.
    ByTemperature(ByTemperatureCommand),

    /// Record a temperature for a machine, creating the machine when unknown.
    RecordTemperature(RecordTemperatureCommand),

    /// Add the temperature index to the streams table.
    CreateTemperatureIndex(CreateIndexCommand),

    /// Print the records of the table's stream.
    StreamRecords(StreamRecordsCommand),
}

/// Which example table to manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TableKind {
    /// Movies keyed by year and title.
    Movies,
    /// Machine readings with a stream.
    Streams,
}

impl TableKind {
    fn config(self) -> TableConfig {
        match self {
            TableKind::Movies => movies_table_config(),
            TableKind::Streams => streams_table_config(),
        }
    }
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "Deploy or destroy an example table.

The command compares the table with its expected layout, shows a plan and
asks for confirmation before applying it. Missing global secondary indexes
are added to existing tables.

Environment variables:
  AWS_ENDPOINT_URL    - Use local DynamoDB (e.g., http://localhost:8000)
  AWS_REGION          - AWS region (defaults to us-west-2)
  AWS_PROFILE         - AWS profile to use for credentials")]
pub struct DeployCommand {
    /// Table layout to deploy.
    #[arg(long, value_enum, default_value_t = TableKind::Movies)]
    pub table: TableKind,

    /// Table name to use instead of the layout's default.
    #[arg(long)]
    pub table_name: Option<String>,

    /// Destroy the table instead of creating/updating.
    #[arg(long)]
    pub destroy: bool,

    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, clap::Parser)]
pub struct LoadMoviesCommand {
    /// JSON array of `{year, title, info}` objects.
    #[arg(long, value_name = "FILE")]
    pub file: PathBuf,

    #[arg(long, default_value = MOVIES_TABLE)]
    pub table_name: String,
}

#[derive(Debug, clap::Parser)]
pub struct MovieKeyCommand {
    #[arg(long)]
    pub year: i32,

    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = MOVIES_TABLE)]
    pub table_name: String,
}

#[derive(Debug, clap::Parser)]
pub struct MovieCommand {
    #[command(flatten)]
    pub key: MovieKeyCommand,

    /// Actor name; repeat for several actors.
    #[arg(long = "actor")]
    pub actors: Vec<String>,
}

impl MovieCommand {
    fn movie(&self) -> Movie {
        let movie = Movie::new(self.key.year, &self.key.title);
        if self.actors.is_empty() {
            movie
        } else {
            movie.with_actors(self.actors.clone())
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct BatchGetCommand {
    /// Movie key as `YEAR:TITLE`; repeat for several movies.
    #[arg(long = "movie", required = true, value_parser = parse_movie_key)]
    pub movies: Vec<(i32, String)>,

    #[arg(long, default_value = MOVIES_TABLE)]
    pub table_name: String,
}

#[derive(Debug, clap::Parser)]
pub struct ByYearCommand {
    #[arg(long)]
    pub year: i32,

    /// Maximum number of movies to return.
    #[arg(long, default_value = "10")]
    pub limit: i32,

    #[arg(long, default_value = MOVIES_TABLE)]
    pub table_name: String,
}

#[derive(Debug, clap::Parser)]
pub struct ByTitleCommand {
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = MOVIES_TABLE)]
    pub table_name: String,
}

#[derive(Debug, clap::Parser)]
pub struct MachineKeyCommand {
    #[arg(long)]
    pub machine_id: i64,

    #[arg(long)]
    pub machine_type: String,

    #[arg(long, default_value = STREAMS_TABLE)]
    pub table_name: String,
}

#[derive(Debug, clap::Parser)]
pub struct FindMachineCommand {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = STREAMS_TABLE)]
    pub table_name: String,
}

#[derive(Debug, clap::Parser)]
pub struct ByTemperatureCommand {
    #[arg(long)]
    pub temperature: String,

    /// Maximum number of readings to return.
    #[arg(long, default_value = "10")]
    pub limit: i32,

    #[arg(long, default_value = STREAMS_TABLE)]
    pub table_name: String,
}

#[derive(Debug, clap::Parser)]
pub struct RecordTemperatureCommand {
    #[arg(long)]
    pub name: String,

    /// Type used when the machine is created.
    #[arg(long)]
    pub machine_type: String,

    #[arg(long)]
    pub temperature: String,

    #[arg(long, default_value = STREAMS_TABLE)]
    pub table_name: String,
}

#[derive(Debug, clap::Parser)]
pub struct CreateIndexCommand {
    /// Partition key attribute of the index.
    #[arg(long, default_value = "temperature")]
    pub hash_key: String,

    /// Sort key attribute of the index.
    #[arg(long)]
    pub range_key: Option<String>,

    #[arg(long, default_value = STREAMS_TABLE)]
    pub table_name: String,

    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "Print the records of the table's stream.

Only the first shard is read. By default reading starts at the oldest
retained record; with --latest only records written from now on are returned,
which usually yields nothing for a one-off read.")]
pub struct StreamRecordsCommand {
    #[arg(long, default_value = STREAMS_TABLE)]
    pub table_name: String,

    /// Maximum number of records to return.
    #[arg(long, default_value = "10")]
    pub limit: i32,

    /// Start at the latest record instead of the trim horizon.
    #[arg(long)]
    pub latest: bool,
}

/// Parses `YEAR:TITLE`. Titles may themselves contain colons.
fn parse_movie_key(value: &str) -> std::result::Result<(i32, String), String> {
    let (year, title) = value
        .split_once(':')
        .ok_or_else(|| format!("expected YEAR:TITLE, got '{}'", value))?;
    let year = year
        .trim()
        .parse()
        .map_err(|_| format!("invalid year '{}'", year))?;
    let title = title.trim();
    if title.is_empty() {
        return Err("title can not be empty".to_string());
    }
    Ok((year, title.to_string()))
}

/// Main entry point for dynamodb command.
pub async fn run(command: DynamodbCommand, global: crate::Global) -> Result<()> {
    let aws_config = global.aws_config();
    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!();
    }
    let sdk = aws_config.load().await;
    let client = client(&sdk);

    match command.action {
        DynamodbAction::Deploy(cmd) => run_deploy(cmd, &client, &global).await,
        DynamodbAction::LoadMovies(cmd) => run_load_movies(cmd, client, &global).await,
        DynamodbAction::PutMovie(cmd) => run_put_movie(cmd, client, &global).await,
        DynamodbAction::SaveMovie(cmd) => run_save_movie(cmd, client, &global).await,
        DynamodbAction::GetMovie(cmd) => run_get_movie(cmd, client).await,
        DynamodbAction::BatchGet(cmd) => run_batch_get(cmd, client, &global).await,
        DynamodbAction::ByYear(cmd) => run_by_year(cmd, client, &global).await,
        DynamodbAction::ByTitle(cmd) => run_by_title(cmd, client).await,
        DynamodbAction::GetMachine(cmd) => run_get_machine(cmd, client).await,
        DynamodbAction::FindMachine(cmd) => run_find_machine(cmd, client).await,
        DynamodbAction::ByTemperature(cmd) => run_by_temperature(cmd, client, &global).await,
        DynamodbAction::RecordTemperature(cmd) => {
            run_record_temperature(cmd, client, &global).await
        }
        DynamodbAction::CreateTemperatureIndex(cmd) => {
            run_create_index(cmd, &client, &global).await
        }
        DynamodbAction::StreamRecords(cmd) => {
            run_stream_records(cmd, &client, &sdk, &global).await
        }
    }
}

async fn run_deploy(cmd: DeployCommand, client: &Client, global: &crate::Global) -> Result<()> {
    let mut table_config = cmd.table.config();
    if let Some(name) = &cmd.table_name {
        table_config = table_config.with_table_name(name);
    }
    let table_name = table_config.table_name.clone();
    let current_state = deploy::get_table_state(client, &table_name).await?;

    if cmd.destroy {
        let plan = calculate_destroy_plan(current_state.as_ref(), &table_name);

        if !global.is_silent() {
            aprintln!("{}", p_y("Destroy Plan:"));
            for line in plan.lines() {
                aprintln!("  {}", p_r(&line));
            }
            aprintln!();
        }

        if matches!(plan, DestroyPlan::Absent { .. }) {
            if !global.is_silent() {
                aprintln!("{}", p_g("Nothing to destroy."));
            }
            return Ok(());
        }

        if !confirm(
            "Are you sure you want to delete this table? ALL DATA WILL BE LOST",
            false,
            cmd.force,
        )? {
            return Err(DynamodbError::UserCancelled);
        }

        if !global.is_silent() {
            aprintln!("{}", p_b("Deleting table..."));
        }

        deploy::execute_destroy_plan(client, &plan).await?;

        if !global.is_silent() {
            aprintln!("{}", p_g("Table destroyed successfully."));
        }
        return Ok(());
    }

    let plan = calculate_deploy_plan(current_state.as_ref(), &table_config);

    if !global.is_silent() {
        aprintln!("{}", p_c("Deploy Plan:"));
        print_plan_lines(&plan.lines());
        aprintln!();
    }

    match &plan {
        DeployPlan::UpToDate { .. } => {
            if !global.is_silent() {
                aprintln!("{}", p_g("Infrastructure is up to date."));
            }
            return Ok(());
        }
        DeployPlan::KeyMismatch { table_name, .. } => {
            return Err(DynamodbError::KeyMismatch {
                table_name: table_name.clone(),
            });
        }
        DeployPlan::Create(_) | DeployPlan::Update { .. } => {}
    }

    if !confirm("Apply these changes?", true, cmd.force)? {
        return Err(DynamodbError::UserCancelled);
    }

    if !global.is_silent() {
        aprintln!("{}", p_b("Applying changes..."));
    }

    deploy::execute_deploy_plan(client, &plan).await?;

    if !global.is_silent() {
        aprintln!("{}", p_g("Infrastructure deployed successfully."));
    }
    Ok(())
}

fn print_plan_lines(lines: &[String]) {
    for line in lines {
        if line.starts_with('+') {
            aprintln!("  {}", p_g(line));
        } else if line.starts_with('-') || line.starts_with('!') {
            aprintln!("  {}", p_r(line));
        } else if line.starts_with('~') {
            aprintln!("  {}", p_y(line));
        } else {
            aprintln!("  {}", line);
        }
    }
}

async fn require_table(client: &Client, table_name: &str) -> Result<()> {
    if deploy::get_table_state(client, table_name).await?.is_none() {
        return Err(DynamodbError::TableNotFound {
            table_name: table_name.to_string(),
        });
    }
    Ok(())
}

fn print_movie(movie: &Movie) {
    match &movie.actors {
        Some(actors) if !actors.is_empty() => {
            aprintln!("{}  {}", movie.key_display(), p_c(&actors.join(", ")))
        }
        _ => aprintln!("{}", movie.key_display()),
    }
}

fn print_reading(reading: &MachineReading) {
    aprintln!(
        "{} {}  {}  {}",
        p_b(&reading.machine_id.to_string()),
        reading.machine_type,
        or_dash(reading.machine_name.as_deref()),
        or_dash(reading.temperature.as_deref()),
    );
}

async fn run_load_movies(
    cmd: LoadMoviesCommand,
    client: Client,
    global: &crate::Global,
) -> Result<()> {
    require_table(&client, &cmd.table_name).await?;

    let json = tokio::fs::read_to_string(&cmd.file).await?;
    let seeds = parse_movie_seeds(&json)?;
    let movies = DynamoMovies::new(client, &cmd.table_name);

    for (index, seed) in seeds.iter().enumerate() {
        movies.load_seed(seed).await?;
        tracing::debug!(year = seed.year, title = %seed.title, index, "loaded movie");
    }

    if !global.is_silent() {
        aprintln!(
            "{} {} movies into {}",
            p_g("Loaded"),
            seeds.len(),
            cmd.table_name
        );
    }
    Ok(())
}

async fn run_put_movie(cmd: MovieCommand, client: Client, global: &crate::Global) -> Result<()> {
    let movie = cmd.movie();
    let movies = DynamoMovies::new(client, &cmd.key.table_name);

    if movies.put_movie_if_absent(&movie).await? {
        if !global.is_silent() {
            aprintln!("{} {}", p_g("Added:"), movie.key_display());
        }
    } else if !global.is_silent() {
        aprintln!("{} {}", p_y("Already exists:"), movie.key_display());
    }
    Ok(())
}

async fn run_save_movie(cmd: MovieCommand, client: Client, global: &crate::Global) -> Result<()> {
    let movie = cmd.movie();
    DynamoMovies::new(client, &cmd.key.table_name)
        .save_movie(&movie)
        .await?;

    if !global.is_silent() {
        aprintln!("{} {}", p_g("Saved:"), movie.key_display());
    }
    Ok(())
}

async fn run_get_movie(cmd: MovieKeyCommand, client: Client) -> Result<()> {
    let movie = DynamoMovies::new(client, &cmd.table_name)
        .get_movie(cmd.year, &cmd.title)
        .await?
        .ok_or(DynamodbError::MovieNotFound {
            year: cmd.year,
            title: cmd.title,
        })?;
    print_movie(&movie);
    Ok(())
}

async fn run_batch_get(cmd: BatchGetCommand, client: Client, global: &crate::Global) -> Result<()> {
    let found = DynamoMovies::new(client, &cmd.table_name)
        .batch_get_movies(&cmd.movies)
        .await?;

    for movie in &found {
        print_movie(movie);
    }
    if !global.is_silent() {
        aprintln!();
        aprintln!(
            "{} {} of {} requested",
            p_b("Found:"),
            found.len(),
            cmd.movies.len()
        );
    }
    Ok(())
}

async fn run_by_year(cmd: ByYearCommand, client: Client, global: &crate::Global) -> Result<()> {
    let movies = DynamoMovies::new(client, &cmd.table_name)
        .query_by_year(cmd.year, cmd.limit)
        .await?;

    if movies.is_empty() && !global.is_silent() {
        aprintln!("{} {}", p_y("No movies for year"), cmd.year);
    }
    for movie in &movies {
        print_movie(movie);
    }
    Ok(())
}

async fn run_by_title(cmd: ByTitleCommand, client: Client) -> Result<()> {
    let movie = DynamoMovies::new(client, &cmd.table_name)
        .query_by_title(&cmd.title)
        .await?;

    match movie {
        Some(movie) => print_movie(&movie),
        None => aprintln!("{} {}", p_y("No movie titled"), cmd.title),
    }
    Ok(())
}

async fn run_get_machine(cmd: MachineKeyCommand, client: Client) -> Result<()> {
    let reading = DynamoMachines::new(client, &cmd.table_name)
        .get_reading(cmd.machine_id, &cmd.machine_type)
        .await?
        .ok_or_else(|| DynamodbError::MachineNotFound {
            machine: format!("{}/{}", cmd.machine_id, cmd.machine_type),
        })?;
    print_reading(&reading);
    Ok(())
}

async fn run_find_machine(cmd: FindMachineCommand, client: Client) -> Result<()> {
    let reading = DynamoMachines::new(client, &cmd.table_name)
        .find_by_name(&cmd.name)
        .await?
        .ok_or(DynamodbError::MachineNotFound { machine: cmd.name })?;
    print_reading(&reading);
    Ok(())
}

async fn run_by_temperature(
    cmd: ByTemperatureCommand,
    client: Client,
    global: &crate::Global,
) -> Result<()> {
    let readings = DynamoMachines::new(client, &cmd.table_name)
        .query_by_temperature(&cmd.temperature, cmd.limit)
        .await?;

    if readings.is_empty() && !global.is_silent() {
        aprintln!("{} {}", p_y("No machines at"), cmd.temperature);
    }
    for reading in &readings {
        print_reading(reading);
    }
    Ok(())
}

async fn run_record_temperature(
    cmd: RecordTemperatureCommand,
    client: Client,
    global: &crate::Global,
) -> Result<()> {
    let machines = DynamoMachines::new(client, &cmd.table_name);
    let existing = machines.find_by_name(&cmd.name).await?;
    let created = existing.is_none();

    let reading = upsert_reading(
        existing,
        &cmd.name,
        &cmd.machine_type,
        &cmd.temperature,
        generate_machine_id(&mut rand::rng()),
    );
    machines.save_reading(&reading).await?;

    if !global.is_silent() {
        let label = if created { "Created:" } else { "Updated:" };
        aprintln!("{}", p_g(label));
        print_reading(&reading);
    }
    Ok(())
}

async fn run_create_index(
    cmd: CreateIndexCommand,
    client: &Client,
    global: &crate::Global,
) -> Result<()> {
    let gsi = temperature_index(Some(&cmd.hash_key), cmd.range_key.as_deref())?;
    require_table(client, &cmd.table_name).await?;

    if !global.is_silent() {
        let keys = match &gsi.sort_key {
            Some(sk) => format!("{}, {}", gsi.partition_key.name, sk.name),
            None => gsi.partition_key.name.clone(),
        };
        aprintln!("  {}", p_g(&format!("+ Add GSI: {} ({})", gsi.name, keys)));
        aprintln!();
    }

    if !confirm("Create this index?", true, cmd.force)? {
        return Err(DynamodbError::UserCancelled);
    }

    deploy::create_index(client, &cmd.table_name, &gsi).await?;

    if !global.is_silent() {
        aprintln!("{} {}", p_g("Index active:"), gsi.name);
    }
    Ok(())
}

async fn run_stream_records(
    cmd: StreamRecordsCommand,
    client: &Client,
    sdk: &SdkConfig,
    global: &crate::Global,
) -> Result<()> {
    let stream_arn = deploy::latest_stream_arn(client, &cmd.table_name)
        .await?
        .ok_or_else(|| DynamodbError::NoStream {
            table_name: cmd.table_name.clone(),
        })?;

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Stream:"), stream_arn);
    }

    let start = if cmd.latest {
        StreamStart::Latest
    } else {
        StreamStart::TrimHorizon
    };
    let records = StreamReader::from_sdk(sdk)
        .read_first_shard(&stream_arn, start, cmd.limit)
        .await?;

    if records.is_empty() && !global.is_silent() {
        aprintln!("{}", p_y("No records."));
    }
    for record in &records {
        aprintln!(
            "{} {}",
            p_c(or_dash(record.event_name.as_deref())),
            format_image(&record.change.keys)
        );
        if !record.change.old_image.is_empty() {
            aprintln!("  old: {}", format_image(&record.change.old_image));
        }
        if !record.change.new_image.is_empty() {
            aprintln!("  new: {}", format_image(&record.change.new_image));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Wrapper {
        #[command(subcommand)]
        action: DynamodbAction,
    }

    #[test]
    fn test_parse_movie_key() {
        assert_eq!(
            parse_movie_key("2013:Rush").unwrap(),
            (2013, "Rush".to_string())
        );
        assert_eq!(
            parse_movie_key("1977: Star Wars: A New Hope").unwrap(),
            (1977, "Star Wars: A New Hope".to_string())
        );
        assert!(parse_movie_key("Rush").is_err());
        assert!(parse_movie_key("year:Rush").is_err());
        assert!(parse_movie_key("2013:").is_err());
    }

    #[test]
    fn test_batch_get_collects_keys() {
        let parsed = Wrapper::try_parse_from([
            "x",
            "batch-get",
            "--movie",
            "2013:Rush",
            "--movie",
            "2011:2 Guns",
        ])
        .unwrap();

        match parsed.action {
            DynamodbAction::BatchGet(cmd) => {
                assert_eq!(cmd.movies.len(), 2);
                assert_eq!(cmd.table_name, MOVIES_TABLE);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_deploy_defaults() {
        let parsed = Wrapper::try_parse_from(["x", "deploy", "--table", "streams"]).unwrap();

        match parsed.action {
            DynamodbAction::Deploy(cmd) => {
                assert_eq!(cmd.table, TableKind::Streams);
                assert_eq!(cmd.table.config().table_name, STREAMS_TABLE);
                assert!(!cmd.destroy);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_movie_without_actors() {
        let cmd = MovieCommand {
            key: MovieKeyCommand {
                year: 2013,
                title: "Rush".to_string(),
                table_name: MOVIES_TABLE.to_string(),
            },
            actors: Vec::new(),
        };
        assert_eq!(cmd.movie().actors, None);
    }
}
