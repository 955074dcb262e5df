use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use repset_core::composer::{delete_template, duplicate_template};
use repset_core::history::summarize;
use repset_core::*;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "repset")]
#[command(about = "Workout template builder and session runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Act as this user instead of the configured profile
    #[arg(long, global = true)]
    user: Option<String>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the exercise catalog
    Exercises {
        /// Text to look for in names and descriptions
        #[arg(long)]
        search: Option<String>,

        /// Only exercises working this muscle group
        #[arg(long)]
        muscle: Option<String>,

        /// Only exercises using this equipment
        #[arg(long)]
        equipment: Option<String>,

        /// Include retired exercises
        #[arg(long)]
        all: bool,
    },

    /// Build and manage workout templates
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },

    /// Run a workout session from a template
    Run {
        /// Template id (or unique prefix)
        template: String,

        /// Auto-complete (for testing) - complete every set without prompting
        #[arg(long)]
        auto_complete: bool,

        /// With --auto-complete, finish early after this many sets
        #[arg(long, requires = "auto_complete")]
        finish_after: Option<usize>,

        /// Rating used with --auto-complete (1-5)
        #[arg(long, default_value_t = 4)]
        rating: u8,

        /// Notes used with --auto-complete
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Show recent workout history
    History {
        /// How many days back to look
        #[arg(long, default_value_t = 30)]
        days: i64,
    },

    /// Roll up WAL workout logs to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// Create an empty template
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// strength, mobility, cardio or hybrid
        #[arg(long, default_value = "strength")]
        focus: String,

        /// beginner, intermediate, advanced or all_levels
        #[arg(long, default_value = "all_levels")]
        difficulty: String,

        /// Make the template visible to other users
        #[arg(long)]
        public: bool,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List your templates
    List,

    /// Show a template with its exercises
    Show { template: String },

    /// Append a catalog exercise to a template
    Add {
        template: String,

        /// Catalog exercise id
        exercise: String,

        #[command(flatten)]
        fields: PrescriptionArgs,
    },

    /// Change the prescription of one exercise
    Update {
        template: String,

        /// 1-based position in the template
        position: usize,

        #[command(flatten)]
        fields: PrescriptionArgs,

        /// Remove the timed duration
        #[arg(long, conflicts_with = "duration")]
        clear_duration: bool,
    },

    /// Remove one exercise
    Remove { template: String, position: usize },

    /// Move one exercise up or down
    Move {
        template: String,
        position: usize,
        #[arg(value_enum)]
        direction: Direction,
    },

    /// Group exercises into a superset
    Superset {
        template: String,

        #[arg(num_args = 2.., required = true)]
        positions: Vec<usize>,
    },

    /// Take one exercise out of its superset
    Unsuperset { template: String, position: usize },

    /// Copy a template (the copy is private)
    Duplicate { template: String },

    /// Delete a template and its exercises
    Delete { template: String },
}

#[derive(Args, Default)]
struct PrescriptionArgs {
    #[arg(long)]
    sets: Option<u32>,

    /// Free-form reps, e.g. "8-12" or "AMRAP"
    #[arg(long)]
    reps: Option<String>,

    /// Rest after each set, in seconds
    #[arg(long)]
    rest: Option<u32>,

    /// Duration of a timed set, in seconds
    #[arg(long)]
    duration: Option<u32>,

    #[arg(long)]
    notes: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Up,
    Down,
}

impl From<Direction> for MoveDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => MoveDirection::Up,
            Direction::Down => MoveDirection::Down,
        }
    }
}

/// Everything a command needs, resolved once from config and flags
struct Env {
    config: Config,
    catalog: Catalog,
    user_id: String,
    data_dir: PathBuf,
}

impl Env {
    fn store(&self) -> JsonTemplateStore {
        JsonTemplateStore::new(self.data_dir.join("templates"))
    }

    fn wal_dir(&self) -> PathBuf {
        self.data_dir.join("wal")
    }

    fn wal_path(&self) -> PathBuf {
        self.wal_dir().join("workout_logs.wal")
    }

    fn csv_path(&self) -> PathBuf {
        self.data_dir.join("workout_logs.csv")
    }

    fn exercise_name(&self, exercise_id: &str) -> String {
        self.catalog
            .get(exercise_id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| exercise_id.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    repset_core::logging::init_with_level(repset_core::logging::level_for_verbosity(cli.verbose));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    let catalog = get_default_catalog().with_custom(&config.catalog.custom);
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    let env = Env {
        user_id: cli.user.unwrap_or_else(|| config.profile.user_id.clone()),
        data_dir: cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone()),
        catalog,
        config,
    };

    match cli.command {
        Commands::Exercises {
            search,
            muscle,
            equipment,
            all,
        } => cmd_exercises(
            &env,
            ExerciseFilter {
                active_only: !all,
                muscle_group: muscle,
                equipment,
                search,
            },
        ),
        Commands::Template { command } => cmd_template(&env, command),
        Commands::Run {
            template,
            auto_complete,
            finish_after,
            rating,
            notes,
        } => {
            let auto = auto_complete.then_some(AutoRun {
                finish_after,
                rating,
                notes,
            });
            cmd_run(&env, &template, auto)
        }
        Commands::History { days } => cmd_history(&env, days),
        Commands::Rollup { cleanup } => cmd_rollup(&env, cleanup),
    }
}

// ============================================================================
// Catalog
// ============================================================================

fn cmd_exercises(env: &Env, filter: ExerciseFilter) -> Result<()> {
    let found = env.catalog.search(&filter);
    if found.is_empty() {
        println!("No exercises match.");
        return Ok(());
    }

    for exercise in found {
        let retired = if exercise.active { "" } else { " (retired)" };
        println!(
            "{:<20} {}{} [{}]",
            exercise.id,
            exercise.name,
            retired,
            exercise.muscle_groups.join(", ")
        );
    }
    Ok(())
}

// ============================================================================
// Templates
// ============================================================================

fn cmd_template(env: &Env, command: TemplateCommand) -> Result<()> {
    let mut store = env.store();

    match command {
        TemplateCommand::Create {
            name,
            description,
            focus,
            difficulty,
            public,
            tags,
        } => {
            let mut composer = TemplateComposer::new(&env.user_id, name)?;
            composer.set_description(description);
            composer.set_focus_area(focus.parse()?);
            composer.set_difficulty(difficulty.parse()?);
            composer.set_public(public);
            composer.set_tags(tags);
            let template = composer.save(&mut store)?;
            println!("✓ Created template '{}'", template.name);
            println!("  id: {}", template.id);
        }

        TemplateCommand::List => {
            let templates = store.list_templates(&env.user_id)?;
            if templates.is_empty() {
                println!("No templates yet.");
            }
            for template in templates {
                println!(
                    "{}  {:<24} {:<9} {:>2} exercises  ~{} min{}",
                    short_id(template.id),
                    template.name,
                    template.focus_area,
                    template.exercises.len(),
                    template.estimated_duration_minutes,
                    if template.is_public { "  (public)" } else { "" }
                );
            }
        }

        TemplateCommand::Show { template } => {
            let composer = open_template(env, &store, &template)?;
            display_template(env, composer.template());
        }

        TemplateCommand::Add {
            template,
            exercise,
            fields,
        } => {
            let mut composer = open_template(env, &store, &template)?;
            let exercise = env.catalog.get(&exercise).ok_or_else(|| {
                Error::Validation(format!("unknown exercise '{}'", exercise))
            })?;
            if !exercise.active {
                eprintln!("Note: '{}' is retired from the catalog.", exercise.name);
            }

            let defaults = env.config.composer.prescription();
            let prescription = ExercisePrescription {
                sets: fields.sets.or(defaults.sets),
                reps: fields.reps.or(defaults.reps),
                duration_seconds: fields.duration,
                rest_seconds: fields.rest.or(defaults.rest_seconds),
                notes: fields.notes,
            };
            composer.add_exercise(exercise, Some(prescription));
            let saved = composer.save(&mut store)?;
            println!(
                "✓ Added {} at position {} (~{} min total)",
                exercise.name,
                saved.exercises.len(),
                saved.estimated_duration_minutes
            );
        }

        TemplateCommand::Update {
            template,
            position,
            fields,
            clear_duration,
        } => {
            let mut composer = open_template(env, &store, &template)?;
            let id = entry_at(&composer, position)?;
            let update = TemplateExerciseUpdate {
                sets: fields.sets.map(Some),
                reps: fields.reps.map(Some),
                duration_seconds: if clear_duration {
                    Some(None)
                } else {
                    fields.duration.map(Some)
                },
                rest_seconds: fields.rest.map(Some),
                notes: fields.notes.map(Some),
            };
            if update.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            composer.update_exercise(id, update)?;
            composer.save(&mut store)?;
            println!("✓ Updated position {}", position);
        }

        TemplateCommand::Remove { template, position } => {
            let mut composer = open_template(env, &store, &template)?;
            let id = entry_at(&composer, position)?;
            let removed = composer.remove_exercise(id)?;
            composer.save(&mut store)?;
            println!("✓ Removed {}", env.exercise_name(&removed.exercise_id));
        }

        TemplateCommand::Move {
            template,
            position,
            direction,
        } => {
            let mut composer = open_template(env, &store, &template)?;
            let index = index_for(&composer, position)?;
            if composer.move_exercise(index, direction.into())? {
                composer.save(&mut store)?;
                println!("✓ Moved position {}", position);
            } else {
                println!("Already at the edge, nothing moved.");
            }
        }

        TemplateCommand::Superset {
            template,
            positions,
        } => {
            let mut composer = open_template(env, &store, &template)?;
            let ids = positions
                .iter()
                .map(|p| entry_at(&composer, *p))
                .collect::<Result<Vec<_>>>()?;
            match composer.create_superset(&ids)? {
                Some(group) => {
                    composer.save(&mut store)?;
                    println!("✓ Created superset {}", group);
                }
                None => println!("A superset needs at least two different exercises."),
            }
        }

        TemplateCommand::Unsuperset { template, position } => {
            let mut composer = open_template(env, &store, &template)?;
            let id = entry_at(&composer, position)?;
            composer.remove_from_superset(id)?;
            composer.save(&mut store)?;
            println!("✓ Removed position {} from its superset", position);
        }

        TemplateCommand::Duplicate { template } => {
            let id = resolve_template_id(env, &store, &template)?;
            let copy = duplicate_template(&mut store, id, &env.user_id)?;
            println!("✓ Created '{}'", copy.name);
            println!("  id: {}", copy.id);
        }

        TemplateCommand::Delete { template } => {
            let id = resolve_template_id(env, &store, &template)?;
            delete_template(&mut store, id, &env.user_id)?;
            println!("✓ Deleted template {}", short_id(id));
        }
    }

    Ok(())
}

/// Shortest template id prefix accepted on the command line
const MIN_ID_PREFIX: usize = 4;

/// Accept a full UUID or a unique prefix of one of the user's templates
fn resolve_template_id(env: &Env, store: &JsonTemplateStore, arg: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(arg) {
        return Ok(id);
    }
    let prefix = arg.trim().to_lowercase();
    if prefix.len() < MIN_ID_PREFIX {
        return Err(Error::Validation(format!(
            "template id '{}' is too short, give at least {} characters",
            arg, MIN_ID_PREFIX
        )));
    }
    let matches: Vec<Uuid> = store
        .list_templates(&env.user_id)?
        .into_iter()
        .map(|t| t.id)
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(Error::WorkoutNotFound(arg.to_string())),
        _ => Err(Error::Validation(format!(
            "'{}' matches {} templates, use a longer id",
            arg,
            matches.len()
        ))),
    }
}

fn open_template(env: &Env, store: &JsonTemplateStore, arg: &str) -> Result<TemplateComposer> {
    let id = resolve_template_id(env, store, arg)?;
    TemplateComposer::load(store, id, &env.user_id)
}

fn index_for(composer: &TemplateComposer, position: usize) -> Result<usize> {
    let len = composer.exercises().len();
    if position == 0 || position > len {
        return Err(Error::Validation(format!(
            "position {} is out of range (template has {} exercises)",
            position, len
        )));
    }
    Ok(position - 1)
}

fn entry_at(composer: &TemplateComposer, position: usize) -> Result<Uuid> {
    let index = index_for(composer, position)?;
    composer
        .entry_id_at(index)
        .ok_or_else(|| Error::Validation(format!("no exercise at position {}", position)))
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

fn display_template(env: &Env, template: &WorkoutTemplate) {
    println!("\n{}", template.name);
    println!(
        "  {} · {} · ~{} min{}",
        template.focus_area,
        template.difficulty,
        template.estimated_duration_minutes,
        if template.is_public { " · public" } else { "" }
    );
    if let Some(ref description) = template.description {
        println!("  {}", description);
    }
    if !template.tags.is_empty() {
        println!("  tags: {}", template.tags.join(", "));
    }
    println!();

    if template.exercises.is_empty() {
        println!("  (no exercises yet)");
    }
    for entry in template.ordered_exercises() {
        let group = entry
            .superset_group
            .map(|g| format!(" [superset {}]", g))
            .unwrap_or_default();
        println!(
            "  {:>2}. {:<26} {}{}",
            entry.order_index + 1,
            env.exercise_name(&entry.exercise_id),
            entry.prescription_label(),
            group
        );
        if let Some(ref notes) = entry.notes {
            println!("      {}", notes);
        }
    }
    println!();
}

// ============================================================================
// Sessions
// ============================================================================

/// Scripted answers for a non-interactive run
struct AutoRun {
    finish_after: Option<usize>,
    rating: u8,
    notes: String,
}

enum SetAction {
    Done,
    Skip,
    Previous,
    Finish,
}

enum RestAction {
    Wait,
    Skip,
    Extend,
}

enum ReviewAction {
    Commit { rating: u8, notes: String },
    Continue,
}

fn cmd_run(env: &Env, template: &str, auto: Option<AutoRun>) -> Result<()> {
    let store = env.store();
    let id = resolve_template_id(env, &store, template)?;

    let mut runner = SessionRunner::start_from_store(&store, id, &env.user_id, Utc::now())?
        .with_rest_extension(env.config.session.rest_extend_seconds);
    std::fs::create_dir_all(env.wal_dir())?;
    let mut sink = JsonlLogSink::new(env.wal_path());
    let mut sets_done = 0usize;

    loop {
        match runner.tick(Utc::now()) {
            Phase::Active => {
                display_set(env, &runner.snapshot(Utc::now()));
                let action = match auto {
                    Some(ref auto) if auto.finish_after.is_some_and(|n| sets_done >= n) => {
                        SetAction::Finish
                    }
                    Some(_) => SetAction::Done,
                    None => prompt_set_action()?,
                };
                match action {
                    SetAction::Done => {
                        runner.complete_set(Utc::now())?;
                        sets_done += 1;
                    }
                    SetAction::Skip => {
                        runner.skip_exercise(Utc::now())?;
                    }
                    SetAction::Previous => {
                        runner.previous_exercise(Utc::now())?;
                    }
                    SetAction::Finish => {
                        runner.request_finish()?;
                    }
                }
            }

            Phase::Resting => {
                if auto.is_some() {
                    runner.skip_rest()?;
                    continue;
                }
                let remaining = runner.rest_remaining(Utc::now()).unwrap_or(0);
                match prompt_rest_action(remaining)? {
                    RestAction::Skip => {
                        runner.skip_rest()?;
                    }
                    RestAction::Extend => match runner.extend_rest(Utc::now()) {
                        Ok(remaining) => println!(
                            "  +{}s, {}s left",
                            env.config.session.rest_extend_seconds, remaining
                        ),
                        Err(Error::InvalidTransition { .. }) => println!("  Rest already over."),
                        Err(e) => return Err(e),
                    },
                    RestAction::Wait => rest_countdown(&mut runner)?,
                }
            }

            Phase::ReviewPending => {
                let view = runner.snapshot(Utc::now());
                println!(
                    "\nWorkout over: {} of {} exercises completed in {} min.",
                    view.completed_count, view.exercise_count, view.elapsed_minutes
                );
                let action = match auto {
                    Some(ref auto) => ReviewAction::Commit {
                        rating: auto.rating,
                        notes: auto.notes.clone(),
                    },
                    None => prompt_review_action()?,
                };
                match action {
                    ReviewAction::Continue => {
                        runner.continue_workout()?;
                    }
                    ReviewAction::Commit { rating, notes } => {
                        match runner.commit(rating, &notes, Utc::now(), &mut sink) {
                            Ok(log) => {
                                println!(
                                    "\n✓ Workout logged! ({} min, rated {}/5)",
                                    log.duration_minutes, log.rating
                                );
                            }
                            Err(e)
                                if auto.is_none()
                                    && !matches!(e, Error::InvalidTransition { .. }) =>
                            {
                                // Stay in review so the user can try again
                                eprintln!("{}", e.user_message());
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }
            }

            Phase::Committed => break,
        }
    }

    Ok(())
}

/// Tick the runner once a second until the rest is over
fn rest_countdown(runner: &mut SessionRunner) -> Result<()> {
    while runner.tick(Utc::now()) == Phase::Resting {
        let remaining = runner.rest_remaining(Utc::now()).unwrap_or(0);
        print!("\r  Resting... {:>3}s ", remaining);
        if let Err(e) = io::stdout().flush() {
            runner.cancel();
            return Err(e.into());
        }
        std::thread::sleep(Duration::from_secs(1));
    }
    println!("\r  Rest over!        ");
    Ok(())
}

fn display_set(env: &Env, view: &SessionView) {
    let exercise = env.catalog.get(&view.entry.exercise_id);
    let name = exercise
        .map(|e| e.name.as_str())
        .unwrap_or(view.entry.exercise_id.as_str());

    println!("\n╭─────────────────────────────────────────╮");
    println!(
        "│  {}  ({}/{})",
        view.template_name,
        view.exercise_index + 1,
        view.exercise_count
    );
    println!("╰─────────────────────────────────────────╯");
    println!();
    print!("  {}", name);
    if let Some(group) = view.entry.superset_group {
        print!("  [superset {}]", group);
    }
    println!();
    println!("  Set {} of {}", view.current_set, view.total_sets);
    let label = view.entry.prescription_label();
    if !label.is_empty() {
        println!("  → {}", label);
    }
    if let Some(ref notes) = view.entry.notes {
        println!("  Coach: {}", notes);
    }

    if let Some(exercise) = exercise {
        for cue in &exercise.cues {
            println!("  • {}", cue);
        }
        if let Some(ref url) = exercise.video_url {
            println!("  ℹ Video: {}", url);
        }
    }
    println!();
}

fn read_line() -> Result<String> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_set_action() -> Result<SetAction> {
    println!("─────────────────────────────────────────");
    println!("Press Enter when the set is done");
    println!("  'n' + Enter to skip this exercise");
    println!("  'p' + Enter to go back one exercise");
    println!("  'f' + Enter to finish the workout now");
    print!("> ");
    io::stdout().flush()?;

    let action = match read_line()?.to_lowercase().as_str() {
        "n" => SetAction::Skip,
        "p" => SetAction::Previous,
        "f" => SetAction::Finish,
        _ => SetAction::Done,
    };
    Ok(action)
}

fn prompt_rest_action(remaining: u32) -> Result<RestAction> {
    println!("Rest {}s. Enter to start the countdown, 's' to skip, '+' to add time", remaining);
    print!("> ");
    io::stdout().flush()?;

    let action = match read_line()?.as_str() {
        "s" | "S" => RestAction::Skip,
        "+" => RestAction::Extend,
        _ => RestAction::Wait,
    };
    Ok(action)
}

fn prompt_review_action() -> Result<ReviewAction> {
    loop {
        print!("Rate this workout 1-5 (or 'c' to keep training): ");
        io::stdout().flush()?;
        let input = read_line()?;
        if input.eq_ignore_ascii_case("c") {
            return Ok(ReviewAction::Continue);
        }
        match input.parse::<u8>() {
            Ok(rating) if (1..=5).contains(&rating) => {
                print!("Notes (optional): ");
                io::stdout().flush()?;
                let notes = read_line()?;
                return Ok(ReviewAction::Commit { rating, notes });
            }
            _ => println!("Please enter a number from 1 to 5."),
        }
    }
}

// ============================================================================
// History
// ============================================================================

fn cmd_history(env: &Env, days: i64) -> Result<()> {
    let logs = load_user_logs(&env.wal_path(), &env.csv_path(), &env.user_id, days)?;
    if logs.is_empty() {
        println!("No workouts in the last {} days.", days);
        return Ok(());
    }

    for log in &logs {
        println!(
            "{}  {:<24} {:>3} min  {}  {} exercises",
            log.session_date,
            log.template_name,
            log.duration_minutes,
            "★".repeat(usize::from(log.rating)),
            log.completed_exercise_ids.len()
        );
        if !log.notes.is_empty() {
            println!("            {}", log.notes);
        }
    }

    let summary = summarize(&logs);
    println!();
    println!(
        "{} workouts, {} min total, average rating {:.1}",
        summary.sessions,
        summary.total_minutes,
        summary.average_rating.unwrap_or(0.0)
    );
    Ok(())
}

fn cmd_rollup(env: &Env, cleanup: bool) -> Result<()> {
    let wal_path = env.wal_path();
    let csv_path = env.csv_path();

    if !wal_path.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = repset_core::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path)?;

    println!("✓ Rolled up {} workout logs to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        let cleaned = repset_core::csv_rollup::cleanup_processed_wals(&env.wal_dir())?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}
