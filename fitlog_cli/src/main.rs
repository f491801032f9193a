use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use fitlog_core::advice::{ADVICE_FALLBACK, CHAT_FALLBACK};
use fitlog_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fitlog")]
#[command(about = "Personal calorie, sleep and activity tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or show the profile that drives daily targets
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Log an entry by hand, without the assistant
    Add {
        #[command(subcommand)]
        entry: AddEntry,
    },

    /// Talk to the assistant; with no text, start an interactive session
    Chat {
        /// Message to send
        text: Vec<String>,
    },

    /// Show today's dashboard (default)
    Today {
        /// Day to show instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show per-day totals for a trailing window
    History {
        /// Number of days, ending today
        #[arg(long)]
        days: Option<u32>,

        /// Last day of the window (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Ask the assistant for a coaching tip afterwards
        #[arg(long)]
        advice: bool,
    },

    /// Export data as CSV
    Export {
        #[command(subcommand)]
        what: ExportWhat,
    },

    /// Delete the profile and every logged entry
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Create or replace the profile
    Set(ProfileArgs),
    /// Print the profile and its targets
    Show,
}

#[derive(Args)]
struct ProfileArgs {
    #[arg(long)]
    name: String,

    /// Age in years
    #[arg(long)]
    age: u32,

    /// Weight in kg
    #[arg(long)]
    weight: f64,

    /// Height in cm
    #[arg(long)]
    height: f64,

    /// male, female or other
    #[arg(long, value_parser = parse_sex)]
    sex: Sex,

    /// sedentary, light, moderate, active or very_active
    #[arg(long, value_parser = parse_activity)]
    activity: ActivityLevel,

    /// lose_weight, maintain or gain_weight
    #[arg(long, value_parser = parse_goal)]
    goal: Goal,
}

#[derive(Subcommand)]
enum AddEntry {
    /// A meal (calories eaten and macros in grams)
    Meal {
        #[arg(long)]
        description: String,
        #[arg(long, default_value_t = 0.0)]
        calories: f64,
        #[arg(long, default_value_t = 0.0)]
        protein: f64,
        #[arg(long, default_value_t = 0.0)]
        carbs: f64,
        #[arg(long, default_value_t = 0.0)]
        fats: f64,
        #[command(flatten)]
        when: When,
    },
    /// A night or nap
    Sleep {
        /// Hours slept
        #[arg(long)]
        hours: f64,
        #[arg(long, default_value = "Sleep")]
        description: String,
        #[command(flatten)]
        when: When,
    },
    /// A workout (calories burned)
    Activity {
        #[arg(long)]
        description: String,
        #[arg(long, default_value_t = 0.0)]
        calories: f64,
        #[arg(long, default_value_t = 0.0)]
        minutes: f64,
        #[command(flatten)]
        when: When,
    },
}

#[derive(Args)]
struct When {
    /// Timestamp (RFC 3339) instead of now
    #[arg(long, value_parser = parse_timestamp)]
    at: Option<DateTime<FixedOffset>>,
}

#[derive(Subcommand)]
enum ExportWhat {
    /// One row per day of a trailing window
    Summaries {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Every logged entry
    Entries {
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() {
    fitlog_core::logging::init_with_level("warn");

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let store = FileStore::open(&data_dir);

    // Default to the dashboard
    let command = cli.command.unwrap_or(Commands::Today { date: None });

    // Reset must work even when stored data no longer loads
    let mut tracker = match command {
        Commands::Reset { yes } => return cmd_reset(store, yes),
        _ => Tracker::open(store)?,
    };

    match command {
        Commands::Profile { action } => match action {
            ProfileAction::Set(args) => cmd_profile_set(&mut tracker, args),
            ProfileAction::Show => cmd_profile_show(&tracker),
        },
        Commands::Add { entry } => cmd_add(&mut tracker, entry),
        Commands::Chat { text } => cmd_chat(&mut tracker, &config, text),
        Commands::Today { date } => cmd_today(&tracker, date.unwrap_or_else(today)),
        Commands::History { days, end, advice } => cmd_history(
            &tracker,
            &config,
            end.unwrap_or_else(today),
            days.unwrap_or(config.summary.default_days),
            advice,
        ),
        Commands::Export { what } => cmd_export(&tracker, &config, what),
        Commands::Reset { .. } => Ok(()),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

fn cmd_profile_set(tracker: &mut Tracker<FileStore>, args: ProfileArgs) -> Result<()> {
    let profile = UserProfile::new(ProfileInput {
        name: args.name,
        age: args.age,
        weight_kg: args.weight,
        height_cm: args.height,
        sex: args.sex,
        activity_level: args.activity,
        goal: args.goal,
    })?;
    tracker.set_profile(profile)?;

    println!("✓ Profile saved!");
    if let Some(profile) = tracker.profile() {
        display_targets(profile.targets());
    }
    Ok(())
}

fn cmd_profile_show(tracker: &Tracker<FileStore>) -> Result<()> {
    let profile = tracker.require_profile()?;
    let input = profile.input();

    println!("  {}", input.name);
    println!(
        "  {} years, {} kg, {} cm, {:?}",
        input.age, input.weight_kg, input.height_cm, input.sex
    );
    println!("  Activity: {:?}  Goal: {:?}", input.activity_level, input.goal);
    display_targets(profile.targets());
    Ok(())
}

fn cmd_add(tracker: &mut Tracker<FileStore>, entry: AddEntry) -> Result<()> {
    let entry = match entry {
        AddEntry::Meal {
            description,
            calories,
            protein,
            carbs,
            fats,
            when,
        } => LogEntry::new(
            LogKind::Meal,
            description,
            Measures {
                calories,
                protein,
                carbs,
                fats,
                ..Measures::default()
            },
            when.at.unwrap_or_else(now),
        ),
        AddEntry::Sleep {
            hours,
            description,
            when,
        } => LogEntry::new(
            LogKind::Sleep,
            description,
            Measures {
                sleep_hours: hours,
                ..Measures::default()
            },
            when.at.unwrap_or_else(now),
        ),
        AddEntry::Activity {
            description,
            calories,
            minutes,
            when,
        } => LogEntry::new(
            LogKind::Activity,
            description,
            Measures {
                calories,
                duration_minutes: minutes,
                ..Measures::default()
            },
            when.at.unwrap_or_else(now),
        ),
    };

    let entry = tracker.record(entry)?;
    println!("✓ Logged {}: {}", entry.kind.as_str(), describe(entry));
    Ok(())
}

fn cmd_chat(tracker: &mut Tracker<FileStore>, config: &Config, text: Vec<String>) -> Result<()> {
    tracker.require_profile()?;
    let client = match GeminiClient::from_config(&config.advice) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Advice service unavailable: {}", e);
            println!("\n  {}\n", CHAT_FALLBACK);
            return Ok(());
        }
    };

    if !text.is_empty() {
        let outcome = submit_message(tracker, &client, &text.join(" "), now())?;
        display_outcome(&outcome);
        return Ok(());
    }

    println!("Tell me what you ate, how you trained or how long you slept.");
    println!("Empty line or 'quit' to leave.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() || line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit")
        {
            break;
        }

        let outcome = submit_message(tracker, &client, line, now())?;
        display_outcome(&outcome);
    }
    Ok(())
}

fn cmd_today(tracker: &Tracker<FileStore>, date: NaiveDate) -> Result<()> {
    let targets = tracker.require_profile()?.targets();
    let day = tracker.today(date);

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  TODAY  {}", date);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Calories   {:.0} / {} kcal ({}%)",
        day.total_calories,
        targets.calories,
        day.intake_percent(targets.calories)
    );
    println!("  Burned     {:.0} kcal", day.total_burned);
    println!(
        "  Remaining  {:.0} kcal",
        day.remaining_for_display(targets.calories)
    );
    println!();
    println!("  Protein    {:.0} / {} g", day.total_protein, targets.protein);
    println!("  Carbs      {:.0} / {} g", day.total_carbs, targets.carbs);
    println!("  Fats       {:.0} / {} g", day.total_fats, targets.fats);
    println!();
    println!("  Sleep      {:.1} h", day.total_sleep);
    println!();
    Ok(())
}

fn cmd_history(
    tracker: &Tracker<FileStore>,
    config: &Config,
    end: NaiveDate,
    days: u32,
    advice: bool,
) -> Result<()> {
    let summaries = window_summaries(tracker, end, days)?;
    println!(
        "  {:<10}  {:>6}  {:>6}  {:>7}  {:>5}  {:>4}  {:>5}",
        "Date", "Eaten", "Burned", "Protein", "Carbs", "Fats", "Sleep"
    );
    for day in &summaries {
        println!(
            "  {:<10}  {:>6.0}  {:>6.0}  {:>7.0}  {:>5.0}  {:>4.0}  {:>5.1}",
            day.date.to_string(),
            day.total_calories,
            day.total_burned,
            day.total_protein,
            day.total_carbs,
            day.total_fats,
            day.total_sleep
        );
    }

    if advice {
        let tip = match GeminiClient::from_config(&config.advice) {
            Ok(client) => periodic_advice(tracker, &client, config.advice.history_limit)?,
            Err(e) => {
                tracing::warn!("Advice service unavailable: {}", e);
                tracker.require_profile()?;
                ADVICE_FALLBACK.to_string()
            }
        };
        println!();
        println!("  💡 {}", tip);
    }
    Ok(())
}

fn cmd_export(tracker: &Tracker<FileStore>, config: &Config, what: ExportWhat) -> Result<()> {
    match what {
        ExportWhat::Summaries { out, days, end } => {
            let days = days.unwrap_or(config.summary.default_days);
            let summaries = window_summaries(tracker, end.unwrap_or_else(today), days)?;
            let count = fitlog_core::export::export_summaries(&out, &summaries)?;
            println!("✓ Exported {} days to {}", count, out.display());
        }
        ExportWhat::Entries { out } => {
            let count = fitlog_core::export::export_entries(&out, tracker.log())?;
            println!("✓ Exported {} entries to {}", count, out.display());
        }
    }
    Ok(())
}

fn window_summaries(
    tracker: &Tracker<FileStore>,
    end: NaiveDate,
    days: u32,
) -> Result<Vec<DaySummary>> {
    if days == 0 {
        return Err(Error::InvalidInput("--days must be at least 1".into()));
    }
    tracker.history(end, days)
}

fn cmd_reset(mut store: FileStore, yes: bool) -> Result<()> {
    if !yes {
        print!("Delete your profile and all logged entries? Type 'yes' to confirm: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "yes" {
            println!("Nothing deleted.");
            return Ok(());
        }
    }

    store.clear()?;
    println!("✓ All data deleted.");
    Ok(())
}

fn display_targets(targets: Targets) {
    println!();
    println!("  Daily target  {} kcal", targets.calories);
    println!(
        "  Protein {} g  Carbs {} g  Fats {} g",
        targets.protein, targets.carbs, targets.fats
    );
}

fn display_outcome(outcome: &ChatOutcome) {
    println!("\n  {}", outcome.text);
    if let Some(ref entry) = outcome.logged {
        println!("  ✓ Logged {}: {}", entry.kind.as_str(), describe(entry));
    }
    println!();
}

fn describe(entry: &LogEntry) -> String {
    let m = &entry.measures;
    match entry.kind {
        LogKind::Meal => format!(
            "{} ({:.0} kcal, P{:.0} C{:.0} F{:.0})",
            entry.description, m.calories, m.protein, m.carbs, m.fats
        ),
        LogKind::Sleep => format!("{} ({:.1} h)", entry.description, m.sleep_hours),
        LogKind::Activity => format!(
            "{} ({:.0} kcal burned, {:.0} min)",
            entry.description, m.calories, m.duration_minutes
        ),
    }
}

fn parse_sex(s: &str) -> std::result::Result<Sex, String> {
    match s.to_lowercase().as_str() {
        "male" | "m" => Ok(Sex::Male),
        "female" | "f" => Ok(Sex::Female),
        "other" => Ok(Sex::Other),
        _ => Err(format!("unknown sex {:?} (male, female, other)", s)),
    }
}

fn parse_activity(s: &str) -> std::result::Result<ActivityLevel, String> {
    match s.to_lowercase().replace('-', "_").as_str() {
        "sedentary" => Ok(ActivityLevel::Sedentary),
        "light" => Ok(ActivityLevel::Light),
        "moderate" => Ok(ActivityLevel::Moderate),
        "active" => Ok(ActivityLevel::Active),
        "very_active" => Ok(ActivityLevel::VeryActive),
        _ => Err(format!(
            "unknown activity level {:?} (sedentary, light, moderate, active, very_active)",
            s
        )),
    }
}

fn parse_goal(s: &str) -> std::result::Result<Goal, String> {
    match s.to_lowercase().replace('-', "_").as_str() {
        "lose_weight" | "lose" => Ok(Goal::LoseWeight),
        "maintain" => Ok(Goal::Maintain),
        "gain_weight" | "gain" => Ok(Goal::GainWeight),
        _ => Err(format!(
            "unknown goal {:?} (lose_weight, maintain, gain_weight)",
            s
        )),
    }
}

fn parse_timestamp(s: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("invalid RFC 3339 timestamp: {}", e))
}
