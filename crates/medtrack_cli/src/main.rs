//! Command-line host for `medtrack_core`.
//!
//! # Responsibility
//! - Parse arguments, configure logging and open the data file.
//! - Call core use-cases and print their results.
//! - Host the reminder timers for `watch`.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use log::info;
use medtrack_core::{
    core_version, default_log_level, init_logging, Clock, DayLog, DoseStatus, FixedClock,
    LeadTime, LogNotificationSink, MedicationSchedule, NotificationSink, ReminderEvent,
    ReminderScheduler, SqliteDataRepository, SystemClock, TimeOfDay, TrackerService,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const DB_FILE_NAME: &str = "medtrack.sqlite3";

type Service = TrackerService<SqliteDataRepository, Arc<dyn Clock>>;
type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "medtrack", version, about = "Personal medication schedule tracker")]
struct Cli {
    /// Directory holding the tracker data file.
    #[arg(long, global = true, default_value = ".")]
    data_dir: PathBuf,
    /// Enables file logging into this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Pretend the current local time is this instant (`YYYY-MM-DDTHH:MM:SS`).
    #[arg(long, global = true)]
    at: Option<NaiveDateTime>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a medication.
    Add {
        #[arg(long)]
        name: String,
        /// Dose time `HH:MM`; repeat for several doses a day.
        #[arg(long = "time", required = true)]
        times: Vec<TimeOfDay>,
        #[arg(long)]
        strength: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Weekdays, 0 = Sunday .. 6 = Saturday.
        #[arg(long, value_delimiter = ',')]
        days: Vec<u8>,
        /// Every other day counted from `--start`.
        #[arg(long)]
        alternate: bool,
        #[arg(long)]
        id: Option<String>,
    },
    /// List medications.
    List {
        /// Include medications not active today.
        #[arg(long)]
        all: bool,
    },
    /// Stop a medication; today is its last day.
    Stop { id: String },
    /// Show the dose log of one day (default today).
    Day {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mark today's dose as taken.
    Take { id: String, time: TimeOfDay },
    /// Mark today's dose as skipped.
    Skip { id: String, time: TimeOfDay },
    /// Put today's dose back to pending.
    Undo { id: String, time: TimeOfDay },
    /// Take (or revert) every dose of one time slot today.
    ToggleSlot { time: TimeOfDay },
    /// Per-day totals over a date range.
    Stats {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Show or change reminder settings.
    Settings {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
        /// 10, 20, 30 or 60.
        #[arg(long)]
        lead_time: Option<u32>,
    },
    /// Run one reminder scan now.
    Remind,
    /// Keep scanning for reminders every 30 seconds.
    Watch {
        /// Stop after this many minutes instead of running forever.
        #[arg(long)]
        for_minutes: Option<u64>,
    },
    /// Write all data to a JSON file.
    Export { path: PathBuf },
    /// Replace all data with a JSON export.
    Import { path: PathBuf },
    /// Delete every medication, log and setting.
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

/// Prints reminder events to stdout and records delivery in the log.
struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn deliver(&self, event: &ReminderEvent) {
        println!(
            "reminder: {} at {} (in {} min)",
            event.name, event.time, event.minutes_until_dose
        );
        LogNotificationSink.deliver(event);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        let log_dir = absolute(log_dir)?;
        init_logging(level, &log_dir.to_string_lossy())?;
    }

    std::fs::create_dir_all(&cli.data_dir)?;
    let repo = SqliteDataRepository::open(cli.data_dir.join(DB_FILE_NAME))?;
    let clock: Arc<dyn Clock> = match cli.at {
        Some(at) => Arc::new(FixedClock::new(at)),
        None => Arc::new(SystemClock),
    };
    let mut service = TrackerService::open(repo, Arc::clone(&clock));
    let today = service.today();
    info!(
        "event=cli_start module=cli status=ok version={} today={}",
        core_version(),
        today
    );

    match cli.command {
        Command::Add {
            name,
            times,
            strength,
            notes,
            start,
            end,
            days,
            alternate,
            id,
        } => {
            let mut medication = match id {
                Some(id) => MedicationSchedule::with_id(id, name, times),
                None => MedicationSchedule::new(name, times),
            };
            medication.strength = strength;
            medication.notes = notes;
            medication.start_date = start;
            medication.end_date = end;
            medication.days_of_week = (!days.is_empty()).then(|| days.into_iter().collect());
            medication.alternate_days = alternate;
            let id = medication.id.clone();
            service.add_medication(medication)?;
            println!("added {id}");
        }
        Command::List { all } => {
            let listed: Vec<&MedicationSchedule> = if all {
                service.medications().iter().collect()
            } else {
                service.active_medications(today)
            };
            for medication in listed {
                print_medication(medication, today);
            }
        }
        Command::Stop { id } => {
            service.stop_medication(&id)?;
            println!("stopped {id}; last day {today}");
        }
        Command::Day { date } => {
            let date = date.unwrap_or(today);
            let log = service.day_log(date)?;
            print_day(&service, &log);
        }
        Command::Take { id, time } => set_status(&mut service, &id, time, DoseStatus::Taken)?,
        Command::Skip { id, time } => set_status(&mut service, &id, time, DoseStatus::Skipped)?,
        Command::Undo { id, time } => set_status(&mut service, &id, time, DoseStatus::Pending)?,
        Command::ToggleSlot { time } => {
            let toggle = service.toggle_slot(today, time)?;
            println!("{time}: {} dose(s) now {}", toggle.doses, toggle.applied);
        }
        Command::Stats { from, to } => {
            for (date, stats) in service.range_stats(from, to.unwrap_or(today)) {
                let ratio = stats
                    .completion_ratio()
                    .map_or_else(|| "-".to_string(), |ratio| format!("{:.0}%", ratio * 100.0));
                println!(
                    "{date}  {}/{} taken  {} skipped  {ratio}",
                    stats.taken, stats.total, stats.skipped
                );
            }
        }
        Command::Settings {
            enable,
            disable,
            lead_time,
        } => {
            if enable || disable {
                service.set_reminders_enabled(enable)?;
            }
            if let Some(minutes) = lead_time {
                service.set_lead_time(LeadTime::try_from(minutes)?)?;
            }
            let settings = service.settings();
            println!(
                "reminders {} lead time {} min",
                if settings.reminders_enabled { "on" } else { "off" },
                settings.lead_time_minutes.minutes()
            );
        }
        Command::Remind => {
            let events = service.scan_reminders();
            if events.is_empty() {
                println!("nothing due soon");
            }
            StdoutSink.deliver_all(&events);
        }
        Command::Watch { for_minutes } => watch(service, clock, for_minutes)?,
        Command::Export { path } => {
            std::fs::write(&path, service.export_json()?)?;
            println!("exported to {}", path.display());
        }
        Command::Import { path } => {
            let text = std::fs::read_to_string(&path)?;
            service.import_json(&text)?;
            println!("imported {} medication(s)", service.medications().len());
        }
        Command::Reset { yes } => {
            if !yes {
                return Err("refusing to reset without --yes".into());
            }
            service.reset_all_data()?;
            println!("all data cleared");
        }
    }

    Ok(())
}

fn set_status(service: &mut Service, id: &str, time: TimeOfDay, status: DoseStatus) -> CliResult<()> {
    let today = service.today();
    let record = service.set_dose_status(today, id, time, status)?;
    println!("{id} {time}: {}", record.status);
    Ok(())
}

fn watch(service: Service, clock: Arc<dyn Clock>, for_minutes: Option<u64>) -> CliResult<()> {
    if !service.settings().reminders_enabled {
        println!("reminders are off; enable them with `medtrack settings --enable`");
        return Ok(());
    }

    let service = Arc::new(Mutex::new(service));
    let scan_service = Arc::clone(&service);
    let reset_service = Arc::clone(&service);
    let mut scheduler = ReminderScheduler::new();
    scheduler.enable(
        clock,
        move || {
            // A poisoned lock means a previous scan panicked; keep the timer alive.
            let events = match scan_service.lock() {
                Ok(mut service) => service.scan_reminders(),
                Err(poisoned) => poisoned.into_inner().scan_reminders(),
            };
            StdoutSink.deliver_all(&events);
        },
        move || match reset_service.lock() {
            Ok(mut service) => service.reset_notified(),
            Err(poisoned) => poisoned.into_inner().reset_notified(),
        },
    )?;

    println!("watching for reminders...");
    let deadline = for_minutes.map(|minutes| Instant::now() + Duration::from_secs(minutes * 60));
    loop {
        match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                std::thread::park_timeout(deadline - now);
            }
            None => std::thread::park(),
        }
    }
    scheduler.disable();
    Ok(())
}

fn print_medication(medication: &MedicationSchedule, today: NaiveDate) {
    let times: Vec<String> = medication.times_of_day.iter().map(ToString::to_string).collect();
    let strength = medication.strength.as_deref().unwrap_or("");
    let state = if medication.is_stopped_by(today) { " (stopped)" } else { "" };
    println!(
        "{}  {} {}  [{}]{}",
        medication.id,
        medication.name,
        strength,
        times.join(", "),
        state
    );
}

fn print_day(service: &Service, log: &DayLog) {
    let lock = if service.is_editable(log.date) { "" } else { " (read-only)" };
    println!("{}{}", log.date, lock);
    for time in service.slots_for_day(log.date) {
        let mark = if service.slot_completion(log.date, time) { "x" } else { " " };
        println!("[{mark}] {time}");
        for dose in log.doses.iter().filter(|dose| dose.time == time) {
            let name = service
                .medication(&dose.schedule_id)
                .map_or(dose.schedule_id.as_str(), |medication| medication.name.as_str());
            println!("      {name}: {}", dose.status);
        }
    }
    let stats = service.day_stats(log.date);
    println!("{}/{} taken", stats.taken, stats.total);
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
