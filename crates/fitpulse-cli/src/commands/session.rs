use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Subcommand;
use fitpulse_core::feedback::NullDevice;
use fitpulse_core::runtime::SessionTicker;
use fitpulse_core::session::{active, recovery};
use fitpulse_core::storage::{Config, Database};
use fitpulse_core::{Event, MetricUpdate, SessionEngine, TimerSnapshot, WorkoutPlan};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session from a workout definition file (JSON); without a
    /// file, the built-in sample plan is used
    Start {
        /// Path to a workout JSON definition
        workout: Option<PathBuf>,
    },
    /// Print the current session snapshot and active timers as JSON
    Status,
    /// Pause the whole session
    Pause,
    /// Resume a paused session
    Resume,
    /// Point the session at an exercise
    StartExercise {
        exercise_id: String,
        /// Override the exercise's suggested duration (seconds)
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Mark a set of the current exercise complete
    CompleteSet {
        set_index: usize,
    },
    /// Mark the current exercise complete
    CompleteExercise {
        exercise_id: String,
    },
    /// Skip the active rest timer
    SkipRest,
    /// Shift the active rest timer by SECONDS (negative shortens it)
    AdjustRest {
        #[arg(allow_negative_numbers = true)]
        seconds: i64,
    },
    /// Feed one heart-rate sample
    HeartRate {
        bpm: f32,
    },
    /// Feed an active-calorie increment
    Calories {
        kcal: f64,
    },
    /// End the session and print the summary
    End,
    /// Rebuild an interrupted session from storage (comes back paused)
    Recover,
    /// Throw away a recoverable session record
    Discard,
    /// Drive the shared clock in-process, printing timer updates
    Watch,
}

/// Rebuild the engine around the persisted record and apply the catch-up
/// tick for the wall-clock gap since the last invocation.
fn load_engine(db: &Database, config: &Config) -> Result<Option<SessionEngine>, Box<dyn std::error::Error>> {
    let Some(state) = db.load_active_session()? else {
        return Ok(None);
    };
    if !state.is_active {
        return Ok(None);
    }
    let heart_rate = db.load_heart_rate()?.unwrap_or_default();
    let now = Utc::now();
    let mut engine = SessionEngine::from_persisted(
        state,
        heart_rate,
        config.clone(),
        Some(db.clone()),
        Arc::new(NullDevice),
        now,
    );
    engine.reconcile(now);
    Ok(Some(engine))
}

fn require_engine(db: &Database, config: &Config) -> Result<SessionEngine, Box<dyn std::error::Error>> {
    load_engine(db, config)?.ok_or_else(|| "no active session".into())
}

fn print_snapshot(engine: &SessionEngine) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = engine.snapshot(Utc::now());
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn format_clock(ms: u64) -> String {
    let total = ms / 1000;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn format_timer_line(list: &[TimerSnapshot]) -> String {
    list.iter()
        .map(|s| match s.remaining_ms {
            Some(ms) => format!("{} -{}", s.role, format_clock(ms)),
            None => format!("{} {}", s.role, format_clock(s.elapsed_ms)),
        })
        .collect::<Vec<_>>()
        .join("  |  ")
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();

    match action {
        SessionAction::Start { workout } => {
            if load_engine(&db, &config)?.is_some() {
                return Err("a session is already active".into());
            }
            let plan = match workout {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)?;
                    serde_json::from_str::<WorkoutPlan>(&content)?
                }
                None => WorkoutPlan::sample(),
            };
            let engine = SessionEngine::start(&plan, config, Some(db), Utc::now());
            print_snapshot(&engine)?;
        }
        SessionAction::Status => {
            let engine = require_engine(&db, &config)?;
            // Save the reconciled clock so the next invocation measures
            // its gap from here.
            engine.persist();
            print_snapshot(&engine)?;
            let timers = engine.timer_snapshots();
            println!("{}", serde_json::to_string_pretty(&timers)?);
        }
        SessionAction::Pause => {
            let mut engine = require_engine(&db, &config)?;
            engine.pause(Utc::now())?;
            print_snapshot(&engine)?;
        }
        SessionAction::Resume => {
            let mut engine = require_engine(&db, &config)?;
            engine.resume(Utc::now())?;
            print_snapshot(&engine)?;
        }
        SessionAction::StartExercise { exercise_id, duration } => {
            let mut engine = require_engine(&db, &config)?;
            engine.start_exercise(&exercise_id, duration, Utc::now())?;
            print_snapshot(&engine)?;
        }
        SessionAction::CompleteSet { set_index } => {
            let mut engine = require_engine(&db, &config)?;
            engine.complete_set(set_index, Utc::now())?;
            print_snapshot(&engine)?;
            let timers = engine.timer_snapshots();
            println!("{}", serde_json::to_string_pretty(&timers)?);
        }
        SessionAction::CompleteExercise { exercise_id } => {
            let mut engine = require_engine(&db, &config)?;
            engine.complete_exercise(&exercise_id, Utc::now())?;
            print_snapshot(&engine)?;
        }
        SessionAction::SkipRest => {
            let mut engine = require_engine(&db, &config)?;
            engine.skip_rest_timer(Utc::now())?;
            print_snapshot(&engine)?;
        }
        SessionAction::AdjustRest { seconds } => {
            let mut engine = require_engine(&db, &config)?;
            engine.adjust_rest_timer(seconds, Utc::now())?;
            print_snapshot(&engine)?;
        }
        SessionAction::HeartRate { bpm } => {
            let mut engine = require_engine(&db, &config)?;
            engine.ingest(MetricUpdate::HeartRate { bpm }, Utc::now())?;
            engine.persist();
            print_snapshot(&engine)?;
        }
        SessionAction::Calories { kcal } => {
            let mut engine = require_engine(&db, &config)?;
            engine.ingest(MetricUpdate::ActiveCalories { kcal }, Utc::now())?;
            engine.persist();
            print_snapshot(&engine)?;
        }
        SessionAction::End => {
            let mut engine = require_engine(&db, &config)?;
            let summary = engine.end(Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        SessionAction::Recover => {
            let now = Utc::now();
            match recovery::resume_interrupted(&db, &config, now)? {
                Some(engine) => {
                    let event = Event::SessionRecovered {
                        session_id: engine.state().session_id.clone(),
                        at: now,
                    };
                    println!("{}", serde_json::to_string_pretty(&event)?);
                    print_snapshot(&engine)?;
                }
                None => println!("no recoverable session"),
            }
        }
        SessionAction::Discard => {
            recovery::discard(&db)?;
            println!("ok");
        }
        SessionAction::Watch => {
            let mut engine = require_engine(&db, &config)?;
            if engine.state().is_paused {
                engine.resume(Utc::now())?;
            }
            engine.subscribe_timers(|list| {
                println!("{}", format_timer_line(list));
            });
            engine.persist();
            active::install(engine)?;

            let period = Duration::from_millis(config.session.tick_period_ms);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async {
                let mut ticker = SessionTicker::spawn(period);
                loop {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    // Heartbeat persistence keeps the record fresh for
                    // recovery if this process is killed.
                    let still_active = active::with(|e| {
                        e.persist();
                        e.is_active()
                    })
                    .unwrap_or(false);
                    if !still_active {
                        break;
                    }
                }
                ticker.stop();
            });
            active::destroy();
        }
    }

    Ok(())
}
