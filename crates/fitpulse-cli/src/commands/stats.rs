use clap::Subcommand;
use fitpulse_core::Database;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// All-time stats
    All,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let stats = db.stats_all()?;

    match action {
        StatsAction::Today => {
            let today = serde_json::json!({
                "today_sessions": stats.today_sessions,
                "today_duration_min": stats.today_duration_min,
            });
            println!("{}", serde_json::to_string_pretty(&today)?);
        }
        StatsAction::All => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
