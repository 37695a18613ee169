//! Print recent activity events from the local database.

use deskwell_core::Database;

pub fn run(limit: u32) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let events = db.recent_events(limit)?;
    if events.is_empty() {
        println!("no events recorded yet");
        return Ok(());
    }
    for e in events {
        println!(
            "{}  {:<13} work={:<7} break={:<7} absence={:<7} {}",
            e.at, e.kind, e.work_minutes, e.break_minutes, e.absence_minutes, e.details
        );
    }
    Ok(())
}
