//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `reviewtrack_core` linkage end to end against an in-memory store.
//! - Keep output deterministic apart from generated ids.

use reviewtrack_core::db::open_db_in_memory;
use reviewtrack_core::{
    Actor, CoreConfig, PhaseEngine, Project, ProjectLifecycle, RequestContext,
    SqliteActivityFeed, SqlitePermissionStore, SqliteProjectRepository,
};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_probe module=cli status=error error={err}");
            eprintln!("reviewtrack probe failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::default();
    config.init_logging()?;

    let conn = open_db_in_memory()?;
    let lifecycle = ProjectLifecycle::new(
        SqliteProjectRepository::new(&conn),
        SqlitePermissionStore::new(&conn),
        SqliteActivityFeed::new(&conn),
        PhaseEngine::with_defaults(),
        config.lifecycle.clone(),
    );

    let ctx = RequestContext::new(Actor::new("probe", "eao"));
    let project = lifecycle.create(
        &ctx,
        Project::new("Probe Mine", "Probe Mine", "Mines & Metals"),
    )?;
    let project = lifecycle.start_next_phase(project)?;

    println!("reviewtrack_core version={}", reviewtrack_core::core_version());
    println!("project code={}", project.code);
    println!(
        "current phase={}",
        project.current_phase_code.as_deref().unwrap_or("none")
    );
    println!("phases={}", project.phases.len());
    println!(
        "completed phases={}",
        project.phases.iter().filter(|phase| phase.is_completed()).count()
    );
    println!(
        "templates={}",
        lifecycle.engine().templates().codes().join(",")
    );
    Ok(())
}
