//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `mppms_core` linkage end to end: config, logging, store,
//!   session and the hierarchy view.
//! - Seed a small demo data set into an empty store.

use clap::Parser;
use log::info;
use mppms_core::{
    init_logging_from, AppSession, Asset, Component, CoreConfig, DataAccess, Entity, EntityId,
    MemoryStore, Project, RepoResult, Repository, SqliteStore, Task, User, UserRole,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "mppms", version, about = "Print the project hierarchy for one user")]
struct Cli {
    /// JSON config file; environment variables override it
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// User id to sign in as; defaults to the first project manager
    #[arg(long, short = 'u')]
    user: Option<i64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mppms: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    println!("mppms_core version={}", mppms_core::core_version());

    let config = CoreConfig::load(cli.config.as_deref())?;
    init_logging_from(&config)?;

    match &config.database_path {
        Some(path) => show(Rc::new(SqliteStore::open(path)?), &config, cli.user),
        None => show(Rc::new(MemoryStore::in_memory()), &config, cli.user),
    }
}

fn show<S: DataAccess + 'static>(
    store: Rc<S>,
    config: &CoreConfig,
    user: Option<i64>,
) -> Result<(), Box<dyn Error>> {
    if Repository::<User>::load_all(&*store)?.is_empty() {
        seed_demo(&*store)?;
    }
    let user_id = match user {
        Some(id) => EntityId::new(id),
        None => store
            .users_by_role(UserRole::ProjectManager)?
            .first()
            .map(Entity::id)
            .ok_or("no project manager to sign in as")?,
    };

    let session = AppSession::sign_in(store, config.change_bus(), user_id)?;
    let index = session.launch_index()?;
    println!(
        "user={} role={} projects={} tasks={} components={} assets={}",
        session.user().name,
        session.user().role.as_str(),
        index.project_rows().len(),
        index.task_rows().len(),
        index.component_rows().len(),
        index.asset_rows().len()
    );

    if index.permissions().view_hierarchy {
        let hierarchy = index.open_hierarchy()?;
        for line in hierarchy.tree().outline() {
            println!("{line}");
        }
    }
    Ok(())
}

fn save<T: Entity, R: Repository<T> + ?Sized>(repo: &R, entity: &T) -> RepoResult<T> {
    repo.save(entity)
}

fn seed_demo<S: DataAccess>(store: &S) -> RepoResult<()> {
    let manager = save(store, &User::new("Morgan Hale", UserRole::ProjectManager))?;
    let coordinator = save(store, &User::new("Casey Ward", UserRole::ProjectCoordinator))?;
    let inspector = save(store, &User::new("Robin Lee", UserRole::QcTeamLeader))?;

    let pump = save(store, &Asset::new("Pump P-101", "mechanical", "Bay 1"))?;
    let valve = save(store, &Asset::new("Valve V-7", "mechanical", "Bay 2"))?;
    let cabinet = save(store, &Asset::new("Cabinet E-3", "electrical", "Room 4"))?;

    let mut inspect = Task::new("Inspect pump line");
    inspect.assets.add_all([pump.clone(), valve.clone()]);
    inspect.assigned_to.add(inspector.clone());
    let inspect = save(store, &inspect)?;

    let mut rewire = Task::new("Rewire control cabinet");
    rewire.assets.add(cabinet);
    rewire.assigned_to.add(coordinator.clone());
    let rewire = save(store, &rewire)?;

    let mut skid = Component::new("Pump skid");
    skid.assets.add_all([pump, valve]);
    let skid = save(store, &skid)?;

    let mut project = Project::new("Plant refit", 1_700_000_000_000);
    project.deadline = Some(1_710_000_000_000);
    project.manager = Some(manager);
    project.coordinator = Some(coordinator.clone());
    project.team.add_all([coordinator, inspector]);
    project.tasks.add_all([inspect, rewire]);
    project.components.add(skid);
    let project = save(store, &project)?;

    info!(
        "event=demo_seed module=cli status=ok project_id={}",
        project.id()
    );
    Ok(())
}
