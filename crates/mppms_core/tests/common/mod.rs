#![allow(dead_code)]

use mppms_core::{
    Asset, ChangeEvent, ChangeObserver, Component, Entity, Project, RepoResult, Repository, Task,
    User, UserRole,
};
use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

pub fn save<T: Entity, R: Repository<T> + ?Sized>(repo: &R, entity: &T) -> T {
    try_save(repo, entity).expect("save should succeed")
}

pub fn try_save<T: Entity, R: Repository<T> + ?Sized>(repo: &R, entity: &T) -> RepoResult<T> {
    repo.save(entity)
}

pub fn user<R>(repo: &R, name: &str, role: UserRole) -> User
where
    R: Repository<User> + ?Sized,
{
    save(repo, &User::new(name, role))
}

pub fn assets<R>(repo: &R, prefix: &str, count: usize) -> Vec<Asset>
where
    R: Repository<Asset> + ?Sized,
{
    (0..count)
        .map(|i| save(repo, &Asset::new(format!("{prefix}-{i}"), "mechanical", "bay")))
        .collect()
}

pub fn task_with<R>(repo: &R, title: &str, assets: &[Asset]) -> Task
where
    R: Repository<Task> + ?Sized,
{
    let mut task = Task::new(title);
    task.assets.add_all(assets.iter().cloned());
    save(repo, &task)
}

pub fn component_with<R>(repo: &R, description: &str, assets: &[Asset]) -> Component
where
    R: Repository<Component> + ?Sized,
{
    let mut component = Component::new(description);
    component.assets.add_all(assets.iter().cloned());
    save(repo, &component)
}

pub fn project_with<R>(
    repo: &R,
    title: &str,
    manager: Option<&User>,
    tasks: &[Task],
    components: &[Component],
) -> Project
where
    R: Repository<Project> + ?Sized,
{
    let mut project = Project::new(title, 1_000);
    project.manager = manager.cloned();
    project.tasks.add_all(tasks.iter().cloned());
    project.components.add_all(components.iter().cloned());
    save(repo, &project)
}

pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Observer that appends `name:event` to a shared log.
pub struct Recorder {
    pub name: &'static str,
    pub log: EventLog,
    pub fail: bool,
}

impl Recorder {
    pub fn new(name: &'static str, log: &EventLog) -> Rc<Self> {
        Rc::new(Self {
            name,
            log: Rc::clone(log),
            fail: false,
        })
    }

    pub fn failing(name: &'static str, log: &EventLog) -> Rc<Self> {
        Rc::new(Self {
            name,
            log: Rc::clone(log),
            fail: true,
        })
    }
}

impl ChangeObserver for Recorder {
    fn on_change(&self, event: &ChangeEvent) -> Result<(), Box<dyn Error>> {
        self.log.borrow_mut().push(format!("{}:{}", self.name, event));
        if self.fail {
            return Err("observer failure".into());
        }
        Ok(())
    }
}
