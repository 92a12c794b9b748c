//! File-backed task list.
//!
//! Tasks live in `tasks.json` (a JSON array, newest first) and the active
//! task id in `active-task.json` inside the data directory. The store keeps
//! both in memory and rewrites the matching file after every mutation.
//!
//! Storage is best effort: a missing or malformed file loads as empty, and a
//! failed write is logged and otherwise ignored.

mod error;

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{Task, TaskUpdate};

pub use error::{Result, TaskError};

pub const TASKS_FILE_NAME: &str = "tasks.json";
pub const ACTIVE_TASK_FILE_NAME: &str = "active-task.json";

/// In-memory task list mirrored to disk.
#[derive(Debug)]
pub struct TaskStore {
    tasks_path: PathBuf,
    active_path: PathBuf,
    tasks: Vec<Task>,
    active_task_id: Option<String>,
}

impl TaskStore {
    /// Loads the store from `data_dir`.
    pub fn load(data_dir: &Path) -> Self {
        let tasks_path = data_dir.join(TASKS_FILE_NAME);
        let active_path = data_dir.join(ACTIVE_TASK_FILE_NAME);

        let tasks = read_json::<Vec<Task>>(&tasks_path).unwrap_or_default();
        let mut active_task_id = read_json::<Option<String>>(&active_path).flatten();

        // A dangling active id (task removed by hand) is dropped on load
        if let Some(id) = &active_task_id {
            if !tasks.iter().any(|t| &t.id == id) {
                warn!(id = %id, "active task no longer exists");
                active_task_id = None;
            }
        }

        debug!(count = tasks.len(), "tasks loaded");
        Self {
            tasks_path,
            active_path,
            tasks,
            active_task_id,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn active_task_id(&self) -> Option<&str> {
        self.active_task_id.as_deref()
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.active_task_id.as_deref().and_then(|id| self.get(id))
    }

    /// Adds a task at the top of the list.
    pub fn add(&mut self, title: &str, estimate: u32, now_ms: u64) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        if estimate == 0 {
            return Err(TaskError::ZeroEstimate);
        }

        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            notes: None,
            estimated_pomodoros: estimate,
            completed_pomodoros: 0,
            completed: false,
            created_at: now_ms,
        };
        self.tasks.insert(0, task.clone());
        self.save_tasks();
        Ok(task)
    }

    /// Applies the fields present in `update`.
    pub fn update(&mut self, id: &str, update: TaskUpdate) -> Result<Task> {
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(TaskError::EmptyTitle);
            }
        }
        if update.estimated_pomodoros == Some(0) {
            return Err(TaskError::ZeroEstimate);
        }

        let task = self.find_mut(id)?;
        if let Some(title) = update.title {
            task.title = title.trim().to_string();
        }
        if let Some(estimate) = update.estimated_pomodoros {
            task.estimated_pomodoros = estimate;
        }
        if let Some(notes) = update.notes {
            task.notes = if notes.is_empty() { None } else { Some(notes) };
        }
        let task = task.clone();
        self.save_tasks();
        Ok(task)
    }

    /// Removes a task, clearing the active id if it pointed there.
    pub fn remove(&mut self, id: &str) -> Result<Task> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        let task = self.tasks.remove(index);
        self.save_tasks();

        if self.active_task_id.as_deref() == Some(id) {
            self.active_task_id = None;
            self.save_active();
        }
        Ok(task)
    }

    /// Flips the completed flag. Returns the new value.
    pub fn toggle_complete(&mut self, id: &str) -> Result<bool> {
        let task = self.find_mut(id)?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.save_tasks();
        Ok(completed)
    }

    /// Reorders the list to match `ids`, which must name every task once.
    pub fn reorder(&mut self, ids: &[String]) -> Result<()> {
        let unique: HashSet<&str> = ids.iter().map(String::as_str).collect();
        if ids.len() != self.tasks.len() || unique.len() != ids.len() {
            return Err(TaskError::InvalidOrder);
        }

        let mut reordered = Vec::with_capacity(ids.len());
        for id in ids {
            let task = self.get(id).ok_or(TaskError::InvalidOrder)?;
            reordered.push(task.clone());
        }
        self.tasks = reordered;
        self.save_tasks();
        Ok(())
    }

    /// Adds one completed pomodoro. Returns the new count.
    pub fn increment_pomodoro(&mut self, id: &str) -> Result<u32> {
        let task = self.find_mut(id)?;
        task.completed_pomodoros += 1;
        let count = task.completed_pomodoros;
        self.save_tasks();
        Ok(count)
    }

    /// Sets or clears the active task.
    pub fn set_active(&mut self, id: Option<&str>) -> Result<()> {
        if let Some(id) = id {
            if self.get(id).is_none() {
                return Err(TaskError::NotFound(id.to_string()));
            }
        }
        self.active_task_id = id.map(String::from);
        self.save_active();
        Ok(())
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    fn save_tasks(&self) {
        if let Err(e) = write_json(&self.tasks_path, &self.tasks) {
            warn!(path = %self.tasks_path.display(), "failed to save tasks: {}", e);
        }
    }

    fn save_active(&self) {
        if let Err(e) = write_json(&self.active_path, &self.active_task_id) {
            warn!(path = %self.active_path.display(), "failed to save active task: {}", e);
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), "failed to read: {}", e);
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), "ignoring malformed file: {}", e);
            None
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(path, json)
}
