pub mod config;
pub mod error;
pub mod filtering;
pub mod form;
pub mod service;
pub mod sorting;
pub mod task;
pub mod task_store;
pub mod validation;

pub use error::{AppError, ServiceError};
pub use task::{Priority, Task, TaskDraft, TaskId, TaskPatch};
pub use task_store::TaskStore;
