use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterCriterion {
    #[default]
    All,
    Completed,
    Uncompleted,
}

impl FilterCriterion {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            FilterCriterion::All => true,
            FilterCriterion::Completed => task.is_completed,
            FilterCriterion::Uncompleted => !task.is_completed,
        }
    }

    /// Next criterion in the dashboard's cycle: all, uncompleted, completed.
    pub fn cycled(self) -> Self {
        match self {
            FilterCriterion::All => FilterCriterion::Uncompleted,
            FilterCriterion::Uncompleted => FilterCriterion::Completed,
            FilterCriterion::Completed => FilterCriterion::All,
        }
    }
}

impl fmt::Display for FilterCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterCriterion::All => "all",
            FilterCriterion::Completed => "completed",
            FilterCriterion::Uncompleted => "uncompleted",
        })
    }
}

/// Unknown names are rejected rather than treated as `all`.
impl FromStr for FilterCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterCriterion::All),
            "completed" => Ok(FilterCriterion::Completed),
            "uncompleted" => Ok(FilterCriterion::Uncompleted),
            other => Err(format!(
                "unknown filter '{other}' (expected all, completed or uncompleted)"
            )),
        }
    }
}

pub fn filter_tasks(tasks: &[Task], criterion: FilterCriterion) -> Vec<&Task> {
    tasks.iter().filter(|t| criterion.matches(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Priority, TaskId};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn task(id: u64, is_completed: bool) -> Task {
        Task {
            id: TaskId(id),
            name: format!("task {id}"),
            priority: Priority::Low,
            is_completed,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn ids(tasks: &[&Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id.0).collect()
    }

    #[test]
    fn test_filter_partitions_by_completion() {
        let tasks = vec![task(1, true), task(2, false), task(3, true), task(4, false)];

        assert_eq!(ids(&filter_tasks(&tasks, FilterCriterion::All)), vec![1, 2, 3, 4]);
        assert_eq!(ids(&filter_tasks(&tasks, FilterCriterion::Completed)), vec![1, 3]);
        assert_eq!(ids(&filter_tasks(&tasks, FilterCriterion::Uncompleted)), vec![2, 4]);
    }

    #[test]
    fn test_completed_then_all_restores_original_order() {
        let tasks = vec![task(3, false), task(1, true), task(2, true)];
        let completed = filter_tasks(&tasks, FilterCriterion::Completed);
        assert_eq!(ids(&completed), vec![1, 2]);

        let all = filter_tasks(&tasks, FilterCriterion::All);
        assert_eq!(ids(&all), vec![3, 1, 2]);
    }

    #[test]
    fn test_filter_on_empty_list() {
        assert!(filter_tasks(&[], FilterCriterion::Completed).is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_criterion() {
        assert_eq!(
            "Uncompleted".parse::<FilterCriterion>(),
            Ok(FilterCriterion::Uncompleted)
        );
        assert!("archived".parse::<FilterCriterion>().is_err());
    }
}
