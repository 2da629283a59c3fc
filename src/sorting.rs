use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortCriteria {
    #[default]
    Priority,
    Name,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// How the authoritative list is ordered. Defaults to high priority first.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub criteria: SortCriteria,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(criteria: SortCriteria, order: SortOrder) -> Self {
        Self { criteria, order }
    }

    pub fn is_ascending(&self) -> bool {
        self.order == SortOrder::Asc
    }
}

impl SortCriteria {
    pub fn toggled(self) -> Self {
        match self {
            SortCriteria::Priority => SortCriteria::Name,
            SortCriteria::Name => SortCriteria::Priority,
        }
    }
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortCriteria::Priority => "priority",
            SortCriteria::Name => "name",
        })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }
}

impl FromStr for SortCriteria {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priority" => Ok(SortCriteria::Priority),
            "name" => Ok(SortCriteria::Name),
            other => Err(format!(
                "unknown sorting criteria '{other}' (expected priority or name)"
            )),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sorting order '{other}' (expected asc or desc)")),
        }
    }
}

fn compare_by_priority(task: &Task, other: &Task) -> Ordering {
    task.priority.cmp(&other.priority)
}

fn compare_by_name(task: &Task, other: &Task) -> Ordering {
    task.name.to_lowercase().cmp(&other.name.to_lowercase())
}

/// Orders `tasks` in place. The sort is stable: tasks that compare equal
/// under `spec` keep their relative order whatever the direction.
pub fn sort_tasks(tasks: &mut [Task], spec: SortSpec) {
    let compare = match spec.criteria {
        SortCriteria::Priority => compare_by_priority,
        SortCriteria::Name => compare_by_name,
    };
    let ascending = spec.is_ascending();

    tasks.sort_by(|task, other| {
        let ordering = compare(task, other);
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}
