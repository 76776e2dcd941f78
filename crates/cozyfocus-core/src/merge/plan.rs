use std::fmt;

use serde::{Deserialize, Serialize};

use super::decide::Decision;

/// Add/update/skip tally for one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub add: usize,
    pub update: usize,
    pub skip: usize,
}

impl EntityCounts {
    pub fn count<T>(&mut self, decision: &Decision<T>) {
        match decision {
            Decision::Add(_) => self.add += 1,
            Decision::Update(_) => self.update += 1,
            Decision::Skip => self.skip += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.add + self.update + self.skip
    }

    /// Records that would be written.
    pub fn changes(&self) -> usize {
        self.add + self.update
    }
}

impl fmt::Display for EntityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} ~{} ={}", self.add, self.update, self.skip)
    }
}

/// Preview of an import, computed before anything is written.
///
/// `tags` is `None` when the bundle predates the tag registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePlan {
    pub tasks: EntityCounts,
    pub notes: EntityCounts,
    pub sessions: EntityCounts,
    pub stats: EntityCounts,
    pub docs: EntityCounts,
    pub settings: EntityCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<EntityCounts>,
}

impl MergePlan {
    /// Per-collection counts in bundle order, with display names.
    pub fn entries(&self) -> Vec<(&'static str, EntityCounts)> {
        let mut entries = vec![
            ("tasks", self.tasks),
            ("notes", self.notes),
            ("sessions", self.sessions),
            ("stats", self.stats),
            ("docs", self.docs),
            ("settings", self.settings),
        ];
        if let Some(tags) = self.tags {
            entries.push(("tags", tags));
        }
        entries
    }

    pub fn total(&self) -> EntityCounts {
        self.entries()
            .into_iter()
            .fold(EntityCounts::default(), |acc, (_, c)| EntityCounts {
                add: acc.add + c.add,
                update: acc.update + c.update,
                skip: acc.skip + c.skip,
            })
    }

    /// True when applying would not change the store.
    pub fn is_noop(&self) -> bool {
        self.total().changes() == 0
    }
}

impl fmt::Display for MergePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10} {:>6} {:>6} {:>6}", "", "add", "update", "skip")?;
        for (name, c) in self.entries() {
            writeln!(f, "{name:<10} {:>6} {:>6} {:>6}", c.add, c.update, c.skip)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_is_noop() {
        let plan = MergePlan::default();
        assert!(plan.is_noop());
        assert_eq!(plan.entries().len(), 6);
    }

    #[test]
    fn skips_alone_are_noop() {
        let plan = MergePlan {
            tasks: EntityCounts {
                skip: 3,
                ..Default::default()
            },
            tags: Some(EntityCounts {
                skip: 1,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(plan.is_noop());
        assert_eq!(plan.total().skip, 4);
    }

    #[test]
    fn any_change_is_not_noop() {
        let mut plan = MergePlan::default();
        plan.stats.count(&Decision::Update(()));
        assert!(!plan.is_noop());
        assert_eq!(plan.stats.changes(), 1);
    }

    #[test]
    fn tags_omitted_from_json_when_absent() {
        let json = serde_json::to_value(MergePlan::default()).unwrap();
        assert!(json.get("tags").is_none());
        assert_eq!(json["tasks"]["add"], 0);
    }
}
