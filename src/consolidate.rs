//! Consolidation - Fewer Process Spawns
//!
//! Partitions an ordered drawable list into runs that can share one tool
//! invocation. Partitioning never reorders or drops anything.

use std::path::PathBuf;

use serde::Serialize;

use crate::drawable::{Drawable, Tool};

/// Drawables destined for a single invocation of `tool`.
#[derive(Debug, Clone)]
pub struct ConsolidatedGroup<'a> {
    pub members: Vec<&'a dyn Drawable>,
    pub tool: Tool,
}

impl<'a> ConsolidatedGroup<'a> {
    fn open(first: &'a dyn Drawable) -> Self {
        Self {
            members: vec![first],
            tool: first.tool(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Name used in errors and logs, e.g. `sepia+blur`.
    pub fn label(&self) -> String {
        self.members
            .iter()
            .map(|d| d.name())
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            tool: self.tool,
            members: self.members.iter().map(|d| d.name().to_string()).collect(),
            arguments: self.members.iter().flat_map(|d| d.arguments()).collect(),
            sources: self
                .members
                .iter()
                .filter_map(|d| d.source().map(PathBuf::from))
                .collect(),
        }
    }
}

/// Owned, serializable view of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub tool: Tool,
    pub members: Vec<String>,
    pub arguments: Vec<String>,
    /// Images read from disk that are not already among the arguments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<PathBuf>,
}

/// Must sit alone in its group regardless of neighbours.
fn is_isolated(d: &dyn Drawable) -> bool {
    d.is_layer() || !d.is_consolidatable() || d.source_count() > 1
}

/// Group adjacent drawables that share a tool and may be merged.
pub fn group_consolidatables<'a>(drawables: &[&'a dyn Drawable]) -> Vec<ConsolidatedGroup<'a>> {
    let mut groups = Vec::new();
    let mut open: Option<ConsolidatedGroup<'a>> = None;

    for &d in drawables {
        if is_isolated(d) {
            groups.extend(open.take());
            groups.push(ConsolidatedGroup::open(d));
            continue;
        }

        match open.as_mut() {
            Some(group) if group.tool == d.tool() => group.members.push(d),
            _ => {
                groups.extend(open.take());
                open = Some(ConsolidatedGroup::open(d));
            }
        }
    }

    groups.extend(open);
    groups
}
