//! Declaration of test groups, cases and hooks.
//!
//! A [`Registry`] is an explicit context object: declarations are appended
//! to it and the engine reads it. Nothing is process-global, so two runs in
//! the same process never see each other's groups.

pub mod case;
pub mod group;
pub mod selection;

pub use case::{CaseResult, EffectFuture, Hook, TestCase};
pub use group::{GroupBuilder, TestGroup};
pub use selection::Selection;

/// Ordered, append-only list of declared groups.
#[derive(Debug, Default)]
pub struct Registry {
    groups: Vec<TestGroup>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a group. `setup` runs synchronously with a handle to the new
    /// group; the group is appended once it returns.
    pub fn describe<F>(&mut self, description: impl Into<String>, setup: F)
    where
        F: FnOnce(&mut GroupBuilder),
    {
        let mut builder = GroupBuilder::new(description.into());
        setup(&mut builder);
        let group = builder.finish();
        tracing::debug!(
            group = group.description(),
            cases = group.cases().len(),
            "declared test group"
        );
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[TestGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn case_count(&self) -> usize {
        self.groups.iter().map(|g| g.cases().len()).sum()
    }

    /// Groups matching `selection`, in declaration order.
    pub fn select(&self, selection: &Selection) -> Vec<&TestGroup> {
        self.groups
            .iter()
            .filter(|g| selection.matches(g.description()))
            .collect()
    }
}
