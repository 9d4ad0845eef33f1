use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use dx_core::{
    DeclarationKind, DeclarationRecord, ModifierSet, ProjectIdentity, SourceSpan, NO_TYPE,
};

use super::resolver::TypeResolver;
use super::tracker::LocationTracker;

/// Everything one file's traversal accumulates. Records stay buffered here
/// until the traversal finishes.
pub struct FileContext {
    pub tracker: LocationTracker,
    pub resolver: TypeResolver,
    records: Vec<DeclarationRecord>,
    /// Declaration handlers currently running for this file.
    pub(crate) nesting: usize,
}

impl FileContext {
    pub fn new(identity: Arc<ProjectIdentity>, file_name: &str) -> Self {
        Self {
            tracker: LocationTracker::new(identity, file_name),
            resolver: TypeResolver::new(file_name),
            records: Vec::new(),
            nesting: 0,
        }
    }

    /// Opens a container scope. The returned guard pops the container (and
    /// the type name, when one was pushed) when it goes out of scope.
    pub fn enter_container(&mut self, type_name: Option<&str>) -> ContainerScope<'_> {
        let parent_id = self.tracker.current_container_id();
        let own_id = self.tracker.push_container();
        if let Some(name) = type_name {
            self.tracker.push_type(name);
        }
        ContainerScope {
            ctx: self,
            parent_id,
            own_id,
            type_name: type_name.map(String::from),
        }
    }

    /// Allocates a leaf identifier under the current container.
    pub fn leaf(&mut self) -> (String, String) {
        let parent_id = self.tracker.current_container_id();
        let own_id = self.tracker.leaf_id();
        (parent_id, own_id)
    }

    /// A record with every optional attribute at its empty value.
    pub fn new_record(
        &self,
        parent_id: String,
        own_id: String,
        name: &str,
        kind: DeclarationKind,
        span: SourceSpan,
    ) -> DeclarationRecord {
        DeclarationRecord {
            source_file: self.tracker.file_name().to_string(),
            package_name: self.tracker.package_name().to_string(),
            parent_id,
            own_id,
            name: name.to_string(),
            kind,
            type_name: NO_TYPE.to_string(),
            is_array: false,
            signature: None,
            modifiers: ModifierSet::new(),
            is_loop_control_variable: false,
            superclasses: Vec::new(),
            supertypes: Vec::new(),
            span,
        }
    }

    pub fn emit(&mut self, record: DeclarationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[DeclarationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DeclarationRecord> {
        self.records
    }
}

pub struct ContainerScope<'c> {
    ctx: &'c mut FileContext,
    parent_id: String,
    own_id: String,
    type_name: Option<String>,
}

impl ContainerScope<'_> {
    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn own_id(&self) -> &str {
        &self.own_id
    }

    pub fn new_record(&self, name: &str, kind: DeclarationKind, span: SourceSpan) -> DeclarationRecord {
        self.ctx.new_record(
            self.parent_id.clone(),
            self.own_id.clone(),
            name,
            kind,
            span,
        )
    }
}

impl Deref for ContainerScope<'_> {
    type Target = FileContext;

    fn deref(&self) -> &FileContext {
        self.ctx
    }
}

impl DerefMut for ContainerScope<'_> {
    fn deref_mut(&mut self) -> &mut FileContext {
        self.ctx
    }
}

impl Drop for ContainerScope<'_> {
    fn drop(&mut self) {
        self.ctx.tracker.pop();
        if let Some(name) = self.type_name.take() {
            self.ctx.tracker.pop_type(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> SourceSpan {
        SourceSpan {
            start_line: 1,
            start_column: 1,
            end_line: 1,
            end_column: 1,
        }
    }

    #[test]
    fn scope_pops_on_every_exit() {
        let mut ctx = FileContext::new(Arc::new(ProjectIdentity::new("p", "1")), "A.java");
        let root = ctx.tracker.current_container_id();

        let outer_id = {
            let mut outer = ctx.enter_container(Some("A"));
            let outer_id = outer.own_id().to_string();
            assert_eq!(outer.parent_id(), root);
            {
                let inner = outer.enter_container(None);
                assert_eq!(inner.parent_id(), outer_id);
                assert_eq!(inner.tracker.depth(), 2);
            }
            assert_eq!(outer.tracker.depth(), 1);
            let (parent, _) = outer.leaf();
            assert_eq!(parent, outer_id);
            outer_id
        };

        assert_eq!(ctx.tracker.depth(), 0);
        assert_eq!(ctx.tracker.qualified_type_name(), None);
        assert_ne!(outer_id, root);
    }

    #[test]
    fn records_are_buffered_in_emission_order() {
        let mut ctx = FileContext::new(Arc::new(ProjectIdentity::new("p", "1")), "A.java");
        let (parent, own) = ctx.leaf();
        let record = ctx.new_record(parent, own, "x", DeclarationKind::Field, span());
        ctx.emit(record);
        assert_eq!(ctx.records().len(), 1);
        assert_eq!(ctx.records()[0].type_name, NO_TYPE);
        assert_eq!(ctx.into_records()[0].name, "x");
    }
}
