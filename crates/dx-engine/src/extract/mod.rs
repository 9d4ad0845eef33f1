pub mod context;
pub mod resolver;
pub mod syntax;
pub mod tracker;
pub mod visitor;

use std::sync::Arc;

use dx_core::{DeclarationRecord, ProjectIdentity};

pub use context::{ContainerScope, FileContext};
pub use resolver::TypeResolver;
pub use syntax::{NodeKind, Role, SyntaxNode};
pub use tracker::LocationTracker;
pub use visitor::DeclarationVisitor;

/// Walks one parsed file and returns its declarations in traversal order
/// (pre-order, container before children).
pub fn extract_declarations<N: SyntaxNode>(
    root: &N,
    identity: Arc<ProjectIdentity>,
    file_name: &str,
) -> Vec<DeclarationRecord> {
    let mut ctx = FileContext::new(identity, file_name);
    DeclarationVisitor::visit_compilation_unit(root, &mut ctx);
    ctx.into_records()
}
