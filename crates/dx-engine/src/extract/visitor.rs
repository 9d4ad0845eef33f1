use dx_core::{DeclarationKind, Modifier, ANONYMOUS, NO_TYPE, SIGNATURE_DELIMITER, VARIADIC_MARKER};

use super::context::FileContext;
use super::syntax::{NodeKind, Role, SyntaxNode};

/// Single-pass declaration walker.
///
/// Containers are entered through [`FileContext::enter_container`], so the
/// container and type stacks are unwound on every path out of a visit.
/// Unknown node kinds are traversed transparently.
pub struct DeclarationVisitor;

/// Deepest chain of declaration handlers (types, callables, loops, labels,
/// ...) followed within one file.
pub const MAX_NESTING: usize = 256;

/// Type token with all whitespace removed.
fn normalize(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

struct TypeInfo {
    resolved: String,
    is_array: bool,
}

impl DeclarationVisitor {
    pub fn visit_compilation_unit<N: SyntaxNode>(root: &N, ctx: &mut FileContext) {
        if root.kind() != NodeKind::Program {
            Self::unexpected(root, ctx, "compilation root");
        }
        Self::visit_children(root, ctx);
    }

    /// Whether `kind` under `parent` has a declaration handler. Everything
    /// else is walked through transparently.
    fn is_handled(kind: NodeKind, parent: NodeKind) -> bool {
        match kind {
            NodeKind::ClassBody => {
                matches!(parent, NodeKind::ObjectCreation | NodeKind::EnumConstant)
            }
            NodeKind::Block => parent.is_member_body(),
            kind if kind.is_type_declaration() => true,
            NodeKind::PackageDeclaration
            | NodeKind::ImportDeclaration
            | NodeKind::EnumConstant
            | NodeKind::MethodDeclaration
            | NodeKind::ConstructorDeclaration
            | NodeKind::CompactConstructorDeclaration
            | NodeKind::AnnotationTypeElement
            | NodeKind::StaticInitializer
            | NodeKind::FieldDeclaration
            | NodeKind::LocalVariableDeclaration
            | NodeKind::ForStatement
            | NodeKind::EnhancedForStatement
            | NodeKind::CatchFormalParameter
            | NodeKind::Resource
            | NodeKind::LabeledStatement => true,
            _ => false,
        }
    }

    /// Runs the handler for `node` and returns true, or returns false when
    /// the node has none. Handlers deeper than [`MAX_NESTING`] are skipped.
    fn dispatch<N: SyntaxNode>(node: &N, parent: NodeKind, ctx: &mut FileContext) -> bool {
        let kind = node.kind();
        if !Self::is_handled(kind, parent) {
            return false;
        }
        if ctx.nesting >= MAX_NESTING {
            Self::unexpected(node, ctx, "declarations nested too deeply");
            return true;
        }

        ctx.nesting += 1;
        match kind {
            NodeKind::PackageDeclaration => Self::visit_package(node, ctx),
            NodeKind::ImportDeclaration => Self::visit_import(node, ctx),
            NodeKind::ClassBody => Self::visit_anonymous_body(node, ctx),
            NodeKind::EnumConstant => Self::visit_enum_constant(node, ctx),
            NodeKind::MethodDeclaration
            | NodeKind::ConstructorDeclaration
            | NodeKind::CompactConstructorDeclaration => Self::visit_callable(node, ctx),
            NodeKind::AnnotationTypeElement => Self::visit_annotation_member(node, ctx),
            NodeKind::Block => Self::visit_initializer(node, false, ctx),
            NodeKind::StaticInitializer => Self::visit_initializer(node, true, ctx),
            NodeKind::FieldDeclaration => {
                Self::visit_variables(node, DeclarationKind::Field, false, ctx)
            }
            NodeKind::LocalVariableDeclaration => {
                Self::visit_variables(node, DeclarationKind::LocalVariable, false, ctx)
            }
            NodeKind::ForStatement => Self::visit_for(node, ctx),
            NodeKind::EnhancedForStatement => Self::visit_enhanced_for(node, ctx),
            NodeKind::CatchFormalParameter => Self::visit_catch_parameter(node, ctx),
            NodeKind::Resource => Self::visit_resource(node, ctx),
            NodeKind::LabeledStatement => Self::visit_label(node, ctx),
            kind if kind.is_type_declaration() => Self::visit_type_declaration(node, parent, ctx),
            _ => {}
        }
        ctx.nesting -= 1;
        true
    }

    fn visit<N: SyntaxNode>(node: &N, parent: NodeKind, ctx: &mut FileContext) {
        if !Self::dispatch(node, parent, ctx) {
            Self::visit_children(node, ctx);
        }
    }

    /// Pre-order walk below `node`. Expression chains can be arbitrarily
    /// deep, so transparent nodes are expanded on an explicit stack and only
    /// declaration handlers recurse.
    fn visit_children<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        let mut pending: Vec<(N, NodeKind)> = Vec::new();
        Self::push_children(node, &mut pending);
        while let Some((child, parent)) = pending.pop() {
            if !Self::dispatch(&child, parent, ctx) {
                Self::push_children(&child, &mut pending);
            }
        }
    }

    fn push_children<N: SyntaxNode>(node: &N, pending: &mut Vec<(N, NodeKind)>) {
        let kind = node.kind();
        pending.extend(node.children().into_iter().rev().map(|child| (child, kind)));
    }

    fn unexpected<N: SyntaxNode>(node: &N, ctx: &FileContext, what: &str) {
        let span = node.span();
        tracing::warn!(
            file = %ctx.tracker.file_name(),
            line = span.start_line,
            column = span.start_column,
            kind = ?node.kind(),
            "unexpected shape for {what}"
        );
    }

    /// Dotted name child of a package or import declaration.
    fn dotted_name<N: SyntaxNode>(node: &N) -> Option<String> {
        node.children()
            .into_iter()
            .find(|c| matches!(c.kind(), NodeKind::Identifier | NodeKind::ScopedIdentifier))
            .map(|c| normalize(c.text()))
    }

    fn visit_package<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        match Self::dotted_name(node) {
            Some(name) => ctx.tracker.set_package(&name),
            None => Self::unexpected(node, ctx, "package declaration"),
        }
    }

    fn visit_import<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        let Some(mut name) = Self::dotted_name(node) else {
            Self::unexpected(node, ctx, "import declaration");
            return;
        };
        if node.child_of_kind(NodeKind::Asterisk).is_some() {
            name.push_str(".*");
        }
        ctx.resolver.add_import(name);
    }

    /// Resolves a declared type. The element type of an array is what gets
    /// resolved; `extra_dims` covers C-style `int x[]` declarators.
    fn type_info<N: SyntaxNode>(ty: &N, extra_dims: bool, ctx: &FileContext) -> TypeInfo {
        let is_array = ty.kind() == NodeKind::ArrayType || extra_dims;
        let element = match ty.kind() {
            NodeKind::ArrayType => ty
                .field(Role::Element)
                .map(|e| normalize(e.text()))
                .unwrap_or_else(|| normalize(ty.text())),
            _ => normalize(ty.text()),
        };
        TypeInfo {
            resolved: ctx.resolver.resolve(&element),
            is_array,
        }
    }

    /// Every type node listed under an extends/implements clause.
    fn listed_types<N: SyntaxNode>(clause: &N, out: &mut Vec<N>) {
        for child in clause.children() {
            if child.kind().is_type() {
                out.push(child);
            } else {
                Self::listed_types(&child, out);
            }
        }
    }

    fn resolve_clause<N: SyntaxNode>(clause: Option<N>, ctx: &FileContext) -> Vec<String> {
        let mut types = Vec::new();
        if let Some(clause) = clause {
            Self::listed_types(&clause, &mut types);
        }
        types
            .iter()
            .map(|t| ctx.resolver.resolve(&normalize(t.text())))
            .collect()
    }

    // ── Containers ──

    fn visit_type_declaration<N: SyntaxNode>(node: &N, parent: NodeKind, ctx: &mut FileContext) {
        let Some(name_node) = node.field(Role::Name) else {
            Self::unexpected(node, ctx, "type declaration");
            Self::visit_children(node, ctx);
            return;
        };
        let name = name_node.text().to_string();

        let kind = match node.kind() {
            NodeKind::InterfaceDeclaration if parent == NodeKind::Program => {
                DeclarationKind::Interface
            }
            NodeKind::InterfaceDeclaration => DeclarationKind::NestedInterface,
            NodeKind::EnumDeclaration => DeclarationKind::Enum,
            NodeKind::AnnotationTypeDeclaration => DeclarationKind::Annotation,
            _ if parent == NodeKind::Program => DeclarationKind::Class,
            _ if parent.is_member_body() => DeclarationKind::MemberClass,
            _ => DeclarationKind::LocalClass,
        };

        let mut scope = ctx.enter_container(Some(name.as_str()));
        let qualified = scope
            .tracker
            .qualified_type_name()
            .unwrap_or_else(|| name.clone());
        scope.resolver.add_local_type(qualified.clone());

        let (superclasses, supertypes) = match node.kind() {
            NodeKind::ClassDeclaration => (
                Self::resolve_clause(node.field(Role::Superclass), &scope),
                Self::resolve_clause(node.field(Role::Interfaces), &scope),
            ),
            NodeKind::InterfaceDeclaration => (
                Vec::new(),
                Self::resolve_clause(node.child_of_kind(NodeKind::ExtendsInterfaces), &scope),
            ),
            NodeKind::EnumDeclaration | NodeKind::RecordDeclaration => (
                Vec::new(),
                Self::resolve_clause(node.field(Role::Interfaces), &scope),
            ),
            _ => (Vec::new(), Vec::new()),
        };

        let mut record = scope.new_record(&name, kind, node.span());
        record.type_name = qualified;
        record.modifiers = node.modifiers();
        record.superclasses = superclasses;
        record.supertypes = supertypes;
        scope.emit(record);

        if node.kind() == NodeKind::RecordDeclaration {
            if let Some(components) = node.field(Role::Parameters) {
                for component in components.children() {
                    Self::emit_parameter(&component, &mut scope);
                }
            }
        }

        match node.field(Role::Body) {
            Some(body) => Self::visit(&body, node.kind(), &mut scope),
            None => Self::unexpected(node, &scope, "type body"),
        }
    }

    fn visit_anonymous_body<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        let mut scope = ctx.enter_container(None);
        let record = scope.new_record(ANONYMOUS, DeclarationKind::LocalClass, node.span());
        scope.emit(record);
        Self::visit_children(node, &mut scope);
    }

    fn visit_enum_constant<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        let Some(name_node) = node.field(Role::Name) else {
            Self::unexpected(node, ctx, "enum constant");
            return;
        };
        let enum_type = ctx.tracker.qualified_type_name();

        let mut scope = ctx.enter_container(None);
        let mut record = scope.new_record(name_node.text(), DeclarationKind::EnumConstant, node.span());
        record.type_name = enum_type.unwrap_or_else(|| NO_TYPE.to_string());
        record.modifiers = node.modifiers();
        scope.emit(record);
        Self::visit_children(node, &mut scope);
    }

    fn visit_callable<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        let Some(name_node) = node.field(Role::Name) else {
            Self::unexpected(node, ctx, "method declaration");
            return;
        };
        let is_method = node.kind() == NodeKind::MethodDeclaration;

        let type_info = if is_method {
            match node.field(Role::Type) {
                Some(ty) => Self::type_info(&ty, node.field(Role::Dimensions).is_some(), ctx),
                None => {
                    Self::unexpected(node, ctx, "method return type");
                    TypeInfo {
                        resolved: NO_TYPE.to_string(),
                        is_array: false,
                    }
                }
            }
        } else {
            TypeInfo {
                resolved: ctx
                    .tracker
                    .qualified_type_name()
                    .unwrap_or_else(|| name_node.text().to_string()),
                is_array: false,
            }
        };

        let parameters: Vec<N> = node
            .field(Role::Parameters)
            .map(|p| {
                p.children()
                    .into_iter()
                    .filter(|c| {
                        matches!(c.kind(), NodeKind::FormalParameter | NodeKind::SpreadParameter)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let signature = Self::signature(&parameters);

        let mut scope = ctx.enter_container(None);
        let kind = if is_method {
            DeclarationKind::Method
        } else {
            DeclarationKind::Constructor
        };
        let mut record = scope.new_record(name_node.text(), kind, node.span());
        record.type_name = type_info.resolved;
        record.is_array = type_info.is_array;
        record.signature = Some(signature);
        record.modifiers = node.modifiers();
        scope.emit(record);

        for parameter in &parameters {
            Self::emit_parameter(parameter, &mut scope);
        }

        if let Some(body) = node.field(Role::Body) {
            Self::visit(&body, node.kind(), &mut scope);
        }
    }

    /// `(T1;T2;Tn...;)`
    fn signature<N: SyntaxNode>(parameters: &[N]) -> String {
        let mut signature = String::from("(");
        for parameter in parameters {
            if let Some(ty) = Self::parameter_type(parameter) {
                signature.push_str(&normalize(ty.text()));
            }
            if parameter.kind() == NodeKind::SpreadParameter {
                signature.push_str(VARIADIC_MARKER);
            }
            signature.push(SIGNATURE_DELIMITER);
        }
        signature.push(')');
        signature
    }

    fn parameter_type<N: SyntaxNode>(parameter: &N) -> Option<N> {
        parameter.field(Role::Type).or_else(|| {
            parameter
                .children()
                .into_iter()
                .find(|c| c.kind().is_type())
        })
    }

    fn emit_parameter<N: SyntaxNode>(parameter: &N, ctx: &mut FileContext) {
        // Spread parameters hold their name in a nested declarator.
        let declarator = match parameter.kind() {
            NodeKind::FormalParameter => parameter.clone(),
            NodeKind::SpreadParameter => match parameter.child_of_kind(NodeKind::VariableDeclarator) {
                Some(d) => d,
                None => {
                    Self::unexpected(parameter, ctx, "variadic parameter");
                    return;
                }
            },
            _ => return,
        };
        let (Some(name), Some(ty)) = (declarator.field(Role::Name), Self::parameter_type(parameter))
        else {
            Self::unexpected(parameter, ctx, "formal parameter");
            return;
        };

        let info = Self::type_info(&ty, declarator.field(Role::Dimensions).is_some(), ctx);
        let (parent_id, own_id) = ctx.leaf();
        let mut record = ctx.new_record(
            parent_id,
            own_id,
            name.text(),
            DeclarationKind::FormalArgument,
            parameter.span(),
        );
        record.type_name = info.resolved;
        record.is_array = info.is_array;
        record.modifiers = parameter.modifiers();
        ctx.emit(record);
    }

    fn visit_initializer<N: SyntaxNode>(node: &N, is_static: bool, ctx: &mut FileContext) {
        let mut scope = ctx.enter_container(None);
        let mut record = scope.new_record(ANONYMOUS, DeclarationKind::Initializer, node.span());
        if is_static {
            record.modifiers.insert(Modifier::Static);
        }
        scope.emit(record);
        Self::visit_children(node, &mut scope);
    }

    // ── Leaves ──

    fn visit_annotation_member<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        let (Some(name), Some(ty)) = (node.field(Role::Name), node.field(Role::Type)) else {
            Self::unexpected(node, ctx, "annotation member");
            return;
        };
        let info = Self::type_info(&ty, node.field(Role::Dimensions).is_some(), ctx);
        let (parent_id, own_id) = ctx.leaf();
        let mut record = ctx.new_record(
            parent_id,
            own_id,
            name.text(),
            DeclarationKind::AnnotationMember,
            node.span(),
        );
        record.type_name = info.resolved;
        record.is_array = info.is_array;
        record.modifiers = node.modifiers();
        ctx.emit(record);
        Self::visit_children(node, ctx);
    }

    /// One record per declarator of a field or local variable declaration.
    fn visit_variables<N: SyntaxNode>(
        node: &N,
        kind: DeclarationKind,
        loop_control: bool,
        ctx: &mut FileContext,
    ) {
        let Some(ty) = node.field(Role::Type) else {
            Self::unexpected(node, ctx, "variable declaration");
            return;
        };
        let modifiers = node.modifiers();

        for declarator in node.fields(Role::Declarator) {
            let Some(name) = declarator.field(Role::Name) else {
                Self::unexpected(&declarator, ctx, "variable declarator");
                continue;
            };
            let info = Self::type_info(&ty, declarator.field(Role::Dimensions).is_some(), ctx);
            let (parent_id, own_id) = ctx.leaf();
            let mut record = ctx.new_record(parent_id, own_id, name.text(), kind, name.span());
            record.type_name = info.resolved;
            record.is_array = info.is_array;
            record.modifiers = modifiers.clone();
            record.is_loop_control_variable = loop_control;
            ctx.emit(record);

            // initializers may declare anonymous classes
            Self::visit_children(&declarator, ctx);
        }
    }

    fn visit_for<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        let init = node
            .field(Role::Init)
            .filter(|n| n.kind() == NodeKind::LocalVariableDeclaration)
            .map(|n| n.id());
        for child in node.children() {
            if Some(child.id()) == init {
                Self::visit_variables(&child, DeclarationKind::LocalVariable, true, ctx);
            } else {
                Self::visit(&child, NodeKind::ForStatement, ctx);
            }
        }
    }

    fn visit_enhanced_for<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        match (node.field(Role::Name), node.field(Role::Type)) {
            (Some(name), Some(ty)) => {
                let info = Self::type_info(&ty, node.field(Role::Dimensions).is_some(), ctx);
                let (parent_id, own_id) = ctx.leaf();
                let mut record = ctx.new_record(
                    parent_id,
                    own_id,
                    name.text(),
                    DeclarationKind::LocalVariable,
                    name.span(),
                );
                record.type_name = info.resolved;
                record.is_array = info.is_array;
                record.modifiers = node.modifiers();
                ctx.emit(record);
            }
            _ => Self::unexpected(node, ctx, "enhanced for"),
        }
        Self::visit_children(node, ctx);
    }

    /// A multi-catch parameter yields one record per alternative type.
    fn visit_catch_parameter<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        let (Some(name), Some(alternatives)) =
            (node.field(Role::Name), node.child_of_kind(NodeKind::CatchType))
        else {
            Self::unexpected(node, ctx, "catch parameter");
            return;
        };
        let modifiers = node.modifiers();
        for ty in alternatives.children().into_iter().filter(|c| c.kind().is_type()) {
            let info = Self::type_info(&ty, false, ctx);
            let (parent_id, own_id) = ctx.leaf();
            let mut record = ctx.new_record(
                parent_id,
                own_id,
                name.text(),
                DeclarationKind::LocalVariable,
                node.span(),
            );
            record.type_name = info.resolved;
            record.is_array = info.is_array;
            record.modifiers = modifiers.clone();
            ctx.emit(record);
        }
    }

    fn visit_resource<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        // `try (existing)` reuses a variable and declares nothing
        if let (Some(name), Some(ty)) = (node.field(Role::Name), node.field(Role::Type)) {
            let info = Self::type_info(&ty, node.field(Role::Dimensions).is_some(), ctx);
            let (parent_id, own_id) = ctx.leaf();
            let mut record = ctx.new_record(
                parent_id,
                own_id,
                name.text(),
                DeclarationKind::LocalVariable,
                name.span(),
            );
            record.type_name = info.resolved;
            record.is_array = info.is_array;
            record.modifiers = node.modifiers();
            ctx.emit(record);
        }
        Self::visit_children(node, ctx);
    }

    fn visit_label<N: SyntaxNode>(node: &N, ctx: &mut FileContext) {
        match node.child_of_kind(NodeKind::Identifier) {
            Some(label) => {
                let (parent_id, own_id) = ctx.leaf();
                let record = ctx.new_record(
                    parent_id,
                    own_id,
                    label.text(),
                    DeclarationKind::Label,
                    node.span(),
                );
                ctx.emit(record);
            }
            None => Self::unexpected(node, ctx, "labeled statement"),
        }
        Self::visit_children(node, ctx);
    }
}
