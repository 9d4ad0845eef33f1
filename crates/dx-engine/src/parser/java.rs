use std::time::Duration;

use dx_core::{Modifier, ModifierSet, SourceSpan};
use tree_sitter::{Node, Parser, Tree};

use super::{Grammar, ParseFailure, ParsedUnit, PredictionMode};
use crate::extract::{NodeKind, Role, SyntaxNode};

/// Budget granted to a fast-mode parse.
pub const FAST_PARSE_BUDGET: Duration = Duration::from_secs(5);

/// tree-sitter-java node bound to the original source text.
#[derive(Clone, Copy)]
pub struct JavaNode<'a> {
    node: Node<'a>,
    source: &'a str,
}

impl<'a> JavaNode<'a> {
    pub fn new(node: Node<'a>, source: &'a str) -> Self {
        Self { node, source }
    }

    fn wrap(&self, node: Node<'a>) -> Self {
        Self::new(node, self.source)
    }

    /// 1-based character column of the character starting at `byte`, given
    /// the byte column tree-sitter reports for it.
    fn char_column(&self, byte: usize, byte_column: usize) -> u32 {
        let line_start = byte.saturating_sub(byte_column);
        let prefix = self.source.get(line_start..byte).unwrap_or("");
        prefix.chars().count() as u32 + 1
    }
}

fn field_name(role: Role) -> &'static str {
    match role {
        Role::Name => "name",
        Role::Type => "type",
        Role::Body => "body",
        Role::Superclass => "superclass",
        Role::Interfaces => "interfaces",
        Role::Parameters => "parameters",
        Role::Declarator => "declarator",
        Role::Dimensions => "dimensions",
        Role::Init => "init",
        Role::Element => "element",
    }
}

impl SyntaxNode for JavaNode<'_> {
    fn kind(&self) -> NodeKind {
        match self.node.kind() {
            "program" => NodeKind::Program,
            "package_declaration" => NodeKind::PackageDeclaration,
            "import_declaration" => NodeKind::ImportDeclaration,
            "identifier" => NodeKind::Identifier,
            "scoped_identifier" => NodeKind::ScopedIdentifier,
            "asterisk" => NodeKind::Asterisk,
            "class_declaration" => NodeKind::ClassDeclaration,
            "interface_declaration" => NodeKind::InterfaceDeclaration,
            "enum_declaration" => NodeKind::EnumDeclaration,
            "record_declaration" => NodeKind::RecordDeclaration,
            "annotation_type_declaration" => NodeKind::AnnotationTypeDeclaration,
            "annotation_type_element_declaration" => NodeKind::AnnotationTypeElement,
            "class_body" => NodeKind::ClassBody,
            "interface_body" => NodeKind::InterfaceBody,
            "enum_body" => NodeKind::EnumBody,
            "enum_body_declarations" => NodeKind::EnumBodyDeclarations,
            "annotation_type_body" => NodeKind::AnnotationTypeBody,
            "enum_constant" => NodeKind::EnumConstant,
            "superclass" => NodeKind::Superclass,
            "super_interfaces" => NodeKind::SuperInterfaces,
            "extends_interfaces" => NodeKind::ExtendsInterfaces,
            "method_declaration" => NodeKind::MethodDeclaration,
            "constructor_declaration" => NodeKind::ConstructorDeclaration,
            "compact_constructor_declaration" => NodeKind::CompactConstructorDeclaration,
            "formal_parameters" => NodeKind::FormalParameters,
            "formal_parameter" => NodeKind::FormalParameter,
            "spread_parameter" => NodeKind::SpreadParameter,
            "receiver_parameter" => NodeKind::ReceiverParameter,
            "field_declaration" | "constant_declaration" => NodeKind::FieldDeclaration,
            "local_variable_declaration" => NodeKind::LocalVariableDeclaration,
            "variable_declarator" => NodeKind::VariableDeclarator,
            "dimensions" => NodeKind::Dimensions,
            "for_statement" => NodeKind::ForStatement,
            "enhanced_for_statement" => NodeKind::EnhancedForStatement,
            "catch_clause" => NodeKind::CatchClause,
            "catch_formal_parameter" => NodeKind::CatchFormalParameter,
            "catch_type" => NodeKind::CatchType,
            "resource_specification" => NodeKind::ResourceSpecification,
            "resource" => NodeKind::Resource,
            "labeled_statement" => NodeKind::LabeledStatement,
            "object_creation_expression" => NodeKind::ObjectCreation,
            "block" => NodeKind::Block,
            "static_initializer" => NodeKind::StaticInitializer,
            "modifiers" => NodeKind::Modifiers,
            "array_type" => NodeKind::ArrayType,
            "integral_type" | "floating_point_type" | "boolean_type" | "void_type"
            | "type_identifier" | "scoped_type_identifier" | "generic_type" | "annotated_type" => {
                NodeKind::Type
            }
            _ => NodeKind::Other,
        }
    }

    fn id(&self) -> usize {
        self.node.id()
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.node.walk();
        self.node
            .named_children(&mut cursor)
            .map(|n| self.wrap(n))
            .collect()
    }

    fn field(&self, role: Role) -> Option<Self> {
        self.node
            .child_by_field_name(field_name(role))
            .map(|n| self.wrap(n))
    }

    fn fields(&self, role: Role) -> Vec<Self> {
        let mut cursor = self.node.walk();
        self.node
            .children_by_field_name(field_name(role), &mut cursor)
            .map(|n| self.wrap(n))
            .collect()
    }

    fn text(&self) -> &str {
        self.source.get(self.node.byte_range()).unwrap_or("")
    }

    fn span(&self) -> SourceSpan {
        let start = self.node.start_position();
        let end = self.node.end_position();
        let start_byte = self.node.start_byte();
        let end_byte = self.node.end_byte();

        // The end column is that of the last character, not one past it.
        let last_char = self
            .source
            .get(start_byte..end_byte)
            .and_then(|text| text.char_indices().next_back())
            .map(|(offset, _)| start_byte + offset)
            .unwrap_or(start_byte);
        let end_column = if end.column == 0 {
            1
        } else {
            let line_start = end_byte.saturating_sub(end.column);
            self.char_column(last_char, last_char.saturating_sub(line_start))
        };

        SourceSpan {
            start_line: start.row as u32 + 1,
            start_column: self.char_column(start_byte, start.column),
            end_line: end.row as u32 + 1,
            end_column,
        }
    }

    fn modifiers(&self) -> ModifierSet {
        let mut set = ModifierSet::new();
        let Some(modifiers) = self.child_of_kind(NodeKind::Modifiers) else {
            return set;
        };
        let mut cursor = modifiers.node.walk();
        for keyword in modifiers.node.children(&mut cursor) {
            if let Ok(modifier) = keyword.kind().parse::<Modifier>() {
                set.insert(modifier);
            }
        }
        set
    }
}

// ── Shared tree-sitter plumbing ──

pub(crate) fn create_parser() -> Result<Parser, ParseFailure> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| ParseFailure::Fault(format!("Failed to load Java grammar: {e}")))?;
    Ok(parser)
}

/// First error or missing node in document order. Follows the first child
/// flagged with an error instead of recursing, as broken trees can be deep.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut node = root;
    loop {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let next = node.children(&mut cursor).find(|child| child.has_error());
        node = next?;
    }
}

/// Rejects any tree that needed error recovery.
pub(crate) fn check_tree(tree: Tree, parsed_text: &str, grammar: &'static str) -> Result<ParsedUnit, ParseFailure> {
    let root = tree.root_node();
    if !root.has_error() {
        return Ok(ParsedUnit::new(tree, grammar));
    }

    let culprit = first_error(root).unwrap_or(root);
    let position = culprit.start_position();
    let message = if culprit.is_missing() {
        format!("missing {}", culprit.kind())
    } else {
        let snippet: String = parsed_text
            .get(culprit.byte_range())
            .unwrap_or("")
            .chars()
            .take(24)
            .collect();
        format!("unexpected `{}`", snippet.trim())
    };
    Err(ParseFailure::Syntax {
        line: position.row as u32 + 1,
        column: position.column as u32 + 1,
        message,
    })
}

/// Current Java grammar.
///
/// Fast mode parses under [`FAST_PARSE_BUDGET`]; running out of budget is
/// reported as [`ParseFailure::BudgetExhausted`]. Exhaustive mode starts from
/// a reset parser and has no budget.
pub struct ModernJava {
    budget: Duration,
}

impl ModernJava {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }
}

impl Default for ModernJava {
    fn default() -> Self {
        Self::new(FAST_PARSE_BUDGET)
    }
}

impl Grammar for ModernJava {
    fn name(&self) -> &'static str {
        "modern"
    }

    fn parse(&self, source: &str, mode: PredictionMode) -> Result<ParsedUnit, ParseFailure> {
        let mut parser = create_parser()?;
        match mode {
            PredictionMode::Fast => {
                let micros = u64::try_from(self.budget.as_micros()).unwrap_or(u64::MAX);
                parser.set_timeout_micros(micros.max(1));
            }
            PredictionMode::Exhaustive => {
                parser.reset();
                parser.set_timeout_micros(0);
            }
        }

        let tree = match parser.parse(source, None) {
            Some(tree) => tree,
            None if mode == PredictionMode::Fast => return Err(ParseFailure::BudgetExhausted),
            None => return Err(ParseFailure::Fault("tree-sitter parse returned None".into())),
        };
        check_tree(tree, source, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedUnit {
        ModernJava::default()
            .parse(source, PredictionMode::Fast)
            .expect("valid java")
    }

    #[test]
    fn maps_declarations_to_node_kinds() {
        let source = "package a.b;\nclass Foo { int x; void run() {} }\n";
        let unit = parse(source);
        let root = unit.root(source);
        assert_eq!(root.kind(), NodeKind::Program);

        let kinds: Vec<NodeKind> = root.children().iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![NodeKind::PackageDeclaration, NodeKind::ClassDeclaration]);

        let class = root.children()[1];
        assert_eq!(class.field(Role::Name).map(|n| n.text().to_string()), Some("Foo".into()));
        let body = class.field(Role::Body).expect("class body");
        let members: Vec<NodeKind> = body.children().iter().map(|c| c.kind()).collect();
        assert_eq!(members, vec![NodeKind::FieldDeclaration, NodeKind::MethodDeclaration]);
    }

    #[test]
    fn spans_are_one_based_character_columns() {
        let source = "class Ä { int x; }";
        let unit = parse(source);
        let class = unit.root(source).children()[0];
        let span = class.span();
        assert_eq!((span.start_line, span.start_column), (1, 1));
        assert_eq!((span.end_line, span.end_column), (1, 18));

        let field = class.field(Role::Body).expect("body").children()[0];
        let span = field.span();
        assert_eq!((span.start_column, span.end_column), (11, 16));
    }

    #[test]
    fn multi_line_span() {
        let source = "class A {\n  void m() {\n  }\n}\n";
        let unit = parse(source);
        let method = unit.root(source).children()[0]
            .field(Role::Body)
            .expect("body")
            .children()[0];
        let span = method.span();
        assert_eq!((span.start_line, span.start_column), (2, 3));
        assert_eq!((span.end_line, span.end_column), (3, 3));
    }

    #[test]
    fn collects_modifier_keywords_only() {
        let source = "public abstract class A { @Deprecated protected static final int X = 1; }";
        let unit = parse(source);
        let class = unit.root(source).children()[0];
        assert_eq!(
            class.modifiers().into_iter().collect::<Vec<_>>(),
            vec![Modifier::Public, Modifier::Abstract]
        );
        let field = class.field(Role::Body).expect("body").children()[0];
        assert_eq!(
            field.modifiers().into_iter().collect::<Vec<_>>(),
            vec![Modifier::Protected, Modifier::Final, Modifier::Static]
        );
    }

    #[test]
    fn syntax_errors_are_recoverable_failures() {
        let grammar = ModernJava::default();
        for mode in [PredictionMode::Fast, PredictionMode::Exhaustive] {
            match grammar.parse("class A { void m( }", mode) {
                Err(err @ ParseFailure::Syntax { .. }) => assert!(err.is_recoverable()),
                Err(other) => panic!("unexpected failure: {other}"),
                Ok(_) => panic!("broken source parsed"),
            }
        }
    }
}
