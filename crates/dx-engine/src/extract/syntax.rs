//! Grammar-neutral view of a parsed Java tree.
//!
//! The declaration visitor only ever sees nodes through [`SyntaxNode`]; each
//! grammar adapter maps its concrete node types onto the closed [`NodeKind`]
//! set and the [`Role`] field names below.

use dx_core::{ModifierSet, SourceSpan};

/// Node discriminator. Anything the visitor does not dispatch on is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    PackageDeclaration,
    ImportDeclaration,
    Identifier,
    ScopedIdentifier,
    Asterisk,

    ClassDeclaration,
    InterfaceDeclaration,
    EnumDeclaration,
    RecordDeclaration,
    AnnotationTypeDeclaration,
    AnnotationTypeElement,

    ClassBody,
    InterfaceBody,
    EnumBody,
    EnumBodyDeclarations,
    AnnotationTypeBody,
    EnumConstant,

    Superclass,
    SuperInterfaces,
    ExtendsInterfaces,

    MethodDeclaration,
    ConstructorDeclaration,
    CompactConstructorDeclaration,
    FormalParameters,
    FormalParameter,
    SpreadParameter,
    ReceiverParameter,

    FieldDeclaration,
    LocalVariableDeclaration,
    VariableDeclarator,
    Dimensions,

    ForStatement,
    EnhancedForStatement,
    CatchClause,
    CatchFormalParameter,
    CatchType,
    ResourceSpecification,
    Resource,
    LabeledStatement,
    ObjectCreation,
    Block,
    StaticInitializer,

    Modifiers,
    ArrayType,
    Type,
    Other,
}

impl NodeKind {
    /// Type-declaration kinds that open a named type scope.
    pub fn is_type_declaration(&self) -> bool {
        matches!(
            self,
            Self::ClassDeclaration
                | Self::InterfaceDeclaration
                | Self::EnumDeclaration
                | Self::RecordDeclaration
                | Self::AnnotationTypeDeclaration
        )
    }

    /// Bodies whose direct members are class members (as opposed to statements).
    pub fn is_member_body(&self) -> bool {
        matches!(
            self,
            Self::ClassBody
                | Self::InterfaceBody
                | Self::EnumBodyDeclarations
                | Self::AnnotationTypeBody
        )
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Self::Type | Self::ArrayType)
    }
}

/// Named child slots the visitor asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Name,
    Type,
    Body,
    Superclass,
    Interfaces,
    Parameters,
    Declarator,
    Dimensions,
    Init,
    Element,
}

pub trait SyntaxNode: Clone {
    fn kind(&self) -> NodeKind;

    /// Identity of the node within its tree.
    fn id(&self) -> usize;

    /// Ordered named children.
    fn children(&self) -> Vec<Self>;

    /// First child filling `role`, if the production has one.
    fn field(&self, role: Role) -> Option<Self>;

    /// Every child filling `role`, in source order.
    fn fields(&self, role: Role) -> Vec<Self>;

    /// Raw source text covered by the node.
    fn text(&self) -> &str;

    fn span(&self) -> SourceSpan;

    /// Modifier keywords attached to a declaration node. Annotations and
    /// keywords outside the modifier vocabulary are ignored.
    fn modifiers(&self) -> ModifierSet;

    fn child_of_kind(&self, kind: NodeKind) -> Option<Self> {
        self.children().into_iter().find(|c| c.kind() == kind)
    }
}
