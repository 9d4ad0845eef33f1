use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

// ── Sentinels ──

/// Name given to synthetic entities: anonymous classes and initializer blocks.
/// Not a legal Java identifier, so it can never collide with a declared name.
pub const ANONYMOUS: &str = "#anonymous#";

/// Type recorded for kinds that have none (labels, initializers, anonymous bodies).
pub const NO_TYPE: &str = "#no type#";

/// Terminates every parameter type in a method signature.
pub const SIGNATURE_DELIMITER: char = ';';

/// Appended to the type of a trailing variadic parameter.
pub const VARIADIC_MARKER: &str = "...";

// ── Project identity ──

/// The read-only identity shared by every file task of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIdentity {
    pub name: String,
    pub version: String,
}

impl ProjectIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

// ── Declaration kind ──
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Class,
    Interface,
    MemberClass,
    NestedInterface,
    LocalClass,
    Enum,
    EnumConstant,
    Annotation,
    AnnotationMember,
    Method,
    Constructor,
    Field,
    LocalVariable,
    FormalArgument,
    Label,
    Initializer,
}

impl DeclarationKind {
    /// Kinds that may lexically enclose other declarations.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Class
                | Self::Interface
                | Self::MemberClass
                | Self::NestedInterface
                | Self::LocalClass
                | Self::Enum
                | Self::EnumConstant
                | Self::Annotation
                | Self::Method
                | Self::Constructor
                | Self::Initializer
        )
    }

    /// Kinds whose records carry superclass/supertype lists.
    pub fn has_supertypes(&self) -> bool {
        matches!(
            self,
            Self::Class
                | Self::Interface
                | Self::MemberClass
                | Self::NestedInterface
                | Self::LocalClass
                | Self::Enum
        )
    }
}

impl std::fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::MemberClass => "member_class",
            Self::NestedInterface => "nested_interface",
            Self::LocalClass => "local_class",
            Self::Enum => "enum",
            Self::EnumConstant => "enum_constant",
            Self::Annotation => "annotation",
            Self::AnnotationMember => "annotation_member",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Field => "field",
            Self::LocalVariable => "local_variable",
            Self::FormalArgument => "formal_argument",
            Self::Label => "label",
            Self::Initializer => "initializer",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DeclarationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class" => Ok(Self::Class),
            "interface" => Ok(Self::Interface),
            "member_class" => Ok(Self::MemberClass),
            "nested_interface" => Ok(Self::NestedInterface),
            "local_class" => Ok(Self::LocalClass),
            "enum" => Ok(Self::Enum),
            "enum_constant" => Ok(Self::EnumConstant),
            "annotation" => Ok(Self::Annotation),
            "annotation_member" => Ok(Self::AnnotationMember),
            "method" => Ok(Self::Method),
            "constructor" => Ok(Self::Constructor),
            "field" => Ok(Self::Field),
            "local_variable" => Ok(Self::LocalVariable),
            "formal_argument" => Ok(Self::FormalArgument),
            "label" => Ok(Self::Label),
            "initializer" => Ok(Self::Initializer),
            other => Err(format!("unknown DeclarationKind: {other}")),
        }
    }
}

// ── Modifiers ──
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Final,
    Abstract,
    Native,
    Static,
    Synchronized,
    Volatile,
    Strictfp,
    Transient,
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
            Self::Final => "final",
            Self::Abstract => "abstract",
            Self::Native => "native",
            Self::Static => "static",
            Self::Synchronized => "synchronized",
            Self::Volatile => "volatile",
            Self::Strictfp => "strictfp",
            Self::Transient => "transient",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Modifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "protected" => Ok(Self::Protected),
            "private" => Ok(Self::Private),
            "final" => Ok(Self::Final),
            "abstract" => Ok(Self::Abstract),
            "native" => Ok(Self::Native),
            "static" => Ok(Self::Static),
            "synchronized" => Ok(Self::Synchronized),
            "volatile" => Ok(Self::Volatile),
            "strictfp" => Ok(Self::Strictfp),
            "transient" => Ok(Self::Transient),
            other => Err(format!("unknown Modifier: {other}")),
        }
    }
}

/// Unordered modifier set; iteration order is stable for storage.
pub type ModifierSet = BTreeSet<Modifier>;

// ── Span ──

/// 1-based source position of a declaration. Columns count characters; the
/// end column is the column of the last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

// ── Declaration record ──
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationRecord {
    pub source_file: String,
    pub package_name: String,
    pub parent_id: String,
    pub own_id: String,
    pub name: String,
    pub kind: DeclarationKind,
    pub type_name: String,
    pub is_array: bool,
    pub signature: Option<String>,
    pub modifiers: ModifierSet,
    pub is_loop_control_variable: bool,
    pub superclasses: Vec<String>,
    pub supertypes: Vec<String>,
    pub span: SourceSpan,
}

impl DeclarationRecord {
    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS
    }

    /// Parameter type tokens of a method or constructor signature, in
    /// declaration order. `None` for kinds without a signature.
    pub fn signature_parameters(&self) -> Option<Vec<&str>> {
        let signature = self.signature.as_deref()?;
        let inner = signature
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(signature);
        Some(
            inner
                .split(SIGNATURE_DELIMITER)
                .filter(|token| !token.is_empty())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_signature(signature: Option<&str>) -> DeclarationRecord {
        DeclarationRecord {
            source_file: "Foo.java".into(),
            package_name: "org.example".into(),
            parent_id: "p".into(),
            own_id: "o".into(),
            name: "run".into(),
            kind: DeclarationKind::Method,
            type_name: "void".into(),
            is_array: false,
            signature: signature.map(String::from),
            modifiers: ModifierSet::new(),
            is_loop_control_variable: false,
            superclasses: Vec::new(),
            supertypes: Vec::new(),
            span: SourceSpan {
                start_line: 1,
                start_column: 1,
                end_line: 1,
                end_column: 10,
            },
        }
    }

    #[test]
    fn kind_display_roundtrips_through_from_str() {
        for kind in [
            DeclarationKind::Class,
            DeclarationKind::NestedInterface,
            DeclarationKind::AnnotationMember,
            DeclarationKind::FormalArgument,
            DeclarationKind::Initializer,
        ] {
            assert_eq!(kind.to_string().parse::<DeclarationKind>().unwrap(), kind);
        }
        assert!("struct".parse::<DeclarationKind>().is_err());
    }

    #[test]
    fn modifier_parses_java_keywords() {
        assert_eq!("strictfp".parse::<Modifier>().unwrap(), Modifier::Strictfp);
        assert!("default".parse::<Modifier>().is_err());
    }

    #[test]
    fn containers_and_leaves_are_disjoint() {
        assert!(DeclarationKind::Initializer.is_container());
        assert!(DeclarationKind::EnumConstant.is_container());
        assert!(!DeclarationKind::Field.is_container());
        assert!(!DeclarationKind::Label.is_container());
    }

    #[test]
    fn signature_parameters_split_on_delimiter() {
        let record = record_with_signature(Some("(int;Map<String,Integer>;String...;)"));
        assert_eq!(
            record.signature_parameters().unwrap(),
            vec!["int", "Map<String,Integer>", "String..."]
        );

        let empty = record_with_signature(Some("()"));
        assert!(empty.signature_parameters().unwrap().is_empty());

        assert!(record_with_signature(None).signature_parameters().is_none());
    }
}
