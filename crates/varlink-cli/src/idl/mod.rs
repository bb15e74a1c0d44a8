//! Interface description language handling for `varlink help`.
//!
//! Services describe themselves in a small IDL: an `interface` line followed
//! by `type`, `method` and `error` members, each optionally preceded by `#`
//! documentation comments. The parser keeps only what the renderer needs.

mod parser;
mod render;

pub(crate) use parser::parse_description;
pub(crate) use render::{DESCRIPTION_WIDTH, render_description};

/// A parsed interface description.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct InterfaceDescription {
    pub(crate) doc: Vec<String>,
    pub(crate) name: String,
    pub(crate) members: Vec<Member>,
}

impl InterfaceDescription {
    /// Names of the methods the interface declares, in declaration order.
    pub(crate) fn method_names(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(|member| member.kind == MemberKind::Method)
            .map(|member| member.name.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MemberKind {
    Type,
    Method,
    Error,
}

impl MemberKind {
    pub(crate) const fn keyword(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Method => "method",
            Self::Error => "error",
        }
    }
}

/// One declaration inside an interface.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Member {
    pub(crate) doc: Vec<String>,
    pub(crate) kind: MemberKind,
    pub(crate) name: String,
    /// Normalised signature text such as `(a: string) -> (b: int)`.
    pub(crate) signature: String,
}
