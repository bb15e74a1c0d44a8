use thiserror::Error;

use super::{InterfaceDescription, Member, MemberKind};

#[derive(Debug, Error, Eq, PartialEq)]
pub(crate) enum DescriptionError {
    #[error("description does not start with an interface declaration")]
    MissingInterface,
    #[error("description declares more than one interface")]
    DuplicateInterface,
    #[error("unexpected text outside a declaration: '{0}'")]
    StrayText(String),
    #[error("unbalanced parentheses in '{0}'")]
    Unbalanced(String),
    #[error("declaration '{0}' has no name")]
    MissingName(String),
}

struct Declaration {
    doc: Vec<String>,
    text: String,
}

/// Parses interface description text.
pub(crate) fn parse_description(text: &str) -> Result<InterfaceDescription, DescriptionError> {
    let declarations = split_declarations(text)?;
    let mut declarations = declarations.into_iter();
    let first = declarations
        .next()
        .ok_or(DescriptionError::MissingInterface)?;
    let name = first
        .text
        .strip_prefix("interface")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(DescriptionError::MissingInterface)?;

    let mut members = Vec::new();
    for declaration in declarations {
        members.push(parse_member(declaration)?);
    }
    Ok(InterfaceDescription {
        doc: first.doc,
        name: name.to_owned(),
        members,
    })
}

/// Groups lines into declarations, attaching preceding comments as docs.
fn split_declarations(text: &str) -> Result<Vec<Declaration>, DescriptionError> {
    let mut declarations: Vec<Declaration> = Vec::new();
    let mut doc = Vec::new();
    let mut depth = 0usize;

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(comment) = trimmed.strip_prefix('#') {
            // Field comments inside a signature are not rendered.
            if depth == 0 {
                doc.push(comment.strip_prefix(' ').unwrap_or(comment).to_owned());
            }
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }

        if depth == 0 && starts_declaration(trimmed) {
            declarations.push(Declaration {
                doc: std::mem::take(&mut doc),
                text: trimmed.to_owned(),
            });
        } else {
            let current = declarations
                .last_mut()
                .filter(|_| depth > 0)
                .ok_or_else(|| DescriptionError::StrayText(trimmed.to_owned()))?;
            current.text.push(' ');
            current.text.push_str(trimmed);
        }

        for character in trimmed.chars() {
            match character {
                '(' => depth += 1,
                ')' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| DescriptionError::Unbalanced(trimmed.to_owned()))?;
                }
                _ => {}
            }
        }
    }

    if depth != 0 {
        let last = declarations
            .last()
            .map(|declaration| declaration.text.clone())
            .unwrap_or_default();
        return Err(DescriptionError::Unbalanced(last));
    }
    if declarations
        .iter()
        .skip(1)
        .any(|declaration| keyword_of(&declaration.text) == Some("interface"))
    {
        return Err(DescriptionError::DuplicateInterface);
    }
    Ok(declarations)
}

fn keyword_of(text: &str) -> Option<&str> {
    let keyword = text.split_whitespace().next()?;
    ["interface", "type", "method", "error"]
        .into_iter()
        .find(|candidate| *candidate == keyword)
}

fn starts_declaration(text: &str) -> bool {
    keyword_of(text).is_some()
}

fn parse_member(declaration: Declaration) -> Result<Member, DescriptionError> {
    let Declaration { doc, text } = declaration;
    let (kind, rest) = match keyword_of(&text) {
        Some("type") => (MemberKind::Type, &text["type".len()..]),
        Some("method") => (MemberKind::Method, &text["method".len()..]),
        Some("error") => (MemberKind::Error, &text["error".len()..]),
        _ => return Err(DescriptionError::StrayText(text.clone())),
    };
    let rest = rest.trim_start();
    let name_end = rest
        .find(|character: char| !(character.is_ascii_alphanumeric() || character == '_'))
        .unwrap_or(rest.len());
    if name_end == 0 {
        return Err(DescriptionError::MissingName(text.clone()));
    }
    Ok(Member {
        doc,
        kind,
        name: rest[..name_end].to_owned(),
        signature: normalise_signature(&rest[name_end..]),
    })
}

/// Collapses whitespace and spaces punctuation uniformly.
fn normalise_signature(text: &str) -> String {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut output = String::with_capacity(compact.len() * 2);
    let mut characters = compact.chars().peekable();
    while let Some(character) = characters.next() {
        match character {
            ',' => output.push_str(", "),
            ':' => output.push_str(": "),
            '-' if characters.peek() == Some(&'>') => {
                characters.next();
                output.push_str(" -> ");
            }
            other => output.push(other),
        }
    }
    output
}
