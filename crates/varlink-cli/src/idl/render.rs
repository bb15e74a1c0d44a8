use unicode_width::UnicodeWidthStr;

use super::{InterfaceDescription, Member, MemberKind};
use crate::output::{Palette, Style};

/// Column budget for rendered descriptions.
pub(crate) const DESCRIPTION_WIDTH: usize = 70;

const FIELD_INDENT: &str = "  ";

/// Renders a description in canonical layout.
///
/// Documentation is re-wrapped to `width`. Declarations wider than `width`
/// place each top-level field of their signature on its own line.
pub(crate) fn render_description(
    description: &InterfaceDescription,
    width: usize,
    palette: Palette,
) -> String {
    let mut lines = Vec::new();
    push_doc(&mut lines, &description.doc, width, palette);
    lines.push(format!(
        "{} {}",
        palette.paint("interface", Style::Keyword),
        palette.paint(&description.name, Style::Name)
    ));
    for member in &description.members {
        lines.push(String::new());
        push_doc(&mut lines, &member.doc, width, palette);
        lines.push(render_member(member, width, palette));
    }
    let mut output = lines.join("\n");
    output.push('\n');
    output
}

fn push_doc(lines: &mut Vec<String>, doc: &[String], width: usize, palette: Palette) {
    let text_width = width.saturating_sub(2).max(1);
    for line in doc {
        if line.trim().is_empty() {
            lines.push(palette.paint("#", Style::Comment));
            continue;
        }
        for piece in textwrap::wrap(line, text_width) {
            lines.push(palette.paint(&format!("# {piece}"), Style::Comment));
        }
    }
}

fn render_member(member: &Member, width: usize, palette: Palette) -> String {
    let separator = match member.kind {
        MemberKind::Method => "",
        MemberKind::Type | MemberKind::Error => " ",
    };
    let keyword = member.kind.keyword();
    let plain = format!("{keyword} {}{separator}{}", member.name, member.signature);
    let signature = if plain.width() > width {
        break_signature(&member.signature)
    } else {
        member.signature.clone()
    };
    format!(
        "{} {}{separator}{signature}",
        palette.paint(keyword, Style::Keyword),
        palette.paint(&member.name, Style::Name)
    )
}

/// Puts each top-level field of every parenthesised group on its own line.
fn break_signature(signature: &str) -> String {
    let mut output = String::new();
    let mut depth = 0usize;
    let mut group_start = 0usize;
    for (index, character) in signature.char_indices() {
        match character {
            '(' => {
                if depth == 0 {
                    group_start = index + 1;
                }
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    output.push_str(&break_group(&signature[group_start..index]));
                }
            }
            other if depth == 0 => output.push(other),
            _ => {}
        }
    }
    output
}

fn break_group(inner: &str) -> String {
    let fields = split_fields(inner);
    if fields.is_empty() {
        return String::from("()");
    }
    let body = fields
        .iter()
        .map(|field| format!("{FIELD_INDENT}{field}"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("(\n{body}\n)")
}

fn split_fields(inner: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (index, character) in inner.char_indices() {
        match character {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                fields.push(inner[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    fields.push(inner[start..].trim());
    fields.retain(|field| !field.is_empty());
    fields
}
