// src/parser.rs

use crate::model::{LineRange, MethodDeclaration, ParsedSource};
use tree_sitter::{Node, Parser};

/// Turns a source blob into its grouping key and method boundaries.
/// Implementations must not fail: unrecognised input yields an empty result.
pub trait SourceParser {
    fn parse(&self, source: &str) -> ParsedSource;
}

/// Java declarations read from a tree-sitter syntax tree.
///
/// Finds the `package` clause and the first top-level type, then lists the
/// methods and constructors declared directly in that type's body. The
/// grouping key is the qualified type name.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaSourceParser;

const TYPE_DECLARATIONS: [&str; 4] = ["class_declaration", "interface_declaration", "enum_declaration", "record_declaration"];

impl SourceParser for JavaSourceParser {
    fn parse(&self, source: &str) -> ParsedSource {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_java::LANGUAGE.into()) {
            tracing::warn!(error = %e, "java grammar rejected by tree-sitter");
            return ParsedSource::default();
        }
        let Some(tree) = parser.parse(source, None) else {
            return ParsedSource::default();
        };
        let root = tree.root_node();

        let package = package_name(root, source).unwrap_or_default();
        let mut cursor = root.walk();
        let Some(primary) = root.children(&mut cursor).find(|n| TYPE_DECLARATIONS.contains(&n.kind())) else {
            return ParsedSource { package, methods: Vec::new() };
        };

        let type_name = primary.child_by_field_name("name").and_then(|n| text(n, source)).unwrap_or_default();
        let package = match (package.is_empty(), type_name.is_empty()) {
            (_, true) => package,
            (true, false) => type_name.to_string(),
            (false, false) => format!("{package}.{type_name}"),
        };

        let methods = members(primary).into_iter().filter_map(|node| method(node, source)).collect();
        ParsedSource { package, methods }
    }
}

fn text<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    node.utf8_text(source.as_bytes()).ok()
}

fn package_name(root: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = root.walk();
    let declaration = root.children(&mut cursor).find(|n| n.kind() == "package_declaration")?;
    let mut cursor = declaration.walk();
    let name = declaration.named_children(&mut cursor).find(|n| matches!(n.kind(), "identifier" | "scoped_identifier"))?;
    Some(text(name, source)?.split_whitespace().collect())
}

fn is_member_method(node: &Node<'_>) -> bool {
    matches!(node.kind(), "method_declaration" | "constructor_declaration")
}

/// Methods and constructors directly inside the type body. Enum members sit
/// one level down, after the constants.
fn members(type_decl: Node<'_>) -> Vec<Node<'_>> {
    let mut members = Vec::new();
    let Some(body) = type_decl.child_by_field_name("body") else {
        return members;
    };

    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() == "enum_body_declarations" {
            let mut inner = child.walk();
            members.extend(child.named_children(&mut inner).filter(is_member_method));
        } else if is_member_method(&child) {
            members.push(child);
        }
    }

    members
}

/// Range runs from the first line of the declaration (annotations included)
/// to its closing brace, or to the `;` of a bodiless method.
fn method(node: Node<'_>, source: &str) -> Option<MethodDeclaration> {
    let name = text(node.child_by_field_name("name")?, source).filter(|n| !n.is_empty())?;
    let params = node.child_by_field_name("parameters").map(|p| parameter_types(p, source)).unwrap_or_default();

    let start = node.start_position().row + 1;
    let end = node.end_position().row + 1;
    Some(MethodDeclaration {
        signature: format!("{name}({})", params.join(", ")),
        range: LineRange::new(start, end.saturating_sub(start)),
    })
}

/// `final Map<K, V> entries` becomes `Map`, `long stamps[]` becomes `long[]`
/// and `String... args` keeps its `...`.
fn parameter_types(params: Node<'_>, source: &str) -> Vec<String> {
    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .filter_map(|param| match param.kind() {
            "formal_parameter" => {
                let ty = simplify_type(text(param.child_by_field_name("type")?, source)?);
                let dims = param.child_by_field_name("dimensions").and_then(|d| text(d, source)).map(simplify_type);
                Some(ty + &dims.unwrap_or_default())
            }
            "spread_parameter" => {
                let mut inner = param.walk();
                let ty = param.named_children(&mut inner).find(|n| !matches!(n.kind(), "modifiers" | "variable_declarator"))?;
                Some(format!("{}...", simplify_type(text(ty, source)?)))
            }
            _ => None,
        })
        .collect()
}

/// Drops generic arguments and whitespace from a type as written.
fn simplify_type(written: &str) -> String {
    let mut out = String::with_capacity(written.len());
    let mut generics = 0usize;
    for c in written.chars() {
        match c {
            '<' => generics += 1,
            '>' => generics = generics.saturating_sub(1),
            c if generics == 0 && !c.is_whitespace() => out.push(c),
            _ => {}
        }
    }
    out
}
