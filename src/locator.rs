// src/locator.rs

use crate::model::MethodDeclaration;

/// The signature of the method enclosing `line`, if any.
///
/// Declarations are scanned in parse order and the first whose range contains
/// the line wins, so overlapping ranges resolve to the earlier declaration.
pub fn locate(declarations: &[MethodDeclaration], line: usize) -> Option<&str> {
    declarations
        .iter()
        .find(|decl| decl.range.contains(line))
        .map(|decl| decl.signature.as_str())
}
