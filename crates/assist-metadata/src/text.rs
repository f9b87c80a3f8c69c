//! Display helpers for type names and descriptions shown next to suggestions.

use std::sync::OnceLock;

use regex::Regex;

use crate::node::{NodeKind, SuggestionNode};

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "short", "int", "long", "float", "double", "char", "void",
];

/// `java.lang.String` -> `String`, `java.util.concurrent.TimeUnit` -> `TimeUnit`.
/// Types from other packages are left alone.
pub fn shorten_frequent_java_type(ty: &str) -> String {
    if PRIMITIVES.contains(&ty) {
        return ty.to_string();
    }
    let ty = trim_java_package(ty, "java.lang");
    let ty = trim_java_package(ty, "java.util");
    let ty = trim_java_package(ty, "java.util.concurrent");
    ty.to_string()
}

/// Strips `package.` only when `ty` lives directly in that package.
pub fn trim_java_package<'a>(ty: &'a str, package: &str) -> &'a str {
    match ty
        .strip_prefix(package)
        .and_then(|rest| rest.strip_prefix('.'))
    {
        Some(simple) if !simple.contains('.') => simple,
        _ => ty,
    }
}

/// Drops every `<...>` section, including nested ones.
pub fn remove_generics(ty: &str) -> String {
    let mut out = String::with_capacity(ty.len());
    let mut depth = 0usize;
    for c in ty.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Removes all package qualifiers, including those inside generic arguments.
pub fn shortened_type(ty: &str) -> String {
    static PACKAGE_RE: OnceLock<Regex> = OnceLock::new();
    let re = PACKAGE_RE.get_or_init(|| Regex::new(r"[a-zA-Z_][a-zA-Z_0-9]*\.").expect("valid regex"));
    re.replace_all(ty, "").into_owned()
}

/// Nested classes are written `Outer$Inner` in metadata but `Outer.Inner` in docs.
pub fn type_for_documentation_navigation(ty: &str) -> String {
    ty.replace('$', ".")
}

/// `com.example.Foo.bar(java.lang.String)` -> `com.example.Foo#bar`.
pub fn method_for_documentation_navigation(type_and_method: &str) -> String {
    static METHOD_RE: OnceLock<Regex> = OnceLock::new();
    let re = METHOD_RE.get_or_init(|| Regex::new(r"(.+)\.(.+)\(.*\)").expect("valid regex"));
    let ty = type_for_documentation_navigation(type_and_method);
    re.replace_all(&ty, "$1#$2").into_owned()
}

/// Where `node` is declared, as a documentation link target: `Type#method`
/// for groups bound through a factory method, otherwise the declaring type.
pub fn documentation_target(node: &SuggestionNode) -> Option<String> {
    if let Some(group) = node.group() {
        if let (Some(ty), Some(method)) = (&group.source_type, &group.source_method) {
            return Some(method_for_documentation_navigation(&format!("{ty}.{method}")));
        }
        if let Some(ty) = &group.source_type {
            return Some(type_for_documentation_navigation(ty));
        }
    }
    let ty = node.property()?.source_type.as_deref()?;
    Some(type_for_documentation_navigation(ty))
}

/// Erased type with common packages dropped: `java.util.Map<K,V>` -> `Map`.
pub fn base_type(ty: &str) -> String {
    shorten_frequent_java_type(&remove_generics(ty))
}

/// First sentence of a description, without its trailing period and with
/// newlines removed. A period ends a sentence only before whitespace that is
/// followed by an upper-case letter, or at the end of the text.
pub fn first_sentence_without_dot(text: &str) -> String {
    let mut sentence = text;
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    for (i, &(offset, c)) in chars.iter().enumerate() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let mut rest = chars[i + 1..].iter().map(|&(_, c)| c);
        match rest.next() {
            None => break,
            Some(ws) if ws.is_whitespace() => {
                if rest
                    .find(|c| !c.is_whitespace())
                    .map_or(true, char::is_uppercase)
                {
                    sentence = &text[..offset + c.len_utf8()];
                    break;
                }
            }
            Some(_) => {}
        }
    }

    let sentence = sentence.trim();
    let sentence = sentence.strip_suffix('.').unwrap_or(sentence);
    sentence.replace('\n', "")
}

/// Renders a resolved chain as a dotted name, starting at `start`. Indexed
/// wildcards render as `[*]`, map keys as `*`.
pub fn dot_delimited_original_names(chain: &[&SuggestionNode], start: usize) -> String {
    let mut out = String::new();
    for node in chain.iter().skip(start) {
        if node.kind() != NodeKind::Indexed && !out.is_empty() {
            out.push('.');
        }
        out.push_str(node.original_name());
    }
    out
}
