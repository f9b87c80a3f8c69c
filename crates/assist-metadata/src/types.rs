//! Parsed form of the metadata `type` strings (`java.util.Map<String,Integer>`).

use std::fmt;

/// What a property's declared type means for completion: whether the node
/// takes a map key, a list index, or is a plain value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TypeDescriptor {
    #[default]
    Unknown,
    Scalar(String),
    Collection {
        raw: String,
        element: Box<TypeDescriptor>,
    },
    Map {
        raw: String,
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    Class(String),
}

const COLLECTION_TYPES: &[&str] = &[
    "java.util.List",
    "java.util.ArrayList",
    "java.util.LinkedList",
    "java.util.Set",
    "java.util.HashSet",
    "java.util.LinkedHashSet",
    "java.util.SortedSet",
    "java.util.TreeSet",
    "java.util.Collection",
    "java.lang.Iterable",
];

const MAP_TYPES: &[&str] = &[
    "java.util.Map",
    "java.util.HashMap",
    "java.util.LinkedHashMap",
    "java.util.SortedMap",
    "java.util.TreeMap",
    "java.util.concurrent.ConcurrentMap",
    "java.util.concurrent.ConcurrentHashMap",
];

const SCALAR_TYPES: &[&str] = &[
    "boolean",
    "byte",
    "short",
    "int",
    "long",
    "float",
    "double",
    "char",
    "java.lang.Boolean",
    "java.lang.Byte",
    "java.lang.Short",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Float",
    "java.lang.Double",
    "java.lang.Character",
    "java.lang.String",
    "java.lang.Class",
    "java.math.BigDecimal",
    "java.math.BigInteger",
    "java.nio.charset.Charset",
    "java.util.Locale",
    "java.util.UUID",
    "java.util.regex.Pattern",
    "java.time.Duration",
    "java.time.Period",
    "java.net.URI",
    "java.net.URL",
    "java.net.InetAddress",
    "java.io.File",
    "java.nio.file.Path",
    "org.springframework.util.unit.DataSize",
    "org.springframework.core.io.Resource",
    "org.springframework.util.MimeType",
    "org.springframework.http.MediaType",
];

impl TypeDescriptor {
    pub fn parse(raw: &str) -> TypeDescriptor {
        let raw = raw.trim();
        if raw.is_empty() {
            return TypeDescriptor::Unknown;
        }

        if let Some(element) = raw.strip_suffix("[]") {
            return TypeDescriptor::Collection {
                raw: raw.to_string(),
                element: Box::new(TypeDescriptor::parse(element)),
            };
        }

        let (base, args) = split_generics(raw);

        if COLLECTION_TYPES.contains(&base) {
            let element = args.first().map_or(TypeDescriptor::Unknown, |arg| Self::parse(arg));
            return TypeDescriptor::Collection {
                raw: raw.to_string(),
                element: Box::new(element),
            };
        }

        if base == "java.util.Properties" {
            let string = || Box::new(TypeDescriptor::Scalar("java.lang.String".to_string()));
            return TypeDescriptor::Map {
                raw: raw.to_string(),
                key: string(),
                value: string(),
            };
        }

        if MAP_TYPES.contains(&base) {
            let arg = |idx: usize| {
                Box::new(
                    args.get(idx)
                        .map_or(TypeDescriptor::Unknown, |arg| Self::parse(arg)),
                )
            };
            return TypeDescriptor::Map {
                raw: raw.to_string(),
                key: arg(0),
                value: arg(1),
            };
        }

        if SCALAR_TYPES.contains(&base) {
            return TypeDescriptor::Scalar(raw.to_string());
        }

        TypeDescriptor::Class(raw.to_string())
    }

    /// The type string as declared in metadata; empty for [`TypeDescriptor::Unknown`].
    pub fn raw(&self) -> &str {
        match self {
            TypeDescriptor::Unknown => "",
            TypeDescriptor::Scalar(raw) | TypeDescriptor::Class(raw) => raw,
            TypeDescriptor::Collection { raw, .. } | TypeDescriptor::Map { raw, .. } => raw,
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, TypeDescriptor::Map { .. })
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TypeDescriptor::Collection { .. })
    }

    /// Type of an element (collections) or value (maps).
    pub fn value_type(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Collection { element, .. } => Some(element),
            TypeDescriptor::Map { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

/// Split `Base<A,B<C,D>>` into `Base` and its top-level arguments.
fn split_generics(raw: &str) -> (&str, Vec<&str>) {
    let Some(open) = raw.find('<') else {
        return (raw, Vec::new());
    };
    let Some(close) = raw.rfind('>').filter(|&close| close > open) else {
        return (raw, Vec::new());
    };

    let inner = &raw[open + 1..close];
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());

    (raw[..open].trim(), args)
}
