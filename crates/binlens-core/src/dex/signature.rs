//! Type descriptor and method signature formatting.
//!
//! Method listings are built from the shorty descriptor: one character per
//! type, return type first. Shorties do not say which class a reference is,
//! so parameters of reference type print as a placeholder while the return
//! type uses the full declared name when the caller has it.

/// Placeholder for a reference type whose class is not known
pub const OBJECT_PLACEHOLDER: &str = "Object";
/// Placeholder for an array type whose element type is not known
pub const ARRAY_PLACEHOLDER: &str = "Array";
/// Name for any unrecognized descriptor character
pub const UNKNOWN_TYPE: &str = "unknown";

/// Display name of a single shorty character
pub fn shorty_type_name(code: char) -> &'static str {
    match code {
        'V' => "void",
        'Z' => "boolean",
        'B' => "byte",
        'S' => "short",
        'C' => "char",
        'I' => "int",
        'J' => "long",
        'F' => "float",
        'D' => "double",
        'L' => OBJECT_PLACEHOLDER,
        '[' => ARRAY_PLACEHOLDER,
        _ => UNKNOWN_TYPE,
    }
}

/// Formats `<return> <name>(<param>, ...)` from a shorty.
///
/// `return_type` is the display name of the declared return type; it replaces
/// the placeholder when the return position is a reference or array. An empty
/// shorty has an `unknown` return type and no parameters.
pub fn format_signature(shorty: &str, name: &str, return_type: Option<&str>) -> String {
    let mut codes = shorty.chars();
    let return_name = match codes.next() {
        Some(code @ ('L' | '[')) => return_type.unwrap_or(shorty_type_name(code)),
        Some(code) => shorty_type_name(code),
        None => UNKNOWN_TYPE,
    };
    let params: Vec<&str> = codes.map(shorty_type_name).collect();
    format!("{} {}({})", return_name, name, params.join(", "))
}

/// Converts a full type descriptor to its display form. Classes keep their
/// slash-separated internal name: `Ljava/lang/String;` becomes
/// `java/lang/String`, `[[I` becomes `int[][]`. Malformed descriptors are
/// returned unchanged.
pub fn internal_type_name(descriptor: &str) -> String {
    let dimensions = descriptor.chars().take_while(|&c| c == '[').count();
    let element = &descriptor[dimensions..];

    let base = match element.chars().next() {
        Some('L') if element.len() > 2 && element.ends_with(';') => {
            element[1..element.len() - 1].to_string()
        }
        Some(code @ ('V' | 'Z' | 'B' | 'S' | 'C' | 'I' | 'J' | 'F' | 'D')) if element.len() == 1 => {
            shorty_type_name(code).to_string()
        }
        _ => return descriptor.to_string(),
    };

    let mut name = base;
    for _ in 0..dimensions {
        name.push_str("[]");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_signatures() {
        assert_eq!(format_signature("V", "foo", None), "void foo()");
        assert_eq!(format_signature("ZI", "bar", None), "boolean bar(int)");
        assert_eq!(
            format_signature("VJFD", "baz", None),
            "void baz(long, float, double)"
        );
    }

    #[test]
    fn test_reference_types() {
        assert_eq!(format_signature("LL", "id", None), "Object id(Object)");
        assert_eq!(
            format_signature("LL", "id", Some("java/lang/String")),
            "java/lang/String id(Object)"
        );
        assert_eq!(format_signature("[[", "copy", None), "Array copy(Array)");
        assert_eq!(format_signature("[I", "range", Some("int[]")), "int[] range(int)");
    }

    #[test]
    fn test_fixed_table() {
        let table = [
            ('V', "void"),
            ('Z', "boolean"),
            ('B', "byte"),
            ('S', "short"),
            ('C', "char"),
            ('I', "int"),
            ('J', "long"),
            ('F', "float"),
            ('D', "double"),
            ('L', "Object"),
            ('[', "Array"),
        ];
        for (code, name) in table {
            assert_eq!(shorty_type_name(code), name);
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(shorty_type_name('Q'), "unknown");
        assert_eq!(format_signature("QX", "odd", None), "unknown odd(unknown)");
        assert_eq!(format_signature("", "empty", None), "unknown empty()");
        // The return type name is only used for reference returns
        assert_eq!(format_signature("I", "n", Some("java/lang/String")), "int n()");
    }

    #[test]
    fn test_internal_type_name() {
        assert_eq!(internal_type_name("Ljava/lang/String;"), "java/lang/String");
        assert_eq!(
            internal_type_name("Lcom/devoteam/quickaction/QuickActionItem;"),
            "com/devoteam/quickaction/QuickActionItem"
        );
        assert_eq!(internal_type_name("I"), "int");
        assert_eq!(internal_type_name("[[I"), "int[][]");
        assert_eq!(internal_type_name("[Lcom/example/Foo;"), "com/example/Foo[]");
        assert_eq!(internal_type_name("LFoo;"), "Foo");
        assert_eq!(internal_type_name("Lbroken"), "Lbroken");
        assert_eq!(internal_type_name(""), "");
    }
}
