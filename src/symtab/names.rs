//! Splitting qualified names into `::` components, and the sorted
//! component index used for name and completion lookups.

use core::ops::Range;

const ANONYMOUS_NAMESPACE: &str = "(anonymous namespace)";

/// Skip the operator symbol after an `operator` keyword that starts at
/// `start`, returning the index just past it.
fn skip_operator(name: &[u8], start: usize) -> Option<usize> {
    const KEYWORD: &[u8] = b"operator";
    if !name[start..].starts_with(KEYWORD) {
        return None;
    }
    if start > 0 && (name[start - 1].is_ascii_alphanumeric() || name[start - 1] == b'_') {
        return None;
    }
    let mut i = start + KEYWORD.len();
    match name.get(i) {
        Some(c) if c.is_ascii_alphanumeric() || *c == b'_' => return None,
        _ => {}
    }
    while name.get(i) == Some(&b' ') {
        i += 1;
    }
    if name[i..].starts_with(b"()") || name[i..].starts_with(b"[]") {
        return Some(i + 2);
    }
    while let Some(c) = name.get(i) {
        if b"<>=!+-*/%&|^~,".contains(c) {
            i += 1;
        } else {
            break;
        }
    }
    Some(i)
}

/// Scan `name` from `start` and call `visit` at each top-level byte.
///
/// Bytes inside template arguments and parameter lists are not visited.
/// Returns early with the value `visit` returns, if any.
fn scan_top_level<T>(
    name: &str,
    start: usize,
    mut visit: impl FnMut(usize, &[u8]) -> Option<T>,
) -> Option<T> {
    let bytes = name.as_bytes();
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        if bytes[i..].starts_with(ANONYMOUS_NAMESPACE.as_bytes()) {
            i += ANONYMOUS_NAMESPACE.len();
            continue;
        }
        if let Some(end) = skip_operator(bytes, i) {
            i = end;
            continue;
        }
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' | b')' | b']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => {
                if let Some(found) = visit(i, bytes) {
                    return Some(found);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Return the length of the first component of `name`, which ends at the
/// first top-level `::` or at the end of the name.
///
/// ```
/// use dwarf_dies::symtab::find_first_component;
///
/// assert_eq!(find_first_component("std::vector<int>::size"), 3);
/// assert_eq!(find_first_component("A<B::C>::d"), 7);
/// ```
pub fn find_first_component(name: &str) -> usize {
    scan_top_level(name, 0, |i, bytes| bytes[i..].starts_with(b"::").then_some(i))
        .unwrap_or(name.len())
}

/// Split `name` at each top-level `::`.
pub fn split_name(name: &str) -> Vec<&str> {
    let mut components = Vec::new();
    let mut start = 0;
    loop {
        let len = find_first_component(&name[start..]);
        components.push(&name[start..start + len]);
        start += len;
        if start >= name.len() {
            break;
        }
        start += 2;
    }
    components
}

/// The start of the last component of `name`, or `None` if it has only
/// one component.
pub fn last_component_start(name: &str) -> Option<usize> {
    let mut last = None;
    let mut start = 0;
    loop {
        let len = find_first_component(&name[start..]);
        start += len;
        if start >= name.len() {
            return last;
        }
        start += 2;
        last = Some(start);
    }
}

/// Remove the parameter list, and anything after it, from a demangled
/// function name.
pub fn strip_parameters(name: &str) -> &str {
    // The parameter list is the first top-level '(' outside of operator
    // names. `scan_top_level` never visits brackets, so track depth here.
    let bytes = name.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(ANONYMOUS_NAMESPACE.as_bytes()) {
            i += ANONYMOUS_NAMESPACE.len();
            continue;
        }
        if let Some(end) = skip_operator(bytes, i) {
            i = end;
            continue;
        }
        match bytes[i] {
            b'(' if depth == 0 => return name[..i].trim_end(),
            b'<' | b'(' | b'[' => depth += 1,
            b'>' | b')' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    name
}

/// One searchable suffix of an indexed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NameComponent {
    /// The index of the name in the symbol table.
    idx: u32,
    /// Where the component starts within that name.
    name_offset: u32,
}

/// An index of every `::` component of a set of qualified names.
///
/// Looking up `bar` finds both `bar` and `foo::bar`: each name is entered
/// once per component, sorted by the name's text from that component on.
#[derive(Debug, Clone, Default)]
pub struct NameComponents {
    names: Vec<String>,
    components: Vec<NameComponent>,
}

impl NameComponents {
    /// Build the index. The symbol index of each name is its position.
    pub fn new(names: Vec<String>) -> Self {
        let mut components = Vec::new();
        for (idx, name) in names.iter().enumerate() {
            let mut start = 0;
            loop {
                components.push(NameComponent {
                    idx: idx as u32,
                    name_offset: start as u32,
                });
                let len = find_first_component(&name[start..]);
                start += len;
                if start >= name.len() {
                    break;
                }
                start += 2;
            }
        }
        let mut index = NameComponents { names, components };
        let mut components = core::mem::take(&mut index.components);
        components.sort_by(|a, b| index.suffix(*a).cmp(index.suffix(*b)));
        index.components = components;
        tracing::trace!(
            names = index.names.len(),
            components = index.components.len(),
            "built name component index"
        );
        index
    }

    fn suffix(&self, component: NameComponent) -> &str {
        &self.names[component.idx as usize][component.name_offset as usize..]
    }

    /// The name with the given symbol index.
    pub fn name(&self, idx: u32) -> Option<&str> {
        self.names.get(idx as usize).map(String::as_str)
    }

    /// The number of indexed names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Find the range of components whose text starts with `lookup`.
    ///
    /// For a completion lookup every component in the range matches. A full
    /// lookup only matches the ones equal to `lookup`, or equal to it
    /// followed by a parameter list.
    pub fn find_name_components_bounds(&self, lookup: &str) -> Range<usize> {
        let lower = self
            .components
            .partition_point(|c| self.suffix(*c) < lookup);
        let upper = lower
            + self.components[lower..].partition_point(|c| self.suffix(*c).starts_with(lookup));
        lower..upper
    }

    /// Call `on_match` once for each symbol index with a matching
    /// component, in increasing index order.
    ///
    /// Stops and returns false as soon as `on_match` returns false.
    pub fn expand_symtabs_matching_symbol<F>(
        &self,
        lookup: &str,
        completion: bool,
        mut on_match: F,
    ) -> bool
    where
        F: FnMut(u32) -> bool,
    {
        let bounds = self.find_name_components_bounds(lookup);
        let mut matches: Vec<u32> = self.components[bounds]
            .iter()
            .filter(|c| completion || is_full_match(self.suffix(**c), lookup))
            .map(|c| c.idx)
            .collect();
        // A name can match through several of its components.
        matches.sort_unstable();
        matches.dedup();
        matches.into_iter().all(|idx| on_match(idx))
    }
}

fn is_full_match(suffix: &str, lookup: &str) -> bool {
    match suffix.strip_prefix(lookup) {
        Some(rest) => rest.is_empty() || rest.starts_with('('),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        assert_eq!(split_name("a::b<c::d>::e"), vec!["a", "b<c::d>", "e"]);
        assert_eq!(split_name("main"), vec!["main"]);
        assert_eq!(
            split_name("(anonymous namespace)::f"),
            vec!["(anonymous namespace)", "f"]
        );
        assert_eq!(split_name("A::operator<"), vec!["A", "operator<"]);
        assert_eq!(split_name("A::operator<<(int)"), vec!["A", "operator<<(int)"]);
        assert_eq!(last_component_start("a::b::c"), Some(6));
        assert_eq!(last_component_start("f(a::b)"), None);
        assert_eq!(last_component_start("plain"), None);
    }

    #[test]
    fn test_strip_parameters() {
        assert_eq!(strip_parameters("ns::Foo::bar()"), "ns::Foo::bar");
        assert_eq!(strip_parameters("f(int, char) const"), "f");
        assert_eq!(strip_parameters("A::operator()(int)"), "A::operator()");
        assert_eq!(strip_parameters("g<void (*)(int)>(int)"), "g<void (*)(int)>");
        assert_eq!(strip_parameters("(anonymous namespace)::h()"), "(anonymous namespace)::h");
        assert_eq!(strip_parameters("plain"), "plain");
    }

    fn symbols() -> NameComponents {
        let names = [
            "function",
            "std::bar",
            "std::zfunction",
            "std::zfunction2",
            "w1::w2",
            "ns::foo<char*>",
            "ns::foo<int>",
            "ns::foo<long>",
            "ns2::tmpl<int>::foo2",
            "(anonymous namespace)::A::B::C",
            "ns2::tmpl<int>::operator()(int)",
        ];
        NameComponents::new(names.iter().map(|s| s.to_string()).collect())
    }

    fn matches(index: &NameComponents, lookup: &str, completion: bool) -> Vec<String> {
        let mut out = Vec::new();
        index.expand_symtabs_matching_symbol(lookup, completion, |idx| {
            out.push(index.name(idx).unwrap().to_string());
            true
        });
        out
    }

    #[test]
    fn test_completion_reports_each_symbol_once() {
        let index = symbols();
        assert_eq!(matches(&index, "w", true), vec!["w1::w2"]);
        assert_eq!(
            matches(&index, "std::zfunction", true),
            vec!["std::zfunction", "std::zfunction2"]
        );
        assert_eq!(
            matches(&index, "z", true),
            vec!["std::zfunction", "std::zfunction2"]
        );
        assert!(matches(&index, "nothing", true).is_empty());
    }

    #[test]
    fn test_full_lookup() {
        let index = symbols();
        assert_eq!(matches(&index, "std::zfunction", false), vec!["std::zfunction"]);
        assert_eq!(matches(&index, "w2", false), vec!["w1::w2"]);
        assert_eq!(matches(&index, "C", false), vec!["(anonymous namespace)::A::B::C"]);
        assert_eq!(
            matches(&index, "tmpl<int>::operator()", false),
            vec!["ns2::tmpl<int>::operator()(int)"]
        );
        assert!(matches(&index, "w", false).is_empty());
    }

    #[test]
    fn test_stop_early() {
        let index = symbols();
        let mut seen = 0;
        let done = index.expand_symtabs_matching_symbol("ns::foo", true, |_| {
            seen += 1;
            false
        });
        assert!(!done);
        assert_eq!(seen, 1);
    }
}
