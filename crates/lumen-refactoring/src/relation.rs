//! Package relation resolver over fully-qualified dotted names.

/// How two packages relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageRelation {
    /// Same fully-qualified name.
    SamePackage,
    /// The first package is a dotted-boundary ancestor of the second.
    Child,
    /// The first package is a descendant of the second.
    Parent,
    /// Distinct packages sharing the leading segment.
    SameModule,
    /// Nothing in common; different modules.
    DiffModule,
}

fn is_dotted_prefix(prefix: &str, full: &str) -> bool {
    full.len() > prefix.len()
        && full.starts_with(prefix)
        && full.as_bytes()[prefix.len()] == b'.'
}

fn root_segment(pkg: &str) -> &str {
    pkg.split('.').next().unwrap_or(pkg)
}

/// Relates `a` to `b`.
///
/// Comparison is string-based with a dot boundary check: `a.b` is an
/// ancestor of `a.b.c` but not of `a.bc`.
pub fn package_relation(a: &str, b: &str) -> PackageRelation {
    if a == b {
        return PackageRelation::SamePackage;
    }
    if is_dotted_prefix(a, b) {
        return PackageRelation::Child;
    }
    if is_dotted_prefix(b, a) {
        return PackageRelation::Parent;
    }
    if root_segment(a) == root_segment(b) {
        PackageRelation::SameModule
    } else {
        PackageRelation::DiffModule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_package() {
        assert_eq!(package_relation("a.b", "a.b"), PackageRelation::SamePackage);
    }

    #[test]
    fn test_ancestor_is_child_relation() {
        assert_eq!(package_relation("a.b", "a.b.c"), PackageRelation::Child);
        assert_eq!(package_relation("a", "a.b.c"), PackageRelation::Child);
    }

    #[test]
    fn test_descendant_is_parent_relation() {
        assert_eq!(package_relation("a.b.c", "a.b"), PackageRelation::Parent);
    }

    #[test]
    fn test_dot_boundary() {
        // `a.b` is not an ancestor of `a.bc`
        assert_eq!(package_relation("a.b", "a.bc"), PackageRelation::SameModule);
        assert_eq!(package_relation("a.bc", "a.b"), PackageRelation::SameModule);
    }

    #[test]
    fn test_same_module() {
        assert_eq!(package_relation("a.b", "a.c"), PackageRelation::SameModule);
        assert_eq!(package_relation("a.b.x", "a.c.y"), PackageRelation::SameModule);
    }

    #[test]
    fn test_diff_module() {
        assert_eq!(package_relation("a.b", "z.b"), PackageRelation::DiffModule);
    }
}
