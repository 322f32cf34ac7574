/// Substitute `%name%` placeholders in a URL template.
///
/// ```
/// use packmirror_registry::render;
///
/// let url = render("/p/%package%$%hash%.json", &[("package", "acme/widget"), ("hash", "ab12")]);
/// assert_eq!(url, "/p/acme/widget$ab12.json");
/// ```
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("%{key}%"), value)
    })
}

/// Base URL of the upstream registry. Document paths taken from registry
/// documents are relative to it unless they are already absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryBase {
    base: String,
}

impl RegistryBase {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn as_str(&self) -> &str { &self.base }

    /// `<base>/packages.json`
    pub fn root_url(&self) -> String { self.resolve("/packages.json") }

    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        assert_eq!(
            render("/dists/%package%/%reference%.%type%", &[
                ("package", "acme/widget"),
                ("reference", "abc123"),
                ("type", "zip"),
            ]),
            "/dists/acme/widget/abc123.zip"
        );
        assert_eq!(render("%a%-%a%", &[("a", "x")]), "x-x");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("/p/%package%$%hash%.json", &[("package", "a/b")]), "/p/a/b$%hash%.json");
    }

    #[test]
    fn test_resolve() {
        let base = RegistryBase::new("https://repo.packagist.org/");
        assert_eq!(base.as_str(), "https://repo.packagist.org");
        assert_eq!(base.root_url(), "https://repo.packagist.org/packages.json");
        assert_eq!(base.resolve("/p2/a/b.json"), "https://repo.packagist.org/p2/a/b.json");
        assert_eq!(base.resolve("p2/a/b.json"), "https://repo.packagist.org/p2/a/b.json");
        assert_eq!(base.resolve("https://cdn.example/p2/a/b.json"), "https://cdn.example/p2/a/b.json");
    }
}
