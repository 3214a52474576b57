use std::collections::HashSet;

/// Matches fully-qualified query names (lowercase, with the trailing `.`) against the domains of a block.
#[derive(Debug, Default, Clone)]
pub struct DomainMatcher {
    /// `example.com.` and `www.example.com.` for every plain domain
    exact: HashSet<String>,
    /// `example.com.` for every wildcard domain, checked on label boundaries
    wildcard_suffixes: Vec<String>,
}

impl DomainMatcher {
    pub fn new<D, W>(domains: D, wildcard_domains: W) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        W: IntoIterator,
        W::Item: AsRef<str>,
    {
        let mut matcher = DomainMatcher::default();
        domains
            .into_iter()
            .filter_map(|domain| normalize_domain(domain.as_ref()))
            .for_each(|domain| matcher.add_domain(&domain));
        wildcard_domains
            .into_iter()
            .filter_map(|domain| {
                let domain = domain.as_ref().trim();
                normalize_domain(domain.strip_prefix("*.").unwrap_or(domain))
            })
            .for_each(|domain| matcher.add_wildcard_domain(&domain));
        matcher
    }

    fn add_domain(&mut self, domain: &str) {
        self.exact.insert(format!("{}.", domain));
        self.exact.insert(format!("www.{}.", domain));
    }

    fn add_wildcard_domain(&mut self, domain: &str) {
        let suffix = format!("{}.", domain);
        if !self.wildcard_suffixes.contains(&suffix) {
            self.wildcard_suffixes.push(suffix);
        }
    }

    pub fn matches(&self, qname: &str) -> bool {
        self.exact.contains(qname) || self.matches_wildcard(qname)
    }

    fn matches_wildcard(&self, qname: &str) -> bool {
        self.wildcard_suffixes.iter().any(|suffix| {
            qname
                .strip_suffix(suffix.as_str())
                // Either the domain itself or one of its subdomains, never 'notexample.com.'
                .is_some_and(|rest| rest.is_empty() || rest.ends_with('.'))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcard_suffixes.is_empty()
    }
}

/// Trims whitespace and trailing dots and lowercases the domain. Returns `None` for empty entries.
fn normalize_domain(domain: &str) -> Option<String> {
    let domain = domain.trim().trim_end_matches('.');
    (!domain.is_empty()).then(|| domain.to_ascii_lowercase())
}
