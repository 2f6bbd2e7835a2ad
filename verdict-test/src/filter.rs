use regex::Regex;

/// Selects fixtures by identifier.
#[derive(Clone, Debug, Default)]
pub struct FixtureFilter {
    /// Only fixtures whose identifier matches are kept.
    pub include: Option<Regex>,
    /// Fixtures whose identifier matches are dropped, even if `include` matches.
    pub skip: Option<Regex>,
}

impl FixtureFilter {
    pub fn new(include: Option<&str>, skip: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            include: include.map(Regex::new).transpose()?,
            skip: skip.map(Regex::new).transpose()?,
        })
    }

    pub fn matches(&self, identifier: &str) -> bool {
        self.include
            .as_ref()
            .map_or(true, |include| include.is_match(identifier))
            && !self
                .skip
                .as_ref()
                .is_some_and(|skip| skip.is_match(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keeps_everything() {
        assert!(FixtureFilter::default().matches("anything.c"));
    }

    #[test]
    fn skip_wins_over_include() {
        let filter = FixtureFilter::new(Some("^programs/"), Some("cil")).unwrap();
        assert!(filter.matches("programs/fib_false.c"));
        assert!(!filter.matches("programs/call_fb_realpath.cil.c"));
        assert!(!filter.matches("other/fib_false.c"));
    }

    #[test]
    fn bad_regex_is_an_error() {
        assert!(FixtureFilter::new(Some("("), None).is_err());
    }
}
