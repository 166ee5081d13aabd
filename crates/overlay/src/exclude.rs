use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use glob::{MatchOptions, Pattern};

/// Signature material that no longer matches the contents once an entry has
/// been replaced.
pub const DEFAULT_EXCLUDES: [&str; 4] = ["META-INF/*.SF", "META-INF/*.DSA", "META-INF/*.RSA", "META-INF/*.EC"];

// `*` must not cross directories: `META-INF/*.SF` leaves `META-INF/x/y.SF` alone.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Decides whether a base archive entry is dropped from the merged output.
///
/// Only consulted for entries coming from the base archive; override entries
/// are always written.
pub trait Exclude {
    fn excludes(&self, name: &str) -> bool;
}

impl<F> Exclude for F
where
    F: Fn(&str) -> bool,
{
    fn excludes(&self, name: &str) -> bool {
        self(name)
    }
}

/// A set of glob patterns matched against full entry names.
#[derive(Debug, Clone, Default)]
pub struct ExcludePatterns {
    patterns: Vec<Pattern>,
}

impl ExcludePatterns {
    /// No exclusions at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// The [`DEFAULT_EXCLUDES`] signature patterns.
    pub fn signatures() -> Self {
        Self {
            patterns: DEFAULT_EXCLUDES.iter().filter_map(|p| Pattern::new(p).ok()).collect(),
        }
    }

    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::none();
        set.extend(patterns)?;
        Ok(set)
    }

    /// Add more patterns. Nothing is added if any of them fails to compile.
    pub fn extend<I, S>(&mut self, patterns: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let compiled = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Pattern::new(pattern).or_raise(|| ErrorKind::InvalidPattern(pattern.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.patterns.extend(compiled);
        Ok(())
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Exclude for ExcludePatterns {
    fn excludes(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches_with(name, MATCH_OPTIONS))
    }
}
