use regex::Regex;

/// Decides whether the operation at a target path takes part in the run.
pub trait PatternMatcher: Send + Sync {
    fn is_match(&self, path: &str) -> bool;
}

/// Glob patterns over slash-separated target paths.
///
/// `**` crosses segments (`**/` also matches zero of them), `*` and `?` stay inside one. A path is included when it, or one
/// of its ancestors, matches an include, or when it leads towards an include's literal
/// prefix. Excludes are applied to the path itself afterwards.
#[derive(Debug, Clone)]
pub struct GlobPatternMatcher {
    includes: Vec<Glob>,
    excludes: Vec<Glob>,
}

#[derive(Debug, Clone)]
struct Glob {
    regex: Regex,
    prefix: String,
}

impl GlobPatternMatcher {
    pub fn new<I, E>(includes: I, excludes: E) -> Result<Self, regex::Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            includes: compile_all(includes)?,
            excludes: compile_all(excludes)?,
        })
    }

    /// Matches every path.
    pub fn match_all() -> Self {
        Self {
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }

    fn is_included(&self, path: &str) -> bool {
        if self.includes.is_empty() || path.is_empty() {
            return true;
        }
        self.includes.iter().any(|glob| {
            ancestors_and_self(path).any(|candidate| glob.regex.is_match(candidate))
                || glob.prefix == path
                || glob
                    .prefix
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

impl PatternMatcher for GlobPatternMatcher {
    fn is_match(&self, path: &str) -> bool {
        self.is_included(path) && !self.excludes.iter().any(|glob| glob.regex.is_match(path))
    }
}

fn compile_all<P>(patterns: P) -> Result<Vec<Glob>, regex::Error>
where
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|pattern| compile(pattern.as_ref().trim_matches('/')))
        .collect()
}

fn compile(pattern: &str) -> Result<Glob, regex::Error> {
    let mut source = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    source.push_str("(?:.*/)?");
                } else {
                    source.push_str(".*");
                }
            }
            '*' => source.push_str("[^/]*"),
            '?' => source.push_str("[^/]"),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    let prefix = match pattern.find(['*', '?']) {
        Some(wildcard) => pattern[..wildcard]
            .rfind('/')
            .map(|slash| pattern[..slash].to_string())
            .unwrap_or_default(),
        None => pattern.to_string(),
    };

    Ok(Glob {
        regex: Regex::new(&source)?,
        prefix,
    })
}

/// `a/b/c` yields `a/b/c`, `a/b`, `a`.
fn ancestors_and_self(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once(path).chain(path.rmatch_indices('/').map(move |(index, _)| &path[..index]))
}
