use crate::error::RuleError;

use super::cache::CacheControl;

/// Which paths a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatch {
    /// Final path component ends with one of these suffixes (stored
    /// lowercased with a leading dot, compared ASCII case-insensitively)
    Suffix(Vec<String>),

    /// Every path
    Any,
}

impl RuleMatch {
    /// Build a suffix matcher from extensions such as `"png"` or `".PNG"`.
    pub fn suffixes<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
            .collect();
        RuleMatch::Suffix(suffixes)
    }

    /// Whether `name` (a final path component) is accepted.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            RuleMatch::Any => true,
            RuleMatch::Suffix(suffixes) => {
                let name = name.to_ascii_lowercase();
                suffixes.iter().any(|s| name.ends_with(s.as_str()))
            }
        }
    }

    fn is_catch_all(&self) -> bool {
        matches!(self, RuleMatch::Any)
    }
}

/// What a rule does to a matching response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    /// Cache directive attached to every response under this rule
    pub cache: CacheControl,

    /// Whether directories under this rule are listed (otherwise 403)
    pub listing: bool,
}

/// A (matcher, policy) pair with an explicit precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Name used in logs and configuration errors
    pub name: String,

    /// Higher values are evaluated first
    pub precedence: u32,

    pub matcher: RuleMatch,

    pub policy: RoutePolicy,
}

impl RouteRule {
    pub fn new(
        name: impl Into<String>,
        precedence: u32,
        matcher: RuleMatch,
        policy: RoutePolicy,
    ) -> Self {
        Self {
            name: name.into(),
            precedence,
            matcher,
            policy,
        }
    }
}

/// Immutable rule table, built once at startup.
///
/// Construction guarantees a catch-all rule and a strict precedence order,
/// so [`RouteTable::select`] always returns exactly one rule.
#[derive(Debug, Clone)]
pub struct RouteTable {
    /// Sorted by descending precedence
    rules: Vec<RouteRule>,

    /// Index of the highest-precedence catch-all rule
    fallback: usize,
}

impl RouteTable {
    /// Validate and order the rules.
    ///
    /// # Errors
    ///
    /// - [`RuleError::EmptySuffixes`] if a suffix rule has nothing to match
    /// - [`RuleError::AmbiguousPrecedence`] if two rules share a precedence
    /// - [`RuleError::MissingCatchAll`] if no rule matches every path
    pub fn new(mut rules: Vec<RouteRule>) -> Result<Self, RuleError> {
        for rule in &rules {
            if let RuleMatch::Suffix(suffixes) = &rule.matcher {
                if suffixes.is_empty() {
                    return Err(RuleError::EmptySuffixes {
                        rule: rule.name.clone(),
                    });
                }
            }
        }

        rules.sort_by(|a, b| b.precedence.cmp(&a.precedence));

        if let Some(pair) = rules
            .windows(2)
            .find(|pair| pair[0].precedence == pair[1].precedence)
        {
            return Err(RuleError::AmbiguousPrecedence {
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
                precedence: pair[0].precedence,
            });
        }

        let fallback = rules
            .iter()
            .position(|rule| rule.matcher.is_catch_all())
            .ok_or(RuleError::MissingCatchAll)?;

        Ok(Self { rules, fallback })
    }

    /// Select the most specific rule for a final path component.
    pub fn select(&self, name: &str) -> &RouteRule {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(name))
            .unwrap_or(&self.rules[self.fallback])
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}
