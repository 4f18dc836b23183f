//! Filter matching and resolution for the profile_variables callback.
//!
//! Three independent dimensions restrict what gets recorded: task names,
//! variable names and host names. Each dimension is configured either as a
//! native list of strings or as a single colon separated string, and can be
//! given per run (extra vars) or persistently (config file / environment).
//!
//! # Example
//!
//! ```rust,ignore
//! use profile_variables::callback::filter::{parse_filter_string, FilterSet, PersistedFilters};
//!
//! assert_eq!(parse_filter_string("'a:b:c'"), vec!["a", "b", "c"]);
//!
//! let filters = FilterSet::resolve(&play.extra_vars, &PersistedFilters::default());
//! if filters.allows_host("webserver1") { /* ... */ }
//! ```

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::vars::Variables;

// ============================================================================
// Matcher
// ============================================================================

/// How an empty pattern list is interpreted.
///
/// The two meanings genuinely differ between recording modes, so every
/// caller has to pick one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPatterns {
    /// Empty list matches nothing (opt-in restriction)
    MatchNothing,
    /// Empty list matches everything (opt-out restriction)
    MatchEverything,
}

/// Returns true if any pattern is a substring of `candidate`.
///
/// Matching is case-sensitive, unanchored containment.
pub fn matches(candidate: &str, patterns: &[String], empty: EmptyPatterns) -> bool {
    if patterns.is_empty() {
        return empty == EmptyPatterns::MatchEverything;
    }
    patterns
        .iter()
        .any(|pattern| candidate.contains(pattern.as_str()))
}

// ============================================================================
// Filter Dimensions and Values
// ============================================================================

/// Extra-var prefix for inline overrides (`profile_variables_record_vars`, ...).
pub const EXTRA_VAR_PREFIX: &str = "profile_variables_";

/// One of the three independent filter axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterDimension {
    /// Task display names (substring match)
    Tasks,
    /// Variable names (exact match)
    Vars,
    /// Host identifiers (exact match)
    Hosts,
}

impl FilterDimension {
    /// All dimensions, in resolution order.
    pub const ALL: [FilterDimension; 3] = [
        FilterDimension::Tasks,
        FilterDimension::Vars,
        FilterDimension::Hosts,
    ];

    /// Option name as used in config files and diagnostics.
    pub fn option_name(&self) -> &'static str {
        match self {
            FilterDimension::Tasks => "record_tasks",
            FilterDimension::Vars => "record_vars",
            FilterDimension::Hosts => "record_hosts",
        }
    }

    /// Name of the extra variable that overrides this dimension for one run.
    pub fn extra_var_name(&self) -> String {
        format!("{}{}", EXTRA_VAR_PREFIX, self.option_name())
    }
}

/// A raw filter value as it enters the system from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterValue {
    /// Not configured at this tier
    #[default]
    Absent,
    /// Colon separated string, possibly quoted
    Text(String),
    /// Native list of names
    List(Vec<String>),
    /// Anything else; carries a short description of what was found
    Malformed(String),
}

impl FilterValue {
    /// Classify an optional JSON value.
    ///
    /// Lists must contain only strings; anything else is malformed.
    pub fn from_json(value: Option<&JsonValue>) -> Self {
        match value {
            None | Some(JsonValue::Null) => FilterValue::Absent,
            Some(JsonValue::String(s)) => FilterValue::Text(s.clone()),
            Some(JsonValue::Array(items)) => {
                let strings: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(String::from))
                    .collect();
                match strings {
                    Some(list) => FilterValue::List(list),
                    None => FilterValue::Malformed("list with non-string entries".to_string()),
                }
            }
            Some(JsonValue::Bool(_)) => FilterValue::Malformed("boolean".to_string()),
            Some(JsonValue::Number(_)) => FilterValue::Malformed("number".to_string()),
            Some(JsonValue::Object(_)) => FilterValue::Malformed("mapping".to_string()),
        }
    }

    /// Whether this tier supplies a value. Empty strings and empty lists do
    /// not, so resolution falls through to the next tier.
    pub fn is_present(&self) -> bool {
        match self {
            FilterValue::Absent => false,
            FilterValue::Text(s) => !s.is_empty(),
            FilterValue::List(list) => !list.is_empty(),
            FilterValue::Malformed(_) => true,
        }
    }

    /// Normalize into a list of non-empty names, logging what was done.
    ///
    /// Never fails: a malformed value degrades to an empty list.
    pub fn normalize(&self, name: &str) -> Vec<String> {
        let patterns = match self {
            FilterValue::Absent => Vec::new(),
            FilterValue::Text(s) => {
                info!("Parsing '{}' from string to list ...", name);
                parse_filter_string(s)
            }
            FilterValue::List(list) => {
                info!("Using '{}' list as is ...", name);
                list.iter().filter(|s| !s.is_empty()).cloned().collect()
            }
            FilterValue::Malformed(found) => {
                warn!(
                    "Optional variable '{}' is neither a string or a list (found {}). \
                     The profile_variables callback requires variables in string or list format.",
                    name, found
                );
                Vec::new()
            }
        };
        info!("{}={:?}", name, patterns);
        patterns
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        FilterValue::List(list)
    }
}

/// Parse a colon separated filter string.
///
/// Surrounding `"` then `'` characters are trimmed, then leading and
/// trailing `:` separators. Empty tokens are dropped.
pub fn parse_filter_string(value: &str) -> Vec<String> {
    value
        .trim_matches('"')
        .trim_matches('\'')
        .trim_matches(':')
        .split(':')
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

// ============================================================================
// Resolution
// ============================================================================

/// Filter values from the persisted configuration tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedFilters {
    /// Persisted task filter
    pub record_tasks: FilterValue,
    /// Persisted variable filter
    pub record_vars: FilterValue,
    /// Persisted host filter
    pub record_hosts: FilterValue,
}

impl PersistedFilters {
    /// Get the persisted value for a dimension.
    pub fn get(&self, dimension: FilterDimension) -> &FilterValue {
        match dimension {
            FilterDimension::Tasks => &self.record_tasks,
            FilterDimension::Vars => &self.record_vars,
            FilterDimension::Hosts => &self.record_hosts,
        }
    }
}

/// Normalized filters for one play. Immutable once resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    /// Substrings a task's display name must contain (any of)
    pub task_patterns: Vec<String>,
    /// Variable names to track
    pub var_patterns: Vec<String>,
    /// Host identifiers to record
    pub host_patterns: Vec<String>,
}

impl FilterSet {
    /// Resolve all three dimensions: inline extra vars first, then the
    /// persisted tier, then empty.
    pub fn resolve(extra_vars: &Variables, persisted: &PersistedFilters) -> Self {
        let mut set = FilterSet::default();
        for dimension in FilterDimension::ALL {
            let inline = FilterValue::from_json(extra_vars.get(&dimension.extra_var_name()));
            let value = if inline.is_present() {
                &inline
            } else {
                persisted.get(dimension)
            };
            let patterns = value.normalize(dimension.option_name());
            match dimension {
                FilterDimension::Tasks => set.task_patterns = patterns,
                FilterDimension::Vars => set.var_patterns = patterns,
                FilterDimension::Hosts => set.host_patterns = patterns,
            }
        }
        set
    }

    /// Neither tasks nor variables were asked for: nothing is recorded.
    pub fn is_inactive(&self) -> bool {
        self.task_patterns.is_empty() && self.var_patterns.is_empty()
    }

    /// Host filter: exact list membership, empty list allows every host.
    pub fn allows_host(&self, host: &str) -> bool {
        self.host_patterns.is_empty() || self.host_patterns.iter().any(|h| h == host)
    }

    /// Task filter: substring match, empty list allows every task.
    pub fn allows_task(&self, task_name: &str) -> bool {
        matches(task_name, &self.task_patterns, EmptyPatterns::MatchEverything)
    }

    /// Variable filter: exact name equality against a configured entry.
    pub fn tracks_variable(&self, name: &str) -> bool {
        self.var_patterns.iter().any(|v| v == name)
    }
}
