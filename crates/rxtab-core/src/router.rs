//! Routing of a line to the pattern and table that claim it

use crate::pattern::{CapturedValues, ConditionalPattern, PatternSpec};
use tracing::warn;

/// Which pattern claimed a line
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a> {
    /// The primary pattern matched
    Primary {
        table: &'a str,
        values: CapturedValues<'a>,
    },
    /// A conditional pattern's condition and content both matched
    Conditional {
        table: &'a str,
        values: CapturedValues<'a>,
    },
    /// Nothing claimed the line
    NoMatch,
}

/// Tests the primary pattern, then the conditional patterns in registration order
#[derive(Debug, Clone, Copy)]
pub struct Router<'p> {
    primary: Option<&'p PatternSpec>,
    conditionals: &'p [ConditionalPattern],
}

impl<'p> Router<'p> {
    /// Create a router over borrowed patterns
    pub fn new(primary: Option<&'p PatternSpec>, conditionals: &'p [ConditionalPattern]) -> Self {
        Self {
            primary,
            conditionals,
        }
    }

    /// Route one line.
    ///
    /// Only the first conditional whose condition matches is considered. If its content pattern
    /// then fails, the line is reported as [`MatchOutcome::NoMatch`] and later conditionals are
    /// not tried.
    pub fn route<'a>(&self, line: &'a str) -> MatchOutcome<'a>
    where
        'p: 'a,
    {
        if let Some(primary) = self.primary {
            if let Some(values) = primary.captures(line) {
                return MatchOutcome::Primary {
                    table: primary.table(),
                    values,
                };
            }
        }

        let Some(conditional) = self
            .conditionals
            .iter()
            .find(|c| c.condition().is_match(line))
        else {
            return MatchOutcome::NoMatch;
        };

        match conditional.content().captures(line) {
            Some(values) => MatchOutcome::Conditional {
                table: conditional.table(),
                values,
            },
            None => {
                warn!(
                    condition = conditional.condition().as_str(),
                    table = conditional.table(),
                    "condition matched but content pattern did not: {:?}",
                    line
                );
                MatchOutcome::NoMatch
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> PatternSpec {
        PatternSpec::new(r"^(?P<id>\d+),(?P<name>\w+)$", "people", &[]).unwrap()
    }

    #[test]
    fn test_primary_wins_first() {
        let primary = primary();
        let conditionals =
            vec![ConditionalPattern::new(r"^\d", r"^(?P<all>.*)$", "other", &[]).unwrap()];
        let router = Router::new(Some(&primary), &conditionals);

        match router.route("1,ann") {
            MatchOutcome::Primary { table, values } => {
                assert_eq!(table, "people");
                assert_eq!(values, vec![("id", Some("1")), ("name", Some("ann"))]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_first_registered_condition_wins() {
        let primary = primary();
        let conditionals = vec![
            ConditionalPattern::new("^#", r"^#(?P<first>.*)$", "first", &[]).unwrap(),
            ConditionalPattern::new("^#!", r"^#!(?P<second>.*)$", "second", &[]).unwrap(),
        ];
        let router = Router::new(Some(&primary), &conditionals);

        match router.route("#!shebang") {
            MatchOutcome::Conditional { table, values } => {
                assert_eq!(table, "first");
                assert_eq!(values, vec![("first", Some("!shebang"))]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_content_mismatch_does_not_fall_through() {
        let primary = primary();
        let conditionals = vec![
            ConditionalPattern::new("^ERR", r"^ERR (?P<code>\d+)$", "errors", &[]).unwrap(),
            ConditionalPattern::new("^E", r"^(?P<text>.*)$", "fallback", &[]).unwrap(),
        ];
        let router = Router::new(Some(&primary), &conditionals);

        assert_eq!(router.route("ERR oops"), MatchOutcome::NoMatch);
        assert!(matches!(
            router.route("EOF"),
            MatchOutcome::Conditional { table: "fallback", .. }
        ));
    }

    #[test]
    fn test_no_match() {
        let primary = primary();
        let router = Router::new(Some(&primary), &[]);
        assert_eq!(router.route("garbage line"), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_conditionals_without_primary() {
        let conditionals =
            vec![ConditionalPattern::new("=", r"^(?P<k>\w+)=(?P<v>.*)$", "kv", &[]).unwrap()];
        let router = Router::new(None, &conditionals);

        assert!(matches!(
            router.route("a=1"),
            MatchOutcome::Conditional { table: "kv", .. }
        ));
    }
}
