use pg_escape::quote_identifier;

use crate::bail;
use crate::error::{BulkResult, ErrorKind};

/// Abstract two-sided equality predicate over record fields.
///
/// Represents the join condition as a list of `(target_column, staging_column)`
/// equality pairs plus an optional extra boolean expression, instead of a
/// language-level expression tree. Translation to SQL text happens in one place,
/// keeping dialect concerns out of the merge algorithm.
#[derive(Debug, Clone, Default)]
pub struct JoinCondition {
    pairs: Vec<(String, String)>,
    extra: Option<String>,
}

impl JoinCondition {
    /// Builds a condition equating identically named columns on both sides.
    ///
    /// The common case: join on the business key columns shared by target and
    /// staging.
    pub fn on_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pairs = columns
            .into_iter()
            .map(|column| {
                let column = column.into();
                (column.clone(), column)
            })
            .collect();

        Self { pairs, extra: None }
    }

    /// Builds a condition from explicit `(target_column, staging_column)` pairs.
    pub fn on_column_pairs<I, L, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(left, right)| (left.into(), right.into()))
            .collect();

        Self { pairs, extra: None }
    }

    /// Appends an extra boolean expression, ANDed onto the column equalities.
    ///
    /// The expression is embedded verbatim and must already use the target and
    /// staging aliases.
    pub fn with_extra(mut self, expression: impl Into<String>) -> Self {
        self.extra = Some(expression.into());
        self
    }

    /// Translates the condition into SQL text using the given table aliases.
    pub fn to_sql(&self, target_alias: &str, staging_alias: &str) -> BulkResult<String> {
        if self.pairs.is_empty() && self.extra.is_none() {
            bail!(
                ErrorKind::ConfigError,
                "A join condition requires at least one column pair or expression"
            );
        }

        let mut terms: Vec<String> = self
            .pairs
            .iter()
            .map(|(left, right)| {
                format!(
                    "{target_alias}.{} = {staging_alias}.{}",
                    quote_identifier(left),
                    quote_identifier(right)
                )
            })
            .collect();

        if let Some(extra) = &self.extra {
            terms.push(format!("({extra})"));
        }

        Ok(terms.join(" AND "))
    }
}
