//! Row identity.
//!
//! Every `apply` call fixes one canonical row ordering up front. Raw rows,
//! output fragments and the accumulated feature table are all labelled with
//! it so they stay aligned.

use std::collections::HashSet;

use crate::error::{ConfigError, PipelineResult};
use crate::table::{RowKey, Table};

/// The canonical row labels of one `apply` call, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIdentity {
    labels: Vec<RowKey>,
}

impl RowIdentity {
    /// Derive the identity of `raw` and return the rows that survive.
    ///
    /// With identity columns, each row's key is the concatenation of the
    /// string forms of those columns (joined by `separator`). Without
    /// identity columns the table's own labels are the keys. Either way, rows
    /// repeating an earlier key are dropped.
    pub fn build(raw: &Table, identity_columns: &[String], separator: &str) -> PipelineResult<(Table, Self)> {
        if identity_columns.is_empty() {
            let mut seen = HashSet::new();
            let positions: Vec<usize> = raw
                .index()
                .iter()
                .enumerate()
                .filter(|(_, label)| seen.insert(*label))
                .map(|(pos, _)| pos)
                .collect();
            let table = if positions.len() == raw.row_count() {
                raw.clone()
            } else {
                raw.take_rows(&positions)?
            };
            let identity = Self {
                labels: table.index().to_vec(),
            };
            return Ok((table, identity));
        }

        let columns = identity_columns
            .iter()
            .map(|name| {
                raw.column(name)
                    .ok_or_else(|| ConfigError::UnknownColumn(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let keys: Vec<String> = (0..raw.row_count())
            .map(|row| {
                columns
                    .iter()
                    .map(|c| c.values[row].key_string())
                    .collect::<Vec<_>>()
                    .join(separator)
            })
            .collect();

        let (deduped, kept) = raw.dedup_rows_by(&keys)?;
        let labels: Vec<RowKey> = kept.into_iter().map(RowKey::Key).collect();
        let table = deduped.with_index(labels.clone())?;
        Ok((table, Self { labels }))
    }

    pub fn labels(&self) -> &[RowKey] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::table::{Column, Scalar};

    fn raw() -> Table {
        Table::from_columns(vec![
            Column::new("ID", [1, 2, 2]),
            Column::new("Region", ["eu", "us", "us"]),
            Column::new("Amount", [100, 600, 700]),
        ])
        .unwrap()
    }

    #[test]
    fn test_positional_identity_keeps_rows() {
        let (table, identity) = RowIdentity::build(&raw(), &[], "").unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            identity.labels(),
            &[RowKey::Position(0), RowKey::Position(1), RowKey::Position(2)]
        );
    }

    #[test]
    fn test_positional_identity_drops_repeated_labels() {
        let table = raw()
            .with_index(vec![
                RowKey::Key("a".into()),
                RowKey::Key("a".into()),
                RowKey::Key("b".into()),
            ])
            .unwrap();
        let (table, identity) = RowIdentity::build(&table, &[], "").unwrap();
        assert_eq!(identity.labels(), &[RowKey::Key("a".into()), RowKey::Key("b".into())]);
        assert_eq!(
            table.column("Amount").unwrap().values,
            vec![Scalar::Int(100), Scalar::Int(700)]
        );
        assert_eq!(table.index(), identity.labels());
    }

    #[test]
    fn test_identity_columns_dedup_first_wins() {
        let (table, identity) = RowIdentity::build(&raw(), &["ID".to_string()], "").unwrap();
        assert_eq!(identity.labels(), &[RowKey::Key("1".into()), RowKey::Key("2".into())]);
        assert_eq!(
            table.column("Amount").unwrap().values,
            vec![Scalar::Int(100), Scalar::Int(600)]
        );
        assert_eq!(table.index(), identity.labels());
    }

    #[test]
    fn test_composite_key_with_separator() {
        let columns = vec!["ID".to_string(), "Region".to_string()];
        let (_, identity) = RowIdentity::build(&raw(), &columns, "|").unwrap();
        assert_eq!(
            identity.labels(),
            &[RowKey::Key("1|eu".into()), RowKey::Key("2|us".into())]
        );
    }

    #[test]
    fn test_unknown_identity_column() {
        let err = RowIdentity::build(&raw(), &["Missing".to_string()], "").unwrap_err();
        assert_eq!(err, PipelineError::Config(ConfigError::UnknownColumn("Missing".into())));
    }
}
