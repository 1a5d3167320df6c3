use crate::flatten::{Column, FlatTable, SEPARATOR};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("satellite table {0:?} would replace the primary table")]
    NameCollision(String),
}

/// Which columns of a flat table go to which relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub table: String,
    /// Column names, id column first
    pub columns: Vec<String>,
}

/// A relation ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub table: String,
    pub id_column: String,
    pub columns: Vec<Column>,
}

impl Partition {
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Split column names into the primary table and prefix-named satellites.
///
/// Undotted names go to `primary`; dotted names go to the table named by the
/// text before their first dot. The id column is placed first in every plan.
/// Only names are inspected, never values.
pub fn plan_partitions<'a, I>(
    names: I,
    id_column: &str,
    primary: &str,
) -> Result<Vec<PartitionPlan>, RouteError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut plans = vec![PartitionPlan {
        table: primary.to_string(),
        columns: vec![id_column.to_string()],
    }];

    for name in names {
        if name == id_column {
            continue;
        }

        let table = match name.split_once(SEPARATOR) {
            None => primary,
            Some((prefix, _)) if prefix == primary => {
                return Err(RouteError::NameCollision(prefix.to_string()));
            }
            Some((prefix, _)) => prefix,
        };

        match plans.iter_mut().find(|plan| plan.table == table) {
            Some(plan) => plan.columns.push(name.to_string()),
            None => plans.push(PartitionPlan {
                table: table.to_string(),
                columns: vec![id_column.to_string(), name.to_string()],
            }),
        }
    }

    Ok(plans)
}

/// Partition the columns of `table` into relations
pub fn partition(table: &FlatTable, primary: &str) -> Result<Vec<Partition>, RouteError> {
    let plans = plan_partitions(table.column_names(), &table.id_column, primary)?;

    let partitions = plans
        .into_iter()
        .map(|plan| Partition {
            columns: plan
                .columns
                .iter()
                .filter_map(|name| table.column(name).cloned())
                .collect(),
            table: plan.table,
            id_column: table.id_column.clone(),
        })
        .collect();

    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{CellValue, ColumnKind};

    #[test]
    fn test_plan_partitions() {
        let names = ["match_id", "city", "date.1", "toss.winner", "date.2", "overs", "toss.decision"];
        let plans = plan_partitions(names, "match_id", "matchinfo").unwrap();

        assert_eq!(
            plans,
            vec![
                PartitionPlan {
                    table: "matchinfo".into(),
                    columns: vec!["match_id".into(), "city".into(), "overs".into()],
                },
                PartitionPlan {
                    table: "date".into(),
                    columns: vec!["match_id".into(), "date.1".into(), "date.2".into()],
                },
                PartitionPlan {
                    table: "toss".into(),
                    columns: vec!["match_id".into(), "toss.winner".into(), "toss.decision".into()],
                },
            ]
        );
    }

    #[test]
    fn test_every_column_lands_in_exactly_one_plan() {
        let names = [
            "match_id", "city", "outcome.by.runs", "outcome.winner", "umpire.1",
            "umpire.2", "venue", "1st innings.team", "1st innings.deliveries",
        ];
        let plans = plan_partitions(names, "match_id", "matchinfo").unwrap();

        for name in names.iter().filter(|n| **n != "match_id") {
            let holders: Vec<_> = plans
                .iter()
                .filter(|plan| plan.columns.iter().any(|c| c.as_str() == *name))
                .collect();
            assert_eq!(holders.len(), 1, "{} should be in exactly one table", name);

            let expected = name.split_once('.').map_or("matchinfo", |(prefix, _)| prefix);
            assert_eq!(holders[0].table, expected);
        }

        for plan in &plans {
            assert_eq!(plan.columns[0], "match_id");
        }
    }

    #[test]
    fn test_primary_name_collision() {
        let result = plan_partitions(["match_id", "innings.total"], "match_id", "innings");
        assert!(matches!(result, Err(RouteError::NameCollision(name)) if name == "innings"));
    }

    #[test]
    fn test_partition_carries_values() {
        let table = FlatTable {
            id_column: "match_id".into(),
            columns: vec![
                Column::new("match_id", ColumnKind::Text, vec![CellValue::Text("9".into())]),
                Column::new("team.1", ColumnKind::Text, vec![CellValue::Text("India".into())]),
                Column::new("team.2", ColumnKind::Text, vec![CellValue::Text("Australia".into())]),
            ],
        };

        let partitions = partition(&table, "matchinfo").unwrap();
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].column_names(), vec!["match_id"]);
        assert_eq!(partitions[1].table, "team");
        assert_eq!(partitions[1].column_names(), vec!["match_id", "team.1", "team.2"]);
        assert_eq!(partitions[1].columns[2].values[0], CellValue::Text("Australia".into()));
        assert_eq!(partitions[1].height(), 1);
    }
}
