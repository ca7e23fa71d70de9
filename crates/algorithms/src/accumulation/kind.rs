//! Accumulation kinds and per-column reduction plans

use std::fmt;
use std::str::FromStr;
use surtcat_core::table::{is_area_column, is_coverage_column};
use surtcat_core::{Error, MetricTable, Result};

/// Kind of landscape metric being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccumKind {
    /// Area per category class (`CatVALUE_11`, ...).
    Categorical,
    /// Cell count and value sum of a continuous layer.
    Continuous,
    /// Point counts, optionally with summed attribute fields.
    Count,
}

impl FromStr for AccumKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "categorical" | "cat" => Ok(AccumKind::Categorical),
            "continuous" | "cont" => Ok(AccumKind::Continuous),
            "count" => Ok(AccumKind::Count),
            _ => Err(Error::InvalidParameter {
                name: "kind",
                value: s.to_string(),
                reason: "expected categorical, continuous or count".to_string(),
            }),
        }
    }
}

impl fmt::Display for AccumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccumKind::Categorical => "Categorical",
            AccumKind::Continuous => "Continuous",
            AccumKind::Count => "Count",
        };
        f.write_str(name)
    }
}

/// How one column is reduced over a closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Missing-safe sum.
    Sum,
    /// Area-weighted mean; missing values count as zero, their area still
    /// counts in the denominator.
    AreaWeighted,
}

/// Column roles of a metric table, resolved once before accumulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub kind: Option<AccumKind>,
    /// Position of the area column.
    pub area: usize,
    /// Reduction per column, aligned with the table columns.
    pub reductions: Vec<Reduction>,
}

impl ColumnPlan {
    /// Plan derived from column names alone.
    pub fn from_table(table: &MetricTable) -> Result<Self> {
        let area = table.area_column()?;
        let reductions = table
            .columns()
            .iter()
            .map(|c| {
                if is_coverage_column(c) {
                    Reduction::AreaWeighted
                } else {
                    Reduction::Sum
                }
            })
            .collect();
        Ok(Self {
            kind: None,
            area,
            reductions,
        })
    }

    /// Plan for a metric of `kind`, checking the columns that kind needs.
    pub fn resolve(kind: AccumKind, table: &MetricTable) -> Result<Self> {
        let mut plan = Self::from_table(table)?;
        let columns = table.columns();
        let has_suffix = |suffix: &str| columns.iter().any(|c| c.ends_with(suffix));
        let require = |suffix: &str| -> Result<()> {
            if has_suffix(suffix) {
                Ok(())
            } else {
                Err(Error::MissingColumn {
                    column: format!("*{suffix}"),
                    table: format!("{kind} metric table"),
                })
            }
        };

        match kind {
            AccumKind::Continuous => {
                require("Count")?;
                require("Sum")?;
            }
            AccumKind::Count => require("Count")?,
            AccumKind::Categorical => {
                let classes = columns
                    .iter()
                    .filter(|c| !is_area_column(c) && !is_coverage_column(c))
                    .count();
                if classes == 0 {
                    return Err(Error::MissingColumn {
                        column: "category class".to_string(),
                        table: format!("{kind} metric table"),
                    });
                }
            }
        }
        plan.kind = Some(kind);
        Ok(plan)
    }

    /// Columns that take part in boundary subtraction: every summed column,
    /// area included. Coverage fractions are left alone.
    pub fn adjustable_columns(&self) -> Vec<usize> {
        self.reductions
            .iter()
            .enumerate()
            .filter(|&(_, r)| *r == Reduction::Sum)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str]) -> MetricTable {
        MetricTable::from_rows(columns.iter().copied(), vec![(1, vec![1.0; columns.len()])]).unwrap()
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Continuous".parse::<AccumKind>().unwrap(), AccumKind::Continuous);
        assert_eq!("cat".parse::<AccumKind>().unwrap(), AccumKind::Categorical);
        assert!("mean".parse::<AccumKind>().is_err());
    }

    #[test]
    fn test_plan_roles() {
        let plan = ColumnPlan::from_table(&table(&["CatAreaSqKm", "CatCount", "CatSum", "CatPctFull"])).unwrap();
        assert_eq!(plan.area, 0);
        assert_eq!(
            plan.reductions,
            vec![Reduction::Sum, Reduction::Sum, Reduction::Sum, Reduction::AreaWeighted]
        );
        assert_eq!(plan.adjustable_columns(), vec![0, 1, 2]);
    }

    #[test]
    fn test_kind_validation() {
        let continuous = table(&["CatAreaSqKm", "CatCount", "CatSum", "CatPctFull"]);
        assert!(ColumnPlan::resolve(AccumKind::Continuous, &continuous).is_ok());
        assert!(ColumnPlan::resolve(AccumKind::Count, &continuous).is_ok());

        let counts_only = table(&["CatAreaSqKm", "CatCount", "CatPctFull"]);
        assert!(ColumnPlan::resolve(AccumKind::Continuous, &counts_only).is_err());

        let categorical = table(&["CatAreaSqKm", "CatVALUE_11", "CatVALUE_21", "CatPctFull"]);
        assert!(ColumnPlan::resolve(AccumKind::Categorical, &categorical).is_ok());
        assert!(ColumnPlan::resolve(AccumKind::Categorical, &table(&["CatAreaSqKm", "CatPctFull"])).is_err());
    }

    #[test]
    fn test_missing_area_column() {
        assert!(matches!(
            ColumnPlan::from_table(&table(&["CatSum"])),
            Err(Error::MissingColumn { .. })
        ));
    }
}
