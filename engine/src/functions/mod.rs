//! Example feature functions.
//!
//! Ready-made [`FeatureFn`]s covering the common shapes a pipeline meets:
//! per-column numeric flags, two-column date and ratio arithmetic, whole
//! sub-table reductions and multi-column outputs.
//!
//! Each constructor returns a fresh function object, so calling it twice
//! gives two registrable functions; clone the returned value to reuse the
//! same object.

use chrono::Datelike;

use crate::error::{FunctionError, FunctionResult};
use crate::pipeline::unit::{Arguments, FeatureFn, FnOutput, Signature};
use crate::table::{Column, Scalar, Table};

/// `1` where `ser1 > threshold`, else `0`. Nulls stay null.
///
/// Named-series convention; takes the fixed parameter `threshold`.
pub fn threshold() -> FeatureFn {
    FeatureFn::new(
        "threshold",
        Signature::series(1).required("threshold"),
        |args| {
            let column = args.series("ser1")?;
            let limit = numeric_param(args, "threshold")?;
            let values = column
                .values
                .iter()
                .enumerate()
                .map(|(row, v)| -> FunctionResult<Scalar> {
                    if v.is_null() {
                        return Ok(Scalar::Null);
                    }
                    let x = numeric(v, &column.name, row)?;
                    Ok(Scalar::Int(i64::from(x > limit)))
                })
                .collect::<FunctionResult<Vec<_>>>()?;
            Ok(FnOutput::Values(values))
        },
    )
}

/// Whole days from `start` to `end`, clipped at zero.
///
/// Declares its own parameter names, so register it with the positional
/// convention.
pub fn days_between() -> FeatureFn {
    FeatureFn::new(
        "days_between",
        Signature::new().required("start").required("end"),
        |args| {
            let start = args.series("start")?;
            let end = args.series("end")?;
            let values = start
                .values
                .iter()
                .zip(&end.values)
                .map(|(s, e)| match (s.as_date(), e.as_date()) {
                    (Some(s), Some(e)) => Scalar::Int((e - s).num_days().max(0)),
                    _ => Scalar::Null,
                })
                .collect();
            Ok(FnOutput::Values(values))
        },
    )
}

/// `ser1 / ser2`. A zero or null denominator gives null.
pub fn ratio() -> FeatureFn {
    FeatureFn::new("ratio", Signature::series(2), |args| {
        let num = args.series("ser1")?;
        let den = args.series("ser2")?;
        let values = num
            .values
            .iter()
            .zip(&den.values)
            .enumerate()
            .map(|(row, (n, d))| -> FunctionResult<Scalar> {
                if n.is_null() || d.is_null() {
                    return Ok(Scalar::Null);
                }
                let n = numeric(n, &num.name, row)?;
                let d = numeric(d, &den.name, row)?;
                Ok(if d == 0.0 { Scalar::Null } else { Scalar::Float(n / d) })
            })
            .collect::<FunctionResult<Vec<_>>>()?;
        Ok(FnOutput::Values(values))
    })
}

/// Row-wise sum over every column of the sub-table `df`, skipping nulls.
pub fn row_sum() -> FeatureFn {
    FeatureFn::new("row_sum", Signature::new().required("df"), |args| {
        let df = args.frame("df")?;
        let values = (0..df.row_count())
            .map(|row| {
                df.columns()
                    .iter()
                    .filter(|c| !c.values[row].is_null())
                    .map(|c| numeric(&c.values[row], &c.name, row))
                    .sum::<FunctionResult<f64>>()
                    .map(Scalar::Float)
            })
            .collect::<FunctionResult<Vec<_>>>()?;
        Ok(FnOutput::Values(values))
    })
}

/// Split a date column into `year`, `month` and `day` columns.
///
/// Registered with a single output name, the columns come out as
/// `{name}_year`, `{name}_month`, `{name}_day`.
pub fn date_parts() -> FeatureFn {
    FeatureFn::new("date_parts", Signature::series(1), |args| {
        let column = args.series("ser1")?;
        let dates: Vec<_> = column.values.iter().map(Scalar::as_date).collect();
        let table = Table::from_columns(vec![
            Column::new("year", dates.iter().map(|d| d.map(|d| i64::from(d.year())))),
            Column::new("month", dates.iter().map(|d| d.map(|d| i64::from(d.month())))),
            Column::new("day", dates.iter().map(|d| d.map(|d| i64::from(d.day())))),
        ])
        .map_err(|e| FunctionError::custom(e.to_string()))?;
        Ok(FnOutput::Table(table))
    })
}

fn numeric(value: &Scalar, argument: &str, row: usize) -> FunctionResult<f64> {
    value.as_f64().ok_or_else(|| FunctionError::Type {
        argument: argument.to_string(),
        row,
        message: format!("expected a number, found {}", value.type_name()),
    })
}

fn numeric_param(args: &Arguments, name: &str) -> FunctionResult<f64> {
    args.param(name)
        .ok_or_else(|| FunctionError::MissingArgument(name.to_string()))?
        .as_f64()
        .ok_or_else(|| FunctionError::custom(format!("parameter '{}' must be numeric", name)))
}

/// Get a description of the example functions for the CLI
pub fn functions_description() -> String {
    r#"Available feature functions:

| Function     | Convention        | Inputs        | Parameters | Output                         |
|--------------|-------------------|---------------|------------|--------------------------------|
| threshold    | named_series      | ser1          | threshold  | 1 if ser1 > threshold else 0   |
| days_between | positional_series | start, end    | -          | days from start to end, >= 0   |
| ratio        | named_series      | ser1, ser2    | -          | ser1 / ser2 (null on zero)     |
| row_sum      | sub_table         | df            | -          | row-wise sum of all columns    |
| date_parts   | named_series      | ser1          | -          | {name}_year/_month/_day        |

CLI examples:
  featline run data.csv --id ID --threshold Amount:500:HighAmount
  featline run data.csv --days Start:End:Duration --date-parts Start:start
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::unit::Argument;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> Scalar {
        Scalar::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn values(output: FnOutput) -> Vec<Scalar> {
        match output {
            FnOutput::Values(v) => v,
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_threshold() {
        let mut args = Arguments::new();
        args.insert("ser1", Argument::Series(Column::new("Amount", [100, 600])));
        args.insert("threshold", Argument::Param(Scalar::Int(500)));
        let out = values(threshold().call(&args).unwrap());
        assert_eq!(out, vec![Scalar::Int(0), Scalar::Int(1)]);
    }

    #[test]
    fn test_threshold_rejects_text() {
        let mut args = Arguments::new();
        args.insert("ser1", Argument::Series(Column::new("Amount", ["lots"])));
        args.insert("threshold", Argument::Param(Scalar::Int(500)));
        let err = threshold().call(&args).unwrap_err();
        assert!(matches!(err, FunctionError::Type { row: 0, .. }));
    }

    #[test]
    fn test_days_between_clips_negative() {
        let mut args = Arguments::new();
        args.insert(
            "start",
            Argument::Series(Column::new("Start", [date(2020, 1, 1), date(2020, 1, 10)])),
        );
        args.insert(
            "end",
            Argument::Series(Column::new("End", [date(2020, 1, 10), date(2020, 1, 1)])),
        );
        let out = values(days_between().call(&args).unwrap());
        assert_eq!(out, vec![Scalar::Int(9), Scalar::Int(0)]);
    }

    #[test]
    fn test_ratio_zero_denominator() {
        let mut args = Arguments::new();
        args.insert("ser1", Argument::Series(Column::new("a", [3, 1])));
        args.insert("ser2", Argument::Series(Column::new("b", [2, 0])));
        let out = values(ratio().call(&args).unwrap());
        assert_eq!(out, vec![Scalar::Float(1.5), Scalar::Null]);
    }

    #[test]
    fn test_row_sum_skips_nulls() {
        let df = Table::from_columns(vec![
            Column::new("a", [Some(1), None]),
            Column::new("b", [Some(2), Some(5)]),
        ])
        .unwrap();
        let mut args = Arguments::new();
        args.insert("df", Argument::Frame(df));
        let out = values(row_sum().call(&args).unwrap());
        assert_eq!(out, vec![Scalar::Float(3.0), Scalar::Float(5.0)]);
    }

    #[test]
    fn test_date_parts_columns() {
        let mut args = Arguments::new();
        args.insert("ser1", Argument::Series(Column::new("d", [date(2021, 6, 30)])));
        match date_parts().call(&args).unwrap() {
            FnOutput::Table(t) => {
                assert_eq!(t.column_names(), vec!["year", "month", "day"]);
                assert_eq!(t.column("month").unwrap().values, vec![Scalar::Int(6)]);
            }
            other => panic!("unexpected output {:?}", other),
        }
    }
}
