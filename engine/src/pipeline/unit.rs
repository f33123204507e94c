//! Transformation units.
//!
//! A [`TransformationUnit`] pairs a [`FeatureFn`] with the columns it reads,
//! the name(s) of the features it produces, its [`CallingConvention`] and any
//! fixed parameters. Invoking a unit binds resolved [`Arguments`] onto the
//! function's declared [`Signature`], calls it, and turns whatever it returns
//! into a positionally indexed output fragment with the declared names.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{ConfigError, FunctionError, FunctionResult, PipelineError, PipelineResult};
use crate::table::{Column, Scalar, Table};

// =============================================================================
// Calling convention & output naming
// =============================================================================

/// How a unit's resolved inputs are handed to its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallingConvention {
    /// One column per parameter, passed under the generated names
    /// `ser1`, `ser2`, ... plus fixed parameters by name. Every supplied
    /// name must be a declared parameter.
    #[default]
    NamedSeries,
    /// One column per parameter, bound in order onto the function's own
    /// declared parameter names. Fixed parameters bind by name and their
    /// slots are skipped by the columns.
    PositionalSeries,
    /// All input columns side by side in a single table named `df`.
    SubTable,
}

/// Name(s) given to the columns a unit produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputName {
    /// The single output column's name, or a prefix for multi-column output.
    Single(String),
    /// One name per output column, in order.
    Many(Vec<String>),
}

impl OutputName {
    /// Human-readable label used in diagnostics and errors.
    pub fn label(&self) -> String {
        match self {
            OutputName::Single(name) => name.clone(),
            OutputName::Many(names) => names.join(","),
        }
    }
}

impl From<&str> for OutputName {
    fn from(name: &str) -> Self {
        OutputName::Single(name.to_string())
    }
}

impl From<String> for OutputName {
    fn from(name: String) -> Self {
        OutputName::Single(name)
    }
}

impl From<Vec<String>> for OutputName {
    fn from(names: Vec<String>) -> Self {
        OutputName::Many(names)
    }
}

impl From<Vec<&str>> for OutputName {
    fn from(names: Vec<&str>) -> Self {
        OutputName::Many(names.into_iter().map(String::from).collect())
    }
}

// =============================================================================
// Arguments
// =============================================================================

/// A single bound argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Series(Column),
    Frame(Table),
    Param(Scalar),
}

/// Ordered name -> argument bindings handed to a [`FeatureFn`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Argument)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing an earlier binding of the same name.
    pub fn insert(&mut self, name: impl Into<String>, argument: Argument) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = argument,
            None => self.entries.push((name, argument)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// A column argument. Missing or non-column bindings are function errors.
    pub fn series(&self, name: &str) -> FunctionResult<&Column> {
        match self.get(name) {
            Some(Argument::Series(column)) => Ok(column),
            Some(_) => Err(FunctionError::custom(format!("argument '{}' is not a column", name))),
            None => Err(FunctionError::MissingArgument(name.to_string())),
        }
    }

    /// A table argument.
    pub fn frame(&self, name: &str) -> FunctionResult<&Table> {
        match self.get(name) {
            Some(Argument::Frame(table)) => Ok(table),
            Some(_) => Err(FunctionError::custom(format!("argument '{}' is not a table", name))),
            None => Err(FunctionError::MissingArgument(name.to_string())),
        }
    }

    /// A fixed parameter, if bound.
    pub fn param(&self, name: &str) -> Option<&Scalar> {
        match self.get(name) {
            Some(Argument::Param(value)) => Some(value),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fixed extra parameters of a unit, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, Scalar)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Feature functions
// =============================================================================

/// One declared parameter of a [`FeatureFn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub required: bool,
}

/// The ordered parameter list a [`FeatureFn`] accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            required: false,
        });
        self
    }

    /// `ser1..=serN`, all required.
    pub fn series(count: usize) -> Self {
        (1..=count).fold(Self::new(), |sig, i| sig.required(format!("ser{}", i)))
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }
}

/// What a transform function returns.
#[derive(Debug, Clone, PartialEq)]
pub enum FnOutput {
    Column(Column),
    Values(Vec<Scalar>),
    Table(Table),
}

type FnBody = dyn Fn(&Arguments) -> FunctionResult<FnOutput> + Send + Sync;

/// An opaque transform function with a declared signature.
///
/// Clones share the same function object; [`FeatureFn::same_as`] compares
/// object identity, not behaviour.
#[derive(Clone)]
pub struct FeatureFn {
    name: String,
    signature: Signature,
    body: Arc<FnBody>,
}

impl FeatureFn {
    pub fn new<F>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(&Arguments) -> FunctionResult<FnOutput> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn same_as(&self, other: &FeatureFn) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }

    pub fn call(&self, args: &Arguments) -> FunctionResult<FnOutput> {
        (self.body)(args)
    }
}

impl fmt::Debug for FeatureFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureFn")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Transformation unit
// =============================================================================

/// One registered transformation.
#[derive(Debug, Clone)]
pub struct TransformationUnit {
    inputs: Vec<String>,
    function: FeatureFn,
    output: OutputName,
    convention: CallingConvention,
    params: Params,
    applied: bool,
}

impl TransformationUnit {
    /// Store the unit. The function is not called.
    pub fn new(
        inputs: Vec<String>,
        function: FeatureFn,
        output: OutputName,
        params: Params,
        convention: CallingConvention,
    ) -> Self {
        Self {
            inputs,
            function,
            output,
            convention,
            params,
            applied: false,
        }
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn function(&self) -> &FeatureFn {
        &self.function
    }

    pub fn output(&self) -> &OutputName {
        &self.output
    }

    pub fn convention(&self) -> CallingConvention {
        self.convention
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub fn label(&self) -> String {
        self.output.label()
    }

    pub(crate) fn mark_unapplied(&mut self) {
        self.applied = false;
    }

    /// Call the function with resolved arguments and return the renamed,
    /// positionally indexed output fragment.
    ///
    /// The applied flag is set only when everything succeeds.
    pub fn invoke(&mut self, args: Arguments) -> PipelineResult<Table> {
        let bound = self.bind(args)?;

        let output = self.function.call(&bound).map_err(|source| PipelineError::Function {
            unit: self.label(),
            source,
        })?;

        let fragment = self.rename(output)?.reset_index();
        self.applied = true;
        Ok(fragment)
    }

    /// Check the supplied names against the declared signature and, for
    /// positional convention, rebind values onto the declared names.
    fn bind(&self, args: Arguments) -> Result<Arguments, ConfigError> {
        let signature = self.function.signature();
        let function = self.function.name().to_string();

        let bound = match self.convention {
            CallingConvention::NamedSeries | CallingConvention::SubTable => {
                if let Some(unexpected) = args.names().find(|n| !signature.accepts(n)) {
                    return Err(ConfigError::UnexpectedArgument {
                        function,
                        argument: unexpected.to_string(),
                    });
                }
                args
            }
            CallingConvention::PositionalSeries => {
                let (fixed, positional): (Vec<_>, Vec<_>) = args
                    .entries
                    .into_iter()
                    .partition(|(_, argument)| matches!(argument, Argument::Param(_)));

                // Fixed parameters bind by name; generated values fill the
                // remaining declared slots in order.
                if let Some((unexpected, _)) = fixed.iter().find(|(n, _)| !signature.accepts(n)) {
                    return Err(ConfigError::UnexpectedArgument {
                        function,
                        argument: unexpected.clone(),
                    });
                }
                let free: Vec<&Param> = signature
                    .params()
                    .iter()
                    .filter(|p| !fixed.iter().any(|(n, _)| *n == p.name))
                    .collect();
                if positional.len() > free.len() {
                    return Err(ConfigError::Arity {
                        function,
                        declared: free.len(),
                        supplied: positional.len(),
                    });
                }

                let mut rebound = Arguments::new();
                for ((_, argument), param) in positional.into_iter().zip(free) {
                    rebound.insert(param.name.clone(), argument);
                }
                for (name, argument) in fixed {
                    rebound.insert(name, argument);
                }
                rebound
            }
        };

        if let Some(missing) = signature
            .params()
            .iter()
            .find(|p| p.required && !bound.contains(&p.name))
        {
            return Err(ConfigError::MissingArgument {
                function,
                argument: missing.name.clone(),
            });
        }

        Ok(bound)
    }

    /// Apply the declared output naming to whatever the function returned.
    fn rename(&self, output: FnOutput) -> PipelineResult<Table> {
        let columns = match output {
            FnOutput::Column(column) => vec![column],
            FnOutput::Values(values) => vec![Column {
                name: self.label(),
                values,
            }],
            FnOutput::Table(table) => table.into_columns(),
        };

        let renamed: Vec<Column> = match (&self.output, columns.len()) {
            (OutputName::Single(name), 1) => columns.into_iter().map(|c| c.renamed(name.clone())).collect(),
            (OutputName::Single(prefix), n) if n > 1 => columns
                .into_iter()
                .map(|c| {
                    let name = format!("{}_{}", prefix, c.name);
                    c.renamed(name)
                })
                .collect(),
            (OutputName::Many(names), n) if names.len() == n && n > 0 => columns
                .into_iter()
                .zip(names)
                .map(|(c, name)| c.renamed(name.clone()))
                .collect(),
            (output, n) => {
                let names = match output {
                    OutputName::Single(_) => 1,
                    OutputName::Many(names) => names.len(),
                };
                return Err(ConfigError::OutputArity {
                    unit: self.label(),
                    names,
                    columns: n,
                }
                .into());
            }
        };

        let mut seen = HashSet::new();
        if let Some(dup) = renamed.iter().find(|c| !seen.insert(c.name.as_str())) {
            return Err(ConfigError::AmbiguousColumn(dup.name.clone()).into());
        }

        Ok(Table::from_columns(renamed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double() -> FeatureFn {
        FeatureFn::new("double", Signature::series(1), |args| {
            let col = args.series("ser1")?;
            let values = col
                .values
                .iter()
                .map(|v| Scalar::from(v.as_f64().map(|x| x * 2.0)))
                .collect();
            Ok(FnOutput::Values(values))
        })
    }

    fn series_args(columns: Vec<Column>) -> Arguments {
        let mut args = Arguments::new();
        for (i, c) in columns.into_iter().enumerate() {
            args.insert(format!("ser{}", i + 1), Argument::Series(c));
        }
        args
    }

    #[test]
    fn test_new_does_not_invoke() {
        let unit = TransformationUnit::new(
            vec!["x".into()],
            FeatureFn::new("boom", Signature::series(1), |_| panic!("called")),
            "y".into(),
            Params::new(),
            CallingConvention::NamedSeries,
        );
        assert!(!unit.is_applied());
    }

    #[test]
    fn test_invoke_renames_single_output_and_sets_applied() {
        let mut unit = TransformationUnit::new(
            vec!["x".into()],
            double(),
            "x2".into(),
            Params::new(),
            CallingConvention::NamedSeries,
        );
        let fragment = unit.invoke(series_args(vec![Column::new("x", [1, 2])])).unwrap();
        assert_eq!(fragment.column_names(), vec!["x2"]);
        assert_eq!(fragment.column("x2").unwrap().values, vec![Scalar::Float(2.0), Scalar::Float(4.0)]);
        assert!(unit.is_applied());
    }

    #[test]
    fn test_named_convention_rejects_unknown_argument() {
        let mut unit = TransformationUnit::new(
            vec!["x".into()],
            double(),
            "x2".into(),
            Params::new(),
            CallingConvention::NamedSeries,
        );
        let mut args = series_args(vec![Column::new("x", [1])]);
        args.insert("factor", Argument::Param(Scalar::Int(3)));

        let err = unit.invoke(args).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::UnexpectedArgument { ref argument, .. }) if argument == "factor"
        ));
        assert!(!unit.is_applied());
    }

    #[test]
    fn test_positional_convention_binds_declared_names() {
        let diff = FeatureFn::new(
            "diff",
            Signature::new().required("left").required("right").optional("scale"),
            |args| {
                let left = args.series("left")?;
                let right = args.series("right")?;
                let scale = args.param("scale").and_then(Scalar::as_f64).unwrap_or(1.0);
                let values = left
                    .values
                    .iter()
                    .zip(&right.values)
                    .map(|(l, r)| match (l.as_f64(), r.as_f64()) {
                        (Some(l), Some(r)) => Scalar::Float((l - r) * scale),
                        _ => Scalar::Null,
                    })
                    .collect();
                Ok(FnOutput::Values(values))
            },
        );
        let mut unit = TransformationUnit::new(
            vec!["a".into(), "b".into()],
            diff,
            "delta".into(),
            Params::new().with("scale", 10),
            CallingConvention::PositionalSeries,
        );
        let mut args = series_args(vec![Column::new("a", [5]), Column::new("b", [3])]);
        args.insert("scale", Argument::Param(Scalar::Int(10)));

        let fragment = unit.invoke(args).unwrap();
        assert_eq!(fragment.column("delta").unwrap().values, vec![Scalar::Float(20.0)]);
    }

    fn scaled_gap() -> FeatureFn {
        FeatureFn::new(
            "scaled_gap",
            Signature::new()
                .required("start")
                .required("end")
                .optional("unit")
                .optional("scale"),
            |args| {
                if args.param("unit").is_some() {
                    return Err(FunctionError::custom("unit must not be bound"));
                }
                let start = args.series("start")?;
                let end = args.series("end")?;
                let scale = args.param("scale").and_then(Scalar::as_f64).unwrap_or(1.0);
                let values = start
                    .values
                    .iter()
                    .zip(&end.values)
                    .map(|(s, e)| match (s.as_f64(), e.as_f64()) {
                        (Some(s), Some(e)) => Scalar::Float((e - s) * scale),
                        _ => Scalar::Null,
                    })
                    .collect();
                Ok(FnOutput::Values(values))
            },
        )
    }

    #[test]
    fn test_positional_convention_binds_fixed_params_by_name() {
        let mut unit = TransformationUnit::new(
            vec!["a".into(), "b".into()],
            scaled_gap(),
            "gap".into(),
            Params::new().with("scale", 10),
            CallingConvention::PositionalSeries,
        );
        let mut args = series_args(vec![Column::new("a", [1]), Column::new("b", [2])]);
        args.insert("scale", Argument::Param(Scalar::Int(10)));

        let fragment = unit.invoke(args).unwrap();
        assert_eq!(fragment.column("gap").unwrap().values, vec![Scalar::Float(10.0)]);
    }

    #[test]
    fn test_positional_convention_rejects_undeclared_fixed_param() {
        let mut unit = TransformationUnit::new(
            vec!["a".into(), "b".into()],
            scaled_gap(),
            "gap".into(),
            Params::new(),
            CallingConvention::PositionalSeries,
        );
        let mut args = series_args(vec![Column::new("a", [1]), Column::new("b", [2])]);
        args.insert("factor", Argument::Param(Scalar::Int(3)));

        let err = unit.invoke(args).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::UnexpectedArgument { ref argument, .. }) if argument == "factor"
        ));
        assert!(!unit.is_applied());
    }

    #[test]
    fn test_positional_convention_arity() {
        let mut unit = TransformationUnit::new(
            vec!["a".into(), "b".into()],
            double(),
            "x".into(),
            Params::new(),
            CallingConvention::PositionalSeries,
        );
        let err = unit
            .invoke(series_args(vec![Column::new("a", [1]), Column::new("b", [1])]))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::Arity { declared: 1, supplied: 2, .. })
        ));
    }

    #[test]
    fn test_function_error_propagates_unchanged() {
        let failing = FeatureFn::new("failing", Signature::series(1), |_| {
            Err(FunctionError::custom("bad data"))
        });
        let mut unit = TransformationUnit::new(
            vec!["x".into()],
            failing,
            "y".into(),
            Params::new(),
            CallingConvention::NamedSeries,
        );
        let err = unit.invoke(series_args(vec![Column::new("x", [1])])).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Function {
                unit: "y".into(),
                source: FunctionError::custom("bad data"),
            }
        );
        assert!(!unit.is_applied());
    }

    fn split_pair() -> FeatureFn {
        FeatureFn::new("split_pair", Signature::series(1), |args| {
            let col = args.series("ser1")?;
            let table = Table::from_columns(vec![
                Column::new("lo", col.values.iter().map(|v| v.as_i64().map(|n| n % 10))),
                Column::new("hi", col.values.iter().map(|v| v.as_i64().map(|n| n / 10))),
            ])
            .map_err(|e| FunctionError::custom(e.to_string()))?;
            Ok(FnOutput::Table(table))
        })
    }

    #[test]
    fn test_multi_column_output_with_prefix() {
        let mut unit = TransformationUnit::new(
            vec!["n".into()],
            split_pair(),
            "digits".into(),
            Params::new(),
            CallingConvention::NamedSeries,
        );
        let fragment = unit.invoke(series_args(vec![Column::new("n", [42])])).unwrap();
        assert_eq!(fragment.column_names(), vec!["digits_lo", "digits_hi"]);
    }

    #[test]
    fn test_multi_column_output_with_names() {
        let mut unit = TransformationUnit::new(
            vec!["n".into()],
            split_pair(),
            vec!["ones", "tens"].into(),
            Params::new(),
            CallingConvention::NamedSeries,
        );
        let fragment = unit.invoke(series_args(vec![Column::new("n", [42])])).unwrap();
        assert_eq!(fragment.column_names(), vec!["ones", "tens"]);
        assert_eq!(fragment.column("tens").unwrap().values, vec![Scalar::Int(4)]);
    }

    #[test]
    fn test_output_name_count_mismatch() {
        let mut unit = TransformationUnit::new(
            vec!["n".into()],
            split_pair(),
            vec!["only_one", "two", "three"].into(),
            Params::new(),
            CallingConvention::NamedSeries,
        );
        let err = unit.invoke(series_args(vec![Column::new("n", [42])])).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::OutputArity { names: 3, columns: 2, .. })
        ));
    }

    #[test]
    fn test_function_index_is_discarded() {
        let relabeling = FeatureFn::new("relabel", Signature::series(1), |args| {
            let col = args.series("ser1")?.clone();
            let table = Table::from_columns(vec![col])
                .and_then(|t| {
                    t.with_index(vec![
                        crate::table::RowKey::Key("b".into()),
                        crate::table::RowKey::Key("a".into()),
                    ])
                })
                .map_err(|e| FunctionError::custom(e.to_string()))?;
            Ok(FnOutput::Table(table))
        });
        let mut unit = TransformationUnit::new(
            vec!["x".into()],
            relabeling,
            "y".into(),
            Params::new(),
            CallingConvention::NamedSeries,
        );
        let fragment = unit.invoke(series_args(vec![Column::new("x", [1, 2])])).unwrap();
        assert_eq!(
            fragment.index(),
            &[crate::table::RowKey::Position(0), crate::table::RowKey::Position(1)]
        );
    }

    #[test]
    fn test_clones_share_identity() {
        let f = double();
        let g = f.clone();
        assert!(f.same_as(&g));
        assert!(!f.same_as(&double()));
    }
}
