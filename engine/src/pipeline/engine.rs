//! The feature pipeline engine.
//!
//! ```text
//! register(unit) ...      apply(raw, options)
//!                           │
//!                           ├─ dedup raw columns
//!                           ├─ build RowIdentity (dedup rows by key)
//!                           └─ for unit in registration order:
//!                                 skip if applied (unless forced)
//!                                 resolve inputs: raw ▸ accumulated features
//!                                 invoke ▸ relabel with RowIdentity ▸ merge
//!                                 store accumulated features
//! ```
//!
//! Execution order is exactly registration order. A later unit may read
//! columns produced by an earlier one.

use std::collections::HashMap;

use super::identity::RowIdentity;
use super::options::ApplyOptions;
use super::unit::{Argument, Arguments, CallingConvention, FeatureFn, OutputName, Params, TransformationUnit};
use crate::diagnostics::{Diagnostics, Event};
use crate::error::{ConfigError, PipelineResult};
use crate::table::{Column, Table};

/// Key under which whole-subtable inputs are passed.
pub const SUBTABLE_KEY: &str = "df";

/// Input column name(s) of a unit. A single name is a one-element list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs(Vec<String>);

impl From<&str> for Inputs {
    fn from(name: &str) -> Self {
        Inputs(vec![name.to_string()])
    }
}

impl From<String> for Inputs {
    fn from(name: String) -> Self {
        Inputs(vec![name])
    }
}

impl From<Vec<String>> for Inputs {
    fn from(names: Vec<String>) -> Self {
        Inputs(names)
    }
}

impl From<Vec<&str>> for Inputs {
    fn from(names: Vec<&str>) -> Self {
        Inputs(names.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Inputs {
    fn from(names: [&str; N]) -> Self {
        Inputs(names.iter().map(|s| s.to_string()).collect())
    }
}

/// Everything needed to register one unit.
///
/// Only the inputs and the function are mandatory; the output name defaults
/// to the function's name and the convention to named series.
#[derive(Debug, Clone)]
pub struct UnitSpec {
    inputs: Vec<String>,
    function: FeatureFn,
    output: Option<OutputName>,
    params: Params,
    convention: CallingConvention,
}

impl UnitSpec {
    pub fn new(inputs: impl Into<Inputs>, function: FeatureFn) -> Self {
        Self {
            inputs: inputs.into().0,
            function,
            output: None,
            params: Params::new(),
            convention: CallingConvention::default(),
        }
    }

    pub fn output(mut self, output: impl Into<OutputName>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn convention(mut self, convention: CallingConvention) -> Self {
        self.convention = convention;
        self
    }
}

/// Ordered transformation units plus the feature table they have built so far.
#[derive(Debug, Default)]
pub struct FeaturePipeline {
    units: Vec<TransformationUnit>,
    features: Option<Table>,
    /// Feature column -> position of the unit that produced it.
    owners: HashMap<String, usize>,
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit. Registering a function object that is already
    /// registered is a no-op reported as a diagnostic.
    pub fn register(&mut self, spec: UnitSpec, diagnostics: &Diagnostics) -> &mut Self {
        if self.units.iter().any(|u| u.function().same_as(&spec.function)) {
            diagnostics.emit(Event::DuplicateRegistration {
                function: spec.function.name().to_string(),
            });
            return self;
        }

        let output = spec
            .output
            .unwrap_or_else(|| OutputName::Single(spec.function.name().to_string()));
        self.units.push(TransformationUnit::new(
            spec.inputs,
            spec.function,
            output,
            spec.params,
            spec.convention,
        ));
        self
    }

    pub fn units(&self) -> &[TransformationUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The accumulated feature table, if any unit has run.
    pub fn features(&self) -> Option<&Table> {
        self.features.as_ref()
    }

    /// Forget accumulated features and mark every unit as not applied.
    pub fn reset_features(&mut self) {
        self.features = None;
        self.owners.clear();
        for unit in &mut self.units {
            unit.mark_unapplied();
        }
    }

    /// Map a unit's declared inputs to arguments.
    ///
    /// Names resolve against `raw` first, then against `features`. Both
    /// tables must already carry the canonical row identity.
    pub fn resolve_arguments(
        unit: &TransformationUnit,
        raw: &Table,
        features: Option<&Table>,
    ) -> PipelineResult<Arguments> {
        if unit.inputs().is_empty() {
            return Err(ConfigError::NoInputs(unit.label()).into());
        }

        let resolved: Vec<&Column> = unit
            .inputs()
            .iter()
            .map(|name| {
                raw.column(name)
                    .or_else(|| features.and_then(|f| f.column(name)))
                    .ok_or_else(|| ConfigError::UnknownColumn(name.clone()))
            })
            .collect::<Result<_, _>>()?;

        let mut args = Arguments::new();
        match unit.convention() {
            CallingConvention::NamedSeries | CallingConvention::PositionalSeries => {
                for (i, column) in resolved.into_iter().enumerate() {
                    args.insert(format!("ser{}", i + 1), Argument::Series(column.clone()));
                }
            }
            CallingConvention::SubTable => {
                let first = resolved[0];
                let mut df = Table::new();
                for column in resolved {
                    if column.len() != first.len() {
                        return Err(ConfigError::RowCountMismatch {
                            column: first.name.clone(),
                            expected: first.len(),
                            actual: column.len(),
                        }
                        .into());
                    }
                    df.push_column(column.clone())?;
                }
                let df = df.with_index(raw.index().to_vec())?;
                args.insert(SUBTABLE_KEY, Argument::Frame(df));
            }
        }

        for (name, value) in unit.params().iter() {
            if args.contains(name) {
                return Err(ConfigError::ReservedParameter(name.to_string()).into());
            }
            args.insert(name, Argument::Param(value.clone()));
        }

        Ok(args)
    }

    /// Run every pending unit against `raw` and return the feature table.
    ///
    /// Accumulated features are stored after each unit, so on error the
    /// units that already succeeded keep their results and are skipped by
    /// the next non-forced call.
    pub fn apply(
        &mut self,
        raw: &Table,
        options: &ApplyOptions,
        diagnostics: &Diagnostics,
    ) -> PipelineResult<Table> {
        let working = raw.dedup_columns();
        let (working, identity) =
            RowIdentity::build(&working, &options.identity_columns, &options.key_separator)?;

        diagnostics.emit(Event::ApplyStarted {
            rows: identity.len(),
            units: self.units.len(),
        });

        self.features = self.features.take().map(|f| f.reindex(identity.labels()));

        for position in 0..self.units.len() {
            let unit = &self.units[position];
            if unit.is_applied() && !options.force_reapply_all {
                diagnostics.emit_indent(Event::UnitSkipped { unit: unit.label() }, 1);
                continue;
            }

            let label = unit.label();
            match self.apply_unit(position, &working, &identity) {
                Ok(columns) => {
                    diagnostics.emit_indent(Event::UnitApplied { unit: label, columns }, 1);
                }
                Err(e) => {
                    diagnostics.emit_indent(
                        Event::UnitFailed {
                            unit: label,
                            error: e.to_string(),
                        },
                        1,
                    );
                    return Err(e);
                }
            }
        }

        let result = match &self.features {
            Some(features) => features.clone(),
            None => Table::new().with_index(identity.labels().to_vec())?,
        };
        diagnostics.emit(Event::ApplyFinished {
            rows: result.row_count(),
            columns: result.column_count(),
        });
        Ok(result)
    }

    /// Resolve, invoke and merge one unit. Returns the merged column names.
    fn apply_unit(&mut self, position: usize, raw: &Table, identity: &RowIdentity) -> PipelineResult<Vec<String>> {
        let args = Self::resolve_arguments(&self.units[position], raw, self.features.as_ref())?;
        let fragment = self.units[position].invoke(args)?;

        match self.merge_fragment(position, fragment, raw, identity) {
            Ok(columns) => Ok(columns),
            Err(e) => {
                self.units[position].mark_unapplied();
                Err(e)
            }
        }
    }

    fn merge_fragment(
        &mut self,
        position: usize,
        fragment: Table,
        raw: &Table,
        identity: &RowIdentity,
    ) -> PipelineResult<Vec<String>> {
        if fragment.row_count() != identity.len() {
            return Err(ConfigError::FragmentLength {
                unit: self.units[position].label(),
                expected: identity.len(),
                actual: fragment.row_count(),
            }
            .into());
        }
        let fragment = fragment.with_index(identity.labels().to_vec())?;

        let columns: Vec<String> = fragment.column_names().into_iter().map(String::from).collect();
        for name in &columns {
            let owned_elsewhere = self.owners.get(name).is_some_and(|&owner| owner != position);
            if raw.has_column(name) || owned_elsewhere {
                return Err(ConfigError::AmbiguousColumn(name.clone()).into());
            }
        }

        let merged = match self.features.take() {
            None => fragment,
            Some(features) => features.hconcat(&fragment),
        };
        self.features = Some(merged);
        for name in &columns {
            self.owners.insert(name.clone(), position);
        }

        Ok(columns)
    }
}
