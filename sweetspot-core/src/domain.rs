//! Search-space descriptor: parameter domains and the objective policy.
//!
//! A descriptor is parsed once per experiment-description event and is never
//! mutated afterwards; the next description replaces it wholesale.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::events::DescriptionPayload;
use crate::types::ParamValue;

/// Whether a parameter ranges over numbers or an enumerated set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    Numeric,
    Categorical,
}

/// Declared values of one parameter.
///
/// For categorical domains the position of a value in `values` is its
/// ordinal index, stable for the lifetime of the experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDomain {
    pub name: String,
    pub kind: DomainKind,
    pub values: Vec<ParamValue>,
}

impl ParameterDomain {
    /// Create a numeric domain from its literal values.
    pub fn numeric(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            name: name.into(),
            kind: DomainKind::Numeric,
            values: values.into_iter().map(ParamValue::Number).collect(),
        }
    }

    /// Create a categorical domain; order defines the ordinal indices.
    pub fn categorical<V: Into<ParamValue>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: DomainKind::Categorical,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Infer the kind from the sample values: numeric only if every value is.
    pub fn from_values(name: impl Into<String>, values: Vec<ParamValue>) -> Result<Self> {
        let name = name.into();
        if values.is_empty() {
            return Err(Error::Config(format!(
                "parameter `{name}` declares no values"
            )));
        }

        let kind = if values.iter().all(|v| matches!(v, ParamValue::Number(_))) {
            DomainKind::Numeric
        } else {
            DomainKind::Categorical
        };

        if kind == DomainKind::Categorical {
            for (i, value) in values.iter().enumerate() {
                if values[..i].contains(value) {
                    return Err(Error::Config(format!(
                        "parameter `{name}` declares category {value} twice"
                    )));
                }
            }
        }

        Ok(Self { name, kind, values })
    }

    #[must_use]
    pub fn is_categorical(&self) -> bool {
        self.kind == DomainKind::Categorical
    }

    /// Position of `value` in the declared values.
    #[must_use]
    pub fn index_of(&self, value: &ParamValue) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Whether an observed value is admissible for this parameter.
    ///
    /// Missing values are always admissible (inactive parameters); numeric
    /// domains accept any number since their values only sample the range.
    #[must_use]
    pub fn admits(&self, value: &ParamValue) -> bool {
        match (self.kind, value) {
            (_, ParamValue::Missing) => true,
            (DomainKind::Numeric, ParamValue::Number(_)) => true,
            (DomainKind::Numeric, _) => false,
            (DomainKind::Categorical, v) => self.index_of(v).is_some(),
        }
    }

    /// Display label for chart axes.
    #[must_use]
    pub fn label(&self) -> String {
        display_label(&self.name)
    }
}

/// Axis label for a parameter or objective name.
pub(crate) fn display_label(name: &str) -> String {
    name.replace('_', " ")
}

/// Optimization direction of the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Direction {
    /// Whether `candidate` is strictly better than `incumbent`.
    ///
    /// Ties are never better, so the earlier record keeps the title.
    #[must_use]
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Minimize => candidate < incumbent,
            Self::Maximize => candidate > incumbent,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimize => "minimize",
            Self::Maximize => "maximize",
        }
    }
}

/// The objective that drives best-point tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
    /// Position of this objective in a record's results.
    pub index: usize,
    pub direction: Direction,
}

/// Parsed experiment metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpaceDescriptor {
    parameters: Vec<ParameterDomain>,
    objectives: Vec<String>,
    objective: Objective,
}

impl SearchSpaceDescriptor {
    /// Create a descriptor with a single objective.
    pub fn new(
        parameters: Vec<ParameterDomain>,
        objective: impl Into<String>,
        direction: Direction,
    ) -> Self {
        let name = objective.into();
        Self {
            parameters,
            objectives: vec![name.clone()],
            objective: Objective {
                name,
                index: 0,
                direction,
            },
        }
    }

    /// Create a descriptor with several result columns, one of which drives
    /// best-point tracking.
    pub fn with_objectives(
        parameters: Vec<ParameterDomain>,
        objectives: Vec<String>,
        index: usize,
        direction: Direction,
    ) -> Result<Self> {
        let name = objectives.get(index).cloned().ok_or_else(|| {
            Error::Config(format!(
                "objective index {index} out of range for {} objectives",
                objectives.len()
            ))
        })?;
        Ok(Self {
            parameters,
            objectives,
            objective: Objective {
                name,
                index,
                direction,
            },
        })
    }

    /// Parse the experiment-description event body.
    ///
    /// Parameters come from `searchspace_description.boundaries`, either an
    /// object mapping names to value lists (declaration order is kept), a
    /// list of `{ name, values }` entries, or the hierarchical list of
    /// `{ RootParameter, Boundaries }` branches. Objectives come from
    /// `experiment_description.TaskConfiguration.Objectives`; the one with the
    /// highest `ObjectivesPriorities` entry drives tracking. The direction
    /// must be declared by `General.isMinimizationExperiment` or
    /// `TaskConfiguration.ObjectivesMinimization`; it is never guessed.
    pub fn from_description(raw: &DescriptionPayload) -> Result<Self> {
        let parameters = parse_parameters(&raw.searchspace_description)?;
        let objectives = parse_objectives(&raw.experiment_description)?;
        let index = priority_index(&raw.experiment_description, objectives.len());
        let direction = parse_direction(&raw.experiment_description, index)?;
        Self::with_objectives(parameters, objectives, index, direction)
    }

    #[must_use]
    pub fn parameters(&self) -> &[ParameterDomain] {
        &self.parameters
    }

    /// Find a parameter and its declared position by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<(usize, &ParameterDomain)> {
        self.parameters
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    #[must_use]
    pub fn objectives(&self) -> &[String] {
        &self.objectives
    }

    #[must_use]
    pub fn objective(&self) -> &Objective {
        &self.objective
    }
}

fn parse_parameters(searchspace: &Value) -> Result<Vec<ParameterDomain>> {
    let boundaries = searchspace.get("boundaries").ok_or_else(|| {
        Error::Config("searchspace_description.boundaries is missing".to_string())
    })?;

    let parameters = match boundaries {
        Value::Object(map) => map
            .iter()
            .map(|(name, values)| parse_domain(name, values))
            .collect::<Result<Vec<_>>>()?,
        Value::Array(entries) if entries.iter().any(|e| e.get("RootParameter").is_some()) => {
            parse_root_boundaries(searchspace, entries)?
        }
        Value::Array(entries) => entries
            .iter()
            .map(|entry| {
                let name = entry.get("name").and_then(Value::as_str).ok_or_else(|| {
                    Error::Config("boundary entry without a name".to_string())
                })?;
                parse_domain(name, entry.get("values").unwrap_or(&Value::Null))
            })
            .collect::<Result<Vec<_>>>()?,
        other => {
            return Err(Error::Config(format!(
                "searchspace_description.boundaries must be an object or list, got {other}"
            )));
        }
    };

    if parameters.is_empty() {
        return Err(Error::Config("search space declares no parameters".to_string()));
    }
    for (i, parameter) in parameters.iter().enumerate() {
        if parameters[..i].iter().any(|p| p.name == parameter.name) {
            return Err(Error::Config(format!(
                "parameter `{}` declared twice",
                parameter.name
            )));
        }
    }
    Ok(parameters)
}

/// Flatten a hierarchical search space into one parameter list.
///
/// Each root entry carries the boundaries of its own branch. Parameters are
/// the union over all roots in first-declared order, with values merged
/// without duplicates; a parameter absent from a branch is the None sentinel
/// in that branch's configurations. The root selector named by
/// `searchspace.name` becomes a categorical over `root_parameters_list`.
fn parse_root_boundaries(searchspace: &Value, roots: &[Value]) -> Result<Vec<ParameterDomain>> {
    let mut merged: Vec<(String, Vec<ParamValue>)> = Vec::new();
    for root in roots {
        let boundaries = root
            .get("Boundaries")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::Config("root parameter entry without Boundaries".to_string()))?;
        for (name, values) in boundaries {
            let values = parse_values(name, values)?;
            match merged.iter_mut().find(|(known, _)| known == name) {
                Some((_, known)) => {
                    for value in values {
                        if !known.contains(&value) {
                            known.push(value);
                        }
                    }
                }
                None => merged.push((name.clone(), values)),
            }
        }
    }

    if let Some(selector) = searchspace.get("name").and_then(Value::as_str)
        && let Some(root_names) = searchspace.get("root_parameters_list")
    {
        let values = parse_values(selector, root_names)?;
        match merged.iter_mut().find(|(known, _)| known == selector) {
            Some((_, known)) => *known = values,
            None => merged.insert(0, (selector.to_string(), values)),
        }
    }

    merged
        .into_iter()
        .map(|(name, values)| ParameterDomain::from_values(name, values))
        .collect()
}

fn parse_values(name: &str, values: &Value) -> Result<Vec<ParamValue>> {
    let Value::Array(values) = values else {
        return Err(Error::Config(format!(
            "parameter `{name}` must declare a list of values"
        )));
    };
    values
        .iter()
        .map(ParamValue::from_json)
        .collect::<Result<Vec<_>>>()
        .map_err(|e| Error::Config(format!("parameter `{name}`: {e}")))
}

fn parse_domain(name: &str, values: &Value) -> Result<ParameterDomain> {
    ParameterDomain::from_values(name, parse_values(name, values)?)
}

fn task_configuration(description: &Value) -> Option<&Map<String, Value>> {
    description
        .get("TaskConfiguration")
        .and_then(Value::as_object)
}

fn parse_objectives(description: &Value) -> Result<Vec<String>> {
    let objectives = task_configuration(description)
        .and_then(|task| task.get("Objectives"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::Config("experiment_description.TaskConfiguration.Objectives is missing".to_string())
        })?;

    let names = objectives
        .iter()
        .map(|o| {
            o.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::Config(format!("objective name must be a string, got {o}")))
        })
        .collect::<Result<Vec<_>>>()?;

    if names.is_empty() {
        return Err(Error::Config("experiment declares no objectives".to_string()));
    }
    Ok(names)
}

fn priority_index(description: &Value, count: usize) -> usize {
    let Some(priorities) = task_configuration(description)
        .and_then(|task| task.get("ObjectivesPriorities"))
        .and_then(Value::as_array)
    else {
        return 0;
    };
    if priorities.len() != count {
        return 0;
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, priority) in priorities.iter().enumerate() {
        let Some(p) = priority.as_f64() else {
            return 0;
        };
        if best.is_none_or(|(_, b)| p > b) {
            best = Some((i, p));
        }
    }
    best.map_or(0, |(i, _)| i)
}

fn parse_direction(description: &Value, index: usize) -> Result<Direction> {
    let flag = description
        .get("General")
        .and_then(|general| general.get("isMinimizationExperiment"))
        .and_then(Value::as_bool)
        .or_else(|| {
            task_configuration(description)
                .and_then(|task| task.get("ObjectivesMinimization"))
                .and_then(Value::as_array)
                .and_then(|flags| flags.get(index))
                .and_then(Value::as_bool)
        });

    match flag {
        Some(true) => Ok(Direction::Minimize),
        Some(false) => Ok(Direction::Maximize),
        None => Err(Error::Config(
            "objective direction is not declared (General.isMinimizationExperiment)".to_string(),
        )),
    }
}
