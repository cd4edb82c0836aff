//! Parallel-coordinate dimensions, one per parameter plus one per objective.

use serde::{Serialize, Serializer};

use crate::domain::{DomainKind, SearchSpaceDescriptor, display_label};
use crate::store::ResultStore;
use crate::types::ParamValue;

/// Placeholder emitted for values outside a parameter's declared set.
pub const OUT_OF_DOMAIN: &str = "<out of domain>";

/// One plotted coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlotValue {
    /// Raw number, or the ordinal index of a categorical value
    Value(f64),
    /// Parameter inactive for this point (None sentinel)
    Missing,
    /// Observed value not in the declared set
    OutOfDomain,
}

impl PlotValue {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl Serialize for PlotValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            Self::Missing => serializer.serialize_none(),
            Self::OutOfDomain => serializer.serialize_str(OUT_OF_DOMAIN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub label: String,
    pub values: Vec<PlotValue>,
    /// Ordinal tick positions, categorical dimensions only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_vals: Option<Vec<usize>>,
    /// Declared category labels at `tick_vals`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_text: Option<Vec<String>>,
}

/// A value that could not be placed on its dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutOfDomainValue {
    /// Position of the record in arrival order.
    pub record: usize,
    pub parameter: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSet {
    pub dimensions: Vec<Dimension>,
    pub violations: Vec<OutOfDomainValue>,
}

impl DimensionSet {
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }
}

pub struct DimensionProjector;

impl DimensionProjector {
    /// Project every record of `store` in arrival order.
    ///
    /// Categorical values plot at their declared index with the declared
    /// values as tick labels; values outside the set plot as
    /// [`PlotValue::OutOfDomain`] and are listed in `violations`, never at
    /// index 0. Objective columns follow the parameters as plain numeric
    /// dimensions.
    #[must_use]
    pub fn project(store: &ResultStore, descriptor: &SearchSpaceDescriptor) -> DimensionSet {
        let records = store.all();
        let mut dimensions = Vec::new();
        let mut violations = Vec::new();

        for (at, domain) in descriptor.parameters().iter().enumerate() {
            let values = records
                .iter()
                .enumerate()
                .map(|(i, record)| {
                    let value = record.configuration.get(at).unwrap_or(&ParamValue::Missing);
                    let plotted = match (domain.kind, value) {
                        (_, ParamValue::Missing) => PlotValue::Missing,
                        (DomainKind::Numeric, ParamValue::Number(n)) => PlotValue::Value(*n),
                        (DomainKind::Categorical, v) => match domain.index_of(v) {
                            Some(index) => PlotValue::Value(index as f64),
                            None => PlotValue::OutOfDomain,
                        },
                        (DomainKind::Numeric, _) => PlotValue::OutOfDomain,
                    };
                    if plotted == PlotValue::OutOfDomain {
                        violations.push(OutOfDomainValue {
                            record: i,
                            parameter: domain.name.clone(),
                            value: value.clone(),
                        });
                    }
                    plotted
                })
                .collect();

            let (tick_vals, tick_text) = if domain.is_categorical() {
                (
                    Some((0..domain.values.len()).collect()),
                    Some(domain.values.iter().map(ToString::to_string).collect()),
                )
            } else {
                (None, None)
            };

            dimensions.push(Dimension {
                name: domain.name.clone(),
                label: domain.label(),
                values,
                tick_vals,
                tick_text,
            });
        }

        for (index, name) in descriptor.objectives().iter().enumerate() {
            dimensions.push(Dimension {
                name: name.clone(),
                label: display_label(name),
                values: records
                    .iter()
                    .map(|r| r.scalar(index).map_or(PlotValue::Missing, PlotValue::Value))
                    .collect(),
                tick_vals: None,
                tick_text: None,
            });
        }

        DimensionSet {
            dimensions,
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, ParameterDomain};
    use crate::store::{RecordOrigin, ResultRecord};
    use serde_json::{Value, json};

    fn descriptor() -> SearchSpaceDescriptor {
        SearchSpaceDescriptor::new(
            vec![
                ParameterDomain::numeric("worker_threads", [1.0, 8.0]),
                ParameterDomain::categorical("level", ["low", "med", "high"]),
            ],
            "run_time",
            Direction::Minimize,
        )
    }

    fn store(points: &[(ParamValue, &str, Value)]) -> ResultStore {
        let descriptor = descriptor();
        let mut store = ResultStore::new();
        for (threads, level, result) in points {
            store.upsert(
                ResultRecord::new(
                    vec![threads.clone(), (*level).into()],
                    vec![result.clone()],
                    descriptor.parameters(),
                    RecordOrigin::New,
                )
                .unwrap(),
            );
        }
        store
    }

    #[test]
    fn categorical_values_map_to_declared_ordinals() {
        let store = store(&[(2.0.into(), "high", json!(1.0)), (4.0.into(), "low", json!(2.0))]);
        let set = DimensionProjector::project(&store, &descriptor());

        let level = set.dimension("level").unwrap();
        assert_eq!(level.values, vec![PlotValue::Value(2.0), PlotValue::Value(0.0)]);
        assert_eq!(level.tick_vals, Some(vec![0, 1, 2]));
        assert_eq!(
            level.tick_text,
            Some(vec!["low".to_string(), "med".to_string(), "high".to_string()])
        );
        assert!(set.violations.is_empty());
    }

    #[test]
    fn numeric_values_pass_through_without_ticks() {
        let store = store(&[(2.0.into(), "low", json!(1.0)), (6.0.into(), "low", json!(2.0))]);
        let set = DimensionProjector::project(&store, &descriptor());

        let threads = set.dimension("worker_threads").unwrap();
        assert_eq!(threads.label, "worker threads");
        assert_eq!(threads.values, vec![PlotValue::Value(2.0), PlotValue::Value(6.0)]);
        assert!(threads.tick_vals.is_none());
    }

    #[test]
    fn undeclared_category_gets_placeholder_not_index_zero() {
        let store = store(&[(2.0.into(), "extreme", json!(1.0))]);
        let set = DimensionProjector::project(&store, &descriptor());

        let level = set.dimension("level").unwrap();
        assert_eq!(level.values, vec![PlotValue::OutOfDomain]);
        assert_eq!(set.violations.len(), 1);
        assert_eq!(set.violations[0].parameter, "level");
        assert_eq!(set.violations[0].value, ParamValue::from("extreme"));
    }

    #[test]
    fn missing_values_stay_missing() {
        let store = store(&[(ParamValue::Missing, "med", json!(1.0))]);
        let set = DimensionProjector::project(&store, &descriptor());

        assert_eq!(
            set.dimension("worker_threads").unwrap().values,
            vec![PlotValue::Missing]
        );
        assert!(set.violations.is_empty());
    }

    #[test]
    fn objective_is_trailing_numeric_dimension() {
        let store = store(&[(1.0.into(), "low", json!(3.5)), (8.0.into(), "med", json!("crashed"))]);
        let set = DimensionProjector::project(&store, &descriptor());

        let objective = set.dimensions.last().unwrap();
        assert_eq!(objective.name, "run_time");
        assert_eq!(objective.label, "run time");
        assert_eq!(objective.values, vec![PlotValue::Value(3.5), PlotValue::Missing]);
        assert!(objective.tick_text.is_none());
    }

    #[test]
    fn plot_values_serialize_distinctly() {
        let json = serde_json::to_string(&[
            PlotValue::Value(1.0),
            PlotValue::Missing,
            PlotValue::OutOfDomain,
        ])
        .unwrap();
        assert_eq!(json, r#"[1.0,null,"<out of domain>"]"#);
    }
}
