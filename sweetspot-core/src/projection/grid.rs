//! Dense two-axis grid over sparse measurements.

use serde::{Deserialize, Serialize};

use crate::codec::KeyCodec;
use crate::domain::{ParameterDomain, SearchSpaceDescriptor};
use crate::error::{Error, Result};
use crate::store::{ResultRecord, ResultStore};
use crate::types::ParamValue;

/// Which parameters map to grid rows and columns.
///
/// Orientation is always chosen by the caller, never inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridAxes {
    pub rows: String,
    pub columns: String,
}

impl GridAxes {
    pub fn new(rows: impl Into<String>, columns: impl Into<String>) -> Self {
        Self {
            rows: rows.into(),
            columns: columns.into(),
        }
    }

    /// Same axes with rows and columns swapped.
    #[must_use]
    pub fn transposed(&self) -> Self {
        Self {
            rows: self.columns.clone(),
            columns: self.rows.clone(),
        }
    }
}

/// `cells[i][j]` is the objective at `(rows[i], columns[j])`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub row_parameter: String,
    pub column_parameter: String,
    pub rows: Vec<ParamValue>,
    pub columns: Vec<ParamValue>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl Grid {
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.cells.get(row)?.get(column).copied().flatten()
    }

    /// Number of cells holding a value.
    #[must_use]
    pub fn filled(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }
}

/// Coordinates of one point on the grid axes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridMarker {
    pub row: ParamValue,
    pub column: ParamValue,
    pub value: Option<f64>,
}

/// Point overlays for a grid: every measurement plus the solution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridMarkers {
    pub measured: Vec<GridMarker>,
    pub solution: Option<GridMarker>,
}

pub struct GridProjector;

impl GridProjector {
    /// Project `store` onto the two axes.
    ///
    /// A cell looks up the full key whose axis positions hold the cell's
    /// values and whose other positions hold the None sentinel. With more
    /// than two parameters, cells without such an exact match stay empty.
    /// The grid always spans every declared value of both axes.
    pub fn project(
        store: &ResultStore,
        descriptor: &SearchSpaceDescriptor,
        axes: &GridAxes,
    ) -> Result<Grid> {
        let (row_at, row_domain, column_at, column_domain) = resolve(descriptor, axes)?;
        let width = descriptor.parameters().len();
        let objective = descriptor.objective().index;

        let cells = row_domain
            .values
            .iter()
            .map(|row| {
                column_domain
                    .values
                    .iter()
                    .map(|column| {
                        let mut tuple = vec![ParamValue::Missing; width];
                        tuple[row_at] = row.clone();
                        tuple[column_at] = column.clone();
                        store
                            .get(&KeyCodec::encode_values(&tuple))
                            .and_then(|record| record.scalar(objective))
                    })
                    .collect()
            })
            .collect();

        Ok(Grid {
            row_parameter: row_domain.name.clone(),
            column_parameter: column_domain.name.clone(),
            rows: row_domain.values.clone(),
            columns: column_domain.values.clone(),
            cells,
        })
    }

    /// Axis coordinates of every measurement and of the solution.
    pub fn markers(
        store: &ResultStore,
        solution: Option<&ResultRecord>,
        descriptor: &SearchSpaceDescriptor,
        axes: &GridAxes,
    ) -> Result<GridMarkers> {
        let (row_at, _, column_at, _) = resolve(descriptor, axes)?;
        let objective = descriptor.objective().index;
        let coordinate = |record: &ResultRecord, at: usize| {
            record
                .configuration
                .get(at)
                .cloned()
                .unwrap_or(ParamValue::Missing)
        };
        let marker = |record: &ResultRecord| GridMarker {
            row: coordinate(record, row_at),
            column: coordinate(record, column_at),
            value: record.scalar(objective),
        };

        Ok(GridMarkers {
            measured: store.all().iter().map(&marker).collect(),
            solution: solution.map(&marker),
        })
    }
}

fn resolve<'a>(
    descriptor: &'a SearchSpaceDescriptor,
    axes: &GridAxes,
) -> Result<(usize, &'a ParameterDomain, usize, &'a ParameterDomain)> {
    if axes.rows == axes.columns {
        return Err(Error::Config(format!(
            "grid axes must differ, got `{}` twice",
            axes.rows
        )));
    }
    let lookup = |name: &str| {
        descriptor
            .parameter(name)
            .ok_or_else(|| Error::Config(format!("unknown grid axis `{name}`")))
    };
    let (row_at, rows) = lookup(&axes.rows)?;
    let (column_at, columns) = lookup(&axes.columns)?;
    Ok((row_at, rows, column_at, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use crate::store::RecordOrigin;
    use serde_json::json;

    fn descriptor() -> SearchSpaceDescriptor {
        SearchSpaceDescriptor::new(
            vec![
                ParameterDomain::numeric("x", [1.0, 2.0]),
                ParameterDomain::numeric("y", [10.0, 20.0]),
            ],
            "value",
            Direction::Minimize,
        )
    }

    fn store_with(points: &[(f64, f64, f64)]) -> ResultStore {
        let descriptor = descriptor();
        let mut store = ResultStore::new();
        for &(x, y, v) in points {
            store.upsert(
                ResultRecord::new(
                    vec![x.into(), y.into()],
                    vec![json!(v)],
                    descriptor.parameters(),
                    RecordOrigin::New,
                )
                .unwrap(),
            );
        }
        store
    }

    #[test]
    fn single_point_lands_in_first_cell() {
        let store = store_with(&[(1.0, 10.0, 0.5)]);
        let grid = GridProjector::project(&store, &descriptor(), &GridAxes::new("y", "x")).unwrap();

        assert_eq!(grid.cells, vec![vec![Some(0.5), None], vec![None, None]]);
        assert_eq!(grid.rows, vec![ParamValue::Number(10.0), ParamValue::Number(20.0)]);
        assert_eq!(grid.columns, vec![ParamValue::Number(1.0), ParamValue::Number(2.0)]);
    }

    #[test]
    fn orientation_follows_caller_axes() {
        let store = store_with(&[(2.0, 10.0, 7.0)]);

        let rows_y = GridProjector::project(&store, &descriptor(), &GridAxes::new("y", "x")).unwrap();
        assert_eq!(rows_y.get(0, 1), Some(7.0));
        assert_eq!(rows_y.get(1, 0), None);

        let rows_x = GridProjector::project(
            &store,
            &descriptor(),
            &GridAxes::new("y", "x").transposed(),
        )
        .unwrap();
        assert_eq!(rows_x.row_parameter, "x");
        assert_eq!(rows_x.get(1, 0), Some(7.0));
        assert_eq!(rows_x.get(0, 1), None);
    }

    #[test]
    fn empty_store_still_spans_full_grid() {
        let grid = GridProjector::project(&ResultStore::new(), &descriptor(), &GridAxes::new("y", "x"))
            .unwrap();
        assert_eq!(grid.cells.len(), 2);
        assert!(grid.cells.iter().all(|row| row.len() == 2));
        assert_eq!(grid.filled(), 0);
    }

    #[test]
    fn higher_dimensional_points_without_exact_match_stay_empty() {
        let descriptor = SearchSpaceDescriptor::new(
            vec![
                ParameterDomain::numeric("x", [1.0, 2.0]),
                ParameterDomain::numeric("y", [10.0, 20.0]),
                ParameterDomain::categorical("mode", ["a", "b"]),
            ],
            "value",
            Direction::Minimize,
        );
        let mut store = ResultStore::new();
        store.upsert(
            ResultRecord::new(
                vec![1.0.into(), 10.0.into(), "a".into()],
                vec![json!(1.0)],
                descriptor.parameters(),
                RecordOrigin::New,
            )
            .unwrap(),
        );

        let grid = GridProjector::project(&store, &descriptor, &GridAxes::new("y", "x")).unwrap();
        assert_eq!(grid.filled(), 0);
        assert_eq!(grid.cells.len(), 2);
    }

    #[test]
    fn unknown_or_repeated_axis_is_config_error() {
        let store = ResultStore::new();
        for axes in [GridAxes::new("y", "z"), GridAxes::new("x", "x")] {
            assert!(matches!(
                GridProjector::project(&store, &descriptor(), &axes).unwrap_err(),
                Error::Config(_)
            ));
        }
    }

    #[test]
    fn markers_follow_axes() {
        let store = store_with(&[(1.0, 20.0, 3.0), (2.0, 10.0, 4.0)]);
        let solution = store.all()[1].clone();

        let markers =
            GridProjector::markers(&store, Some(&solution), &descriptor(), &GridAxes::new("y", "x"))
                .unwrap();

        assert_eq!(markers.measured.len(), 2);
        assert_eq!(markers.measured[0].row, ParamValue::Number(20.0));
        assert_eq!(markers.measured[0].column, ParamValue::Number(1.0));
        let solution = markers.solution.unwrap();
        assert_eq!(solution.row, ParamValue::Number(10.0));
        assert_eq!(solution.column, ParamValue::Number(2.0));
        assert_eq!(solution.value, Some(4.0));
    }
}
