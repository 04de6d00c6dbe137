use std::io;
use std::path::Path;

use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::debug;

use crate::error::{Error, Result};
use crate::geometry::BoundingBox;

use super::SamplePoint;

type IndexedPoint = GeomWithData<[f64; 2], u32>;

/// Immutable, non-empty set of measurements with an R*-tree over their locations.
#[derive(Clone, Debug)]
pub struct PointSet {
    pub tree: RTree<IndexedPoint>,
    pub points: Vec<SamplePoint>,
    bounds: BoundingBox,
}

impl PointSet {
    pub fn new(points: Vec<SamplePoint>) -> Result<Self> {
        let bounds = BoundingBox::from_coords(points.iter().map(|p| (p.x, p.y)))
            .ok_or_else(|| Error::Input("point dataset is empty".into()))?;
        let bounds = BoundingBox::new(bounds.xmin, bounds.ymin, bounds.xmax, bounds.ymax)?;

        if let Some(i) = points.iter().position(|p| !p.value.is_finite()) {
            return Err(Error::Input(format!(
                "point {i} has a non-finite value {}",
                points[i].value
            )));
        }

        let tree_points = points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint::new([p.x, p.y], i as u32))
            .collect();
        let tree = RTree::bulk_load(tree_points);

        Ok(Self {
            tree,
            points,
            bounds,
        })
    }

    /// Read points from a csv file with a header row.
    /// # Arguments
    /// * `csv_path` - path to the csv file
    /// * `x_col` - name of the easting column
    /// * `y_col` - name of the northing column
    /// * `value_col` - name of the measured value column, blank cells skip the record
    pub fn from_csv_index(
        csv_path: impl AsRef<Path>,
        x_col: &str,
        y_col: &str,
        value_col: &str,
    ) -> Result<Self> {
        let rdr = csv::Reader::from_path(csv_path.as_ref())?;
        Self::from_csv_reader(rdr, x_col, y_col, value_col)
    }

    pub fn from_csv_reader<R: io::Read>(
        mut rdr: csv::Reader<R>,
        x_col: &str,
        y_col: &str,
        value_col: &str,
    ) -> Result<Self> {
        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| Error::Input(format!("missing column '{name}'")))
        };
        let (xi, yi, vi) = (column(x_col)?, column(y_col)?, column(value_col)?);

        //storage for data
        let mut points = Vec::new();
        let mut skipped = 0usize;

        for (line, result) in rdr.records().enumerate() {
            let record = result?;

            let value = record.get(vi).map(str::trim).unwrap_or("");
            if value.is_empty() {
                skipped += 1;
                continue;
            }

            let parse = |field: Option<&str>, name: &str| {
                let raw = field.map(str::trim).unwrap_or("");
                raw.parse::<f64>().map_err(|_| {
                    Error::Input(format!("record {}: cannot parse {name} '{raw}'", line + 1))
                })
            };

            let x = parse(record.get(xi), x_col)?;
            let y = parse(record.get(yi), y_col)?;
            let value = parse(Some(value), value_col)?;

            points.push(SamplePoint::new(x, y, value));
        }

        debug!(
            n_points = points.len(),
            skipped, "read point dataset, records without a value skipped"
        );
        Self::new(points)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false, empty sets cannot be built.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, ind: usize) -> Option<&SamplePoint> {
        self.points.get(ind)
    }

    pub fn points(&self) -> &[SamplePoint] {
        self.points.as_slice()
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// New set holding the points at `inds`, in the given order.
    pub fn subset(&self, inds: &[usize]) -> Result<Self> {
        let points = inds
            .iter()
            .map(|&i| {
                self.points.get(i).copied().ok_or_else(|| {
                    Error::Input(format!("index {i} out of range for {} points", self.len()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(points)
    }

    /// Nearest points to `(x, y)` within `radius`, closest first.
    /// Yields `(point, squared distance)`, at most `max_points` of them.
    pub fn nearest_within(
        &self,
        x: f64,
        y: f64,
        radius: f64,
        max_points: usize,
    ) -> impl Iterator<Item = (&SamplePoint, f64)> + '_ {
        let radius_sq = radius * radius;
        self.tree
            .nearest_neighbor_iter_with_distance_2(&[x, y])
            .take_while(move |(_, dist_sq)| *dist_sq <= radius_sq)
            .take(max_points)
            .map(|(point, dist_sq)| (&self.points[point.data as usize], dist_sq))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::Reader::from_reader(data.as_bytes())
    }

    #[test]
    fn csv_skips_missing_values() {
        let data = "x,y,watertable\n0,0,10\n1,0,\n1,1,30.5\n";
        let set = PointSet::from_csv_reader(reader(data), "x", "y", "watertable").unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1), Some(&SamplePoint::new(1.0, 1.0, 30.5)));
        assert_eq!(set.bounds().to_array(), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn csv_without_values_is_an_input_error() {
        let data = "x,y,watertable\n0,0,\n1,0,\n";
        let err = PointSet::from_csv_reader(reader(data), "x", "y", "watertable").unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn csv_reports_malformed_record() {
        let data = "x,y,watertable\n0,zero,10\n";
        let err = PointSet::from_csv_reader(reader(data), "x", "y", "watertable").unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }

    #[test]
    fn csv_missing_column() {
        let data = "x,y,elev\n0,0,10\n";
        let err = PointSet::from_csv_reader(reader(data), "x", "y", "watertable").unwrap_err();
        assert!(err.to_string().contains("watertable"));
    }

    #[test]
    fn nearest_within_radius_and_limit() {
        let points = (0..10)
            .map(|i| SamplePoint::new(i as f64, 0.0, i as f64))
            .collect();
        let set = PointSet::new(points).unwrap();

        let found = set
            .nearest_within(0.0, 0.0, 3.5, 100)
            .map(|(p, _)| p.value)
            .collect::<Vec<_>>();
        assert_eq!(found, vec![0.0, 1.0, 2.0, 3.0]);

        let limited = set.nearest_within(5.0, 0.0, 100.0, 3).count();
        assert_eq!(limited, 3);
    }

    #[test]
    fn subset_keeps_order() {
        let points = (0..5)
            .map(|i| SamplePoint::new(i as f64, i as f64, 10.0 * i as f64))
            .collect();
        let set = PointSet::new(points).unwrap();

        let sub = set.subset(&[3, 1]).unwrap();
        assert_eq!(sub.points()[0].value, 30.0);
        assert_eq!(sub.points()[1].value, 10.0);
        assert!(set.subset(&[9]).is_err());
    }
}
