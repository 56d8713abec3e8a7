//! Per-cell taxon aggregation and Shannon diversity.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{HeatmapError, Result};
use crate::indexer::GridExtent;
use crate::types::{DiversityPoint, GridCell, Occurrence};

/// Count of occurrences per taxon within one cell.
///
/// Taxa are kept in sorted order so the entropy sum is evaluated in the same
/// order regardless of how occurrences arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonTally {
    counts: BTreeMap<String, usize>,
    total: usize,
}

impl TaxonTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `taxon_id`.
    pub fn add(&mut self, taxon_id: &str) {
        match self.counts.get_mut(taxon_id) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(taxon_id.to_string(), 1);
            }
        }
        self.total += 1;
    }

    /// Total occurrences recorded.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct taxa.
    pub fn richness(&self) -> usize {
        self.counts.len()
    }

    /// Shannon diversity index `H = -Σ p ln p` over the taxa present.
    ///
    /// An empty tally has no proportions and is rejected.
    pub fn shannon(&self) -> Result<f64> {
        if self.total == 0 {
            return Err(HeatmapError::invalid_input(
                "cannot compute diversity of a cell with zero occurrences",
            ));
        }

        let total = self.total as f64;
        let h = self
            .counts
            .values()
            .map(|&count| {
                let p = count as f64 / total;
                p * p.ln()
            })
            .sum::<f64>();

        // A single taxon gives 1 * ln(1) = 0; avoid reporting -0.0.
        Ok(if h == 0.0 { 0.0 } else { -h })
    }
}

impl<'a> FromIterator<&'a str> for TaxonTally {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tally = Self::new();
        for taxon in iter {
            tally.add(taxon);
        }
        tally
    }
}

/// Route every occurrence to its cell and tally taxa per occupied cell.
///
/// Only occupied cells appear in the result.
pub fn group_by_cell(occurrences: &[Occurrence], extent: &GridExtent) -> BTreeMap<GridCell, TaxonTally> {
    let mut cells: BTreeMap<GridCell, TaxonTally> = BTreeMap::new();
    for occurrence in occurrences {
        cells
            .entry(extent.cell_of(occurrence))
            .or_default()
            .add(&occurrence.taxon_id);
    }
    cells
}

/// Compute one [`DiversityPoint`] per occupied cell, ordered by cell index.
pub fn aggregate(occurrences: &[Occurrence], extent: &GridExtent) -> Result<Vec<DiversityPoint>> {
    if occurrences.is_empty() {
        return Err(HeatmapError::empty_input("no occurrences to aggregate"));
    }

    let cells = group_by_cell(occurrences, extent);

    let points = cells
        .into_iter()
        .map(|(cell, tally)| {
            let (x, y) = extent.centroid(cell)?;
            Ok(DiversityPoint {
                cell,
                x,
                y,
                shannon_diversity: tally.shannon()?,
                occurrence_count: tally.total(),
                taxon_richness: tally.richness(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        occurrences = occurrences.len(),
        occupied_cells = points.len(),
        "Aggregated occurrences into grid cells"
    );

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_taxon_is_zero() {
        let tally: TaxonTally = ["MX.1"; 7].into_iter().collect();
        assert_eq!(tally.shannon().unwrap(), 0.0);

        let one: TaxonTally = ["MX.1"].into_iter().collect();
        assert_eq!(one.shannon().unwrap(), 0.0);
    }

    #[test]
    fn test_even_taxa_give_ln_k() {
        for k in 2..=6 {
            let taxa: Vec<String> = (0..k).map(|i| format!("MX.{}", i)).collect();
            let tally: TaxonTally = taxa
                .iter()
                .flat_map(|t| std::iter::repeat(t.as_str()).take(3))
                .collect();
            assert_relative_eq!(tally.shannon().unwrap(), (k as f64).ln(), epsilon = 1e-12);
            assert_eq!(tally.richness(), k);
        }
    }

    #[test]
    fn test_three_to_one_split() {
        let tally: TaxonTally = ["A", "A", "B", "A"].into_iter().collect();
        let expected = -(0.75_f64 * 0.75_f64.ln() + 0.25_f64 * 0.25_f64.ln());
        assert_relative_eq!(tally.shannon().unwrap(), expected, epsilon = 1e-12);
        assert_relative_eq!(tally.shannon().unwrap(), 0.5623, epsilon = 1e-4);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.richness(), 2);
    }

    #[test]
    fn test_empty_tally_is_invalid() {
        let err = TaxonTally::new().shannon().unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_order_independent() {
        let forward: TaxonTally = ["a", "b", "c", "a", "b", "a", "d"].into_iter().collect();
        let reverse: TaxonTally = ["d", "a", "b", "a", "c", "b", "a"].into_iter().collect();
        assert_eq!(forward, reverse);
        assert_eq!(forward.shannon().unwrap(), reverse.shannon().unwrap());
    }

    #[test]
    fn test_aggregate_routes_every_occurrence() {
        let occurrences: Vec<Occurrence> = (0..50)
            .map(|i| {
                let x = (i * 7 % 43) as f64;
                let y = (i * 11 % 31) as f64;
                Occurrence::new(x, y, format!("t{}", i % 4))
            })
            .collect();
        let extent = GridExtent::from_occurrences(&occurrences, 10.0).unwrap();

        let cells = group_by_cell(&occurrences, &extent);
        let routed: usize = cells.values().map(TaxonTally::total).sum();
        assert_eq!(routed, occurrences.len());

        let points = aggregate(&occurrences, &extent).unwrap();
        assert_eq!(points.len(), cells.len());
        let counted: usize = points.iter().map(|p| p.occurrence_count).sum();
        assert_eq!(counted, occurrences.len());
    }

    #[test]
    fn test_aggregate_centroids() {
        let occurrences = vec![
            Occurrence::new(0.0, 0.0, "a"),
            Occurrence::new(3.0, 4.0, "b"),
            Occurrence::new(25.0, 15.0, "a"),
        ];
        let extent = GridExtent::new(BoundingBox::new(0.0, 0.0, 25.0, 15.0), 10.0).unwrap();
        let points = aggregate(&occurrences, &extent).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].cell, GridCell::new(1, 1));
        assert_eq!((points[0].x, points[0].y), (5.0, 5.0));
        assert_relative_eq!(points[0].shannon_diversity, 2.0_f64.ln(), epsilon = 1e-12);

        assert_eq!(points[1].cell, GridCell::new(3, 2));
        assert_eq!((points[1].x, points[1].y), (25.0, 15.0));
        assert_eq!(points[1].shannon_diversity, 0.0);
    }

    #[test]
    fn test_aggregate_empty() {
        let extent = GridExtent::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 1.0).unwrap();
        assert!(aggregate(&[], &extent).is_err());
    }
}
