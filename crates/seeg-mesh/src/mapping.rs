//! Region mapping across cortical and subcortical parcellations.
//!
//! Cortical and subcortical annotations number their regions independently.
//! [`Mapping`] gives them one unified numbering:
//!
//! ```text
//! 0                     "unknown"
//! 1 ..= L               "ctx-lh-<name>"   left cortical regions
//! L+1 ..= L+R           "ctx-rh-<name>"   right cortical regions
//! L+R+1 ..              subcortical lh names, then subcortical rh names
//! ```
//!
//! and translates per-vertex labels and third-party lookup tables into it.

use std::collections::{BTreeMap, HashMap};

use seeg_core::LutError;

use crate::annotation::Annotation;
use crate::error::MeshError;
use crate::lut::RegionLut;

/// Prefix of left-hemisphere cortical names in the unified table
pub const CTX_LH_PREFIX: &str = "ctx-lh-";
/// Prefix of right-hemisphere cortical names in the unified table
pub const CTX_RH_PREFIX: &str = "ctx-rh-";
/// Region name reserved for index 0 of the cortical table
pub const UNKNOWN_REGION: &str = "unknown";

/// Brain hemisphere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    /// Left hemisphere
    Left,
    /// Right hemisphere
    Right,
}

impl Hemisphere {
    /// Cortical name prefix for this hemisphere.
    #[must_use]
    pub const fn cortical_prefix(self) -> &'static str {
        match self {
            Self::Left => CTX_LH_PREFIX,
            Self::Right => CTX_RH_PREFIX,
        }
    }

    /// Unified cortical name of an annotation region; "unknown" stays bare.
    #[must_use]
    pub fn cortical_name(self, region: &str) -> String {
        if region == UNKNOWN_REGION {
            region.to_string()
        } else {
            format!("{}{region}", self.cortical_prefix())
        }
    }
}

/// Unified lookup tables plus the per-vertex region mappings derived from them.
#[derive(Clone, Debug)]
pub struct Mapping {
    cort_lut: RegionLut,
    subcort_lut: RegionLut,
    cort_region_mapping: Vec<Option<usize>>,
    subcort_region_mapping: Vec<Option<usize>>,
}

impl Mapping {
    /// Build the cortical and subcortical tables from the four annotations.
    ///
    /// Region mappings start empty; fill them with
    /// [`Mapping::generate_region_mapping_for_cort_annot`] and
    /// [`Mapping::generate_region_mapping_for_subcort_annot`].
    ///
    /// # Errors
    ///
    /// `Lut` if a hemisphere names the same region twice.
    pub fn new(
        cort_annot_lh: &Annotation,
        cort_annot_rh: &Annotation,
        subcort_annot_lh: &Annotation,
        subcort_annot_rh: &Annotation,
    ) -> Result<Self, MeshError> {
        let cort_lut = Self::cortical_lut(cort_annot_lh, cort_annot_rh)?;
        let subcort_lut = Self::subcortical_lut(subcort_annot_lh, subcort_annot_rh, cort_lut.end())?;

        tracing::debug!(
            cortical = cort_lut.len(),
            subcortical = subcort_lut.len(),
            "Built region lookup tables"
        );

        Ok(Self {
            cort_lut,
            subcort_lut,
            cort_region_mapping: Vec::new(),
            subcort_region_mapping: Vec::new(),
        })
    }

    fn cortical_lut(lh: &Annotation, rh: &Annotation) -> Result<RegionLut, LutError> {
        let mut lut = RegionLut::with_start(0);
        lut.push(UNKNOWN_REGION)?;
        for (hemi, annot) in [(Hemisphere::Left, lh), (Hemisphere::Right, rh)] {
            for name in annot.region_names().iter().filter(|n| *n != UNKNOWN_REGION) {
                lut.push(hemi.cortical_name(name))?;
            }
        }
        Ok(lut)
    }

    fn subcortical_lut(lh: &Annotation, rh: &Annotation, start: usize) -> Result<RegionLut, LutError> {
        let mut lut = RegionLut::with_start(start);
        for name in lh.region_names().iter().chain(rh.region_names()) {
            lut.push(name.as_str())?;
        }
        Ok(lut)
    }

    /// Cortical lookup table.
    #[must_use]
    pub fn cort_lut(&self) -> &RegionLut {
        &self.cort_lut
    }

    /// Subcortical lookup table.
    #[must_use]
    pub fn subcort_lut(&self) -> &RegionLut {
        &self.subcort_lut
    }

    /// Total number of regions in the unified numbering.
    #[must_use]
    pub fn nregions(&self) -> usize {
        self.cort_lut.len() + self.subcort_lut.len()
    }

    /// Cortical region of each vertex (lh vertices first).
    #[must_use]
    pub fn cort_region_mapping(&self) -> &[Option<usize>] {
        &self.cort_region_mapping
    }

    /// Subcortical region of each vertex (lh vertices first).
    #[must_use]
    pub fn subcort_region_mapping(&self) -> &[Option<usize>] {
        &self.subcort_region_mapping
    }

    /// Assign each cortical vertex its unified region index.
    ///
    /// Vertices whose region is absent from the cortical table map to `None`.
    pub fn generate_region_mapping_for_cort_annot(
        &mut self,
        lh_annot: &Annotation,
        rh_annot: &Annotation,
    ) -> &[Option<usize>] {
        let lut = &self.cort_lut;
        self.cort_region_mapping = [(Hemisphere::Left, lh_annot), (Hemisphere::Right, rh_annot)]
            .into_iter()
            .flat_map(|(hemi, annot)| {
                annot
                    .vertex_region_names()
                    .map(move |name| lut.index(&hemi.cortical_name(name)))
            })
            .collect();
        &self.cort_region_mapping
    }

    /// Assign each subcortical vertex its unified region index.
    pub fn generate_region_mapping_for_subcort_annot(
        &mut self,
        lh_annot: &Annotation,
        rh_annot: &Annotation,
    ) -> &[Option<usize>] {
        let lut = &self.subcort_lut;
        self.subcort_region_mapping = lh_annot
            .vertex_region_names()
            .chain(rh_annot.vertex_region_names())
            .map(|name| lut.index(name))
            .collect();
        &self.subcort_region_mapping
    }

    /// Unified index of every region name; subcortical entries win a clash.
    fn unified_indices(&self) -> HashMap<&str, usize> {
        self.cort_lut
            .iter()
            .chain(self.subcort_lut.iter())
            .map(|(index, name)| (name, index))
            .collect()
    }

    /// Translation from an external index→name table (e.g. a segmentation
    /// colour table) into the unified numbering.
    ///
    /// Every external index whose name is a unified region contributes
    /// `external → unified`, so several external indices may share a target;
    /// index 0 always maps to 0. External indices whose name is not a unified
    /// region are left out; [`Mapping::unmatched_external_indices`] lists them.
    #[must_use]
    pub fn get_index_mapping_for_lut(&self, external_lut: &BTreeMap<usize, String>) -> BTreeMap<usize, usize> {
        let unified = self.unified_indices();
        let mut src_to_trg: BTreeMap<usize, usize> = external_lut
            .iter()
            .filter_map(|(&src, name)| unified.get(name.as_str()).map(|&trg| (src, trg)))
            .collect();
        src_to_trg.insert(0, 0);

        let dropped = external_lut.keys().filter(|&k| !src_to_trg.contains_key(k)).count();
        if dropped > 0 {
            tracing::debug!(dropped, "External lookup table indices without a unified region");
        }

        src_to_trg
    }

    /// External indices that [`Mapping::get_index_mapping_for_lut`] drops.
    #[must_use]
    pub fn unmatched_external_indices(&self, external_lut: &BTreeMap<usize, String>) -> Vec<usize> {
        let unified = self.unified_indices();
        external_lut
            .iter()
            .filter(|&(&index, name)| index != 0 && !unified.contains_key(name.as_str()))
            .map(|(&index, _)| index)
            .collect()
    }

    /// All `(index, name)` entries, cortical then subcortical.
    pub fn lut_entries(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.cort_lut.iter().chain(self.subcort_lut.iter())
    }
}

/// Region mapping in on-disk form: unmapped vertices become `-1`.
#[must_use]
pub fn to_signed_region_mapping(mapping: &[Option<usize>]) -> Vec<i64> {
    mapping
        .iter()
        .map(|m| m.map_or(-1, |i| i64::try_from(i).unwrap_or(i64::MAX)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annot(names: &[&str], labels: &[usize]) -> Annotation {
        Annotation::new(names.iter().map(|s| (*s).to_string()).collect(), labels.to_vec()).unwrap()
    }

    fn example_mapping() -> (Mapping, [Annotation; 4]) {
        let cort_lh = annot(&["unknown", "bankssts", "insula"], &[0, 1, 2, 2]);
        let cort_rh = annot(&["unknown", "bankssts"], &[1, 0]);
        let sub_lh = annot(&["Left-Thalamus", "Left-Putamen"], &[0, 1, 1]);
        let sub_rh = annot(&["Right-Thalamus"], &[0, 0]);
        let mapping = Mapping::new(&cort_lh, &cort_rh, &sub_lh, &sub_rh).unwrap();
        (mapping, [cort_lh, cort_rh, sub_lh, sub_rh])
    }

    #[test]
    fn test_cortical_lut_single_hemisphere() {
        let lh = annot(&["unknown", "bankssts"], &[0, 1]);
        let empty = Annotation::default();
        let mapping = Mapping::new(&lh, &empty, &empty, &empty).unwrap();

        let entries: Vec<_> = mapping.cort_lut().iter().collect();
        assert_eq!(entries, vec![(0, "unknown"), (1, "ctx-lh-bankssts")]);
        assert!(mapping.subcort_lut().is_empty());
        assert_eq!(mapping.subcort_lut().start(), 2);
    }

    #[test]
    fn test_lut_numbering() {
        let (mapping, _) = example_mapping();
        let cort: Vec<_> = mapping.cort_lut().iter().collect();
        assert_eq!(
            cort,
            vec![
                (0, "unknown"),
                (1, "ctx-lh-bankssts"),
                (2, "ctx-lh-insula"),
                (3, "ctx-rh-bankssts"),
            ]
        );
        let sub: Vec<_> = mapping.subcort_lut().iter().collect();
        assert_eq!(sub, vec![(4, "Left-Thalamus"), (5, "Left-Putamen"), (6, "Right-Thalamus")]);
        assert_eq!(mapping.nregions(), 7);
    }

    #[test]
    fn test_construction_is_deterministic() {
        let (first, annots) = example_mapping();
        let second = Mapping::new(&annots[0], &annots[1], &annots[2], &annots[3]).unwrap();
        assert_eq!(first.cort_lut(), second.cort_lut());
        assert_eq!(first.subcort_lut(), second.subcort_lut());
    }

    #[test]
    fn test_cortical_region_mapping() {
        let (mut mapping, [lh, rh, _, _]) = example_mapping();
        let rm = mapping.generate_region_mapping_for_cort_annot(&lh, &rh).to_vec();
        assert_eq!(rm, vec![Some(0), Some(1), Some(2), Some(2), Some(3), Some(0)]);
        assert_eq!(mapping.cort_region_mapping(), rm.as_slice());
    }

    #[test]
    fn test_cortical_region_mapping_unknown_name() {
        let (mut mapping, [lh, _, _, _]) = example_mapping();
        let stranger = annot(&["precuneus"], &[0]);
        let rm = mapping.generate_region_mapping_for_cort_annot(&lh, &stranger);
        assert_eq!(rm.last(), Some(&None));
    }

    #[test]
    fn test_subcortical_region_mapping() {
        let (mut mapping, [_, _, sub_lh, sub_rh]) = example_mapping();
        let rm = mapping.generate_region_mapping_for_subcort_annot(&sub_lh, &sub_rh);
        assert_eq!(rm, &[Some(4), Some(5), Some(5), Some(6), Some(6)]);
    }

    #[test]
    fn test_duplicate_cortical_name_is_rejected() {
        let lh = annot(&["unknown", "insula", "insula"], &[0]);
        let empty = Annotation::default();
        let err = Mapping::new(&lh, &empty, &empty, &empty).unwrap_err();
        assert!(matches!(err, MeshError::Lut(LutError::NameCollision { .. })));
    }

    #[test]
    fn test_index_mapping_for_lut() {
        let (mapping, _) = example_mapping();
        let external: BTreeMap<usize, String> = [
            (0, "Unknown"),
            (10, "Left-Thalamus"),
            (49, "Right-Thalamus"),
            (1001, "ctx-lh-bankssts"),
            (2001, "ctx-rh-bankssts"),
            (77, "WM-hypointensities"),
        ]
        .into_iter()
        .map(|(i, n)| (i, n.to_string()))
        .collect();

        let translation = mapping.get_index_mapping_for_lut(&external);
        let expected: BTreeMap<usize, usize> =
            [(0, 0), (10, 4), (49, 6), (1001, 1), (2001, 3)].into_iter().collect();
        assert_eq!(translation, expected);
        assert_eq!(mapping.unmatched_external_indices(&external), vec![77]);
    }

    #[test]
    fn test_index_mapping_shared_external_names() {
        let (mapping, _) = example_mapping();
        let external: BTreeMap<usize, String> = [
            (10, "Left-Thalamus"),
            (11, "Left-Thalamus"),
            (12, "Left-Thalamus-Proper"),
        ]
        .into_iter()
        .map(|(i, n)| (i, n.to_string()))
        .collect();

        let translation = mapping.get_index_mapping_for_lut(&external);
        let expected: BTreeMap<usize, usize> = [(0, 0), (10, 4), (11, 4)].into_iter().collect();
        assert_eq!(translation, expected);
        assert_eq!(mapping.unmatched_external_indices(&external), vec![12]);
    }

    #[test]
    fn test_index_mapping_zero_is_fixed() {
        let (mapping, _) = example_mapping();
        let external: BTreeMap<usize, String> =
            [(0, "ctx-lh-insula".to_string())].into_iter().collect();
        let translation = mapping.get_index_mapping_for_lut(&external);
        assert_eq!(translation.get(&0), Some(&0));
    }

    #[test]
    fn test_signed_region_mapping() {
        assert_eq!(to_signed_region_mapping(&[Some(3), None, Some(0)]), vec![3, -1, 0]);
    }
}
