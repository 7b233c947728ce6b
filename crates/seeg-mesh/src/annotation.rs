//! Per-vertex parcellation labels.

use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// Region names plus one label (index into the names) per vertex.
///
/// Every label is checked against the names on construction, including
/// when deserialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AnnotationData")]
pub struct Annotation {
    region_names: Vec<String>,
    region_mapping: Vec<usize>,
}

/// Unchecked wire form of an [`Annotation`].
#[derive(Deserialize)]
struct AnnotationData {
    region_names: Vec<String>,
    region_mapping: Vec<usize>,
}

impl TryFrom<AnnotationData> for Annotation {
    type Error = MeshError;

    fn try_from(data: AnnotationData) -> Result<Self, Self::Error> {
        Self::new(data.region_names, data.region_mapping)
    }
}

impl Annotation {
    /// Create an annotation, checking every label names a region.
    ///
    /// # Errors
    ///
    /// `LabelOutOfRange` for the first vertex with an unknown label.
    pub fn new(region_names: Vec<String>, region_mapping: Vec<usize>) -> Result<Self, MeshError> {
        let annot = Self {
            region_names,
            region_mapping,
        };
        annot.validate()?;
        Ok(annot)
    }

    /// Decode an annotation from JSON and validate it.
    ///
    /// # Errors
    ///
    /// `InvalidAnnotation` for malformed JSON, `LabelOutOfRange` otherwise.
    pub fn from_json(json: &str) -> Result<Self, MeshError> {
        let data: AnnotationData = serde_json::from_str(json)?;
        data.try_into()
    }

    fn validate(&self) -> Result<(), MeshError> {
        let nregions = self.region_names.len();
        match self.region_mapping.iter().enumerate().find(|&(_, &l)| l >= nregions) {
            Some((vertex, &label)) => Err(MeshError::LabelOutOfRange {
                vertex,
                label,
                nregions,
            }),
            None => Ok(()),
        }
    }

    /// Region names in label order.
    #[must_use]
    pub fn region_names(&self) -> &[String] {
        &self.region_names
    }

    /// Label of each vertex.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.region_mapping
    }

    /// Number of labelled vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.region_mapping.len()
    }

    /// Check if no vertex is labelled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.region_mapping.is_empty()
    }

    /// Region name of each vertex, in vertex order.
    pub fn vertex_region_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.region_mapping.iter().map(|&l| self.region_names[l].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_region_names() {
        let annot = Annotation::new(
            vec!["unknown".into(), "bankssts".into()],
            vec![1, 0, 1],
        )
        .unwrap();
        let names: Vec<_> = annot.vertex_region_names().collect();
        assert_eq!(names, vec!["bankssts", "unknown", "bankssts"]);
    }

    #[test]
    fn test_label_out_of_range() {
        let err = Annotation::new(vec!["unknown".into()], vec![0, 2]).unwrap_err();
        assert!(matches!(err, MeshError::LabelOutOfRange { vertex: 1, label: 2, .. }));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"region_names": ["unknown", "insula"], "region_mapping": [0, 1, 1]}"#;
        let annot = Annotation::from_json(json).unwrap();
        assert_eq!(annot.len(), 3);

        assert!(Annotation::from_json(r#"{"region_names": []}"#).is_err());
    }

    #[test]
    fn test_deserialize_checks_labels() {
        let json = r#"{"region_names": ["unknown"], "region_mapping": [0, 3]}"#;
        assert!(serde_json::from_str::<Annotation>(json).is_err());
        assert!(matches!(
            Annotation::from_json(json),
            Err(MeshError::LabelOutOfRange { vertex: 1, label: 3, .. })
        ));

        let annot: Annotation = serde_json::from_str(r#"{"region_names": ["a", "b"], "region_mapping": [1]}"#).unwrap();
        assert_eq!(annot.region_names(), ["a", "b"]);
        assert_eq!(annot.labels(), [1]);
    }
}
