use burn::data::dataset::Dataset;

use crate::data::features::RelationFeature;

pub struct RelationDataset {
    features: Vec<RelationFeature>,
}

impl RelationDataset {
    pub fn new(features: Vec<RelationFeature>) -> Self { Self { features } }

    pub fn feature_count(&self) -> usize { self.features.len() }

    /// Examples whose label is missing from the label set.
    pub fn unlabelled_count(&self) -> usize {
        self.features.iter().filter(|f| f.label_id.is_none()).count()
    }
}

impl Dataset<RelationFeature> for RelationDataset {
    fn get(&self, index: usize) -> Option<RelationFeature> {
        self.features.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.features.len()
    }
}
