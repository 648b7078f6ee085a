//! Upload queue construction and traversal.

use crate::model::{ArtifactType, CANONICAL_ORDER};
use std::collections::BTreeSet;

/// Ordered sequence of artifact types awaiting upload. Built once by the
/// wizard, then only traversed by position index; the driver owns the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadQueue {
    items: Vec<ArtifactType>,
}

impl UploadQueue {
    pub fn get(&self, position: usize) -> Option<ArtifactType> {
        self.items.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ArtifactType> + '_ {
        self.items.iter().copied()
    }
}

/// Build the upload queue from the user's selections: the canonical priority
/// order restricted to the selected tokens. Pure and idempotent; the wizard
/// guarantees 1..=3 selections before calling.
pub fn build_queue(selected: &BTreeSet<ArtifactType>) -> UploadQueue {
    UploadQueue {
        items: CANONICAL_ORDER
            .iter()
            .copied()
            .filter(|a| selected.contains(a))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtifactType::*;

    fn selection(items: &[ArtifactType]) -> BTreeSet<ArtifactType> {
        items.iter().copied().collect()
    }

    #[test]
    fn preserves_canonical_order() {
        let queue = build_queue(&selection(&[Ese, Resources]));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![Resources, Ese]);

        let queue = build_queue(&selection(&[Combined, Ise1, Subject]));
        assert_eq!(
            queue.iter().collect::<Vec<_>>(),
            vec![Subject, Ise1, Combined]
        );
    }

    #[test]
    fn idempotent_on_identical_input() {
        let sel = selection(&[Ise2, Resources, Ese]);
        assert_eq!(build_queue(&sel), build_queue(&sel));
    }

    #[test]
    fn full_selection_matches_canonical_order() {
        let queue = build_queue(&selection(&crate::model::CANONICAL_ORDER));
        assert_eq!(
            queue.iter().collect::<Vec<_>>(),
            crate::model::CANONICAL_ORDER.to_vec()
        );
    }

    #[test]
    fn traversal_by_position() {
        let queue = build_queue(&selection(&[Ise1, Ese]));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get(0), Some(Ese));
        assert_eq!(queue.get(1), Some(Ise1));
        assert_eq!(queue.get(2), None);
    }
}
