//! Name ↔ id registry for cell types.

use hashbrown::HashMap;

use crate::model::{CellType, CellTypeId};

/// Allocates sequential [`CellTypeId`]s in first-encounter order.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    ids: HashMap<String, CellTypeId>,
    names: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing id for `name`, or the next free one.
    pub fn get_or_assign(&mut self, name: &str) -> CellTypeId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = CellTypeId(self.names.len() as u32);
        self.ids.insert(name.to_owned(), id);
        self.names.push(name.to_owned());
        id
    }

    pub fn id(&self, name: &str) -> Option<CellTypeId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: CellTypeId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All types in id order.
    pub fn iter(&self) -> impl Iterator<Item = (CellTypeId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (CellTypeId(i as u32), name.as_str()))
    }

    pub fn cell_type(&self, id: CellTypeId) -> Option<CellType> {
        self.name(id).map(|name| CellType::new(id, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sequential_assignment() {
        let mut reg = TypeRegistry::new();
        assert_eq!(reg.get_or_assign("L1_DAC"), CellTypeId(0));
        assert_eq!(reg.get_or_assign("L23_PC"), CellTypeId(1));
        assert_eq!(reg.get_or_assign("L1_DAC"), CellTypeId(0));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.name(CellTypeId(1)), Some("L23_PC"));
        assert_eq!(reg.id("L5_TTPC1"), None);
    }

    proptest! {
        #[test]
        fn assignment_is_idempotent_and_injective(names in prop::collection::vec("[A-Z][0-9]_[A-Za-z]{1,4}", 1..40)) {
            let mut reg = TypeRegistry::new();
            let first: Vec<CellTypeId> = names.iter().map(|n| reg.get_or_assign(n)).collect();
            let second: Vec<CellTypeId> = names.iter().map(|n| reg.get_or_assign(n)).collect();
            prop_assert_eq!(&first, &second);

            for (a, ida) in names.iter().zip(&first) {
                for (b, idb) in names.iter().zip(&first) {
                    prop_assert_eq!(a == b, ida == idb);
                }
            }

            let distinct: std::collections::BTreeSet<&String> = names.iter().collect();
            prop_assert_eq!(reg.len(), distinct.len());
        }
    }
}
