use std::ops::Index;

use crate::{Material, MaterialRecord};

/// Append-only table of flattened materials.
///
/// Every registration appends a new record, even if the same material has
/// been seen before; once assigned, an id never changes.
#[derive(Clone, Debug, Default)]
pub struct Materials {
    records: Vec<MaterialRecord>,
}

impl Materials {
    pub fn register(&mut self, material: &Material) -> MaterialId {
        self.records.push(material.build());

        MaterialId::new((self.records.len() - 1) as u32)
    }

    pub fn get(&self, id: MaterialId) -> Option<&MaterialRecord> {
        self.records.get(id.get() as usize)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialRecord> + '_ {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[MaterialRecord] {
        &self.records
    }
}

impl Index<MaterialId> for Materials {
    type Output = MaterialRecord;

    fn index(&self, index: MaterialId) -> &Self::Output {
        &self.records[index.get() as usize]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u32);

impl MaterialId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}
