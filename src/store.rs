//! Keyed collections, one per entity type.
//!
//! A [`Collection`] is only atomic per key: `mutate` reads, updates and
//! writes one record under the collection's own guard, but nothing spans
//! several keys. Engines that rewrite a neighbor graph therefore work one
//! plate at a time.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use crate::error::{SimError, SimResult};
use crate::planet::Planet;
use crate::plate::{Plate, Platelet};
use crate::sim::Simulation;

/// Fields a collection can be searched by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    SimId,
    PlanetId,
    PlateId,
}

pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Key prefix in a shared keyspace, e.g. `"plate:"`.
    const PREFIX: &'static str;

    fn key(&self) -> String;

    fn index_value(&self, index: Index) -> Option<String>;

    /// Key prefix shared by every record whose `index` equals `value`,
    /// when keys are laid out that way.
    fn index_key_prefix(_index: Index, _value: &str) -> Option<String> {
        None
    }
}

impl Record for Simulation {
    const PREFIX: &'static str = "sim:";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn index_value(&self, index: Index) -> Option<String> {
        match index {
            Index::SimId => Some(self.id.to_string()),
            Index::PlanetId => self.planet_id.map(|id| id.to_string()),
            Index::PlateId => None,
        }
    }
}

impl Record for Planet {
    const PREFIX: &'static str = "planet:";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn index_value(&self, index: Index) -> Option<String> {
        match index {
            Index::SimId => Some(self.sim_id.to_string()),
            Index::PlanetId => Some(self.id.to_string()),
            Index::PlateId => None,
        }
    }
}

impl Record for Plate {
    const PREFIX: &'static str = "plate:";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn index_value(&self, index: Index) -> Option<String> {
        match index {
            Index::SimId => None,
            Index::PlanetId => Some(self.planet_id.to_string()),
            Index::PlateId => Some(self.id.to_string()),
        }
    }
}

impl Record for Platelet {
    const PREFIX: &'static str = "platelet:";

    fn key(&self) -> String {
        self.id.clone()
    }

    // ids are "{plate_id}-{cell}"
    fn index_key_prefix(index: Index, value: &str) -> Option<String> {
        match index {
            Index::PlateId => Some(format!("{}-", value)),
            _ => None,
        }
    }

    fn index_value(&self, index: Index) -> Option<String> {
        match index {
            Index::SimId => None,
            Index::PlanetId => Some(self.planet_id.to_string()),
            Index::PlateId => Some(self.plate_id.to_string()),
        }
    }
}

pub trait Collection<T: Record>: Send + Sync {
    fn get(&self, key: &str) -> SimResult<Option<T>>;

    fn set(&self, record: &T) -> SimResult<()>;

    fn set_many(&self, records: &[T]) -> SimResult<()> {
        for record in records {
            self.set(record)?;
        }
        Ok(())
    }

    /// Applies `updater` to the stored record and persists it; `None` when absent.
    fn mutate(&self, key: &str, updater: &mut dyn FnMut(&mut T)) -> SimResult<Option<T>>;

    /// Returns whether a record was removed.
    fn delete(&self, key: &str) -> SimResult<bool>;

    fn delete_many(&self, keys: &[String]) -> SimResult<usize> {
        let mut removed = 0;
        for key in keys {
            if self.delete(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn find(&self, index: Index, value: &str) -> SimResult<Vec<T>>;

    fn all(&self) -> SimResult<Vec<T>>;

    fn count(&self) -> SimResult<usize>;
}

/// Collection backed by a guarded `HashMap`.
pub struct MemCollection<T: Record> {
    records: RwLock<HashMap<String, T>>,
}

impl<T: Record> Default for MemCollection<T> {
    fn default() -> Self {
        MemCollection {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Record> MemCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E>(_: E) -> SimError {
    SimError::Storage("collection lock poisoned".to_string())
}

impl<T: Record> Collection<T> for MemCollection<T> {
    fn get(&self, key: &str) -> SimResult<Option<T>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(key).cloned())
    }

    fn set(&self, record: &T) -> SimResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(record.key(), record.clone());
        Ok(())
    }

    fn set_many(&self, batch: &[T]) -> SimResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        for record in batch {
            records.insert(record.key(), record.clone());
        }
        Ok(())
    }

    fn mutate(&self, key: &str, updater: &mut dyn FnMut(&mut T)) -> SimResult<Option<T>> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.get_mut(key).map(|record| {
            updater(record);
            record.clone()
        }))
    }

    fn delete(&self, key: &str) -> SimResult<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.remove(key).is_some())
    }

    fn delete_many(&self, keys: &[String]) -> SimResult<usize> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(keys.iter().filter(|key| records.remove(*key).is_some()).count())
    }

    fn find(&self, index: Index, value: &str) -> SimResult<Vec<T>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .filter(|record| record.index_value(index).as_deref() == Some(value))
            .cloned()
            .collect())
    }

    fn all(&self) -> SimResult<Vec<T>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.values().cloned().collect())
    }

    fn count(&self) -> SimResult<usize> {
        Ok(self.records.read().map_err(poisoned)?.len())
    }
}

/// One collection per entity type, shared by every engine.
#[derive(Clone)]
pub struct SimStore {
    pub sims: Arc<dyn Collection<Simulation>>,
    pub planets: Arc<dyn Collection<Planet>>,
    pub plates: Arc<dyn Collection<Plate>>,
    pub platelets: Arc<dyn Collection<Platelet>>,
}

impl SimStore {
    pub fn in_memory() -> Self {
        SimStore {
            sims: Arc::new(MemCollection::<Simulation>::new()),
            planets: Arc::new(MemCollection::<Planet>::new()),
            plates: Arc::new(MemCollection::<Plate>::new()),
            platelets: Arc::new(MemCollection::<Platelet>::new()),
        }
    }

    pub fn sim(&self, id: Uuid) -> SimResult<Simulation> {
        self.sims
            .get(&id.to_string())?
            .ok_or_else(|| SimError::not_found("simulation", id))
    }

    pub fn planet(&self, id: Uuid) -> SimResult<Planet> {
        self.planets
            .get(&id.to_string())?
            .ok_or_else(|| SimError::not_found("planet", id))
    }

    pub fn plate(&self, id: Uuid) -> SimResult<Plate> {
        self.plates
            .get(&id.to_string())?
            .ok_or_else(|| SimError::not_found("plate", id))
    }

    pub fn plates_for_planet(&self, planet_id: Uuid) -> SimResult<Vec<Plate>> {
        let mut plates = self.plates.find(Index::PlanetId, &planet_id.to_string())?;
        plates.sort_by_key(|plate| plate.id);
        Ok(plates)
    }

    /// Every platelet record of the plate, removed ones included.
    pub fn platelets_for_plate(&self, plate_id: Uuid) -> SimResult<Vec<Platelet>> {
        self.platelets.find(Index::PlateId, &plate_id.to_string())
    }

    pub fn live_platelets_for_plate(&self, plate_id: Uuid) -> SimResult<Vec<Platelet>> {
        let mut platelets: Vec<Platelet> = self
            .platelets_for_plate(plate_id)?
            .into_iter()
            .filter(Platelet::is_active)
            .collect();
        platelets.sort_by_key(|p| p.cell);
        Ok(platelets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EARTH;
    use crate::plate::PlateParams;
    use glam::Vec3;

    fn plate(planet_id: Uuid) -> Plate {
        Plate::new(PlateParams {
            name: "p".to_string(),
            position: Vec3::X,
            radius_km: 500.0,
            thickness_km: 20.0,
            density: 2.9,
            planet_id,
            planet_radius_km: EARTH.radius_km,
        })
        .unwrap()
    }

    #[test]
    fn set_get_delete() {
        let store = SimStore::in_memory();
        let p = plate(EARTH.id);
        store.plates.set(&p).unwrap();
        assert_eq!(store.plate(p.id).unwrap(), p);
        assert_eq!(store.plates.count().unwrap(), 1);
        assert!(store.plates.delete(&p.key()).unwrap());
        assert!(!store.plates.delete(&p.key()).unwrap());
        assert!(store.plate(p.id).unwrap_err().is_not_found());
    }

    #[test]
    fn mutate_updates_in_place() {
        let store = SimStore::in_memory();
        let p = plate(EARTH.id);
        store.plates.set(&p).unwrap();
        let updated = store
            .plates
            .mutate(&p.key(), &mut |plate| plate.name = "renamed".to_string())
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(store.plate(p.id).unwrap().name, "renamed");
        assert!(store.plates.mutate("missing", &mut |_| {}).unwrap().is_none());
    }

    #[test]
    fn find_by_index() {
        let store = SimStore::in_memory();
        let other = Uuid::new_v4();
        store
            .plates
            .set_many(&[plate(EARTH.id), plate(EARTH.id), plate(other)])
            .unwrap();
        assert_eq!(store.plates_for_planet(EARTH.id).unwrap().len(), 2);
        assert_eq!(store.plates_for_planet(other).unwrap().len(), 1);
        assert_eq!(store.plates.all().unwrap().len(), 3);
    }

    #[test]
    fn platelet_keys_group_by_plate() {
        let p = plate(EARTH.id);
        let cell = h3o::LatLng::new(12.0, 34.0).unwrap().to_cell(h3o::Resolution::Three);
        let platelet = Platelet::for_cell(&p, cell, p.position, 60.0);
        let prefix = Platelet::index_key_prefix(Index::PlateId, &p.id.to_string()).unwrap();
        assert!(platelet.key().starts_with(&prefix));
        assert!(Platelet::index_key_prefix(Index::PlanetId, &EARTH.id.to_string()).is_none());
        assert!(Plate::index_key_prefix(Index::PlateId, &p.id.to_string()).is_none());
    }

    #[test]
    fn delete_many_counts_only_present_keys() {
        let store = SimStore::in_memory();
        let a = plate(EARTH.id);
        let b = plate(EARTH.id);
        store.plates.set_many(&[a.clone(), b.clone()]).unwrap();
        let removed = store
            .plates
            .delete_many(&[a.key(), "nope".to_string(), b.key()])
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.plates.count().unwrap(), 0);
    }
}
