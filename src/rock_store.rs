use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex};
use rocksdb::{DB, Options, WriteBatch};
use crate::error::{SimError, SimResult};
use crate::planet::Planet;
use crate::plate::{Plate, Platelet};
use crate::sim::Simulation;
use crate::store::{Collection, Index, Record, SimStore};

/// A collection living under `T::PREFIX` in a RocksDB keyspace shared with
/// the other entity types.
pub struct RocksCollection<T: Record> {
    db: Arc<DB>,
    // serializes read-modify-write in `mutate`
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> RocksCollection<T> {
    pub fn new(db: Arc<DB>) -> Self {
        RocksCollection {
            db,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    fn db_key(key: &str) -> Vec<u8> {
        let mut db_key = T::PREFIX.as_bytes().to_vec();
        db_key.extend_from_slice(key.as_bytes());
        db_key
    }

    fn each<F>(&self, callback: F) -> SimResult<()>
    where
        F: FnMut(T),
    {
        self.each_under(T::PREFIX.as_bytes(), callback)
    }

    /// Visits records whose full db key starts with `prefix`; stops at the
    /// first key past it since keys are sorted.
    fn each_under<F>(&self, prefix: &[u8], mut callback: F) -> SimResult<()>
    where
        F: FnMut(T),
    {
        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            callback(bincode::deserialize(&value)?);
        }
        Ok(())
    }
}

impl<T: Record> Collection<T> for RocksCollection<T> {
    fn get(&self, key: &str) -> SimResult<Option<T>> {
        match self.db.get(Self::db_key(key))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn set(&self, record: &T) -> SimResult<()> {
        let value = bincode::serialize(record)?;
        self.db.put(Self::db_key(&record.key()), value)?;
        Ok(())
    }

    fn set_many(&self, records: &[T]) -> SimResult<()> {
        let mut batch = WriteBatch::default();
        for record in records {
            batch.put(Self::db_key(&record.key()), bincode::serialize(record)?);
        }
        self.db.write(batch)?;
        Ok(())
    }

    fn mutate(&self, key: &str, updater: &mut dyn FnMut(&mut T)) -> SimResult<Option<T>> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SimError::Storage("rocks write lock poisoned".to_string()))?;
        let Some(mut record) = self.get(key)? else {
            return Ok(None);
        };
        updater(&mut record);
        self.set(&record)?;
        Ok(Some(record))
    }

    fn delete(&self, key: &str) -> SimResult<bool> {
        let db_key = Self::db_key(key);
        if self.db.get(&db_key)?.is_none() {
            return Ok(false);
        }
        self.db.delete(db_key)?;
        Ok(true)
    }

    fn delete_many(&self, keys: &[String]) -> SimResult<usize> {
        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for key in keys {
            let db_key = Self::db_key(key);
            if self.db.get(&db_key)?.is_some() {
                batch.delete(db_key);
                removed += 1;
            }
        }
        self.db.write(batch)?;
        Ok(removed)
    }

    fn find(&self, index: Index, value: &str) -> SimResult<Vec<T>> {
        let mut found = Vec::new();
        let mut keep = |record: T| {
            if record.index_value(index).as_deref() == Some(value) {
                found.push(record);
            }
        };
        match T::index_key_prefix(index, value) {
            Some(sub) => self.each_under(&Self::db_key(&sub), &mut keep)?,
            None => self.each(&mut keep)?,
        }
        Ok(found)
    }

    fn all(&self) -> SimResult<Vec<T>> {
        let mut found = Vec::new();
        self.each(|record: T| found.push(record))?;
        Ok(found)
    }

    fn count(&self) -> SimResult<usize> {
        let mut count = 0;
        self.each(|_: T| count += 1)?;
        Ok(count)
    }
}

pub struct RockStore;

impl RockStore {
    /// Opens (or creates) a RocksDB database and exposes it as a [`SimStore`].
    pub fn open<P: AsRef<Path>>(path: P) -> SimResult<SimStore> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = Arc::new(DB::open(&opts, path)?);
        Ok(SimStore {
            sims: Arc::new(RocksCollection::<Simulation>::new(db.clone())),
            planets: Arc::new(RocksCollection::<Planet>::new(db.clone())),
            plates: Arc::new(RocksCollection::<Plate>::new(db.clone())),
            platelets: Arc::new(RocksCollection::<Platelet>::new(db)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EARTH;
    use crate::plate::PlateParams;
    use glam::Vec3;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn plate(planet_id: Uuid) -> Plate {
        Plate::new(PlateParams {
            name: "rock".to_string(),
            position: Vec3::Y,
            radius_km: 700.0,
            thickness_km: 25.0,
            density: 3.1,
            planet_id,
            planet_radius_km: EARTH.radius_km,
        })
        .unwrap()
    }

    #[test]
    fn plates_round_trip_through_rocksdb() {
        let dir = tempdir().expect("create temp dir");
        let store = RockStore::open(dir.path().join("db")).unwrap();

        store.planets.set(&EARTH).unwrap();
        let a = plate(EARTH.id);
        let b = plate(EARTH.id);
        store.plates.set_many(&[a.clone(), b.clone()]).unwrap();

        assert_eq!(store.planet(EARTH.id).unwrap(), *EARTH);
        assert_eq!(store.plate(a.id).unwrap(), a);
        assert_eq!(store.plates.count().unwrap(), 2);
        assert_eq!(store.planets.count().unwrap(), 1);
        assert_eq!(store.plates_for_planet(EARTH.id).unwrap().len(), 2);

        store
            .plates
            .mutate(&b.key(), &mut |plate| plate.thickness_km = 40.0)
            .unwrap();
        assert_eq!(store.plate(b.id).unwrap().thickness_km, 40.0);

        assert_eq!(store.plates.delete_many(&[a.key(), b.key()]).unwrap(), 2);
        assert_eq!(store.plates.count().unwrap(), 0);
    }

    #[test]
    fn platelets_are_found_by_plate_prefix() {
        let dir = tempdir().unwrap();
        let store = RockStore::open(dir.path().join("db")).unwrap();
        let a = plate(EARTH.id);
        let b = plate(EARTH.id);
        let cells = [
            h3o::LatLng::new(12.0, 34.0).unwrap().to_cell(h3o::Resolution::Three),
            h3o::LatLng::new(-40.0, 120.0).unwrap().to_cell(h3o::Resolution::Three),
        ];

        for p in [&a, &b] {
            let platelets: Vec<Platelet> = cells
                .iter()
                .map(|&cell| Platelet::for_cell(p, cell, p.position, 60.0))
                .collect();
            store.platelets.set_many(&platelets).unwrap();
        }

        let found = store.platelets_for_plate(a.id).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.plate_id == a.id));
        assert_eq!(store.platelets.find(Index::PlanetId, &EARTH.id.to_string()).unwrap().len(), 4);
        assert_eq!(store.platelets.count().unwrap(), 4);
    }

    #[test]
    fn reopened_store_keeps_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        let p = plate(EARTH.id);
        {
            let store = RockStore::open(&path).unwrap();
            store.plates.set(&p).unwrap();
        }
        let store = RockStore::open(&path).unwrap();
        assert_eq!(store.plate(p.id).unwrap(), p);
    }
}
