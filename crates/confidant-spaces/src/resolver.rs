//! Resolves the shared unified spaces collection and per-group
//! collections (spec §6 "Storage layout"). An adapter's composition root
//! supplies the real implementation; `testing::InMemoryDestinations` below
//! is the fixture every test in this crate shares.

use std::sync::Arc;

use confidant_core::Collection;

pub trait DestinationCollections: Send + Sync {
    fn spaces_collection(&self) -> Arc<dyn Collection>;
    fn group_collection(&self, group_id: &str) -> Arc<dyn Collection>;
}

pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use confidant_core::testing::InMemoryCollection;

    use super::*;

    pub struct InMemoryDestinations {
        spaces: Arc<dyn Collection>,
        groups: Mutex<HashMap<String, Arc<dyn Collection>>>,
    }

    impl Default for InMemoryDestinations {
        fn default() -> Self {
            Self { spaces: Arc::new(InMemoryCollection::new()), groups: Mutex::new(HashMap::new()) }
        }
    }

    impl InMemoryDestinations {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DestinationCollections for InMemoryDestinations {
        fn spaces_collection(&self) -> Arc<dyn Collection> {
            self.spaces.clone()
        }

        fn group_collection(&self, group_id: &str) -> Arc<dyn Collection> {
            self.groups
                .lock()
                .expect("lock poisoned")
                .entry(group_id.to_string())
                .or_insert_with(|| Arc::new(InMemoryCollection::new()))
                .clone()
        }
    }
}
