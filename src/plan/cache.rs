use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::error::SqlMapperError;

type Entry = Arc<dyn Any + Send + Sync>;

/// Type -> compiled plan memo table.
///
/// Compilation runs outside the lock, so concurrent first-time callers may each compile;
/// the first install wins and every caller gets that entry back. Failed compilations are
/// not stored. Entries live as long as the cache.
pub struct PlanCache {
    label: &'static str,
    plans: RwLock<HashMap<TypeId, Entry>>,
}

impl PlanCache {
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            plans: RwLock::new(HashMap::new()),
        }
    }

    /// The cached plan of type `P`, compiling it on a miss.
    ///
    /// # Errors
    /// Returns whatever `compile` returns; nothing is cached in that case.
    pub fn get_or_compile<P, F>(&self, compile: F) -> Result<Arc<P>, SqlMapperError>
    where
        P: Any + Send + Sync,
        F: FnOnce() -> Result<P, SqlMapperError>,
    {
        let key = TypeId::of::<P>();
        let existing = self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(entry) = existing {
            trace!(target: "sql_mapper::plan", cache = self.label, plan = std::any::type_name::<P>(), "plan cache hit");
            return Self::downcast(entry);
        }

        let compiled: Entry = Arc::new(compile()?);
        let canonical = {
            let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
            plans.entry(key).or_insert_with(|| Arc::clone(&compiled)).clone()
        };
        if !Arc::ptr_eq(&canonical, &compiled) {
            trace!(
                target: "sql_mapper::plan",
                cache = self.label,
                plan = std::any::type_name::<P>(),
                "lost plan install race; using the installed plan"
            );
        }
        Self::downcast(canonical)
    }

    fn downcast<P: Any + Send + Sync>(entry: Entry) -> Result<Arc<P>, SqlMapperError> {
        entry.downcast::<P>().map_err(|_| {
            SqlMapperError::ConfigError(format!(
                "plan cache entry is not a {}",
                std::any::type_name::<P>()
            ))
        })
    }

    /// Number of cached plans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanCache")
            .field("label", &self.label)
            .field("len", &self.len())
            .finish()
    }
}
