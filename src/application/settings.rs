//! Read-through cache over the trade settings table.

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::adapter::outbound::sqlite::SqliteSettingsStore;
use crate::domain::setting::SettingName;
use crate::error::Result;

/// Trade settings, cached per name and invalidated on write.
///
/// A setting that was never stored is seeded with its default on first read.
pub struct TradeSettings {
    store: SqliteSettingsStore,
    cache: DashMap<SettingName, Decimal>,
}

impl TradeSettings {
    #[must_use]
    pub fn new(store: SqliteSettingsStore) -> Self {
        Self {
            store,
            cache: DashMap::new(),
        }
    }

    pub fn get(&self, name: SettingName) -> Result<Decimal> {
        if let Some(value) = self.cache.get(&name) {
            return Ok(*value);
        }

        let value = match self.store.get(name)? {
            Some(value) => value,
            None => {
                let value = name.default_value();
                self.store.set(name, value)?;
                info!(setting = %name, %value, "Seeded default trade setting");
                value
            }
        };
        self.cache.insert(name, value);
        Ok(value)
    }

    /// Writes through to the store and drops the cached value.
    ///
    /// The engine never writes settings; the operator front end and tests do.
    pub fn set(&self, name: SettingName, value: Decimal) -> Result<()> {
        self.store.set(name, value)?;
        self.cache.remove(&name);
        debug!(setting = %name, %value, "Trade setting updated");
        Ok(())
    }
}
