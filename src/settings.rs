//! Store settings service
//!
//! Settings live in memory behind a lock and are written through to a
//! [`SettingsStore`] after every successful change. Every mutation validates
//! the shipping and payment invariants before anything is persisted:
//!
//! - exactly one default shipping option while options exist, and the default
//!   option cannot be deleted, nor the last remaining one;
//! - distance-based options carry base price, price per km and max distance;
//! - at least one payment method stays enabled, and the default is enabled.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use redb::{Database, ReadableDatabase};
use tracing::info;

use crate::database::TABLE_SETTINGS;
use crate::error::SettingsError;
use crate::model::{PaymentMethod, ShippingOption, StoreLocation, StoreSettings};

/// Persistence port for store settings
pub trait SettingsStore: Send + Sync {
    /// Returns `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<StoreSettings>, SettingsError>;
    fn save(&self, settings: &StoreSettings) -> Result<(), SettingsError>;
}

const SETTINGS_KEY: &str = "store";

/// Keeps settings as one JSON row in the catalog database
pub struct RedbSettingsStore {
    db: Arc<Database>,
}

impl RedbSettingsStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

fn persistence(e: impl std::fmt::Display) -> SettingsError {
    SettingsError::Persistence(e.to_string())
}

impl SettingsStore for RedbSettingsStore {
    fn load(&self) -> Result<Option<StoreSettings>, SettingsError> {
        let read_txn = self.db.begin_read().map_err(persistence)?;
        let table = read_txn.open_table(TABLE_SETTINGS).map_err(persistence)?;

        match table.get(SETTINGS_KEY).map_err(persistence)? {
            Some(value) => serde_json::from_str(value.value())
                .map(Some)
                .map_err(persistence),
            None => Ok(None),
        }
    }

    fn save(&self, settings: &StoreSettings) -> Result<(), SettingsError> {
        let json = serde_json::to_string(settings).map_err(persistence)?;

        let write_txn = self.db.begin_write().map_err(persistence)?;
        {
            let mut table = write_txn.open_table(TABLE_SETTINGS).map_err(persistence)?;
            table
                .insert(SETTINGS_KEY, json.as_str())
                .map_err(persistence)?;
        }
        write_txn.commit().map_err(persistence)
    }
}

/// Keeps settings in a pretty-printed JSON file
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self) -> Result<Option<StoreSettings>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(persistence)?;
        serde_json::from_str(&raw).map(Some).map_err(persistence)
    }

    fn save(&self, settings: &StoreSettings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings).map_err(persistence)?;
        fs::write(&self.path, json).map_err(persistence)
    }
}

/// In-memory settings with write-through persistence
pub struct SettingsService {
    settings: RwLock<StoreSettings>,
    store: Box<dyn SettingsStore>,
}

impl SettingsService {
    /// Loads stored settings, falling back to the defaults
    pub fn load(store: Box<dyn SettingsStore>) -> Result<Self, SettingsError> {
        let settings = match store.load()? {
            Some(settings) => settings,
            None => {
                info!("No stored settings found, using defaults");
                StoreSettings::default()
            }
        };

        Ok(Self {
            settings: RwLock::new(settings),
            store,
        })
    }

    /// Snapshot of the current settings
    pub fn settings(&self) -> StoreSettings {
        self.read().clone()
    }

    pub fn shipping_options(&self) -> Vec<ShippingOption> {
        self.read().shipping.options.clone()
    }

    pub fn store_location(&self) -> Option<StoreLocation> {
        self.read().shipping.store_location.clone()
    }

    /// Adds an option; it never becomes default unless it is the only one
    pub fn add_shipping_option(
        &self,
        mut option: ShippingOption,
    ) -> Result<ShippingOption, SettingsError> {
        if option.id.is_empty() {
            option.id = format!("shipping-{}", chrono::Utc::now().timestamp_millis());
        }

        self.mutate(|settings| {
            let options = &mut settings.shipping.options;
            if options.iter().any(|o| o.id == option.id) {
                return Err(SettingsError::DuplicateShippingOption(option.id.clone()));
            }
            check_complete(&option)?;

            option.is_default = options.is_empty();
            options.push(option.clone());
            Ok(option)
        })
    }

    /// Replaces an option, keeping its stored default flag
    pub fn update_shipping_option(
        &self,
        option: ShippingOption,
    ) -> Result<ShippingOption, SettingsError> {
        check_complete(&option)?;

        self.mutate(|settings| {
            let slot = settings
                .shipping
                .options
                .iter_mut()
                .find(|o| o.id == option.id)
                .ok_or_else(|| SettingsError::ShippingOptionNotFound(option.id.clone()))?;

            *slot = ShippingOption {
                is_default: slot.is_default,
                ..option
            };
            Ok(slot.clone())
        })
    }

    pub fn delete_shipping_option(&self, id: &str) -> Result<(), SettingsError> {
        self.mutate(|settings| {
            let options = &mut settings.shipping.options;
            let option = options
                .iter()
                .find(|o| o.id == id)
                .ok_or_else(|| SettingsError::ShippingOptionNotFound(id.to_string()))?;

            if options.len() <= 1 {
                return Err(SettingsError::DeleteLastShippingOption);
            }
            if option.is_default {
                return Err(SettingsError::DeleteDefaultShippingOption);
            }

            options.retain(|o| o.id != id);
            Ok(())
        })
    }

    pub fn set_default_shipping_option(&self, id: &str) -> Result<(), SettingsError> {
        self.mutate(|settings| {
            let options = &mut settings.shipping.options;
            if !options.iter().any(|o| o.id == id) {
                return Err(SettingsError::ShippingOptionNotFound(id.to_string()));
            }
            for option in options.iter_mut() {
                option.is_default = option.id == id;
            }
            Ok(())
        })
    }

    /// Replaces a payment method, keeping its stored default flag
    pub fn update_payment_method(
        &self,
        method: PaymentMethod,
    ) -> Result<PaymentMethod, SettingsError> {
        self.mutate(|settings| {
            let methods = &mut settings.payment.methods;
            let index = methods
                .iter()
                .position(|m| m.id == method.id)
                .ok_or_else(|| SettingsError::PaymentMethodNotFound(method.id.clone()))?;

            let current = &methods[index];
            if !method.enabled && current.enabled {
                if current.is_default {
                    return Err(SettingsError::DisabledDefaultPaymentMethod);
                }
                if methods.iter().filter(|m| m.enabled).count() <= 1 {
                    return Err(SettingsError::LastEnabledPaymentMethod);
                }
            }

            let updated = PaymentMethod {
                is_default: current.is_default,
                ..method
            };
            methods[index] = updated.clone();
            Ok(updated)
        })
    }

    pub fn set_default_payment_method(&self, id: &str) -> Result<(), SettingsError> {
        self.mutate(|settings| {
            let methods = &mut settings.payment.methods;
            let method = methods
                .iter()
                .find(|m| m.id == id)
                .ok_or_else(|| SettingsError::PaymentMethodNotFound(id.to_string()))?;
            if !method.enabled {
                return Err(SettingsError::DisabledDefaultPaymentMethod);
            }

            for method in methods.iter_mut() {
                method.is_default = method.id == id;
            }
            Ok(())
        })
    }

    pub fn set_store_location(&self, location: StoreLocation) -> Result<(), SettingsError> {
        self.mutate(|settings| {
            settings.shipping.store_location = Some(location);
            Ok(())
        })
    }

    /// Applies `change` to a copy, persists it, then publishes it
    ///
    /// A failed change or failed save leaves the current settings untouched.
    fn mutate<T, F>(&self, change: F) -> Result<T, SettingsError>
    where
        F: FnOnce(&mut StoreSettings) -> Result<T, SettingsError>,
    {
        let mut guard = self.write();
        let mut next = guard.clone();

        let result = change(&mut next)?;
        self.store.save(&next)?;
        *guard = next;

        Ok(result)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreSettings> {
        self.settings.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreSettings> {
        self.settings.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn check_complete(option: &ShippingOption) -> Result<(), SettingsError> {
    if option.is_complete() {
        Ok(())
    } else {
        Err(SettingsError::IncompleteDistanceOption(option.id.clone()))
    }
}
