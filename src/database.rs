//! Database initialization, table definitions and the catalog store
//!
//! This module handles the setup of the embedded redb database and wraps the
//! product table in [`CatalogStore`], a cheap cloneable handle that every other
//! part of the crate goes through.

use chrono::Utc;
use rand::Rng;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{SettingsError, StoreError};
use crate::media::MediaStore;
use crate::model::{NewProduct, NewReview, Product, ProductUpdate, Review, Seller};
use crate::settings::{RedbSettingsStore, SettingsService};

/// Main table for storing products
///
/// Key: product id as string
/// Value: JSON-serialized Product as string
///
/// Example:
/// - Key: "65a1f0c2e4b0a1b2c3d4e5f6"
/// - Value: '{"id":"65a1f0c2e4b0a1b2c3d4e5f6","title":"Test Product",...}'
pub const TABLE_PRODUCTS: TableDefinition<&str, &str> = TableDefinition::new("products_v1");

/// Single-row table holding the JSON-serialized store settings
pub const TABLE_SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings_v1");

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogStore,
    pub settings: Arc<SettingsService>,
    pub media: MediaStore,
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the state around an open catalog, with settings kept in the
    /// same database
    pub fn new(catalog: CatalogStore, config: Config) -> Result<Self, SettingsError> {
        let settings_store = RedbSettingsStore::new(catalog.database().clone());
        let settings = SettingsService::load(Box::new(settings_store))?;

        Ok(Self {
            media: MediaStore::new(&config.media_dir),
            settings: Arc::new(settings),
            config: Arc::new(config),
            catalog,
        })
    }
}

/// Initializes the embedded database and creates required tables
///
/// Fails with `DatabaseAlreadyOpen` while another process holds the file.
pub fn init_db(db_path: impl AsRef<Path>) -> Result<Database, StoreError> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_PRODUCTS)?;
        write_txn.open_table(TABLE_SETTINGS)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Generates an identifier shaped like a document-store object id
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    (0..12).map(|_| format!("{:02x}", rng.random::<u8>())).collect()
}

const SAMPLE_IMAGE: &str =
    "https://res.cloudinary.com/dxsebqku9/image/upload/v1/tiktok-shop/placeholder.jpg";
const SAMPLE_AVATAR: &str =
    "https://res.cloudinary.com/dxsebqku9/image/upload/v1/tiktok-shop/default-avatar.jpg";

/// Record inserted into an empty catalog so the storefront has something to show
fn sample_product() -> Product {
    Product {
        id: generate_id(),
        title: "Test Product".into(),
        description: "This is a test product to ensure the system is working correctly".into(),
        price: Decimal::new(2999, 2),
        images: vec![SAMPLE_IMAGE.into()],
        video_url: None,
        category: "Test".into(),
        tags: vec!["test".into(), "sample".into()],
        stock: 10,
        rating: 5.0,
        reviews: Vec::new(),
        created_at: Utc::now(),
        seller: Seller {
            id: "test-seller".into(),
            name: "Test Seller".into(),
            avatar: SAMPLE_AVATAR.into(),
        },
    }
}

/// Handle to the product catalog
///
/// Clones share the same underlying database. Dropping the last clone closes
/// the file.
#[derive(Clone)]
pub struct CatalogStore {
    db: Arc<Database>,
}

impl CatalogStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Opens (or creates) the database at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(init_db(db_path)?)))
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Returns every product in key order
    pub fn list(&self) -> Result<Vec<Product>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_PRODUCTS)?;

        table
            .iter()?
            .map(|entry| -> Result<Product, StoreError> {
                let (_, value) = entry?;
                Ok(serde_json::from_str::<Product>(value.value())?)
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<Option<Product>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_PRODUCTS)?;

        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_PRODUCTS)?;
        Ok(table.len()?)
    }

    /// Stores a new product built from an admin submission
    ///
    /// Rating starts at zero with no reviews.
    pub fn create(
        &self,
        new: NewProduct,
        images: Vec<String>,
        video_url: Option<String>,
    ) -> Result<Product, StoreError> {
        let product = Product {
            id: generate_id(),
            title: new.title,
            description: new.description,
            price: new.price,
            images,
            video_url,
            category: new.category,
            tags: new.tags,
            stock: new.stock,
            rating: 0.0,
            reviews: Vec::new(),
            created_at: Utc::now(),
            seller: new.seller,
        };

        self.put(&product)?;
        Ok(product)
    }

    /// Applies a partial update, returning `None` if the product does not exist
    pub fn update(&self, id: &str, update: ProductUpdate) -> Result<Option<Product>, StoreError> {
        self.modify(id, |product| update.apply(product))
    }

    /// Appends a review and recomputes the average rating
    pub fn append_review(&self, id: &str, review: NewReview) -> Result<Option<Product>, StoreError> {
        self.modify(id, |product| {
            product.reviews.push(Review {
                id: generate_id(),
                user_id: review.user_id,
                user_name: review.user_name,
                rating: review.rating,
                comment: review.comment,
                created_at: Utc::now(),
                helpful: 0,
            });

            let total: u32 = product.reviews.iter().map(|r| u32::from(r.rating)).sum();
            let mean = f64::from(total) / product.reviews.len() as f64;
            product.rating = (mean * 10.0).round() / 10.0;
        })
    }

    /// Removes a product, returning it if it existed
    pub fn delete(&self, id: &str) -> Result<Option<Product>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(TABLE_PRODUCTS)?;
            let removed = table.remove(id)?;
            match removed {
                Some(value) => Some(serde_json::from_str::<Product>(value.value())?),
                None => None,
            }
        };
        write_txn.commit()?;

        Ok(removed)
    }

    /// Inserts many products in one transaction, keeping their ids
    pub fn insert_many(&self, products: &[Product]) -> Result<usize, StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_PRODUCTS)?;
            for product in products {
                let json = serde_json::to_string(product)?;
                table.insert(product.id.as_str(), json.as_str())?;
            }
        }
        write_txn.commit()?;

        Ok(products.len())
    }

    /// Inserts the sample product when the catalog is empty
    ///
    /// Returns `true` if the catalog was seeded.
    pub fn seed_if_empty(&self) -> Result<bool, StoreError> {
        if self.count()? > 0 {
            return Ok(false);
        }

        let product = sample_product();
        self.put(&product)?;
        tracing::info!(id = %product.id, "catalog was empty, sample product added");

        Ok(true)
    }

    fn put(&self, product: &Product) -> Result<(), StoreError> {
        let json = serde_json::to_string(product)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_PRODUCTS)?;
            table.insert(product.id.as_str(), json.as_str())?;
        }
        write_txn.commit()?;

        Ok(())
    }

    /// Read-modify-write of one product inside a single write transaction
    fn modify<F>(&self, id: &str, change: F) -> Result<Option<Product>, StoreError>
    where
        F: FnOnce(&mut Product),
    {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(TABLE_PRODUCTS)?;
            let current = match table.get(id)? {
                Some(value) => serde_json::from_str::<Product>(value.value())?,
                None => return Ok(None),
            };

            let mut product = current;
            change(&mut product);

            let json = serde_json::to_string(&product)?;
            table.insert(id, json.as_str())?;
            product
        };
        write_txn.commit()?;

        Ok(Some(updated))
    }
}
