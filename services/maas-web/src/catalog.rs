//! Millet product catalog
//!
//! Storage sits behind `ProductStore` so handlers never see how products are
//! kept. The shipped store is in-memory and starts with three sample
//! listings; ids are assigned in insertion order and never reused.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Image assigned to listings added through the API.
pub const PLACEHOLDER_IMAGE: &str = "millet_placeholder.jpg";

/// Catalog record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: u64,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub image: String,
    pub category: String,
}

/// Validated fields for a new or edited product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub title: String,
    pub price: f64,
    pub description: String,
    pub category: String,
}

/// Add/edit form as posted by the management pages.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

impl ProductForm {
    /// Title and price are required; price must be a finite number.
    pub fn validate(self) -> Result<ProductDraft, ApiError> {
        let title = self.title.trim();
        let price = self.price.trim();
        if title.is_empty() || price.is_empty() {
            return Err(ApiError::Validation("Title and Price are required!".into()));
        }
        let price: f64 = price
            .parse()
            .ok()
            .filter(|p: &f64| p.is_finite())
            .ok_or_else(|| ApiError::Validation("Price must be a number".into()))?;

        Ok(ProductDraft {
            title: title.to_string(),
            price,
            description: self.description,
            category: self.category,
        })
    }
}

/// Product persistence used by the dashboards and management routes.
pub trait ProductStore: Send + Sync {
    /// All products, newest first.
    fn list(&self) -> Vec<Product>;

    fn get(&self, id: u64) -> Option<Product>;

    fn insert(&self, draft: ProductDraft) -> Product;

    /// Replace the editable fields. The image is kept. `None` if absent.
    fn update(&self, id: u64, draft: ProductDraft) -> Option<Product>;

    /// `false` if no product had this id.
    fn delete(&self, id: u64) -> bool;
}

#[derive(Debug, Default)]
struct Catalog {
    next_id: u64,
    products: BTreeMap<u64, Product>,
}

/// `ProductStore` kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Catalog>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the three sample millet listings.
    pub fn seeded() -> Self {
        let store = Self::new();
        for (title, price, description, image) in [
            (
                "Organic Pearl Millet (Bajra)",
                45.50,
                "From Rajasthan, rich in magnesium.",
                "bajra.jpg",
            ),
            (
                "Premium Sorghum (Jowar)",
                52.00,
                "Gluten-free, sourced from Maharashtra.",
                "jowar.jpg",
            ),
            (
                "Malnad Finger Millet (Ragi)",
                65.00,
                "Calcium-rich Ragi from Karnataka.",
                "ragi.jpg",
            ),
        ] {
            store.insert_with_image(
                ProductDraft {
                    title: title.into(),
                    price,
                    description: description.into(),
                    category: "Grains".into(),
                },
                image,
            );
        }
        store
    }

    fn insert_with_image(&self, draft: ProductDraft, image: &str) -> Product {
        let mut catalog = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        catalog.next_id += 1;
        let product = Product {
            id: catalog.next_id,
            title: draft.title,
            price: draft.price,
            description: draft.description,
            image: image.to_string(),
            category: draft.category,
        };
        catalog.products.insert(product.id, product.clone());
        product
    }
}

impl ProductStore for InMemoryStore {
    fn list(&self) -> Vec<Product> {
        let catalog = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        catalog.products.values().rev().cloned().collect()
    }

    fn get(&self, id: u64) -> Option<Product> {
        let catalog = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        catalog.products.get(&id).cloned()
    }

    fn insert(&self, draft: ProductDraft) -> Product {
        self.insert_with_image(draft, PLACEHOLDER_IMAGE)
    }

    fn update(&self, id: u64, draft: ProductDraft) -> Option<Product> {
        let mut catalog = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let product = catalog.products.get_mut(&id)?;
        product.title = draft.title;
        product.price = draft.price;
        product.description = draft.description;
        product.category = draft.category;
        Some(product.clone())
    }

    fn delete(&self, id: u64) -> bool {
        let mut catalog = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        catalog.products.remove(&id).is_some()
    }
}
