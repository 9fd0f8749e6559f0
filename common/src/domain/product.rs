use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: String,
}

/// In-memory product catalog, seeded at construction and read-only afterwards.
pub struct ProductCatalog {
    products: HashMap<String, Product>,
}

impl ProductCatalog {
    /// Create a catalog seeded with the demo menu.
    pub fn seeded() -> Self {
        let seed = [
            ("prod1", "Burger Classic", 12.99, "Burgers"),
            ("prod2", "Fries Large", 3.49, "Sides"),
            ("prod3", "Coca-Cola", 2.50, "Drinks"),
            ("prod4", "Veggie Burger", 11.50, "Burgers"),
            ("prod5", "Chicken Nuggets", 6.00, "Sides"),
        ];

        let products = seed
            .into_iter()
            .map(|(id, name, price, category)| {
                (
                    id.to_string(),
                    Product {
                        id: id.to_string(),
                        name: name.to_string(),
                        price,
                        category: category.to_string(),
                    },
                )
            })
            .collect();

        Self { products }
    }

    pub fn get_all(&self) -> Vec<Product> {
        let mut all: Vec<Product> = self.products.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn get_by_id(&self, id: &str) -> Option<Product> {
        self.products.get(id).cloned()
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::seeded()
    }
}
