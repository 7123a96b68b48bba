//! Product catalog
//!
//! Read-only reference data shared by the dialog, pricing and finalizer.
//! Products are identified by their display name, which is also what gets
//! stored on cart lines and order items.

use serde::Serialize;

/// Money amounts are kept in cents
pub type Cents = u64;

/// Format cents as `$N.NN`
pub fn format_price(amount: Cents) -> String {
    format!("${}.{:02}", amount / 100, amount % 100)
}

/// Emoji used for products that are no longer in the catalog
pub const FALLBACK_EMOJI: &str = "🍰";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    /// Payload code, e.g. `CHOCOLATE_CAKE` for `ORDER_CHOCOLATE_CAKE`
    pub code: String,
    pub name: String,
    pub emoji: String,
    pub price: Cents,
    pub description: String,
    pub image_url: String,
    /// Lowercase keywords (English and Myanmar) that select this product
    pub keywords: Vec<String>,
}

impl Product {
    fn new(
        code: &str,
        name: &str,
        emoji: &str,
        price: Cents,
        description: &str,
        image_url: &str,
        keywords: &[&str],
    ) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            emoji: emoji.to_string(),
            price,
            description: description.to_string(),
            image_url: image_url.to_string(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    /// Name with emoji prefix, as shown on cards and cart lines
    pub fn label(&self) -> String {
        format!("{} {}", self.emoji, self.name)
    }
}

/// Ordered product list; order matters for keyword matching and carousels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// The bakery's standard product range
    pub fn bakery() -> Self {
        const CAKE_IMG: &str =
            "https://images.unsplash.com/photo-1578985545062-69928b1d9587?w=300&h=200&fit=crop";
        const PASTRY_IMG: &str =
            "https://images.unsplash.com/photo-1555507036-ab1f4038808a?w=300&h=200&fit=crop";
        const DRINK_IMG: &str =
            "https://images.unsplash.com/photo-1509042239860-f550ce710b93?w=300&h=200&fit=crop";

        Self::new(vec![
            Product::new(
                "CHOCOLATE_CAKE",
                "Chocolate Cake",
                "🍫",
                2500,
                "Rich dark chocolate layers",
                CAKE_IMG,
                &["chocolate", "choco", "ချောကလက်"],
            ),
            Product::new(
                "VANILLA_CAKE",
                "Vanilla Cake",
                "🍰",
                2400,
                "Light sponge with vanilla cream",
                CAKE_IMG,
                &["vanilla", "ဗနီလာ"],
            ),
            Product::new(
                "RED_VELVET",
                "Red Velvet Cake",
                "❤️",
                2800,
                "Velvety crumb with cream cheese frosting",
                CAKE_IMG,
                &["red velvet", "velvet", "အနီရောင်"],
            ),
            Product::new(
                "COFFEE",
                "Coffee",
                "☕",
                500,
                "Freshly brewed house blend",
                DRINK_IMG,
                &["coffee", "ကော်ဖီ"],
            ),
            Product::new(
                "CROISSANT",
                "Croissant",
                "🥐",
                450,
                "Buttery and flaky, baked daily",
                PASTRY_IMG,
                &["croissant", "ခရို့ဆန့်"],
            ),
            Product::new(
                "CINNAMON_ROLL",
                "Cinnamon Roll",
                "🌀",
                500,
                "Soft roll with cinnamon glaze",
                PASTRY_IMG,
                &["cinnamon", "roll", "ဆင်နမွန်"],
            ),
            Product::new(
                "CHOCOLATE_CUPCAKE",
                "Chocolate Cupcake",
                "🧁",
                350,
                "Single-serve chocolate treat",
                CAKE_IMG,
                &["cupcake", "cup cake", "ကပ်ကိတ်"],
            ),
            Product::new(
                "BREAD",
                "Fresh Bread",
                "🍞",
                600,
                "Crusty loaf from this morning",
                PASTRY_IMG,
                &["bread", "ပေါင်မုန့်"],
            ),
        ])
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Look up a product by display name
    pub fn get(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    /// Look up a product by payload code; `CUPCAKE` is accepted for the cupcake
    pub fn by_code(&self, code: &str) -> Option<&Product> {
        let code = if code == "CUPCAKE" {
            "CHOCOLATE_CUPCAKE"
        } else {
            code
        };
        self.products.iter().find(|p| p.code == code)
    }

    /// Catalog with one product removed (discontinued)
    #[allow(dead_code)] // Used in tests
    pub fn without(&self, name: &str) -> Self {
        Self::new(
            self.products
                .iter()
                .filter(|p| p.name != name)
                .cloned()
                .collect(),
        )
    }

    /// Current emoji for a product, or the generic one if it was removed
    pub fn emoji_for(&self, name: &str) -> &str {
        self.get(name).map_or(FALLBACK_EMOJI, |p| p.emoji.as_str())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::bakery()
    }
}
