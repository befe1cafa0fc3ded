//! Seed catalog served by the mock.

use serde_json::{Value, json};

/// `(id, name)` of every category.
pub const CATEGORIES: &[(&str, &str)] = &[
    ("6439d58a0049ad0b52b9003f", "Women's Fashion"),
    ("6439d5b90049ad0b52b90048", "Men's Fashion"),
    ("6439d2d167d9aa4ca970649f", "Electronics"),
];

/// `(id, name)` of every brand.
pub const BRANDS: &[(&str, &str)] = &[
    ("64089bbe24b25627a253158b", "DeFacto"),
    ("64089c3924b25627a2531593", "Puma"),
    ("64089d5c24b25627a253159f", "Samsung"),
];

struct Seed {
    id: &'static str,
    title: &'static str,
    price: i64,
    sale_price: Option<i64>,
    category: usize,
    brand: usize,
}

const PRODUCTS: &[Seed] = &[
    Seed { id: "6428ebc6dc1175abc65ca0b9", title: "Woman Shawl", price: 149, sale_price: None, category: 0, brand: 0 },
    Seed { id: "6428eb43dc1175abc65ca0b3", title: "Woman Sweatshirt Jacket", price: 399, sale_price: Some(349), category: 0, brand: 0 },
    Seed { id: "6428ead5dc1175abc65ca0ad", title: "Woman Long Dress", price: 525, sale_price: None, category: 0, brand: 0 },
    Seed { id: "6428e997dc1175abc65ca0a1", title: "Woman Shawl Scarf", price: 170, sale_price: None, category: 0, brand: 0 },
    Seed { id: "6428e884dc1175abc65ca096", title: "Training Sneakers", price: 1399, sale_price: Some(1199), category: 1, brand: 1 },
    Seed { id: "6428e509dc1175abc65ca08a", title: "Softride Running Shoes", price: 2100, sale_price: None, category: 1, brand: 1 },
    Seed { id: "6428e479dc1175abc65ca086", title: "Men Regular Fit Shirt", price: 320, sale_price: None, category: 1, brand: 0 },
    Seed { id: "6428de2adc1175abc65ca05b", title: "Galaxy A54 5G", price: 13999, sale_price: None, category: 2, brand: 2 },
    Seed { id: "6428dcd1dc1175abc65ca04f", title: "Galaxy Buds2 Pro", price: 5499, sale_price: Some(4999), category: 2, brand: 2 },
    Seed { id: "6428dc3fdc1175abc65ca04b", title: "Galaxy Watch5", price: 7999, sale_price: None, category: 2, brand: 2 },
    Seed { id: "6428d9ecdc1175abc65ca03f", title: "Puma Sports Bag", price: 899, sale_price: None, category: 1, brand: 1 },
    Seed { id: "6428d8e5dc1175abc65ca039", title: "Woman Ankle Boots", price: 1150, sale_price: None, category: 0, brand: 1 },
];

fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

fn category_json(index: usize) -> Value {
    let (id, name) = CATEGORIES.get(index).copied().unwrap_or(("", ""));
    json!({
        "_id": id,
        "name": name,
        "slug": slug(name),
        "image": format!("https://images.shopmart.test/categories/{id}.png"),
    })
}

fn brand_json(index: usize) -> Value {
    let (id, name) = BRANDS.get(index).copied().unwrap_or(("", ""));
    json!({
        "_id": id,
        "name": name,
        "slug": slug(name),
        "image": format!("https://images.shopmart.test/brands/{id}.png"),
    })
}

/// Every category record.
pub fn categories() -> Vec<Value> {
    (0..CATEGORIES.len()).map(category_json).collect()
}

/// Every brand record.
pub fn brands() -> Vec<Value> {
    (0..BRANDS.len()).map(brand_json).collect()
}

/// Every product record, populated with its category and brand.
pub fn products() -> Vec<Value> {
    PRODUCTS
        .iter()
        .map(|seed| {
            let mut product = json!({
                "_id": seed.id,
                "id": seed.id,
                "title": seed.title,
                "slug": slug(seed.title),
                "description": format!("{} from the ShopMart seed catalog", seed.title),
                "price": seed.price,
                "quantity": 120,
                "sold": 4,
                "imageCover": format!("https://images.shopmart.test/products/{}.jpeg", seed.id),
                "images": [],
                "category": category_json(seed.category),
                "brand": brand_json(seed.brand),
                "ratingsAverage": 4.5,
                "ratingsQuantity": 12,
                "createdAt": "2023-04-02T02:40:06.543Z",
                "updatedAt": "2023-06-01T10:12:44.123Z",
            });
            if let (Some(sale), Some(fields)) = (seed.sale_price, product.as_object_mut()) {
                fields.insert("priceAfterDiscount".to_string(), json!(sale));
            }
            product
        })
        .collect()
}
