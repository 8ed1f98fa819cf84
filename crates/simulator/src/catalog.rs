//! Foods the simulator knows how to "detect".

use schema::{FoodInfo, Nutrition};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    /// Class key as the detector reports it, underscores instead of spaces.
    pub key: &'static str,
    pub name: &'static str,
    pub price: f64,
    pub calories: f64,
    pub portion_based: bool,
    /// protein, carbs, fat, fiber
    pub nutrition: [&'static str; 4],
    pub ingredients: &'static [&'static str],
    pub allergens: &'static [&'static str],
}

impl CatalogEntry {
    pub fn class_label(&self) -> String {
        self.key.replace('_', " ")
    }

    /// Unscaled info for a single portion.
    pub fn food_info(&self) -> FoodInfo {
        let [protein, carbs, fat, fiber] = self.nutrition;
        FoodInfo {
            name: self.name.to_string(),
            price: Some(self.price),
            calories: self.calories,
            portion_based: self.portion_based,
            nutrition: Nutrition {
                protein: protein.to_string(),
                carbs: carbs.to_string(),
                fat: fat.to_string(),
                fiber: fiber.to_string(),
            },
            ingredients: self.ingredients.iter().map(|s| s.to_string()).collect(),
            allergens: self.allergens.iter().map(|s| s.to_string()).collect(),
            ..FoodInfo::default()
        }
    }

    pub fn matches(&self, class: &str) -> bool {
        self.key == class || self.class_label() == class
    }
}

pub static CATALOG: [CatalogEntry; 9] = [
    CatalogEntry {
        key: "çorba",
        name: "Ezogelin Çorbası",
        price: 15.0,
        calories: 120.0,
        portion_based: true,
        nutrition: ["3g", "15g", "6g", "2g"],
        ingredients: &[
            "Kırmızı mercimek",
            "Bulgur",
            "Pirinç",
            "Kuru soğan",
            "Sarımsak",
            "Domates salçası",
            "Tereyağı",
            "Baharatlar",
        ],
        allergens: &["Gluten", "Süt ürünleri (tereyağı)"],
    },
    CatalogEntry {
        key: "tavuk",
        name: "Izgara Tavuk",
        price: 45.0,
        calories: 250.0,
        portion_based: true,
        nutrition: ["30g", "0g", "15g", "0g"],
        ingredients: &[
            "Tavuk göğsü",
            "Zeytinyağı",
            "Sarımsak",
            "Limon suyu",
            "Baharatlar",
        ],
        allergens: &["Kümes hayvanları"],
    },
    CatalogEntry {
        key: "pilav",
        name: "Pirinç Pilavı",
        price: 20.0,
        calories: 180.0,
        portion_based: true,
        nutrition: ["3g", "35g", "5g", "0.5g"],
        ingredients: &["Pirinç", "Tereyağı", "Şehriye", "Tuz"],
        allergens: &["Gluten (şehriye)", "Süt ürünleri (tereyağı)"],
    },
    CatalogEntry {
        key: "salata",
        name: "Mevsim Salatası",
        price: 25.0,
        calories: 80.0,
        portion_based: true,
        nutrition: ["2g", "10g", "4g", "5g"],
        ingredients: &[
            "Domates",
            "Salatalık",
            "Marul",
            "Kırmızı soğan",
            "Zeytinyağı",
            "Limon suyu",
        ],
        allergens: &[],
    },
    CatalogEntry {
        key: "makarna",
        name: "Napoliten Makarna",
        price: 30.0,
        calories: 320.0,
        portion_based: true,
        nutrition: ["10g", "50g", "8g", "3g"],
        ingredients: &[
            "Makarna",
            "Domates sosu",
            "Sarımsak",
            "Soğan",
            "Zeytinyağı",
            "Fesleğen",
        ],
        allergens: &["Gluten"],
    },
    CatalogEntry {
        key: "kuru_fasulye",
        name: "Kuru Fasulye",
        price: 30.0,
        calories: 220.0,
        portion_based: true,
        nutrition: ["15g", "30g", "5g", "8g"],
        ingredients: &[
            "Kuru fasulye",
            "Soğan",
            "Domates salçası",
            "Zeytinyağı",
            "Baharatlar",
        ],
        allergens: &["Baklagiller"],
    },
    CatalogEntry {
        key: "bulgur_pilav",
        name: "Bulgur Pilavı",
        price: 18.0,
        calories: 170.0,
        portion_based: true,
        nutrition: ["4g", "32g", "3g", "4g"],
        ingredients: &[
            "Bulgur",
            "Soğan",
            "Domates salçası",
            "Zeytinyağı",
            "Baharatlar",
        ],
        allergens: &["Gluten"],
    },
    CatalogEntry {
        key: "catal",
        name: "Çatal",
        price: 0.5,
        calories: 0.0,
        portion_based: false,
        nutrition: ["0g", "0g", "0g", "0g"],
        ingredients: &[],
        allergens: &[],
    },
    CatalogEntry {
        key: "kasik",
        name: "Kaşık",
        price: 0.5,
        calories: 0.0,
        portion_based: false,
        nutrition: ["0g", "0g", "0g", "0g"],
        ingredients: &[],
        allergens: &[],
    },
];

pub fn lookup(class: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.matches(class))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_are_unique() {
        let keys: HashSet<_> = CATALOG.iter().map(|e| e.key).collect();
        assert_eq!(keys.len(), CATALOG.len());
    }

    #[test]
    fn test_only_utensils_are_fixed_price() {
        let fixed: Vec<_> = CATALOG
            .iter()
            .filter(|e| !e.portion_based)
            .map(|e| e.key)
            .collect();
        assert_eq!(fixed, ["catal", "kasik"]);
    }

    #[test]
    fn test_lookup_accepts_label_or_key() {
        assert_eq!(lookup("kuru fasulye").map(|e| e.name), Some("Kuru Fasulye"));
        assert_eq!(lookup("kuru_fasulye").map(|e| e.name), Some("Kuru Fasulye"));
        assert!(lookup("pizza").is_none());
    }

    #[test]
    fn test_food_info_copies_entry() {
        let info = lookup("pilav").unwrap().food_info();
        assert_eq!(info.price, Some(20.0));
        assert_eq!(info.nutrition.fiber, "0.5g");
        assert_eq!(info.ingredients.len(), 4);
        assert_eq!(info.portion, None);
    }
}
