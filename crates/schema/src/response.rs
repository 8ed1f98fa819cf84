use crate::errors::SchemaError;
use crate::portion::{round_price, scale_nutrition_value};
use serde::{Deserialize, Deserializer, Serialize};

/// Axis-aligned box in image pixels. Travels as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    /// Closed rectangular polygon, first corner repeated at the end.
    pub fn outline(&self) -> Vec<[f32; 2]> {
        vec![
            [self.x1, self.y1],
            [self.x2, self.y1],
            [self.x2, self.y2],
            [self.x1, self.y2],
            [self.x1, self.y1],
        ]
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Treats an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Macro amounts such as `"12g"`. Empty when the menu has no value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub protein: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub carbs: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fat: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fiber: String,
}

impl Nutrition {
    pub fn scaled(&self, portion: f64) -> Self {
        Self {
            protein: scale_nutrition_value(&self.protein, portion),
            carbs: scale_nutrition_value(&self.carbs, portion),
            fat: scale_nutrition_value(&self.fat, portion),
            fiber: scale_nutrition_value(&self.fiber, portion),
        }
    }
}

/// Food metadata attached to a detected item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FoodInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portion_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub portion_based: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portion: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nutrition: Nutrition,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allergens: Vec<String>,
}

impl FoodInfo {
    /// Price charged for this item: `portion_price`, then `price`, then
    /// `base_price` times the portion.
    pub fn effective_price(&self) -> f64 {
        self.portion_price
            .or(self.price)
            .or_else(|| {
                self.base_price
                    .map(|base| base * self.portion.unwrap_or(1.0))
            })
            .unwrap_or(0.0)
    }

    fn unit_price(&self) -> f64 {
        self.base_price.or(self.price).unwrap_or(0.0)
    }

    /// Apply a serving size to unscaled catalog info.
    ///
    /// Items that are not portion based keep their values and get portion 1.0.
    pub fn scaled(&self, portion: f64) -> Self {
        let base = self.unit_price();
        if !self.portion_based {
            return Self {
                price: Some(base),
                portion_price: Some(base),
                base_price: Some(base),
                portion: Some(1.0),
                ..self.clone()
            };
        }

        let portion_price = round_price(base * portion);
        Self {
            price: Some(portion_price),
            portion_price: Some(portion_price),
            base_price: Some(base),
            calories: (self.calories * portion).round(),
            portion: Some(portion),
            nutrition: self.nutrition.scaled(portion),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedItem {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<[f32; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_info: Option<FoodInfo>,
}

impl DetectedItem {
    pub fn display_name(&self) -> &str {
        match &self.food_info {
            Some(info) if !info.name.is_empty() => &info.name,
            _ => &self.class_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub price: f64,
    pub calories: f64,
}

/// Envelope returned by the detection service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<DetectedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Server totals where present, item sums otherwise.
    pub fn computed_totals(&self) -> Totals {
        let price = self.total_price.unwrap_or_else(|| {
            round_price(
                self.food_infos()
                    .map(FoodInfo::effective_price)
                    .sum::<f64>(),
            )
        });
        let calories = self
            .total_calories
            .unwrap_or_else(|| self.food_infos().map(|info| info.calories).sum());
        Totals { price, calories }
    }

    /// Drops items below `min_confidence`. Server totals are cleared so they
    /// get recomputed from what remains.
    pub fn filtered(mut self, min_confidence: f32) -> Self {
        let before = self.data.len();
        self.data.retain(|item| item.confidence >= min_confidence);
        if self.data.len() != before {
            self.total_price = None;
            self.total_calories = None;
        }
        self
    }

    pub fn sorted_by_confidence(mut self) -> Self {
        self.data
            .sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        self
    }

    fn food_infos(&self) -> impl Iterator<Item = &FoodInfo> {
        self.data.iter().filter_map(|item| item.food_info.as_ref())
    }
}
