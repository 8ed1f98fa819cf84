//! Console rendering of detection results.

use schema::{DetectedItem, DetectionResponse, FoodInfo, Nutrition};
use std::fmt;

pub fn format_price(price: f64) -> String {
    format!("{price:.2} ₺")
}

pub fn format_calories(calories: f64) -> String {
    format!("{calories:.0} kcal")
}

fn percent(confidence: f32) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// Full multi-line report for a single tray.
pub struct Report<'a>(pub &'a DetectionResponse);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let response = self.0;
        if !response.success {
            let error = response.error.as_deref().unwrap_or("unknown error");
            return writeln!(f, "Detection failed: {error}");
        }
        if response.data.is_empty() {
            return writeln!(f, "No food detected");
        }

        match response.processing_time {
            Some(seconds) => writeln!(
                f,
                "Detected {} item(s) in {seconds:.2}s",
                response.data.len()
            )?,
            None => writeln!(f, "Detected {} item(s)", response.data.len())?,
        }

        for (index, item) in response.data.iter().enumerate() {
            writeln!(f)?;
            write_item(f, index + 1, item)?;
        }

        let totals = response.computed_totals();
        writeln!(f)?;
        writeln!(
            f,
            "Total: {} | {}",
            format_price(totals.price),
            format_calories(totals.calories)
        )
    }
}

fn write_item(f: &mut fmt::Formatter<'_>, position: usize, item: &DetectedItem) -> fmt::Result {
    writeln!(
        f,
        "{position:>2}. {} ({}) {}",
        item.display_name(),
        item.class_name,
        percent(item.confidence)
    )?;

    let Some(info) = &item.food_info else {
        return writeln!(f, "    No menu information");
    };

    writeln!(f, "    {}", price_line(info))?;
    if let Some(nutrition) = nutrition_line(&info.nutrition) {
        writeln!(f, "    {nutrition}")?;
    }
    if !info.ingredients.is_empty() {
        writeln!(f, "    Ingredients: {}", info.ingredients.join(", "))?;
    }
    if info.allergens.is_empty() {
        writeln!(f, "    Allergens: none")
    } else {
        writeln!(f, "    Allergens: {}", info.allergens.join(", "))
    }
}

fn price_line(info: &FoodInfo) -> String {
    let price = format_price(info.effective_price());
    let calories = format_calories(info.calories);
    match info.portion {
        Some(portion) if info.portion_based => {
            format!("Portion {portion} | {price} | {calories}")
        }
        _ => format!("{price} | {calories}"),
    }
}

fn nutrition_line(nutrition: &Nutrition) -> Option<String> {
    let parts: Vec<String> = [
        ("Protein", &nutrition.protein),
        ("Carbs", &nutrition.carbs),
        ("Fat", &nutrition.fat),
        ("Fiber", &nutrition.fiber),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(label, value)| format!("{label} {value}"))
    .collect();

    (!parts.is_empty()).then(|| parts.join("  "))
}

/// One line per streamed frame.
pub struct Summary<'a>(pub &'a DetectionResponse);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let response = self.0;
        if !response.success {
            let error = response.error.as_deref().unwrap_or("unknown error");
            return write!(f, "error: {error}");
        }

        let totals = response.computed_totals();
        write!(
            f,
            "{} item(s) | {} | {}",
            response.data.len(),
            format_price(totals.price),
            format_calories(totals.calories)
        )?;

        for (index, item) in response.data.iter().enumerate() {
            let separator = if index == 0 { " | " } else { ", " };
            write!(
                f,
                "{separator}{} {}",
                item.display_name(),
                percent(item.confidence)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tray() -> DetectionResponse {
        DetectionResponse::from_value(json!({
            "success": true,
            "data": [
                {
                    "class": "tavuk",
                    "confidence": 0.92,
                    "bbox": [100, 100, 300, 250],
                    "food_info": {
                        "name": "Izgara Tavuk",
                        "price": 67.5,
                        "portion_price": 67.5,
                        "base_price": 45,
                        "calories": 375,
                        "portion_based": true,
                        "portion": 1.5,
                        "nutrition": {"protein": "45.0g", "carbs": "0.0g", "fat": "22.5g", "fiber": "0.0g"},
                        "ingredients": ["Tavuk göğsü", "Zeytinyağı"],
                        "allergens": []
                    }
                },
                {
                    "class": "catal",
                    "confidence": 0.81,
                    "bbox": [400, 120, 480, 300],
                    "food_info": {
                        "name": "Çatal",
                        "price": 0,
                        "calories": 0,
                        "portion_based": false,
                        "portion": 1.0
                    }
                },
                {
                    "class": "mystery",
                    "confidence": 0.7,
                    "bbox": [10, 10, 20, 20]
                }
            ],
            "processing_time": 0.12
        }))
        .unwrap()
    }

    #[test]
    fn test_report_lists_items_and_totals() {
        let text = Report(&tray()).to_string();

        assert!(text.starts_with("Detected 3 item(s) in 0.12s\n"));
        assert!(text.contains(" 1. Izgara Tavuk (tavuk) 92%"));
        assert!(text.contains("Portion 1.5 | 67.50 ₺ | 375 kcal"));
        assert!(text.contains("Protein 45.0g  Carbs 0.0g  Fat 22.5g  Fiber 0.0g"));
        assert!(text.contains("Ingredients: Tavuk göğsü, Zeytinyağı"));
        assert!(text.contains("Allergens: none"));

        // Fixed-price items show no portion
        assert!(text.contains(" 2. Çatal (catal) 81%\n    0.00 ₺ | 0 kcal"));
        assert!(text.contains(" 3. mystery (mystery) 70%\n    No menu information"));

        assert!(text.ends_with("Total: 67.50 ₺ | 375 kcal\n"));
    }

    #[test]
    fn test_report_failure_and_empty() {
        let failed = DetectionResponse::failure("model not loaded");
        assert_eq!(
            Report(&failed).to_string(),
            "Detection failed: model not loaded\n"
        );

        let empty = DetectionResponse {
            success: true,
            ..DetectionResponse::default()
        };
        assert_eq!(Report(&empty).to_string(), "No food detected\n");
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            Summary(&tray()).to_string(),
            "3 item(s) | 67.50 ₺ | 375 kcal | Izgara Tavuk 92%, Çatal 81%, mystery 70%"
        );

        let failed = DetectionResponse::failure("timeout");
        assert_eq!(Summary(&failed).to_string(), "error: timeout");
    }

    #[test]
    fn test_server_totals_win() {
        let mut response = tray();
        response.total_price = Some(70.0);
        response.total_calories = Some(400.0);

        assert!(Report(&response).to_string().ends_with("Total: 70.00 ₺ | 400 kcal\n"));
    }

    #[test]
    fn test_formatting_helpers() {
        assert_eq!(format_price(12.5), "12.50 ₺");
        assert_eq!(format_calories(179.6), "180 kcal");
    }
}
