use serde::{Deserialize, Serialize};

/// Asset class for glide-path purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    Debt,
    Safe,
}

/// Target Equity/Debt/Safe weights. The three weights sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlideWeights {
    pub equity: f64,
    pub debt: f64,
    pub safe: f64,
}

impl GlideWeights {
    pub fn weight(&self, class: AssetClass) -> f64 {
        match class {
            AssetClass::Equity => self.equity,
            AssetClass::Debt => self.debt,
            AssetClass::Safe => self.safe,
        }
    }
}

/// Glide-path weights for the months left to a goal. Equity is traded for
/// Safe as the deadline approaches, in five steps.
pub fn weights_for(months_left: u32) -> GlideWeights {
    let (equity, debt, safe) = if months_left >= 60 {
        (0.70, 0.20, 0.10)
    } else if months_left >= 36 {
        (0.55, 0.35, 0.10)
    } else if months_left >= 24 {
        (0.40, 0.40, 0.20)
    } else if months_left >= 12 {
        (0.25, 0.45, 0.30)
    } else {
        (0.10, 0.40, 0.50)
    };
    GlideWeights { equity, debt, safe }
}

/// Map a category label to its glide-path asset class. Anything not
/// recognised is Safe.
pub fn classify(category_label: &str) -> AssetClass {
    match category_label.trim().to_ascii_lowercase().as_str() {
        "equity" | "commodity" => AssetClass::Equity,
        "debt" | "hybrid" => AssetClass::Debt,
        _ => AssetClass::Safe,
    }
}

/// Glide-path class of a free-text scheme category such as
/// "Hybrid Scheme - Balanced Advantage Fund": the label is its leading word.
pub fn classify_category(category: &str) -> AssetClass {
    let label = category
        .split(|c: char| c.is_whitespace() || c == '-')
        .find(|s| !s.is_empty())
        .unwrap_or("");
    classify(label)
}
