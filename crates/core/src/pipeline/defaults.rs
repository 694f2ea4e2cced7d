//! # Default Generation
//!
//! Business-type-keyed lookup tables for suggested colors, fonts, goals,
//! and section lists, plus the context-inference helpers. Color
//! derivation is a deliberate per-channel RGB heuristic, not a perceptual
//! color space (see DESIGN.md).

use std::collections::BTreeMap;

/// Normalize a free-text business type onto a table key.
fn business_key(business_type: &str) -> &'static str {
    let t = business_type.to_lowercase();
    if t.contains("restaurant") || t.contains("cafe") || t.contains("bakery") || t.contains("food")
    {
        "food"
    } else if t.contains("shop") || t.contains("store") || t.contains("retail") {
        "retail"
    } else if t.contains("agency") || t.contains("consult") || t.contains("studio") {
        "services"
    } else if t.contains("tech") || t.contains("software") || t.contains("saas") || t.contains("app")
    {
        "tech"
    } else if t.contains("fitness") || t.contains("gym") || t.contains("yoga") || t.contains("health")
    {
        "wellness"
    } else {
        "general"
    }
}

pub fn default_primary_color(business_type: &str) -> &'static str {
    match business_key(business_type) {
        "food" => "#c0392b",
        "retail" => "#8e44ad",
        "services" => "#2c3e50",
        "tech" => "#2980b9",
        "wellness" => "#27ae60",
        _ => "#34495e",
    }
}

pub fn default_heading_font(business_type: &str) -> &'static str {
    match business_key(business_type) {
        "food" => "Playfair Display",
        "retail" => "Poppins",
        "services" => "Merriweather",
        "tech" => "Inter",
        "wellness" => "Nunito",
        _ => "Montserrat",
    }
}

pub fn default_body_font(business_type: &str) -> &'static str {
    match business_key(business_type) {
        "food" => "Lato",
        "tech" => "Inter",
        _ => "Open Sans",
    }
}

pub fn default_tagline(business_type: &str) -> String {
    match business_key(business_type) {
        "food" => "Made fresh, every day".to_string(),
        "retail" => "Find something you'll love".to_string(),
        "services" => "Expertise you can count on".to_string(),
        "tech" => "Build faster, ship sooner".to_string(),
        "wellness" => "Feel better, live better".to_string(),
        _ => "Welcome to our site".to_string(),
    }
}

/// Comma-separated section list for the Structure step.
pub fn default_sections(business_type: &str) -> &'static str {
    match business_key(business_type) {
        "food" => "hero,about,gallery,testimonials,contact",
        "retail" => "hero,features,gallery,pricing,contact",
        "services" => "hero,services,about,testimonials,contact",
        "tech" => "hero,features,pricing,faq,cta,contact",
        "wellness" => "hero,about,services,team,contact",
        _ => "hero,about,features,contact",
    }
}

pub fn default_site_goals(business_type: &str) -> &'static str {
    match business_key(business_type) {
        "food" => "showcase the menu,drive reservations",
        "retail" => "show products,drive purchases",
        "services" => "build trust,generate leads",
        "tech" => "explain the product,convert signups",
        "wellness" => "introduce the team,book sessions",
        _ => "introduce the business,collect inquiries",
    }
}

pub fn infer_target_audience(business_type: &str) -> &'static str {
    match business_key(business_type) {
        "food" => "local diners and food lovers",
        "retail" => "shoppers looking for curated products",
        "services" => "businesses in need of professional help",
        "tech" => "teams evaluating new software",
        "wellness" => "people investing in their health",
        _ => "local customers",
    }
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Secondary color: each channel darkened by a flat 40, saturating at 0.
pub fn derive_secondary_color(primary: &str) -> Option<String> {
    let (r, g, b) = parse_hex(primary)?;
    Some(format!(
        "#{:02x}{:02x}{:02x}",
        r.saturating_sub(40),
        g.saturating_sub(40),
        b.saturating_sub(40)
    ))
}

/// Accent color: straight per-channel inversion.
pub fn derive_accent_color(primary: &str) -> Option<String> {
    let (r, g, b) = parse_hex(primary)?;
    Some(format!("#{:02x}{:02x}{:02x}", 255 - r, 255 - g, 255 - b))
}

/// Suggested value for an unset `generate_default` field, if the tables
/// know the field.
pub fn suggest_default(field: &str, data: &BTreeMap<String, String>) -> Option<String> {
    let business_type = data.get("business_type").map(String::as_str).unwrap_or("");
    match field {
        "tagline" => Some(default_tagline(business_type)),
        "heading_font" => Some(default_heading_font(business_type).to_string()),
        "body_font" => Some(default_body_font(business_type).to_string()),
        "sections" => Some(default_sections(business_type).to_string()),
        "site_goals" => Some(default_site_goals(business_type).to_string()),
        _ => None,
    }
}

/// Inferred value for an `infer_from_context` field whose dependencies are
/// all held.
pub fn infer_from_context(field: &str, data: &BTreeMap<String, String>) -> Option<String> {
    match field {
        "secondary_color" => derive_secondary_color(data.get("primary_color")?),
        "accent_color" => derive_accent_color(data.get("primary_color")?),
        "target_audience" => Some(infer_target_audience(data.get("business_type")?).to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secondary_darkens_each_channel() {
        assert_eq!(
            derive_secondary_color("#506070").as_deref(),
            Some("#283848")
        );
        // Saturates at zero instead of wrapping
        assert_eq!(
            derive_secondary_color("#100000").as_deref(),
            Some("#000000")
        );
    }

    #[test]
    fn test_accent_inverts() {
        assert_eq!(derive_accent_color("#000000").as_deref(), Some("#ffffff"));
        assert_eq!(derive_accent_color("#2980b9").as_deref(), Some("#d67f46"));
    }

    #[test]
    fn test_malformed_color_yields_none() {
        assert_eq!(derive_secondary_color("blue"), None);
        assert_eq!(derive_secondary_color("#12345"), None);
    }

    #[test]
    fn test_defaults_keyed_by_business_type() {
        let mut data = BTreeMap::new();
        data.insert("business_type".to_string(), "coffee cafe".to_string());
        assert_eq!(
            suggest_default("heading_font", &data).as_deref(),
            Some("Playfair Display")
        );

        data.insert("business_type".to_string(), "saas startup".to_string());
        assert_eq!(
            suggest_default("sections", &data).as_deref(),
            Some("hero,features,pricing,faq,cta,contact")
        );
    }

    #[test]
    fn test_infer_requires_dependency() {
        let data = BTreeMap::new();
        assert_eq!(infer_from_context("secondary_color", &data), None);
    }
}
