//! Built-in template catalog
//!
//! Served when the template store is unreachable or empty. Entries have the
//! same shape as stored templates and fixed ids, so pages created from them
//! keep a stable `templateId`.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::models::{FieldMap, Template, TemplateSection};

pub const STARTUP_TEMPLATE_ID: Uuid = Uuid::from_u128(0x5e1f_0001_0000_4000_8000_000000000001);
pub const PRODUCT_TEMPLATE_ID: Uuid = Uuid::from_u128(0x5e1f_0001_0000_4000_8000_000000000002);
pub const PORTFOLIO_TEMPLATE_ID: Uuid = Uuid::from_u128(0x5e1f_0001_0000_4000_8000_000000000003);
pub const EVENT_TEMPLATE_ID: Uuid = Uuid::from_u128(0x5e1f_0001_0000_4000_8000_000000000004);

/// Read-only table of default templates, built once at start-up
#[derive(Debug, Clone)]
pub struct DefaultCatalog {
    templates: Vec<Template>,
}

fn fields(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        _ => FieldMap::new(),
    }
}

fn section(order: i32, section_type: &str, name: &str, values: Value) -> TemplateSection {
    TemplateSection {
        section_type: section_type.to_string(),
        name: name.to_string(),
        order,
        fields: fields(values),
        style: None,
    }
}

fn template(
    id: Uuid,
    name: &str,
    category: &str,
    description: &str,
    sections: Vec<TemplateSection>,
) -> Template {
    let epoch = DateTime::<Utc>::UNIX_EPOCH;
    Template {
        id,
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        thumbnail: Some(format!("/thumbnails/{id}.png")),
        is_public: true,
        owner_id: None,
        sections,
        created_at: epoch,
        updated_at: epoch,
    }
}

impl DefaultCatalog {
    pub fn new() -> Self {
        let templates = vec![
            template(
                STARTUP_TEMPLATE_ID,
                "Startup Landing",
                "business",
                "Hero, feature grid and pricing for a new product or company",
                vec![
                    section(0, "hero", "Hero", json!({
                        "title": "Build something people want",
                        "subtitle": "Launch faster with a page that explains your idea in seconds.",
                        "ctaText": "Get started",
                        "ctaLink": "#pricing",
                        "backgroundImage": ""
                    })),
                    section(1, "features", "Features", json!({
                        "title": "Why teams choose us",
                        "items": [
                            { "title": "Fast", "description": "Ready in minutes." },
                            { "title": "Simple", "description": "No code required." },
                            { "title": "Reliable", "description": "Hosted for you." }
                        ]
                    })),
                    section(2, "pricing", "Pricing", json!({
                        "title": "Simple pricing",
                        "plans": [
                            { "name": "Starter", "price": "$0", "features": ["1 page"] },
                            { "name": "Pro", "price": "$19", "features": ["Unlimited pages"] }
                        ]
                    })),
                    section(3, "footer", "Footer", json!({ "text": "© Your company" })),
                ],
            ),
            template(
                PRODUCT_TEMPLATE_ID,
                "Product Launch",
                "product",
                "Announce a product with screenshots, testimonials and a call to action",
                vec![
                    section(0, "hero", "Hero", json!({
                        "title": "Meet the new way to work",
                        "subtitle": "Everything you need in one place.",
                        "ctaText": "Join the waitlist",
                        "ctaLink": "#signup"
                    })),
                    section(1, "gallery", "Screenshots", json!({ "images": [] })),
                    section(2, "testimonials", "Testimonials", json!({
                        "items": [{ "quote": "It changed how we ship.", "author": "A happy customer" }]
                    })),
                    section(3, "cta", "Call to action", json!({
                        "title": "Ready to try it?",
                        "buttonText": "Sign up",
                        "buttonLink": "#signup"
                    })),
                ],
            ),
            template(
                PORTFOLIO_TEMPLATE_ID,
                "Portfolio",
                "personal",
                "Introduce yourself and showcase your work",
                vec![
                    section(0, "hero", "Introduction", json!({
                        "title": "Hi, I'm Alex",
                        "subtitle": "Designer and developer",
                        "avatar": ""
                    })),
                    section(1, "gallery", "Projects", json!({ "images": [] })),
                    section(2, "contact", "Contact", json!({
                        "email": "hello@example.com",
                        "buttonText": "Say hello"
                    })),
                ],
            ),
            template(
                EVENT_TEMPLATE_ID,
                "Event",
                "event",
                "Date, agenda and registration for a meetup or conference",
                vec![
                    section(0, "hero", "Hero", json!({
                        "title": "Community Meetup",
                        "subtitle": "Join us for an evening of talks",
                        "date": "",
                        "location": ""
                    })),
                    section(1, "agenda", "Agenda", json!({ "items": [] })),
                    section(2, "cta", "Registration", json!({
                        "title": "Save your seat",
                        "buttonText": "Register",
                        "buttonLink": "#register"
                    })),
                ],
            ),
        ];

        Self { templates }
    }

    pub fn list(&self, category: Option<&str>) -> Vec<Template> {
        self.templates
            .iter()
            .filter(|t| t.in_category(category))
            .cloned()
            .collect()
    }

    pub fn find(&self, id: Uuid) -> Option<Template> {
        self.templates.iter().find(|t| t.id == id).cloned()
    }
}

impl Default for DefaultCatalog {
    fn default() -> Self {
        Self::new()
    }
}
