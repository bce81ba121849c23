use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Limit value meaning "no cap".
pub const UNLIMITED: i32 = -1;

/// Catalog entry. Numeric limits use `-1` for unlimited.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub currency: String,
    pub interval: String,
    pub invoice_limit: i32,
    pub client_limit: i32,
    pub messages_per_day: i32,
    pub image_generation: bool,
    pub custom_voice: bool,
    pub priority_support: bool,
    pub advanced_analytics: bool,
    pub api_access: bool,
    pub white_label: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    /// Human-readable feature bullets for the pricing page.
    pub fn feature_list(&self) -> Vec<String> {
        let mut features = Vec::new();

        features.push(match self.invoice_limit {
            UNLIMITED => "Unlimited invoices".to_string(),
            n => format!("Up to {} invoices/month", n),
        });
        features.push(match self.client_limit {
            UNLIMITED => "Unlimited clients".to_string(),
            n => format!("Up to {} clients", n),
        });
        features.push(match self.messages_per_day {
            UNLIMITED => "Unlimited messages".to_string(),
            n => format!("{} messages/day", n),
        });

        let flags = [
            (self.image_generation, "AI image generation"),
            (self.custom_voice, "Custom voice cloning"),
            (self.priority_support, "Priority support"),
            (self.advanced_analytics, "Advanced analytics"),
            (self.api_access, "API access"),
            (self.white_label, "White-label branding"),
        ];
        features.extend(
            flags
                .into_iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, label)| label.to_string()),
        );

        features
    }

    pub fn is_popular(&self) -> bool {
        self.name == "Pro"
    }
}

/// Starter, Pro and Business, seeded at startup.
pub fn default_plans() -> Vec<Plan> {
    let now = Utc::now();
    let plan = |id: &str, name: &str, price: i64, limits: (i32, i32, i32), flags: [bool; 6]| Plan {
        id: id.to_string(),
        name: name.to_string(),
        price: Decimal::from(price),
        currency: "USD".to_string(),
        interval: "month".to_string(),
        invoice_limit: limits.0,
        client_limit: limits.1,
        messages_per_day: limits.2,
        image_generation: flags[0],
        custom_voice: flags[1],
        priority_support: flags[2],
        advanced_analytics: flags[3],
        api_access: flags[4],
        white_label: flags[5],
        created_at: now,
        updated_at: now,
    };

    vec![
        plan("PLN-STARTER", "Starter", 10, (50, 10, 100), [false; 6]),
        plan(
            "PLN-PRO",
            "Pro",
            29,
            (UNLIMITED, UNLIMITED, 1000),
            [true, true, true, true, true, false],
        ),
        plan(
            "PLN-BUSINESS",
            "Business",
            99,
            (UNLIMITED, UNLIMITED, UNLIMITED),
            [true; 6],
        ),
    ]
}
