//! Prompt assembly.
//!
//! One prompt per cache miss asks for predictions, a summary and restocking
//! suggestions together, so a shop costs a single model call per TTL window.

use std::fmt::Write as _;

use crate::parse::ModelInsights;
use crate::snapshot::ShopSnapshot;

const SYSTEM_PROMPT: &str = "You are a retail analyst for small independent shops. \
You study recent sales and stock levels and give concise, practical advice. \
You must output strictly valid JSON conforming to the schema you are given. \
Do NOT output markdown or conversational text, only the JSON object.";

/// System + user text for a single model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Build the consolidated insights prompt for one shop.
pub fn build_prompt(snapshot: &ShopSnapshot) -> Prompt {
    let mut out = String::new();
    let currency = snapshot.currency.as_str();

    let _ = writeln!(out, "Shop: {} (currency {currency})", snapshot.shop_name);
    let _ = writeln!(
        out,
        "Window: {} to {} ({} days)",
        snapshot.window_since.format("%Y-%m-%d"),
        snapshot.window_until.format("%Y-%m-%d"),
        snapshot.window_days()
    );
    out.push('\n');

    out.push_str("Per-product totals for the window:\n");
    let summary = snapshot.summarize();
    if summary.is_empty() {
        out.push_str("- (no products)\n");
    }
    for s in &summary {
        let _ = write!(
            out,
            "- {} [{}]: {} units sold, revenue {} {currency}, {:.2} units/day",
            s.product_name,
            s.sku,
            s.units_sold,
            format_minor(s.revenue),
            s.daily_velocity
        );
        if let Some(stock) = s.stock {
            let _ = write!(out, ", stock {stock}");
        }
        if let Some(level) = s.reorder_level {
            let _ = write!(out, ", reorder level {level}");
        }
        if let Some(days) = s.days_of_cover {
            let _ = write!(out, ", ~{days:.1} days of cover");
        }
        out.push('\n');
    }
    out.push('\n');

    let _ = writeln!(out, "Recent sales, newest first ({}):", snapshot.sales.len());
    if snapshot.sales.is_empty() {
        out.push_str("- (no sales recorded in this window)\n");
    }
    for sale in &snapshot.sales {
        let _ = writeln!(
            out,
            "- {} {} x{} @ {} {currency}",
            sale.sold_at.format("%Y-%m-%d %H:%M"),
            sale.product_name,
            sale.quantity,
            format_minor(sale.unit_price)
        );
    }
    out.push('\n');

    out.push_str(
        "Tasks:\n\
         1. predictions: expected units per product for the next 7 days, with a confidence between 0 and 1.\n\
         2. summary: two or three sentences on how the shop is trading.\n\
         3. restocking: products that should be reordered, with a quantity greater than zero, \
         an urgency of low, medium or high, and a short reason. Use an empty list if nothing needs reordering.\n\n",
    );

    let _ = write!(
        out,
        "Respond with one JSON object with exactly the keys \"predictions\", \"summary\" and \"restocking\".\n\
         JSON Schema:\n{}\n",
        response_schema()
    );

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user: out,
    }
}

fn response_schema() -> String {
    let schema = schemars::schema_for!(ModelInsights);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Render minor units as a decimal amount ("1234" -> "12.34").
pub fn format_minor(amount: u64) -> String {
    format!("{}.{:02}", amount / 100, amount % 100)
}
