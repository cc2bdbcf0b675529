//! Prompt text for the advisor calls.

use std::fmt::Write as _;

use crate::model::ScoredTransaction;

/// How many recent transactions go into a chat prompt.
pub const CHAT_CONTEXT_TRANSACTIONS: usize = 5;

pub fn suggest(product_name: &str, current_score: u8, category: Option<&str>) -> String {
    let category_line = category
        .map(|c| format!("Category: {c}\n\n"))
        .unwrap_or_default();
    format!(
        "Suggest 2 eco-friendly alternatives for \"{product_name}\" (Score: {current_score}/100).

{category_line}Be concise:
• Product name
• Why it's better (1 sentence)
• Where to buy

Keep it under 100 words total."
    )
}

pub fn batch<S: AsRef<str>>(items: &[(S, S)]) -> String {
    let list = items
        .iter()
        .enumerate()
        .map(|(i, (name, category))| format!("{}. {} (Category: {})", i + 1, name.as_ref(), category.as_ref()))
        .collect::<Vec<_>>()
        .join("\n");
    let n = items.len();
    format!(
        "You are a sustainability expert. Analyze these products and provide environmental sustainability scores for each.

Products:
{list}

For each product, provide a JSON object with:
- score (0-100, where 100 is most sustainable)
- reasoning (brief explanation)
- category (product category)
- sustainabilityFactors (materials, packaging, durability, recyclability, carbonFootprint - each 0-100)

Return a JSON array with exactly {n} objects, one for each product in order.

Consider:
- Organic, recycled, or renewable materials score higher
- Minimal or eco-friendly packaging scores higher
- Durable, long-lasting products score higher
- Recyclable or biodegradable products score higher
- Single-use plastics and fast fashion score very low

Return ONLY the JSON array, no additional text."
    )
}

pub fn chat(message: &str, recent: &[ScoredTransaction], overall_score: Option<u8>) -> String {
    let mut context = String::new();
    if let Some(score) = overall_score {
        let _ = write!(context, "User's Overall Sustainability Score: {score}/100\n\n");
    }
    if !recent.is_empty() {
        context.push_str("Recent Transactions:\n");
        for t in recent.iter().take(CHAT_CONTEXT_TRANSACTIONS) {
            let _ = writeln!(
                context,
                "- {}: ${:.2} (Score: {}/100)",
                t.merchant_name, t.total_amount, t.transaction_score
            );
        }
        context.push('\n');
    }
    format!(
        "You are a helpful sustainability assistant for LeafCart, a platform that helps users track and improve their environmental impact through shopping choices.

{context}User Question: {message}

Provide a helpful, friendly, and informative response. Focus on:
- Practical sustainability advice
- Eco-friendly product alternatives
- Understanding sustainability scores
- Tips to improve environmental impact
- Positive encouragement

Keep responses concise (2-3 paragraphs max) and actionable."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_prompt_numbers_items() {
        let p = batch(&[("Bamboo Brush", "Personal Care"), ("Widget", "Other")]);
        assert!(p.contains("1. Bamboo Brush (Category: Personal Care)"));
        assert!(p.contains("2. Widget (Category: Other)"));
        assert!(p.contains("exactly 2 objects"));
    }

    #[test]
    fn suggest_prompt_mentions_score() {
        let p = suggest("Plastic Fork", 15, None);
        assert!(p.contains("\"Plastic Fork\" (Score: 15/100)"));
        assert!(!p.contains("Category:"));
    }
}
