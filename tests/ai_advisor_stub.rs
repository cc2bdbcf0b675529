// tests/ai_advisor_stub.rs
//
// Advisor behaviour with scripted providers: no network, deterministic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use leafcart::aggregate::Aggregator;
use leafcart::ai::{
    Advisor, BatchItem, ChatContext, ChatRequest, DisabledProvider, MockProvider, SuggestRequest,
    CHAT_EMPTY, CHAT_UNAVAILABLE, SUGGEST_EMPTY, SUGGEST_UNAVAILABLE,
};
use leafcart::fixtures::load_catalog;
use leafcart::model::SustainabilityFactors;

fn suggest_req() -> SuggestRequest {
    SuggestRequest {
        product_name: "Plastic Water Bottles 24-Pack".into(),
        current_score: 22,
        category: None,
    }
}

#[tokio::test]
async fn suggest_fallbacks() {
    let failing = Advisor::new(Arc::new(MockProvider::failing("timeout")));
    assert_eq!(failing.suggest(&suggest_req()).await, SUGGEST_UNAVAILABLE);

    let empty = Advisor::new(Arc::new(MockProvider::fixed("   ")));
    assert_eq!(empty.suggest(&suggest_req()).await, SUGGEST_EMPTY);

    let ok = Advisor::new(Arc::new(MockProvider::fixed("Glass bottle\n")));
    assert_eq!(ok.suggest(&suggest_req()).await, "Glass bottle");
}

#[tokio::test]
async fn chat_uses_first_five_transactions_as_context() {
    let catalog = load_catalog().unwrap();
    let bundle = Aggregator::default().score_merchants(&catalog, leafcart::classify);
    assert!(bundle.scored_transactions.len() > 5);

    let mock = Arc::new(MockProvider::fixed("Sure."));
    let advisor = Advisor::new(mock.clone());
    let req = ChatRequest {
        message: "How am I doing?".into(),
        context: Some(ChatContext {
            recent_transactions: bundle.scored_transactions.clone(),
            overall_score: Some(bundle.overall_score),
        }),
    };
    assert_eq!(advisor.chat(&req).await, "Sure.");

    let prompt = &mock.prompts()[0];
    assert_eq!(prompt.matches("(Score: ").count(), 5);
    assert!(prompt.contains(&format!("Overall Sustainability Score: {}/100", bundle.overall_score)));
    assert!(prompt.contains("User Question: How am I doing?"));
}

#[tokio::test]
async fn chat_fallbacks() {
    let req = ChatRequest {
        message: "hi".into(),
        context: None,
    };
    let disabled = Advisor::new(Arc::new(DisabledProvider));
    assert!(!disabled.is_enabled());
    assert_eq!(disabled.chat(&req).await, CHAT_UNAVAILABLE);

    let empty = Advisor::new(Arc::new(MockProvider::fixed("")));
    assert_eq!(empty.chat(&req).await, CHAT_EMPTY);
}

#[tokio::test]
async fn batch_aligns_by_position_and_fills_gaps() {
    let reply = r#"Here you go:
    [
      {"score": 92, "reasoning": "Organic and local", "category": "Produce",
       "sustainabilityFactors": {"materials": 95, "packaging": 90, "durability": 60, "recyclability": 98, "carbonFootprint": 88}},
      {"reasoning": "Petroleum based"}
    ]
    Hope that helps."#;
    let advisor = Advisor::new(Arc::new(MockProvider::fixed(reply)));
    let items = vec![
        BatchItem::new("Organic Banana", Some("Food & Groceries")),
        BatchItem::new("Plastic Fork", None),
        BatchItem::new("Mystery Item", Some("Other")),
    ];
    let out = advisor.score_batch(&items).await;
    assert_eq!(out.len(), 3);

    assert_eq!(out[0].product_name, "Organic Banana");
    assert_eq!(out[0].score, 92);
    assert_eq!(out[0].category, "Produce");
    assert_eq!(out[0].factors.recyclability, 98);

    assert_eq!(out[1].score, 50);
    assert_eq!(out[1].reasoning, "Petroleum based");
    assert_eq!(out[1].category, "Unknown");
    assert_eq!(out[1].factors, SustainabilityFactors::uniform(50));

    assert_eq!(out[2].score, 50);
    assert_eq!(out[2].reasoning, "Unable to analyze");
    assert_eq!(out[2].category, "Other");
}

#[tokio::test]
async fn batch_failure_degrades_every_item() {
    for advisor in [
        Advisor::new(Arc::new(MockProvider::failing("quota"))),
        Advisor::new(Arc::new(MockProvider::fixed("I cannot help with that."))),
    ] {
        let items = vec![BatchItem::new("A", Some("Food")), BatchItem::new("B", None)];
        let out = advisor.score_batch(&items).await;
        assert_eq!(out.len(), 2);
        for (s, item) in out.iter().zip(&items) {
            assert_eq!(s.product_name, item.name);
            assert_eq!(s.score, 50);
            assert_eq!(s.reasoning, "Unable to analyze product with AI");
        }
        assert_eq!(out[0].category, "Food");
        assert_eq!(out[1].category, "Unknown");
    }
}

#[tokio::test]
async fn batches_are_split_and_paced() {
    let mock = Arc::new(MockProvider::fixed("[]"));
    let advisor = Advisor::new(mock.clone());
    let items: Vec<BatchItem> = (0..25).map(|i| BatchItem::new(format!("item {i}"), None)).collect();

    let started = Instant::now();
    let out = advisor.score_in_batches(&items, 10, Duration::from_millis(20)).await;
    assert_eq!(out.len(), 25);
    assert_eq!(mock.prompts().len(), 3);
    // two pauses between three calls
    assert!(started.elapsed() >= Duration::from_millis(40));
    assert!(mock.prompts()[2].contains("exactly 5 objects"));
}

#[tokio::test]
async fn advisor_bundle_goes_through_the_aggregator() {
    let catalog = load_catalog().unwrap();
    let amazon: Vec<_> = catalog.into_iter().filter(|m| m.id == "amazon").collect();

    let mock = Arc::new(MockProvider::fixed("not json"));
    let advisor = Advisor::new(mock.clone()).with_batching(10, Duration::ZERO);
    let bundle = advisor
        .score_merchants_with_advisor(&Aggregator::default(), &amazon)
        .await;

    // one call per transaction; every product falls back to 50
    assert_eq!(mock.prompts().len(), 3);
    assert_eq!(bundle.overall_score, 50);
    assert!(bundle.scored_transactions.iter().all(|t| t.transaction_score == 50));
    assert_eq!(bundle.product_scores.len(), 6);
}
