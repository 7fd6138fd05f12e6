use std::sync::Arc;

use quote_race_engine::{Quote, QuoteBid};
use quote_race_tests::{upstream_quote_body, DelayedRepository, TestCtxBuilder};
use util::ms;

mod util;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(20_000)]
async fn test_quote_is_served_stored_and_logged() -> eyre::Result<()> {
    let ctx = TestCtxBuilder::new().build().await?;

    let res = ctx.api.get_quote().await?;
    let quote = res.result?;
    assert_eq!(quote.code, "USD");
    assert_eq!(quote.codein, "BRL");
    assert_eq!(quote.bid, 5.1234);
    assert_eq!(quote.ask, 5.13);

    assert_eq!(ctx.stored_quotes()?, 1);
    assert_eq!(ctx.latest_stored()?.as_ref(), Some(&quote));
    assert_eq!(ctx.ledger_lines()?, vec!["Dólar: 5.12"]);

    // The ledger keeps every quote
    ctx.api.get_quote().await?.result?;
    assert_eq!(ctx.stored_quotes()?, 2);
    assert_eq!(ctx.ledger_lines()?, vec!["Dólar: 5.12", "Dólar: 5.12"]);

    ctx.finish().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(20_000)]
async fn test_slow_upstream_is_an_error() -> eyre::Result<()> {
    let ctx = TestCtxBuilder::new()
        .with_fetch_budget(ms(200))
        .with_upstream_delay(ms(1_500))
        .build()
        .await?;

    let started = std::time::Instant::now();
    let err = ctx
        .api
        .get_quote()
        .await?
        .result
        .expect_err("A quote arriving after the budget must not be served.");
    assert!(started.elapsed() < ms(1_000));
    assert_eq!(err.status, 500);
    assert_eq!(err.msg, "Erro ao obter a cotação do dólar");

    assert_eq!(ctx.stored_quotes()?, 0);
    assert!(ctx.ledger_lines()?.is_empty());

    ctx.finish().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(20_000)]
async fn test_insert_past_budget_leaves_no_row() -> eyre::Result<()> {
    let ctx = TestCtxBuilder::new()
        .with_fetch_budget(ms(150))
        .with_repository(Arc::new(DelayedRepository::new(ms(300))?))
        .build()
        .await?;

    let started = std::time::Instant::now();
    let err = ctx
        .api
        .get_quote()
        .await?
        .result
        .expect_err("An insert running past the budget must fail the request.");
    assert!(started.elapsed() < ms(300));
    assert_eq!(err.status, 500);
    assert_eq!(err.msg, "Erro ao salvar a cotação no banco de dados");

    // Let the delayed insert run to its end
    tokio::time::sleep(ms(400)).await;
    assert_eq!(
        ctx.stored_quotes()?,
        0,
        "A quote the client was told failed must not be stored."
    );
    assert!(ctx.ledger_lines()?.is_empty());

    ctx.finish().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(20_000)]
async fn test_slow_insert_within_budget_is_stored() -> eyre::Result<()> {
    let ctx = TestCtxBuilder::new()
        .with_fetch_budget(ms(1_000))
        .with_repository(Arc::new(DelayedRepository::new(ms(50))?))
        .build()
        .await?;

    let quote = ctx.api.get_quote().await?.result?;
    assert_eq!(ctx.stored_quotes()?, 1);
    assert_eq!(ctx.latest_stored()?, Some(quote));
    assert_eq!(ctx.ledger_lines()?, vec!["Dólar: 5.12"]);

    ctx.finish().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(20_000)]
async fn test_bad_upstream_answers_are_errors() -> eyre::Result<()> {
    for ctx in [
        TestCtxBuilder::new().with_upstream_status(503).build().await?,
        TestCtxBuilder::new()
            .with_upstream_body(r#"{"USDBRL": {"bid": "cinco"}}"#)
            .build()
            .await?,
        TestCtxBuilder::new()
            .with_upstream_body("not json")
            .build()
            .await?,
    ] {
        let err = ctx.api.get_quote().await?.result.unwrap_err();
        assert_eq!(err.status, 500);
        assert_eq!(err.msg, "Erro ao obter a cotação do dólar");
        assert_eq!(ctx.stored_quotes()?, 0);
        ctx.finish().await;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(20_000)]
async fn test_parallel_requests_are_all_stored() -> eyre::Result<()> {
    let ctx = TestCtxBuilder::new().with_workers(3).build().await?;

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let api = ctx.api.clone();
            tokio::spawn(async move { api.get_quote().await })
        })
        .collect();
    for handle in handles {
        handle.await??.result?;
    }

    assert_eq!(ctx.stored_quotes()?, 6);
    assert_eq!(ctx.ledger_lines()?.len(), 6);

    ctx.finish().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(20_000)]
async fn test_debug_reports_counters() -> eyre::Result<()> {
    let ctx = TestCtxBuilder::new().build().await?;

    let before = ctx.api.debug().await?.result?;
    assert_eq!(before, "quote desk up: 0 served, 0 stored");

    ctx.api.get_quote().await?.result?;
    let after = ctx.api.debug().await?.result?;
    assert_eq!(after, "quote desk up: 1 served, 1 stored");

    ctx.finish().await;
    Ok(())
}

#[test]
fn test_quote_numbers_travel_as_strings() -> eyre::Result<()> {
    #[derive(serde::Deserialize)]
    struct Envelope {
        #[serde(rename = "USDBRL")]
        usd_brl: Quote,
    }

    let quote = serde_json::from_str::<Envelope>(&upstream_quote_body("5.0001"))?.usd_brl;
    assert_eq!(quote.bid, 5.0001);
    assert_eq!(quote.var_bid, 0.0123);

    let json: serde_json::Value = serde_json::to_value(&quote)?;
    assert_eq!(json["bid"], "5.0001");
    assert_eq!(json["varBid"], "0.0123");

    let bid: QuoteBid = serde_json::from_value(json)?;
    assert_eq!(bid.bid, 5.0001);
    Ok(())
}
