use quote_race_engine::{InsertGate, Quote, QuoteRepository, RepositoryError, SqliteQuoteRepository};

fn quote(bid: f64) -> Quote {
    Quote {
        code: "USD".to_owned(),
        codein: "BRL".to_owned(),
        name: "Dólar Americano/Real Brasileiro".to_owned(),
        high: 5.2,
        low: 5.0,
        var_bid: 0.0123,
        pct_change: 0.24,
        bid,
        ask: bid + 0.001,
        timestamp: "1700000000".to_owned(),
        create_date: "2023-11-14 19:13:20".to_owned(),
    }
}

#[test]
fn test_empty_repository() -> eyre::Result<()> {
    let repository = SqliteQuoteRepository::in_memory()?;
    assert_eq!(repository.count()?, 0);
    assert_eq!(repository.latest()?, None);
    Ok(())
}

#[test]
fn test_quotes_are_appended() -> eyre::Result<()> {
    let repository = SqliteQuoteRepository::in_memory()?;

    let first = repository.insert_quote(&quote(5.1), &InsertGate::new())?;
    let second = repository.insert_quote(&quote(5.2), &InsertGate::new())?;
    assert!(second > first);
    assert_eq!(repository.count()?, 2);
    assert_eq!(repository.latest()?, Some(quote(5.2)));
    Ok(())
}

#[test]
fn test_file_database_survives_reopening() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("quotes.db");

    SqliteQuoteRepository::open(&path)?.insert_quote(&quote(4.9), &InsertGate::new())?;
    let reopened = SqliteQuoteRepository::open(&path)?;
    assert_eq!(reopened.count()?, 1);
    assert_eq!(reopened.latest()?.map(|q| q.bid), Some(4.9));
    Ok(())
}

#[test]
fn test_abandoned_insert_is_not_committed() -> eyre::Result<()> {
    let repository = SqliteQuoteRepository::in_memory()?;

    let gate = InsertGate::new();
    assert!(gate.abandon());
    assert!(matches!(
        repository.insert_quote(&quote(5.3), &gate),
        Err(RepositoryError::Timeout)
    ));
    assert_eq!(repository.count()?, 0);

    // A gate the repository claimed can no longer be abandoned
    let gate = InsertGate::new();
    repository.insert_quote(&quote(5.4), &gate)?;
    assert!(gate.is_claimed());
    assert!(!gate.abandon());
    assert_eq!(repository.count()?, 1);
    Ok(())
}
