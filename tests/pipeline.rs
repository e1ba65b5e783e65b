use anyhow::Result;
use ironcart::config::{ExecutionSettings, Settings};
use ironcart::metrics;
use ironcart::pipeline::{Analyzer, Notice};
use ironcart::testing::{
    SAMPLE_BASKETS, SAMPLE_CUSTOMERS, SAMPLE_ROWS, SAMPLE_TRANSACTIONS, sample_csv,
};

#[test]
fn sample_runs_end_to_end() -> Result<()> {
    let report = Analyzer::default().analyze_str(&sample_csv())?;

    assert_eq!(report.ingest.row_count, SAMPLE_ROWS);
    assert!(!report.ingest.truncated);
    assert!(!report.ingest.headers_repaired);
    assert_eq!(report.cleaning.output_rows, SAMPLE_TRANSACTIONS);
    assert_eq!(report.rfm.len(), SAMPLE_CUSTOMERS);
    assert_eq!(report.cltv.customer_details.len(), SAMPLE_CUSTOMERS);
    assert_eq!(report.basket.basket_count, SAMPLE_BASKETS);
    assert!(report.notices.is_empty());

    let m = &report.metrics;
    assert_eq!(m.counter(metrics::ROWS_INGESTED), Some(SAMPLE_ROWS as u64));
    assert_eq!(m.counter(metrics::TRANSACTIONS), Some(SAMPLE_TRANSACTIONS as u64));
    assert_eq!(m.counter(metrics::CUSTOMERS), Some(SAMPLE_CUSTOMERS as u64));
    for stage in ["ingest", "clean", "rfm", "cltv", "basket"] {
        assert!(m.stage(stage).is_some(), "missing stage {stage}");
    }
    Ok(())
}

#[test]
fn blank_header_is_repaired_automatically() -> Result<()> {
    let text = sample_csv().replacen("StockCode", "", 1);
    let report = Analyzer::default().analyze_str(&text)?;
    assert!(report.ingest.headers_repaired);
    assert_eq!(report.ingest.headers[1], "Column_2");
    assert_eq!(report.cleaning.output_rows, SAMPLE_TRANSACTIONS);
    Ok(())
}

#[test]
fn file_with_blank_header_is_reread() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("orders.csv");
    std::fs::write(&path, sample_csv().replacen("Country", " ", 1))?;
    let report = Analyzer::default().analyze_path(&path)?;
    assert!(report.ingest.headers_repaired);
    assert_eq!(report.rfm.len(), SAMPLE_CUSTOMERS);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip_source_is_decompressed() -> Result<()> {
    use std::io::Write;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("orders.csv.gz");
    let mut enc = flate2::write::GzEncoder::new(
        std::fs::File::create(&path)?,
        flate2::Compression::default(),
    );
    enc.write_all(sample_csv().as_bytes())?;
    enc.finish()?;

    let report = Analyzer::default().analyze_path(&path)?;
    assert_eq!(report.ingest.row_count, SAMPLE_ROWS);
    Ok(())
}

#[test]
fn duplicate_headers_abort() {
    let text = sample_csv().replacen("StockCode", "Country", 1);
    let err = Analyzer::default().analyze_str(&text).unwrap_err();
    assert!(err.to_string().contains("Duplicate column headers: Country"));
}

#[test]
fn mapping_mismatch_aborts() {
    let text = sample_csv().replacen("UnitPrice", "Price", 1);
    let err = Analyzer::default().analyze_str(&text).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("unit_price"), "{msg}");
    assert!(msg.contains("missing_column"), "{msg}");
}

#[test]
fn nothing_left_after_cleaning_is_a_notice() -> Result<()> {
    let text = "InvoiceNo,Description,Quantity,InvoiceDate,UnitPrice,CustomerID\n\
                1,Pen,-1,2024-01-01,1,C1\n\
                2,Ink,0,2024-01-01,1,C2\n";
    let report = Analyzer::default().analyze_str(text)?;
    assert_eq!(report.notices, vec![Notice::NoTransactions]);
    assert!(report.rfm.is_empty());
    assert!(report.basket.rules.is_empty());
    Ok(())
}

#[test]
fn strict_support_reports_missing_items_and_rules() -> Result<()> {
    let mut settings = Settings::default();
    settings.basket.min_support = 1.0;
    let report = Analyzer::new(settings).analyze_str(&sample_csv())?;
    assert_eq!(report.notices, vec![Notice::NoFrequentItems, Notice::NoRules]);
    assert!(!report.rfm.is_empty());
    Ok(())
}

#[test]
fn row_limit_truncates_the_run() -> Result<()> {
    let mut settings = Settings::default();
    settings.ingest.row_limit = 3;
    let report = Analyzer::new(settings).analyze_str(&sample_csv())?;
    assert!(report.ingest.truncated);
    assert_eq!(report.ingest.row_count, 3);
    assert_eq!(report.cleaning.input_rows, 3);
    Ok(())
}

#[test]
fn dedicated_pool_gives_same_results() -> Result<()> {
    let sequential = Analyzer::default().analyze_str(&sample_csv())?;
    let settings = Settings {
        execution: ExecutionSettings {
            parallel: true,
            threads: Some(2),
        },
        ..Settings::default()
    };
    let parallel = Analyzer::new(settings).analyze_str(&sample_csv())?;
    assert_eq!(parallel.rfm, sequential.rfm);
    assert_eq!(parallel.cltv, sequential.cltv);
    assert_eq!(parallel.basket, sequential.basket);
    Ok(())
}
