use ironcart::clean::{CleaningOptions, CleaningReport, clean, clean_with_report};
use ironcart::io::ingest::{IngestOptions, ingest_str};
use ironcart::records::{ColumnMapping, RawRecord};
use ironcart::testing::{SAMPLE_ROWS, SAMPLE_TRANSACTIONS, assert_all, assert_close, sample_csv};

const HEADER: &str = "InvoiceNo,Description,Quantity,InvoiceDate,UnitPrice,CustomerID";

fn rows(body: &[&str]) -> Vec<RawRecord> {
    let text = std::iter::once(HEADER)
        .chain(body.iter().copied())
        .collect::<Vec<_>>()
        .join("\n");
    let res = ingest_str(&text, &IngestOptions::default());
    assert!(res.is_ok(), "{:?}", res.errors);
    res.rows
}

#[test]
fn sample_loses_one_row_per_stage() {
    let res = ingest_str(&sample_csv(), &IngestOptions::default());
    let (txns, report) =
        clean_with_report(&res.rows, &ColumnMapping::default(), &CleaningOptions::default());
    assert_eq!(
        report,
        CleaningReport {
            input_rows: SAMPLE_ROWS,
            duplicates_removed: 1,
            null_customer_removed: 1,
            non_positive_quantity_removed: 1,
            non_positive_price_removed: 1,
            invalid_removed: 0,
            output_rows: SAMPLE_TRANSACTIONS,
        }
    );
    assert_eq!(txns.len(), SAMPLE_TRANSACTIONS);
    assert_all(&txns, |t| t.total_price > 0.0 && !t.customer_id.is_empty());
}

#[test]
fn final_filter_runs_with_every_stage_disabled() {
    let res = ingest_str(&sample_csv(), &IngestOptions::default());
    let (txns, report) =
        clean_with_report(&res.rows, &ColumnMapping::default(), &CleaningOptions::none());
    // the negative quantity and the zero price still fail the total check
    assert_eq!(report.invalid_removed, 2);
    assert_eq!(txns.len(), SAMPLE_ROWS - 2);
    assert!(txns.iter().any(|t| t.customer_id.is_empty()));
}

#[test]
fn total_price_is_quantity_times_unit_price() {
    let recs = rows(&["1,Pen,3,2011-01-05 10:00,1.25,C1"]);
    let txns = clean(&recs, &ColumnMapping::default(), &CleaningOptions::default());
    assert_eq!(txns.len(), 1);
    assert_close(txns[0].total_price, 3.75, 1e-12);
    assert_eq!(txns[0].invoice_date.to_rfc3339(), "2011-01-05T10:00:00+00:00");
}

#[test]
fn invalid_dates_are_dropped() {
    let recs = rows(&[
        "1,Pen,1,2/30/2023,1,C1",
        "2,Pen,1,not a date,1,C1",
        "3,Pen,1,2/28/2023,1,C1",
    ]);
    let (txns, report) =
        clean_with_report(&recs, &ColumnMapping::default(), &CleaningOptions::default());
    assert_eq!(report.invalid_removed, 2);
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].invoice_id, "3");
}

#[test]
fn unparseable_quantity_survives_filter_but_not_validation() {
    let recs = rows(&["1,Pen,lots,2023-01-01,1,C1"]);
    let (txns, report) =
        clean_with_report(&recs, &ColumnMapping::default(), &CleaningOptions::default());
    assert_eq!(report.non_positive_quantity_removed, 0);
    assert_eq!(report.invalid_removed, 1);
    assert!(txns.is_empty());
}

#[test]
fn blank_customer_is_null() {
    let recs = rows(&["1,Pen,1,2023-01-01,1,   ", "2,Pen,1,2023-01-01,1,C9"]);
    let (txns, report) =
        clean_with_report(&recs, &ColumnMapping::default(), &CleaningOptions::default());
    assert_eq!(report.null_customer_removed, 1);
    assert_eq!(txns[0].customer_id, "C9");
}

#[test]
fn missing_description_is_invalid() {
    let recs = rows(&["1,,1,2023-01-01,1,C1"]);
    assert!(clean(&recs, &ColumnMapping::default(), &CleaningOptions::default()).is_empty());
}

#[test]
fn duplicates_only_removed_when_enabled() {
    let recs = rows(&["1,Pen,1,2023-01-01,1,C1", "1,Pen,1,2023-01-01,1,C1"]);
    let keep = CleaningOptions {
        remove_duplicate_transactions: false,
        ..CleaningOptions::default()
    };
    assert_eq!(clean(&recs, &ColumnMapping::default(), &keep).len(), 2);
    assert_eq!(
        clean(&recs, &ColumnMapping::default(), &CleaningOptions::default()).len(),
        1
    );
}

#[test]
fn custom_mapping_reads_other_headers() {
    let text = "Invoice,Item,Qty,When,Price,Customer ID\nA1,Lamp,2,1/15/2011 9:05:30,10,77\n";
    let res = ingest_str(text, &IngestOptions::default());
    let mapping = ColumnMapping {
        customer_id: "Customer ID".into(),
        invoice_id: "Invoice".into(),
        invoice_date: "When".into(),
        quantity: "Qty".into(),
        unit_price: "Price".into(),
        description: "Item".into(),
    };
    let txns = clean(&res.rows, &mapping, &CleaningOptions::default());
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].customer_id, "77");
    assert_eq!(txns[0].invoice_date.to_rfc3339(), "2011-01-15T09:05:30+00:00");
    assert_close(txns[0].total_price, 20.0, 1e-12);
}
