use anyhow::Result;
use ironcart::basket::{AssociationRule, BasketParams, mine_rules};
use ironcart::io::export::{raw_records_to_csv, to_csv_string, write_csv_records};
use ironcart::io::ingest::{IngestOptions, ingest_path, ingest_str};
use ironcart::io::tokenizer::tokenize_line;
use ironcart::rfm::compute_rfm;
use ironcart::testing::{bread_milk_transactions, sample_csv};
use serde::Serialize;

#[derive(Serialize)]
struct Row {
    name: String,
    note: Option<String>,
    qty: u32,
}

#[test]
fn header_comes_from_field_order() -> Result<()> {
    let rule = AssociationRule {
        antecedent: "Bread".into(),
        consequent: "Milk".into(),
        support: 0.5,
        confidence: 1.0,
        lift: 2.0,
    };
    let out = to_csv_string(&[rule])?;
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("antecedent,consequent,support,confidence,lift"));
    assert_eq!(lines.next(), Some("Bread,Milk,0.5,1.0,2.0"));
    Ok(())
}

#[test]
fn none_is_empty_and_specials_are_quoted() -> Result<()> {
    let rows = vec![
        Row {
            name: "Pen, blue".into(),
            note: None,
            qty: 2,
        },
        Row {
            name: "5\" ruler".into(),
            note: Some("fragile".into()),
            qty: 1,
        },
    ];
    let out = to_csv_string(&rows)?;
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["name,note,qty", "\"Pen, blue\",,2", "\"5\"\" ruler\",fragile,1"]);
    assert_eq!(tokenize_line(lines[2]), vec!["5\" ruler", "fragile", "1"]);
    Ok(())
}

#[test]
fn empty_slice_renders_nothing() -> Result<()> {
    let rows: Vec<Row> = Vec::new();
    assert_eq!(to_csv_string(&rows)?, "");
    Ok(())
}

#[test]
fn segments_export_as_labels() -> Result<()> {
    let out = to_csv_string(&compute_rfm(&bread_milk_transactions()))?;
    assert!(out.starts_with("customer_id,recency,frequency,monetary,"));
    // two customers, scored 311 and 513
    assert_eq!(out.lines().count(), 3);
    assert!(out.lines().skip(1).all(|l| l.ends_with(",Others")));
    Ok(())
}

#[test]
fn raw_records_reingest_unchanged() -> Result<()> {
    let first = ingest_str(&sample_csv(), &IngestOptions::default());
    let text = raw_records_to_csv(&first.headers, &first.rows)?;
    let second = ingest_str(&text, &IngestOptions::default());
    assert_eq!(second.headers, first.headers);
    assert_eq!(second.rows, first.rows);
    Ok(())
}

#[test]
fn written_files_are_counted_and_readable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/out/rules.csv");
    let params = BasketParams {
        min_support: 0.5,
        min_confidence: 0.5,
        min_lift: 1.0,
    };
    let rules = mine_rules(&bread_milk_transactions(), &params).rules;
    let n = write_csv_records(&path, &rules)?;
    assert_eq!(n, 2);
    let text = std::fs::read_to_string(&path)?;
    assert_eq!(text.lines().count(), 3);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gz_extension_compresses_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("raw.csv.gz");
    let first = ingest_str(&sample_csv(), &IngestOptions::default());

    #[derive(Serialize)]
    struct Line<'a> {
        invoice: &'a str,
        description: &'a str,
        customer: &'a str,
        country: &'a str,
    }
    let lines: Vec<Line<'_>> = first
        .rows
        .iter()
        .map(|r| Line {
            invoice: r.get("InvoiceNo").unwrap_or_default(),
            description: r.get("Description").unwrap_or_default(),
            customer: r.get("CustomerID").unwrap_or_default(),
            country: r.get("Country").unwrap_or_default(),
        })
        .collect();
    write_csv_records(&path, &lines)?;

    let raw = std::fs::read(&path)?;
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    let back = ingest_path(&path, &IngestOptions::default())?;
    assert!(back.is_ok());
    assert_eq!(back.row_count, first.row_count);
    assert_eq!(back.headers, vec!["invoice", "description", "customer", "country"]);
    Ok(())
}
