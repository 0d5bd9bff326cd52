//! Integration tests for report rendering from stored records.

use fleet_guard::config::{DistributionOverflow, PipelineConfig, ReportConfig};
use fleet_guard::ingest::Upload;
use fleet_guard::report::{
    JsonReportRenderer, ReportFormat, ReportRenderer, TextReportRenderer, REPORT_TITLE,
};
use fleet_guard::repository::{InMemoryRepository, UploadRecord};
use fleet_guard::service::AnalyticsService;

/// Builds a CSV with `types` distinct equipment types, `per_type` units each.
fn wide_csv(types: usize, per_type: usize) -> String {
    let mut csv = String::from("Equipment Name,Type,Flowrate,Pressure,Temperature\n");
    for t in 0..types {
        for u in 0..per_type {
            csv.push_str(&format!("Unit-{t}-{u},Kind-{t:03},100,2.0,70\n"));
        }
    }
    csv
}

async fn stored(csv: &str) -> (AnalyticsService<InMemoryRepository>, UploadRecord) {
    let service = AnalyticsService::new(InMemoryRepository::new());
    let record = service
        .ingest(Some(Upload::new("plant.csv", csv)))
        .await
        .unwrap();
    (service, record)
}

#[tokio::test]
async fn test_report_is_byte_identical_across_renders() {
    let (service, record) = stored(&wide_csv(3, 2)).await;
    let renderer = TextReportRenderer::new();

    let first = service.report(record.id, &renderer).await.unwrap();
    let second = service.report(record.id, &renderer).await.unwrap();
    assert_eq!(first.bytes, second.bytes);

    let json = JsonReportRenderer::new();
    assert_eq!(
        service.report(record.id, &json).await.unwrap().bytes,
        service.report(record.id, &json).await.unwrap().bytes
    );
}

#[tokio::test]
async fn test_report_sections_in_order() {
    let (service, record) = stored(&wide_csv(2, 1)).await;
    let document = service
        .report(record.id, &TextReportRenderer::new())
        .await
        .unwrap();
    let text = String::from_utf8(document.bytes).unwrap();

    let position = |needle: &str| {
        text.find(needle)
            .unwrap_or_else(|| panic!("missing section {needle:?}"))
    };
    let order = [
        position(REPORT_TITLE),
        position("Source File: plant.csv"),
        position("Date Generated: "),
        position("Summary Statistics"),
        position("• Total Equipment Count: 2"),
        position("Equipment Type Distribution"),
        position("• Kind-000: 1"),
        position("• Kind-001: 1"),
        position("Engineering Conclusion:"),
        position("Page 1 of 1"),
    ];
    assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(text.contains(&format!("Date Generated: {}", record.created_at_display())));
}

#[tokio::test]
async fn test_distribution_keeps_stored_order() {
    let csv = "\
Type,Flowrate,Pressure,Temperature
Valve,1,2,3
Pump,1,2,3
Pump,1,2,3
Mixer,1,2,3
";
    let (service, record) = stored(csv).await;
    let stored_order: Vec<&str> = record
        .summary
        .type_distribution
        .iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(stored_order, vec!["Pump", "Valve", "Mixer"]);

    let text = String::from_utf8(
        service
            .report(record.id, &TextReportRenderer::new())
            .await
            .unwrap()
            .bytes,
    )
    .unwrap();
    let pump = text.find("• Pump: 2").unwrap();
    let valve = text.find("• Valve: 1").unwrap();
    let mixer = text.find("• Mixer: 1").unwrap();
    assert!(pump < valve && valve < mixer);
}

#[tokio::test]
async fn test_hundreds_of_types_paginate_without_loss() {
    let (service, record) = stored(&wide_csv(300, 1)).await;
    let renderer = TextReportRenderer::new();
    let document = service.report(record.id, &renderer).await.unwrap();
    let text = String::from_utf8(document.bytes).unwrap();

    assert!(document.page_count > 1);
    let pages: Vec<&str> = text.split('\x0c').collect();
    assert_eq!(pages.len(), document.page_count);
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(page.lines().count(), renderer.config().page_lines);
        assert!(page.contains(&format!("Page {} of {}", i + 1, document.page_count)));
        if i > 0 {
            assert!(page.starts_with("Equipment Type Distribution (continued)"));
        }
    }
    for t in 0..300 {
        assert!(text.contains(&format!("• Kind-{t:03}: 1\n")));
    }
}

#[tokio::test]
async fn test_truncation_policy_from_config() {
    let report = ReportConfig::default().with_overflow(DistributionOverflow::Truncate { max_entries: 10 });
    let config = PipelineConfig::default().with_report(report.clone());
    let service = AnalyticsService::with_config(InMemoryRepository::new(), config);
    let record = service
        .ingest(Some(Upload::new("plant.csv", wide_csv(40, 3))))
        .await
        .unwrap();

    let renderer = ReportFormat::Text.renderer(&service.config().report);
    let document = service.report(record.id, renderer.as_ref()).await.unwrap();
    let text = String::from_utf8(document.bytes).unwrap();

    assert_eq!(document.page_count, 1);
    assert!(text.contains("... and 30 more types (90 units)"));
    assert_eq!(text.matches("• Kind-").count(), 10);
}

#[tokio::test]
async fn test_narrow_pages_wrap_long_names() {
    let long_name = format!("{}.csv", "very-long-source-file-name-".repeat(6));
    let service = AnalyticsService::new(InMemoryRepository::new());
    let record = service
        .ingest(Some(Upload::new(long_name, wide_csv(1, 1))))
        .await
        .unwrap();

    let renderer = TextReportRenderer::with_config(ReportConfig::default().with_page_width(50));
    let document = renderer.render(&record).unwrap();
    let text = String::from_utf8(document.bytes).unwrap();

    assert!(text.lines().all(|line| line.chars().count() <= 50));
    assert!(text.contains("Source File: very-long-source-file-name-"));
}
