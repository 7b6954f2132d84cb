use novamart_analytics::chart::{
    confusion_matrix, prepare, roc_curve, threshold_labels, BarNorm, ChartKind, ChartOptions, ColumnBindings,
};
use novamart_analytics::output::{JsonSink, RenderSink};
use novamart_analytics::source::{parse_csv, Table};
use novamart_analytics::utils::ChartError;
use pretty_assertions::assert_eq;

fn channels() -> Table {
    Table::from_csv_reader(
        "channels",
        "channel,revenue,spend\nSearch,300,100\nEmail,120,40\nSocial,80,60\n".as_bytes(),
    )
    .unwrap()
}

#[test]
fn test_confusion_counts() {
    let cm = confusion_matrix(&[0, 0, 1, 1], &[0, 1, 1, 1]).unwrap();
    assert_eq!((cm.tn, cm.fp, cm.fn_, cm.tp), (1, 1, 0, 2));
    assert_eq!(cm.total(), 4);
}

#[test]
fn test_confusion_length_mismatch() {
    assert_eq!(
        confusion_matrix(&[0, 1], &[0]).unwrap_err(),
        ChartError::LengthMismatch { actual: 2, predicted: 1 }
    );
}

#[test]
fn test_perfect_separation_auc() {
    let curve = roc_curve(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]).unwrap();
    assert_eq!(curve.auc, 1.0);
    assert_eq!(curve.points.first().map(|p| (p.fpr, p.tpr)), Some((0.0, 0.0)));
    assert_eq!(curve.points.last().map(|p| (p.fpr, p.tpr)), Some((1.0, 1.0)));
}

#[test]
fn test_single_class_roc() {
    assert_eq!(roc_curve(&[1, 1, 1], &[0.2, 0.5, 0.9]).unwrap_err(), ChartError::SingleClass);
}

#[test]
fn test_threshold_is_inclusive() {
    assert_eq!(threshold_labels(&[0.49, 0.5, 0.51], 0.5), vec![0, 1, 1]);
}

#[test]
fn test_donut_gets_default_hole() {
    let chart = prepare(
        &channels(),
        ChartKind::Donut,
        &ColumnBindings::xy("channel", "revenue"),
        &ChartOptions::titled("Share"),
    )
    .unwrap();
    assert_eq!(chart.options.hole, Some(0.4));
    assert_eq!(chart.stat("total"), Some(500.0));
}

#[test]
fn test_option_domains() {
    let bar = ColumnBindings::xy("channel", "revenue");

    let hole_on_bar = prepare(&channels(), ChartKind::Bar, &bar, &ChartOptions::titled("x").with_hole(0.3));
    assert!(matches!(hole_on_bar, Err(ChartError::InvalidOption(_))));

    let donut_hole = prepare(&channels(), ChartKind::Donut, &bar, &ChartOptions::titled("x").with_hole(1.0));
    assert!(matches!(donut_hole, Err(ChartError::InvalidOption(_))));

    let percent_line = prepare(
        &channels(),
        ChartKind::Line,
        &bar,
        &ChartOptions::titled("x").with_bar_norm(BarNorm::Percent),
    );
    assert!(matches!(percent_line, Err(ChartError::InvalidOption(_))));

    let zero_bins = prepare(
        &channels(),
        ChartKind::Histogram,
        &ColumnBindings::new().with_x("revenue"),
        &ChartOptions::titled("x").with_bins(0),
    );
    assert!(matches!(zero_bins, Err(ChartError::InvalidOption(_))));
}

#[test]
fn test_missing_binding_column() {
    let result = prepare(
        &channels(),
        ChartKind::Scatter,
        &ColumnBindings::xy("spend", "profit"),
        &ChartOptions::titled("x"),
    );
    assert_eq!(result.unwrap_err(), ChartError::MissingColumn("profit".to_string()));
}

#[test]
fn test_scatter_trendline() {
    let chart = prepare(
        &channels(),
        ChartKind::Scatter,
        &ColumnBindings::xy("spend", "revenue"),
        &ChartOptions::titled("Spend vs Revenue").with_trendline(true),
    )
    .unwrap();
    assert!(chart.stat("slope").is_some());
    assert!(chart.stat("intercept").is_some());
}

#[test]
fn test_heatmap_requires_numeric_cells() {
    let labels = parse_csv("labels", "variable,note\nspend,a\n".as_bytes()).unwrap();
    let result = prepare(
        &labels,
        ChartKind::Heatmap,
        &ColumnBindings::new().with_x("variable"),
        &ChartOptions::titled("x"),
    );
    assert_eq!(result.unwrap_err(), ChartError::InsufficientColumns { found: 0 });
}

#[test]
fn test_json_sink_summary() {
    let chart = prepare(
        &channels(),
        ChartKind::Bar,
        &ColumnBindings::xy("channel", "revenue"),
        &ChartOptions::titled("Revenue"),
    )
    .unwrap();
    let rendered = JsonSink::new().summary_only().render(&chart).unwrap();
    assert_eq!(rendered["rows"], 3);
    assert_eq!(rendered["kind"], "bar");
}

#[test]
fn test_treemap_keeps_parent_column() {
    let sales = Table::from_csv_reader(
        "sales",
        "subcategory,category,sales\nMobile,Electronics,500\nLaptops,Electronics,300\nShirts,Apparel,120\n".as_bytes(),
    )
    .unwrap();
    let chart = prepare(
        &sales,
        ChartKind::Treemap,
        &ColumnBindings::xy("subcategory", "sales").with_parent("category"),
        &ChartOptions::titled("Sales Hierarchy"),
    )
    .unwrap();
    assert_eq!(chart.data.column_names(), vec!["subcategory", "sales", "category"]);

    let missing_parent = prepare(
        &sales,
        ChartKind::Treemap,
        &ColumnBindings::xy("subcategory", "sales").with_parent("division"),
        &ChartOptions::titled("Sales Hierarchy"),
    );
    assert_eq!(missing_parent.unwrap_err(), ChartError::MissingColumn("division".to_string()));
}
