//! Library API integration tests
use declutter_core::*;

const ARTICLE_URL: &str = "https://news.example.org/city/harbor-bridge";

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

#[test]
fn test_parse_api() {
    let article = parse(&read_fixture("sample_article.html")).expect("should parse");
    assert_eq!(article.title.as_deref(), Some("Rebuilding the Harbor Bridge"));
    assert!(!article.content.is_empty());
    assert!(article.word_count > 150);
}

#[test]
fn test_parse_with_url() {
    let article = parse_with_url(&read_fixture("sample_article.html"), ARTICLE_URL).expect("should parse");
    assert_eq!(article.source_url.as_deref(), Some(ARTICLE_URL));
}

#[test]
fn test_sample_article_selection() {
    let article = parse_with_url(&read_fixture("sample_article.html"), ARTICLE_URL).unwrap();

    let selection = article.selection.as_ref().expect("heuristic mode reports a selection");
    assert_eq!(selection.source, SelectionSource::Scored);
    assert!(article.content.starts_with(r#"<article class="story">"#));

    assert!(article.text_content.contains("The harbor bridge opened in 1925"));
    assert!(!article.content.contains("Limited offer"));
    assert!(!article.content.contains("Ferry timetable"));
    assert!(!article.content.contains("tracking pixel"));
    assert!(!article.content.contains("Weekly updates"));
}

#[test]
fn test_sample_article_images() {
    let article = parse_with_url(&read_fixture("sample_article.html"), ARTICLE_URL).unwrap();

    assert!(article.content.contains(r#"src="https://news.example.org/media/partner-card.jpg""#));
    assert!(article.content.contains(r#"src="https://news.example.org/media/bridge-night.jpg""#));
    assert!(article.content.contains(r#"src="https://news.example.org/media/crew.jpg""#));
    assert!(!article.content.contains("Presented by our partners"));
    assert!(!article.content.contains("lazyload"));
    assert!(!article.content.contains("width=\"1200\""));
    assert_eq!(article.image_count, 4);
    assert_eq!(article.unresolved_images, vec!["../archive/1925.jpg".to_string()]);
}

#[test]
fn test_extraction_report() {
    let extraction = Declutter::new()
        .extract(&read_fixture("sample_article.html"), url::Url::parse(ARTICLE_URL).ok())
        .unwrap();
    let report = &extraction.report;

    assert_eq!(report.mode, ExtractionMode::Heuristic);
    assert_eq!(report.filter.demoted, 1);
    assert!(report.filter.total_removed() >= 5);
    assert_eq!(report.normalize.images, 4);
    assert_eq!(report.normalize.lazy_resolved, 1);
    assert_eq!(report.normalize.absolutized, 3);
}

#[test]
fn test_filter_is_idempotent_on_fixture() {
    let policy = FilterPolicy::default();
    let once = preprocess_html(&read_fixture("sample_article.html"), &policy);
    let twice = preprocess_html(&once, &policy);
    assert_eq!(once, twice);
}

#[test]
fn test_lazy_images_fixture() {
    let base = url::Url::parse("https://valley.example/gallery/autumn").unwrap();
    let mut doc = Document::parse_with_base(&read_fixture("lazy_images.html"), Some(base.clone())).unwrap();
    let body = doc.body().unwrap();
    let report = normalize(doc.tree_mut(), body, Some(&base));

    assert_eq!(report.images, 6);
    assert_eq!(report.lazy_resolved, 4);
    assert_eq!(report.absolutized, 4);
    assert_eq!(report.unresolved, vec!["../shared/logo.png".to_string()]);

    let tree = doc.tree();
    let srcs: Vec<&str> = doc.select_tag("img").into_iter().filter_map(|id| tree.attr(id, "src")).collect();
    assert_eq!(
        srcs,
        vec![
            "https://valley.example/photos/orchard.jpg",
            "https://valley.example/photos/vineyard.jpg",
            "https://valley.example/photos/river.jpg",
            "https://cdn.valley.example/photos/barn.jpg",
            "https://images.valley.example/photos/ridge.jpg",
            "../shared/logo.png",
        ]
    );

    let river = doc.select_tag("img")[2];
    assert_eq!(tree.attr(river, "srcset"), Some("./photos/river-2x.jpg 2x"));
    assert_eq!(tree.attr(river, "class"), Some("framed"));
    assert_eq!(tree.attr(river, "alt"), Some("Image"));
}

#[test]
fn test_article_output_formats() {
    let article = parse(&read_fixture("sample_article.html")).expect("should parse");

    #[cfg(feature = "markdown")]
    {
        let md = article.to_markdown().unwrap();
        assert!(md.starts_with("# Rebuilding the Harbor Bridge"));
        assert!(md.contains("Working at night"));
    }

    let json: serde_json::Value = serde_json::from_str(&article.to_json().unwrap()).unwrap();
    assert!(json.get("content").is_some());
    assert_eq!(json["selection"]["source"], "scored");

    let text = article.to_format(OutputFormat::PlainText).unwrap();
    assert!(text.contains("Working at night"));
    assert!(!text.contains('<'));
}

#[test]
fn test_config_builder() {
    let config = DeclutterConfig::builder().normalize_images(false).build();
    let article = Declutter::with_config(config)
        .parse_with_url(&read_fixture("sample_article.html"), ARTICLE_URL)
        .unwrap();
    assert!(article.content.contains(r#"data-src="/media/bridge-night.jpg""#));
    assert!(article.unresolved_images.is_empty());
}

#[test]
fn test_edge_case_empty() {
    let result = parse(&read_fixture("empty_content.html"));
    assert!(matches!(result, Err(DeclutterError::NoReadableContent)));
}

#[test]
fn test_edge_case_malformed() {
    let html = "<html><body><div><p>Unclosed paragraph<div>nested <b>bold <i>mixed</b> tags</i>";
    let doc = Document::parse(html).expect("should parse malformed HTML");
    assert!(doc.text_content().contains("Unclosed paragraph"));
}

#[test]
fn test_validate_markup() {
    assert!(validate_markup(&read_fixture("sample_article.html")).is_ok());
    assert!(matches!(validate_markup("hi"), Err(DeclutterError::ContentTooSmall { .. })));
    assert!(matches!(validate_markup("just some plain text, no tags"), Err(DeclutterError::NotMarkup)));
}

#[test]
fn test_fetch_file_api() {
    let html = fetch_file(&get_fixture_path("sample_article.html")).unwrap();
    assert!(html.contains("Harbor Bridge"));
    assert!(matches!(fetch_file("does/not/exist.html"), Err(DeclutterError::FileNotFound(_))));
}

#[cfg(feature = "structured")]
#[test]
fn test_structured_mode_on_fixture() {
    let config = DeclutterConfig::builder().mode(ExtractionMode::Structured).build();
    let article = Declutter::with_config(config)
        .parse_with_url(&read_fixture("sample_article.html"), ARTICLE_URL)
        .unwrap();

    assert_eq!(article.title.as_deref(), Some("Rebuilding the Harbor Bridge"));
    assert!(article.text_content.contains("Most of the heavy lifting happens after midnight"));
    assert!(!article.content.contains("tracking pixel"));
}

#[cfg(feature = "fetch")]
#[tokio::test]
async fn test_fetch_and_parse_from_mock_server() {
    let server = httpmock::MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(httpmock::Method::GET).path("/city/harbor-bridge");
            then.status(200).header("content-type", "text/html").body(read_fixture("sample_article.html"));
        })
        .await;

    let url = server.url("/city/harbor-bridge");
    let article = Declutter::new().fetch_and_parse(&url).await.unwrap();

    mock.assert_hits_async(1).await;
    assert_eq!(article.source_url.as_deref(), Some(url.as_str()));
    assert!(article.content.contains(&server.url("/media/crew.jpg")));
}
