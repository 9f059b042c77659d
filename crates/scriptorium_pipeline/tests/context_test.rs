//! Tests for rendering project context through the store.

mod test_utils;

use scriptorium_core::{GlossaryTerm, StyleReference};
use scriptorium_pipeline::{ContextAggregator, ContextOptions, render_context};
use test_utils::{sample_project, sample_store};

#[tokio::test]
async fn test_aggregate_is_deterministic() {
    let store = sample_store().await;
    let aggregator = ContextAggregator::new(store, ContextOptions::default());

    let first = aggregator.aggregate("salt-road", Some("c2")).await.unwrap();
    let second = aggregator.aggregate("salt-road", Some("c2")).await.unwrap();

    assert_eq!(first, second);
    assert!(first.starts_with("## Synopsis\n\nA caravan crosses the salt flats."));
}

#[test]
fn test_sections_follow_fixed_order() {
    let mut project = sample_project();
    project.glossary.push(GlossaryTerm {
        term: "sabkha".into(),
        definition: "A salt flat crust.".into(),
    });
    project.style_references.push(StyleReference {
        title: "Opening".into(),
        excerpt: "The wind had teeth.".into(),
    });

    let text = render_context(&project, Some("c2"), &ContextOptions::default()).unwrap();

    let order = [
        "## Synopsis",
        "## Current Chapter: 2. The Flats",
        "## Characters",
        "## World",
        "## Unresolved Foreshadowing",
        "## Plot Outline",
        "## Chapter Synopses",
        "## Chapter Summaries",
        "## Glossary",
        "## Style References",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|h| text.find(h).unwrap_or_else(|| panic!("missing {h}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");

    assert!(text.contains("- **Mira** (guide): Knows every well"));
    assert!(text.contains("- [location] **Qasr**: A ruined fort"));
    assert!(text.contains("- (Chapter 2) The broken well"));
    assert!(text.contains("### Chapter Plot Points\n\n- The broken well"));
    assert!(text.contains(
        "### Previous Chapter Summary (Chapter 1)\n\nMira agrees to guide the caravan."
    ));
    assert!(text.contains("- Chapter 1 (Departure): The caravan leaves the city."));
}

#[test]
fn test_only_unresolved_foreshadowing_is_listed() {
    let text = render_context(&sample_project(), None, &ContextOptions::default()).unwrap();

    assert!(text.contains("**The sealed letter** [planted] (planted ch. 1, payoff ch. 3)"));
    assert!(!text.contains("The lame camel"));
    assert!(!text.contains("## Current Chapter"));
}

#[test]
fn test_disabled_sections_are_omitted() {
    let options = ContextOptions {
        include_plot_points: false,
        include_chapter_summaries: false,
        include_chapter_synopses: false,
        ..ContextOptions::default()
    };

    let text = render_context(&sample_project(), None, &options).unwrap();

    assert!(!text.contains("## Plot Outline"));
    assert!(!text.contains("## Chapter Summaries"));
    assert!(!text.contains("## Chapter Synopses"));
    assert!(text.contains("## Characters"));
}

#[test]
fn test_plot_point_toggle_covers_the_chapter_overlay() {
    let options = ContextOptions {
        include_plot_points: false,
        ..ContextOptions::default()
    };

    let text = render_context(&sample_project(), Some("c2"), &options).unwrap();

    assert!(!text.contains("### Chapter Plot Points"));
    assert!(!text.contains("The broken well"));
    assert!(text.contains("### Chapter Synopsis\n\nThe first well is dry."));
}

#[tokio::test]
async fn test_unknown_project_is_an_error() {
    let store = sample_store().await;
    let aggregator = ContextAggregator::new(store, ContextOptions::default());

    assert!(aggregator.aggregate("missing", None).await.is_err());
    assert!(aggregator.aggregate("salt-road", Some("c9")).await.is_err());
}
