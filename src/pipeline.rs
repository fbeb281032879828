use chrono::NaiveDateTime;
use rand::Rng;
use tracing::{info, warn};

use crate::config::AtlasConfig;
use crate::error::AtlasError;
use crate::filter::{count_eligible, filter_eligible, MapFilter};
use crate::i18n::{label, LabelKey, Language};
use crate::jitter::jitter_records;
use crate::loader;
use crate::markers::{build_cluster_group, CategoryProfile};
use crate::models::{Category, ClusterGroup, Record};
use crate::render::{render_map, MapView};
use crate::source::TableSource;

#[derive(Debug, Clone)]
pub struct MapDocument {
    pub html: String,
    pub marker_counts: Vec<(Category, usize)>,
    pub degraded: bool,
}

#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: Category,
    pub loaded: usize,
    pub plottable: usize,
    pub eligible: usize,
    pub latest_submission: Option<NaiveDateTime>,
}

/// One full load → jitter → filter → markers → render pass.
///
/// An unavailable source degrades into an empty map with a notice; data
/// errors abort the pass.
pub async fn build_map_document<S, R>(
    source: &S,
    config: &AtlasConfig,
    language: Language,
    map_filter: &MapFilter,
    rng: &mut R,
) -> Result<MapDocument, AtlasError>
where
    S: TableSource,
    R: Rng + ?Sized,
{
    let view = MapView::from_config(config);

    let (volunteers, requests) = match loader::load_all(source).await {
        Ok(tables) => tables,
        Err(err) if err.is_source_unavailable() => {
            warn!(error = %err, "rendering empty map");
            let groups = empty_groups(config, language);
            let html = render_map(&groups, &view, language, Some(label(LabelKey::SourceUnavailable, language)));
            return Ok(MapDocument {
                html,
                marker_counts: groups.iter().map(|g| (g.category, 0)).collect(),
                degraded: true,
            });
        }
        Err(err) => return Err(err),
    };

    let mut groups = Vec::with_capacity(Category::ALL.len());
    for (category, records) in [(Category::Volunteer, &volunteers), (Category::Request, &requests)] {
        groups.push(build_group(records, category, config, language, map_filter, rng)?);
    }

    let html = render_map(&groups, &view, language, None);
    let marker_counts = groups.iter().map(|g| (g.category, g.markers.len())).collect();
    Ok(MapDocument {
        html,
        marker_counts,
        degraded: false,
    })
}

fn build_group<R: Rng + ?Sized>(
    records: &[Record],
    category: Category,
    config: &AtlasConfig,
    language: Language,
    map_filter: &MapFilter,
    rng: &mut R,
) -> Result<ClusterGroup, AtlasError> {
    let jittered = jitter_records(records, config.jitter, rng);
    let eligible = filter_eligible(jittered, category, map_filter);
    info!(
        table = category.table_name(),
        loaded = records.len(),
        eligible = eligible.len(),
        "building markers"
    );
    build_cluster_group(&eligible, &CategoryProfile::for_category(category, config), language)
}

fn empty_groups(config: &AtlasConfig, language: Language) -> Vec<ClusterGroup> {
    Category::ALL
        .iter()
        .map(|category| ClusterGroup {
            category: *category,
            name: label(CategoryProfile::for_category(*category, config).layer, language).to_string(),
            markers: Vec::new(),
        })
        .collect()
}

pub async fn summarize<S: TableSource>(source: &S, map_filter: &MapFilter) -> Result<Vec<CategorySummary>, AtlasError> {
    let (volunteers, requests) = loader::load_all(source).await?;
    Ok([(Category::Volunteer, volunteers), (Category::Request, requests)]
        .into_iter()
        .map(|(category, records)| CategorySummary {
            category,
            loaded: records.len(),
            plottable: records.iter().filter(|r| r.coordinate.is_some()).count(),
            eligible: count_eligible(&records, category, map_filter),
            latest_submission: records.iter().map(|r| r.submitted_at).max(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{table, volunteer_row, HEADER};
    use crate::source::MemorySource;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_source() -> MemorySource {
        let volunteers = table(&[
            volunteer_row("Avery", "Toronto", "10km", ("43.65", "-79.38"), "Yes", "Yes"),
            volunteer_row("Jules", "Sudbury", "10km", ("46.49", "-80.99"), "Yes", "No"),
            volunteer_row("Kiara", "Sudbury", "10km", ("", ""), "Yes", "Yes"),
        ]);
        let requests = table(&[
            volunteer_row("Sam", "Ottawa", "", ("45.42", "-75.69"), "No", "No"),
            volunteer_row("Robin", "Ottawa", "", ("", ""), "Yes", "Yes"),
        ]);
        MemorySource::new(&volunteers, &requests)
    }

    #[tokio::test]
    async fn builds_groups_for_both_categories() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let doc = build_map_document(
            &sample_source(),
            &AtlasConfig::default(),
            Language::En,
            &MapFilter::default(),
            &mut rng,
        )
        .await
        .unwrap();

        assert!(!doc.degraded);
        assert_eq!(doc.marker_counts, vec![(Category::Volunteer, 1), (Category::Request, 1)]);
        assert!(doc.html.contains("overlays[\"Volunteers\"]"));
        assert!(!doc.html.contains("sam@example.com"));
    }

    #[tokio::test]
    async fn empty_tables_degrade_to_labelled_empty_map() {
        let header_only = format!("{HEADER}\n");
        let source = MemorySource::new(&header_only, &header_only);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let doc = build_map_document(&source, &AtlasConfig::default(), Language::Fr, &MapFilter::default(), &mut rng)
            .await
            .unwrap();

        assert!(doc.degraded);
        assert_eq!(doc.marker_counts, vec![(Category::Volunteer, 0), (Category::Request, 0)]);
        assert!(doc.html.contains("overlays[\"Bénévoles\"]"));
        assert!(doc.html.contains("overlays[\"Demandes\"]"));
        assert!(doc.html.contains("atlas-notice\" role=\"alert\""));
    }

    #[tokio::test]
    async fn malformed_rows_abort_the_render() {
        let volunteers = table(&[volunteer_row("Avery", "Toronto", "abc km", ("43.65", "-79.38"), "Yes", "Yes")]);
        let source = MemorySource::new(&volunteers, &format!("{HEADER}\n"));
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let err = build_map_document(&source, &AtlasConfig::default(), Language::En, &MapFilter::default(), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, AtlasError::MalformedField { field: "Radius", .. }));
    }

    #[tokio::test]
    async fn summary_counts_each_stage() {
        let summary = summarize(&sample_source(), &MapFilter::default()).await.unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!((summary[0].loaded, summary[0].plottable, summary[0].eligible), (3, 2, 1));
        assert_eq!((summary[1].loaded, summary[1].plottable, summary[1].eligible), (2, 1, 1));
        assert_eq!(
            summary[0].latest_submission,
            NaiveDateTime::parse_from_str("2020-03-20 14:05:11", "%Y-%m-%d %H:%M:%S").ok()
        );
    }

    #[tokio::test]
    async fn private_sheet_sign_in_page_degrades_to_empty_map() {
        let page = "<!DOCTYPE html>\n<html><head><title>Sign in</title></head><body></body></html>\n";
        let source = MemorySource::new(page, page);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let doc = build_map_document(&source, &AtlasConfig::default(), Language::En, &MapFilter::default(), &mut rng)
            .await
            .unwrap();

        assert!(doc.degraded);
        assert!(doc.html.contains("overlays[\"Volunteers\"]"));
        assert!(doc.html.contains("overlays[\"Requests\"]"));
        assert!(doc.html.contains("Registrations are temporarily unavailable"));
    }
}
