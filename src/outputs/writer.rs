//! Writes collected articles to `articles.json` + `articles.csv`, grouped
//! into a `state-slug/YYYY-MM-DD[/district-slug]/` tree under an output
//! root. Each article is placed using its own metadata — no caller-supplied
//! region/date is needed — so a single flat `Vec<Article>` from the
//! pipeline is enough to reconstruct the whole directory tree.

use std::collections::HashMap;
use std::error::Error;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::models::Article;

const WRITE_CONCURRENCY: usize = 8;

/// Lowercase, space-to-hyphen, `&`-to-`and` slug for a state or district
/// name, matching the slugs already embedded in the geo reference data.
fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-").replace('&', "and")
}

fn date_str(article: &Article) -> String {
    article.reference.timestamp.format("%Y-%m-%d").to_string()
}

#[derive(Serialize)]
struct ArticlesFile<'a> {
    state: &'a str,
    district: Option<&'a str>,
    date: &'a str,
    article_count: usize,
    articles: &'a [Article],
}

async fn write_json(articles: &[Article], dest: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dest).await?;
    let first = &articles[0];
    let payload = ArticlesFile {
        state: &first.reference.state,
        district: first.reference.district.as_deref(),
        date: &date_str(first),
        article_count: articles.len(),
        articles,
    };
    let text = serde_json::to_string_pretty(&payload)?;
    let path = format!("{}/articles.json", dest);
    fs::write(&path, text).await?;
    Ok(())
}

/// `#[serde(flatten)]` on `Article::reference` means `csv`'s derive-based
/// `serialize` can't be used directly (it needs a statically known, flat
/// field list), so rows are built by hand instead.
async fn write_csv(articles: &[Article], dest: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dest).await?;
    let path = format!("{}/articles.csv", dest);

    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record([
            "title",
            "url",
            "source_name",
            "timestamp",
            "language",
            "state",
            "district",
            "search_term",
            "full_text",
            "relevance_score",
        ])?;
        for article in articles {
            writer.write_record([
                article.reference.title.as_str(),
                article.reference.url.as_str(),
                article.reference.source_name.as_str(),
                &article.reference.timestamp.to_rfc3339(),
                article.reference.language.as_str(),
                article.reference.state.as_str(),
                article.reference.district.as_deref().unwrap_or(""),
                article.reference.search_term.as_str(),
                article.full_text.as_deref().unwrap_or(""),
                &article.relevance_score.to_string(),
            ])?;
        }
        writer.flush()?;
    }
    fs::write(&path, buf).await?;
    Ok(())
}

/// Write every article in `articles` to its state/date/district location
/// under `output_root`, fanning the per-group writes out across a bounded
/// number of concurrent tasks.
#[instrument(level = "info", skip_all, fields(output_root = %output_root, count = articles.len()))]
pub async fn write_articles(articles: Vec<Article>, output_root: &str) -> Result<(), Box<dyn Error>> {
    if articles.is_empty() {
        info!("no articles to write");
        return Ok(());
    }

    let mut groups: HashMap<(String, String, Option<String>), Vec<Article>> = HashMap::new();
    for article in articles {
        let key = (
            slugify(&article.reference.state),
            date_str(&article),
            article.reference.district.as_ref().map(|d| slugify(d)),
        );
        groups.entry(key).or_default().push(article);
    }

    let output_root = output_root.trim_end_matches('/').to_string();

    let results: Vec<Result<(), Box<dyn Error>>> = stream::iter(groups.into_iter())
        .map(|((state_slug, date, district_slug), group)| {
            let dest = match &district_slug {
                Some(d) => format!("{}/{}/{}/{}", output_root, state_slug, date, d),
                None => format!("{}/{}/{}", output_root, state_slug, date),
            };
            async move {
                write_json(&group, &dest).await?;
                write_csv(&group, &dest).await?;
                Ok(())
            }
        })
        .buffer_unordered(WRITE_CONCURRENCY)
        .collect()
        .await;

    for result in results {
        if let Err(e) = result {
            warn!(error = %e, "failed writing an output group");
            return Err(e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ist_now, ArticleRef};

    fn article(state: &str, district: Option<&str>) -> Article {
        Article::with_text(
            ArticleRef {
                title: "Severe heatwave grips region".into(),
                url: "https://example.com/a".into(),
                source_name: "rss-aggregator".into(),
                timestamp: ist_now(),
                language: "en".into(),
                state: state.to_string(),
                district: district.map(|d| d.to_string()),
                search_term: "heatwave".into(),
            },
            "full body text".into(),
        )
    }

    fn tempdir() -> std::path::PathBuf {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("heatwatch_writer_test_{}_{}", std::process::id(), n));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn slugify_replaces_spaces_and_ampersands() {
        assert_eq!(slugify("Jammu & Kashmir"), "jammu-and-kashmir");
        assert_eq!(slugify("Tamil Nadu"), "tamil-nadu");
    }

    #[tokio::test]
    async fn writes_state_and_district_level_groups() {
        let dir = tempdir();
        let root = dir.to_str().unwrap().to_string();
        let state_only = article("Rajasthan", None);
        let with_district = article("Rajasthan", Some("Jaipur"));
        let today = date_str(&state_only);
        let articles = vec![state_only, with_district];
        write_articles(articles, &root).await.unwrap();

        let state_json = format!("{}/rajasthan/{}/articles.json", root, today);
        let district_json = format!("{}/rajasthan/{}/jaipur/articles.json", root, today);
        assert!(std::path::Path::new(&state_json).exists());
        assert!(std::path::Path::new(&district_json).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn empty_batch_writes_nothing_and_succeeds() {
        let dir = tempdir();
        let root = dir.to_str().unwrap().to_string();
        write_articles(Vec::new(), &root).await.unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
