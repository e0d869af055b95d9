use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::parser;
use crate::parser::text::normalize_name;
use crate::pokedex::IndexEntry;
use crate::store::{Collector, PokemonRecord, SpriteRecord};

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
                      image/avif,image/webp,image/apng,*/*;q=0.8";

/// Scrape stats returned after completion.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScrapeStats {
    pub total: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub errors: usize,
}

pub enum Page {
    Html(String),
    Status(StatusCode),
}

enum Outcome {
    Accepted(PokemonRecord),
    Skipped,
}

/// HTTP client with browser-like headers and a cookie jar shared by all requests.
pub fn build_client(settings: &Settings) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(
        header::REFERER,
        HeaderValue::from_str(&format!("{}/", settings.base_url)).context("Invalid base_url")?,
    );

    let client = reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .default_headers(headers)
        .cookie_store(true)
        .build()?;
    Ok(client)
}

pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<Page> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?;
    let status = response.status();
    if !status.is_success() {
        return Ok(Page::Status(status));
    }
    let html = response
        .text()
        .await
        .with_context(|| format!("Failed to read body of {}", url))?;
    Ok(Page::Html(html))
}

/// Download `url` to `path` after a politeness delay. No retry.
pub async fn download_image(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    delay_secs: (f64, f64),
) -> bool {
    tokio::time::sleep(jitter(delay_secs)).await;
    match try_download(client, url, path).await {
        Ok(saved) => saved,
        Err(e) => {
            warn!("Error downloading image {}: {:#}", url, e);
            false
        }
    }
}

async fn try_download(client: &reqwest::Client, url: &str, path: &Path) -> Result<bool> {
    let mut response = client.get(url).send().await?;
    if !response.status().is_success() {
        warn!("Failed to download image, status code: {}", response.status());
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {:?}", path))?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(true)
}

/// Visit every entry in order, returning the accepted records.
///
/// Accepted records are checkpointed to `settings.checkpoint_path()` every
/// `settings.checkpoint_every` records. Entries that fail are logged and skipped.
pub async fn scrape_entries(
    client: &reqwest::Client,
    settings: &Settings,
    entries: &[IndexEntry],
) -> Result<(Vec<PokemonRecord>, ScrapeStats)> {
    let total = entries.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta}) {msg}")?
            .progress_chars("=> "),
    );

    let mut collector = Collector::new(settings.checkpoint_path(), settings.checkpoint_every);
    let mut stats = ScrapeStats {
        total,
        ..Default::default()
    };

    for (i, entry) in entries.iter().enumerate() {
        let processed = i + 1;
        pb.set_message(entry.display_name.clone());
        debug!("Processing {}/{}: {} - {}", processed, total, entry.display_name, entry.url);

        match scrape_one(client, settings, entry).await {
            Ok(Outcome::Accepted(record)) => {
                info!("Added {} - Types: {}", entry.display_name, record.types.join(", "));
                debug!("General Description: {}", preview(&record.general_description, 100));
                stats.accepted += 1;
                match collector.push(record) {
                    Ok(true) => info!("Saved temporary data with {} Pokémon", collector.len()),
                    Ok(false) => {}
                    Err(e) => warn!("Checkpoint write failed: {:#}", e),
                }
            }
            Ok(Outcome::Skipped) => stats.skipped += 1,
            Err(e) => {
                warn!("Error processing {}: {:#}", entry.url, e);
                stats.errors += 1;
            }
        }

        if settings.progress_every > 0 && processed % settings.progress_every == 0 {
            info!(
                "Progress: Processed {}/{}, found {} valid entries",
                processed,
                total,
                collector.len()
            );
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok((collector.into_records(), stats))
}

async fn scrape_one(
    client: &reqwest::Client,
    settings: &Settings,
    entry: &IndexEntry,
) -> Result<Outcome> {
    tokio::time::sleep(jitter(settings.page_delay_secs)).await;

    let html = match fetch_page(client, &entry.url).await? {
        Page::Html(html) => html,
        Page::Status(status) => {
            warn!("Failed to get {}, status code: {}", entry.url, status);
            return Ok(Outcome::Skipped);
        }
    };

    let page = parser::parse_detail_page(&html, &entry.display_name, &settings.base_url);
    let name = normalize_name(&entry.url);
    let image_dir = settings.images_dir.join(&name);
    tokio::fs::create_dir_all(&image_dir)
        .await
        .with_context(|| format!("Failed to create {:?}", image_dir))?;

    if !page.has_description() {
        info!("No valid description found for {}, skipping", entry.display_name);
        return Ok(Outcome::Skipped);
    }

    let main_path = image_dir.join("main.png");
    let mut main_image_path = None;
    for url in &page.main_image_urls {
        if download_image(client, url, &main_path, settings.image_delay_secs).await {
            debug!("Downloaded main image for {}", entry.display_name);
            main_image_path = Some(main_path.to_string_lossy().into_owned());
            break;
        }
    }

    let mut sprites = Vec::new();
    for (i, sprite) in page.sprites.into_iter().enumerate() {
        let path = image_dir.join(format!("{}.png", sprite.stem));
        if download_image(client, &sprite.url, &path, settings.image_delay_secs).await {
            debug!("Downloaded sprite {} for {}", i + 1, entry.display_name);
            sprites.push(SpriteRecord {
                url: sprite.url,
                path: path.to_string_lossy().into_owned(),
                description: sprite.description,
            });
        }
    }

    let record = PokemonRecord {
        name,
        display_name: entry.display_name.clone(),
        main_image_path,
        sprites,
        general_description: page.general_description,
        biology_description: page.biology_description,
        types: page.types,
        url: entry.url.clone(),
    };

    if !record.has_image() {
        info!("No images found for {}, skipping", entry.display_name);
        return Ok(Outcome::Skipped);
    }
    Ok(Outcome::Accepted(record))
}

/// Random delay in `[lo, hi]` seconds.
fn jitter((lo, hi): (f64, f64)) -> Duration {
    let secs = if hi > lo {
        rand::thread_rng().gen_range(lo..=hi)
    } else {
        lo
    };
    Duration::from_secs_f64(secs.max(0.0))
}

fn preview(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;

    // Nothing listens on port 1; connections are refused immediately.
    const DEAD_HOST: &str = "http://127.0.0.1:1";

    fn quiet_settings(dir: &Path) -> Settings {
        Settings {
            data_dir: dir.join("data"),
            images_dir: dir.join("images"),
            page_delay_secs: (0.0, 0.0),
            image_delay_secs: (0.0, 0.0),
            ..Default::default()
        }
    }

    #[test]
    fn jitter_stays_in_range() {
        for _ in 0..100 {
            let d = jitter((0.5, 1.5));
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1500));
        }
        assert_eq!(jitter((2.0, 2.0)), Duration::from_secs(2));
        assert_eq!(jitter((-1.0, -1.0)), Duration::ZERO);
    }

    #[test]
    fn preview_truncates_on_chars() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("Pokémon", 4), "Poké...");
    }

    #[test]
    fn client_builds_with_defaults() {
        assert!(build_client(&Settings::default()).is_ok());
    }

    #[tokio::test]
    async fn failed_download_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let client = build_client(&Settings::default()).unwrap();
        let path = dir.path().join("images").join("x").join("main.png");
        let saved = download_image(&client, &format!("{}/x.png", DEAD_HOST), &path, (0.0, 0.0)).await;
        assert!(!saved);
        assert!(!path.exists());
    }

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    /// Serves `pages` by exact path, PNG bytes for anything under `/media/`, 404 otherwise.
    fn serve(listener: tokio::net::TcpListener, pages: HashMap<String, String>) {
        use tokio::io::AsyncReadExt;

        let pages = Arc::new(pages);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let pages = Arc::clone(&pages);
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&request);
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let (status, content_type, body) = match pages.get(&path) {
                        Some(html) => ("200 OK", "text/html; charset=utf-8", html.clone().into_bytes()),
                        None if path.starts_with("/media/") => ("200 OK", "image/png", PNG.to_vec()),
                        None => ("404 Not Found", "text/plain", b"not found".to_vec()),
                    };
                    let head = format!(
                        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        content_type,
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
    }

    fn detail_path(page: &str) -> String {
        format!("/wiki/{}_(Pok%C3%A9mon)", page)
    }

    #[tokio::test]
    async fn keeps_only_pages_with_description_and_saved_image() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let fixture = std::fs::read_to_string("tests/fixtures/pikachu.html").unwrap();
        let accepted = ["Pikachu", "Raichu", "Pichu", "Plusle", "Minun"];
        let mut pages = HashMap::new();
        for name in accepted {
            pages.insert(detail_path(name), fixture.replace("//archives.bulbagarden.net", &base));
        }
        // Images present, no text at all
        pages.insert(
            detail_path("Missingno"),
            r#"<html><body><table class="roundy"><tr><td><img src="/media/upload/x.png"></td></tr></table></body></html>"#
                .to_string(),
        );
        // Text present, every image URL answers 404
        pages.insert(
            detail_path("Ditto"),
            fixture.replace("//archives.bulbagarden.net", &format!("{}/missing", base)),
        );
        serve(listener, pages);

        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            base_url: base.clone(),
            ..quiet_settings(dir.path())
        };
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let order = ["Pikachu", "Missingno", "Raichu", "Ditto", "Pichu", "Plusle", "Minun"];
        let entries: Vec<IndexEntry> = order
            .iter()
            .map(|name| IndexEntry {
                url: format!("{}{}", base, detail_path(name)),
                display_name: name.to_string(),
            })
            .collect();

        let (records, stats) = scrape_entries(&client, &settings, &entries).await.unwrap();
        assert_eq!(
            stats,
            ScrapeStats {
                total: 7,
                accepted: 5,
                skipped: 2,
                errors: 0,
            }
        );
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["pikachu", "raichu", "pichu", "plusle", "minun"]);

        let pikachu = &records[0];
        let main = settings.images_dir.join("pikachu").join("main.png");
        assert_eq!(pikachu.main_image_path.as_deref(), Some(&*main.to_string_lossy()));
        assert_eq!(std::fs::read(&main).unwrap(), PNG);
        assert_eq!(pikachu.types, vec!["Electric"]);
        assert!(!pikachu.general_description.is_empty());

        let sprite_files: Vec<String> = pikachu
            .sprites
            .iter()
            .map(|s| {
                assert!(Path::new(&s.path).exists());
                Path::new(&s.path).file_name().unwrap().to_string_lossy().into_owned()
            })
            .collect();
        assert_eq!(
            sprite_files,
            vec!["Spr_1b_025.png", "Spr_2g_025.png", "Spr_2g_025-2.png", "sprite_4.png"]
        );

        // Skipped pages still get a directory but no files
        let ditto_dir = settings.images_dir.join("ditto");
        assert!(ditto_dir.is_dir());
        assert_eq!(std::fs::read_dir(&ditto_dir).unwrap().count(), 0);

        // Fifth accepted record triggers the checkpoint
        let checkpoint = std::fs::read_to_string(settings.checkpoint_path()).unwrap();
        let saved: Vec<PokemonRecord> = serde_json::from_str(&checkpoint).unwrap();
        assert_eq!(saved, records);
    }

    #[tokio::test]
    async fn unreachable_entries_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let settings = quiet_settings(dir.path());
        let client = build_client(&settings).unwrap();
        let entries = vec![
            IndexEntry {
                url: format!("{}/wiki/Pikachu_(Pok%C3%A9mon)", DEAD_HOST),
                display_name: "Pikachu".into(),
            },
            IndexEntry {
                url: format!("{}/wiki/Eevee_(Pok%C3%A9mon)", DEAD_HOST),
                display_name: "Eevee".into(),
            },
        ];

        let (records, stats) = scrape_entries(&client, &settings, &entries).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.accepted, 0);
        // Refused connections are errors; a proxy in between answers with a failure status
        assert_eq!(stats.skipped + stats.errors, 2);
        assert!(!settings.checkpoint_path().exists());
    }
}
