// src/fetch/mod.rs

use anyhow::Result;
use reqwest::Client;

/// Agencies serve an HTML error page to unadorned clients; present a
/// desktop user agent on every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(Into::into)
}

/// Module for discovering spreadsheet links on dataset landing pages
pub mod pages {
    use super::*;
    use scraper::{Html, Selector};
    use std::path::Path;
    use url::Url;

    const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "zip"];

    fn is_spreadsheet_href(href: &str) -> bool {
        Path::new(href)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Scrape a landing page for downloadable spreadsheet/zip links, in
    /// document order. The caller takes the first: landing pages list the
    /// current edition ahead of older ones.
    pub async fn find_files(client: &Client, page_url: &str) -> Result<Vec<String>> {
        let selector = Selector::parse("a[href]").expect("CSS selector for links should be valid");
        let base = Url::parse(page_url)?;
        let html = client
            .get(page_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let doc = Html::parse_document(&html);
        let links = doc
            .select(&selector)
            .filter_map(|e| e.value().attr("href"))
            .filter(|href| is_spreadsheet_href(href))
            .filter_map(|href| base.join(href).ok())
            .map(|u| u.to_string())
            .collect::<Vec<_>>();
        Ok(links)
    }

}

/// Module for downloading a single file to disk, with rate-limit recovery
pub mod files {
    use super::*;
    use std::path::Path;
    use std::time::Duration;
    use tokio::time::sleep;
    use tracing::{info, warn};

    /// Pause between requests; the source rate-limits aggressive clients.
    const POLITE_DELAY: Duration = Duration::from_secs(3);
    const RETRY_DELAY: Duration = Duration::from_secs(5);

    fn looks_like_html(resp: &reqwest::Response) -> bool {
        resp.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_lowercase().contains("html"))
            .unwrap_or(false)
    }

    /// Download `url` to `dest`, skipping when the file already exists. A
    /// response with an HTML body in place of the file means we were rate
    /// limited; wait and retry once, then give up on this file.
    pub async fn download(client: &Client, url: &str, dest: &Path) -> Result<()> {
        if dest.is_file() {
            info!(dest = %dest.display(), "skipping download; file already exists");
            return Ok(());
        }

        sleep(POLITE_DELAY).await;
        let mut resp = client.get(url).send().await?.error_for_status()?;
        if looks_like_html(&resp) {
            warn!(url, "got HTML response instead of file, likely rate limited");
            sleep(RETRY_DELAY).await;
            resp = client.get(url).send().await?.error_for_status()?;
            if looks_like_html(&resp) {
                anyhow::bail!("still receiving HTML for {url} after retry");
            }
        }

        let bytes = resp.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        info!(dest = %dest.display(), bytes = bytes.len(), "download complete");
        Ok(())
    }
}

/// Module for pulling the one relevant spreadsheet out of a zip archive
pub mod zips {
    use super::*;
    use anyhow::Context;
    use std::{
        fs::{self, File},
        io,
        path::{Path, PathBuf},
    };
    use tracing::info;
    use zip::ZipArchive;

    /// Archive member names worth keeping, beyond the series code itself.
    const NAMES_TO_KEEP: &[&str] = &["quarterly", "m on m", "1 month"];

    /// Pick the one triangle spreadsheet out of an archive's member list.
    ///
    /// Members mentioning "3m on 3m" are excluded first: searching for the
    /// code alone would pick some series up twice (e.g. IOS appears in both
    /// "3M on 3M" and "M on M"). When several candidates survive (the
    /// Index of Production archive bundles production and manufacturing)
    /// prefer the member naming the configured short name.
    pub fn select_member(names: &[String], code: &str, short_name: &str) -> Option<String> {
        let code = code.to_lowercase();
        let candidates: Vec<&String> = names
            .iter()
            .filter(|n| !n.to_lowercase().contains("3m on 3m"))
            .filter(|n| {
                let lower = n.to_lowercase();
                NAMES_TO_KEEP.iter().any(|k| lower.contains(k)) || lower.contains(&code)
            })
            .collect();

        if candidates.len() > 1 {
            let short = short_name.to_lowercase();
            if let Some(preferred) = candidates
                .iter()
                .find(|n| n.to_lowercase().contains(&short))
            {
                return Some((*preferred).clone());
            }
        }
        candidates.first().map(|n| (*n).clone())
    }

    /// Extract the selected member next to the archive and delete the
    /// archive afterwards. Returns the extracted file's path.
    pub fn extract_member(archive_path: &Path, code: &str, short_name: &str) -> Result<PathBuf> {
        let file = File::open(archive_path)
            .with_context(|| format!("opening archive {}", archive_path.display()))?;
        let mut archive = ZipArchive::new(file)
            .with_context(|| format!("reading archive {}", archive_path.display()))?;

        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        let member = select_member(&names, code, short_name).with_context(|| {
            format!(
                "no triangle member for `{code}` in {}",
                archive_path.display()
            )
        })?;

        let out_dir = archive_path
            .parent()
            .context("archive path has no parent directory")?;
        let file_name = Path::new(&member)
            .file_name()
            .context("archive member has no file name")?;
        let out_path = out_dir.join(file_name);

        let mut entry = archive.by_name(&member)?;
        let mut out = File::create(&out_path)
            .with_context(|| format!("creating {}", out_path.display()))?;
        io::copy(&mut entry, &mut out)?;
        drop(entry);

        fs::remove_file(archive_path)
            .with_context(|| format!("removing archive {}", archive_path.display()))?;
        info!(member = %member, "extracted triangle spreadsheet from archive");
        Ok(out_path)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::io::Write;
        use tempfile::tempdir;
        use zip::write::{ExtendedFileOptions, FileOptions};
        use zip::CompressionMethod;

        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        #[test]
        fn selects_by_keyword_and_excludes_3m_on_3m() {
            let members = names(&[
                "ios 3M on 3M triangle.xlsx",
                "ios M on M triangle.xlsx",
                "notes.txt",
            ]);
            assert_eq!(
                select_member(&members, "ios", "services"),
                Some("ios M on M triangle.xlsx".to_string())
            );
        }

        #[test]
        fn prefers_short_name_when_ambiguous() {
            // the Index of Production archive bundles both datasets
            let members = names(&[
                "production quarterly triangle.xlsx",
                "manufacturing quarterly triangle.xlsx",
            ]);
            assert_eq!(
                select_member(&members, "k222", "manufacturing"),
                Some("manufacturing quarterly triangle.xlsx".to_string())
            );
        }

        #[test]
        fn no_candidate_yields_none() {
            let members = names(&["readme.txt", "metadata.json"]);
            assert_eq!(select_member(&members, "abmi", "gdp"), None);
        }

        #[test]
        fn extracts_member_and_removes_archive() {
            let dir = tempdir().unwrap();
            let archive_path = dir.path().join("bundle.zip");
            {
                let mut zip = zip::ZipWriter::new(File::create(&archive_path).unwrap());
                let options = FileOptions::<ExtendedFileOptions>::default()
                    .compression_method(CompressionMethod::Stored);
                zip.start_file("gdp quarterly triangle.xlsx", options)
                    .unwrap();
                zip.write_all(b"not really a workbook").unwrap();
                zip.finish().unwrap();
            }

            let out = extract_member(&archive_path, "abmi", "gdp").unwrap();
            assert_eq!(
                out.file_name().unwrap().to_str().unwrap(),
                "gdp quarterly triangle.xlsx"
            );
            assert!(out.is_file());
            assert!(!archive_path.exists());
        }
    }
}
