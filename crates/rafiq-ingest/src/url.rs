// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! URL ingestion: GitHub repo/blob/tree resolution and generic HTTP fetch
//! with HTML stripping.

use rafiq_core::RafiqError;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

/// What a URL resolved to before ingestion.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub text: String,
    pub source_type: String,
}

/// How a URL should be fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum UrlKind {
    /// GitHub repo root: README on the default branch (`main`, then `master`).
    GithubRepo { owner: String, repo: String },
    /// GitHub blob: raw file content.
    GithubBlob { owner: String, repo: String, branch: String, path: String },
    /// GitHub tree: README under the subpath.
    GithubTree { owner: String, repo: String, branch: String, path: String },
    /// Anything else over http(s).
    Generic,
}

/// Classifies a URL into its fetch strategy.
pub fn classify_url(url: &str) -> UrlKind {
    static GITHUB: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^https?://github\.com/([^/]+)/([^/]+?)(?:\.git)?(?:/(blob|tree)/([^/]+)(?:/(.*))?)?/?$")
            .expect("valid github regex")
    });
    if let Some(caps) = GITHUB.captures(url) {
        let owner = caps[1].to_string();
        let repo = caps[2].to_string();
        match (caps.get(3).map(|m| m.as_str()), caps.get(4), caps.get(5)) {
            (Some("blob"), Some(branch), Some(path)) => UrlKind::GithubBlob {
                owner,
                repo,
                branch: branch.as_str().to_string(),
                path: path.as_str().to_string(),
            },
            (Some("tree"), Some(branch), path) => UrlKind::GithubTree {
                owner,
                repo,
                branch: branch.as_str().to_string(),
                path: path.map(|m| m.as_str().to_string()).unwrap_or_default(),
            },
            _ => UrlKind::GithubRepo { owner, repo },
        }
    } else {
        UrlKind::Generic
    }
}

/// Strips tags, scripts, and styles from an HTML document.
pub fn strip_html(html: &str) -> String {
    static SCRIPT: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid regex"));
    static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));
    static BLANK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let text = SCRIPT.replace_all(html, " ");
    let text = TAG.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    let lines: Vec<String> = text
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    BLANK.replace_all(lines.join("\n").trim(), "\n\n").to_string()
}

/// Fetches a URL per its kind. GitHub content comes from
/// raw.githubusercontent; repo/tree URLs resolve to the README, trying
/// `main` then `master` for the default branch.
pub async fn fetch_url(client: &reqwest::Client, url: &str) -> Result<FetchedPage, RafiqError> {
    let kind = classify_url(url);
    debug!(url, ?kind, "fetching URL");

    let fetch_raw = |raw_url: String| async move {
        let response = client
            .get(&raw_url)
            .send()
            .await
            .map_err(|e| RafiqError::backend("http", e))?;
        if !response.status().is_success() {
            return Err(RafiqError::NotFound(format!(
                "{raw_url} returned {}",
                response.status()
            )));
        }
        response.text().await.map_err(|e| RafiqError::backend("http", e))
    };

    match kind {
        UrlKind::GithubRepo { owner, repo } => {
            for branch in ["main", "master"] {
                let raw = format!(
                    "https://raw.githubusercontent.com/{owner}/{repo}/{branch}/README.md"
                );
                if let Ok(text) = fetch_raw(raw).await {
                    info!(owner, repo, branch, "fetched repo README");
                    return Ok(FetchedPage {
                        url: url.to_string(),
                        text,
                        source_type: "github".into(),
                    });
                }
            }
            Err(RafiqError::NotFound(format!("no README found for {owner}/{repo}")))
        }
        UrlKind::GithubBlob { owner, repo, branch, path } => {
            let raw = format!("https://raw.githubusercontent.com/{owner}/{repo}/{branch}/{path}");
            let text = fetch_raw(raw).await?;
            Ok(FetchedPage {
                url: url.to_string(),
                text,
                source_type: "github".into(),
            })
        }
        UrlKind::GithubTree { owner, repo, branch, path } => {
            let prefix = if path.is_empty() {
                String::new()
            } else {
                format!("{path}/")
            };
            let raw = format!(
                "https://raw.githubusercontent.com/{owner}/{repo}/{branch}/{prefix}README.md"
            );
            let text = fetch_raw(raw).await?;
            Ok(FetchedPage {
                url: url.to_string(),
                text,
                source_type: "github".into(),
            })
        }
        UrlKind::Generic => {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RafiqError::Validation(format!("unsupported URL: {url}")));
            }
            let html = fetch_raw(url.to_string()).await?;
            Ok(FetchedPage {
                url: url.to_string(),
                text: strip_html(&html),
                source_type: "url".into(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_url_classification() {
        assert_eq!(
            classify_url("https://github.com/owner/repo"),
            UrlKind::GithubRepo { owner: "owner".into(), repo: "repo".into() }
        );
        assert_eq!(
            classify_url("https://github.com/owner/repo/blob/main/src/lib.rs"),
            UrlKind::GithubBlob {
                owner: "owner".into(),
                repo: "repo".into(),
                branch: "main".into(),
                path: "src/lib.rs".into(),
            }
        );
        assert_eq!(
            classify_url("https://github.com/owner/repo/tree/master/docs"),
            UrlKind::GithubTree {
                owner: "owner".into(),
                repo: "repo".into(),
                branch: "master".into(),
                path: "docs".into(),
            }
        );
        assert_eq!(classify_url("https://example.com/page"), UrlKind::Generic);
    }

    #[test]
    fn html_stripping_removes_tags_and_scripts() {
        let html = r#"<html><head><style>body { color: red; }</style>
            <script>alert("x")</script></head>
            <body><h1>Title</h1><p>Some &amp; more <b>text</b>.</p></body></html>"#;
        let text = strip_html(html);
        assert!(text.contains("Title"));
        assert!(text.contains("Some & more text ."));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains('<'));
    }

    #[tokio::test]
    async fn generic_fetch_strips_html() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><p>irrigation notes</p></body></html>"),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let page = fetch_url(&client, &server.uri()).await.unwrap();
        assert_eq!(page.source_type, "url");
        assert!(page.text.contains("irrigation notes"));
        assert!(!page.text.contains("<p>"));
    }

    #[tokio::test]
    async fn non_http_scheme_is_rejected() {
        let client = reqwest::Client::new();
        let err = fetch_url(&client, "ftp://example.com/x").await.unwrap_err();
        assert!(matches!(err, RafiqError::Validation(_)));
    }
}
