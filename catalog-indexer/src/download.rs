//! 在线模式：抓取文章页面，找到封面图后下载到缩略图目录。

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use catalog_common::RawPost;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::thumbnail::{extract_image_url, pending_thumbnail};

/// 以浏览器身份请求，部分站点会拒绝默认的客户端标识
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// HTTP 抓取器
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("无法创建 HTTP 客户端")?;
        Ok(Self { client })
    }

    /// 获取页面 HTML，非 2xx 响应视为失败
    pub fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("请求失败 {url}"))?
            .error_for_status()?;
        Ok(response.text()?)
    }

    /// 把图片以流的方式写入 `path`，失败时不留下不完整的文件
    pub fn download(&self, url: &str, path: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("请求失败 {url}"))?
            .error_for_status()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("无法创建目录 {}", parent.display()))?;
        }

        let file = File::create(path).with_context(|| format!("无法创建文件 {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        let written = response
            .copy_to(&mut writer)
            .map_err(anyhow::Error::from)
            .and_then(|n| writer.flush().map(|_| n).map_err(anyhow::Error::from));

        match written {
            Ok(n) => Ok(n),
            Err(e) => {
                drop(writer);
                let _ = fs::remove_file(path);
                Err(e.context(format!("下载失败 {url}")))
            }
        }
    }
}

/// 下载结果
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// 已下载的文件名
    pub downloaded: Vec<String>,
    /// 缺少链接或缩略图，或文件已存在
    pub skipped: usize,
    /// 页面抓取失败、找不到图片或下载失败的文章链接
    pub failed: Vec<String>,
}

/// 为缺少缩略图文件的文章抓取页面并下载封面图。
///
/// 每次发出网络请求后等待 `delay`（最后一篇除外）
pub fn download_thumbnails(
    posts: &[RawPost],
    assets_dir: &Path,
    fetcher: &Fetcher,
    delay: Duration,
) -> Result<DownloadReport> {
    fs::create_dir_all(assets_dir)
        .with_context(|| format!("无法创建缩略图目录 '{}'", assets_dir.display()))?;

    let mut report = DownloadReport::default();
    let total = posts.len();

    for (i, post) in posts.iter().enumerate() {
        let position = format!("[{}/{}]", i + 1, total);
        let Some((url, filename)) = pending_thumbnail(post, Some(assets_dir)) else {
            debug!("{position} 缺少链接或缩略图，或缩略图已存在，跳过");
            report.skipped += 1;
            continue;
        };

        info!("{position} 处理: {url}");
        match fetch_one(fetcher, url, &assets_dir.join(&filename)) {
            Ok(bytes) => {
                info!("{position} 已下载 {filename} ({bytes} 字节)");
                report.downloaded.push(filename);
            }
            Err(e) => {
                warn!("{position} {e:#}");
                report.failed.push(url.to_string());
            }
        }

        if i + 1 < total && !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    Ok(report)
}

fn fetch_one(fetcher: &Fetcher, url: &str, save_path: &Path) -> Result<u64> {
    let html = fetcher.fetch_page(url)?;
    let image_url = extract_image_url(&html).context("页面中没有图片")?;
    debug!("找到图片: {image_url}");
    fetcher.download(&image_url, save_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    type Route = (String, &'static str, Vec<u8>);

    // 本地 HTTP 服务：按路径返回固定响应，没有浏览器标识的请求返回 403
    fn serve(listener: TcpListener, routes: Vec<Route>) {
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut browser = false;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() <= 2 {
                        break;
                    }
                    if line.to_ascii_lowercase().starts_with("user-agent: mozilla/5.0") {
                        browser = true;
                    }
                }

                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = if !browser {
                    ("403 Forbidden", Vec::new())
                } else {
                    routes
                        .iter()
                        .find(|(route, _, _)| route == path)
                        .map(|(_, status, body)| (*status, body.clone()))
                        .unwrap_or(("404 Not Found", Vec::new()))
                };
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
            }
        });
    }

    fn raw(url: &str, thumbnail: Option<&str>) -> RawPost {
        RawPost {
            url: Some(url.to_string()),
            title: None,
            thumbnail: thumbnail.map(str::to_string),
            tags: None,
        }
    }

    #[test]
    fn downloads_missing_thumbnails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let page = |image: &str| {
            format!(r#"<html><head><meta property="og:image" content="{base}{image}"></head></html>"#)
                .into_bytes()
        };
        serve(
            listener,
            vec![
                ("/post/first".to_string(), "200 OK", page("/img/first.png?w=800")),
                ("/post/no-image".to_string(), "200 OK", b"<p>text only</p>".to_vec()),
                ("/post/broken-image".to_string(), "200 OK", page("/img/missing.png")),
                ("/img/first.png".to_string(), "200 OK", b"PNG-FIRST".to_vec()),
            ],
        );

        let assets = tempfile::tempdir().unwrap();
        fs::write(assets.path().join("existing.png"), b"old").unwrap();

        let posts = vec![
            raw(&format!("{base}/post/first"), Some("assets/first.png")),
            raw(&format!("{base}/post/existing"), Some("assets/existing.png")),
            raw(&format!("{base}/post/no-thumbnail"), None),
            raw(&format!("{base}/post/no-image"), Some("assets/no-image.png")),
            raw(&format!("{base}/post/gone"), Some("assets/gone.png")),
            raw(&format!("{base}/post/broken-image"), Some("assets/broken.png")),
        ];

        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let report = download_thumbnails(&posts, assets.path(), &fetcher, Duration::ZERO).unwrap();

        assert_eq!(report.downloaded, vec!["first.png".to_string()]);
        assert_eq!(report.skipped, 2);
        assert_eq!(
            report.failed,
            vec![
                format!("{base}/post/no-image"),
                format!("{base}/post/gone"),
                format!("{base}/post/broken-image"),
            ]
        );
        assert_eq!(fs::read(assets.path().join("first.png")).unwrap(), b"PNG-FIRST");
        assert_eq!(fs::read(assets.path().join("existing.png")).unwrap(), b"old");
        assert!(!assets.path().join("broken.png").exists());
    }

    #[test]
    fn requests_carry_browser_user_agent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        serve(listener, vec![("/page".to_string(), "200 OK", b"hello".to_vec())]);

        let fetcher = Fetcher::new(DEFAULT_TIMEOUT).unwrap();
        assert_eq!(fetcher.fetch_page(&format!("{base}/page")).unwrap(), "hello");
    }

    #[test]
    fn non_success_status_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        serve(listener, Vec::new());

        let fetcher = Fetcher::new(DEFAULT_TIMEOUT).unwrap();
        assert!(fetcher.fetch_page(&format!("{base}/missing")).is_err());
    }
}
