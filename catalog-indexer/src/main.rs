use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use catalog_common::{RawPost, DEFAULT_PLACEHOLDER};
use catalog_filter::builder::CatalogBuilder;
use catalog_filter::{CatalogConfig, Dataset};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod download;
mod preview;
mod thumbnail;

// 设置命令行参数
fn cli() -> Command {
    let source = Arg::new("source")
        .short('s')
        .long("source")
        .value_name("BLOGS_JSON")
        .help("文章列表文件路径 (blogs.json)")
        .value_parser(value_parser!(PathBuf))
        .required(true);

    Command::new("博客目录工具")
        .version(env!("CARGO_PKG_VERSION"))
        .about("规范化文章列表、生成目录快照并查找缩略图")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("显示详细信息")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("build")
                .about("生成规范化的 catalog.json 和压缩快照 catalog.bin")
                .arg(source.clone())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("OUTPUT_DIR")
                        .help("输出目录路径")
                        .value_parser(value_parser!(PathBuf))
                        .required(true),
                )
                .arg(
                    Arg::new("placeholder")
                        .long("placeholder")
                        .value_name("IMAGE")
                        .help("缺少缩略图时使用的占位图")
                        .default_value(DEFAULT_PLACEHOLDER),
                ),
        )
        .subcommand(
            Command::new("thumbnails")
                .about("从保存的文章页面中查找缺失的缩略图地址")
                .arg(source.clone())
                .arg(
                    Arg::new("pages")
                        .short('p')
                        .long("pages")
                        .value_name("PAGES_DIR")
                        .help("保存的文章页面目录（文件名为链接最后一段）")
                        .value_parser(value_parser!(PathBuf))
                        .required(true),
                )
                .arg(
                    Arg::new("assets")
                        .short('a')
                        .long("assets")
                        .value_name("ASSETS_DIR")
                        .help("缩略图目录，已存在的文件会被跳过")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("MANIFEST")
                        .help("输出的清单文件路径")
                        .value_parser(value_parser!(PathBuf))
                        .default_value("thumbnails.json"),
                ),
        )
        .subcommand(
            Command::new("download")
                .about("抓取文章页面并把封面图下载到缩略图目录")
                .arg(source.clone())
                .arg(
                    Arg::new("assets")
                        .short('a')
                        .long("assets")
                        .value_name("ASSETS_DIR")
                        .help("缩略图目录，已存在的文件会被跳过")
                        .value_parser(value_parser!(PathBuf))
                        .default_value("assets"),
                )
                .arg(
                    Arg::new("delay")
                        .long("delay")
                        .value_name("MS")
                        .help("两次请求之间的等待时间（毫秒）")
                        .value_parser(value_parser!(u64))
                        .default_value("1000"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_name("SECONDS")
                        .help("单次请求的超时时间（秒）")
                        .value_parser(value_parser!(u64).range(1..))
                        .default_value("30"),
                ),
        )
        .subcommand(
            Command::new("preview")
                .about("在终端中预览某个地址状态下的目录页面")
                .arg(source)
                .arg(
                    Arg::new("query")
                        .short('q')
                        .long("query")
                        .value_name("QUERY")
                        .help("地址栏查询字符串，例如 page=2&tags=Rust")
                        .default_value(""),
                )
                .arg(
                    Arg::new("page_size")
                        .long("page-size")
                        .value_name("N")
                        .help("每页条数")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("oldest_first")
                        .long("oldest-first")
                        .help("按文件中的顺序展示（默认最新在前）")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// 主函数
fn main() {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    if let Err(e) = run(&matches) {
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("build", args)) => build(args),
        Some(("thumbnails", args)) => thumbnails(args),
        Some(("download", args)) => download_images(args),
        Some(("preview", args)) => preview(args),
        _ => bail!("未知的子命令"),
    }
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("缺少参数 --{name}"))
}

/// 读取原始文章列表
fn load_raw_posts(path: &Path) -> Result<Vec<RawPost>> {
    let data = fs::read(path).with_context(|| format!("无法读取文件 {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("解析 {} 失败", path.display()))
}

fn build(args: &ArgMatches) -> Result<()> {
    let start_time = std::time::Instant::now();
    let source = required_path(args, "source")?;
    let output_dir = required_path(args, "output")?;
    let placeholder = args
        .get_one::<String>("placeholder")
        .map(String::as_str)
        .unwrap_or(DEFAULT_PLACEHOLDER);

    fs::create_dir_all(output_dir)
        .with_context(|| format!("无法创建输出目录 '{}'", output_dir.display()))?;

    let raw = load_raw_posts(source)?;
    info!(posts = raw.len(), source = %source.display(), "读取文章列表");

    let mut builder = CatalogBuilder::new();
    for post in raw {
        builder.add_post(post.into_post(placeholder));
    }

    let json_path = output_dir.join("catalog.json");
    let snapshot_path = output_dir.join("catalog.bin");
    let json_bytes = builder.save_json(&json_path)?;
    let snapshot_bytes = builder.save_snapshot(&snapshot_path, env!("CARGO_PKG_VERSION"))?;

    let tags = builder.tag_index();
    println!("文章: {}，标签: {}", builder.posts().len(), tags.len());
    for (tag, count) in tags.by_frequency().into_iter().take(10) {
        println!("  {tag}: {count}");
    }
    println!("{}: {} 字节", json_path.display(), json_bytes);
    println!("{}: {} 字节", snapshot_path.display(), snapshot_bytes);
    println!("索引生成完成！耗时: {:.2}秒", start_time.elapsed().as_secs_f32());
    Ok(())
}

fn thumbnails(args: &ArgMatches) -> Result<()> {
    let source = required_path(args, "source")?;
    let pages = required_path(args, "pages")?;
    let assets = args.get_one::<PathBuf>("assets").map(PathBuf::as_path);
    let output = required_path(args, "output")?;

    if !pages.is_dir() {
        bail!("页面目录不存在或不是有效目录 '{}'", pages.display());
    }

    let raw = load_raw_posts(source)?;
    let report = thumbnail::discover_thumbnails(&raw, pages, assets)?;

    let manifest = serde_json::to_vec_pretty(&report.manifest)?;
    fs::write(output, manifest).with_context(|| format!("无法写入 {}", output.display()))?;

    println!("{}", "=".repeat(60));
    println!("找到: {}", report.discovered());
    println!("跳过: {}", report.skipped);
    println!("失败: {}", report.failed.len());
    for url in &report.failed {
        println!("  {url}");
    }
    println!("共处理: {}", raw.len());
    println!("清单: {}", output.display());
    println!("{}", "=".repeat(60));
    Ok(())
}

fn download_images(args: &ArgMatches) -> Result<()> {
    let source = required_path(args, "source")?;
    let assets = required_path(args, "assets")?;
    let delay = args
        .get_one::<u64>("delay")
        .map_or(download::DEFAULT_DELAY, |ms| Duration::from_millis(*ms));
    let timeout = args
        .get_one::<u64>("timeout")
        .map_or(download::DEFAULT_TIMEOUT, |secs| Duration::from_secs(*secs));

    let raw = load_raw_posts(source)?;
    info!(posts = raw.len(), "开始下载缩略图");

    let fetcher = download::Fetcher::new(timeout)?;
    let report = download::download_thumbnails(&raw, assets, &fetcher, delay)?;

    println!("{}", "=".repeat(60));
    println!("已下载: {}", report.downloaded.len());
    println!("跳过（已存在或缺少信息）: {}", report.skipped);
    println!("失败: {}", report.failed.len());
    for url in &report.failed {
        println!("  {url}");
    }
    println!("共处理: {}", raw.len());
    println!("{}", "=".repeat(60));
    Ok(())
}

fn preview(args: &ArgMatches) -> Result<()> {
    let source = required_path(args, "source")?;
    let query = args.get_one::<String>("query").map(String::as_str).unwrap_or("");

    let mut config = CatalogConfig {
        newest_first: !args.get_flag("oldest_first"),
        ..CatalogConfig::default()
    };
    if let Some(&page_size) = args.get_one::<usize>("page_size") {
        config.page_size = page_size;
    }

    let data = fs::read(source).with_context(|| format!("无法读取文件 {}", source.display()))?;
    let dataset = Dataset::from_bytes(&data, &config.placeholder_thumbnail)
        .with_context(|| format!("解析 {} 失败", source.display()))?;

    let (output, _) = preview::run_preview(dataset, config, query);
    print!("{output}");
    Ok(())
}
