//! End-to-end pipeline tests
//!
//! Each test writes a URL list into a temporary directory, points the
//! pipeline at a wiremock server and inspects the destination directory and
//! the recorded events afterwards.

use bulkfetch::config::{ByteSize, Config};
use bulkfetch::observability::{EventLevel, MemorySink};
use bulkfetch::pipeline::Pipeline;
use bulkfetch::storage::{FixedSpaceProbe, LocalStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestContext {
    temp_dir: TempDir,
    server: MockServer,
    sink: Arc<MemorySink>,
    config: Config,
}

impl TestContext {
    async fn setup() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.download.dest_dir = temp_dir.path().join("downloads");

        Self {
            temp_dir,
            server: MockServer::start().await,
            sink: Arc::new(MemorySink::new()),
            config,
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.server.uri(), route)
    }

    async fn serve_image(&self, route: &str, content_type: &str, body: Vec<u8>) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", content_type)
                    .set_body_bytes(body),
            )
            .mount(&self.server)
            .await;
    }

    fn write_list(&self, contents: &str) -> PathBuf {
        let list = self.temp_dir.path().join("urls.txt");
        std::fs::write(&list, contents).unwrap();
        list
    }

    fn dest(&self) -> PathBuf {
        self.config.download.dest_dir.clone()
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.config.clone(), self.sink.clone())
            .with_space_probe(Arc::new(FixedSpaceProbe(u64::MAX)))
    }

    fn committed_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dest())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn assert_no_staging(&self) {
        let store = LocalStore::open(self.dest()).unwrap();
        assert!(store.staging_files().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_valid_and_malformed_urls() {
    let ctx = TestContext::setup().await;
    ctx.serve_image("/a", "image/png", vec![1u8; 512]).await;
    ctx.serve_image("/b.jpg", "image/jpeg", vec![2u8; 512]).await;

    let a = ctx.url("/a");
    let b = ctx.url("/b.jpg");
    let list = ctx.write_list(&format!("{a}\n  not-a-url   {b}\n"));

    let report = ctx.pipeline().run(&list).await.unwrap();

    assert_eq!(ctx.committed_files(), vec!["a.png", "b.jpg"]);

    let mut downloaded = ctx.sink.lines(EventLevel::Info);
    downloaded.sort();
    let mut expected = vec![format!("downloaded: {a:?}"), format!("downloaded: {b:?}")];
    expected.sort();
    assert_eq!(downloaded, expected);

    assert_eq!(
        ctx.sink.lines(EventLevel::Warn),
        vec!["invalid url: \"not-a-url\""]
    );
    assert_eq!(report.metrics.urls_accepted, 2);
    assert_eq!(report.metrics.urls_rejected, 1);
    assert_eq!(report.metrics.downloads_committed, 2);
    assert_eq!(report.metrics.downloads_failed, 0);
}

#[tokio::test]
async fn test_redirect_loop_reported_once() {
    let ctx = TestContext::setup().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&ctx.server)
        .await;

    let url = ctx.url("/loop");
    let list = ctx.write_list(&url);

    ctx.pipeline().run(&list).await.unwrap();

    assert_eq!(
        ctx.sink.lines(EventLevel::Warn),
        vec![format!("{url:?} - Too many redirections")]
    );
    assert!(ctx.sink.lines(EventLevel::Info).is_empty());
    assert!(ctx.committed_files().is_empty());
}

#[tokio::test]
async fn test_too_big_document_mid_stream() {
    let mut ctx = TestContext::setup().await;
    ctx.config.download.max_document_bytes = ByteSize(16 * 1024);
    ctx.serve_image("/huge.tiff", "image/tiff", vec![5u8; 256 * 1024])
        .await;
    ctx.serve_image("/small.gif", "image/gif", vec![6u8; 1024]).await;

    let huge = ctx.url("/huge.tiff");
    let small = ctx.url("/small.gif");
    let list = ctx.write_list(&format!("{huge} {small}"));

    ctx.pipeline().run(&list).await.unwrap();

    assert_eq!(ctx.committed_files(), vec!["small.gif"]);
    let warnings = ctx.sink.lines(EventLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with(&format!("{huge:?} - Document is too big")));
    ctx.assert_no_staging();
}

#[tokio::test]
async fn test_failures_do_not_stop_the_batch() {
    let mut ctx = TestContext::setup().await;
    ctx.config.workers.count = 2;
    ctx.config.queue.capacity = 1;

    for i in 0..12 {
        ctx.serve_image(&format!("/img{i}"), "image/gif", vec![i as u8 + 1; 300])
            .await;
    }
    for (route, status) in [("/missing", 404), ("/broken", 500)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&ctx.server)
            .await;
    }

    let mut list = String::new();
    list.push_str(&format!("{}\n", ctx.url("/missing")));
    for i in 0..12 {
        list.push_str(&format!("{}\n", ctx.url(&format!("/img{i}"))));
    }
    list.push_str(&ctx.url("/broken"));
    let list = ctx.write_list(&list);

    let report = ctx.pipeline().run(&list).await.unwrap();

    assert_eq!(report.metrics.urls_accepted, 14);
    assert_eq!(report.metrics.downloads_committed, 12);
    assert_eq!(report.metrics.downloads_failed, 2);
    assert_eq!(ctx.committed_files().len(), 12);
    assert!(ctx.committed_files().iter().all(|name| name.ends_with(".gif")));

    let warnings = ctx.sink.lines(EventLevel::Warn);
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().any(|line| line.contains("4XX response status code")));
    assert!(warnings.iter().any(|line| line.contains("5XX response status code")));
    ctx.assert_no_staging();
}

#[tokio::test]
async fn test_out_of_disk_space() {
    let ctx = TestContext::setup().await;
    ctx.serve_image("/photo", "image/jpeg", vec![8u8; 64 * 1024]).await;

    let url = ctx.url("/photo");
    let list = ctx.write_list(&url);

    ctx.pipeline()
        .with_space_probe(Arc::new(FixedSpaceProbe(0)))
        .run(&list)
        .await
        .unwrap();

    assert_eq!(
        ctx.sink.lines(EventLevel::Warn),
        vec![format!("{url:?} - Not enough disk space to write")]
    );
    assert!(ctx.committed_files().is_empty());
}
