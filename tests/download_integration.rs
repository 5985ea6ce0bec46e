//! End-to-end pipeline tests against a mock site.
//!
//! A wiremock server stands in for CDA.pl; the fetcher's base override
//! routes every request (pages and streams alike) to it while the pipeline
//! keeps working with real site-shaped URLs.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cda_dl_core::{
    BEST_RESOLUTION, DownloadOptions, Downloader, Error, Fetcher, RunContext, RunError, RunSummary,
    Video,
};

/// Inverse of the stream-locator cipher: encodes a scheme-less,
/// extension-less media location the way the site would embed it.
fn encode_stream_token(plain: &str) -> String {
    plain
        .chars()
        .map(|c| {
            let code = c as i32;
            if (33..=126).contains(&code) {
                char::from_u32(u32::try_from(33 + (code - 80).rem_euclid(94)).unwrap())
                    .unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// Builds a video page with the embedded player metadata blob.
fn video_page(id: &str, title: &str, qualities: &[&str], stream_host_path: &str) -> String {
    let quality_entries = qualities
        .iter()
        .map(|q| format!(r#""{q}":"""#))
        .collect::<Vec<_>>()
        .join(",");
    let token = encode_stream_token(stream_host_path);
    format!(
        r#"<html><body>
            <h1>{title}</h1>
            <div id="mediaplayer{id}" player_data='{{"video":{{"qualities":{{{quality_entries}}},"file":"{token}"}}}}'></div>
        </body></html>"#
    )
}

async fn mount_video(server: &MockServer, id: &str, title: &str, content: &[u8]) {
    let stream_path = format!("/strm/{id}.mp4");
    Mock::given(method("GET"))
        .and(path(format!("/video/{id}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(video_page(
                id,
                title,
                &["360p", "480p"],
                &format!("vwaw123.cda.pl/strm/{id}"),
            )),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(stream_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

fn downloader_for(server: &MockServer, directory: &Path, urls: &[&str]) -> Downloader {
    let options = DownloadOptions::new(
        directory.to_path_buf(),
        BEST_RESOLUTION,
        false,
        2,
        true,
    )
    .expect("valid options");
    let ctx = RunContext::with_fetcher(options, Fetcher::with_base_override(server.uri()));
    Downloader::with_context(urls.iter().map(ToString::to_string).collect(), false, ctx)
}

#[tokio::test]
async fn test_folder_tree_and_standalone_video_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");

    // Folder "Wakacje 2023": two listing pages, one subfolder, page 3 missing.
    Mock::given(method("GET"))
        .and(path("/someuser/wakacje/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <span class="folder-one-line"><a href="/someuser">someuser</a></span>
                <span class="folder-one-line"><a href="/someuser/wakacje">Wakacje 2023</a></span>
                <a class="object-folder" href="https://www.cda.pl/someuser/gory" data-foldery_id="7">Góry</a>
                <a class="object-folder" href="https://www.cda.pl/promo">promo</a>
                <a class="thumbnail-link" href="/video/aaa111">one</a>
                <a class="thumbnail-link" href="/video/bbb222">two</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/someuser/wakacje/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a class="thumbnail-link" href="/video/ccc333">three</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/someuser/wakacje/3/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    // Subfolder "Góry": one video, page 2 missing.
    Mock::given(method("GET"))
        .and(path("/someuser/gory/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <span class="folder-one-line"><a href="/someuser/gory">Góry</a></span>
                <a class="thumbnail-link" href="/video/ddd444">four</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/someuser/gory/2/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    mount_video(&server, "aaa111", "Film A", b"content-a").await;
    mount_video(&server, "bbb222", "Film B", b"content-b").await;
    mount_video(&server, "ccc333", "Film C", b"content-c").await;
    mount_video(&server, "ddd444", "Film D", b"content-d").await;
    mount_video(&server, "zzz999", "Standalone Film", b"content-z").await;

    let downloader = downloader_for(
        &server,
        dir.path(),
        &[
            "https://www.cda.pl/someuser/wakacje/",
            "https://www.cda.pl/video/zzz999",
        ],
    );
    let summary = downloader.run().await.expect("run succeeds");

    assert_eq!(
        summary,
        RunSummary {
            completed: 5,
            skipped: 0,
            failed: 0
        }
    );

    let folder = dir.path().join("Wakacje_2023");
    for (file, content) in [
        ("Film_A.mp4", b"content-a".as_slice()),
        ("Film_B.mp4", b"content-b"),
        ("Film_C.mp4", b"content-c"),
    ] {
        let path = folder.join(file);
        assert_eq!(
            std::fs::read(&path).unwrap_or_else(|_| panic!("missing {}", path.display())),
            content
        );
    }
    assert_eq!(
        std::fs::read(folder.join("Góry").join("Film_D.mp4")).expect("subfolder video"),
        b"content-d"
    );
    assert_eq!(
        std::fs::read(dir.path().join("Standalone_Film.mp4")).expect("standalone video"),
        b"content-z"
    );

    // No .part leftovers after successful completion.
    assert!(!folder.join("Film_A.mp4.part").exists());
}

#[tokio::test]
async fn test_resume_issues_range_request_and_completes_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/video/rrr111"))
        .respond_with(ResponseTemplate::new(200).set_body_string(video_page(
            "rrr111",
            "Resume Film",
            &["480p"],
            "vwaw123.cda.pl/strm/rrr111",
        )))
        .mount(&server)
        .await;

    // Only the ranged request for the remaining bytes is mounted; a full
    // request would 404 and fail the test.
    Mock::given(method("GET"))
        .and(path("/strm/rrr111.mp4"))
        .and(header("Range", "bytes=4-"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(b"456789".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    std::fs::write(dir.path().join("Resume_Film.mp4.part"), b"0123").expect("seed partial file");

    let downloader = downloader_for(&server, dir.path(), &["https://www.cda.pl/video/rrr111"]);
    let summary = downloader.run().await.expect("run succeeds");

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        std::fs::read(dir.path().join("Resume_Film.mp4")).expect("final file"),
        b"0123456789"
    );
    assert!(!dir.path().join("Resume_Film.mp4.part").exists());
}

#[tokio::test]
async fn test_existing_file_skips_without_stream_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/video/sss111"))
        .respond_with(ResponseTemplate::new(200).set_body_string(video_page(
            "sss111",
            "Skip Film",
            &["480p"],
            "vwaw123.cda.pl/strm/sss111",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/strm/sss111.mp4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    std::fs::write(dir.path().join("Skip_Film.mp4"), b"already here").expect("seed final file");

    let downloader = downloader_for(&server, dir.path(), &["https://www.cda.pl/video/sss111"]);
    let summary = downloader.run().await.expect("run succeeds");

    assert_eq!(
        summary,
        RunSummary {
            completed: 0,
            skipped: 1,
            failed: 0
        }
    );
    assert_eq!(
        std::fs::read(dir.path().join("Skip_Film.mp4")).expect("untouched file"),
        b"already here"
    );
}

#[tokio::test]
async fn test_failing_video_does_not_abort_siblings() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/video/bad111"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_video(&server, "good22", "Good Film", b"good bytes").await;

    let downloader = downloader_for(
        &server,
        dir.path(),
        &[
            "https://www.cda.pl/video/bad111",
            "https://www.cda.pl/video/good22",
        ],
    );
    let summary = downloader.run().await.expect("run succeeds");

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        std::fs::read(dir.path().join("Good_Film.mp4")).expect("sibling downloaded"),
        b"good bytes"
    );
}

#[tokio::test]
async fn test_premium_video_counts_failed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/video/prm111"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r"<html><body>
                <h1>Premium Film</h1>
                <p>Ten film jest dostępny dla użytkowników premium</p>
            </body></html>",
        ))
        .mount(&server)
        .await;

    let downloader = downloader_for(&server, dir.path(), &["https://www.cda.pl/video/prm111"]);
    let summary = downloader.run().await.expect("run succeeds");

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.completed, 0);
}

#[tokio::test]
async fn test_explicit_resolution_validation_fails_fast() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/video/vvv111"))
        .respond_with(ResponseTemplate::new(200).set_body_string(video_page(
            "vvv111",
            "Some Film",
            &["360p", "480p"],
            "vwaw123.cda.pl/strm/vvv111",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/strm/vvv111.mp4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let options = DownloadOptions::new(dir.path().to_path_buf(), "1080p", false, 2, true)
        .expect("valid options");
    let ctx = RunContext::with_fetcher(options, Fetcher::with_base_override(server.uri()));
    let downloader = Downloader::with_context(
        vec!["https://www.cda.pl/video/vvv111".to_string()],
        false,
        ctx,
    );

    match downloader.run().await {
        Err(RunError::Download(Error::Resolution { requested, .. })) => {
            assert_eq!(requested, "1080p");
        }
        other => panic!("expected resolution error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_resolutions_lists_labels_without_downloading() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/video/lll111"))
        .respond_with(ResponseTemplate::new(200).set_body_string(video_page(
            "lll111",
            "Listed Film",
            &["360p", "480p", "720p"],
            "vwaw123.cda.pl/strm/lll111",
        )))
        .mount(&server)
        .await;

    let options = DownloadOptions::new(PathBuf::from("."), BEST_RESOLUTION, false, 1, true)
        .expect("valid options");
    let ctx = RunContext::with_fetcher(options, Fetcher::with_base_override(server.uri()));
    let video = Video::new(
        "https://www.cda.pl/video/lll111".to_string(),
        PathBuf::from("."),
        ctx,
    );

    let resolutions = video.fetch_resolutions().await.expect("metadata fetch");
    assert_eq!(resolutions, vec!["360p", "480p", "720p"]);
}
