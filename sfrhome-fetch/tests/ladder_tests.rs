// Cookie ladder tests against a mock portal using wiremock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sfrhome_core::{Cookie, FetchSource};
use sfrhome_fetch::{
    default_pipeline, ArtifactWriter, Credentials, FetchContext, FetchError, LadderState,
    PortalSettings, StaticCredentials,
};
use sfrhome_store::CookieFile;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEVICES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Sensors name="Maison" model_type="HUB-V2" alarm_mode="off">
  <Sensor id="12" deviceType="MAGNETIC" name="Porte entree" brand="logo_sfr_home.png"/>
  <Sensor id="31" deviceType="CAMERA_WIFI" deviceMac="00:11:22:33:44:55">
    <name>Salon</name>
  </Sensor>
</Sensors>"#;

const LOGIN_HTML: &str = r#"<html><body>
<form id="loginForm" action="/login/submit" method="post">
  <input type="hidden" name="lt" value="LT-42">
  <input type="text" name="email" value="">
  <input type="hidden" name="token_sso" value="">
</form>
</body></html>"#;

// ── Helpers ─────────────────────────────────────────────────────────

fn context(server: &MockServer, dir: &TempDir, credentials: Option<Credentials>) -> FetchContext {
    let provider = match credentials {
        Some(c) => StaticCredentials::new(c),
        None => StaticCredentials::none(),
    };
    FetchContext::builder()
        .portal(PortalSettings::from_base(&server.uri()))
        .timeout(Duration::from_secs(5))
        .credentials(Arc::new(provider))
        .cookie_file(CookieFile::new(dir.path().join("cookies.json")))
        .artifacts(ArtifactWriter::new(dir.path(), false))
        .build()
}

fn host(server: &MockServer) -> String {
    url::Url::parse(&server.uri())
        .unwrap()
        .host_str()
        .unwrap()
        .to_string()
}

async fn mount_devices_for(server: &MockServer, cookie: &str) {
    Mock::given(method("GET"))
        .and(path("/mysensors"))
        .and(header_regex("cookie", cookie))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(DEVICES_XML),
        )
        .with_priority(1)
        .mount(server)
        .await;
}

async fn mount_devices_forbidden(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/mysensors"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<html>denied</html>"))
        .mount(server)
        .await;
}

async fn mount_sso_flow(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sso-connector.php"))
        .and(body_string_contains("connectionSFR=me%40example.com"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"result": {"token_sso": "tok-1"}})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_HTML))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login/submit"))
        .and(body_string_contains("token_sso=tok-1"))
        .and(body_string_contains("lt=LT-42"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "sid=fresh; Path=/")
                .set_body_string("<html>ok</html>"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/accueil"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>dashboard</html>"))
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

// ── Ladder tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_stale_stored_cookie_falls_back_to_sso() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_devices_for(&server, "sid=fresh").await;
    mount_devices_forbidden(&server).await;
    mount_sso_flow(&server).await;

    let ctx = context(&server, &dir, Some(Credentials::new("me@example.com", "pw")));
    ctx.cookie_file
        .save(&[Cookie::new("sid", "stale", host(&server))])
        .await
        .unwrap();

    let outcome = default_pipeline().execute(&ctx).await;

    assert_eq!(outcome.successful_strategy(), Some("sfrhome.sso"));
    assert_eq!(
        outcome.trace(),
        vec![LadderState::TryStoredCookie, LadderState::RunSso, LadderState::Done]
    );

    let snapshot = outcome.result.unwrap().into_snapshot();
    assert_eq!(snapshot.source, FetchSource::Sso);
    assert_eq!(snapshot.devices.len(), 3);
    assert!(snapshot.devices[0].is_panel());

    let saved = ctx.cookie_file.load().await.unwrap();
    assert!(saved.iter().any(|c| c.name == "sid" && c.value == "fresh"));
    assert!(dir.path().join("debug_mysensors_error.html").exists());
}

#[tokio::test]
async fn test_explicit_cookie_succeeds_and_is_persisted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_devices_for(&server, "sid=given").await;
    mount_devices_forbidden(&server).await;

    let ctx = FetchContext::builder()
        .portal(PortalSettings::from_base(&server.uri()))
        .explicit_cookie(Some(" sid=given ".into()))
        .cookie_file(CookieFile::new(dir.path().join("cookies.json")))
        .artifacts(ArtifactWriter::new(dir.path(), false))
        .build();

    let outcome = default_pipeline().execute(&ctx).await;

    assert_eq!(outcome.successful_strategy(), Some("sfrhome.explicit_cookie"));
    assert_eq!(outcome.attempts_count(), 1);

    let saved = ctx.cookie_file.load().await.unwrap();
    assert_eq!(saved[0].value, "given");
}

#[tokio::test]
async fn test_html_answer_rejects_cookie() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/mysensors"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>login</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let ctx = context(&server, &dir, None);
    ctx.cookie_file
        .save(&[Cookie::new("sid", "old", host(&server))])
        .await
        .unwrap();

    let outcome = default_pipeline().execute(&ctx).await;

    assert!(matches!(outcome.result, Err(FetchError::MissingCredentials)));
    assert!(!ctx.cookie_file.exists());
    assert_eq!(outcome.final_state(), LadderState::Fail);
}

#[tokio::test]
async fn test_unlabelled_login_page_falls_back_to_sso() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_devices_for(&server, "sid=fresh").await;
    Mock::given(method("GET"))
        .and(path("/mysensors"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(LOGIN_HTML, "text/plain"))
        .mount(&server)
        .await;
    mount_sso_flow(&server).await;

    let ctx = context(&server, &dir, Some(Credentials::new("me@example.com", "pw")));
    ctx.cookie_file
        .save(&[Cookie::new("sid", "stale", host(&server))])
        .await
        .unwrap();

    let outcome = default_pipeline().execute(&ctx).await;

    assert_eq!(
        outcome.trace(),
        vec![LadderState::TryStoredCookie, LadderState::RunSso, LadderState::Done]
    );
    assert!(outcome.errors()[0].contains("HTML document"));
    assert_eq!(outcome.result.unwrap().into_snapshot().devices.len(), 3);

    let saved = ctx.cookie_file.load().await.unwrap();
    assert!(saved.iter().all(|c| c.value != "stale"));
}

#[tokio::test]
async fn test_failed_explicit_cookie_falls_to_stored_cookie() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_devices_for(&server, "sid=stored").await;
    mount_devices_forbidden(&server).await;

    let ctx = FetchContext::builder()
        .portal(PortalSettings::from_base(&server.uri()))
        .explicit_cookie(Some("sid=expired".into()))
        .cookie_file(CookieFile::new(dir.path().join("cookies.json")))
        .artifacts(ArtifactWriter::new(dir.path(), false))
        .build();
    ctx.cookie_file
        .save(&[Cookie::new("sid", "stored", host(&server))])
        .await
        .unwrap();

    let outcome = default_pipeline().execute(&ctx).await;

    assert_eq!(outcome.successful_strategy(), Some("sfrhome.stored_cookie"));
    assert_eq!(
        outcome.trace(),
        vec![
            LadderState::TryExplicitCookie,
            LadderState::TryStoredCookie,
            LadderState::Done
        ]
    );
    assert!(outcome.errors()[0].contains("403"));

    let saved = ctx.cookie_file.load().await.unwrap();
    assert_eq!(saved[0].value, "stored");
}

#[tokio::test]
async fn test_explicit_cookie_timeout_falls_through() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/mysensors"))
        .and(header_regex("cookie", "sid=slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(DEVICES_XML, "application/xml")
                .set_delay(Duration::from_secs(3)),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    mount_devices_for(&server, "sid=stored").await;

    let ctx = FetchContext::builder()
        .portal(PortalSettings::from_base(&server.uri()))
        .timeout(Duration::from_secs(1))
        .explicit_cookie(Some("sid=slow".into()))
        .cookie_file(CookieFile::new(dir.path().join("cookies.json")))
        .artifacts(ArtifactWriter::new(dir.path(), false))
        .build();
    ctx.cookie_file
        .save(&[Cookie::new("sid", "stored", host(&server))])
        .await
        .unwrap();

    let outcome = default_pipeline().execute(&ctx).await;

    assert_eq!(
        outcome.trace(),
        vec![
            LadderState::TryExplicitCookie,
            LadderState::TryStoredCookie,
            LadderState::Done
        ]
    );
    assert_eq!(outcome.errors(), vec!["Request timed out after 1 seconds"]);
}

#[tokio::test]
async fn test_sso_jar_kept_when_final_fetch_fails() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/mysensors"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_sso_flow(&server).await;

    let ctx = context(&server, &dir, Some(Credentials::new("me@example.com", "pw")));
    let outcome = default_pipeline().execute(&ctx).await;

    assert!(outcome.result.is_err());
    assert_eq!(outcome.final_state(), LadderState::Fail);

    let saved = ctx.cookie_file.load().await.unwrap();
    assert!(saved.iter().any(|c| c.name == "sid" && c.value == "fresh"));
}

#[tokio::test]
async fn test_missing_credentials_without_cookies() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let outcome = default_pipeline().execute(&context(&server, &dir, None)).await;

    assert!(matches!(outcome.result, Err(FetchError::MissingCredentials)));
    assert_eq!(outcome.trace(), vec![LadderState::RunSso, LadderState::Fail]);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sso_without_token_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/sso-connector.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result":{}}"#))
        .mount(&server)
        .await;

    let ctx = context(&server, &dir, Some(Credentials::new("me@example.com", "pw")));
    let outcome = default_pipeline().execute(&ctx).await;

    let err = outcome.result.unwrap_err();
    assert!(matches!(err, FetchError::ProtocolDrift { .. }));
    assert!(err.to_string().contains("token_sso missing"));
    assert!(err.artifact().unwrap().ends_with("debug_sso_error.html"));
    assert!(dir.path().join("debug_sso_error.html").exists());
    assert_eq!(requests_to(&server, "/login").await, 0);
}

#[tokio::test]
async fn test_sso_sends_origin_and_referer() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_devices_for(&server, "sid=fresh").await;
    mount_devices_forbidden(&server).await;
    mount_sso_flow(&server).await;

    let ctx = context(&server, &dir, Some(Credentials::new("me@example.com", "pw")));
    default_pipeline().execute(&ctx).await.result.unwrap();

    let requests = server.received_requests().await.unwrap();
    let sso = requests
        .iter()
        .find(|r| r.url.path() == "/sso-connector.php")
        .unwrap();
    assert_eq!(
        sso.headers.get("referer").unwrap().to_str().unwrap(),
        format!("{}/login", server.uri())
    );
    assert!(sso.headers.get("origin").is_some());

    let devices = requests.iter().find(|r| r.url.path() == "/mysensors").unwrap();
    assert_eq!(
        devices.headers.get("x-requested-with").unwrap().to_str().unwrap(),
        "XMLHttpRequest"
    );
}

#[tokio::test]
async fn test_progress_markers_follow_steps() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_devices_for(&server, "sid=fresh").await;
    mount_sso_flow(&server).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let ctx = FetchContext::builder()
        .portal(PortalSettings::from_base(&server.uri()))
        .credentials(Arc::new(StaticCredentials::new(Credentials::new(
            "me@example.com",
            "pw",
        ))))
        .cookie_file(CookieFile::new(dir.path().join("cookies.json")))
        .artifacts(ArtifactWriter::new(dir.path(), false))
        .progress(Arc::new(move |m: &str| sink.lock().unwrap().push(m.to_string())))
        .build();

    default_pipeline().execute(&ctx).await.result.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert!(seen[0].starts_with("Step 1/4"));
    assert!(seen[3].starts_with("Step 4/4"));
}

#[tokio::test]
async fn test_plain_field_style() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/sso-connector.php"))
        .and(body_string_contains("username=me"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let settings = sfrhome_fetch::FetchSettings {
        field_style: sfrhome_core::SsoFieldStyle::Plain,
        ..Default::default()
    };
    let ctx = FetchContext::builder()
        .portal(PortalSettings::from_base(&server.uri()))
        .settings(settings)
        .credentials(Arc::new(StaticCredentials::new(Credentials::new("me", "pw"))))
        .cookie_file(CookieFile::new(dir.path().join("cookies.json")))
        .artifacts(ArtifactWriter::new(dir.path(), false))
        .build();

    let outcome = default_pipeline().execute(&ctx).await;
    assert!(outcome.errors().last().unwrap().contains("HTTP 500"));
}
