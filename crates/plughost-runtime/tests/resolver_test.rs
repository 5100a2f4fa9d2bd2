mod common;

use std::sync::Arc;

use plughost_core::config::content::ContentConfig;
use plughost_runtime::{
    CachedContentResolver, ContentCategory, ContentResolver, ContentSource, ExtensionStatus,
    ResolveError,
};

use common::{Fixture, Runtime, runtime, write_file};

async fn booted() -> (Fixture, Runtime) {
    let fixture = Fixture::new();
    let oauth = fixture.raw_plugin(
        "oauth",
        r#"{"id": "oauth", "version": "1.0.0", "main": "index.js",
            "capabilities": {"components": ["components/OAuthButtons.jsx"]}}"#,
    );
    write_file(&oauth, "components/OAuthButtons.jsx", b"export default () => null;");
    write_file(&oauth, "admin/oauth-settings.jsx", b"export const Settings = 1;");
    write_file(&oauth, "assets/logo.svg", b"<svg/>");
    fixture.plugin("seo", "seo");

    let rt = runtime(&fixture.config(), Vec::new());
    rt.sequencer.boot().await;
    (fixture, rt)
}

#[tokio::test]
async fn test_resolves_files_with_category_and_type() {
    let (_fixture, rt) = booted().await;
    let resolver = ContentResolver::new(Arc::clone(&rt.registry), 1024 * 1024);

    let content = resolver
        .resolve("oauth", "components/OAuthButtons.jsx")
        .await
        .expect("component");
    assert_eq!(content.category, ContentCategory::Component);
    assert_eq!(content.content_type, "application/javascript");
    assert_eq!(&content.content[..], b"export default () => null;");

    let admin = resolver
        .resolve("oauth", "./admin/oauth-settings.jsx")
        .await
        .expect("admin");
    assert_eq!(admin.category, ContentCategory::Admin);
    assert_eq!(admin.path, "admin/oauth-settings.jsx");

    let logo = resolver.resolve("oauth", "assets/logo.svg").await.expect("asset");
    assert_eq!(logo.category, ContentCategory::Asset);
    assert_eq!(logo.content_type, "image/svg+xml");
}

#[tokio::test]
async fn test_escaping_paths_are_rejected() {
    let (fixture, rt) = booted().await;
    write_file(fixture.temp.path(), "secret.txt", b"top secret");
    let resolver = ContentResolver::new(Arc::clone(&rt.registry), 1024 * 1024);

    let attempts = [
        "../secret.txt",
        "../../secret.txt",
        "components/../../secret.txt",
        "/etc/passwd",
        "components\\..\\..\\secret.txt",
        "C:/Windows/win.ini",
        "",
        "components/\0.jsx",
    ];
    for attempt in attempts {
        let err = resolver
            .resolve("oauth", attempt)
            .await
            .expect_err("must be rejected");
        assert!(matches!(err, ResolveError::InvalidPath), "{attempt:?} -> {err:?}");
        assert!(!err.to_string().contains(fixture.temp.path().to_str().expect("utf8")));
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_escape_is_rejected() {
    let (fixture, rt) = booted().await;
    write_file(fixture.temp.path(), "secret.txt", b"top secret");
    let link = fixture.plugins.join("oauth/components/leak.jsx");
    std::os::unix::fs::symlink(fixture.temp.path().join("secret.txt"), &link).expect("symlink");

    let resolver = ContentResolver::new(Arc::clone(&rt.registry), 1024 * 1024);
    let err = resolver
        .resolve("oauth", "components/leak.jsx")
        .await
        .expect_err("must be rejected");
    assert!(matches!(err, ResolveError::InvalidPath));
}

#[tokio::test]
async fn test_lookup_errors() {
    let (_fixture, rt) = booted().await;
    let resolver = ContentResolver::new(Arc::clone(&rt.registry), 1024 * 1024);

    assert!(matches!(
        resolver.resolve("ghost", "index.js").await,
        Err(ResolveError::NotFound { .. })
    ));
    assert!(matches!(
        resolver.resolve("oauth", "components/Missing.jsx").await,
        Err(ResolveError::FileNotFound)
    ));

    rt.registry.deactivate("oauth").await.expect("deactivate");
    assert!(matches!(
        resolver.resolve("oauth", "components/OAuthButtons.jsx").await,
        Err(ResolveError::Inactive {
            status: ExtensionStatus::Inactive,
            ..
        })
    ));
}

#[tokio::test]
async fn test_size_limit() {
    let (_fixture, rt) = booted().await;
    let resolver = ContentResolver::new(Arc::clone(&rt.registry), 8);

    let err = resolver
        .resolve("oauth", "components/OAuthButtons.jsx")
        .await
        .expect_err("too large");
    assert!(matches!(err, ResolveError::TooLarge { limit: 8 }));
}

#[tokio::test]
async fn test_cached_resolver_follows_lifecycle() {
    let (fixture, rt) = booted().await;
    let inner = ContentResolver::new(Arc::clone(&rt.registry), 1024 * 1024);
    let cached = CachedContentResolver::new(inner, &rt.bus, &ContentConfig::default()).await;

    let first = cached
        .resolve("oauth", "components/OAuthButtons.jsx")
        .await
        .expect("first");
    write_file(
        &fixture.plugins.join("oauth"),
        "components/OAuthButtons.jsx",
        b"export default () => 'v2';",
    );
    let hit = cached
        .resolve("oauth", "components/OAuthButtons.jsx")
        .await
        .expect("cached");
    assert_eq!(hit.content, first.content);

    rt.registry.deactivate("oauth").await.expect("deactivate");
    assert!(matches!(
        cached.resolve("oauth", "components/OAuthButtons.jsx").await,
        Err(ResolveError::Inactive { .. })
    ));

    rt.registry.activate("oauth").await.expect("reactivate");
    let fresh = cached
        .resolve("oauth", "components/OAuthButtons.jsx")
        .await
        .expect("fresh");
    assert_eq!(&fresh.content[..], b"export default () => 'v2';");
}
