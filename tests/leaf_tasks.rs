// tests/leaf_tasks.rs
//
// Leaf tasks against a real project directory.

use sitepipe::errors::SitepipeError;
use sitepipe::server::{ReloadHub, ReloadMessage};
use sitepipe::tasks::{bundle, clean, compile, public, templates};
use sitepipe_test_utils::builders::{ConfigFileBuilder, SiteFixture};
use sitepipe_test_utils::init_tracing;

#[tokio::test]
async fn clean_removes_dist_and_tolerates_absence() {
    init_tracing();
    let site = SiteFixture::new();
    site.write("docs/index.html", "old").write("docs/assets/css/main.css", "old");
    let ctx = site.context(ConfigFileBuilder::new().build());

    clean::run(&ctx).await.unwrap();
    assert!(!site.exists("docs"));

    // Second run has nothing to delete.
    clean::run(&ctx).await.unwrap();
}

#[tokio::test]
async fn public_copies_files_with_an_extension() {
    init_tracing();
    let site = SiteFixture::new();
    site.write("public/robots.txt", "User-agent: *")
        .write("public/img/logo.svg", "<svg/>")
        .write("public/CNAME", "example.org");
    let ctx = site.context(ConfigFileBuilder::new().build());

    let written = public::run(&ctx).await.unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(site.read("docs/robots.txt"), "User-agent: *");
    assert_eq!(site.read("docs/img/logo.svg"), "<svg/>");
    assert!(!site.exists("docs/CNAME"));
}

#[tokio::test]
async fn templates_render_views_through_layouts_and_components() {
    init_tracing();
    let site = SiteFixture::new();
    site.write(
        "src/layouts/base.html",
        "<html><body>\n{% include \"components/nav.html\" %}\n{% block content %}{% endblock %}\n</body></html>\n",
    )
    .write("src/components/nav.html", "<nav>{{ page.path | safe }}</nav>")
    .write(
        "src/views/index.html",
        "{% extends \"layouts/base.html\" %}\n{% block content %}<h1>Home</h1>{% endblock %}\n",
    )
    .write(
        "src/views/blog/post.html",
        "{% extends \"layouts/base.html\" %}\n{% block content %}<h1>Post</h1>{% endblock %}\n",
    );
    let ctx = site.context(ConfigFileBuilder::new().build());

    let written = templates::run(&ctx).await.unwrap();

    assert_eq!(written.len(), 2);
    let index = site.read("docs/index.html");
    assert!(index.contains("<nav>index.html</nav>"));
    assert!(index.contains("<h1>Home</h1>"));
    assert!(site.read("docs/blog/post.html").contains("<nav>blog/post.html</nav>"));
    // Layouts and components are not pages of their own.
    assert!(!site.exists("docs/layouts"));
    assert!(!site.exists("docs/components"));
}

#[tokio::test]
async fn template_error_leaves_previous_output_untouched() {
    init_tracing();
    let site = SiteFixture::new();
    site.write("docs/index.html", "previous good build")
        .write("src/views/index.html", "<p>fine</p>")
        .write("src/views/broken.html", "{% if %}");
    let ctx = site.context(ConfigFileBuilder::new().build());

    let err = templates::run(&ctx).await.unwrap_err();

    assert!(matches!(err, SitepipeError::Compile { ref task, .. } if task == "templates"));
    assert_eq!(site.read("docs/index.html"), "previous good build");
    assert!(!site.exists("docs/broken.html"));
}

#[tokio::test]
async fn scripts_lib_concatenates_in_path_order() {
    init_tracing();
    let site = SiteFixture::new();
    site.write("src/libs/vendor/z.js", "var z = 3;")
        .write("src/libs/a.js", "var a = 1;")
        .write("src/libs/m.js", "var m = 2;");
    let ctx = site.context(ConfigFileBuilder::new().build());

    bundle::scripts(&ctx).await.unwrap();

    assert_eq!(
        site.read("docs/assets/js/libs.min.js"),
        "var a = 1;\nvar m = 2;\nvar z = 3;"
    );
}

#[tokio::test]
async fn scripts_lib_keeps_legacy_encoded_sources_byte_for_byte() {
    init_tracing();
    let site = SiteFixture::new();
    site.write("src/libs/legacy.js", b"var caf = 'caf\xe9';")
        .write("src/libs/modern.js", "var x = 1;");
    let ctx = site.context(ConfigFileBuilder::new().build());

    bundle::scripts(&ctx).await.unwrap();

    assert_eq!(
        site.read_bytes("docs/assets/js/libs.min.js"),
        b"var caf = 'caf\xe9';\nvar x = 1;".to_vec()
    );
}

#[tokio::test]
async fn empty_libs_write_no_bundle() {
    init_tracing();
    let site = SiteFixture::new();
    let ctx = site.context(ConfigFileBuilder::new().build());

    assert!(bundle::styles(&ctx).await.unwrap().is_empty());
    assert!(bundle::scripts(&ctx).await.unwrap().is_empty());
    assert!(!site.exists("docs"));
}

#[tokio::test]
async fn styles_dev_without_entry_is_a_filesystem_error() {
    init_tracing();
    let site = SiteFixture::new();
    let ctx = site.context(ConfigFileBuilder::new().build());

    let err = compile::styles(&ctx).await.unwrap_err();
    assert!(matches!(err, SitepipeError::Filesystem { .. }));

    let err = compile::scripts(&ctx).await.unwrap_err();
    assert!(matches!(err, SitepipeError::Filesystem { .. }));
}

#[cfg(unix)]
mod stages {
    use super::*;

    #[tokio::test]
    async fn styles_lib_concatenates_then_minifies() {
        init_tracing();
        let site = SiteFixture::new();
        site.write("src/libs/b.css", ".b{color:blue}\n")
            .write("src/libs/a.css", ".a{color:red}\n");
        let cfg = ConfigFileBuilder::new()
            .with_minifier("tr -d '\\n' < {input} > {output}")
            .build();
        let ctx = site.context(cfg);

        let written = bundle::styles(&ctx).await.unwrap();

        assert_eq!(written, vec![site.path("docs/assets/css/libs.min.css")]);
        assert_eq!(
            site.read("docs/assets/css/libs.min.css"),
            ".a{color:red}.b{color:blue}"
        );
    }

    #[tokio::test]
    async fn failing_minifier_keeps_last_good_bundle() {
        init_tracing();
        let site = SiteFixture::new();
        site.write("src/libs/a.css", ".a{")
            .write("docs/assets/css/libs.min.css", "last good");
        let cfg = ConfigFileBuilder::new()
            .with_minifier("echo 'Parse error: unclosed block' >&2; exit 1 # {input} {output}")
            .build();
        let ctx = site.context(cfg);

        let err = bundle::styles(&ctx).await.unwrap_err();

        assert!(matches!(err, SitepipeError::Compile { ref task, ref message }
            if task == "styles-lib" && message.contains("unclosed")));
        assert_eq!(site.read("docs/assets/css/libs.min.css"), "last good");
    }

    #[tokio::test]
    async fn styles_dev_runs_every_stage_in_order() {
        init_tracing();
        let site = SiteFixture::new();
        site.write("src/sass/index.scss", "body { margin: 0 }\n");
        let cfg = ConfigFileBuilder::new()
            .with_style_stages(&[
                "cp {input} {output}",
                "sh -c 'cat \"$1\"; echo \"/* $BROWSERSLIST */\"' _ {input} > {output}",
            ])
            .build();
        let ctx = site.context(cfg);

        let written = compile::styles(&ctx).await.unwrap();

        assert_eq!(written, vec![site.path("docs/assets/css/main.css")]);
        assert_eq!(
            site.read("docs/assets/css/main.css"),
            "body { margin: 0 }\n/* last 10 versions */\n"
        );
    }

    #[tokio::test]
    async fn failing_stage_keeps_last_good_output() {
        init_tracing();
        let site = SiteFixture::new();
        site.write("src/sass/index.sass", "body\n  margin: 0\n")
            .write("docs/assets/css/main.css", "last good");
        let cfg = ConfigFileBuilder::new()
            .with_style_stages(&["echo 'Error: expected \"{\"' >&2; exit 65 # {input} {output}"])
            .build();
        let ctx = site.context(cfg);

        let err = compile::styles(&ctx).await.unwrap_err();

        match err {
            SitepipeError::Compile { task, message } => {
                assert_eq!(task, "styles-dev");
                assert!(message.contains("expected"), "{message}");
            }
            other => panic!("expected Compile error, got {other:?}"),
        }
        assert_eq!(site.read("docs/assets/css/main.css"), "last good");
    }

    #[tokio::test]
    async fn stage_that_writes_nothing_is_a_compile_error() {
        init_tracing();
        let site = SiteFixture::new();
        site.write("src/js/index.js", "export default 1;");
        let cfg = ConfigFileBuilder::new().with_bundler("true {input} {output}").build();
        let ctx = site.context(cfg);

        let err = compile::scripts(&ctx).await.unwrap_err();
        assert!(matches!(err, SitepipeError::Compile { ref task, .. } if task == "scripts-dev"));
        assert!(!site.exists("docs/assets/js/main.js"));
    }

    #[tokio::test]
    async fn scripts_dev_bundles_entry_and_notifies_reload() {
        init_tracing();
        let site = SiteFixture::new();
        site.write("src/js/index.js", "console.log('hi');\n");
        let cfg = ConfigFileBuilder::new().with_bundler("cp {input} {output}").build();
        let hub = ReloadHub::default();
        let mut rx = hub.subscribe();
        let ctx = site.context_with_reload(cfg, hub);

        let written = compile::scripts(&ctx).await.unwrap();
        assert_eq!(site.read("docs/assets/js/main.js"), "console.log('hi');\n");

        let message = sitepipe::tasks::TaskId::ScriptsDev.reload_message(&ctx.paths, &written);
        assert_eq!(message, Some(ReloadMessage::Reload));
        ctx.reload.notify(ReloadMessage::Reload);
        assert_eq!(rx.recv().await.unwrap(), ReloadMessage::Reload);
    }
}
