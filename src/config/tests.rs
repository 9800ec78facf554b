use super::*;

#[test]
fn defaults_are_usable_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), DEFAULT_PUBLIC_PORT);
    assert_eq!(settings.server.admin_addr.port(), DEFAULT_ADMIN_PORT);
    assert_eq!(settings.blog.page_size.get(), DEFAULT_PAGE_SIZE);
    assert_eq!(settings.blog.recent_posts_limit.get(), DEFAULT_RECENT_POSTS_LIMIT);
    assert_eq!(settings.blog.site_title, DEFAULT_SITE_TITLE);
    assert_eq!(settings.blog.timezone, chrono_tz::UTC);
    assert!(settings.database.url.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.blog.page_size = Some(20);

    let overrides = ServeOverrides {
        public_port: Some(4321),
        log_level: Some("debug".to_string()),
        blog_page_size: Some(3),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.blog.page_size.get(), 3);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_page_size_is_rejected_with_the_offending_key() {
    let mut raw = RawSettings::default();
    raw.blog.page_size = Some(0);

    let err = Settings::from_raw(raw).expect_err("page size of zero");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "blog.page_size",
            ..
        }
    ));
}

#[test]
fn unknown_timezone_is_rejected() {
    let mut raw = RawSettings::default();
    raw.blog.timezone = Some("Mars/Olympus_Mons".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid timezone");
    assert!(matches!(err, LoadError::Invalid { key: "blog.timezone", .. }));
}

#[test]
fn named_timezone_parses() {
    let mut raw = RawSettings::default();
    raw.blog.timezone = Some("Asia/Shanghai".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.blog.timezone, chrono_tz::Asia::Shanghai);
}

#[test]
fn blank_database_url_collapses_to_none() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero port");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "server.public_port",
            ..
        }
    ));
}
